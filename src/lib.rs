//! Deployment orchestrator for a self-hosted secrets stack.
//!
//! Sequences Terraform, the Proxmox CLI tools (over SSH), Docker (over SSH)
//! and the Infisical REST API to provision an LXC container, deploy the
//! secrets service, bootstrap its admin account and issue machine
//! credentials for later infrastructure runs.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Business logic (pipeline, credentials, tfvars, remote ops)
//! - `models` — Data structures
//! - `util` — Process, SSH, Terraform and retry helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;
