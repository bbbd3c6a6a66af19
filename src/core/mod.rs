pub mod credentials;
pub mod docker;
pub mod file_lock;
pub mod history;
pub mod paths;
pub mod pipeline;
pub mod proxmox;
pub mod secrets;
pub mod tfvars;
pub mod token;
