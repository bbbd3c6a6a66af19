pub mod log;
pub mod process;
pub mod retry;
pub mod ssh;
pub mod terraform;
