pub mod credential;
pub mod settings;
pub mod token;
