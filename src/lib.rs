pub mod auth;
pub mod backend;
pub mod capability;
pub mod config;
pub mod protocol;
pub mod server;
pub mod session;
