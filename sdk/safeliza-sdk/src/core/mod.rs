pub mod config;
pub mod connection;
pub mod constants;
pub mod http;
pub mod signer;
