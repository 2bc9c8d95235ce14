pub mod access;
pub mod orchestrator;
pub mod passkey;
pub mod pending;
pub mod policy;
pub mod sessions;
