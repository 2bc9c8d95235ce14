pub mod access_gate;
pub mod failures;
pub mod happy_path;
