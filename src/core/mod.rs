pub mod active;
pub mod service;
pub mod session;
