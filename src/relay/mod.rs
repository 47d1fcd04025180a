pub mod pump;
pub mod service;
pub mod slot;
