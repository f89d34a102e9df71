pub mod access;
pub mod config;
pub mod goals;
pub mod shared;
pub mod storage;
pub mod tests;
