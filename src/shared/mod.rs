pub mod models;
pub mod state;
pub mod utils;

#[cfg(test)]
#[path = "shared.test.rs"]
mod shared_test;
