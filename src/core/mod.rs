pub mod config;
pub mod error;
pub mod item;
pub mod store;

#[cfg(test)]
mod config_test;

pub use config::*;
pub use error::*;
pub use item::*;
pub use store::*;
