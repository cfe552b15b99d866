pub mod loader;
pub mod player;

pub use loader::*;
pub use player::*;
