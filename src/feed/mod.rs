pub mod coordinator;
pub mod pagination;
pub mod screen;
pub mod visibility;
pub mod window;


pub use coordinator::*;
pub use pagination::*;
pub use screen::*;
pub use visibility::*;
pub use window::*;
