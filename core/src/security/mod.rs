pub mod message;
pub mod engine;
pub mod payload;

pub use message::*;
pub use engine::*;
