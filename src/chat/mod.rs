pub mod client;
pub mod context;
pub mod engine;
pub mod error;

pub use engine::{ChatEngine, SharedEngine};
pub use error::ChatError;
