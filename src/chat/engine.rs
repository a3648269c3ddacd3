mod engine;
mod guard;

pub use engine::ChatEngine;
pub use guard::SharedEngine;
