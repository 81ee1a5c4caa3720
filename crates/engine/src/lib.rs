pub mod runner;

pub use runner::{Engine, EngineHandle, EngineSnapshot};
