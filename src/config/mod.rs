//! Configuration models for the engine and operation cost tables.

pub mod engine;

pub use engine::{EngineConfig, OperationCosts};
