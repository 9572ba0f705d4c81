//! The formulation orchestration core: admission control, the five-agent
//! pipeline, and the per-agent memory/latency guards that back it.

pub mod admission;
pub mod agents;
pub mod contracts;
pub mod ingredient_data;
pub mod memory_guard;
pub mod pipeline;

pub use pipeline::{Orchestrator, OrchestrationResult};
