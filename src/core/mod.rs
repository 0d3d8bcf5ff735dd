//! Runtime-agnostic conversation core.
//!
//! Everything here is synchronous except the executor and reveal sequencer,
//! which only suspend on tokio timers and the transport future.

pub mod controller;
pub mod executor;
pub mod reveal;
pub mod store;
pub mod view;
