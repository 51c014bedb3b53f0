//! Typed HTTP wrapper over the beacon REST endpoints and the SSE `block`
//! topic.

pub mod cache;
pub mod client;
pub mod retry;
pub mod serde_utils;
pub mod sse;
pub mod wire;

pub use client::BeaconNodeClient;
pub use sse::BlockEventStream;
