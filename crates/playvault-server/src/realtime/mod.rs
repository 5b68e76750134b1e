//! Realtime fan-out: device registry and the WebSocket endpoint.

pub mod registry;
pub mod ws;

pub use registry::{DeviceRegistry, Event};
