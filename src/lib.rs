//! WebPad GW - Rust implementation
//!
//! Gateway bridging WebSocket clients (e.g. a phone PWA) to a virtual
//! Xbox 360 controller on the host. JSON input events are validated,
//! translated into pad state mutations and applied through a single guarded
//! device handle; device-originated vibration feedback is fanned out to all
//! connected clients.

pub mod config;
pub mod feedback;
pub mod guard;
pub mod mapper;
pub mod pad;
pub mod protocol;
pub mod registry;
pub mod server;
