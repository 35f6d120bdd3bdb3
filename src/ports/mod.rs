//! Outbound ports: durable persistence and the event bus.

pub mod event_stream;
pub mod persistence;

pub use event_stream::{Event, EventHandle, EventPriority, EventStream};
pub use persistence::{LoadedState, RlRepository};
