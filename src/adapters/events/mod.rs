//! Event-stream adapters for the event-consumption port.

pub mod in_memory;

pub use in_memory::InMemoryEventStream;
