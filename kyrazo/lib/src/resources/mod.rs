//! Resource modules built on the HTTP layer.

pub mod events;

pub use events::Events;
