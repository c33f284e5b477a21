//! In-memory adapters for the task ports.

mod bus;
mod store;

pub use bus::InMemoryNotificationBus;
pub use store::InMemoryTaskStore;
