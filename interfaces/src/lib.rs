pub mod defs;
pub mod state;

pub use defs::{CONFIG_KEY, DeliveryRecord, Destination, DestinationConfig, ItemStore, Notifier};
pub use state::MemoryItemStore;
