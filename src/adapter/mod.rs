//! Implementations of ports (hexagonal adapters).

pub mod market;
pub mod notifier;
pub mod sentiment;
pub mod store;

pub use market::{synthetic_series, ReplayProvider};
pub use notifier::{LogNotifier, NotifierRegistry, NullNotifier};
pub use sentiment::{FlakySource, StaticSource};
pub use store::MemoryStore;
