pub mod coordination;
pub mod elector;
pub mod error;

pub use coordination::{sequence_suffix, CoordinationClient, WatchEvent, WatchSubscription};
pub use elector::LeaderElector;
pub use error::{Error, Result};
