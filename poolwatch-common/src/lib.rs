pub mod types;
pub mod error;
pub mod config;

pub use types::*;
pub use error::{PoolwatchError, Result};
pub use config::WatchConfig;
