pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod signal;

pub use config::EngineConfig;
pub use error::*;
pub use event::*;
pub use history::SignalHistory;
pub use signal::*;
