pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod modules;
pub mod runtime;
pub mod util;

pub use config::RuntimeConfig;
pub use error::{GaswatchError, Result};
pub use runtime::Runtime;
