// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod lock;
pub mod log;
pub mod path;
pub mod template;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{Engine, RenderOptions, ViewSettings};
pub use error::{Frame, RenderError, Result};
pub use fs::{MemoryFs, OsFs, TemplateFs};
pub use log::{LogLevel, LogSink, Logger};
pub use template::Value;
