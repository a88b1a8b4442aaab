//! Engine-wide default values

/// File extension appended to template names that lack it
pub const DEFAULT_EXTENSION: &str = "template";

/// Per-render execution budget in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Names bound into every execution context for identity metadata
pub mod metadata {
    /// Template base name, extension stripped
    pub const TEMPLATE: &str = "__template";

    /// Absolute template file path
    pub const FILENAME: &str = "__filename";

    /// Directory containing the template file
    pub const DIRNAME: &str = "__dirname";
}
