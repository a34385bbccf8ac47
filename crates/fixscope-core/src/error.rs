use std::path::PathBuf;

/// Errors that can occur across the fixscope workspace.
///
/// Library crates use this type directly; the binary converts to
/// `miette::Report` at the boundary. Only setup-phase errors are meant to
/// stop a run: per-file and per-method failures are logged and skipped by
/// the pipeline instead of being returned.
///
/// # Examples
///
/// ```
/// use fixscope_core::FixscopeError;
///
/// let err = FixscopeError::Config("no fix keywords configured".into());
/// assert!(err.to_string().contains("no fix keywords"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum FixscopeError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(fixscope::config), help("check .fixscope.toml and FIXSCOPE_* variables"))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Source or document parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// GitHub API failure.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// A required tool or input is missing, detected before any processing.
    #[error("setup error: {message}")]
    #[diagnostic(code(fixscope::setup))]
    Setup {
        /// What is missing.
        message: String,
        /// How to fix it.
        #[help]
        hint: Option<String>,
    },

    /// An entity was asked to move to an earlier pipeline stage.
    #[error("invalid stage transition for {entity}: {from} -> {to}")]
    StageRegression {
        /// Human-readable entity description.
        entity: String,
        /// Current stage.
        from: String,
        /// Requested stage.
        to: String,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl FixscopeError {
    /// Build a [`FixscopeError::Setup`] with a remediation hint.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixscope_core::FixscopeError;
    ///
    /// let err = FixscopeError::setup("codeshovel.jar not found", "pass --codeshovel-jar");
    /// assert_eq!(err.to_string(), "setup error: codeshovel.jar not found");
    /// ```
    pub fn setup(message: impl Into<String>, hint: impl Into<String>) -> Self {
        FixscopeError::Setup {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}
