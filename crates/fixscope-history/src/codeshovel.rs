//! History provider backed by the CodeShovel method-history tool.
//!
//! Each lookup runs `java -jar <codeshovel.jar>` once, writes its JSON to a
//! scratch file named after the query, and reads it back. The scratch file is
//! removed whatever the outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use fixscope_core::FixscopeError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::provider::{parse_output, HistoryProvider, HistoryQuery, ProviderError};

/// Default per-method timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs CodeShovel as a child process per query.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fixscope_history::codeshovel::CodeShovelProvider;
///
/// let provider = CodeShovelProvider::new("tools/codeshovel.jar")
///     .with_java("/usr/lib/jvm/bin/java")
///     .with_timeout(Duration::from_secs(60));
/// assert_eq!(provider.timeout(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CodeShovelProvider {
    java: String,
    jar: PathBuf,
    work_dir: PathBuf,
    timeout: Duration,
}

impl CodeShovelProvider {
    /// Create a provider for the jar at `jar`, using `java` from `PATH`.
    pub fn new(jar: impl Into<PathBuf>) -> Self {
        Self {
            java: "java".into(),
            jar: jar.into(),
            work_dir: std::env::temp_dir(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a specific Java executable.
    pub fn with_java(mut self, java: impl Into<String>) -> Self {
        self.java = java.into();
        self
    }

    /// Directory for scratch output files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Per-method timeout; the child is killed when it expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured jar path.
    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// Check that the jar exists and the Java executable can be found.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::Setup`] naming the missing piece.
    pub fn verify(&self) -> Result<(), FixscopeError> {
        if !self.jar.is_file() {
            return Err(FixscopeError::setup(
                format!("CodeShovel jar not found: {}", self.jar.display()),
                "set [paths] codeshovel_jar, FIXSCOPE_CODESHOVEL_JAR, or pass --codeshovel-jar",
            ));
        }
        which::which(&self.java).map_err(|_| {
            FixscopeError::setup(
                format!("Java executable not found: {}", self.java),
                "install a JRE or set [analysis] java to its full path",
            )
        })?;
        Ok(())
    }

    /// Scratch file for `query`, unique per repository, file, method and line.
    pub fn output_path(&self, query: &HistoryQuery) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(query.repo_path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(query.file_path.as_bytes());
        hasher.update([0]);
        hasher.update(query.method_name.as_bytes());
        hasher.update(query.start_line.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.work_dir
            .join(format!("codeshovel-{}-{}.json", query.method_name, &digest[..16]))
    }

    fn command(&self, query: &HistoryQuery, outfile: &Path) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .arg("-repopath")
            .arg(&query.repo_path)
            .arg("-filepath")
            .arg(&query.file_path)
            .arg("-methodname")
            .arg(&query.method_name)
            .arg("-startline")
            .arg(query.start_line.to_string())
            .arg("-outfile")
            .arg(outfile)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, query: &HistoryQuery, outfile: &Path) -> Result<Value, ProviderError> {
        tracing::debug!(%query, outfile = %outfile.display(), "running codeshovel");

        let child = self
            .command(query, outfile)
            .spawn()
            .map_err(|source| ProviderError::Spawn {
                program: self.java.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(ProviderError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = match tokio::fs::read_to_string(outfile).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::MissingOutput(outfile.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        parse_output(&text, outfile)
    }
}

/// Removes the scratch file when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

impl HistoryProvider for CodeShovelProvider {
    async fn fetch(&self, query: &HistoryQuery) -> Result<Value, ProviderError> {
        let outfile = self.output_path(query);
        let _ = std::fs::remove_file(&outfile);
        let scratch = ScratchFile(outfile);
        self.run(query, &scratch.0).await
    }
}
