//! Diagnostics sinks
//!
//! In stdio mode the process pipes are the JSON-RPC wire; nothing else may
//! write to them. [`init_stdio_logging`] routes all tracing output to a log
//! file in the system temp directory instead.

// Layer 1: Standard library imports
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a stderr writer and the given filter directive
///
/// For the HTTP mode, where stderr is free for diagnostics.
pub fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize tracing with a temp-directory file sink for stdio mode
///
/// Returns the log file path so the host can surface it to operators.
/// stdout and stderr stay untouched.
///
/// # Errors
///
/// Returns an I/O error when the log file cannot be created.
pub fn init_stdio_logging(log_level: &str) -> std::io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!(
        "crucible-mcp-{}.log",
        std::process::id()
    ));
    let file = Arc::new(File::create(&path)?);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .try_init();

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_logging_creates_temp_file() {
        let path = init_stdio_logging("debug").unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("crucible-mcp-")));
        let _ = std::fs::remove_file(path);
    }
}
