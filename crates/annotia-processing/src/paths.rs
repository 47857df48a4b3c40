//! Path validation shared by the subprocess wrappers.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
pub fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

/// Validate and canonicalize a file path to prevent directory traversal
pub fn validate_and_canonicalize_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    validate_path(&path_str)?;

    if path.exists() {
        path.canonicalize()
            .map_err(|e| anyhow!("Failed to canonicalize path: {}", e))
    } else {
        if let Some(parent) = path.parent() {
            parent
                .canonicalize()
                .map_err(|e| anyhow!("Failed to canonicalize parent path: {}", e))?;
        }
        Ok(path.to_path_buf())
    }
}

/// Validate an external tool path before it is handed to the process spawner.
pub fn validate_tool_path(tool_path: &str) -> Result<()> {
    validate_path(tool_path)?;

    if !tool_path.chars().all(|c| {
        c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
    }) {
        return Err(anyhow!("Invalid tool path: contains unsafe characters"));
    }

    Ok(())
}
