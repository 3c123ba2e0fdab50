use std::fs;
use std::path::{Path, PathBuf};

use crate::editing::Document;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is not valid UTF-8: {0}")]
    InvalidText(PathBuf),
}

/// Read a file and return its content
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| IoError::InvalidText(path.to_path_buf()))
}

/// Load a file into a document with the mode chain derived from its name
pub fn open_document(path: &Path) -> Result<Document, IoError> {
    let text = read_file(path)?;
    Ok(Document::new(&text).with_modes(modes_for_path(path)))
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, content).map_err(IoError::Io)
}

/// Mode chain for a file, most specific first.
///
/// The extension names the most specific mode; source files fall back to
/// `prog`, everything ends with `text`.
pub fn modes_for_path(path: &Path) -> Vec<String> {
    let mut modes = Vec::new();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(ext) = ext {
        let prog = matches!(
            ext.as_str(),
            "rs" | "c" | "h" | "cpp" | "go" | "py" | "js" | "ts" | "java" | "el" | "lisp" | "clj"
                | "scm" | "rb" | "sh" | "toml" | "json"
        );
        modes.push(ext);
        if prog {
            modes.push("prog".to_string());
        }
    }
    modes.push("text".to_string());
    modes
}
