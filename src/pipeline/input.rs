//! Input resolution: classify a user-supplied path as a PDF or as text that
//! has already been extracted.
//!
//! PDFs are recognised by their `%PDF` magic bytes. Anything else that is
//! valid UTF-8 is accepted as pre-extracted text, one table line per text
//! line, which lets callers run their own extractor (or `pdftotext -layout`)
//! and still use the reconstruction pipeline. Files that are neither are
//! rejected with [`Pdf2CsvError::NotAPdf`] before pdfium ever sees them.

use crate::error::Pdf2CsvError;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// What kind of document an input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Pdf,
    Text,
}

/// A validated local input.
#[derive(Debug)]
pub enum ResolvedInput {
    /// A PDF to run through text extraction.
    Pdf(PathBuf),
    /// Pre-extracted text, already read into memory.
    Text { path: PathBuf, text: String },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Pdf(p) => p,
            ResolvedInput::Text { path, .. } => path,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Pdf(_) => InputKind::Pdf,
            ResolvedInput::Text { .. } => InputKind::Text,
        }
    }
}

/// Resolve a local file path, validating existence and content type.
pub fn resolve_input(path_str: &str) -> Result<ResolvedInput, Pdf2CsvError> {
    let path = PathBuf::from(path_str);

    let mut file = std::fs::File::open(&path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => Pdf2CsvError::PermissionDenied { path: path.clone() },
        _ => Pdf2CsvError::FileNotFound { path: path.clone() },
    })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| Pdf2CsvError::Internal(format!("Failed to read '{}': {e}", path.display())))?;

    if bytes.starts_with(PDF_MAGIC) {
        debug!("Resolved PDF input: {}", path.display());
        return Ok(ResolvedInput::Pdf(path));
    }

    match String::from_utf8(bytes) {
        Ok(text) => {
            debug!("Resolved text input: {} ({} bytes)", path.display(), text.len());
            Ok(ResolvedInput::Text { path, text })
        }
        Err(e) => {
            let mut magic = [0u8; 4];
            let head = e.as_bytes();
            let n = head.len().min(4);
            magic[..n].copy_from_slice(&head[..n]);
            Err(Pdf2CsvError::NotAPdf { path, magic })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn test_missing_file() {
        let err = resolve_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, Pdf2CsvError::FileNotFound { .. }));
    }

    #[test]
    fn test_pdf_magic() {
        let f = write_temp(b"%PDF-1.7\n...");
        let resolved = resolve_input(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.kind(), InputKind::Pdf);
        assert_eq!(resolved.path(), f.path());
    }

    #[test]
    fn test_text_input() {
        let f = write_temp("Date     Amount\n01/01    5.00\n".as_bytes());
        match resolve_input(f.path().to_str().unwrap()).unwrap() {
            ResolvedInput::Text { text, .. } => assert!(text.starts_with("Date")),
            other => panic!("expected text input, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_file_is_text() {
        let f = write_temp(b"");
        let resolved = resolve_input(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.kind(), InputKind::Text);
    }

    #[test]
    fn test_binary_rejected() {
        let f = write_temp(b"\x89PNG\r\n\x1a\n\xff\xfe");
        match resolve_input(f.path().to_str().unwrap()).unwrap_err() {
            Pdf2CsvError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
