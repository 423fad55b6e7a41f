//! Document sources for Kontext.
//!
//! Turns files on disk into plain text for the chunker.

mod plain;

pub use plain::PlainTextExtractor;

use crate::error::{KontextError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extensions Kontext recognizes.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md", "markdown", "html", "htm"];

/// Format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Txt,
    Markdown,
    Html,
}

impl SourceFormat {
    /// Detect the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(SourceFormat::Pdf),
            "docx" => Some(SourceFormat::Docx),
            "txt" => Some(SourceFormat::Txt),
            "md" | "markdown" => Some(SourceFormat::Markdown),
            "html" | "htm" => Some(SourceFormat::Html),
            _ => None,
        }
    }

    /// Detect the format of a file.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether chunk page numbers should be estimated from position.
    pub fn is_paginated(&self) -> bool {
        matches!(self, SourceFormat::Pdf)
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = KontextError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| KontextError::UnsupportedFormat(s.to_string()))
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Pdf => write!(f, "pdf"),
            SourceFormat::Docx => write!(f, "docx"),
            SourceFormat::Txt => write!(f, "txt"),
            SourceFormat::Markdown => write!(f, "markdown"),
            SourceFormat::Html => write!(f, "html"),
        }
    }
}

/// Check if a path has a supported document extension.
pub fn is_supported(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

/// Trait for text extraction from source files.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from a file.
    async fn extract_text(&self, path: &Path) -> Result<String>;
}
