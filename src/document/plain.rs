//! Text extraction for plain-text formats.

use super::{SourceFormat, TextExtractor};
use crate::error::{KontextError, Result};
use async_trait::async_trait;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::path::Path;
use tracing::debug;

/// Elements whose content is never visible text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "iframe", "svg",
];

/// Elements that end a line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "header", "footer", "blockquote", "pre", "table", "ul", "ol", "title",
];

/// Reads `.txt`, `.md` and `.html` files as UTF-8.
///
/// Binary formats are recognized but rejected with an unsupported-format error.
#[derive(Debug, Default, Clone)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Extract the visible text of an HTML document.
///
/// Entities are decoded by the parser; one line is emitted per block element.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    collect_text(document.root_element(), &mut text);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }

    if BLOCK_ELEMENTS.contains(&name) {
        out.push('\n');
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| KontextError::UnsupportedFormat(path.display().to_string()))?;

        match format {
            SourceFormat::Pdf | SourceFormat::Docx => {
                Err(KontextError::UnsupportedFormat(format!(
                    "{} ({} extraction is not built in)",
                    path.display(),
                    format
                )))
            }
            SourceFormat::Txt | SourceFormat::Markdown => {
                let bytes = tokio::fs::read(path).await?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                String::from_utf8(bytes).map_err(|e| {
                    KontextError::Extraction(format!("{} is not UTF-8: {}", path.display(), e))
                })
            }
            SourceFormat::Html => {
                let bytes = tokio::fs::read(path).await?;
                let html = String::from_utf8(bytes).map_err(|e| {
                    KontextError::Extraction(format!("{} is not UTF-8: {}", path.display(), e))
                })?;
                Ok(html_to_text(&html))
            }
        }
    }
}
