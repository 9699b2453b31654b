//! Conversion results.
//!
//! Everything here derives `Serialize` so the CLI can print a machine-
//! readable summary with `--json`.

use crate::pipeline::assemble::{Document, Layout};
use crate::pipeline::images::ImageStats;
use crate::pipeline::references::ReferenceEntry;
use serde::Serialize;

/// The result of converting one worksheet book.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Complete LaTeX source, ending in `\end{document}`.
    pub latex: String,
    pub metadata: DocumentMetadata,
    /// Bibliography entries in citation order. Empty when references are
    /// disabled or the book has no links.
    pub references: Vec<ReferenceEntry>,
    pub stats: ConversionStats,
}

/// What the page said about itself, as it appears in the output.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub date: String,
    pub layout: Layout,
    pub sections: usize,
    pub subsections: usize,
}

impl DocumentMetadata {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            author: doc.author_name.clone(),
            date: doc.date.clone(),
            layout: doc.layout,
            sections: doc.sections.iter().filter(|s| s.title.is_some()).count(),
            subsections: doc.sections.iter().map(|s| s.subsections.len()).sum(),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub worksheets: usize,
    pub elements: usize,
    /// Elements of a kind the converter does not render.
    pub unsupported_elements: usize,
    /// Sub-entries left empty because the worksheets ran out.
    pub empty_subsections: usize,
    /// Worksheets that no sub-entry claimed.
    pub unused_worksheets: usize,
    pub references: usize,
    pub images: ImageStats,
    pub total_duration_ms: u64,
}
