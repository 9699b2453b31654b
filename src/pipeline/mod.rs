//! Pipeline stages for worksheet-to-LaTeX conversion.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ assemble ──▶ latex ──▶ references ──▶ postprocess
//! (path/URL) (scraper)  (markup,     (preamble, (bibliography)  (cleanup)
//!                        images)      sections)
//! ```
//!
//! 1. [`input`]    read the page from disk or over HTTP
//! 2. [`source`]   scrape the page into a typed [`source::BookSource`]
//! 3. [`assemble`] walk the menu, pair entries with worksheets and render
//!    every element; [`markup`] and [`images`] do the per-element work,
//!    [`escape`] guards raw text
//! 4. [`latex`]    preamble, title block and the section tree
//! 5. [`references`] citation numbers and the bibliography
//! 6. [`postprocess`] whitespace cleanup of the final text

pub mod assemble;
pub mod escape;
pub mod images;
pub mod input;
pub mod latex;
pub mod markup;
pub mod postprocess;
pub mod references;
pub mod source;
