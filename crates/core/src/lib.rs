//! Core library for quizpdf
//!
//! This crate implements the **Functional Core** of quizpdf: it turns the
//! positioned glyphs and image regions of a PDF into ordered question blocks,
//! each carrying its text, page, bounding box and the figures found inside it.
//!
//! # Architecture Overview
//!
//! quizpdf is split into three crates:
//!
//! - **`quizpdf_core`** (this crate): segmentation logic with zero I/O
//! - **`pdf`**: decoding of PDF pages into glyphs, image regions and rasters
//! - **`quizpdf`**: the command line shell that wires the two together and
//!   writes figures to disk
//!
//! The PDF decoder and the figure store are collaborators reached through the
//! traits in [`source`]. Everything here can be exercised with in-memory
//! fixtures.
//!
//! # Module Organization
//!
//! - [`types`]: Shared value types (boxes, glyphs, lines, blocks, figures)
//! - [`geometry`]: Box union and overlap
//! - [`lines`]: Grouping glyphs into visual lines
//! - [`starts`]: Detecting question start lines and their boldness
//! - [`segment`]: Choosing boundaries and building per-page blocks
//! - [`figures`]: Associating image regions with blocks
//! - [`fallback`]: Splitting a plain transcript when layout finds nothing
//! - [`walker`]: Driving all of the above across a document
//! - [`config`]: Tunables (bold hints, start patterns, line quantum)
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use quizpdf_core::config::SegmenterConfig;
//! use quizpdf_core::walker::walk;
//!
//! let config = SegmenterConfig::default();
//! let extraction = walk(&document, &mut store, &config)?;
//!
//! for block in &extraction.blocks {
//!     println!("{:?}: {}", block.number, block.text);
//! }
//! ```

pub mod config;
pub mod fallback;
pub mod figures;
pub mod geometry;
pub mod lines;
pub mod segment;
pub mod source;
pub mod starts;
pub mod types;
pub mod walker;

#[cfg(test)]
mod fixtures;

pub use config::SegmenterConfig;
pub use source::{DocumentSource, FigureStore, PageSource};
pub use types::{BBox, Character, Figure, FigureKey, ImageRegion, Line, QuestionBlock};
pub use walker::{walk, Extraction, WalkError, Walker};
