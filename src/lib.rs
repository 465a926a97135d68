//! mdxlsx - Pure-Rust Markdown to Excel converter
//!
//! This crate converts GitHub-flavored Markdown into an Excel workbook (XLSX),
//! laying out headings, lists, quotes and code blocks row by row, turning tables into
//! typed cells (numbers, percentages, currencies, dates, booleans and formulas),
//! and rendering `chart` / `mermaid` fences into embedded images.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mdxlsx::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     let markdown = std::fs::read_to_string("report.md")?;
//!
//!     // Convert Markdown to report.xlsx (images go to report_ChartsAndDiagrams/)
//!     let report = converter.convert(&markdown, "report.xlsx")?;
//!     println!("{} sheets, {} images", report.sheet_count, report.images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Tables and Formulas
//!
//! Table cells are type-inferred, and header names steer the display format
//! (`Rate` columns become percentages, `Amount` columns currency, `Code` columns text).
//! Formulas are written as if the table started at row 1 and are shifted to the table's
//! actual position in the sheet:
//!
//! ```text
//! | Item  | Qty | Price | Total  |
//! |-------|-----|-------|--------|
//! | Paper | 2   | $3.50 | =B2*C2 |
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mdxlsx::{ConverterBuilder, DiagramSupport, RenderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let render = RenderConfig {
//!         diagram_endpoint: "http://localhost:8000".to_string(),
//!         timeout: Duration::from_secs(10),
//!         diagram_support: DiagramSupport::Enabled,
//!         ..RenderConfig::default()
//!     };
//!
//!     let converter = ConverterBuilder::new()
//!         .with_render_config(render)
//!         .with_parallel_rendering(true)  // render charts concurrently
//!         .with_sidecar_dir_name("figures")
//!         .build()?;
//!
//!     converter.convert("# Title\n<pbreak>\nSecond sheet", "out.xlsx")?;
//!     Ok(())
//! }
//! ```
//!
//! # Extracting Excel Fences
//!
//! ```rust,no_run
//! use mdxlsx::{extract_excel_fences, ConverterBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new().build()?;
//!     let text = "Here is the data:\n```excel\n| A | B |\n|---|---|\n| 1 | =A2*2 |\n```\n";
//!
//!     // Writes out/answer_excel_1.xlsx and removes the fence from the text
//!     let extracted = extract_excel_fences(&converter, text, "out", "answer", true)?;
//!     println!("{}", extracted.markdown);
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
mod extract;
mod format;
mod formula;
mod inference;
mod layout;
mod output;
mod parser;
mod render;
mod security;
mod sidecar;
mod types;
mod workbook;

// 公開API
pub use api::{
    ConversionMode, DiagramSupport, ImageKind, RenderConfig, DEFAULT_CHART_ENDPOINT,
    DEFAULT_DIAGRAM_ENDPOINT, DEFAULT_DIAGRAM_FALLBACK_ENDPOINT,
};
pub use builder::{ConversionReport, Converter, ConverterBuilder};
pub use error::MdToXlsxError;
pub use extract::{extract_excel_fences, ExtractedFences};
pub use render::{FenceRenderer, HttpRenderer, ImageFormatKind, RenderError, RenderedImage};
