//! Boundary Tests for mdxlsx
//!
//! Degenerate and malformed inputs: empty documents, broken tables,
//! unterminated fences, oversized cells and invalid output locations.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use mdxlsx::{
    ConverterBuilder, FenceRenderer, ImageKind, MdToXlsxError, RenderError, RenderedImage,
};
use std::io::Cursor;
use std::sync::Arc;

// Helper module for offline conversion
mod fixtures {
    use super::*;

    /// Rejects every fence so tests never touch the network
    pub struct Offline;

    impl FenceRenderer for Offline {
        fn render(&self, _kind: ImageKind, _source: &str) -> Result<RenderedImage, RenderError> {
            Err(RenderError::Unavailable)
        }
    }

    /// Convert to an in-memory workbook and return the used range of Sheet1
    pub fn convert(markdown: &str) -> calamine::Range<Data> {
        let converter = ConverterBuilder::new()
            .with_renderer(Arc::new(Offline))
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (bytes, _) = converter
            .convert_to_buffer(markdown, dir.path().join("out.xlsx"))
            .unwrap();
        let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        xlsx.worksheet_range("Sheet1").unwrap()
    }

    /// Cell value at a 0-based (row, column) position
    pub fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> Data {
        range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
    }

    pub fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }
}

#[test]
fn test_empty_document() {
    let range = fixtures::convert("");
    assert!(range.is_empty());
}

#[test]
fn test_blank_lines_only() {
    let range = fixtures::convert("\n\n\r\n   \n");
    assert!(range.is_empty());
}

#[test]
fn test_header_only_table_is_paragraph() {
    let range = fixtures::convert("| a | b |\nnext");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("| a | b |"));
    assert_eq!(fixtures::cell(&range, 1, 0), fixtures::text("next"));
}

#[test]
fn test_table_with_only_mismatched_rows_is_paragraph() {
    let range = fixtures::convert("| a | b |\n|---|---|\n| 1 |\n| 1 | 2 | 3 |");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("| a | b |"));
}

#[test]
fn test_mismatched_rows_are_dropped() {
    let range = fixtures::convert("| a | b |\n|---|---|\n| 1 | 2 |\n| short |\n| 3 | 4 |\nafter");
    assert_eq!(fixtures::cell(&range, 1, 0), Data::Float(1.0));
    assert_eq!(fixtures::cell(&range, 2, 0), Data::Float(3.0));
    assert_eq!(fixtures::cell(&range, 3, 0), fixtures::text("after"));
}

#[test]
fn test_table_without_separator_row() {
    let range = fixtures::convert("| a | b |\n| 1 | 2 |");
    assert_eq!(fixtures::cell(&range, 0, 1), fixtures::text("b"));
    assert_eq!(fixtures::cell(&range, 1, 1), Data::Float(2.0));
}

#[test]
fn test_unclosed_fence_is_kept() {
    let range = fixtures::convert("before\n```python\nprint(1)\nprint(2)");
    assert_eq!(fixtures::cell(&range, 1, 0), fixtures::text("print(1)\nprint(2)"));
}

#[test]
fn test_unclosed_empty_fence_is_dropped() {
    let range = fixtures::convert("before\n```");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("before"));
    assert_eq!(fixtures::cell(&range, 1, 0), Data::Empty);
}

#[test]
fn test_crlf_input() {
    let range = fixtures::convert("# Title\r\n\r\n| a | b |\r\n|---|---|\r\n| 1 | 2 |\r\n");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("Title"));
    assert_eq!(fixtures::cell(&range, 3, 1), Data::Float(2.0));
}

#[test]
fn test_oversized_cell_is_truncated() {
    let long = "x".repeat(40_000);
    let range = fixtures::convert(&long);
    match fixtures::cell(&range, 0, 0) {
        Data::String(s) => assert_eq!(s.chars().count(), 32_767),
        other => panic!("Expected truncated string, got {:?}", other),
    }
}

#[test]
fn test_date_before_1900_is_text() {
    let range = fixtures::convert("1850-06-01");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("1850-06-01"));
}

#[test]
fn test_invalid_calendar_date_is_text() {
    let range = fixtures::convert("2024-02-30");
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("2024-02-30"));
}

#[test]
fn test_output_path_without_file_name() {
    let converter = ConverterBuilder::new()
        .with_renderer(Arc::new(fixtures::Offline))
        .build()
        .unwrap();
    let result = converter.convert("text", "/");
    assert!(matches!(result, Err(MdToXlsxError::OutputPath(_))));
}

#[test]
fn test_unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let converter = ConverterBuilder::new()
        .with_renderer(Arc::new(fixtures::Offline))
        .build()
        .unwrap();
    let result = converter.convert("text", dir.path().join("missing").join("out.xlsx"));
    assert!(matches!(
        result,
        Err(MdToXlsxError::Xlsx(_)) | Err(MdToXlsxError::Io(_))
    ));
}

#[test]
fn test_sidecar_dir_traversal_rejected() {
    let result = ConverterBuilder::new()
        .with_sidecar_dir_name("../escape")
        .build();
    assert!(matches!(result, Err(MdToXlsxError::Config(_))));
}

#[test]
fn test_deep_list_indent_does_not_fail_conversion() {
    let markdown = format!("# Title\n{}- deep item\nafter", " ".repeat(40_000));
    let range = fixtures::convert(&markdown);
    assert_eq!(fixtures::cell(&range, 0, 0), fixtures::text("Title"));
    assert_eq!(fixtures::cell(&range, 1, 16_383), fixtures::text("\u{2022} deep item"));
    assert_eq!(fixtures::cell(&range, 2, 0), fixtures::text("after"));
}

#[test]
fn test_deep_quote_nesting_does_not_fail_conversion() {
    let markdown = format!("{} quoted\nafter", ">".repeat(20_000));
    let range = fixtures::convert(&markdown);
    assert_eq!(fixtures::cell(&range, 0, 16_383), fixtures::text("quoted"));
    assert_eq!(fixtures::cell(&range, 1, 0), fixtures::text("after"));
}
