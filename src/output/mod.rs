//! Output Module
//!
//! メモリ上のワークブックを`rust_xlsxwriter`でXLSX形式に書き出すモジュール。
//!
//! 列幅の設定、画像の埋め込み、Excelの制約（セル文字数の上限、1900年より前の日付）への
//! 対応はこのモジュールで行います。

mod styles;

use std::borrow::Cow;
use std::path::Path;

use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Image, Worksheet, XlsxError};

use crate::error::MdToXlsxError;
use crate::format::NumberFormat;
use crate::types::{CellCoord, CellStyle, CellValue};
use crate::workbook::{Sheet, Workbook, MAX_COLUMNS, MAX_ROWS};

use styles::StyleCache;

/// セルに格納できる最大文字数
const MAX_CELL_CHARS: usize = 32_767;

/// XLSX出力
#[derive(Debug)]
pub(crate) struct XlsxOutput {
    styles: StyleCache,
}

impl XlsxOutput {
    /// 新しい出力を生成（スタイルキャッシュは空の状態から始まる）
    pub fn new() -> Self {
        Self {
            styles: StyleCache::new(),
        }
    }

    /// ワークブックを`rust_xlsxwriter::Workbook`に変換
    pub fn build(
        &mut self,
        workbook: &Workbook,
    ) -> Result<rust_xlsxwriter::Workbook, MdToXlsxError> {
        let mut xlsx = rust_xlsxwriter::Workbook::new();
        for sheet in workbook.sheets() {
            let worksheet = xlsx.add_worksheet();
            worksheet.set_name(sheet.name())?;
            self.write_sheet(sheet, worksheet)?;
        }
        log::debug!(
            "Built workbook with {} sheets ({} distinct styles)",
            workbook.sheets().len(),
            self.styles.len()
        );
        Ok(xlsx)
    }

    /// ワークブックをファイルに保存
    pub fn save(&mut self, workbook: &Workbook, path: &Path) -> Result<(), MdToXlsxError> {
        let mut xlsx = self.build(workbook)?;
        xlsx.save(path).map_err(|e| {
            log::error!("Failed to save workbook to {}: {}", path.display(), e);
            MdToXlsxError::from(e)
        })
    }

    /// ワークブックをバイト列として出力
    pub fn to_buffer(&mut self, workbook: &Workbook) -> Result<Vec<u8>, MdToXlsxError> {
        let mut xlsx = self.build(workbook)?;
        Ok(xlsx.save_to_buffer()?)
    }

    fn write_sheet(
        &mut self,
        sheet: &Sheet,
        worksheet: &mut Worksheet,
    ) -> Result<(), MdToXlsxError> {
        let mut skipped = 0usize;
        for (coord, cell) in sheet.cells() {
            let Some(col) = column_index(coord) else {
                skipped += 1;
                continue;
            };
            self.write_value(worksheet, coord.row, col, &cell.value, &cell.style)?;
        }

        for (row, height) in sheet.row_heights().range(..MAX_ROWS) {
            worksheet.set_row_height(*row, *height)?;
        }

        for image in sheet.images() {
            let Some(col) = column_index(&image.coord) else {
                skipped += 1;
                continue;
            };
            let embedded = Image::new_from_buffer(&image.bytes)?;
            worksheet.insert_image(image.coord.row, col, &embedded)?;
        }

        if skipped > 0 {
            log::warn!(
                "{}: dropped {} cells outside the {} x {} sheet limits",
                sheet.name(),
                skipped,
                MAX_ROWS,
                MAX_COLUMNS
            );
        }

        for (col, width) in sheet.column_widths().into_iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;
            worksheet.set_column_width(col, width as f64)?;
        }

        Ok(())
    }

    fn write_value(
        &mut self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
        style: &CellStyle,
    ) -> Result<(), MdToXlsxError> {
        match value {
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row, col, *n, self.styles.format(style))?;
            }
            CellValue::String(s) => {
                let text = truncate_cell_text(s, row, col);
                worksheet.write_string_with_format(
                    row,
                    col,
                    text.as_ref(),
                    self.styles.format(style),
                )?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean_with_format(row, col, *b, self.styles.format(style))?;
            }
            CellValue::Date(date) => {
                match excel_date(date) {
                    Some(datetime) => {
                        let dated;
                        let style = if style.num_format.is_some() {
                            style
                        } else {
                            dated = CellStyle {
                                num_format: Some(NumberFormat::iso_date().code().to_string()),
                                ..style.clone()
                            };
                            &dated
                        };
                        worksheet.write_datetime_with_format(
                            row,
                            col,
                            &datetime,
                            self.styles.format(style),
                        )?;
                    }
                    None => {
                        let iso = date.format("%Y-%m-%d").to_string();
                        log::warn!(
                            "Date {} is outside the Excel date range; writing as text",
                            iso
                        );
                        worksheet.write_string_with_format(
                            row,
                            col,
                            &iso,
                            self.styles.format(style),
                        )?;
                    }
                }
            }
            CellValue::Formula(formula) => {
                worksheet.write_formula_with_format(
                    row,
                    col,
                    formula.as_str(),
                    self.styles.format(style),
                )?;
            }
            CellValue::Empty => {
                worksheet.write_blank(row, col, self.styles.format(style))?;
            }
        }
        Ok(())
    }
}

impl Default for XlsxOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// シートの範囲内であれば列番号を返す
fn column_index(coord: &CellCoord) -> Option<u16> {
    if coord.row >= MAX_ROWS || coord.col >= MAX_COLUMNS {
        return None;
    }
    u16::try_from(coord.col).ok()
}

/// Excelで表現できる日付（1900年以降）に変換
fn excel_date(date: &chrono::NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok().filter(|y| (1900..=9999).contains(y))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

/// セルの文字数上限を超える文字列を切り詰める
fn truncate_cell_text(text: &str, row: u32, col: u16) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!(
                "Truncating cell at row {}, column {} to {} characters",
                row + 1,
                col + 1,
                MAX_CELL_CHARS
            );
            Cow::Owned(text[..end].to_string())
        }
        None => Cow::Borrowed(text),
    }
}
