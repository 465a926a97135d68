//! Layout Engine Module
//!
//! ブロック列をワークブックへの書き込みに変換するモジュール。
//!
//! 行カーソル、リストの番号カウンター、画像種別ごとの連番は[`LayoutState`]に集約され、
//! ブロックの処理順に更新されます。チャート・ダイアグラムの描画失敗や
//! サイドカー画像の保存失敗は、フェンス本文をコードブロックとして書き込むことで縮退します。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::api::ImageKind;
use crate::format::NumberFormat;
use crate::formula::smart_rebase;
use crate::inference::CellInferencer;
use crate::parser::{is_aggregate_row, parse_emphasis, Block, ColumnRole, ListMarker, Table};
use crate::render::{FenceRenderer, RenderError, RenderedImage};
use crate::sidecar;
use crate::types::{CellStyle, CellValue, HorizontalAlign, InferredCell};
use crate::workbook::{Workbook, MAX_COLUMNS};

/// 見出しレベル1〜6のフォントサイズ（ポイント）
const HEADING_SIZES: [u8; 6] = [20, 18, 16, 14, 12, 11];

const HEADING_COLOR: u32 = 0x002366;
const QUOTE_COLOR: u32 = 0x555555;
const TABLE_HEADER_FILL: u32 = 0xDDDDDD;
const CODE_FILL: u32 = 0xE0E0E0;
const CODE_FONT: &str = "Consolas";
const CODE_FONT_SIZE: u8 = 10;

/// 画像の高さ（ピクセル）を行数に換算する係数
const IMAGE_PIXELS_PER_ROW: u32 = 15;

/// Excelの行の高さの上限（ポイント）
const MAX_ROW_HEIGHT: f64 = 409.0;

const BULLET: &str = "\u{2022}";

/// レイアウトの状態
///
/// シート分割や空行で一部がリセットされます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayoutState {
    /// 次に書き込む行（1始まり）
    pub row: u32,

    /// インデントレベルごとの番号付きリストの次の番号
    pub list_counters: BTreeMap<usize, u32>,

    /// チャートの連番
    pub chart_count: u32,

    /// ダイアグラムの連番
    pub mermaid_count: u32,
}

impl LayoutState {
    pub fn new() -> Self {
        Self {
            row: 1,
            list_counters: BTreeMap::new(),
            chart_count: 0,
            mermaid_count: 0,
        }
    }

    /// 行カーソルを進める
    fn advance(&mut self, rows: u32) {
        self.row = self.row.saturating_add(rows);
    }

    /// 画像種別の連番を1つ進め、新しい番号を返す
    fn next_image_index(&mut self, kind: ImageKind) -> u32 {
        let counter = match kind {
            ImageKind::Chart => &mut self.chart_count,
            ImageKind::Mermaid => &mut self.mermaid_count,
        };
        *counter += 1;
        *counter
    }

    /// 番号付きリストの番号を取得し、より深いレベルのカウンターを破棄
    fn next_list_number(&mut self, level: usize) -> u32 {
        let counter = self.list_counters.entry(level).or_insert(1);
        let number = *counter;
        *counter += 1;
        self.list_counters.retain(|&l, _| l <= level);
        number
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

/// レイアウトの結果
#[derive(Debug)]
pub(crate) struct LayoutOutcome {
    pub workbook: Workbook,

    /// 保存したサイドカー画像のパス（配置順）
    pub images: Vec<PathBuf>,

    /// コードブロックとして縮退したチャート・ダイアグラムの数
    pub degraded_fences: usize,
}

/// レイアウトエンジン
///
/// 1回の変換ごとに生成され、ブロック列を先頭から順に処理します。
pub(crate) struct LayoutEngine<'a> {
    inferencer: &'a CellInferencer,
    renderer: &'a dyn FenceRenderer,
    artifact_path: &'a Path,
    sidecar_dir_name: Option<&'a str>,

    /// 事前描画の結果（ブロックのインデックス -> 描画結果）
    prerendered: HashMap<usize, Result<RenderedImage, RenderError>>,

    state: LayoutState,
    workbook: Workbook,
    images: Vec<PathBuf>,
    degraded_fences: usize,
}

impl<'a> LayoutEngine<'a> {
    /// 新しいレイアウトエンジンを生成
    ///
    /// # 引数
    ///
    /// * `artifact_path` - ワークブックの出力パス（サイドカー画像の配置先の基準）
    /// * `sidecar_dir_name` - サイドカーディレクトリ名（`None`の場合は既定値）
    pub fn new(
        inferencer: &'a CellInferencer,
        renderer: &'a dyn FenceRenderer,
        artifact_path: &'a Path,
        sidecar_dir_name: Option<&'a str>,
    ) -> Self {
        Self {
            inferencer,
            renderer,
            artifact_path,
            sidecar_dir_name,
            prerendered: HashMap::new(),
            state: LayoutState::new(),
            workbook: Workbook::new(),
            images: Vec::new(),
            degraded_fences: 0,
        }
    }

    /// チャート・ダイアグラムのフェンスを並列に描画
    ///
    /// 結果はブロックのインデックスで保持され、配置は[`layout`](Self::layout)で
    /// 元のブロック順に行われます。
    pub fn prerender(&mut self, blocks: &[Block]) {
        let renderer = self.renderer;
        let results: Vec<(usize, Result<RenderedImage, RenderError>)> = blocks
            .par_iter()
            .enumerate()
            .filter_map(|(index, block)| {
                image_fence(block).map(|(kind, source)| (index, renderer.render(kind, source)))
            })
            .collect();

        log::debug!("Pre-rendered {} fences", results.len());
        self.prerendered.extend(results);
    }

    /// ブロック列をワークブックに配置
    pub fn layout(mut self, blocks: &[Block]) -> LayoutOutcome {
        for (index, block) in blocks.iter().enumerate() {
            self.apply(index, block);
        }

        LayoutOutcome {
            workbook: self.workbook,
            images: self.images,
            degraded_fences: self.degraded_fences,
        }
    }

    fn apply(&mut self, index: usize, block: &Block) {
        match block {
            Block::Heading { level, text } => self.write_heading(*level, text),
            Block::Paragraph(text) => self.write_paragraph(text),
            Block::ListItem {
                level,
                marker,
                text,
            } => self.write_list_item(*level, *marker, text),
            Block::BlockQuote { level, text } => self.write_quote(*level, text),
            Block::Table(table) => self.write_table(table),
            Block::CodeFence {
                language,
                body,
                closed,
            } => match ImageKind::from_fence_language(language).filter(|_| *closed) {
                Some(kind) => self.place_image(index, kind, body),
                None => self.write_code_block(body),
            },
            Block::HorizontalRule => self.write_rule(),
            Block::PageBreak => self.break_page(),
            Block::Blank => {
                self.state.advance(1);
                self.state.list_counters.clear();
            }
        }
    }

    fn write_cell(&mut self, col: u32, value: CellValue, style: CellStyle) {
        let row = self.state.row;
        self.workbook
            .current_sheet_mut()
            .write(row, col, value, style);
    }

    fn write_heading(&mut self, level: usize, text: &str) {
        let size = HEADING_SIZES[level.clamp(1, HEADING_SIZES.len()) - 1];
        let style = CellStyle {
            bold: true,
            font_size: Some(size),
            font_color: Some(HEADING_COLOR),
            ..CellStyle::default()
        };
        self.write_cell(1, CellValue::String(text.to_string()), style);
        self.state.advance(1);
        self.state.list_counters.clear();
    }

    fn write_paragraph(&mut self, text: &str) {
        let InferredCell { value, format } = self.inferencer.infer(text, 0);
        let style = CellStyle {
            num_format: format.map(|f| f.code().to_string()),
            ..CellStyle::wrapped()
        };
        self.write_cell(1, value, style);
        self.state.advance(1);
        self.state.list_counters.clear();
    }

    fn write_list_item(&mut self, level: usize, marker: ListMarker, text: &str) {
        let content = match marker {
            ListMarker::Ordered => {
                let number = self.state.next_list_number(level);
                format!("{}. {}", number, text)
            }
            ListMarker::Bullet => format!("{} {}", BULLET, text),
        };
        let col = clamp_column(level.saturating_add(1), "list item");
        self.write_cell(col, CellValue::String(content), CellStyle::wrapped());
        self.state.advance(1);
    }

    fn write_quote(&mut self, level: usize, text: &str) {
        let style = CellStyle {
            italic: true,
            font_color: Some(QUOTE_COLOR),
            ..CellStyle::wrapped()
        };
        let col = clamp_column(level, "block quote");
        self.write_cell(col, CellValue::String(text.to_string()), style);
        self.state.advance(1);
    }

    fn write_code_block(&mut self, body: &str) {
        let style = CellStyle {
            font_name: Some(CODE_FONT),
            font_size: Some(CODE_FONT_SIZE),
            fill: Some(CODE_FILL),
            ..CellStyle::wrapped()
        };
        self.write_cell(1, CellValue::String(body.to_string()), style);
        self.state.advance(1);
    }

    fn write_rule(&mut self) {
        let style = CellStyle {
            bottom_border: true,
            ..CellStyle::default()
        };
        self.write_cell(1, CellValue::Empty, style);
        self.state.advance(1);
    }

    fn break_page(&mut self) {
        let name = self.workbook.add_sheet().name().to_string();
        log::debug!("Page break: continuing on {}", name);
        self.state.row = 1;
        self.state.list_counters.clear();
    }

    /// テーブルを書き込む
    ///
    /// データ行の数式は、テーブルが1行目から始まる前提で書かれたものとして
    /// 実際の位置にずらされます。
    fn write_table(&mut self, table: &Table) {
        if table.headers.len() > MAX_COLUMNS as usize {
            log::warn!(
                "Table has {} columns; columns past {} are dropped",
                table.headers.len(),
                MAX_COLUMNS
            );
        }
        let start_row = self.state.row;
        let base_offset = start_row - 1;
        let roles = ColumnRole::classify_all(&table.headers);

        let header_style = CellStyle {
            bold: true,
            fill: Some(TABLE_HEADER_FILL),
            align: Some(HorizontalAlign::Center),
            ..CellStyle::wrapped()
        };
        let sheet = self.workbook.current_sheet_mut();
        for (col, header) in (1..=MAX_COLUMNS).zip(&table.headers) {
            sheet.write(
                start_row,
                col,
                CellValue::String(header.clone()),
                header_style.clone(),
            );
        }

        for (row, cells) in (start_row + 1..).zip(&table.rows) {
            if is_aggregate_row(cells) {
                log::debug!("Aggregate row at {}", row);
            }
            for ((col, raw), role) in (1..=MAX_COLUMNS).zip(cells).zip(&roles) {
                let (value, style) = self.table_cell(raw, *role, base_offset, row);
                self.workbook
                    .current_sheet_mut()
                    .write(row, col, value, style);
            }
        }

        let rows = u32::try_from(table.rows.len()).unwrap_or(u32::MAX);
        self.state.advance(rows.saturating_add(1));
        self.state.list_counters.clear();
    }

    /// テーブルのデータセルの値とスタイルを決定
    fn table_cell(
        &self,
        raw: &str,
        role: ColumnRole,
        base_offset: u32,
        row: u32,
    ) -> (CellValue, CellStyle) {
        let (mut value, mut format, emphasis) = match parse_emphasis(raw) {
            Some((text, emphasis)) => (CellValue::String(text), None, emphasis),
            None => {
                let InferredCell { value, format } = self.inferencer.infer(raw, base_offset);
                (value, format, Default::default())
            }
        };

        if let CellValue::Formula(formula) = &value {
            value = CellValue::Formula(smart_rebase(formula, row));
        }

        if role.percent {
            format = Some(NumberFormat::percent_two_decimals());
        }
        if role.currency {
            let inject = match &format {
                None => true,
                Some(f) => {
                    !f.has_percent() && f.is_numeric() && !f.has_currency_symbol()
                }
            };
            if inject {
                format = Some(NumberFormat::currency_default());
            }
        }
        if role.text && !value.is_formula() {
            value = CellValue::String(value.as_raw_string());
            format = Some(NumberFormat::text());
        }

        let right = matches!(value, CellValue::Number(_) | CellValue::Formula(_))
            || format
                .as_ref()
                .is_some_and(NumberFormat::suggests_right_alignment);

        let style = CellStyle {
            bold: emphasis.bold,
            italic: emphasis.italic,
            align: Some(if right {
                HorizontalAlign::Right
            } else {
                HorizontalAlign::Left
            }),
            wrap: !right,
            num_format: format.map(|f| f.code().to_string()),
            ..CellStyle::default()
        };
        (value, style)
    }

    /// チャート・ダイアグラムを描画して配置
    ///
    /// 描画・画像の解釈・サイドカーへの保存のいずれかに失敗した場合は、
    /// フェンス本文をコードブロックとして書き込みます。
    fn place_image(&mut self, index: usize, kind: ImageKind, source: &str) {
        let rendered = match self.prerendered.remove(&index) {
            Some(result) => result,
            None => self.renderer.render(kind, source),
        };

        let image = match rendered {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Failed to render {} fence: {}", kind.as_str(), e);
                return self.degrade(source);
            }
        };

        let height = match rust_xlsxwriter::Image::new_from_buffer(image.bytes()) {
            Ok(decoded) => decoded.height(),
            Err(e) => {
                log::warn!("Rendered {} image is not embeddable: {}", kind.as_str(), e);
                return self.degrade(source);
            }
        };

        let image_index = self.state.next_image_index(kind);
        let path = match sidecar::save_image(
            image.bytes(),
            self.artifact_path,
            self.sidecar_dir_name,
            kind,
            image_index,
        ) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Failed to save {} image: {}", kind.as_str(), e);
                return self.degrade(source);
            }
        };

        let row = self.state.row;
        let sheet = self.workbook.current_sheet_mut();
        sheet.insert_image(row, 1, image.into_bytes());
        sheet.set_row_height(row, (height * 0.75 / 1.5).min(MAX_ROW_HEIGHT));
        log::debug!(
            "Placed {} image at row {} ({} px high)",
            kind.as_str(),
            row,
            height
        );

        self.images.push(path);
        self.state.advance(height as u32 / IMAGE_PIXELS_PER_ROW + 1);
    }

    fn degrade(&mut self, source: &str) {
        self.degraded_fences += 1;
        self.write_code_block(source);
    }
}

/// インデントから求めた列をExcelの最終列に収める
fn clamp_column(col: usize, what: &str) -> u32 {
    match u32::try_from(col) {
        Ok(col) if col <= MAX_COLUMNS => col.max(1),
        _ => {
            log::warn!(
                "{} nested {} columns deep; placing it in the last column",
                what,
                col
            );
            MAX_COLUMNS
        }
    }
}

/// 描画対象のフェンス（閉じられたチャート・ダイアグラム）かどうか
fn image_fence(block: &Block) -> Option<(ImageKind, &str)> {
    match block {
        Block::CodeFence {
            language,
            body,
            closed: true,
        } => ImageKind::from_fence_language(language).map(|kind| (kind, body.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BlockParser;
    use crate::types::CellCoord;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 指定した高さのPNGを返す描画実装
    struct FakeRenderer {
        height: u32,
        calls: AtomicUsize,
    }

    impl FakeRenderer {
        fn new(height: u32) -> Self {
            Self {
                height,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FenceRenderer for FakeRenderer {
        fn render(&self, _kind: ImageKind, source: &str) -> Result<RenderedImage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source.contains("broken") {
                return Err(RenderError::Status(500));
            }
            let image = RgbaImage::from_pixel(20, self.height, Rgba([0, 128, 255, 255]));
            let mut out = Cursor::new(Vec::new());
            image.write_to(&mut out, ImageFormat::Png).unwrap();
            Ok(RenderedImage::new(out.into_inner()))
        }
    }

    struct Fixture {
        dir: TempDir,
        inferencer: CellInferencer,
        renderer: FakeRenderer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                inferencer: CellInferencer::new(),
                renderer: FakeRenderer::new(60),
            }
        }

        fn artifact(&self) -> PathBuf {
            self.dir.path().join("doc.xlsx")
        }

        fn run(&self, markdown: &str, parallel: bool) -> LayoutOutcome {
            let artifact = self.artifact();
            let blocks = BlockParser::parse(markdown);
            let mut engine = LayoutEngine::new(&self.inferencer, &self.renderer, &artifact, None);
            if parallel {
                engine.prerender(&blocks);
            }
            engine.layout(&blocks)
        }
    }

    fn value_at(outcome: &LayoutOutcome, sheet: usize, row: u32, col: u32) -> Option<CellValue> {
        outcome.workbook.sheets()[sheet]
            .cell(CellCoord::from_excel(row, col))
            .map(|c| c.value.clone())
    }

    fn string(s: &str) -> Option<CellValue> {
        Some(CellValue::String(s.to_string()))
    }

    #[test]
    fn test_heading_and_paragraph() {
        let fixture = Fixture::new();
        let outcome = fixture.run("# Title\nplain text\n42", false);

        assert_eq!(value_at(&outcome, 0, 1, 1), string("Title"));
        let heading = outcome.workbook.sheets()[0]
            .cell(CellCoord::new(0, 0))
            .unwrap();
        assert!(heading.style.bold);
        assert_eq!(heading.style.font_size, Some(20));
        assert_eq!(heading.style.font_color, Some(0x002366));

        assert_eq!(value_at(&outcome, 0, 2, 1), string("plain text"));
        assert_eq!(value_at(&outcome, 0, 3, 1), Some(CellValue::Number(42.0)));
    }

    #[test]
    fn test_list_numbering() {
        let fixture = Fixture::new();
        let markdown = "1. a\n1. b\n  1. c\n  1. d\n1. e\n  1. f\n- g\n\n1. h";
        let outcome = fixture.run(markdown, false);

        assert_eq!(value_at(&outcome, 0, 1, 1), string("1. a"));
        assert_eq!(value_at(&outcome, 0, 2, 1), string("2. b"));
        assert_eq!(value_at(&outcome, 0, 3, 2), string("1. c"));
        assert_eq!(value_at(&outcome, 0, 4, 2), string("2. d"));
        assert_eq!(value_at(&outcome, 0, 5, 1), string("3. e"));
        // 上位レベルの項目で下位レベルの番号はリセットされる
        assert_eq!(value_at(&outcome, 0, 6, 2), string("1. f"));
        assert_eq!(value_at(&outcome, 0, 7, 1), string("\u{2022} g"));
        // 空行で番号はリセットされる
        assert_eq!(value_at(&outcome, 0, 9, 1), string("1. h"));
    }

    #[test]
    fn test_quote_column_follows_level() {
        let fixture = Fixture::new();
        let outcome = fixture.run("> one\n>> two", false);

        let one = outcome.workbook.sheets()[0]
            .cell(CellCoord::from_excel(1, 1))
            .unwrap();
        assert!(one.style.italic);
        assert_eq!(value_at(&outcome, 0, 2, 2), string("two"));
    }

    #[test]
    fn test_deep_nesting_stays_in_last_column() {
        let fixture = Fixture::new();
        let markdown = format!("{}- deep\n{} quoted", " ".repeat(40_000), ">".repeat(20_000));
        let outcome = fixture.run(&markdown, false);

        assert_eq!(value_at(&outcome, 0, 1, 16_384), string("\u{2022} deep"));
        assert_eq!(value_at(&outcome, 0, 2, 16_384), string("quoted"));
        assert_eq!(outcome.workbook.sheets()[0].column_widths().len(), 16_384);
    }

    #[test]
    fn test_clamp_column() {
        assert_eq!(clamp_column(0, "quote"), 1);
        assert_eq!(clamp_column(3, "list"), 3);
        assert_eq!(clamp_column(16_384, "list"), 16_384);
        assert_eq!(clamp_column(16_385, "list"), 16_384);
        assert_eq!(clamp_column(usize::MAX, "list"), 16_384);
    }

    #[test]
    fn test_page_break_resets_cursor() {
        let fixture = Fixture::new();
        let outcome = fixture.run("a\nb\n<pbreak>\nc", false);

        let sheets = outcome.workbook.sheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name(), "Sheet2");
        assert_eq!(value_at(&outcome, 1, 1, 1), string("c"));
    }

    #[test]
    fn test_table_formula_rebased_to_actual_row() {
        let fixture = Fixture::new();
        let mut markdown = String::new();
        for i in 0..6 {
            markdown.push_str(&format!("line {}\n", i));
        }
        markdown.push('\n');
        // ヘッダーは8行目
        markdown.push_str("| Item | Qty | Price |\n|---|---|---|\n| A | 2 | 3 |\n| B | 4 | =B2*C2 |\n");
        let outcome = fixture.run(&markdown, false);

        assert_eq!(value_at(&outcome, 0, 8, 1), string("Item"));
        assert_eq!(
            value_at(&outcome, 0, 10, 3),
            Some(CellValue::Formula("=B10*C10".to_string()))
        );
    }

    #[test]
    fn test_table_roles_and_emphasis() {
        let fixture = Fixture::new();
        let markdown = "| Name | Rate | Amount | Code |\n|---|---|---|---|\n| **Total** | 12.5% | 1,200 | 00123 |";
        let outcome = fixture.run(markdown, false);
        let sheet = &outcome.workbook.sheets()[0];

        let name = sheet.cell(CellCoord::from_excel(2, 1)).unwrap();
        assert_eq!(name.value, CellValue::String("Total".to_string()));
        assert!(name.style.bold);

        let rate = sheet.cell(CellCoord::from_excel(2, 2)).unwrap();
        assert_eq!(rate.value, CellValue::Number(0.125));
        assert_eq!(rate.style.num_format.as_deref(), Some("0.00%"));
        assert_eq!(rate.style.align, Some(HorizontalAlign::Right));

        let amount = sheet.cell(CellCoord::from_excel(2, 3)).unwrap();
        assert_eq!(amount.value, CellValue::Number(1200.0));
        assert_eq!(amount.style.num_format.as_deref(), Some("$#,##0.00"));

        let code = sheet.cell(CellCoord::from_excel(2, 4)).unwrap();
        assert_eq!(code.value, CellValue::String("123".to_string()));
        assert_eq!(code.style.num_format.as_deref(), Some("@"));
        assert_eq!(code.style.align, Some(HorizontalAlign::Left));
        assert!(code.style.wrap);

        let header = sheet.cell(CellCoord::from_excel(1, 1)).unwrap();
        assert_eq!(header.style.align, Some(HorizontalAlign::Center));
        assert_eq!(header.style.fill, Some(0xDDDDDD));
    }

    #[test]
    fn test_text_column_keeps_excel_boolean_spelling() {
        let fixture = Fixture::new();
        let outcome = fixture.run("| Code | Flag |\n|---|---|\n| yes | no |", false);
        let sheet = &outcome.workbook.sheets()[0];

        let code = sheet.cell(CellCoord::from_excel(2, 1)).unwrap();
        assert_eq!(code.value, CellValue::String("TRUE".to_string()));
        assert_eq!(code.style.num_format.as_deref(), Some("@"));

        let flag = sheet.cell(CellCoord::from_excel(2, 2)).unwrap();
        assert_eq!(flag.value, CellValue::Bool(false));
    }

    #[test]
    fn test_chart_fence_placed_as_image() {
        let fixture = Fixture::new();
        let outcome = fixture.run("```chart\n{}\n```\nafter", false);

        assert_eq!(outcome.images.len(), 1);
        assert!(outcome.images[0].ends_with("doc_chart_001.png"));
        assert!(outcome.images[0].exists());
        assert_eq!(outcome.degraded_fences, 0);

        let sheet = &outcome.workbook.sheets()[0];
        assert_eq!(sheet.images()[0].coord, CellCoord::new(0, 0));
        assert_eq!(sheet.row_heights().get(&0), Some(&30.0));
        // 60px / 15 + 1 = 5行
        assert_eq!(value_at(&outcome, 0, 6, 1), string("after"));
    }

    #[test]
    fn test_failed_render_degrades_to_code_block() {
        let fixture = Fixture::new();
        let outcome = fixture.run("```mermaid\nbroken\n```\nafter", false);

        assert!(outcome.images.is_empty());
        assert_eq!(outcome.degraded_fences, 1);
        let code = outcome.workbook.sheets()[0]
            .cell(CellCoord::new(0, 0))
            .unwrap();
        assert_eq!(code.value, CellValue::String("broken".to_string()));
        assert_eq!(code.style.font_name, Some("Consolas"));
        assert_eq!(value_at(&outcome, 0, 2, 1), string("after"));
    }

    #[test]
    fn test_unclosed_fence_is_code_block() {
        let fixture = Fixture::new();
        let outcome = fixture.run("```chart\n{}", false);

        assert_eq!(fixture.renderer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(value_at(&outcome, 0, 1, 1), string("{}"));
    }

    #[test]
    fn test_prerender_keeps_block_order() {
        let fixture = Fixture::new();
        let markdown = "```chart\n1\n```\n```mermaid\n2\n```\n```chart\n3\n```";
        let outcome = fixture.run(markdown, true);

        assert_eq!(fixture.renderer.calls.load(Ordering::SeqCst), 3);
        let names: Vec<String> = outcome
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["doc_chart_001.png", "doc_mermaid_001.png", "doc_chart_002.png"]
        );
        let rows: Vec<u32> = outcome.workbook.sheets()[0]
            .images()
            .iter()
            .map(|i| i.coord.row)
            .collect();
        assert_eq!(rows, vec![0, 5, 10]);
    }

    #[test]
    fn test_layout_state_list_counters() {
        let mut state = LayoutState::new();
        assert_eq!(state.next_list_number(0), 1);
        assert_eq!(state.next_list_number(1), 1);
        assert_eq!(state.next_list_number(1), 2);
        assert_eq!(state.next_list_number(0), 2);
        assert!(!state.list_counters.contains_key(&1));
    }
}
