//! Workbook Module
//!
//! レイアウトエンジンが書き込むワークブックのメモリ上の表現を提供するモジュール。
//! シートごとにスパースなセル、画像、行の高さを保持し、
//! 保存前に列幅を計算します。

use std::collections::BTreeMap;

use unicode_width::UnicodeWidthStr;

use crate::types::{CellCoord, CellStyle, CellValue};

/// Excelの列数の上限
pub(crate) const MAX_COLUMNS: u32 = 16_384;

/// Excelの行数の上限
pub(crate) const MAX_ROWS: u32 = 1_048_576;

/// 列幅の最小値（文字数）
const MIN_COLUMN_WIDTH: usize = 10;

/// 列幅の最大値（文字数）
const MAX_COLUMN_WIDTH: usize = 60;

/// 列幅の余白（文字数）
const COLUMN_WIDTH_PADDING: usize = 2;

/// 値とスタイルを持つセル
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    /// 新しいセルを生成
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self { value, style }
    }
}

/// シートに配置された画像
#[derive(Debug, Clone)]
pub(crate) struct SheetImage {
    /// アンカー位置
    pub coord: CellCoord,

    /// 画像データ
    pub bytes: Vec<u8>,
}

/// ワークシート
#[derive(Debug, Clone)]
pub(crate) struct Sheet {
    name: String,

    /// セル（行優先で整列）
    cells: BTreeMap<CellCoord, Cell>,

    images: Vec<SheetImage>,

    /// 行の高さ（ポイント）
    row_heights: BTreeMap<u32, f64>,
}

impl Sheet {
    /// 空のシートを生成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            images: Vec::new(),
            row_heights: BTreeMap::new(),
        }
    }

    /// シート名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// セルに書き込む（行・列は1始まり）
    ///
    /// 同じ座標への再書き込みは前の値を上書きします。
    pub fn write(&mut self, row: u32, col: u32, value: CellValue, style: CellStyle) {
        self.cells
            .insert(CellCoord::from_excel(row, col), Cell::new(value, style));
    }

    /// 画像を配置する（行・列は1始まり）
    pub fn insert_image(&mut self, row: u32, col: u32, bytes: Vec<u8>) {
        self.images.push(SheetImage {
            coord: CellCoord::from_excel(row, col),
            bytes,
        });
    }

    /// 行の高さを設定する（行は1始まり、単位はポイント）
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row.saturating_sub(1), height);
    }

    /// セル（0始まりの座標）を取得
    #[cfg(test)]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    /// 全てのセルを行優先で列挙
    pub fn cells(&self) -> impl Iterator<Item = (&CellCoord, &Cell)> {
        self.cells.iter()
    }

    /// 配置済みの画像
    pub fn images(&self) -> &[SheetImage] {
        &self.images
    }

    /// 行の高さ（0始まりの行番号 -> ポイント）
    pub fn row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    /// シートが空かどうか
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.images.is_empty()
    }

    /// 列幅を計算
    ///
    /// 各列について、セル値の文字列表現の表示幅の最大値に余白を加え、
    /// `[10, 60]`の範囲に収めます。使用範囲内で値を持たない列は最小幅になります。
    /// Excelの最終列より右のセルは対象外です。
    /// 全角文字（日本語など）は表示幅2として計算します。
    ///
    /// # 戻り値
    ///
    /// 0始まりの列番号ごとの列幅（文字数）
    pub fn column_widths(&self) -> Vec<usize> {
        let Some(max_col) = self
            .cells
            .keys()
            .map(|c| c.col)
            .filter(|&col| col < MAX_COLUMNS)
            .max()
        else {
            return Vec::new();
        };

        let mut longest = vec![0usize; max_col as usize + 1];
        for (coord, cell) in &self.cells {
            if coord.col > max_col {
                continue;
            }
            let width = cell.value.as_raw_string().width();
            let slot = &mut longest[coord.col as usize];
            *slot = (*slot).max(width);
        }

        longest
            .into_iter()
            .map(|len| (len + COLUMN_WIDTH_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH))
            .collect()
    }
}

/// ワークブック
///
/// 生成時に`Sheet1`を1つだけ持ち、シート分割ごとに`Sheet2`、`Sheet3`...を追加します。
#[derive(Debug, Clone)]
pub(crate) struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// `Sheet1`のみを持つワークブックを生成
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new("Sheet1")],
        }
    }

    /// 連番の名前で新しいシートを追加し、そのシートを返す
    pub fn add_sheet(&mut self) -> &mut Sheet {
        let name = format!("Sheet{}", self.sheets.len() + 1);
        self.sheets.push(Sheet::new(name));
        self.current_sheet_mut()
    }

    /// 書き込み中の（最後の）シート
    pub fn current_sheet_mut(&mut self) -> &mut Sheet {
        // sheetsは常に1つ以上
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    /// 全てのシート
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
