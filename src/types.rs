//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDate;

use crate::format::NumberFormat;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日付
    Date(NaiveDate),

    /// 数式（先頭の`=`を含む）
    Formula(String),

    /// 空セル（罫線のみのセルなど）
    Empty,
}

impl CellValue {
    /// 値が数式かどうかを判定
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    /// 値を文字列として取得（書式適用前）
    ///
    /// 列幅の計測と、テキスト列への強制変換に使用します。
    /// 整数値の数値は小数点なしで表現します。
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Formula(f) => f.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Excel上の行番号・列番号（1始まり）から座標を生成
    pub fn from_excel(row: u32, col: u32) -> Self {
        Self::new(row.saturating_sub(1), col.saturating_sub(1))
    }
}

/// セル全体を囲むインライン強調の書式情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Emphasis {
    /// 太字かどうか
    pub bold: bool,
    /// 斜体かどうか
    pub italic: bool,
}

/// 型推論の結果
///
/// 数式の場合、`format`は常に`None`です。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InferredCell {
    /// 推論された値
    pub value: CellValue,

    /// 表示書式
    pub format: Option<NumberFormat>,
}

impl InferredCell {
    /// 書式なしの推論結果を生成
    pub fn plain(value: CellValue) -> Self {
        Self {
            value,
            format: None,
        }
    }

    /// 書式付きの推論結果を生成
    pub fn with_format(value: CellValue, format: NumberFormat) -> Self {
        Self {
            value,
            format: Some(format),
        }
    }
}

/// 水平方向の配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// セルの表示スタイル
///
/// ワークブック出力時に`rust_xlsxwriter::Format`へ変換されます。
/// 同一のスタイルは変換ごとのキャッシュで共有されます。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    /// フォントサイズ（ポイント）
    pub font_size: Option<u8>,
    /// フォント色（0xRRGGBB）
    pub font_color: Option<u32>,
    pub font_name: Option<&'static str>,
    /// 背景色（0xRRGGBB、塗りつぶしはソリッド）
    pub fill: Option<u32>,
    pub align: Option<HorizontalAlign>,
    pub wrap: bool,
    /// 下罫線（細線）
    pub bottom_border: bool,
    /// 数値書式コード
    pub num_format: Option<String>,
}

impl CellStyle {
    /// 折り返しのみを有効にしたスタイル
    pub fn wrapped() -> Self {
        Self {
            wrap: true,
            ..Default::default()
        }
    }
}
