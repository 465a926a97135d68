//! Format Module
//!
//! 型推論で決定するExcelの表示書式（Number Format String）を提供します。
//!
//! 書式は種別と書式コードの組として保持し、列ロールによる上書き判定には種別を使用します。

/// 通貨記号として扱う文字
pub(crate) const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// 表示書式の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FormatKind {
    Percent,
    Currency,
    GroupedNumber,
    Text,
    Date,
}

/// Excelの表示書式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NumberFormat {
    kind: FormatKind,
    code: String,
}

impl NumberFormat {
    fn new(kind: FormatKind, code: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
        }
    }

    /// パーセント書式（例: 0 -> "0%", 2 -> "0.00%"）
    pub fn percent(decimals: usize) -> Self {
        Self::new(
            FormatKind::Percent,
            format!("{}%", Self::fixed_digits("0", decimals)),
        )
    }

    /// 通貨書式（例: ('$', 2) -> "$#,##0.00"）
    pub fn currency(symbol: char, decimals: usize) -> Self {
        Self::new(
            FormatKind::Currency,
            format!("{}{}", symbol, Self::fixed_digits("#,##0", decimals)),
        )
    }

    /// 桁区切り付きの数値書式（例: 0 -> "#,##0", 3 -> "#,##0.000"）
    pub fn grouped_number(decimals: usize) -> Self {
        Self::new(
            FormatKind::GroupedNumber,
            Self::fixed_digits("#,##0", decimals),
        )
    }

    /// パーセント列に強制される書式
    pub fn percent_two_decimals() -> Self {
        Self::percent(2)
    }

    /// 通貨列に注入される書式
    pub fn currency_default() -> Self {
        Self::currency('$', 2)
    }

    pub fn text() -> Self {
        Self::new(FormatKind::Text, "@")
    }

    /// ISO形式の日付書式
    pub fn iso_date() -> Self {
        Self::new(FormatKind::Date, "yyyy-mm-dd")
    }

    /// 書式コード
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn has_percent(&self) -> bool {
        self.kind == FormatKind::Percent
    }

    pub fn has_currency_symbol(&self) -> bool {
        self.kind == FormatKind::Currency
    }

    /// 数値の桁プレースホルダー（`0`、`#`）を持つ書式かどうか
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind,
            FormatKind::Percent | FormatKind::Currency | FormatKind::GroupedNumber
        )
    }

    /// 右寄せの対象となる書式かどうか
    ///
    /// 書式コードに`%`、`0`、`#`のいずれかが含まれる場合に該当します。
    pub fn suggests_right_alignment(&self) -> bool {
        self.code.contains(['%', '0', '#'])
    }

    fn fixed_digits(integer_part: &str, decimals: usize) -> String {
        if decimals == 0 {
            integer_part.to_string()
        } else {
            format!("{}.{}", integer_part, "0".repeat(decimals))
        }
    }
}

impl std::fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}
