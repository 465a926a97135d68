//! Inference Module
//!
//! Markdownのセル文字列から、Excelに書き込む値と表示書式を推論するモジュール。

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::format::{NumberFormat, CURRENCY_SYMBOLS};
use crate::formula::shift_row_refs;
use crate::types::{CellValue, InferredCell};

/// セル型推論器
///
/// セル値の型推論のファサードとして機能します。
/// 判定は以下の順序で行い、最初に一致したものを採用します。
///
/// 1. 数式（`=`で始まる）
/// 2. 論理値（true / false / yes / no）
/// 3. 日付
/// 4. パーセント
/// 5. 通貨
/// 6. 数値
/// 7. 文字列（そのまま）
#[derive(Debug)]
pub(crate) struct CellInferencer {
    /// 日付推論器
    date_inferencer: DateInferencer,

    /// 数値推論器
    number_inferencer: NumberInferencer,
}

impl CellInferencer {
    /// 新しいCellInferencerインスタンスを生成
    pub fn new() -> Self {
        Self {
            date_inferencer: DateInferencer,
            number_inferencer: NumberInferencer,
        }
    }

    /// セル文字列の値と書式を推論
    ///
    /// # 引数
    ///
    /// * `raw` - セルの文字列（前後の空白は無視されます）
    /// * `row_offset` - 数式内の行参照に加算するオフセット
    ///
    /// # 戻り値
    ///
    /// 推論結果。解析に失敗したステップは次のステップへフォールスルーするため、
    /// この関数は失敗しません。
    pub fn infer(&self, raw: &str, row_offset: u32) -> InferredCell {
        let s = raw.trim();

        // 1. 数式
        if s.starts_with('=') {
            return InferredCell::plain(CellValue::Formula(shift_row_refs(s, row_offset)));
        }

        // 2. 論理値
        if let Some(b) = Self::infer_bool(s) {
            return InferredCell::plain(CellValue::Bool(b));
        }

        // 3. 日付
        if let Some(date) = self.date_inferencer.infer(s) {
            return InferredCell::with_format(CellValue::Date(date), NumberFormat::iso_date());
        }

        // 4〜6. 数値系
        if let Some(cell) = self
            .number_inferencer
            .infer_percent(s)
            .or_else(|| self.number_inferencer.infer_currency(s))
            .or_else(|| self.number_inferencer.infer_number(s))
        {
            return cell;
        }

        // 7. フォールバック
        InferredCell::plain(CellValue::String(s.to_string()))
    }

    fn infer_bool(s: &str) -> Option<bool> {
        match s.to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        }
    }
}

impl Default for CellInferencer {
    fn default() -> Self {
        Self::new()
    }
}

/// 日付の並び順
#[derive(Debug, Clone, Copy)]
enum DateOrder {
    YearMonthDay,
    MonthDayYear,
    DayMonthYear,
}

/// `2024-01-15`
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid iso date regex")
});

/// `01/15/2024`, `15/01/24`
static SLASH_DATE_YEAR_LAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$").expect("valid slash date regex")
});

/// `2024/01/15`
static SLASH_DATE_YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("valid slash date regex")
});

/// 日付推論器
///
/// 次の順序で解析を試みます: `Y-M-D`, `M/D/Y`, `M/D/yy`, `D/M/Y`, `D/M/yy`, `Y/M/D`
///
/// 2桁の年は69〜99を1900年代、00〜68を2000年代として扱います。
#[derive(Debug)]
pub(crate) struct DateInferencer;

impl DateInferencer {
    /// 文字列全体が日付として解釈できる場合に日付を返す
    pub fn infer(&self, s: &str) -> Option<NaiveDate> {
        if let Some(caps) = ISO_DATE.captures(s) {
            if let Some(date) = Self::build(&caps[1], &caps[2], &caps[3], DateOrder::YearMonthDay)
            {
                return Some(date);
            }
        }

        if let Some(caps) = SLASH_DATE_YEAR_LAST.captures(s) {
            // 月/日の解釈を優先し、失敗した場合に日/月を試す
            let month_first = Self::build(&caps[1], &caps[2], &caps[3], DateOrder::MonthDayYear);
            let day_first = || Self::build(&caps[1], &caps[2], &caps[3], DateOrder::DayMonthYear);
            if let Some(date) = month_first.or_else(day_first) {
                return Some(date);
            }
        }

        if let Some(caps) = SLASH_DATE_YEAR_FIRST.captures(s) {
            return Self::build(&caps[1], &caps[2], &caps[3], DateOrder::YearMonthDay);
        }

        None
    }

    fn build(a: &str, b: &str, c: &str, order: DateOrder) -> Option<NaiveDate> {
        let (year, month, day) = match order {
            DateOrder::YearMonthDay => (a, b, c),
            DateOrder::MonthDayYear => (c, a, b),
            DateOrder::DayMonthYear => (c, b, a),
        };

        let year = Self::expand_year(year)?;
        NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
    }

    fn expand_year(year: &str) -> Option<i32> {
        let value: i32 = year.parse().ok()?;
        if year.len() == 2 {
            Some(if value >= 69 { 1900 + value } else { 2000 + value })
        } else {
            Some(value)
        }
    }
}

/// 数値推論器
///
/// パーセント・通貨・数値の文字列を`f64`と表示書式に変換します。
/// 桁区切りの`,`は除去してから解析します。非有限値（`inf`、`NaN`）は数値として扱いません。
#[derive(Debug)]
pub(crate) struct NumberInferencer;

impl NumberInferencer {
    /// パーセント（例: `12.5%` -> 0.125, `0.0%`）
    pub fn infer_percent(&self, s: &str) -> Option<InferredCell> {
        if s.chars().count() <= 1 {
            return None;
        }
        let num_str = s.strip_suffix('%')?.trim();
        let value = Self::parse_float(&num_str.replace(',', ""))?;
        let decimals = num_str.split('.').nth(1).map_or(0, |d| d.chars().count());

        Some(InferredCell::with_format(
            CellValue::Number(value / 100.0),
            NumberFormat::percent(decimals),
        ))
    }

    /// 通貨（例: `$1,234.50` -> 1234.5, `$#,##0.00`）
    ///
    /// 通貨記号は先頭・末尾のどちらでも認識します。
    pub fn infer_currency(&self, s: &str) -> Option<InferredCell> {
        let (symbol, stripped) = CURRENCY_SYMBOLS.iter().find_map(|&sym| {
            if let Some(rest) = s.strip_prefix(sym) {
                Some((sym, rest.trim()))
            } else {
                s.strip_suffix(sym).map(|rest| (sym, rest.trim()))
            }
        })?;

        let value = Self::parse_float(&stripped.replace(',', ""))?;
        let decimals = if stripped.contains('.') {
            stripped.rsplit('.').next().map_or(0, |d| d.chars().count())
        } else {
            0
        };

        Some(InferredCell::with_format(
            CellValue::Number(value),
            NumberFormat::currency(symbol, decimals),
        ))
    }

    /// 数値（例: `1,234` -> `#,##0`, `3.140` -> `#,##0.000`）
    pub fn infer_number(&self, s: &str) -> Option<InferredCell> {
        let cleaned = s.replace(',', "");

        if cleaned.contains('.') {
            let value = Self::parse_float(&cleaned)?;
            let decimals = cleaned.rsplit('.').next().map_or(0, |d| d.chars().count());
            return Some(InferredCell::with_format(
                CellValue::Number(value),
                NumberFormat::grouped_number(decimals),
            ));
        }

        if !Self::is_integer_literal(&cleaned) {
            return None;
        }
        let value = Self::parse_float(&cleaned)?;
        Some(InferredCell::with_format(
            CellValue::Number(value),
            NumberFormat::grouped_number(0),
        ))
    }

    fn parse_float(s: &str) -> Option<f64> {
        s.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// 符号付きの10進整数かどうか
    fn is_integer_literal(s: &str) -> bool {
        let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}
