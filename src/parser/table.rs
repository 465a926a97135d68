//! Table Parser Module
//!
//! パイプ区切りのMarkdownテーブルの解析と、ヘッダーからの列ロール判定を提供します。

use std::sync::LazyLock;

use regex::Regex;

use crate::format::CURRENCY_SYMBOLS;
use crate::types::Emphasis;

/// パーセント列を示すヘッダー語
const PERCENT_HEADER_TOKENS: [&str; 4] = ["percent", "rate", "ratio", "margin"];

/// 通貨列を示すヘッダー語
const CURRENCY_HEADER_TOKENS: [&str; 14] = [
    "amount", "price", "cost", "budget", "actual", "income", "expense", "revenue", "total",
    "balance", "sales", "profit", "fee", "charge",
];

/// テキスト列を示すヘッダー語
const TEXT_HEADER_TOKENS: [&str; 9] = [
    "id", "code", "sku", "account", "name", "description", "notes", "category", "type",
];

/// 集計行を示す語
const AGGREGATE_ROW_TOKENS: [&str; 2] = ["total", "summary"];

static BOLD_ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*\*|___)(.+?)(?:\*\*\*|___)$").expect("valid bold italic regex")
});

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\*\*|__)(.+?)(?:\*\*|__)$").expect("valid bold regex"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\*|_)(.+?)(?:\*|_)$").expect("valid italic regex"));

/// 解析済みテーブル
///
/// 全てのデータ行の列数はヘッダーの列数と一致します。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// テーブルパーサー
#[derive(Debug)]
pub(crate) struct TableParser;

impl TableParser {
    /// `start`行目から始まるテーブルを解析
    ///
    /// # 戻り値
    ///
    /// * `Some((table, next))` - テーブルと、テーブル直後の行インデックス
    /// * `None` - `|`で始まらない行、またはデータ行が1つも残らなかった場合
    ///
    /// 区切り行（`|---|---|`）は省略可能です。列数がヘッダーと一致しない行は破棄されます。
    pub fn parse(lines: &[&str], start: usize) -> Option<(Table, usize)> {
        let header_line = lines.get(start)?.trim();
        if !header_line.starts_with('|') {
            return None;
        }

        let headers = Self::split_row(header_line);
        let mut index = start + 1;

        // 区切り行
        if let Some(line) = lines.get(index) {
            let line = line.trim();
            if line.starts_with('|') && Self::split_row(line).iter().all(|c| c.contains('-')) {
                index += 1;
            }
        }

        let mut rows = Vec::new();
        while let Some(line) = lines.get(index) {
            let line = line.trim();
            if !line.starts_with('|') {
                break;
            }
            let row = Self::split_row(line);
            if row.len() == headers.len() {
                rows.push(row);
            } else {
                log::warn!(
                    "Dropping table row with {} cells (header has {}): {}",
                    row.len(),
                    headers.len(),
                    line
                );
            }
            index += 1;
        }

        if rows.is_empty() {
            return None;
        }

        Some((Table { headers, rows }, index))
    }

    /// 前後の`|`を除去し、`|`で分割して各セルをトリム
    fn split_row(line: &str) -> Vec<String> {
        line.trim_matches('|')
            .split('|')
            .map(|cell| cell.trim().to_string())
            .collect()
    }
}

/// ヘッダー文字列から判定される列ロール
///
/// 各ロールは独立しており、1つの列が複数のロールを持つことがあります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ColumnRole {
    pub percent: bool,
    pub currency: bool,
    pub text: bool,
}

impl ColumnRole {
    /// ヘッダー文字列から列ロールを判定（大文字小文字を区別しない部分一致）
    pub fn classify(header: &str) -> Self {
        let lower = header.to_lowercase();
        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

        Self {
            percent: header.contains('%') || contains_any(&PERCENT_HEADER_TOKENS),
            currency: contains_any(&CURRENCY_HEADER_TOKENS)
                || header.contains(CURRENCY_SYMBOLS),
            text: contains_any(&TEXT_HEADER_TOKENS),
        }
    }

    /// 全ての列のロールを判定
    pub fn classify_all(headers: &[String]) -> Vec<Self> {
        headers.iter().map(|h| Self::classify(h)).collect()
    }
}

/// セル全体を囲むインライン強調を解析
///
/// `***x***` / `___x___`は太字+斜体、`**x**` / `__x__`は太字、`*x*` / `_x_`は斜体です。
/// 強調が検出された場合は、記号を除いたテキストと強調情報を返します。
pub(crate) fn parse_emphasis(raw: &str) -> Option<(String, Emphasis)> {
    let s = raw.trim();
    let patterns: [(&Regex, Emphasis); 3] = [
        (
            &*BOLD_ITALIC,
            Emphasis {
                bold: true,
                italic: true,
            },
        ),
        (
            &*BOLD,
            Emphasis {
                bold: true,
                italic: false,
            },
        ),
        (
            &*ITALIC,
            Emphasis {
                bold: false,
                italic: true,
            },
        ),
    ];

    patterns.into_iter().find_map(|(re, emphasis)| {
        re.captures(s)
            .map(|caps| (caps[1].trim().to_string(), emphasis))
    })
}

/// 集計行（"total"、"summary"を含む行）かどうか
pub(crate) fn is_aggregate_row(row: &[String]) -> bool {
    row.iter().any(|cell| {
        let lower = cell.to_lowercase();
        AGGREGATE_ROW_TOKENS.iter().any(|t| lower.contains(t))
    })
}
