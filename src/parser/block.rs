//! Block Parser Module
//!
//! Markdownの行ストリームをブロック構造に分解します。

use std::sync::LazyLock;

use regex::Regex;

use super::table::{Table, TableParser};

/// コードフェンスの区切り
const FENCE: &str = "```";

/// シート分割マーカー
const PAGE_BREAK: &str = "<pbreak>";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)").expect("valid heading regex"));

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)([-*+]|\d+\.)\s+(.*)").expect("valid list item regex")
});

static BLOCK_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(>+)(.*)$").expect("valid block quote regex"));

/// リストのマーカー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListMarker {
    /// `1.`などの番号付き（番号はレイアウト時に振り直される）
    Ordered,
    /// `-`、`*`、`+`
    Bullet,
}

/// Markdownのブロック要素
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    /// 見出し（レベル1〜6）
    Heading { level: usize, text: String },

    /// 段落（1行）
    Paragraph(String),

    /// リスト項目（`level`はインデント幅 / 2）
    ListItem {
        level: usize,
        marker: ListMarker,
        text: String,
    },

    /// 引用（`level`は先頭の`>`の数）
    BlockQuote { level: usize, text: String },

    /// テーブル
    Table(Table),

    /// コードフェンス
    ///
    /// `closed`が`false`の場合、閉じられないまま入力が終了したフェンスです。
    CodeFence {
        language: String,
        body: String,
        closed: bool,
    },

    /// 水平線
    HorizontalRule,

    /// シート分割
    PageBreak,

    /// 空行
    Blank,
}

/// ブロックパーサー
///
/// 行を先頭から順に読み、各行（またはテーブル・フェンスの場合は複数行）を
/// 1つのブロックに変換します。判定順は以下の通りで、最初に一致したものを採用します。
///
/// 1. フェンス内（閉じフェンスまで蓄積）
/// 2. フェンス開始
/// 3. `<pbreak>`
/// 4. 水平線
/// 5. テーブル
/// 6. 引用
/// 7. 空行
/// 8. 見出し
/// 9. リスト項目
/// 10. 段落
#[derive(Debug)]
pub(crate) struct BlockParser;

impl BlockParser {
    /// Markdownテキスト全体をブロック列に変換
    pub fn parse(markdown: &str) -> Vec<Block> {
        let lines: Vec<&str> = markdown
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut blocks = Vec::new();
        let mut index = 0;

        // 開いているフェンス（言語タグ、本文）
        let mut open_fence: Option<(String, Vec<&str>)> = None;

        while index < lines.len() {
            let line = lines[index];
            let stripped = line.trim();

            // 1. フェンス内
            if let Some((language, body)) = open_fence.as_mut() {
                if stripped == FENCE {
                    blocks.push(Block::CodeFence {
                        language: std::mem::take(language),
                        body: body.join("\n"),
                        closed: true,
                    });
                    open_fence = None;
                } else {
                    body.push(line);
                }
                index += 1;
                continue;
            }

            // 2. フェンス開始
            if let Some(tag) = stripped.strip_prefix(FENCE) {
                open_fence = Some((tag.trim().to_lowercase(), Vec::new()));
                index += 1;
                continue;
            }

            // 3. シート分割
            if stripped == PAGE_BREAK {
                blocks.push(Block::PageBreak);
                index += 1;
                continue;
            }

            // 4. 水平線
            if matches!(stripped, "***" | "---" | "___") {
                blocks.push(Block::HorizontalRule);
                index += 1;
                continue;
            }

            // 5. テーブル（失敗した場合は以降の判定にフォールスルー）
            if stripped.starts_with('|') && stripped.ends_with('|') {
                if let Some((table, next)) = TableParser::parse(&lines, index) {
                    blocks.push(Block::Table(table));
                    index = next;
                    continue;
                }
            }

            blocks.push(Self::parse_line(line, stripped));
            index += 1;
        }

        // 閉じられなかったフェンスは内容があればコードブロックとして残す
        if let Some((language, body)) = open_fence {
            if !body.is_empty() {
                blocks.push(Block::CodeFence {
                    language,
                    body: body.join("\n"),
                    closed: false,
                });
            }
        }

        blocks
    }

    /// 単一行のブロック（引用、空行、見出し、リスト項目、段落）
    fn parse_line(line: &str, stripped: &str) -> Block {
        if let Some(caps) = BLOCK_QUOTE.captures(stripped) {
            return Block::BlockQuote {
                level: caps[1].len(),
                text: caps[2].trim().to_string(),
            };
        }

        if stripped.is_empty() {
            return Block::Blank;
        }

        if let Some(caps) = HEADING.captures(stripped) {
            return Block::Heading {
                level: caps[1].len(),
                text: caps[2].trim().to_string(),
            };
        }

        if let Some(caps) = LIST_ITEM.captures(line) {
            let marker = if caps[2].ends_with('.') {
                ListMarker::Ordered
            } else {
                ListMarker::Bullet
            };
            return Block::ListItem {
                level: caps[1].chars().count() / 2,
                marker,
                text: caps[3].trim_end().to_string(),
            };
        }

        Block::Paragraph(stripped.to_string())
    }
}
