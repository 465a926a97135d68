//! Parser Module
//!
//! Markdownテキストの構文解析を提供します。
//! 行単位でブロックを認識し、テーブルは専用のパーサーで解析します。

mod block;
mod table;

pub(crate) use block::{Block, BlockParser, ListMarker};
pub(crate) use table::{is_aggregate_row, parse_emphasis, ColumnRole, Table};
