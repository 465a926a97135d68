//! Style Cache Module
//!
//! [`CellStyle`]から`rust_xlsxwriter::Format`への変換結果を変換ごとに共有します。

use std::collections::HashMap;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern};

use crate::types::{CellStyle, HorizontalAlign};

/// スタイルキャッシュ
///
/// 1回のワークブック出力の間だけ有効です。
/// 同一のスタイルには同一の`Format`を使用します。
#[derive(Debug, Default)]
pub(crate) struct StyleCache {
    formats: HashMap<CellStyle, Format>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// スタイルに対応する書式を取得（未登録の場合は生成して登録）
    pub fn format(&mut self, style: &CellStyle) -> &Format {
        self.formats
            .entry(style.clone())
            .or_insert_with(|| build_format(style))
    }

    /// 登録済みの書式の数
    pub fn len(&self) -> usize {
        self.formats.len()
    }
}

fn build_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(name) = style.font_name {
        format = format.set_font_name(name);
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill));
    }
    if let Some(align) = style.align {
        format = format.set_align(match align {
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
            HorizontalAlign::Right => FormatAlign::Right,
        });
    }
    if style.wrap {
        format = format.set_text_wrap();
    }
    if style.bottom_border {
        format = format.set_border_bottom(FormatBorder::Thin);
    }
    if let Some(code) = &style.num_format {
        format = format.set_num_format(code);
    }

    format
}
