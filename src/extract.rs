//! Excel Fence Extraction Module
//!
//! 任意のMarkdownテキストから`excel`タグ付きのコードフェンスを取り出し、
//! フェンスごとに1つのワークブックを生成します。
//!
//! 生成に成功したフェンスは元のテキストから取り除かれ（任意で生成ファイルの通知に置換）、
//! 失敗したフェンスはそのまま残されます。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::api::ConversionMode;
use crate::builder::Converter;
use crate::error::MdToXlsxError;

/// `excel`フェンス（言語タグは大文字小文字を区別しない）
static EXCEL_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^```[ \t]*excel[^\n]*\n(.*?)^```[ \t]*$").expect("valid excel fence regex")
});

/// `excel`フェンスの抽出結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFences {
    /// 変換に成功したフェンスを取り除いたMarkdown
    pub markdown: String,

    /// 生成したワークブックのパス（出現順）
    pub files: Vec<PathBuf>,
}

/// `excel`フェンスをワークブックに変換し、元のテキストから取り除く
///
/// フェンスの先頭にある`|`で始まらない行は取り除かれます。
/// これにより、テーブルは常に1行目から始まり、`=B2*C2`のような数式の行がずれません。
/// 変換は`Converter`の設定に関わらず書式付きモードで行われます。
///
/// # 引数
///
/// * `converter` - 変換に使用するコンバーター
/// * `markdown` - 入力テキスト
/// * `output_dir` - ワークブックの出力先ディレクトリ（存在しない場合は作成）
/// * `base_name` - 出力ファイル名の接頭辞（`<base_name>_excel_<n>.xlsx`、nは1始まり）
/// * `insert_placeholders` - 取り除いたフェンスの位置に`Excel file generated: <ファイル名>`を挿入するか
///
/// # 使用例
///
/// ```rust,no_run
/// use mdxlsx::{extract_excel_fences, ConverterBuilder};
///
/// # fn main() -> Result<(), mdxlsx::MdToXlsxError> {
/// let converter = ConverterBuilder::new().build()?;
/// let text = "Summary:\n```excel\n| Item | Qty |\n|---|---|\n| A | 1 |\n```\nDone.";
/// let extracted = extract_excel_fences(&converter, text, "out", "reply", true)?;
/// assert_eq!(extracted.files.len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn extract_excel_fences(
    converter: &Converter,
    markdown: &str,
    output_dir: impl AsRef<Path>,
    base_name: &str,
    insert_placeholders: bool,
) -> Result<ExtractedFences, MdToXlsxError> {
    if markdown.is_empty() {
        return Ok(ExtractedFences::default());
    }

    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut filtered = String::with_capacity(markdown.len());
    let mut files = Vec::new();
    let mut last_end = 0;

    for (index, caps) in (1..).zip(EXCEL_FENCE.captures_iter(markdown)) {
        let fence = caps.get(0).map_or(0..0, |m| m.range());
        let body = caps.get(1).map_or("", |m| m.as_str());
        filtered.push_str(&markdown[last_end..fence.start]);
        last_end = fence.end;

        let name = format!("{}_excel_{}.xlsx", base_name, index);
        let path = output_dir.join(&name);

        match converter.convert_as(&table_body(body), &path, ConversionMode::Formatted) {
            Ok(_) => {
                log::info!("Generated {} from excel fence #{}", path.display(), index);
                files.push(path);
                if insert_placeholders {
                    filtered.push_str(&format!("Excel file generated: {}\n", name));
                }
            }
            Err(e) => {
                log::warn!("Keeping excel fence #{} in place: {}", index, e);
                filtered.push_str(&markdown[fence]);
            }
        }
    }

    filtered.push_str(&markdown[last_end..]);
    Ok(ExtractedFences {
        markdown: filtered,
        files,
    })
}

/// フェンス本文から先頭の`|`で始まらない行を取り除く
fn table_body(body: &str) -> String {
    let body = body.trim_matches(|c| matches!(c, '\n' | '\r' | ' '));
    body.lines()
        .skip_while(|line| !line.trim_start().starts_with('|'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
