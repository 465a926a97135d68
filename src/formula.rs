//! Formula Module
//!
//! 数式内のセル参照の行番号を書き換えるモジュール。
//!
//! - `shift_row_refs`: 全ての相対行参照に一定のオフセットを加算します（テーブルの型推論時）。
//! - `smart_rebase`: 同一行を参照する単純な数式のみを、実際の行番号に付け替えます。

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// セル参照（`B2`, `$B2`, `B$2`, `$B$2`）
static CELL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?[A-Za-z]{1,3})(\$?)(\d+)").expect("valid cell reference regex")
});

/// 絶対行参照（`$2`）
static ABSOLUTE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\d+").expect("valid absolute row regex"));

/// `=Dn op Cn`
static SAME_ROW_BINOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^=\s*([A-Z]{1,3})(\d+)\s*([-+*/])\s*([A-Z]{1,3})(\d+)\s*$")
        .expect("valid binop regex")
});

/// `=IF(Cn=0,0,Dn/Cn)`
static SAME_ROW_SAFE_DIVIDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^=\s*IF\(\s*([A-Z]{1,3})(\d+)\s*=\s*0\s*,\s*0\s*,\s*([A-Z]{1,3})(\d+)\s*/\s*([A-Z]{1,3})(\d+)\s*\)\s*$",
    )
    .expect("valid safe divide regex")
});

/// 数式内の相対行参照に`offset`を加算
///
/// 列文字と`$`記号はそのまま保持します。行に`$`が付いた参照は変更しません。
/// 範囲参照（`G2:G4`）は両端がそれぞれ書き換えられます。
pub(crate) fn shift_row_refs(formula: &str, offset: u32) -> String {
    if formula.is_empty() || offset == 0 {
        return formula.to_string();
    }

    CELL_REF
        .replace_all(formula, |caps: &Captures| {
            let col = &caps[1];
            let absolute_row = &caps[2];
            let row = &caps[3];
            if !absolute_row.is_empty() {
                return format!("{}{}{}", col, absolute_row, row);
            }
            match row.parse::<u64>() {
                Ok(n) => format!("{}{}", col, n + u64::from(offset)),
                // 桁あふれする行番号は参照ではないのでそのまま
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// 同一行を参照する単純な数式を`target_row`に付け替え
///
/// 対象となるのは次の2形式のみです。
///
/// - `=Dn-Cn`（演算子は`-` `+` `*` `/`、両辺の行が同一）
/// - `=IF(Cn=0,0,Dn/Cn)`（3つの参照の行が全て同一）
///
/// 範囲（`:`）または絶対行（`$n`）を含む数式は変更しません。
/// `SUM(D2:D10)`のような集計式を誤って書き換えないためです。
pub(crate) fn smart_rebase(formula: &str, target_row: u32) -> String {
    if formula.is_empty() || formula.contains(':') || ABSOLUTE_ROW.is_match(formula) {
        return formula.to_string();
    }

    let trimmed = formula.trim();

    if let Some(caps) = SAME_ROW_BINOP.captures(trimmed) {
        if caps[2] == caps[5] {
            return format!(
                "={}{}{}{}{}",
                &caps[1], target_row, &caps[3], &caps[4], target_row
            );
        }
    }

    if let Some(caps) = SAME_ROW_SAFE_DIVIDE.captures(trimmed) {
        if caps[2] == caps[4] && caps[4] == caps[6] {
            return format!(
                "=IF({c1}{r}=0,0,{c2}{r}/{c3}{r})",
                c1 = &caps[1],
                c2 = &caps[3],
                c3 = &caps[5],
                r = target_row
            );
        }
    }

    formula.to_string()
}
