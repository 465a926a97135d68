//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// mdxlsxクレート全体で使用するエラー型
///
/// 変換処理を中断させる致命的なエラーのみを表します。
/// チャート・ダイアグラムの描画失敗やサイドカー画像の保存失敗は
/// コードブロックへの縮退として処理され、このエラー型では返されません。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（出力ディレクトリ作成失敗など）
/// - `Xlsx`: ワークブックの書き込み中に発生したエラー（rust_xlsxwriter由来）
/// - `Config`: 設定の検証に失敗したエラー
/// - `OutputPath`: 出力先を決定できないエラー
/// - `SecurityViolation`: 入力サイズ制限などに違反したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use mdxlsx::{ConverterBuilder, MdToXlsxError};
///
/// fn export(markdown: &str) -> Result<(), MdToXlsxError> {
///     let converter = ConverterBuilder::new().build()?;
///     converter.convert(markdown, "report.xlsx")?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum MdToXlsxError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの構築・保存中に発生したエラー
    ///
    /// 行・列の上限超過、シート名の重複、保存先への書き込み失敗などが
    /// 原因となります。
    #[error("Failed to write Excel workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use mdxlsx::{ConverterBuilder, MdToXlsxError, RenderConfig};
    ///
    /// let config = RenderConfig {
    ///     chart_endpoint: "ftp://example.com".to_string(),
    ///     ..RenderConfig::default()
    /// };
    /// let result = ConverterBuilder::new().with_render_config(config).build();
    ///
    /// match result {
    ///     Err(MdToXlsxError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 出力先を決定できないエラー
    ///
    /// 出力パスにファイル名が含まれない場合など、ワークブックとサイドカー
    /// ディレクトリの配置先が決まらない場合に発生します。
    #[error("Invalid output location: {0}")]
    OutputPath(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズの上限超過や、パス区切り文字を含むファイル名部品などが
    /// 検出された場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
