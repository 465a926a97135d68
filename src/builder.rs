//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{ConversionMode, RenderConfig};
use crate::error::MdToXlsxError;
use crate::inference::CellInferencer;
use crate::layout::{LayoutEngine, LayoutOutcome};
use crate::output::XlsxOutput;
use crate::parser::BlockParser;
use crate::render::{FenceRenderer, HttpRenderer};
use crate::security::{validate_path_component, SecurityConfig};
use crate::sidecar;
use crate::types::{CellStyle, CellValue};
use crate::workbook::Workbook;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 変換モード
    pub mode: ConversionMode,

    /// 外部描画サービスの設定
    pub render_config: RenderConfig,

    /// チャート・ダイアグラムを事前に並列描画するか
    pub parallel_rendering: bool,

    /// サイドカーディレクトリ名（Noneの場合は`<ファイル名>_ChartsAndDiagrams`）
    pub sidecar_dir_name: Option<String>,

    /// リソース制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::Formatted,
            render_config: RenderConfig::default(),
            parallel_rendering: false,
            sidecar_dir_name: None,
            security: SecurityConfig::default(),
        }
    }
}

/// 変換結果の概要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// 生成したシートの数
    pub sheet_count: usize,

    /// 保存したサイドカー画像のパス（配置順）
    pub images: Vec<PathBuf>,

    /// 描画に失敗し、コードブロックとして出力したチャート・ダイアグラムの数
    pub degraded_fences: usize,
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use mdxlsx::{ConversionMode, ConverterBuilder};
///
/// # fn main() -> Result<(), mdxlsx::MdToXlsxError> {
/// let converter = ConverterBuilder::new()
///     .with_mode(ConversionMode::Formatted)
///     .with_parallel_rendering(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,

    /// 差し替えられた描画実装
    renderer: Option<Arc<dyn FenceRenderer>>,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterBuilder")
            .field("config", &self.config)
            .field("custom_renderer", &self.renderer.is_some())
            .finish()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 変換モード: 書式付き（`ConversionMode::Formatted`）
    /// - 描画設定: `RenderConfig::default()`
    /// - 並列描画: 無効
    /// - サイドカーディレクトリ名: `<ファイル名>_ChartsAndDiagrams`
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
            renderer: None,
        }
    }

    /// 変換モードを指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use mdxlsx::{ConversionMode, ConverterBuilder};
    ///
    /// // 入力全体をA1セルに書き込む
    /// let builder = ConverterBuilder::new().with_mode(ConversionMode::Raw);
    /// ```
    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// 外部描画サービスの設定を指定する
    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.config.render_config = config;
        self
    }

    /// 描画実装を差し替える
    ///
    /// 指定した場合、`RenderConfig`のエンドポイントは使用されません。
    pub fn with_renderer(mut self, renderer: Arc<dyn FenceRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// チャート・ダイアグラムを事前に並列描画するかを指定する
    ///
    /// 有効にした場合も、画像の配置は元のブロック順に行われます。
    pub fn with_parallel_rendering(mut self, parallel: bool) -> Self {
        self.config.parallel_rendering = parallel;
        self
    }

    /// サイドカーディレクトリ名を指定する
    ///
    /// ディレクトリはワークブックと同じディレクトリに作成されます。
    /// 名前はパス区切り文字や`..`を含まない単一のパス部品でなければなりません。
    pub fn with_sidecar_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.sidecar_dir_name = Some(name.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合
    /// * `Err(MdToXlsxError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * エンドポイントが`http://`・`https://`で始まらない
    /// * タイムアウトが0
    /// * JPEG品質が1〜100の範囲外
    /// * サイドカーディレクトリ名が単一のパス部品でない
    pub fn build(self) -> Result<Converter, MdToXlsxError> {
        let render = &self.config.render_config;

        // 1. エンドポイントの検証
        for (name, endpoint) in [
            ("chart endpoint", &render.chart_endpoint),
            ("diagram endpoint", &render.diagram_endpoint),
            ("diagram fallback endpoint", &render.diagram_fallback_endpoint),
        ] {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(MdToXlsxError::Config(format!(
                    "Invalid {}: '{}' (expected http:// or https://)",
                    name, endpoint
                )));
            }
        }

        // 2. タイムアウトの検証
        if render.timeout.is_zero() || render.fallback_timeout.is_zero() {
            return Err(MdToXlsxError::Config(
                "Invalid timeout: must be greater than zero".to_string(),
            ));
        }

        // 3. JPEG品質の検証
        if !(1..=100).contains(&render.jpeg_quality) {
            return Err(MdToXlsxError::Config(format!(
                "Invalid JPEG quality: {} (expected 1-100)",
                render.jpeg_quality
            )));
        }

        // 4. サイドカーディレクトリ名の検証
        if let Some(name) = &self.config.sidecar_dir_name {
            validate_path_component(name).map_err(|e| {
                MdToXlsxError::Config(format!("Invalid sidecar directory name: {}", e))
            })?;
        }

        // 5. Converterインスタンス生成
        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => Arc::new(HttpRenderer::with_image_limit(
                self.config.render_config.clone(),
                self.config.security.max_image_size,
            )?),
        };
        Ok(Converter::new(self.config, renderer))
    }
}

/// 変換処理のファサード
///
/// MarkdownテキストをExcelワークブックに変換するためのメインエントリーポイントです。
/// `ConverterBuilder`を使用して構築された設定に基づいて変換処理を実行します。
/// 変換ごとの状態（行カーソル、スタイルキャッシュなど）は呼び出しごとに生成されるため、
/// 1つの`Converter`を複数の変換で再利用できます。
///
/// # 使用例
///
/// ```rust,no_run
/// use mdxlsx::ConverterBuilder;
///
/// # fn main() -> Result<(), mdxlsx::MdToXlsxError> {
/// let converter = ConverterBuilder::new().build()?;
/// let report = converter.convert("# Budget\n\n| Item | Cost |\n|---|---|\n| Paper | $12.50 |", "budget.xlsx")?;
/// println!("{} sheet(s)", report.sheet_count);
/// # Ok(())
/// # }
/// ```
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// セル型推論器
    inferencer: CellInferencer,

    /// チャート・ダイアグラムの描画実装
    renderer: Arc<dyn FenceRenderer>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig, renderer: Arc<dyn FenceRenderer>) -> Self {
        Self {
            config,
            inferencer: CellInferencer::new(),
            renderer,
        }
    }

    /// MarkdownテキストをExcelファイルに変換
    ///
    /// # 引数
    ///
    /// * `markdown` - 入力Markdownテキスト
    /// * `output` - 出力するワークブックのパス。サイドカー画像は同じディレクトリに保存されます
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConversionReport)` - 変換に成功した場合
    /// * `Err(MdToXlsxError)` - 出力先を決定できない場合、入力サイズが上限を超えた場合、
    ///   ワークブックの保存に失敗した場合
    ///
    /// # 処理フロー
    ///
    /// 1. 入力サイズと出力パスの検証
    /// 2. ブロック解析
    /// 3. （並列描画が有効な場合）チャート・ダイアグラムの事前描画
    /// 4. レイアウト（描画、サイドカー画像の保存を含む）
    /// 5. ワークブックの保存（最後に1回だけ）
    pub fn convert(
        &self,
        markdown: &str,
        output: impl AsRef<Path>,
    ) -> Result<ConversionReport, MdToXlsxError> {
        self.convert_as(markdown, output.as_ref(), self.config.mode)
    }

    /// 変換モードを指定して変換
    pub(crate) fn convert_as(
        &self,
        markdown: &str,
        output: &Path,
        mode: ConversionMode,
    ) -> Result<ConversionReport, MdToXlsxError> {
        let (workbook, report) = self.lay_out(markdown, output, mode)?;

        XlsxOutput::new().save(&workbook, output)?;
        log::info!(
            "Saved {} ({} sheets, {} images, {} degraded fences)",
            output.display(),
            report.sheet_count,
            report.images.len(),
            report.degraded_fences
        );
        Ok(report)
    }

    /// MarkdownテキストをExcelワークブックのバイト列に変換
    ///
    /// ワークブックはファイルに保存されませんが、サイドカー画像は
    /// `artifact_path`を基準に保存されます。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use mdxlsx::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), mdxlsx::MdToXlsxError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let (bytes, _report) = converter.convert_to_buffer("hello", "hello.xlsx")?;
    /// std::fs::write("hello.xlsx", bytes)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_to_buffer(
        &self,
        markdown: &str,
        artifact_path: impl AsRef<Path>,
    ) -> Result<(Vec<u8>, ConversionReport), MdToXlsxError> {
        let (workbook, report) =
            self.lay_out(markdown, artifact_path.as_ref(), self.config.mode)?;
        let bytes = XlsxOutput::new().to_buffer(&workbook)?;
        Ok((bytes, report))
    }

    fn lay_out(
        &self,
        markdown: &str,
        artifact_path: &Path,
        mode: ConversionMode,
    ) -> Result<(Workbook, ConversionReport), MdToXlsxError> {
        self.config.security.check_input_size(markdown.len())?;
        sidecar::artifact_stem(artifact_path)?;

        log::info!(
            "Converting {} bytes of markdown to {} ({:?} mode)",
            markdown.len(),
            artifact_path.display(),
            mode
        );

        let outcome = match mode {
            ConversionMode::Raw => {
                let mut workbook = Workbook::new();
                workbook.current_sheet_mut().write(
                    1,
                    1,
                    CellValue::String(markdown.to_string()),
                    CellStyle::default(),
                );
                LayoutOutcome {
                    workbook,
                    images: Vec::new(),
                    degraded_fences: 0,
                }
            }
            ConversionMode::Formatted => {
                let blocks = BlockParser::parse(markdown);
                log::debug!("Parsed {} blocks", blocks.len());

                let mut engine = LayoutEngine::new(
                    &self.inferencer,
                    self.renderer.as_ref(),
                    artifact_path,
                    self.config.sidecar_dir_name.as_deref(),
                );
                if self.config.parallel_rendering {
                    engine.prerender(&blocks);
                }
                engine.layout(&blocks)
            }
        };

        let report = ConversionReport {
            sheet_count: outcome.workbook.sheets().len(),
            images: outcome.images,
            degraded_fences: outcome.degraded_fences,
        };
        Ok((outcome.workbook, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DiagramSupport, ImageKind};
    use crate::render::{RenderError, RenderedImage};
    use std::time::Duration;

    struct NoRenderer;

    impl FenceRenderer for NoRenderer {
        fn render(&self, _kind: ImageKind, _source: &str) -> Result<RenderedImage, RenderError> {
            Err(RenderError::Unavailable)
        }
    }

    fn offline() -> ConverterBuilder {
        ConverterBuilder::new().with_renderer(Arc::new(NoRenderer))
    }

    #[test]
    fn test_converter_builder_new() {
        let builder = ConverterBuilder::new();
        assert_eq!(builder.config.mode, ConversionMode::Formatted);
        assert_eq!(builder.config.render_config, RenderConfig::default());
        assert!(!builder.config.parallel_rendering);
        assert!(builder.config.sidecar_dir_name.is_none());
        assert!(builder.renderer.is_none());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = ConverterBuilder::new()
            .with_mode(ConversionMode::Raw)
            .with_parallel_rendering(true)
            .with_sidecar_dir_name("figures");

        assert_eq!(builder.config.mode, ConversionMode::Raw);
        assert!(builder.config.parallel_rendering);
        assert_eq!(builder.config.sidecar_dir_name.as_deref(), Some("figures"));
    }

    #[test]
    fn test_build_success() {
        assert!(ConverterBuilder::new().build().is_ok());
        assert!(offline().build().is_ok());
    }

    #[test]
    fn test_build_with_invalid_endpoint() {
        let config = RenderConfig {
            diagram_endpoint: "kroki.io".to_string(),
            ..RenderConfig::default()
        };
        match ConverterBuilder::new().with_render_config(config).build() {
            Err(MdToXlsxError::Config(msg)) => assert!(msg.contains("diagram endpoint")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_zero_timeout() {
        let config = RenderConfig {
            fallback_timeout: Duration::ZERO,
            ..RenderConfig::default()
        };
        match ConverterBuilder::new().with_render_config(config).build() {
            Err(MdToXlsxError::Config(msg)) => assert!(msg.contains("timeout")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_invalid_quality() {
        for quality in [0, 101] {
            let config = RenderConfig {
                jpeg_quality: quality,
                ..RenderConfig::default()
            };
            assert!(matches!(
                ConverterBuilder::new().with_render_config(config).build(),
                Err(MdToXlsxError::Config(_))
            ));
        }
    }

    #[test]
    fn test_build_with_unsafe_sidecar_dir_name() {
        for name in ["", "../images", "a/b", "/tmp"] {
            assert!(matches!(
                offline().with_sidecar_dir_name(name).build(),
                Err(MdToXlsxError::Config(_))
            ));
        }
    }

    #[test]
    fn test_build_with_diagrams_disabled() {
        let config = RenderConfig {
            diagram_support: DiagramSupport::Disabled,
            ..RenderConfig::default()
        };
        assert!(ConverterBuilder::new().with_render_config(config).build().is_ok());
    }

    #[test]
    fn test_convert_to_buffer_raw_mode() {
        let converter = offline().with_mode(ConversionMode::Raw).build().unwrap();
        let (bytes, report) = converter
            .convert_to_buffer("# not parsed\n<pbreak>\n", "raw.xlsx")
            .unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(report.sheet_count, 1);
        assert!(report.images.is_empty());
    }

    #[test]
    fn test_convert_rejects_path_without_file_name() {
        let converter = offline().build().unwrap();
        assert!(matches!(
            converter.convert_to_buffer("text", ""),
            Err(MdToXlsxError::OutputPath(_))
        ));
    }

    #[test]
    fn test_convert_rejects_oversized_input() {
        let converter = offline()
            .with_security_config(SecurityConfig {
                max_input_size: 4,
                ..SecurityConfig::default()
            })
            .build()
            .unwrap();
        assert!(matches!(
            converter.convert_to_buffer("too long", "out.xlsx"),
            Err(MdToXlsxError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_convert_counts_degraded_fences() {
        let dir = tempfile::tempdir().unwrap();
        let converter = offline().build().unwrap();
        let report = converter
            .convert("```chart\n{}\n```\n```mermaid\ngraph TD\n```", dir.path().join("d.xlsx"))
            .unwrap();
        assert_eq!(report.degraded_fences, 2);
        assert!(dir.path().join("d.xlsx").exists());
        assert!(!dir.path().join("d_ChartsAndDiagrams").exists());
    }
}
