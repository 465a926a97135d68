//! Render Module
//!
//! `chart`・`mermaid`フェンスを外部描画サービスで画像に変換するモジュール。
//!
//! 描画は[`FenceRenderer`]トレイトで抽象化されており、既定の実装は
//! HTTPで外部サービスを呼び出す[`HttpRenderer`]です。
//! 描画の失敗は変換全体を中断させず、呼び出し側でコードブロックへの縮退として扱われます。

mod chart;
mod diagram;
mod raster;
#[cfg(test)]
mod stub_server;

pub use raster::ImageFormatKind;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::api::{ImageKind, RenderConfig};
use crate::error::MdToXlsxError;
use crate::security::SecurityConfig;

/// 描画エラー
///
/// 個々のフェンスの描画失敗を表します。
/// 変換処理ではこのエラーは警告ログに記録され、フェンスはコードブロックとして出力されます。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// 描画機能が無効化されている
    #[error("rendering is not available")]
    Unavailable,

    /// HTTP通信（接続・タイムアウト・本文の読み取り）に失敗した
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 描画サービスが2xx以外のステータスを返した
    #[error("unexpected HTTP status: {0}")]
    Status(u16),

    /// 描画サービスが画像以外のContent-Typeを返した
    #[error("unexpected content type: {0}")]
    ContentType(String),

    /// チャート定義をJSONとして解釈できない
    #[error("invalid chart definition: {0}")]
    ChartJson(#[from] serde_json::Error),

    /// 画像のデコード・エンコードに失敗した
    #[error("image processing failed: {0}")]
    Image(#[from] ::image::ImageError),

    /// 画像サイズが上限を超えた
    #[error("image too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    /// 主経路とフォールバック経路の両方が失敗した
    #[error("all renderers failed (primary: {primary}; fallback: {fallback})")]
    Exhausted {
        primary: Box<RenderError>,
        fallback: Box<RenderError>,
    },
}

/// 描画された画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    bytes: Vec<u8>,
}

impl RenderedImage {
    /// 画像データから生成
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 画像データ
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 画像データを取り出す
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// 先頭のシグネチャから判別した画像形式
    pub fn format(&self) -> Option<ImageFormatKind> {
        ImageFormatKind::sniff(&self.bytes)
    }
}

/// フェンスの描画を行うトレイト
///
/// 並列描画のため`Send + Sync`を要求します。
/// テストやオフライン環境では、独自の実装を
/// [`ConverterBuilder::with_renderer`](crate::ConverterBuilder::with_renderer)で差し替えられます。
///
/// # 使用例
///
/// ```rust
/// use mdxlsx::{FenceRenderer, ImageKind, RenderError, RenderedImage};
///
/// struct Offline;
///
/// impl FenceRenderer for Offline {
///     fn render(&self, _kind: ImageKind, _source: &str) -> Result<RenderedImage, RenderError> {
///         Err(RenderError::Unavailable)
///     }
/// }
/// ```
pub trait FenceRenderer: Send + Sync {
    /// フェンスの本文を画像に変換
    fn render(&self, kind: ImageKind, source: &str) -> Result<RenderedImage, RenderError>;
}

/// 外部HTTPサービスを使用する描画実装
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    config: RenderConfig,
    client: Client,
    max_image_size: usize,
}

impl HttpRenderer {
    /// 描画設定からHTTPクライアントを構築
    ///
    /// # 戻り値
    ///
    /// * `Err(MdToXlsxError::Config)` - HTTPクライアントを構築できない場合
    pub fn new(config: RenderConfig) -> Result<Self, MdToXlsxError> {
        Self::with_image_limit(config, SecurityConfig::default().max_image_size)
    }

    pub(crate) fn with_image_limit(
        config: RenderConfig,
        max_image_size: usize,
    ) -> Result<Self, MdToXlsxError> {
        let client = Client::builder()
            .user_agent(concat!("mdxlsx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MdToXlsxError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            max_image_size,
        })
    }

    /// 描画設定
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

impl FenceRenderer for HttpRenderer {
    fn render(&self, kind: ImageKind, source: &str) -> Result<RenderedImage, RenderError> {
        match kind {
            ImageKind::Chart => {
                chart::render_chart(&self.client, &self.config, source, self.max_image_size)
            }
            ImageKind::Mermaid => {
                diagram::render_diagram(&self.client, &self.config, source, self.max_image_size)
            }
        }
    }
}

/// 描画サービスの応答から画像データを取り出す
///
/// ステータスが2xxであること、Content-Typeが`content_type_prefix`で始まること、
/// 本文が`limit`バイト以下であることを検証します。
pub(crate) fn read_image_response(
    response: Response,
    content_type_prefix: &str,
    limit: usize,
) -> Result<Vec<u8>, RenderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RenderError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.starts_with(content_type_prefix) {
        return Err(RenderError::ContentType(content_type));
    }

    if let Some(length) = response.content_length() {
        check_size(length as usize, limit)?;
    }
    let bytes = response.bytes()?;
    check_size(bytes.len(), limit)?;
    Ok(bytes.to_vec())
}

fn check_size(size: usize, limit: usize) -> Result<(), RenderError> {
    if size > limit {
        return Err(RenderError::TooLarge { size, limit });
    }
    Ok(())
}
