//! Public API Types
//!
//! 公開APIで使用する列挙型と設定構造体を定義するモジュール。

use std::time::Duration;

/// 変換モード
///
/// Markdownの構文を解釈するかどうかを指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConversionMode {
    /// Markdownを解釈して書式付きのワークブックを生成（デフォルト）
    ///
    /// 見出し、リスト、引用、テーブル、コードブロック、水平線、
    /// `<pbreak>`によるシート分割を認識します。
    Formatted,

    /// 入力全体をA1セルにそのまま書き込む
    ///
    /// 構文解析は一切行いません。
    Raw,
}

/// ダイアグラム描画機能の有無
///
/// プロセス起動時に一度だけ決定し、設定として描画コンポーネントに渡します。
/// `Disabled`の場合、`mermaid`フェンスは常にコードブロックとして出力されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagramSupport {
    /// 外部サービスを使用してダイアグラムを描画（デフォルト）
    Enabled,

    /// ダイアグラムを描画しない
    Disabled,
}

/// 描画画像の種類
///
/// サイドカー画像のファイル名と、種類ごとの連番カウンターに使用されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// `chart`フェンス（JSONチャート定義）
    Chart,

    /// `mermaid`フェンス（ダイアグラム記述）
    Mermaid,
}

impl ImageKind {
    /// フェンスの言語タグから画像種別を判定
    ///
    /// 言語タグは小文字化済みであることを前提とします。
    pub fn from_fence_language(language: &str) -> Option<Self> {
        match language {
            "chart" => Some(ImageKind::Chart),
            "mermaid" => Some(ImageKind::Mermaid),
            _ => None,
        }
    }

    /// ファイル名に使用する種別タグ
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Chart => "chart",
            ImageKind::Mermaid => "mermaid",
        }
    }

    /// バイト列から形式を判別できない場合の既定の拡張子
    pub fn default_extension(&self) -> &'static str {
        match self {
            ImageKind::Chart => "png",
            ImageKind::Mermaid => "svg",
        }
    }
}

/// 既定のチャート描画エンドポイント
pub const DEFAULT_CHART_ENDPOINT: &str = "https://quickchart.io/chart";

/// 既定のダイアグラム描画サービス
pub const DEFAULT_DIAGRAM_ENDPOINT: &str = "https://kroki.io";

/// 既定のダイアグラム描画フォールバックサービス
pub const DEFAULT_DIAGRAM_FALLBACK_ENDPOINT: &str = "https://mermaid.ink/img";

/// 外部描画サービスの設定
///
/// チャート・ダイアグラムのフェンスを画像に変換する際の接続先と
/// タイムアウトを指定します。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::time::Duration;
/// use mdxlsx::{ConverterBuilder, DiagramSupport, RenderConfig};
///
/// # fn main() -> Result<(), mdxlsx::MdToXlsxError> {
/// let config = RenderConfig {
///     diagram_endpoint: "http://localhost:8000".to_string(),
///     timeout: Duration::from_secs(10),
///     diagram_support: DiagramSupport::Enabled,
///     ..RenderConfig::default()
/// };
/// let converter = ConverterBuilder::new().with_render_config(config).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// チャート描画エンドポイント（JSONをPOST）
    pub chart_endpoint: String,

    /// ダイアグラム描画サービスのベースURL（`/mermaid/svg`、`/mermaid/png`を付加）
    pub diagram_endpoint: String,

    /// ダイアグラム描画フォールバックのベースURL（base64urlエンコードしたテキストを付加）
    pub diagram_fallback_endpoint: String,

    /// チャート描画とダイアグラム描画（主経路）のタイムアウト
    pub timeout: Duration,

    /// ダイアグラム描画（フォールバック経路）のタイムアウト
    pub fallback_timeout: Duration,

    /// 再エンコード時のJPEG品質（1〜100）
    pub jpeg_quality: u8,

    /// ダイアグラム描画機能の有無
    pub diagram_support: DiagramSupport,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chart_endpoint: DEFAULT_CHART_ENDPOINT.to_string(),
            diagram_endpoint: DEFAULT_DIAGRAM_ENDPOINT.to_string(),
            diagram_fallback_endpoint: DEFAULT_DIAGRAM_FALLBACK_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            fallback_timeout: Duration::from_secs(15),
            jpeg_quality: 80,
            diagram_support: DiagramSupport::Enabled,
        }
    }
}

impl RenderConfig {
    /// 環境変数`KROKI_SERVER`を反映した設定を生成
    ///
    /// 環境変数は呼び出し時に一度だけ読み取られます。
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(server) = std::env::var("KROKI_SERVER") {
            let server = server.trim().trim_end_matches('/');
            if !server.is_empty() {
                config.diagram_endpoint = server.to_string();
            }
        }
        config
    }
}
