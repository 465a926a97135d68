//! Chart Rendering Module
//!
//! `chart`フェンスのJSON定義をチャート描画サービスに送信し、PNG画像を取得します。

use std::sync::LazyLock;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::Error as _;
use serde::Serialize;
use serde_json::{json, Value};

use super::{read_image_response, RenderError, RenderedImage};
use crate::api::RenderConfig;

/// 既定の画像幅（ピクセル）
const DEFAULT_WIDTH: u32 = 500;

/// 既定の画像高さ（ピクセル）
const DEFAULT_HEIGHT: u32 = 300;

/// JSONとして解釈できない構文の除去パターン（適用順）
static UNSAFE_CONSTRUCTS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // "callback": "function(...) {...}"
        Regex::new(r#"(?s)"callback":\s*"function\(.*?\)\s*\{[^}]*\}""#),
        // "formatter": (v) => {...}
        Regex::new(r#"(?s)"formatter":\s*\(.*?\)\s*=>\s*\{[^}]*\},?"#),
        // "tooltips": {... "callbacks": {...}}
        Regex::new(r#"(?s)"tooltips":\s*\{[^}]*"callbacks":\s*\{[^}]*\}\}"#),
        // "annotation": {... "annotations": [...]}
        Regex::new(r#"(?s)"annotation":\s*\{[^}]*"annotations":\s*\[[^\]]*\]\}"#),
    ]
    .map(|re| re.expect("valid chart sanitizer regex"))
});

/// 閉じ括弧直前のカンマ
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid trailing comma regex"));

/// チャート描画サービスへのリクエスト
#[derive(Debug, Serialize)]
struct ChartRequest<'a> {
    chart: &'a Value,
    width: &'a Value,
    height: &'a Value,
    format: &'static str,
}

/// チャート定義からJavaScript由来の構文を除去
///
/// コールバック関数、フォーマッタのアロー関数、ツールチップのコールバック、
/// アノテーション、閉じ括弧直前のカンマを取り除きます。
/// 完全なJSON修復ではなく、既知のパターンのみを対象とします。
pub(crate) fn sanitize_chart_source(source: &str) -> String {
    let mut text = source.to_string();
    for re in UNSAFE_CONSTRUCTS.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    TRAILING_COMMA.replace_all(&text, "}").into_owned()
}

/// チャート定義を解析し、描画サービスに送るリクエスト本文を生成
///
/// トップレベルの`width`と`height`（既定値500×300）、`config`（既定値`{}`）を使用します。
pub(crate) fn build_request_body(source: &str) -> Result<Value, RenderError> {
    let definition: Value = serde_json::from_str(&sanitize_chart_source(source))?;
    let Value::Object(fields) = definition else {
        return Err(RenderError::ChartJson(serde_json::Error::custom(
            "chart definition must be a JSON object",
        )));
    };

    let width = fields
        .get("width")
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_WIDTH));
    let height = fields
        .get("height")
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_HEIGHT));
    let chart = fields.get("config").cloned().unwrap_or_else(|| json!({}));

    let request = ChartRequest {
        chart: &chart,
        width: &width,
        height: &height,
        format: "png",
    };
    Ok(serde_json::to_value(request)?)
}

/// チャートを描画
pub(crate) fn render_chart(
    client: &Client,
    config: &RenderConfig,
    source: &str,
    max_image_size: usize,
) -> Result<RenderedImage, RenderError> {
    let body = build_request_body(source)?;

    log::debug!("Requesting chart rendering from {}", config.chart_endpoint);
    let response = client
        .post(config.chart_endpoint.as_str())
        .timeout(config.timeout)
        .header(ACCEPT, "image/png")
        .json(&body)
        .send()?;

    let bytes = read_image_response(response, "image/", max_image_size)?;
    Ok(RenderedImage::new(bytes))
}
