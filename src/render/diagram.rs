//! Diagram Rendering Module
//!
//! `mermaid`フェンスのダイアグラム記述を外部サービスで画像に変換します。
//!
//! 主経路はKroki互換サービス（SVGで描画可能かを確認した後、PNGを取得してJPEGに変換）、
//! 主経路が失敗した場合はmermaid.ink互換サービス（base64urlエンコードしたURLへのGET）を使用します。

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::raster::{flatten_to_jpeg, reencode_jpeg};
use super::{read_image_response, RenderError, RenderedImage};
use crate::api::{DiagramSupport, RenderConfig};

/// ダイアグラムを描画
///
/// # 戻り値
///
/// * `Ok(RenderedImage)` - いずれかの経路で描画に成功した場合
/// * `Err(RenderError::Unavailable)` - ダイアグラム描画が無効化されている場合
/// * `Err(RenderError::Exhausted)` - 両方の経路が失敗した場合
pub(crate) fn render_diagram(
    client: &Client,
    config: &RenderConfig,
    source: &str,
    max_image_size: usize,
) -> Result<RenderedImage, RenderError> {
    if config.diagram_support == DiagramSupport::Disabled {
        return Err(RenderError::Unavailable);
    }

    let primary = match render_primary(client, config, source, max_image_size) {
        Ok(image) => return Ok(image),
        Err(e) => e,
    };
    log::warn!(
        "Diagram rendering via {} failed: {}. Falling back to {}",
        config.diagram_endpoint,
        primary,
        config.diagram_fallback_endpoint
    );

    render_fallback(client, config, source, max_image_size).map_err(|fallback| {
        RenderError::Exhausted {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    })
}

/// 主経路: SVGで描画可能かを確認し、PNGを取得して白背景のJPEGに変換
fn render_primary(
    client: &Client,
    config: &RenderConfig,
    source: &str,
    max_image_size: usize,
) -> Result<RenderedImage, RenderError> {
    let base = config.diagram_endpoint.trim_end_matches('/');

    // SVGの描画確認（本文は使用しない）
    let svg = client
        .post(format!("{}/mermaid/svg", base))
        .timeout(config.timeout)
        .header(ACCEPT, "image/svg+xml")
        .header(CONTENT_TYPE, "text/plain")
        .body(source.to_string())
        .send()?;
    read_image_response(svg, "image/svg", max_image_size)?;
    log::debug!("Diagram accepted by {}/mermaid/svg", base);

    let png = client
        .post(format!("{}/mermaid/png", base))
        .timeout(config.timeout)
        .header(ACCEPT, "image/png")
        .header(CONTENT_TYPE, "text/plain")
        .body(source.to_string())
        .send()?;
    let png_bytes = read_image_response(png, "image/", max_image_size)?;

    let jpeg = flatten_to_jpeg(&png_bytes, config.jpeg_quality)?;
    log::debug!(
        "Converted diagram PNG ({} bytes) to JPEG ({} bytes, quality={})",
        png_bytes.len(),
        jpeg.len(),
        config.jpeg_quality
    );
    Ok(RenderedImage::new(jpeg))
}

/// フォールバック経路: base64urlエンコードしたダイアグラム記述をURLに埋め込んでGET
///
/// 取得した画像はJPEGへの再エンコードを試み、元のデータより小さくなった場合のみ採用します。
fn render_fallback(
    client: &Client,
    config: &RenderConfig,
    source: &str,
    max_image_size: usize,
) -> Result<RenderedImage, RenderError> {
    let url = fallback_url(&config.diagram_fallback_endpoint, source);

    let response = client.get(url).timeout(config.fallback_timeout).send()?;
    let bytes = read_image_response(response, "image/", max_image_size)?;

    match reencode_jpeg(&bytes, config.jpeg_quality) {
        Ok(jpeg) if jpeg.len() < bytes.len() => Ok(RenderedImage::new(jpeg)),
        Ok(_) => Ok(RenderedImage::new(bytes)),
        Err(e) => {
            log::debug!("Keeping fallback diagram image as-is: {}", e);
            Ok(RenderedImage::new(bytes))
        }
    }
}

/// フォールバックサービスのURLを生成
fn fallback_url(base: &str, source: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        URL_SAFE.encode(source.as_bytes())
    )
}
