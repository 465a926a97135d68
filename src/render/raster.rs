//! Raster Module
//!
//! 描画結果の画像形式の判別と、JPEGへの再エンコードを提供します。

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

use super::RenderError;

/// 描画画像のファイル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageFormatKind {
    Svg,
    Png,
    Jpeg,
}

impl ImageFormatKind {
    /// 先頭のシグネチャから形式を判別
    ///
    /// `<svg`または`<?xml`はSVG、`\x89PNG`はPNG、`\xFF\xD8\xFF`はJPEGです。
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") {
            Some(ImageFormatKind::Svg)
        } else if bytes.starts_with(b"\x89PNG") {
            Some(ImageFormatKind::Png)
        } else if bytes.starts_with(b"\xFF\xD8\xFF") {
            Some(ImageFormatKind::Jpeg)
        } else {
            None
        }
    }

    /// ファイル拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormatKind::Svg => "svg",
            ImageFormatKind::Png => "png",
            ImageFormatKind::Jpeg => "jpg",
        }
    }
}

/// 画像を白背景に合成し、JPEGとしてエンコード
///
/// 透過部分は白で塗りつぶされます。
pub(crate) fn flatten_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();

    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.put_pixel(x, y, Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]));
    }

    encode_jpeg(DynamicImage::ImageRgb8(rgb), quality)
}

/// 画像をRGBに変換し、JPEGとして再エンコード
///
/// アルファチャンネルは合成せずに破棄します。
pub(crate) fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    encode_jpeg(DynamicImage::ImageRgb8(rgb), quality)
}

fn encode_jpeg(image: DynamicImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::new();
    image.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// アルファ値`alpha`のチャンネル値`channel`を白背景に合成
fn over_white(channel: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let blended = (u32::from(channel) * a + 255 * (255 - a) + 127) / 255;
    blended as u8
}
