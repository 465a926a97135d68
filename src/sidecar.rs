//! Sidecar Module
//!
//! 描画した画像をワークブックと同じディレクトリのサイドカーディレクトリに保存します。
//!
//! ディレクトリ名は既定で`<ワークブックのファイル名（拡張子なし）>_ChartsAndDiagrams`、
//! ファイル名は`<ファイル名>_<種別>_<3桁の連番>.<拡張子>`です。

use std::fs;
use std::path::{Path, PathBuf};

use crate::api::ImageKind;
use crate::error::MdToXlsxError;
use crate::render::ImageFormatKind;

/// サイドカーディレクトリ名の接尾辞
const SIDECAR_DIR_SUFFIX: &str = "_ChartsAndDiagrams";

/// ワークブックのパスからファイル名（拡張子なし）を取得
///
/// # 戻り値
///
/// * `Err(MdToXlsxError::OutputPath)` - パスにファイル名が含まれない場合
pub(crate) fn artifact_stem(artifact_path: &Path) -> Result<String, MdToXlsxError> {
    artifact_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            MdToXlsxError::OutputPath(format!(
                "no file name in '{}'",
                artifact_path.display()
            ))
        })
}

/// 既定のサイドカーディレクトリ名
pub(crate) fn default_dir_name(stem: &str) -> String {
    format!("{}{}", stem, SIDECAR_DIR_SUFFIX)
}

/// サイドカーディレクトリのパス
pub(crate) fn sidecar_dir(
    artifact_path: &Path,
    dir_name: Option<&str>,
) -> Result<PathBuf, MdToXlsxError> {
    let stem = artifact_stem(artifact_path)?;
    let name = dir_name.map_or_else(|| default_dir_name(&stem), str::to_string);
    let parent = artifact_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(name))
}

/// 画像をサイドカーディレクトリに保存
///
/// ディレクトリが存在しない場合は作成します。
/// 拡張子は画像データの先頭シグネチャから判別し、判別できない場合は
/// 画像種別の既定値（チャートは`png`、ダイアグラムは`svg`）を使用します。
///
/// # 引数
///
/// * `bytes` - 画像データ
/// * `artifact_path` - ワークブックの出力パス
/// * `dir_name` - サイドカーディレクトリ名（`None`の場合は既定値）
/// * `kind` - 画像種別
/// * `index` - 種別ごとの連番（1始まり）
///
/// # 戻り値
///
/// 保存したファイルのパス
pub(crate) fn save_image(
    bytes: &[u8],
    artifact_path: &Path,
    dir_name: Option<&str>,
    kind: ImageKind,
    index: u32,
) -> Result<PathBuf, MdToXlsxError> {
    let stem = artifact_stem(artifact_path)?;
    let dir = sidecar_dir(artifact_path, dir_name)?;
    fs::create_dir_all(&dir)?;

    let extension = ImageFormatKind::sniff(bytes)
        .map_or_else(|| kind.default_extension(), |format| format.extension());
    let path = dir.join(format!(
        "{}_{}_{:03}.{}",
        stem,
        kind.as_str(),
        index,
        extension
    ));

    fs::write(&path, bytes)?;
    log::debug!("Saved {} image to {}", kind.as_str(), path.display());
    Ok(path)
}
