//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! 入力サイズと描画画像サイズの上限、サイドカーディレクトリ名のパストラバーサル対策を提供します。

use crate::error::MdToXlsxError;

/// セキュリティ設定
///
/// 変換処理時のリソース制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力Markdownの最大サイズ（バイト）
    /// デフォルト: 64MB (67_108_864 bytes)
    pub max_input_size: usize,
    /// 描画サービスから受け取る画像の最大サイズ（バイト）
    /// デフォルト: 32MB (33_554_432 bytes)
    pub max_image_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_size: 67_108_864, // 64MB
            max_image_size: 33_554_432, // 32MB
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 上限以下の場合
    /// * `Err(MdToXlsxError::SecurityViolation)` - 上限を超えた場合
    pub fn check_input_size(&self, size: usize) -> Result<(), MdToXlsxError> {
        if size > self.max_input_size {
            return Err(MdToXlsxError::SecurityViolation(format!(
                "Input size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_size
            )));
        }
        Ok(())
    }
}

/// パス部品の検証
///
/// サイドカーディレクトリ名など、出力ディレクトリ直下に作成する
/// 単一のパス部品を検証します。
///
/// # 引数
///
/// * `component` - 検証するパス部品
///
/// # 戻り値
///
/// * `Ok(())` - 安全な場合
/// * `Err(String)` - 空、絶対パス、`..`、パス区切り文字を含む場合
pub(crate) fn validate_path_component(component: &str) -> Result<(), String> {
    // 空の名前は拒否
    if component.trim().is_empty() {
        return Err("Empty path component is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式のドライブ指定を含む）
    if component.starts_with('/') || component.as_bytes().get(1) == Some(&b':') {
        return Err(format!("Absolute path is not allowed: {}", component));
    }

    // `..`を含む名前を拒否（ディレクトリトラバーサル攻撃）
    if component.contains("..") {
        return Err(format!("Path traversal detected: {}", component));
    }

    // パス区切り文字を拒否
    if component.contains('/') || component.contains('\\') {
        return Err(format!(
            "Path separator in component is not allowed: {}",
            component
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_config_default() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_input_size, 64 * 1024 * 1024);
        assert_eq!(config.max_image_size, 32 * 1024 * 1024);
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_size: 10,
            ..SecurityConfig::default()
        };
        assert!(config.check_input_size(10).is_ok());
        assert!(matches!(
            config.check_input_size(11),
            Err(MdToXlsxError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_validate_path_component_valid() {
        assert!(validate_path_component("report_ChartsAndDiagrams").is_ok());
        assert!(validate_path_component("images").is_ok());
        assert!(validate_path_component("図表").is_ok());
    }

    #[test]
    fn test_validate_path_component_empty() {
        assert!(validate_path_component("").is_err());
        assert!(validate_path_component("   ").is_err());
    }

    #[test]
    fn test_validate_path_component_absolute() {
        assert!(validate_path_component("/etc").is_err());
        assert!(validate_path_component("C:images").is_err());
        assert!(validate_path_component("c:\\images").is_err());
    }

    #[test]
    fn test_validate_path_component_traversal() {
        assert!(validate_path_component("..").is_err());
        assert!(validate_path_component("images..").is_err());
    }

    #[test]
    fn test_validate_path_component_separator() {
        assert!(validate_path_component("a/b").is_err());
        assert!(validate_path_component("a\\b").is_err());
    }
}
