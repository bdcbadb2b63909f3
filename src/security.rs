//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大な入力ファイルへの対策を提供します。
//! アーカイブ展開（ZIP/7Z）とOffice文書（ZIPパッケージ）の両方で使用されます。

use std::path::{Component, Path, PathBuf};

use crate::error::ConvertError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
/// `ConverterBuilder::with_security_config()`で上書きできます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// アーカイブ内の最大エントリ数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// デフォルトのセキュリティ設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 入力ファイルのサイズ上限を検証する
    ///
    /// ファイルが存在しない場合は`FileNotFound`、それ以外のI/Oエラーは
    /// `FileRead`として返します。
    pub(crate) fn check_input_file(&self, path: &Path) -> Result<u64, ConvertError> {
        let metadata = std::fs::metadata(path).map_err(|e| ConvertError::from_read(path, e))?;
        if metadata.len() > self.max_input_file_size {
            return Err(ConvertError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                metadata.len(),
                self.max_input_file_size
            )));
        }
        Ok(metadata.len())
    }
}

/// アーカイブ展開時の累計量を追跡する
///
/// エントリ数・単一サイズ・展開後の合計サイズを、エントリを
/// 受け取るたびに検証します。
#[derive(Debug)]
pub(crate) struct ExtractionBudget<'a> {
    config: &'a SecurityConfig,
    file_count: usize,
    total_size: u64,
}

impl<'a> ExtractionBudget<'a> {
    pub fn new(config: &'a SecurityConfig) -> Self {
        Self {
            config,
            file_count: 0,
            total_size: 0,
        }
    }

    /// エントリ数の上限を事前に検証（エントリ数が分かる形式のみ）
    pub fn check_entry_count(&self, count: usize) -> Result<(), ConvertError> {
        if count > self.config.max_file_count {
            return Err(ConvertError::SecurityViolation(format!(
                "Archive contains too many files: {} (max: {})",
                count, self.config.max_file_count
            )));
        }
        Ok(())
    }

    /// 1エントリ分のサイズを計上する
    pub fn charge(&mut self, name: &str, size: u64) -> Result<(), ConvertError> {
        self.file_count += 1;
        self.check_entry_count(self.file_count)?;

        if size > self.config.max_file_size {
            return Err(ConvertError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, self.config.max_file_size
            )));
        }

        self.total_size = self.total_size.checked_add(size).ok_or_else(|| {
            ConvertError::SecurityViolation(
                "Total decompressed size calculation overflow".to_string(),
            )
        })?;

        if self.total_size > self.config.max_decompressed_size {
            return Err(ConvertError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                self.total_size, self.config.max_decompressed_size
            )));
        }
        Ok(())
    }
}

/// アーカイブ内のエントリパスの検証
///
/// パストラバーサル攻撃を防ぐため、エントリパスを検証し、
/// 展開先ディレクトリからの相対パスを返します。
///
/// # 引数
///
/// * `path` - 検証するエントリパス（`/`区切り）
///
/// # 戻り値
///
/// * `Ok(PathBuf)` - パスが安全な場合（正規化済みの相対パス）
/// * `Err(String)` - パスが危険な場合（空、絶対パス、`..`コンポーネントを含む）
pub(crate) fn validate_archive_path(path: &str) -> Result<PathBuf, String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:\`やUnix形式の`/`で始まるパス）
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || path.starts_with('\\') || has_drive {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    let mut relative = PathBuf::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(format!("Path traversal detected: {}", path)),
            part => relative.push(part),
        }
    }

    // OS固有の解釈でも通常コンポーネントのみであることを確認
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(format!("Invalid path component: {}", path));
    }

    if relative.as_os_str().is_empty() {
        return Err(format!("Path resolves to nothing: {}", path));
    }

    Ok(relative)
}
