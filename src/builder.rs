//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::api::FileType;
use crate::converters;
use crate::error::ConvertError;
use crate::security::SecurityConfig;

/// アーカイブ内でテキストとして埋め込む拡張子（デフォルト）
const DEFAULT_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "js", "json", "csv", "xml", "html", "css"];

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// アーカイブ内でコードブロックとして埋め込む拡張子（小文字、ドットなし）
    pub text_extensions: Vec<String>,

    /// アーカイブ展開用一時ディレクトリの作成先（Noneの場合はOSの一時ディレクトリ）
    pub temp_root: Option<PathBuf>,

    /// セキュリティ制限
    pub security: SecurityConfig,

    /// ソースコードファイルを変換対象に含めるか
    pub include_code_files: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            text_extensions: DEFAULT_TEXT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            temp_root: None,
            security: SecurityConfig::default(),
            include_code_files: true,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use filetomarkdown::ConverterBuilder;
///
/// # fn main() -> Result<(), filetomarkdown::ConvertError> {
/// let converter = ConverterBuilder::new()
///     .with_text_extensions(["txt", "md", "rs"])
///     .with_temp_root("/var/tmp")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - アーカイブ内テキスト拡張子: `.txt .md .js .json .csv .xml .html .css`
    /// - 一時ディレクトリ: OSの一時ディレクトリ
    /// - セキュリティ制限: `SecurityConfig::default()`
    /// - ソースコード: 変換対象に含める
    pub fn new() -> Self {
        Self::default()
    }

    /// アーカイブ内でテキストとして埋め込む拡張子を指定する
    ///
    /// 先頭の`.`は取り除かれ、小文字で比較されます。
    ///
    /// # 引数
    ///
    /// * `extensions` - 拡張子の列（例: `["txt", ".md"]`）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use filetomarkdown::ConverterBuilder;
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_text_extensions([".txt", ".log", ".toml"]);
    /// ```
    pub fn with_text_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.text_extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext: String = ext.into();
                ext.trim().trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    /// アーカイブ展開用の一時ディレクトリの作成先を指定する
    ///
    /// # 引数
    ///
    /// * `root` - 既存のディレクトリ（`build()`時に検証）
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.temp_root = Some(root.into());
        self
    }

    /// セキュリティ制限を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use filetomarkdown::{ConverterBuilder, SecurityConfig};
    ///
    /// let builder = ConverterBuilder::new().with_security_config(SecurityConfig {
    ///     max_file_count: 500,
    ///     ..SecurityConfig::default()
    /// });
    /// ```
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// ソースコードファイル（`.rs`, `.py`など）を変換対象に含めるかを指定する
    ///
    /// * `true`: 言語名付きのコードブロックとして変換（デフォルト）
    /// * `false`: `UnsupportedFileType`として扱う
    pub fn with_code_files(mut self, include: bool) -> Self {
        self.config.include_code_files = include;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合、Converterインスタンス
    /// * `Err(ConvertError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `ConvertError::Config(String)`: 設定の検証に失敗した場合
    ///   * テキスト拡張子のリストが空、または不正な拡張子を含む
    ///   * 一時ディレクトリの作成先がディレクトリではない
    pub fn build(self) -> Result<Converter, ConvertError> {
        // 1. テキスト拡張子の検証
        if self.config.text_extensions.is_empty() {
            return Err(ConvertError::Config(
                "Text extension list must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .config
            .text_extensions
            .iter()
            .find(|ext| ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(ConvertError::Config(format!(
                "Invalid text extension: '{}'",
                bad
            )));
        }

        // 2. 一時ディレクトリの作成先の検証
        if let Some(root) = &self.config.temp_root {
            if !root.is_dir() {
                return Err(ConvertError::Config(format!(
                    "Temp root is not a directory: {}",
                    root.display()
                )));
            }
        }

        // 3. Converterインスタンス生成
        Ok(Converter::new(self.config))
    }
}

/// 変換処理のファサード
///
/// ファイルをMarkdown形式に変換するためのメインエントリーポイントです。
/// 拡張子から形式を判定し、呼び出しごとに対応するコンバーターを生成します。
///
/// # 使用例
///
/// ```rust,no_run
/// use filetomarkdown::ConverterBuilder;
///
/// # fn main() -> Result<(), filetomarkdown::ConvertError> {
/// let converter = ConverterBuilder::new().build()?;
/// let markdown = converter.convert_path("report.docx")?;
/// converter.convert_to_file("slides.pptx", "slides.md")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// 入力ファイルの形式を判定する
    ///
    /// # 戻り値
    ///
    /// * `Ok(FileType)` - 対応形式の場合
    /// * `Err(ConvertError::UnsupportedFileType)` - 未対応の拡張子、またはソースコードの
    ///   変換が無効な場合（メッセージは小文字の拡張子）
    pub fn file_type_of(&self, path: impl AsRef<Path>) -> Result<FileType, ConvertError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match FileType::from_extension(&ext) {
            Some(FileType::Code) if !self.config.include_code_files => {
                Err(ConvertError::UnsupportedFileType(ext))
            }
            Some(file_type) => Ok(file_type),
            None => Err(ConvertError::UnsupportedFileType(ext)),
        }
    }

    /// ファイルをMarkdown文字列に変換する
    ///
    /// # 引数
    ///
    /// * `path` - 入力ファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 変換されたMarkdown文字列
    /// * `Err(ConvertError)` - 未対応の形式、読み込み失敗、解析失敗など
    pub fn convert_path(&self, path: impl AsRef<Path>) -> Result<String, ConvertError> {
        let path = path.as_ref();
        let file_type = self.file_type_of(path)?;
        debug!("converting {} as {:?}", path.display(), file_type);

        let converter = converters::for_file_type(file_type, &self.config);
        converter.convert(path)
    }

    /// ファイルを変換し、結果を出力ファイルに書き込む
    ///
    /// # 引数
    ///
    /// * `input` - 入力ファイルのパス
    /// * `output` - 出力先のパス（既存の場合は上書き）
    pub fn convert_to_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<(), ConvertError> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let markdown = self.convert_path(input)?;
        std::fs::write(output, markdown.as_bytes())?;
        info!(
            "converted {} -> {} ({} bytes)",
            input.display(),
            output.display(),
            markdown.len()
        );
        Ok(())
    }
}

/// デフォルト設定で1ファイルをMarkdownに変換する
///
/// `ConverterBuilder::new().build()?.convert_path(path)`と同じです。
pub fn convert(path: impl AsRef<Path>) -> Result<String, ConvertError> {
    ConverterBuilder::new().build()?.convert_path(path)
}
