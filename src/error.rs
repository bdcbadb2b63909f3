//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// filetomarkdownクレート全体で使用するエラー型
///
/// 変換処理（ファイル読み込み、アーカイブ展開、XML解析）と、
/// ビューアーの状態管理（プリセット保存、ファイル保存）で発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの分類
///
/// - ファイル読み込み系: `FileNotFound`, `FileRead`, `Io`
///   （元の`std::io::Error`を`source`として保持）
/// - フォーマット・解析系: `Format`, `Xml`, `Zip`, `SevenZip`, `Spreadsheet`, `Pdf`
///   （ODT/ODPコンバーターはこれらをプレースホルダー文書に変換する）
/// - 権限系（ビューアーのみ）: `PermissionDenied`
///
/// # 使用例
///
/// ```rust,no_run
/// use filetomarkdown::{ConverterBuilder, ConvertError};
///
/// let converter = ConverterBuilder::new().build().unwrap();
/// match converter.convert_path("missing.txt") {
///     Err(ConvertError::FileNotFound { path, .. }) => println!("not found: {}", path.display()),
///     Err(e) => println!("error: {}", e),
///     Ok(markdown) => println!("{}", markdown),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイルが存在しない
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// 対象ファイルのパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// 入力ファイルの読み込みに失敗した
    #[error("Failed to read file: {}", path.display())]
    FileRead {
        /// 対象ファイルのパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// レジストリに登録されていない拡張子
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// 文書構造が期待した形式ではない
    #[error("Format error: {0}")]
    Format(String),

    /// XMLの解析エラー（quick-xml由来）
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIPアーカイブの解析・展開エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 7Zアーカイブの解析・展開エラー
    #[error("7z archive error: {0}")]
    SevenZip(String),

    /// スプレッドシートの解析エラー（calamine由来）
    #[error("Failed to parse spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// PDFのテキスト抽出エラー
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// ```rust,no_run
    /// use filetomarkdown::{ConverterBuilder, ConvertError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_text_extensions(Vec::<String>::new())
    ///     .build();
    ///
    /// if let Err(ConvertError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSONのシリアライズ・デシリアライズエラー（プリセット保存）
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// キー・バリューストアへの書き込み失敗（容量超過など）
    #[error("Storage error: {0}")]
    Storage(String),

    /// 指定された名前のプリセットが存在しない
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    /// プリセットのデータが不正
    #[error("Invalid preset data: {0}")]
    InvalidPreset(String),

    /// ファイルハンドルへのアクセス権限が拒否された
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl ConvertError {
    /// エラーコード（HTTP API・ログ出力用の安定した識別子）を返す
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::FileNotFound { .. } => "FILE_NOT_FOUND",
            ConvertError::FileRead { .. } | ConvertError::Io(_) => "FILE_READ_ERROR",
            ConvertError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            ConvertError::Format(_)
            | ConvertError::Xml(_)
            | ConvertError::Zip(_)
            | ConvertError::SevenZip(_)
            | ConvertError::Spreadsheet(_)
            | ConvertError::Pdf(_) => "FORMAT_ERROR",
            ConvertError::SecurityViolation(_) => "SECURITY_VIOLATION",
            ConvertError::Config(_) => "CONFIG_ERROR",
            ConvertError::Json(_)
            | ConvertError::Storage(_)
            | ConvertError::PresetNotFound(_)
            | ConvertError::InvalidPreset(_) => "PRESET_ERROR",
            ConvertError::PermissionDenied(_) => "PERMISSION_DENIED",
        }
    }

    /// 入力ファイルを開く際のI/Oエラーを分類する
    ///
    /// `NotFound`は`FileNotFound`、それ以外は`FileRead`に変換します。
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound { path, source }
        } else {
            ConvertError::FileRead { path, source }
        }
    }
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(err: zip::result::ZipError) -> Self {
        ConvertError::Zip(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ConvertError = io_err.into();

        match error {
            ConvertError::Io(ref e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            _ => panic!("Expected Io error"),
        }
        assert!(error.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_from_read_not_found() {
        let err = ConvertError::from_read(
            "missing.txt",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        match err {
            ConvertError::FileNotFound { ref path, .. } => {
                assert_eq!(path, &PathBuf::from("missing.txt"));
            }
            _ => panic!("Expected FileNotFound error"),
        }
        assert_eq!(err.to_string(), "File not found: missing.txt");
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_from_read_keeps_source() {
        let err = ConvertError::from_read(
            "locked.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
        );
        assert!(matches!(err, ConvertError::FileRead { .. }));
        let source = err.source().expect("source should be attached");
        assert_eq!(source.to_string(), "locked");
    }

    #[test]
    fn test_zip_error_conversion() {
        let error: ConvertError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(error, ConvertError::Zip(_)));
        assert_eq!(error.code(), "FORMAT_ERROR");
    }

    #[test]
    fn test_spreadsheet_error_display() {
        let error: ConvertError = calamine::Error::Msg("Corrupted file").into();
        let msg = error.to_string();
        assert!(msg.contains("Failed to parse spreadsheet"));
        assert!(msg.contains("Corrupted file"));
    }

    #[test]
    fn test_all_error_formats() {
        assert!(ConvertError::Config("x".to_string())
            .to_string()
            .starts_with("Configuration error"));
        assert!(ConvertError::SecurityViolation("x".to_string())
            .to_string()
            .starts_with("Security violation"));
        assert!(ConvertError::UnsupportedFileType("abc".to_string())
            .to_string()
            .contains("abc"));
        assert!(ConvertError::PresetNotFound("p1".to_string())
            .to_string()
            .contains("p1"));
    }
}
