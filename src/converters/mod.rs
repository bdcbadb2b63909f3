//! Converters Module
//!
//! 形式ごとのコンバーターと、形式からコンバーターを生成するレジストリを提供します。
//! コンバーターは状態を持たず、変換呼び出しごとに生成されます。

mod archive;
mod code;
mod docx;
mod markdown;
mod odp;
mod odt;
mod pdf;
mod pptx;
mod spreadsheet;
pub(crate) mod table;
pub(crate) mod text;

use std::path::Path;

use log::warn;

use crate::api::FileType;
use crate::builder::ConversionConfig;
use crate::error::ConvertError;

pub(crate) use archive::{ArchiveConverter, ArchiveKind};

/// 1つのファイル形式をMarkdownに変換するコンバーター
pub(crate) trait FormatConverter: Send + Sync {
    /// ファイルを読み込み、Markdown文字列を返す
    fn convert(&self, path: &Path) -> Result<String, ConvertError>;
}

/// 形式に対応するコンバーターを生成する（コンバーターレジストリ）
pub(crate) fn for_file_type(
    file_type: FileType,
    config: &ConversionConfig,
) -> Box<dyn FormatConverter> {
    match file_type {
        FileType::Markdown => Box::new(markdown::MarkdownConverter),
        FileType::Pdf => Box::new(pdf::PdfConverter),
        FileType::Text => Box::new(text::TextConverter),
        FileType::Docx => Box::new(docx::DocxConverter::new(config.security.clone())),
        FileType::Odt => Box::new(odt::OdtConverter::new(config.security.clone())),
        FileType::Pptx => Box::new(pptx::PptxConverter::new(config.security.clone())),
        FileType::Odp => Box::new(odp::OdpConverter::new(config.security.clone())),
        FileType::Xlsx | FileType::Ods => Box::new(spreadsheet::SpreadsheetConverter::new(
            config.security.clone(),
        )),
        FileType::SevenZip => Box::new(ArchiveConverter::new(ArchiveKind::SevenZip, config)),
        FileType::Zip => Box::new(ArchiveConverter::new(ArchiveKind::Zip, config)),
        FileType::Code => Box::new(code::CodeConverter),
    }
}

/// 入力ファイルをバイト列として読み込む
///
/// 存在しない場合は`FileNotFound`、それ以外の失敗は`FileRead`を返します。
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, ConvertError> {
    std::fs::read(path).map_err(|e| ConvertError::from_read(path, e))
}

/// フォーマット・解析エラーをプレースホルダー文書に置き換える
///
/// ファイル読み込みエラーとセキュリティ違反はそのまま返します。
pub(crate) fn placeholder_on_format_error(
    path: &Path,
    result: Result<String, ConvertError>,
    placeholder: impl FnOnce(&ConvertError) -> String,
) -> Result<String, ConvertError> {
    match result {
        Err(
            e @ (ConvertError::Format(_)
            | ConvertError::Xml(_)
            | ConvertError::Zip(_)
            | ConvertError::Io(_)),
        ) => {
            warn!("{}: {}; emitting placeholder document", path.display(), e);
            Ok(placeholder(&e))
        }
        other => other,
    }
}
