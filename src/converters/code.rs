//! Source Code Converter
//!
//! ソースコードをファイル名の見出しと、言語名付きのコードブロックに変換します。

use std::path::Path;

use super::{read_input, FormatConverter};
use crate::api::code_language;
use crate::error::ConvertError;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CodeConverter;

impl FormatConverter for CodeConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let bytes = read_input(path)?;
        let content = String::from_utf8_lossy(&bytes);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lang = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .and_then(|e| code_language(&e))
            .unwrap_or("plaintext");

        let markdown = format!("# {}\n\n```{}\n{}\n```", file_name, lang, content);
        Ok(markdown.trim().to_string())
    }
}
