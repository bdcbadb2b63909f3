//! PDF Converter
//!
//! pdf-extractでテキストを抽出します。レイアウトの再構成は行いません。

use std::path::Path;

use log::debug;

use super::{read_input, FormatConverter};
use crate::error::ConvertError;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PdfConverter;

impl FormatConverter for PdfConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let bytes = read_input(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| ConvertError::Pdf(format!("{}: {}", path.display(), e)))?;
        debug!("extracted {} chars from {}", text.len(), path.display());
        Ok(text.trim().to_string())
    }
}
