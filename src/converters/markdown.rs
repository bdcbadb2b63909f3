//! Markdown passthrough converter

use std::path::Path;

use super::{read_input, FormatConverter};
use crate::error::ConvertError;

/// MDコンバーター（内容をそのまま返す）
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MarkdownConverter;

impl FormatConverter for MarkdownConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let bytes = read_input(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
