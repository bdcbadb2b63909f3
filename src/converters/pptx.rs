//! PPTX Converter
//!
//! `ppt/slides/slide{N}.xml`をスライド番号順に読み込み、各段落（`a:p`）を
//! 1行として出力します。

use std::path::Path;

use log::debug;

use super::FormatConverter;
use crate::error::ConvertError;
use crate::package::Package;
use crate::security::SecurityConfig;
use crate::xml::{parse_document, XmlElement};

const NO_SLIDES: &str = "# Presentation\n\nNo slides found.\n\n---\n\n";

/// PPTXコンバーター
#[derive(Debug, Clone)]
pub(crate) struct PptxConverter {
    security: SecurityConfig,
}

impl PptxConverter {
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }
}

impl FormatConverter for PptxConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let mut package = Package::open(path, &self.security)?;

        let mut slides: Vec<(u32, String)> = package
            .entry_names()
            .into_iter()
            .filter_map(|name| slide_number(&name).map(|n| (n, name)))
            .collect();
        if slides.is_empty() {
            return Ok(NO_SLIDES.to_string());
        }
        slides.sort_by_key(|(n, _)| *n);
        debug!("{}: {} slides", path.display(), slides.len());

        let mut markdown = String::new();
        for (idx, (_, name)) in slides.iter().enumerate() {
            let xml = package
                .read_text(name)?
                .ok_or_else(|| ConvertError::Format(format!("Missing slide entry: {}", name)))?;
            let root = parse_document(&xml)?;
            let lines = root
                .descend(&["p:cSld", "p:spTree"])
                .map(paragraph_lines)
                .unwrap_or_default();
            markdown.push_str(&format!(
                "# Slide {}\n\n{}\n\n---\n\n",
                idx + 1,
                lines.join("\n")
            ));
        }
        Ok(markdown.trim().to_string())
    }
}

/// `ppt/slides/slide12.xml` → `Some(12)`
///
/// リレーションシップ（`ppt/slides/_rels/...`）やレイアウトは対象外です。
fn slide_number(entry_name: &str) -> Option<u32> {
    entry_name
        .strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// 図形ツリー内の段落テキスト（空のものは除く）
fn paragraph_lines(tree: &XmlElement) -> Vec<String> {
    let mut paragraphs = Vec::new();
    tree.find_all("a:p", &mut paragraphs);

    paragraphs
        .into_iter()
        .filter_map(|p| {
            let mut runs = Vec::new();
            p.find_all("a:t", &mut runs);
            let text: String = runs.iter().map(|t| t.text_content()).collect();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect()
}
