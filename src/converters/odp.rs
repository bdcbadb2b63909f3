//! ODP Converter
//!
//! OpenDocumentプレゼンテーションの各ページ（`draw:page`）を
//! `# Slide n`見出し付きのセクションに変換します。

use std::path::Path;

use super::odt::inline_text;
use super::{placeholder_on_format_error, FormatConverter};
use crate::error::ConvertError;
use crate::package::Package;
use crate::security::SecurityConfig;
use crate::xml::{parse_document, XmlElement};

const NO_CONTENT: &str = "# Presentation\n\nNo content found.\n\n---\n\n";
const NO_SLIDES: &str = "# Presentation\n\nNo slides found.\n\n---\n\n";
const NO_TEXT: &str = "No text content found.";

/// ODPコンバーター
#[derive(Debug, Clone)]
pub(crate) struct OdpConverter {
    security: SecurityConfig,
}

impl OdpConverter {
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }

    fn render(&self, path: &Path) -> Result<String, ConvertError> {
        let mut package = Package::open(path, &self.security)?;
        let Some(content) = package.read_text("content.xml")? else {
            return Ok(NO_CONTENT.to_string());
        };

        let root = parse_document(&content)?;
        let pages: Vec<&XmlElement> = root
            .descend(&["office:body", "office:presentation"])
            .map(|presentation| presentation.children_named("draw:page").collect())
            .unwrap_or_default();
        if pages.is_empty() {
            return Ok(NO_SLIDES.to_string());
        }

        let markdown: String = pages
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                let lines = slide_lines(page);
                let body = if lines.is_empty() {
                    NO_TEXT.to_string()
                } else {
                    lines.join("\n")
                };
                format!("# Slide {}\n\n{}\n\n---\n\n", idx + 1, body)
            })
            .collect();
        Ok(markdown.trim().to_string())
    }
}

impl FormatConverter for OdpConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        placeholder_on_format_error(path, self.render(path), |e| {
            format!(
                "# Presentation\n\nError reading presentation: {}\n\n---\n\n",
                e
            )
        })
    }
}

/// ページ内の段落・見出しテキストを文書順に収集する
fn slide_lines(page: &XmlElement) -> Vec<String> {
    let mut lines = Vec::new();
    collect_lines(page, &mut lines);
    lines
}

fn collect_lines(element: &XmlElement, lines: &mut Vec<String>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "text:p" | "text:h" => {
                let text = inline_text(child);
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
            }
            // 発表者ノート
            "presentation:notes" => {}
            _ => collect_lines(child, lines),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::test_support::write_zip;

    fn content_xml(presentation: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:presentation="urn:oasis:names:tc:opendocument:xmlns:presentation:1.0"><office:body><office:presentation>{}</office:presentation></office:body></office:document-content>"#,
            presentation
        )
    }

    fn convert_entries(entries: &[(&str, &str)]) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.odp");
        write_zip(&path, entries);
        OdpConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap()
    }

    #[test]
    fn test_slides_with_text_and_empty_slide() {
        let xml = content_xml(
            r#"<draw:page draw:name="p1"><draw:frame><draw:text-box><text:p>Title</text:p><text:p> </text:p><text:p>Body <text:span>text</text:span></text:p></draw:text-box></draw:frame><presentation:notes><draw:frame><draw:text-box><text:p>secret note</text:p></draw:text-box></draw:frame></presentation:notes></draw:page><draw:page draw:name="p2"/>"#,
        );
        let md = convert_entries(&[("content.xml", &xml)]);
        assert_eq!(
            md,
            "# Slide 1\n\nTitle\nBody text\n\n---\n\n# Slide 2\n\nNo text content found.\n\n---"
        );
    }

    #[test]
    fn test_no_pages_placeholder() {
        let md = convert_entries(&[("content.xml", &content_xml(""))]);
        assert_eq!(md, NO_SLIDES);
    }

    #[test]
    fn test_missing_content_placeholder() {
        let md = convert_entries(&[("meta.xml", "<meta/>")]);
        assert_eq!(md, NO_CONTENT);
    }

    #[test]
    fn test_malformed_xml_placeholder() {
        let md = convert_entries(&[("content.xml", "<office:document-content>")]);
        assert!(md.starts_with("# Presentation\n\nError reading presentation: "));
        assert!(md.ends_with("\n\n---\n\n"));
    }
}
