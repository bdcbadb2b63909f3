//! ODT Converter
//!
//! OpenDocumentテキストの`content.xml`を型付きツリーとして解析し、
//! 見出し・段落・リスト・表をMarkdownに変換します。
//!
//! 構造が壊れた文書でも例外にはせず、プレースホルダー文書を返します。

use std::path::Path;

use super::table::render_pipe_table;
use super::{placeholder_on_format_error, FormatConverter};
use crate::error::ConvertError;
use crate::package::Package;
use crate::security::SecurityConfig;
use crate::xml::{parse_document, XmlElement, XmlNode};

const NO_CONTENT: &str = "# Document\n\nNo content found.\n\n";
const NO_READABLE_CONTENT: &str = "# Document\n\nNo readable content found.\n\n";

/// 同一セルの繰り返し指定（`table:number-columns-repeated`）の上限
const MAX_REPEATED_CELLS: usize = 64;

/// `text:s`の`text:c`の上限
const MAX_REPEATED_SPACES: usize = 64;

/// ODTのブロック要素
#[derive(Debug, Clone, PartialEq)]
enum OdtBlock {
    Heading { level: usize, text: String },
    Paragraph(String),
    List(Vec<ListEntry>),
    Table(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq)]
struct ListEntry {
    depth: usize,
    text: String,
}

/// ODTコンバーター
#[derive(Debug, Clone)]
pub(crate) struct OdtConverter {
    security: SecurityConfig,
}

impl OdtConverter {
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }

    fn render(&self, path: &Path) -> Result<String, ConvertError> {
        let mut package = Package::open(path, &self.security)?;
        let Some(content) = package.read_text("content.xml")? else {
            return Ok(NO_CONTENT.to_string());
        };

        let root = parse_document(&content)?;
        let mut blocks = Vec::new();
        if let Some(body) = root.descend(&["office:body", "office:text"]) {
            collect_blocks(body, &mut blocks);
        }

        let markdown = render_blocks(&blocks);
        let markdown = markdown.trim();
        if markdown.is_empty() {
            Ok(NO_READABLE_CONTENT.to_string())
        } else {
            Ok(markdown.to_string())
        }
    }
}

impl FormatConverter for OdtConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        placeholder_on_format_error(path, self.render(path), |e| {
            format!("# Document\n\nError reading document: {}\n\n", e)
        })
    }
}

/// 本文を深さ優先で走査し、ブロック要素を文書順に収集する
fn collect_blocks(element: &XmlElement, blocks: &mut Vec<OdtBlock>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "text:h" => {
                let level = child
                    .attr("text:outline-level")
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, 6);
                let text = inline_text(child);
                let text = text.trim();
                if !text.is_empty() {
                    blocks.push(OdtBlock::Heading {
                        level,
                        text: text.to_string(),
                    });
                }
            }
            "text:p" => {
                let text = inline_text(child);
                let text = text.trim();
                if !text.is_empty() {
                    blocks.push(OdtBlock::Paragraph(text.to_string()));
                }
            }
            "text:list" => {
                let mut entries = Vec::new();
                collect_list(child, 0, &mut entries);
                if !entries.is_empty() {
                    blocks.push(OdtBlock::List(entries));
                }
            }
            "table:table" => {
                let mut rows = Vec::new();
                collect_rows(child, &mut rows);
                if !rows.is_empty() {
                    blocks.push(OdtBlock::Table(rows));
                }
            }
            // 宣言類・フォームはテキストを持たない
            "text:sequence-decls" | "text:variable-decls" | "office:forms" => {}
            _ => collect_blocks(child, blocks),
        }
    }
}

fn collect_list(list: &XmlElement, depth: usize, entries: &mut Vec<ListEntry>) {
    for item in list
        .child_elements()
        .filter(|e| e.name == "text:list-item" || e.name == "text:list-header")
    {
        let text = paragraph_texts(item).join(" ");
        if !text.is_empty() {
            entries.push(ListEntry { depth, text });
        }
        for nested in item.children_named("text:list") {
            collect_list(nested, depth + 1, entries);
        }
    }
}

fn collect_rows(element: &XmlElement, rows: &mut Vec<Vec<String>>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "table:table-row" => {
                let mut cells = Vec::new();
                for cell in child.child_elements() {
                    match cell.name.as_str() {
                        "table:table-cell" => {
                            let text = paragraph_texts(cell).join(" ");
                            let repeat = if text.is_empty() {
                                1
                            } else {
                                cell.attr("table:number-columns-repeated")
                                    .and_then(|v| v.parse::<usize>().ok())
                                    .unwrap_or(1)
                                    .clamp(1, MAX_REPEATED_CELLS)
                            };
                            cells.extend(std::iter::repeat(text).take(repeat));
                        }
                        "table:covered-table-cell" => cells.push(String::new()),
                        _ => {}
                    }
                }
                if !cells.is_empty() {
                    rows.push(cells);
                }
            }
            "table:table-header-rows" | "table:table-rows" | "table:table-row-group" => {
                collect_rows(child, rows)
            }
            _ => {}
        }
    }
}

/// 要素内の段落・見出しのテキストを文書順に収集する（空のものは除く）
fn paragraph_texts(element: &XmlElement) -> Vec<String> {
    let mut texts = Vec::new();
    for child in element.child_elements() {
        match child.name.as_str() {
            "text:p" | "text:h" => {
                let text = inline_text(child);
                let text = text.trim();
                if !text.is_empty() {
                    texts.push(text.to_string());
                }
            }
            // ネストしたリストは呼び出し側で別に処理する
            "text:list" => {}
            _ => texts.extend(paragraph_texts(child)),
        }
    }
    texts
}

/// 段落内のインラインテキストを文書順に連結する
///
/// `text:s`は`text:c`個の空白、`text:tab`はタブ、`text:line-break`は改行になります。
/// 注釈・脚注の本文は含めません。
pub(super) fn inline_text(element: &XmlElement) -> String {
    let mut out = String::new();
    push_inline(element, &mut out);
    out
}

fn push_inline(element: &XmlElement, out: &mut String) {
    for node in &element.children {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => match child.name.as_str() {
                "text:s" => {
                    let count = child
                        .attr("text:c")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(1)
                        .min(MAX_REPEATED_SPACES);
                    out.push_str(&" ".repeat(count));
                }
                "text:tab" => out.push('\t'),
                "text:line-break" => out.push('\n'),
                "office:annotation" | "text:note" => {}
                _ => push_inline(child, out),
            },
        }
    }
}

fn render_blocks(blocks: &[OdtBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            OdtBlock::Heading { level, text } => {
                out.push_str(&format!("{} {}\n\n", "#".repeat(*level), text));
            }
            OdtBlock::Paragraph(text) => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            OdtBlock::List(entries) => {
                for entry in entries {
                    out.push_str(&format!("{}- {}\n", "  ".repeat(entry.depth), entry.text));
                }
                out.push('\n');
            }
            OdtBlock::Table(rows) => {
                out.push_str(&render_pipe_table(rows));
                out.push_str("\n\n");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::test_support::write_zip;

    fn content_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"><office:body><office:text>{}</office:text></office:body></office:document-content>"#,
            body
        )
    }

    fn convert_body(body: &str) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.odt");
        write_zip(&path, &[("content.xml", &content_xml(body))]);
        OdtConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap()
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = convert_body(
            r#"<text:h text:outline-level="2">Intro</text:h><text:p>Hello <text:span>big</text:span><text:s text:c="2"/>world</text:p><text:p/><text:h text:outline-level="9">Deep</text:h>"#,
        );
        assert_eq!(md, "## Intro\n\nHello big  world\n\n###### Deep");
    }

    #[test]
    fn test_space_count_is_clamped() {
        let md = convert_body(r#"<text:p>a<text:s text:c="18446744073709551615"/>b</text:p>"#);
        assert_eq!(md, format!("a{}b", " ".repeat(MAX_REPEATED_SPACES)));

        let md = convert_body(r#"<text:p>a<text:s text:c="-3"/>b</text:p>"#);
        assert_eq!(md, "a b");
    }

    #[test]
    fn test_heading_without_level_defaults_to_one() {
        assert_eq!(convert_body("<text:h>Top</text:h>"), "# Top");
    }

    #[test]
    fn test_nested_list() {
        let md = convert_body(
            r#"<text:list><text:list-item><text:p>one</text:p><text:list><text:list-item><text:p>inner</text:p></text:list-item></text:list></text:list-item><text:list-item><text:p>two</text:p></text:list-item></text:list><text:p>after</text:p>"#,
        );
        assert_eq!(md, "- one\n  - inner\n- two\n\nafter");
    }

    #[test]
    fn test_table_with_header_separator() {
        let md = convert_body(
            r#"<table:table><table:table-header-rows><table:table-row><table:table-cell><text:p>Name</text:p></table:table-cell><table:table-cell><text:p>Qty</text:p></table:table-cell></table:table-row></table:table-header-rows><table:table-row><table:table-cell><text:p>Apple</text:p></table:table-cell><table:table-cell><text:p>3</text:p></table:table-cell></table:table-row></table:table>"#,
        );
        assert_eq!(md, "| Name | Qty |\n| --- | --- |\n| Apple | 3 |");
    }

    #[test]
    fn test_sections_are_descended() {
        let md = convert_body(
            r#"<text:sequence-decls><text:sequence-decl text:name="Figure"/></text:sequence-decls><text:section><text:p>inside</text:p></text:section>"#,
        );
        assert_eq!(md, "inside");
    }

    #[test]
    fn test_empty_body_placeholder() {
        assert_eq!(convert_body("<text:p>   </text:p>"), NO_READABLE_CONTENT);
    }

    #[test]
    fn test_missing_content_xml_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.odt");
        write_zip(&path, &[("mimetype", "application/vnd.oasis.opendocument.text")]);

        let md = OdtConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap();
        assert_eq!(md, NO_CONTENT);
    }

    #[test]
    fn test_malformed_xml_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.odt");
        write_zip(&path, &[("content.xml", "<office:document-content><office:body>")]);

        let md = OdtConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap();
        assert!(md.starts_with("# Document\n\nError reading document: "));
    }

    #[test]
    fn test_not_a_zip_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.odt");
        std::fs::write(&path, "garbage").unwrap();

        let md = OdtConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap();
        assert!(md.starts_with("# Document\n\nError reading document: "));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = OdtConverter::new(SecurityConfig::default()).convert(Path::new("nope.odt"));
        assert!(matches!(result, Err(ConvertError::FileNotFound { .. })));
    }
}
