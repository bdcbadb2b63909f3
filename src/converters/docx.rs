//! DOCX Converter
//!
//! `word/document.xml`の本文を走査し、見出しスタイル・リスト・太字/斜体・表を
//! Markdownに変換します。

use std::path::Path;

use super::table::render_pipe_table;
use super::FormatConverter;
use crate::error::ConvertError;
use crate::package::Package;
use crate::security::SecurityConfig;
use crate::xml::{parse_document, XmlElement, XmlNode};

const DOCUMENT_ENTRY: &str = "word/document.xml";

/// DOCXのブロック要素
#[derive(Debug, Clone, PartialEq)]
enum DocxBlock {
    Heading { level: usize, text: String },
    Paragraph(String),
    ListItem { level: usize, text: String },
    Table(Vec<Vec<String>>),
}

/// ラン（書式が同一のテキスト片）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

/// DOCXコンバーター
#[derive(Debug, Clone)]
pub(crate) struct DocxConverter {
    security: SecurityConfig,
}

impl DocxConverter {
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }
}

impl FormatConverter for DocxConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let mut package = Package::open(path, &self.security)?;
        let xml = package.read_text(DOCUMENT_ENTRY)?.ok_or_else(|| {
            ConvertError::Format(format!("{} not found in {}", DOCUMENT_ENTRY, path.display()))
        })?;

        let root = parse_document(&xml)?;
        let mut blocks = Vec::new();
        if let Some(body) = root.child("w:body") {
            collect_blocks(body, &mut blocks);
        }
        Ok(render_blocks(&blocks).trim().to_string())
    }
}

fn collect_blocks(element: &XmlElement, blocks: &mut Vec<DocxBlock>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "w:p" => {
                if let Some(block) = paragraph_block(child) {
                    blocks.push(block);
                }
            }
            "w:tbl" => {
                let rows = table_rows(child);
                if !rows.is_empty() {
                    blocks.push(DocxBlock::Table(rows));
                }
            }
            // コンテンツコントロール・変更履歴の挿入
            "w:sdt" | "w:sdtContent" | "w:ins" | "w:customXml" => collect_blocks(child, blocks),
            _ => {}
        }
    }
}

fn paragraph_block(paragraph: &XmlElement) -> Option<DocxBlock> {
    let text = paragraph_text(paragraph);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let text = text.to_string();

    let properties = paragraph.child("w:pPr");
    let style = properties
        .and_then(|p| p.child("w:pStyle"))
        .and_then(|s| s.attr("w:val"));
    if let Some(level) = style.and_then(heading_level) {
        return Some(DocxBlock::Heading { level, text });
    }

    if let Some(numbering) = properties.and_then(|p| p.child("w:numPr")) {
        let level = numbering
            .child("w:ilvl")
            .and_then(|l| l.attr("w:val"))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        return Some(DocxBlock::ListItem { level, text });
    }

    Some(DocxBlock::Paragraph(text))
}

/// スタイルIDから見出しレベルを求める
///
/// `Heading1`〜`Heading6`（`heading 1`形式も可）と`Title`が対象です。
fn heading_level(style_id: &str) -> Option<usize> {
    if style_id.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lower = style_id.to_ascii_lowercase();
    let level: usize = lower.strip_prefix("heading")?.trim().parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// 段落内のランを書式ごとにまとめてMarkdownに変換する
fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut segments: Vec<(RunStyle, String)> = Vec::new();
    collect_runs(paragraph, &mut segments);

    let mut out = String::new();
    for (style, text) in segments {
        out.push_str(&decorate(style, &text));
    }
    out
}

fn collect_runs(element: &XmlElement, segments: &mut Vec<(RunStyle, String)>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "w:r" => {
                let style = run_style(child);
                let text = run_text(child);
                if text.is_empty() {
                    continue;
                }
                match segments.last_mut() {
                    Some((last, buf)) if *last == style => buf.push_str(&text),
                    _ => segments.push((style, text)),
                }
            }
            "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" | "w:sdt" | "w:sdtContent" => {
                collect_runs(child, segments)
            }
            _ => {}
        }
    }
}

fn run_style(run: &XmlElement) -> RunStyle {
    let Some(properties) = run.child("w:rPr") else {
        return RunStyle::default();
    };
    RunStyle {
        bold: toggle_on(properties.child("w:b")),
        italic: toggle_on(properties.child("w:i")),
    }
}

/// `<w:b/>`や`<w:b w:val="true"/>`はオン、`w:val="0"`/`"false"`はオフ
fn toggle_on(element: Option<&XmlElement>) -> bool {
    match element {
        None => false,
        Some(e) => !matches!(e.attr("w:val"), Some("0" | "false" | "off")),
    }
}

fn run_text(run: &XmlElement) -> String {
    let mut out = String::new();
    for node in &run.children {
        if let XmlNode::Element(child) = node {
            match child.name.as_str() {
                "w:t" => out.push_str(&child.text_content()),
                "w:tab" => out.push('\t'),
                "w:br" | "w:cr" => out.push('\n'),
                _ => {}
            }
        }
    }
    out
}

/// 書式に応じて強調記号で囲む（前後の空白は記号の外側に出す）
fn decorate(style: RunStyle, text: &str) -> String {
    if !style.bold && !style.italic {
        return text.to_string();
    }
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];

    let mut decorated = core.to_string();
    if style.italic {
        decorated = format!("*{}*", decorated);
    }
    if style.bold {
        decorated = format!("__{}__", decorated);
    }
    format!("{}{}{}", leading, decorated, trailing)
}

fn table_rows(table: &XmlElement) -> Vec<Vec<String>> {
    table
        .children_named("w:tr")
        .map(|row| {
            row.children_named("w:tc")
                .map(|cell| {
                    cell.children_named("w:p")
                        .map(paragraph_text)
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

fn render_blocks(blocks: &[DocxBlock]) -> String {
    let mut out = String::new();
    let mut iter = blocks.iter().peekable();
    while let Some(block) = iter.next() {
        match block {
            DocxBlock::Heading { level, text } => {
                out.push_str(&format!("{} {}\n\n", "#".repeat(*level), text));
            }
            DocxBlock::Paragraph(text) => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            DocxBlock::ListItem { level, text } => {
                out.push_str(&format!("{}- {}\n", "  ".repeat(*level), text));
                // 連続するリスト項目は1つのリストにまとめる
                if !matches!(iter.peek(), Some(DocxBlock::ListItem { .. })) {
                    out.push('\n');
                }
            }
            DocxBlock::Table(rows) => {
                out.push_str(&render_pipe_table(rows));
                out.push_str("\n\n");
            }
        }
    }
    out
}
