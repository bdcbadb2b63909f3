//! XML Tree Module
//!
//! Office文書（ODT/ODP/PPTX/DOCX）のXMLを、型付きのツリー（タグ付き共用体）に
//! 変換するモジュール。quick-xmlのイベントストリームから構築します。
//!
//! 各コンバーターは修飾名（例: `text:p`, `a:t`）でパターンマッチして走査します。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ConvertError;

/// 要素のネストの上限（ツリーは再帰的に走査・破棄されるため）
pub(crate) const MAX_XML_DEPTH: usize = 1024;

/// XMLノード
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    /// 要素ノード
    Element(XmlElement),
    /// テキストノード（エンティティ展開済み）
    Text(String),
}

/// XML要素
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct XmlElement {
    /// 修飾名（プレフィックス付き、例: `text:p`）
    pub name: String,
    /// 属性（修飾名, 値）
    pub attributes: Vec<(String, String)>,
    /// 子ノード（文書順）
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Self, ConvertError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.decode_and_unescape_value(reader)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// 属性値を取得
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// 指定した名前の直接の子要素を列挙
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// 直接の子要素を列挙（テキストノードは除外）
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// 指定した名前の最初の直接の子要素
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == name)
    }

    /// パス（子要素名の列）をたどって子孫要素を取得
    pub fn descend(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |current, name| current.child(name))
    }

    /// 指定した名前の子孫要素を文書順（深さ優先）で収集
    ///
    /// 一致した要素の内部はそれ以上探索しません。
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            } else {
                child.find_all(name, out);
            }
        }
    }

    /// すべての子孫テキストを文書順に連結
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for node in &element.children {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

/// XML文字列を解析し、ルート要素を返す
///
/// # 戻り値
///
/// * `Ok(XmlElement)` - ルート要素
/// * `Err(ConvertError::Xml)` - XMLが不正な場合
/// * `Err(ConvertError::Format)` - ルート要素が存在しない、タグが閉じていない、
///   またはネストが[`MAX_XML_DEPTH`]を超える場合
pub(crate) fn parse_document(xml: &str) -> Result<XmlElement, ConvertError> {
    let mut reader = Reader::from_str(xml);
    // 混在コンテンツ内の空白（例: `<text:span>a</text:span> <text:span>b</text:span>`）を保持
    reader.trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(ConvertError::Format(format!(
                        "XML nesting exceeds maximum depth: {}",
                        MAX_XML_DEPTH
                    )));
                }
                stack.push(XmlElement::from_start(&start, &reader)?);
            }
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start, &reader)?;
                attach(&mut stack, &mut root, XmlNode::Element(element));
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ConvertError::Format("Unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, XmlNode::Element(element));
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let value = text.unescape()?.into_owned();
                    if !value.is_empty() {
                        parent.children.push(XmlNode::Text(value));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(value));
                }
            }
            Event::Eof => break,
            // 宣言・コメント・処理命令・DOCTYPEは無視
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConvertError::Format(format!(
            "Unexpected end of document inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| ConvertError::Format("Document has no root element".to_string()))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let XmlNode::Element(element) = node {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }
}
