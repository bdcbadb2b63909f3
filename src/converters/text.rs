//! Plain Text Converter
//!
//! プレーンテキストを1回の前方走査でMarkdownに変換します。
//! 下線スタイルの見出し、行頭記号のリスト、インデントされたコードブロックを推定します。

use std::path::Path;

use log::warn;

use super::{read_input, FormatConverter};
use crate::error::ConvertError;

/// TXTコンバーター
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TextConverter;

impl FormatConverter for TextConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let bytes = read_input(path)?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                warn!("{} is not valid UTF-8, decoding lossily", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(format_text(&content))
    }
}

/// 走査中の状態（コードブロック内か、リスト内か）
#[derive(Debug, Default)]
struct ScanState {
    in_code_block: bool,
    in_list: bool,
}

/// プレーンテキストをMarkdownに整形する
///
/// # 規則
///
/// - 次の行が`===`（3文字以上）なら`# 見出し`、`---`なら`## 見出し`
/// - `* ` / `- ` / `+ `で始まる行は`- 項目`、`1. ` / `1) `は`1. 項目`
/// - 4スペースまたはタブでインデントされた行（リスト外）はフェンス付きコードブロック
/// - 空行はそのまま出力し、リストを終了する
///
/// 出力の先頭の空行は除去し、末尾はちょうど1つの改行で終わります。
///
/// ```rust
/// use filetomarkdown::format_text;
///
/// assert_eq!(format_text("Title\n===\nSubtitle\n---"), "# Title\n## Subtitle\n");
/// assert_eq!(
///     format_text("    code line 1\n    code line 2"),
///     "```\ncode line 1\ncode line 2\n```\n"
/// );
/// ```
pub fn format_text(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = String::with_capacity(content.len() + 16);
    let mut state = ScanState::default();

    let mut i = 0;
    while i < lines.len() {
        let raw = lines[i].trim_end();
        let line = raw.trim();
        let indent = indent_width(raw);

        // リスト内のインデント行: ネストした項目、または継続行
        if state.in_list && indent > 0 && !line.is_empty() {
            let nesting = "  ".repeat((indent / 2).max(1));
            match list_item(line) {
                Some(item) => {
                    out.push_str(&nesting);
                    out.push_str(&item);
                }
                None => {
                    out.push_str("  ");
                    out.push_str(line);
                }
            }
            out.push('\n');
            i += 1;
            continue;
        }

        if !line.is_empty() && is_code_indent(raw) {
            if !state.in_code_block {
                out.push_str("```\n");
                state.in_code_block = true;
            }
            out.push_str(strip_code_indent(raw));
            out.push('\n');
            i += 1;
            continue;
        }

        if state.in_code_block {
            // 空行を挟んでコードが続く場合はブロックを閉じない
            if line.is_empty() && next_nonblank_is_code(&lines[i + 1..]) {
                out.push('\n');
                i += 1;
                continue;
            }
            out.push_str("```\n");
            state.in_code_block = false;
        }

        if line.is_empty() {
            state.in_list = false;
            out.push('\n');
            i += 1;
            continue;
        }

        if let Some(next) = lines.get(i + 1).map(|l| l.trim()) {
            if is_underline(next, '=') {
                state.in_list = false;
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
                i += 2;
                continue;
            }
            if is_underline(next, '-') {
                state.in_list = false;
                out.push_str("## ");
                out.push_str(line);
                out.push('\n');
                i += 2;
                continue;
            }
        }

        match list_item(line) {
            Some(item) => {
                state.in_list = true;
                out.push_str(&item);
            }
            None => {
                state.in_list = false;
                out.push_str(line);
            }
        }
        out.push('\n');
        i += 1;
    }

    if state.in_code_block {
        out.push_str("```\n");
    }

    let body = out.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{}\n", body)
    }
}

/// 3文字以上の同一記号だけで構成される行か
fn is_underline(line: &str, marker: char) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == marker)
}

/// 行頭の空白幅（タブは4として数える）
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_code_indent(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

/// インデントを1段分だけ取り除く
fn strip_code_indent(line: &str) -> &str {
    line.strip_prefix("    ")
        .or_else(|| line.strip_prefix('\t'))
        .unwrap_or(line)
}

fn next_nonblank_is_code(rest: &[&str]) -> bool {
    rest.iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| is_code_indent(l))
        .unwrap_or(false)
}

/// リスト項目を正規化する（記号なしの行は`None`）
fn list_item(line: &str) -> Option<String> {
    for marker in ["* ", "- ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(format!("- {}", rest.trim_start()));
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let (number, rest) = line.split_at(digits);
    let rest = rest
        .strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))?;
    Some(format!("{}. {}", number, rest.trim_start()))
}
