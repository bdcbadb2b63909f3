//! Pipe table rendering shared by the document converters.

/// セル文字列をパイプテーブル用にエスケープする
///
/// `|`はエスケープし、改行は`<br>`に置き換えます。
pub(crate) fn escape_cell(s: &str) -> String {
    s.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// 行の集合をMarkdownパイプテーブルとして出力する
///
/// 1行目の直後にのみヘッダー区切り行を出力します。列数は最長の行に
/// 揃え、足りないセルは空文字で埋めます。行がない場合は空文字列です。
pub(crate) fn render_pipe_table(rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<String> = (0..cols)
            .map(|c| row.get(c).map(|s| escape_cell(s)).unwrap_or_default())
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));

        if idx == 0 {
            lines.push(format!("| {} |", vec!["---"; cols].join(" | ")));
        }
    }
    lines.join("\n")
}
