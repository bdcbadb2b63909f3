//! Spreadsheet Converter
//!
//! calamineでXLSX/ODSを読み込み、シートごとに見出しとパイプテーブルを出力します。
//!
//! ヘッダー行は常に空セルで、データはすべて区切り行の下に並びます。
//! シートの描画はrayonで並列に行い、ワークブック順で連結します。

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::Timelike;
use log::debug;
use rayon::prelude::*;

use super::table::escape_cell;
use super::FormatConverter;
use crate::error::ConvertError;
use crate::security::SecurityConfig;

/// スプレッドシートコンバーター
#[derive(Debug, Clone)]
pub(crate) struct SpreadsheetConverter {
    security: SecurityConfig,
}

impl SpreadsheetConverter {
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }
}

impl FormatConverter for SpreadsheetConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        self.security.check_input_file(path)?;
        let mut workbook = open_workbook_auto(path)?;

        // ワークブックの読み込みは逐次（&mut が必要）、描画のみ並列化
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            sheets.push((name, range));
        }
        debug!("{}: {} sheets", path.display(), sheets.len());

        let rendered: Vec<String> = sheets
            .par_iter()
            .map(|(name, range)| render_sheet(name, &sheet_grid(range)))
            .collect();
        Ok(rendered.join("\n").trim().to_string())
    }
}

/// セル範囲をA1起点の文字列グリッドに展開する
///
/// calamineの範囲は最初の非空セルから始まるため、先頭の空行・空列を補います。
fn sheet_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let offset_cols = start_col as usize;

    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); offset_cols];
        cells.extend(row.iter().map(format_cell));
        grid.push(cells);
    }
    grid
}

/// セル値を文字列に変換する
///
/// # 引数
///
/// * `cell` - calamineのセルデータ
///
/// # 戻り値
///
/// 整数は小数点なし、浮動小数点数は最短表現、真偽値は`true`/`false`、
/// 日時はISO 8601形式の文字列
fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            if dt.is_datetime() {
                match dt.as_datetime() {
                    Some(datetime) => format_datetime(&datetime),
                    None => format_number(dt.as_f64()),
                }
            } else {
                format_number(dt.as_f64())
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_datetime(datetime: &chrono::NaiveDateTime) -> String {
    let time = datetime.time();
    if time.hour() == 0 && time.minute() == 0 && time.second() == 0 {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn is_empty_cell(value: &str) -> bool {
    value.trim().is_empty()
}

/// 1シートを描画する
///
/// 末尾の空行・空列を取り除いた上で、空ヘッダー行・区切り行・データ行を出力します。
fn render_sheet(name: &str, grid: &[Vec<String>]) -> String {
    let empty_sheet = format!("# {}\n\n---\n\n", name);

    let last_row = grid
        .iter()
        .rposition(|row| !row.iter().all(|c| is_empty_cell(c)));
    let Some(last_row) = last_row else {
        return empty_sheet;
    };
    let rows = &grid[..=last_row];

    let last_col = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|c| !is_empty_cell(c)))
        .max();
    let Some(last_col) = last_col else {
        return empty_sheet;
    };
    let cols = last_col + 1;

    let mut lines = Vec::with_capacity(rows.len() + 4);
    lines.push(format!("# {}\n", name));
    lines.push(format!("| {} |", vec![""; cols].join(" | ")));
    lines.push(format!("| {} |", vec!["---"; cols].join(" | ")));
    for row in rows {
        let cells: Vec<String> = (0..cols)
            .map(|c| row.get(c).map(|s| escape_cell(s)).unwrap_or_default())
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.push("\n---\n".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Format, Workbook};

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_render_sheet_layout() {
        let md = render_sheet("Data", &grid(&[&["a", "b"], &["1", "2"]]));
        assert_eq!(
            md,
            "# Data\n\n|  |  |\n| --- | --- |\n| a | b |\n| 1 | 2 |\n\n---\n"
        );
    }

    #[test]
    fn test_render_sheet_trims_trailing_rows_and_columns() {
        let md = render_sheet(
            "S",
            &grid(&[&["x", "", " "], &["", "y", ""], &["", " ", ""], &["", "", ""]]),
        );
        assert_eq!(md, "# S\n\n|  |  |\n| --- | --- |\n| x |  |\n|  | y |\n\n---\n");
    }

    #[test]
    fn test_render_empty_sheet() {
        assert_eq!(render_sheet("Empty", &[]), "# Empty\n\n---\n\n");
        assert_eq!(
            render_sheet("Blank", &grid(&[&["", "  "]])),
            "# Blank\n\n---\n\n"
        );
    }

    #[test]
    fn test_render_escapes_pipes() {
        let md = render_sheet("S", &grid(&[&["a|b"]]));
        assert!(md.contains("| a\\|b |"));
    }

    #[test]
    fn test_format_cell_values() {
        assert_eq!(format_cell(&Data::Int(42)), "42");
        assert_eq!(format_cell(&Data::Float(3.0)), "3");
        assert_eq!(format_cell(&Data::Float(1.25)), "1.25");
        assert_eq!(format_cell(&Data::Bool(true)), "true");
        assert_eq!(format_cell(&Data::Empty), "");
        assert_eq!(
            format_cell(&Data::DateTimeIso("2024-01-15".to_string())),
            "2024-01-15"
        );
    }

    #[test]
    fn test_convert_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let first = workbook.add_worksheet();
        first.set_name("People").unwrap();
        first.write_string(0, 0, "Name").unwrap();
        first.write_string(0, 1, "Joined").unwrap();
        first.write_string(1, 0, "Ann").unwrap();
        first
            .write_number_with_format(1, 1, 45306.0, &date_format)
            .unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Empty").unwrap();
        let third = workbook.add_worksheet();
        third.set_name("Offset").unwrap();
        third.write_number(1, 1, 7.5).unwrap();
        workbook.save(&path).unwrap();

        let md = SpreadsheetConverter::new(SecurityConfig::default())
            .convert(&path)
            .unwrap();
        assert_eq!(
            md,
            "# People\n\n|  |  |\n| --- | --- |\n| Name | Joined |\n| Ann | 2024-01-15 |\n\n---\n\n\
             # Empty\n\n---\n\n\n\
             # Offset\n\n|  |  |\n| --- | --- |\n|  |  |\n|  | 7.5 |\n\n---"
        );
    }

    #[test]
    fn test_corrupted_workbook_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        std::fs::write(&path, b"This is not a valid Excel file content").unwrap();

        assert!(SpreadsheetConverter::new(SecurityConfig::default())
            .convert(&path)
            .is_err());
    }
}
