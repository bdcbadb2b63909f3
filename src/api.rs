//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。
//! 拡張子とコンバーターの対応（コンバーターレジストリ）の入口です。

use std::path::Path;

/// 変換可能なファイル形式
///
/// 入力ファイルの拡張子から決定され、`Converter`はこの値に対応する
/// コンバーターを呼び出し単位で生成します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FileType {
    /// Markdown（そのまま出力）
    Markdown,
    /// PDF文書（テキスト抽出）
    Pdf,
    /// プレーンテキスト（見出し・リスト・コードブロックを推定）
    Text,
    /// Word文書
    Docx,
    /// OpenDocumentテキスト
    Odt,
    /// PowerPointプレゼンテーション
    Pptx,
    /// OpenDocumentプレゼンテーション
    Odp,
    /// Excelスプレッドシート
    Xlsx,
    /// OpenDocumentスプレッドシート
    Ods,
    /// 7-Zipアーカイブ
    SevenZip,
    /// ZIPアーカイブ
    Zip,
    /// ソースコード（言語名付きのコードブロックとして出力）
    Code,
}

/// ソースコードとして扱う拡張子と、コードブロックの言語名
pub(crate) const CODE_LANGUAGES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("html", "markup"),
    ("java", "java"),
    ("cs", "csharp"),
    ("py", "python"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("go", "go"),
    ("sql", "sql"),
    ("php", "php"),
    ("swift", "swift"),
    ("css", "css"),
    ("rb", "ruby"),
    ("ts", "typescript"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("lua", "lua"),
    ("m", "matlab"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("jsx", "jsx"),
    ("tsx", "tsx"),
    ("vue", "markup"),
    ("svelte", "markup"),
];

impl FileType {
    /// 文書形式（ソースコード以外）をレジストリ順に返す
    pub fn all() -> &'static [FileType] {
        &[
            FileType::Markdown,
            FileType::Pdf,
            FileType::Text,
            FileType::Docx,
            FileType::Odt,
            FileType::Pptx,
            FileType::Odp,
            FileType::Xlsx,
            FileType::Ods,
            FileType::SevenZip,
            FileType::Zip,
        ]
    }

    /// 拡張子（先頭の`.`なし、大文字小文字を区別しない）から形式を決定
    ///
    /// ```rust
    /// use filetomarkdown::FileType;
    ///
    /// assert_eq!(FileType::from_extension("DOCX"), Some(FileType::Docx));
    /// assert_eq!(FileType::from_extension("rs"), Some(FileType::Code));
    /// assert_eq!(FileType::from_extension("exe"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<FileType> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let file_type = match ext.as_str() {
            "md" => FileType::Markdown,
            "pdf" => FileType::Pdf,
            "txt" => FileType::Text,
            "docx" => FileType::Docx,
            "odt" => FileType::Odt,
            "pptx" => FileType::Pptx,
            "odp" => FileType::Odp,
            "xlsx" => FileType::Xlsx,
            "ods" => FileType::Ods,
            "7z" => FileType::SevenZip,
            "zip" => FileType::Zip,
            other if code_language(other).is_some() => FileType::Code,
            _ => return None,
        };
        Some(file_type)
    }

    /// パスの拡張子から形式を決定
    pub fn from_path(path: impl AsRef<Path>) -> Option<FileType> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileType::from_extension)
    }

    /// 代表拡張子（ソースコードの場合は`code`）
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Markdown => "md",
            FileType::Pdf => "pdf",
            FileType::Text => "txt",
            FileType::Docx => "docx",
            FileType::Odt => "odt",
            FileType::Pptx => "pptx",
            FileType::Odp => "odp",
            FileType::Xlsx => "xlsx",
            FileType::Ods => "ods",
            FileType::SevenZip => "7z",
            FileType::Zip => "zip",
            FileType::Code => "code",
        }
    }

    /// 人間向けの説明文
    pub fn description(&self) -> &'static str {
        match self {
            FileType::Markdown => "Markdown file (passthrough)",
            FileType::Pdf => "PDF Documents",
            FileType::Text => "Text Files",
            FileType::Docx => "Word Documents",
            FileType::Odt => "OpenDocument Text",
            FileType::Pptx => "PowerPoint Presentations",
            FileType::Odp => "OpenDocument Presentations",
            FileType::Xlsx => "Excel Spreadsheets",
            FileType::Ods => "OpenDocument Spreadsheets",
            FileType::SevenZip => "7-Zip Archives",
            FileType::Zip => "ZIP Archives",
            FileType::Code => "Source Code Files",
        }
    }
}

/// ソースコード拡張子に対応する言語名
pub(crate) fn code_language(ext: &str) -> Option<&'static str> {
    CODE_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// ソースコードとして扱う拡張子の一覧
pub fn code_extensions() -> impl Iterator<Item = &'static str> {
    CODE_LANGUAGES.iter().map(|(ext, _)| *ext)
}
