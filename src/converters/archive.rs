//! Archive Converter
//!
//! ZIP/7Zアーカイブを一時ディレクトリに展開し、ディレクトリツリーを
//! 深さに応じた見出しとコードブロックで表現します。
//!
//! 一時ディレクトリは`zip_`/`7z_`で始まる一意な名前で作成され、
//! 変換の成否にかかわらず削除されます。

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rayon::prelude::*;
use sevenz_rust::{Password, SevenZReader};
use zip::ZipArchive;

use super::FormatConverter;
use crate::builder::ConversionConfig;
use crate::error::ConvertError;
use crate::security::{validate_archive_path, ExtractionBudget, SecurityConfig};

/// アーカイブ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveKind {
    Zip,
    SevenZip,
}

impl ArchiveKind {
    fn temp_prefix(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip_",
            ArchiveKind::SevenZip => "7z_",
        }
    }
}

/// アーカイブコンバーター
#[derive(Debug, Clone)]
pub(crate) struct ArchiveConverter {
    kind: ArchiveKind,
    /// テキストとして埋め込む拡張子（小文字、ドットなし）
    text_extensions: Vec<String>,
    temp_root: Option<PathBuf>,
    security: SecurityConfig,
}

impl ArchiveConverter {
    pub fn new(kind: ArchiveKind, config: &ConversionConfig) -> Self {
        Self {
            kind,
            text_extensions: config.text_extensions.clone(),
            temp_root: config.temp_root.clone(),
            security: config.security.clone(),
        }
    }

    fn create_temp_dir(&self) -> Result<tempfile::TempDir, ConvertError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(self.kind.temp_prefix());
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ConvertError> {
        match self.kind {
            ArchiveKind::Zip => extract_zip(archive, dest, &self.security),
            ArchiveKind::SevenZip => extract_7z(archive, dest, &self.security),
        }
    }

    /// ディレクトリ直下のエントリをソート順に描画する（兄弟は並列）
    fn render_dir(&self, dir: &Path, depth: usize) -> Result<String, ConvertError> {
        let mut entries: Vec<(String, PathBuf)> = fs::read_dir(dir)?
            .map(|entry| {
                entry.map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
            })
            .collect::<io::Result<_>>()?;
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let parts = entries
            .par_iter()
            .map(|(name, path)| self.render_entry(name, path, depth))
            .collect::<Result<Vec<String>, ConvertError>>()?;
        Ok(parts.concat())
    }

    fn render_entry(&self, name: &str, path: &Path, depth: usize) -> Result<String, ConvertError> {
        let heading = format!("{} {}\n\n", "#".repeat(depth + 2), name);
        if path.is_dir() {
            return Ok(heading + &self.render_dir(path, depth + 1)?);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ext.is_empty() || !self.text_extensions.iter().any(|t| *t == ext) {
            return Ok(heading + "*Binary file*\n\n");
        }

        let body = match fs::read(path).map(String::from_utf8) {
            Ok(Ok(content)) => format!("```{}\n{}\n```\n\n", ext, content),
            Ok(Err(_)) | Err(_) => {
                debug!("{} is not readable as UTF-8 text", path.display());
                "*Error reading file*\n\n".to_string()
            }
        };
        Ok(heading + &body)
    }
}

impl FormatConverter for ArchiveConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        self.security.check_input_file(path)?;

        let temp = self.create_temp_dir()?;
        debug!("extracting {} into {}", path.display(), temp.path().display());

        // 失敗時は`temp`のdropでディレクトリが削除される
        self.extract(path, temp.path())?;
        let markdown = self.render_dir(temp.path(), 0)?;

        if let Err(e) = temp.close() {
            warn!("failed to remove temporary directory: {}", e);
        }
        Ok(markdown.trim().to_string())
    }
}

/// ZIPアーカイブをセキュリティ検証付きで展開する
fn extract_zip(archive: &Path, dest: &Path, security: &SecurityConfig) -> Result<(), ConvertError> {
    let file = File::open(archive).map_err(|e| ConvertError::from_read(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;

    let mut budget = ExtractionBudget::new(security);
    budget.check_entry_count(zip.len())?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() && is_root_entry(entry.name()) {
            continue;
        }
        let relative = validate_archive_path(entry.name()).map_err(|e| {
            ConvertError::SecurityViolation(format!("Invalid ZIP path: {}", e))
        })?;
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        budget.charge(entry.name(), entry.size())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        copy_limited(&mut entry, &mut out, security.max_file_size, entry_name(&relative))?;
    }
    Ok(())
}

/// 7Zアーカイブをセキュリティ検証付きで展開する
fn extract_7z(archive: &Path, dest: &Path, security: &SecurityConfig) -> Result<(), ConvertError> {
    let file = File::open(archive).map_err(|e| ConvertError::from_read(archive, e))?;
    let len = file.metadata()?.len();
    let mut reader = SevenZReader::new(BufReader::new(file), len, Password::empty())
        .map_err(|e| ConvertError::SevenZip(e.to_string()))?;

    let mut budget = ExtractionBudget::new(security);
    budget.check_entry_count(reader.archive().files.len())?;

    // クロージャ内のエラーは保持し、走査を打ち切る
    let mut failure: Option<ConvertError> = None;
    reader
        .for_each_entries(|entry, data| {
            if failure.is_some() {
                return Ok(false);
            }
            if entry.is_directory() && is_root_entry(entry.name()) {
                return Ok(true);
            }
            let result = (|| -> Result<(), ConvertError> {
                let relative = validate_archive_path(entry.name()).map_err(|e| {
                    ConvertError::SecurityViolation(format!("Invalid 7Z path: {}", e))
                })?;
                let target = dest.join(&relative);
                if entry.is_directory() {
                    fs::create_dir_all(&target)?;
                    return Ok(());
                }

                budget.charge(entry.name(), entry.size())?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                copy_limited(data, &mut out, security.max_file_size, entry_name(&relative))
            })();

            match result {
                Ok(()) => Ok(true),
                Err(e) => {
                    failure = Some(e);
                    Ok(false)
                }
            }
        })
        .map_err(|e| ConvertError::SevenZip(e.to_string()))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// アーカイブのルートそのものを表すディレクトリエントリ（空名や`./`）
fn is_root_entry(name: &str) -> bool {
    name.split(['/', '\\']).all(|segment| segment.is_empty() || segment == ".")
}

fn entry_name(relative: &Path) -> String {
    relative.to_string_lossy().into_owned()
}

/// 上限を超えないことを確認しながらエントリ本体を書き出す
///
/// 宣言サイズと実際の展開サイズが異なるアーカイブに対する検証です。
fn copy_limited<R: Read + ?Sized, W: io::Write>(
    reader: &mut R,
    writer: &mut W,
    limit: u64,
    name: String,
) -> Result<(), ConvertError> {
    let written = io::copy(&mut reader.take(limit.saturating_add(1)), writer)?;
    if written > limit {
        return Err(ConvertError::SecurityViolation(format!(
            "File '{}' exceeds maximum size while extracting (max: {} bytes)",
            name, limit
        )));
    }
    Ok(())
}
