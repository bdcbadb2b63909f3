//! ZIP Package Module
//!
//! Office文書（DOCX/PPTX/ODT/ODP）はZIPパッケージとして格納されています。
//! このモジュールはセキュリティ検証付きでパッケージを開き、エントリを
//! UTF-8文字列として読み出す機能を提供します。

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::ConvertError;
use crate::security::{validate_archive_path, ExtractionBudget, SecurityConfig};

/// セキュリティ検証済みのZIPパッケージ
pub(crate) struct Package {
    archive: ZipArchive<BufReader<File>>,
}

impl Package {
    /// パッケージを開く
    ///
    /// 入力ファイルの読み込みに失敗した場合は`FileNotFound`/`FileRead`、
    /// ZIPとして不正な場合は`Zip`、制限違反は`SecurityViolation`を返します。
    pub fn open(path: &Path, security: &SecurityConfig) -> Result<Self, ConvertError> {
        security.check_input_file(path)?;
        let file = File::open(path).map_err(|e| ConvertError::from_read(path, e))?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        // セキュリティチェック: エントリ数・サイズ・パス
        let mut budget = ExtractionBudget::new(security);
        budget.check_entry_count(archive.len())?;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            validate_archive_path(entry.name()).map_err(|e| {
                ConvertError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;
            budget.charge(entry.name(), entry.size())?;
        }

        Ok(Self { archive })
    }

    /// すべてのエントリ名（格納順）
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// エントリをUTF-8文字列として読み出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(String))` - エントリが存在する場合
    /// * `Ok(None)` - エントリが存在しない場合
    /// * `Err(ConvertError)` - 展開またはUTF-8変換に失敗した場合
    pub fn read_text(&mut self, name: &str) -> Result<Option<String>, ConvertError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ConvertError::Format(format!("Entry '{}' is not UTF-8: {}", name, e)))?;
        Ok(Some(text))
    }
}
