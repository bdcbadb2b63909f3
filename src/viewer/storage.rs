//! Key-Value Storage
//!
//! プリセットや展開済みフォルダ一覧を保存するキー・バリューストア。
//! 値はJSON文字列として保存します。
//!
//! 容量制限（quota）を設定でき、超過した書き込みは`Storage`エラーとして
//! 返され、ストアの内容は変更されません。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::ConvertError;

/// 文字列キー・文字列値のストア
pub trait KeyValueStore: fmt::Debug + Send {
    /// 値を取得する（存在しない場合は`None`）
    fn get(&self, key: &str) -> Result<Option<String>, ConvertError>;

    /// 値を設定する
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConvertError>;

    /// 値を削除する（存在しない場合も成功）
    fn remove(&mut self, key: &str) -> Result<(), ConvertError>;
}

fn stored_size(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// 書き込み後のサイズが容量を超えないか検証する
fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<(), ConvertError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let current = stored_size(entries) - entries.get(key).map_or(0, |v| key.len() + v.len());
    let required = current + key.len() + value.len();
    if required > quota {
        return Err(ConvertError::Storage(format!(
            "Quota exceeded while writing '{}': {} bytes (quota: {} bytes)",
            key, required, quota
        )));
    }
    Ok(())
}

/// メモリ上のストア
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 容量制限（キーと値のバイト数の合計）を設定する
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConvertError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConvertError> {
        check_quota(&self.entries, self.quota, key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ConvertError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSONファイルに永続化するストア
///
/// ファイル全体が`{ "key": "value", ... }`形式のJSONオブジェクトです。
/// 書き込みのたびにファイル全体を書き直します。
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl JsonFileStore {
    /// ストアを開く
    ///
    /// # 引数
    ///
    /// * `path` - JSONファイルのパス（存在しない場合は空のストア）
    ///
    /// # 戻り値
    ///
    /// * `Ok(JsonFileStore)` - 読み込みに成功した場合
    /// * `Err(ConvertError)` - ファイルが読めない、またはJSONとして不正な場合
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| ConvertError::from_read(&path, e))?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        debug!("opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries,
            quota: None,
        })
    }

    /// 容量制限（キーと値のバイト数の合計）を設定する
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), ConvertError> {
        let json = serde_json::to_string_pretty(entries)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, json).map_err(|e| {
            ConvertError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConvertError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConvertError> {
        check_quota(&self.entries, self.quota, key, value)?;
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ConvertError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::new().with_quota(10);
        store.set("ab", "12345").unwrap();
        // 既存キーの上書きは差し替え後のサイズで判定する
        store.set("ab", "12345678").unwrap();

        let result = store.set("cd", "x");
        assert!(matches!(result, Err(ConvertError::Storage(_))));
        assert_eq!(store.get("cd").unwrap(), None);
        assert_eq!(store.get("ab").unwrap().as_deref(), Some("12345678"));
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("store.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("expandedFolders", "[\"docs\"]").unwrap();
        store.set("other", "1").unwrap();
        store.remove("other").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("expandedFolders").unwrap().as_deref(),
            Some("[\"docs\"]")
        );
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_quota_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = JsonFileStore::open(&path).unwrap().with_quota(8);
        store.set("a", "1").unwrap();
        assert!(store.set("big", "0123456789").is_err());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("big").unwrap(), None);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_json_file_store_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(ConvertError::Json(_))
        ));
    }
}
