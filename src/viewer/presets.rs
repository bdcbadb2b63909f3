//! Presets
//!
//! 読み込んだファイルとフォルダの状態を名前付きのプリセットとして保存・復元します。
//!
//! プリセットは`fileToMarkdownPresets`キーに`名前 → Preset`のJSONオブジェクトとして、
//! 展開中のフォルダは`expandedFolders`キーにパスのJSON配列として保存されます。

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::file_manager::{FileInfo, FileManager, FolderInfo};
use super::storage::KeyValueStore;
use crate::error::ConvertError;

/// プリセットの保存キー
pub const PRESETS_KEY: &str = "fileToMarkdownPresets";

/// 展開中フォルダの保存キー
pub const EXPANDED_FOLDERS_KEY: &str = "expandedFolders";

/// 保存されたファイル・フォルダの状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// 保存日時（RFC 3339）
    pub timestamp: String,
    pub files: Vec<FileInfo>,
    pub folders: Vec<FolderInfo>,
}

/// プリセットの保存・読み込みを行う
///
/// ストアの内容はメモリ上のマップにキャッシュされます。書き込みに失敗しても
/// メモリ上のマップは更新されたままです。
#[derive(Debug)]
pub struct PresetStore<S: KeyValueStore> {
    store: S,
    presets: BTreeMap<String, Preset>,
}

impl<S: KeyValueStore> PresetStore<S> {
    /// ストアから既存のプリセットを読み込む
    ///
    /// 保存データがJSONとして不正な場合は空のマップから始めます。
    pub fn new(store: S) -> Result<Self, ConvertError> {
        let presets = match store.get(PRESETS_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("discarding unreadable presets: {}", e);
                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };
        Ok(Self { store, presets })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// プリセット名の一覧（名前順）
    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// 現在の状態を保存する（同名のプリセットは上書き）
    ///
    /// # 引数
    ///
    /// * `name` - プリセット名（前後の空白は除去、空は不可）
    /// * `manager` - 保存するファイルマネージャー
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 保存に成功した場合
    /// * `Err(ConvertError::InvalidPreset)` - 名前が空、またはファイルがない場合
    /// * `Err(ConvertError::Storage)` - ストアへの書き込みに失敗した場合
    pub fn save(&mut self, name: &str, manager: &FileManager) -> Result<(), ConvertError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConvertError::InvalidPreset(
                "Preset name must not be empty".to_string(),
            ));
        }
        if manager.files().is_empty() {
            return Err(ConvertError::InvalidPreset("No files to save".to_string()));
        }

        let preset = Preset {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            files: manager.files().to_vec(),
            folders: manager.folders().to_vec(),
        };
        if self.presets.insert(name.to_string(), preset).is_some() {
            info!("overwriting preset '{}'", name);
        }
        self.persist()
    }

    /// プリセットを読み込み、ファイルマネージャーの状態を置き換える
    ///
    /// 復元後は先頭のファイルを選択し、`FileSelected`を通知します。
    ///
    /// ファイルハンドルは保存されないため、復元したファイルの`uses_file_system_api`は
    /// 常に`false`になります。内容を持たないファイル（読み込みに失敗したもの）には
    /// 復元できなかった旨の内容が入ります。それ以外のフィールドは保存時と同じです。
    pub fn load(&self, name: &str, manager: &mut FileManager) -> Result<usize, ConvertError> {
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| ConvertError::PresetNotFound(name.to_string()))?;
        let restored = manager.restore_state(preset.files.clone(), preset.folders.clone())?;
        manager.set_current(0);
        info!("loaded preset '{}' with {} files", name, restored);
        Ok(restored)
    }

    /// プリセットを削除する
    pub fn remove(&mut self, name: &str) -> Result<(), ConvertError> {
        if self.presets.remove(name).is_none() {
            return Err(ConvertError::PresetNotFound(name.to_string()));
        }
        self.persist()
    }

    /// すべてのプリセットを削除する
    pub fn clear_all(&mut self) -> Result<(), ConvertError> {
        self.presets.clear();
        self.store.remove(PRESETS_KEY)
    }

    /// 展開中のフォルダを保存する
    pub fn save_expanded_folders(&mut self, folders: &[String]) -> Result<(), ConvertError> {
        let json = serde_json::to_string(folders)?;
        self.store.set(EXPANDED_FOLDERS_KEY, &json)
    }

    /// 展開中のフォルダを読み込む（未保存の場合は空）
    pub fn load_expanded_folders(&self) -> Result<Vec<String>, ConvertError> {
        match self.store.get(EXPANDED_FOLDERS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist(&mut self) -> Result<(), ConvertError> {
        let json = serde_json::to_string(&self.presets)?;
        self.store.set(PRESETS_KEY, &json).map_err(|e| {
            warn!("failed to persist presets: {}", e);
            e
        })
    }
}
