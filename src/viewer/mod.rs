//! Viewer Core
//!
//! 変換結果のMarkdownツリーを閲覧・編集するビューアーの状態管理です。
//! UIは含まず、UI層はイベントキュー（[`ViewerEvent`]）を介して状態の変化を受け取ります。
//!
//! - [`FileManager`]: ファイル一覧・フォルダツリー・選択状態・保存
//! - [`PresetStore`]: 名前付きプリセットの保存と復元
//! - [`ChangeMonitor`]: ポーリングによる外部変更の検出

mod file_manager;
mod handle;
mod monitor;
mod presets;
mod storage;

pub use file_manager::{
    compare_paths, mime_type_for, normalize_path, FileInfo, FileManager, FolderInfo, NewFile,
    SaveTarget, ViewerEvent,
};
pub use handle::{
    AccessMode, DirectoryBackend, FileBackend, FileHandle, LocalFileHandle, PermissionState,
};
pub use monitor::{Change, ChangeMonitor, DEFAULT_POLL_INTERVAL};
pub use presets::{Preset, PresetStore, EXPANDED_FOLDERS_KEY, PRESETS_KEY};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
