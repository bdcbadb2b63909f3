//! File Manager
//!
//! ビューアーに読み込んだファイルの一覧とフォルダ構造を管理します。
//!
//! # 処理フロー
//!
//! 1. `add_files`: パスからフォルダ・深さを決定して登録（大文字小文字を無視して重複排除）
//! 2. `reconstruct_folder_structure`: ファイルのフォルダパスからフォルダツリーを再構築
//! 3. `save_file` / `read_file`: ファイルハンドル → バックエンド → メモリの順に読み書き
//!
//! UI層への通知は[`ViewerEvent`]としてキューに積まれ、`take_events`で取り出します。

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::handle::{AccessMode, FileBackend, FileHandle, LocalFileHandle, PermissionState};
use crate::error::ConvertError;

const MEMORY_ONLY_WARNING: &str =
    "File was saved in memory only. Changes will be lost when the viewer is closed.";

/// 登録済みファイルの情報
///
/// ブラウザ版と同じcamelCaseのJSONとしてシリアライズされます。
/// ファイルハンドルはシリアライズ対象外で、[`FileManager`]が別に保持します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// 最終更新日時（UNIXエポックからのミリ秒）
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_root: bool,
    #[serde(rename = "usesFileSystemAPI", default)]
    pub uses_file_system_api: bool,
}

/// フォルダツリーのノード
///
/// `children`（子フォルダのパス）と`files`（直下のファイルのパス）は
/// 挿入順を保つ重複なしのリストです。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub expanded: bool,
}

/// `add_files`に渡す新規ファイル
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub name: String,
    /// 読み込み元ディレクトリからの相対パス（`docs/intro.md`）
    pub relative_path: Option<String>,
    /// 相対パスを持たないファイルの所属フォルダ
    pub parent_folder: Option<String>,
    pub size: u64,
    pub mime_type: Option<String>,
    pub last_modified: i64,
    pub content: Option<String>,
    pub handle: Option<Arc<dyn FileHandle>>,
}

impl NewFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.parent_folder = Some(folder.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        self.size = content.len() as u64;
        self.content = Some(content);
        self
    }

    pub fn with_handle(mut self, handle: Arc<dyn FileHandle>) -> Self {
        self.handle = Some(handle);
        self
    }

    /// ローカルファイルから作成する（内容は`add_files`時にハンドル経由で読み込む）
    ///
    /// # 引数
    ///
    /// * `root` - 読み込み元ディレクトリ
    /// * `path` - `root`配下のファイル
    ///
    /// # 戻り値
    ///
    /// * `Ok(NewFile)` - `root`からの相対パスと`LocalFileHandle`を持つファイル
    /// * `Err(io::Error)` - メタデータを取得できない、または`path`が`root`配下にない場合
    pub fn from_path(root: &Path, path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let relative = path.strip_prefix(root).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not under {}", path.display(), root.display()),
            )
        })?;
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let name = relative.last().cloned().unwrap_or_default();
        let last_modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);

        Ok(Self {
            name,
            relative_path: Some(relative.join("/")),
            size: metadata.len(),
            last_modified,
            handle: Some(Arc::new(LocalFileHandle::new(path))),
            ..Self::default()
        })
    }
}

/// UI層への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// ファイル一覧が変化した
    FileListChanged,
    /// ファイルが選択された
    FileSelected { index: usize, path: String },
    /// ファイルの読み書きに失敗した
    FileError { path: String, message: String },
    /// 処理は続行できたが注意が必要
    FileWarning { path: String, message: String },
    /// ファイルの内容が外部で変更された
    FileChanged { path: String },
}

/// 保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    /// ファイルハンドル経由で書き込んだ
    Handle,
    /// バックエンド経由で書き込んだ
    Backend,
    /// メモリ上にのみ保持した
    Memory,
}

/// 拡張子からMIMEタイプを決定する
pub fn mime_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "md" | "markdown" | "mdown" => "text/markdown",
        _ => "text/plain",
    }
}

/// パスを正規化する
///
/// バックスラッシュを`/`に置換し、連続する`/`をまとめ、末尾の`/`を取り除きます。
/// 空になった場合は`/`を返します。
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(ch);
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}

/// 2つのパスが同一、または親子関係にあるかを判定する（大文字小文字は無視）
pub fn compare_paths(a: &str, b: &str) -> bool {
    let a = normalize_path(a).to_lowercase();
    let b = normalize_path(b).to_lowercase();
    if a == b {
        return true;
    }
    if a.ends_with('/') || b.ends_with('/') {
        return a.starts_with(&b) || b.starts_with(&a);
    }
    if a.starts_with(&format!("{}/", b)) || b.starts_with(&format!("{}/", a)) {
        return true;
    }
    parent_of(&a) == b || parent_of(&b) == a
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn join_path(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), rest)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// 権限を確認し、未許可なら1回だけ要求する
fn ensure_permission(handle: &dyn FileHandle, mode: AccessMode) -> Result<(), ConvertError> {
    if handle.query_permission(mode) == PermissionState::Granted
        || handle.request_permission(mode) == PermissionState::Granted
    {
        return Ok(());
    }
    let action = match mode {
        AccessMode::Read => "read",
        AccessMode::ReadWrite => "write to",
    };
    Err(ConvertError::PermissionDenied(format!(
        "Permission to {} file was denied",
        action
    )))
}

fn read_through_handle(handle: &dyn FileHandle) -> Result<String, ConvertError> {
    ensure_permission(handle, AccessMode::Read)?;
    Ok(handle.read()?)
}

fn write_through_handle(handle: &dyn FileHandle, content: &str) -> Result<(), ConvertError> {
    ensure_permission(handle, AccessMode::ReadWrite)?;
    Ok(handle.write(content)?)
}

fn index_error(index: usize) -> ConvertError {
    ConvertError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("No file at index {}", index),
    ))
}

/// ファイル一覧・フォルダ構造・選択状態を管理する
///
/// # 使用例
///
/// ```rust
/// use filetomarkdown::viewer::{FileManager, NewFile};
///
/// let mut manager = FileManager::new();
/// let added = manager.add_files(vec![
///     NewFile::new("intro.md").with_relative_path("docs/intro.md").with_content("# Intro"),
///     NewFile::new("README.md").with_content("# Readme"),
/// ]);
/// assert_eq!(added, 2);
/// assert_eq!(manager.find_file_by_path("DOCS/INTRO.MD"), Some(0));
/// assert_eq!(manager.all_file_paths_in_and_below("docs"), vec!["docs/intro.md"]);
/// ```
#[derive(Debug, Default)]
pub struct FileManager {
    files: Vec<FileInfo>,
    /// 小文字化したパス → インデックス
    path_index: HashMap<String, usize>,
    folders: Vec<FolderInfo>,
    folder_index: HashMap<String, usize>,
    /// 小文字化したパス → ハンドル
    handles: HashMap<String, Arc<dyn FileHandle>>,
    current: Option<usize>,
    backend: Option<Arc<dyn FileBackend>>,
    events: Vec<ViewerEvent>,
}

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// ハンドルを持たないファイルの保存先を設定する
    pub fn with_backend(mut self, backend: Arc<dyn FileBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn set_backend(&mut self, backend: Option<Arc<dyn FileBackend>>) {
        self.backend = backend;
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&FileInfo> {
        self.files.get(index)
    }

    pub fn folders(&self) -> &[FolderInfo] {
        &self.folders
    }

    pub fn folder(&self, path: &str) -> Option<&FolderInfo> {
        self.folder_index.get(path).map(|&i| &self.folders[i])
    }

    /// ルート直下のフォルダ
    pub fn root_folders(&self) -> Vec<&FolderInfo> {
        self.folders.iter().filter(|f| f.is_root).collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_file(&self) -> Option<&FileInfo> {
        self.current.and_then(|i| self.files.get(i))
    }

    /// ファイルを選択する
    ///
    /// 範囲外のインデックスの場合は何もせず`false`を返します。
    pub fn set_current(&mut self, index: usize) -> bool {
        let Some(file) = self.files.get(index) else {
            return false;
        };
        self.current = Some(index);
        self.events.push(ViewerEvent::FileSelected {
            index,
            path: file.path.clone(),
        });
        true
    }

    /// 溜まったイベントを取り出す
    pub fn take_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    /// ファイルを追加する
    ///
    /// # 引数
    ///
    /// * `new_files` - 追加するファイル
    ///
    /// # 戻り値
    ///
    /// 実際に追加されたファイル数（既存パスと大文字小文字を無視して一致するものは除く）
    pub fn add_files(&mut self, new_files: Vec<NewFile>) -> usize {
        let mut seen: HashSet<String> = self.path_index.keys().cloned().collect();
        let first_new = self.files.len();

        for file in new_files {
            let (path, folder, depth) = placement(&file);
            if path.is_empty() || !seen.insert(path.to_lowercase()) {
                debug!("skipping duplicate file: {}", path);
                continue;
            }

            let mime_type = file
                .mime_type
                .clone()
                .unwrap_or_else(|| mime_type_for(&file.name).to_string());
            if let Some(handle) = file.handle {
                self.handles.insert(path.to_lowercase(), handle);
            }
            self.files.push(FileInfo {
                name: file.name,
                is_root: folder.is_none(),
                uses_file_system_api: self.handles.contains_key(&path.to_lowercase()),
                path,
                folder,
                depth,
                size: file.size,
                mime_type,
                last_modified: file.last_modified,
                content: file.content,
            });
        }

        let added = self.files.len() - first_new;
        if added == 0 {
            return 0;
        }

        self.reconstruct_folder_structure();
        if self.current.is_none() {
            self.current = Some(0);
        }

        for index in first_new..self.files.len() {
            if self.files[index].content.is_some() {
                continue;
            }
            let key = self.files[index].path.to_lowercase();
            let Some(handle) = self.handles.get(&key).cloned() else {
                continue;
            };
            match read_through_handle(handle.as_ref()) {
                Ok(text) => {
                    self.files[index].size = text.len() as u64;
                    self.files[index].content = Some(text);
                }
                Err(err) => {
                    warn!("failed to load {}: {}", self.files[index].path, err);
                    self.events.push(ViewerEvent::FileError {
                        path: self.files[index].path.clone(),
                        message: format!("Failed to load file: {}", err),
                    });
                }
            }
        }

        info!("added {} files ({} total)", added, self.files.len());
        self.events.push(ViewerEvent::FileListChanged);
        added
    }

    /// ファイル一覧からフォルダツリーを再構築する
    ///
    /// 1. 各ファイルのフォルダパスについて、すべての接頭辞のフォルダを作成（空のセグメントは無視）
    /// 2. ファイルを所属フォルダに割り当て
    /// 3. 所属フォルダが見つからないファイルは、パスを遡って最も近い既存フォルダに割り当て
    ///    （見つからなければルートのファイルとして扱う）
    pub fn reconstruct_folder_structure(&mut self) {
        let mut folders: Vec<FolderInfo> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for file in &self.files {
            let Some(folder) = file.folder.as_deref() else {
                continue;
            };
            let mut parent: Option<String> = None;
            let mut level = 0;
            for part in folder.split('/').filter(|p| !p.is_empty()) {
                let path = match &parent {
                    Some(p) => format!("{}/{}", p, part),
                    None => part.to_string(),
                };
                if !index.contains_key(&path) {
                    index.insert(path.clone(), folders.len());
                    folders.push(FolderInfo {
                        name: part.to_string(),
                        path: path.clone(),
                        parent: parent.clone(),
                        children: Vec::new(),
                        files: Vec::new(),
                        depth: level,
                        is_root: level == 0,
                        expanded: self.folder(&path).map_or(false, |f| f.expanded),
                    });
                    if let Some(&parent_idx) = parent.as_ref().and_then(|p| index.get(p)) {
                        push_unique(&mut folders[parent_idx].children, &path);
                    }
                }
                parent = Some(path);
                level += 1;
            }
        }

        for file in &mut self.files {
            let Some(folder) = file.folder.clone() else {
                continue;
            };
            if let Some(&i) = index.get(&folder) {
                push_unique(&mut folders[i].files, &file.path);
                continue;
            }

            // 孤立ファイル: パスを遡って既存のフォルダを探す
            let parts: Vec<&str> = file.path.split('/').collect();
            let ancestor = (1..parts.len())
                .rev()
                .map(|i| (i, parts[..i].join("/")))
                .find(|(_, candidate)| index.contains_key(candidate));
            match ancestor {
                Some((segments, candidate)) => {
                    debug!("reassigning {} to folder {}", file.path, candidate);
                    if let Some(&i) = index.get(&candidate) {
                        push_unique(&mut folders[i].files, &file.path);
                    }
                    file.folder = Some(candidate);
                    file.depth = segments;
                }
                None => {
                    warn!("no folder found for {}, treating as root file", file.path);
                    file.folder = None;
                    file.depth = 0;
                    file.is_root = true;
                }
            }
        }

        self.folders = folders;
        self.folder_index = index;
        self.update_path_index();
    }

    fn update_path_index(&mut self) {
        self.path_index = self
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.to_lowercase(), i))
            .collect();
    }

    /// ファイルを削除する
    ///
    /// 選択中のファイルが削除された場合は同じ位置（末尾を超える場合は末尾）を選択し、
    /// それ以外は前方で削除された数だけ選択位置をずらします。
    ///
    /// # 戻り値
    ///
    /// 1つ以上削除した場合は`true`
    pub fn remove_files<S: AsRef<str>>(&mut self, paths: &[S]) -> bool {
        let mut indices: Vec<usize> = paths
            .iter()
            .filter_map(|p| self.find_file_by_path(p.as_ref()))
            .collect();
        if indices.is_empty() {
            return false;
        }
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();

        let current_removed = self.current.map_or(false, |c| indices.contains(&c));
        for &i in &indices {
            let removed = self.files.remove(i);
            self.handles.remove(&removed.path.to_lowercase());
        }

        self.current = if self.files.is_empty() {
            None
        } else if current_removed {
            self.current.map(|c| c.min(self.files.len() - 1))
        } else {
            self.current
                .map(|c| c - indices.iter().filter(|&&i| i < c).count())
        };

        self.reconstruct_folder_structure();
        info!("removed {} files", indices.len());
        self.events.push(ViewerEvent::FileListChanged);
        true
    }

    /// すべてのファイルを削除する
    pub fn clear_files(&mut self) {
        self.files.clear();
        self.handles.clear();
        self.folders.clear();
        self.folder_index.clear();
        self.path_index.clear();
        self.current = None;
    }

    /// パスからファイルを探す
    ///
    /// 大文字小文字を無視してパスで検索し、見つからず`/`を含まない場合は
    /// ファイル名で検索します。
    pub fn find_file_by_path(&self, path: &str) -> Option<usize> {
        if let Some(&i) = self.path_index.get(&path.to_lowercase()) {
            return Some(i);
        }
        if path.contains('/') {
            return None;
        }
        let name = path.to_lowercase();
        self.files.iter().position(|f| f.name.to_lowercase() == name)
    }

    /// フォルダ直下のファイル（空文字列はルートのファイル）
    pub fn files_in_folder(&self, folder: &str) -> Vec<&FileInfo> {
        self.files
            .iter()
            .filter(|f| f.folder.as_deref().unwrap_or("") == folder)
            .collect()
    }

    /// フォルダ直下のフォルダ（空文字列はルートのフォルダ）
    pub fn subfolders(&self, folder: &str) -> Vec<&FolderInfo> {
        if folder.is_empty() {
            return self.root_folders();
        }
        self.folder(folder)
            .map(|f| f.children.iter().filter_map(|c| self.folder(c)).collect())
            .unwrap_or_default()
    }

    /// フォルダ以下（サブフォルダを含む）のすべてのファイルパス
    pub fn all_file_paths_in_and_below(&self, folder: &str) -> Vec<String> {
        let prefix = format!("{}/", folder);
        self.files
            .iter()
            .filter(|f| {
                f.folder
                    .as_deref()
                    .map_or(false, |d| d == folder || d.starts_with(&prefix))
            })
            .map(|f| f.path.clone())
            .collect()
    }

    /// Markdown内のリンクを登録済みファイルのパスに解決する
    ///
    /// # 引数
    ///
    /// * `href` - リンク先（`/a.md`, `./a.md`, `../a.md`, `a.md`）
    /// * `current_dir` - リンク元ファイルのフォルダ（ルートは空文字列）
    ///
    /// # 戻り値
    ///
    /// 解決したパス（ファイルが存在するかは検証しない）
    pub fn resolve_path(&self, href: &str, current_dir: &str) -> String {
        let href = href.replace('\\', "/");

        if let Some(rest) = href.strip_prefix('/') {
            return rest.to_string();
        }
        if let Some(rest) = href.strip_prefix("./") {
            return join_path(current_dir, rest);
        }
        if let Some(rest) = href.strip_prefix("../") {
            let parts: Vec<&str> = current_dir.split('/').filter(|p| !p.is_empty()).collect();
            let parent = if parts.len() <= 1 {
                String::new()
            } else {
                parts[..parts.len() - 1].join("/")
            };
            return self.resolve_path(rest, &parent);
        }

        if !href.contains('/') {
            let name = href.to_lowercase();
            let sibling = self.files.iter().find(|f| {
                f.folder.as_deref().unwrap_or("") == current_dir && f.name.to_lowercase() == name
            });
            if let Some(file) = sibling {
                return file.path.clone();
            }
        }
        join_path(current_dir, &href)
    }

    /// ファイルを保存する
    ///
    /// 内容は常にメモリ上に反映し、以下の順で書き込み先を選びます。
    ///
    /// 1. ファイルハンドル（書き込み権限を確認し、未許可なら1回だけ要求）
    /// 2. バックエンド
    /// 3. どちらもなければメモリのみ（`FileWarning`を通知）
    ///
    /// 書き込みに失敗した場合は`FileError`を通知してエラーを返します。
    pub fn save_file(&mut self, index: usize, content: &str) -> Result<SaveTarget, ConvertError> {
        let file = self.files.get_mut(index).ok_or_else(|| index_error(index))?;
        file.content = Some(content.to_string());
        file.size = content.len() as u64;
        let path = file.path.clone();

        if let Some(handle) = self.handles.get(&path.to_lowercase()).cloned() {
            return match write_through_handle(handle.as_ref(), content) {
                Ok(()) => {
                    info!("saved {} through file handle", path);
                    Ok(SaveTarget::Handle)
                }
                Err(err) => {
                    self.events.push(ViewerEvent::FileError {
                        path,
                        message: format!("Failed to save file: {}", err),
                    });
                    Err(err)
                }
            };
        }

        if let Some(backend) = self.backend.clone() {
            return match backend.write(&path, content) {
                Ok(()) => {
                    info!("saved {} through backend", path);
                    Ok(SaveTarget::Backend)
                }
                Err(err) => {
                    self.events.push(ViewerEvent::FileError {
                        path,
                        message: format!("Failed to save file: {}", err),
                    });
                    Err(err)
                }
            };
        }

        warn!("{}: {}", path, MEMORY_ONLY_WARNING);
        self.events.push(ViewerEvent::FileWarning {
            path,
            message: MEMORY_ONLY_WARNING.to_string(),
        });
        Ok(SaveTarget::Memory)
    }

    /// 選択中のファイルを保存する
    pub fn save_current_file(&mut self, content: &str) -> Result<SaveTarget, ConvertError> {
        let index = self.current.ok_or_else(|| {
            ConvertError::Io(io::Error::new(io::ErrorKind::NotFound, "No file selected"))
        })?;
        self.save_file(index, content)
    }

    /// ファイルの内容を読み込む
    ///
    /// ファイルハンドル → バックエンド → メモリ上の内容の順に試し、
    /// 読み込めた内容はメモリ上にも反映します。すべて失敗した場合は
    /// `FileError`を通知して最後のエラーを返します。
    pub fn read_file(&mut self, index: usize) -> Result<String, ConvertError> {
        let path = self.files.get(index).ok_or_else(|| index_error(index))?.path.clone();
        let mut last_error = None;

        if let Some(handle) = self.handles.get(&path.to_lowercase()).cloned() {
            match read_through_handle(handle.as_ref()) {
                Ok(text) => {
                    self.files[index].content = Some(text.clone());
                    return Ok(text);
                }
                Err(err) => {
                    warn!("failed to read {} through file handle: {}", path, err);
                    last_error = Some(err);
                }
            }
        }

        if let Some(backend) = self.backend.clone() {
            match backend.read(&path) {
                Ok(text) => {
                    self.files[index].content = Some(text.clone());
                    return Ok(text);
                }
                Err(err) => {
                    warn!("failed to read {} through backend: {}", path, err);
                    last_error = Some(err);
                }
            }
        }

        if let Some(content) = &self.files[index].content {
            return Ok(content.clone());
        }

        let err = last_error.unwrap_or_else(|| {
            ConvertError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No content available for {}", path),
            ))
        });
        self.events.push(ViewerEvent::FileError {
            path,
            message: format!("Failed to read file: {}", err),
        });
        Err(err)
    }

    /// 外部で変更された可能性のあるファイルを読み直す
    ///
    /// # 戻り値
    ///
    /// 内容が変化した場合は`true`（`FileChanged`を通知）。登録されていない
    /// パスは`false`
    pub fn reload_file(&mut self, path: &str) -> Result<bool, ConvertError> {
        let Some(index) = self.find_file_by_path(path) else {
            return Ok(false);
        };
        let before = self.files[index].content.clone();
        let after = self.read_file(index)?;
        if before.as_deref() == Some(after.as_str()) {
            return Ok(false);
        }
        self.files[index].size = after.len() as u64;
        self.events.push(ViewerEvent::FileChanged {
            path: self.files[index].path.clone(),
        });
        Ok(true)
    }

    /// 保存済みの状態で置き換える
    ///
    /// パスまたは名前が空のファイルは除外します。フォルダツリーはファイルから
    /// 再構築し、`folders`からは展開状態のみを引き継ぎます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(usize)` - 復元したファイル数
    /// * `Err(ConvertError::InvalidPreset)` - 有効なファイルが1つもない場合
    pub fn restore_state(
        &mut self,
        files: Vec<FileInfo>,
        folders: Vec<FolderInfo>,
    ) -> Result<usize, ConvertError> {
        let total = files.len();
        let valid: Vec<FileInfo> = files
            .into_iter()
            .filter(|f| !f.path.is_empty() && !f.name.is_empty())
            .map(|mut f| {
                if f.mime_type.is_empty() {
                    f.mime_type = mime_type_for(&f.name).to_string();
                }
                if f.content.is_none() {
                    f.content = Some(format!(
                        "# {}\n\nFile content could not be restored.",
                        f.name
                    ));
                }
                f.uses_file_system_api = false;
                f
            })
            .collect();
        if valid.len() < total {
            warn!("skipped {} invalid files while restoring", total - valid.len());
        }
        if valid.is_empty() {
            return Err(ConvertError::InvalidPreset(
                "No valid files to restore".to_string(),
            ));
        }

        self.clear_files();
        self.files = valid;
        self.reconstruct_folder_structure();
        for saved in folders {
            if let Some(&i) = self.folder_index.get(&saved.path) {
                self.folders[i].expanded = saved.expanded;
            }
        }
        self.current = Some(0);
        self.events.push(ViewerEvent::FileListChanged);
        Ok(self.files.len())
    }

    /// フォルダの展開状態を設定する
    pub fn set_folder_expanded(&mut self, path: &str, expanded: bool) -> bool {
        match self.folder_index.get(path) {
            Some(&i) => {
                self.folders[i].expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// 展開中のフォルダのパス
    pub fn expanded_folders(&self) -> Vec<String> {
        self.folders
            .iter()
            .filter(|f| f.expanded)
            .map(|f| f.path.clone())
            .collect()
    }
}

/// 新規ファイルのパス・フォルダ・深さを決定する
fn placement(file: &NewFile) -> (String, Option<String>, usize) {
    let raw = file
        .relative_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(&file.name)
        .replace('\\', "/");
    let raw = raw.trim_start_matches('/').to_string();

    if let Some((folder, _)) = raw.rsplit_once('/') {
        let depth = folder.split('/').count();
        return (raw.clone(), Some(folder.to_string()), depth);
    }

    match file.parent_folder.as_deref().map(|p| p.trim_matches('/')) {
        Some(parent) if !parent.is_empty() => {
            let depth = parent.split('/').count();
            (
                format!("{}/{}", parent, file.name),
                Some(parent.to_string()),
                depth,
            )
        }
        _ => (raw, None, 0),
    }
}
