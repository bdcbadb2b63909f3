//! Change Monitor
//!
//! 監視対象のファイル・ディレクトリを一定間隔でポーリングし、外部での変更を検出します。
//!
//! 各パスについて最終更新日時とサイズのスナップショットを保持し、
//! `poll`のたびに新しいスナップショットと比較します。

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::error::ConvertError;

/// デフォルトのポーリング間隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 停止フラグを確認する間隔の上限
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

/// 検出した変更
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Change {
    /// 内容（更新日時またはサイズ）が変化した
    Modified(PathBuf),
    /// 監視ディレクトリにファイルが追加された（または削除されたファイルが再作成された）
    Added(PathBuf),
    /// ファイルが削除された
    Removed(PathBuf),
}

impl Change {
    pub fn path(&self) -> &Path {
        match self {
            Change::Modified(p) | Change::Added(p) | Change::Removed(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    modified: Option<SystemTime>,
    len: u64,
}

impl Snapshot {
    fn take(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Debug, Clone)]
enum Watch {
    File(Option<Snapshot>),
    Directory(BTreeMap<PathBuf, Snapshot>),
}

/// ディレクトリ配下（サブディレクトリを含む）のファイルのスナップショット
///
/// ルートを読めない場合のみエラーになります。読めなくなったサブディレクトリは
/// 読み飛ばし、削除以外の理由で読めない場合は`previous`の該当部分を引き継ぎます。
fn scan_directory(
    root: &Path,
    previous: &BTreeMap<PathBuf, Snapshot>,
) -> io::Result<BTreeMap<PathBuf, Snapshot>> {
    let mut snapshots = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => return Err(e),
            Err(e) => {
                debug!("skipping unreadable directory {}: {}", dir.display(), e);
                if e.kind() != io::ErrorKind::NotFound {
                    snapshots.extend(
                        previous
                            .iter()
                            .filter(|(path, _)| path.starts_with(&dir))
                            .map(|(path, snapshot)| (path.clone(), *snapshot)),
                    );
                }
                continue;
            }
        };
        // 走査中に削除されたエントリは無視する
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(snapshot) = Snapshot::take(&path) {
                    snapshots.insert(path, snapshot);
                }
            }
        }
    }
    Ok(snapshots)
}

fn diff_directory(
    before: &BTreeMap<PathBuf, Snapshot>,
    after: &BTreeMap<PathBuf, Snapshot>,
    changes: &mut Vec<Change>,
) {
    for (path, snapshot) in after {
        match before.get(path) {
            None => changes.push(Change::Added(path.clone())),
            Some(previous) if previous != snapshot => changes.push(Change::Modified(path.clone())),
            Some(_) => {}
        }
    }
    for path in before.keys() {
        if !after.contains_key(path) {
            changes.push(Change::Removed(path.clone()));
        }
    }
}

/// ポーリングによる変更監視
///
/// # 使用例
///
/// ```rust,no_run
/// use std::sync::atomic::AtomicBool;
/// use filetomarkdown::viewer::ChangeMonitor;
///
/// let mut monitor = ChangeMonitor::new();
/// monitor.watch_directory("docs").unwrap();
///
/// let stop = AtomicBool::new(false);
/// monitor.run(&stop, |changes| {
///     for change in changes {
///         println!("{:?}", change);
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ChangeMonitor {
    interval: Duration,
    watches: BTreeMap<PathBuf, Watch>,
}

impl Default for ChangeMonitor {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            watches: BTreeMap::new(),
        }
    }
}

impl ChangeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 監視中のパス
    pub fn watched_paths(&self) -> Vec<&Path> {
        self.watches.keys().map(PathBuf::as_path).collect()
    }

    /// ファイルを監視対象に追加する
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 現在のスナップショットを記録した場合
    /// * `Err(ConvertError)` - ファイルが存在しない、または読めない場合
    pub fn watch_file(&mut self, path: impl Into<PathBuf>) -> Result<(), ConvertError> {
        let path = path.into();
        let snapshot = Snapshot::take(&path).map_err(|e| ConvertError::from_read(&path, e))?;
        debug!("watching file {}", path.display());
        self.watches.insert(path, Watch::File(Some(snapshot)));
        Ok(())
    }

    /// ディレクトリを監視対象に追加する（サブディレクトリを含む）
    pub fn watch_directory(&mut self, path: impl Into<PathBuf>) -> Result<(), ConvertError> {
        let path = path.into();
        let snapshots = scan_directory(&path, &BTreeMap::new())
            .map_err(|e| ConvertError::from_read(&path, e))?;
        debug!(
            "watching directory {} ({} files)",
            path.display(),
            snapshots.len()
        );
        self.watches.insert(path, Watch::Directory(snapshots));
        Ok(())
    }

    /// 監視を解除する
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> bool {
        self.watches.remove(path.as_ref()).is_some()
    }

    /// スナップショットを取り直し、前回からの変更を返す
    ///
    /// 監視中のディレクトリが削除された場合は、配下のファイルがすべて
    /// `Removed`として報告されます。削除以外の理由で読めない場合は
    /// 前回のスナップショットを保持し、変更なしとして扱います。
    pub fn poll(&mut self) -> Vec<Change> {
        let mut changes = Vec::new();
        for (path, watch) in self.watches.iter_mut() {
            match watch {
                Watch::File(previous) => {
                    let current = Snapshot::take(path).ok();
                    match (*previous, current) {
                        (Some(_), None) => changes.push(Change::Removed(path.clone())),
                        (None, Some(_)) => changes.push(Change::Added(path.clone())),
                        (Some(a), Some(b)) if a != b => changes.push(Change::Modified(path.clone())),
                        _ => {}
                    }
                    *previous = current;
                }
                Watch::Directory(previous) => {
                    let current = match scan_directory(path, previous) {
                        Ok(snapshots) => snapshots,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
                        Err(e) => {
                            warn!("failed to scan {}: {}", path.display(), e);
                            continue;
                        }
                    };
                    diff_directory(previous, &current, &mut changes);
                    *previous = current;
                }
            }
        }
        if !changes.is_empty() {
            debug!("detected {} changes", changes.len());
        }
        changes
    }

    /// 停止フラグが立つまでポーリングを繰り返す
    ///
    /// 変更があった場合のみ`callback`を呼び出します。
    pub fn run<F>(&mut self, stop: &AtomicBool, mut callback: F)
    where
        F: FnMut(&[Change]),
    {
        while !stop.load(Ordering::Relaxed) {
            let changes = self.poll();
            if !changes.is_empty() {
                callback(&changes);
            }

            let mut remaining = self.interval;
            while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
                let slice = remaining.min(STOP_CHECK_SLICE);
                thread::sleep(slice);
                remaining -= slice;
            }
        }
    }
}
