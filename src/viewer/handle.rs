//! File Handles
//!
//! ビューアーが開いたファイルへの読み書き経路を抽象化します。
//!
//! - [`FileHandle`]: 個々のファイルに紐付くハンドル（権限の問い合わせ・要求を伴う）
//! - [`FileBackend`]: ハンドルを持たないファイルのためのフォールバック保存先
//!
//! どちらもトレイトとして定義し、ローカルファイルシステム実装
//! （[`LocalFileHandle`], [`DirectoryBackend`]）を提供します。

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::security::validate_archive_path;

/// アクセスモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// 読み込みのみ
    Read,
    /// 読み書き
    ReadWrite,
}

/// 権限の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// 許可済み
    Granted,
    /// 拒否
    Denied,
    /// 未決定（要求すれば許可される可能性がある）
    Prompt,
}

/// 個々のファイルに紐付くハンドル
///
/// 保存・読み込みの前に`query_permission`で権限を確認し、許可されていなければ
/// `request_permission`を1回だけ呼び出します。
pub trait FileHandle: fmt::Debug + Send + Sync {
    /// 現在の権限状態を問い合わせる
    fn query_permission(&self, mode: AccessMode) -> PermissionState;

    /// 権限を要求する
    fn request_permission(&self, mode: AccessMode) -> PermissionState;

    /// ファイル全体をUTF-8文字列として読み込む
    fn read(&self) -> io::Result<String>;

    /// ファイル全体を書き換える
    fn write(&self, content: &str) -> io::Result<()>;
}

/// ハンドルを持たないファイルの読み書き先
///
/// パスはビューアー内の相対パス（`docs/readme.md`形式）です。
pub trait FileBackend: fmt::Debug + Send + Sync {
    /// ファイルを読み込む
    fn read(&self, path: &str) -> Result<String, ConvertError>;

    /// ファイルを書き込む
    fn write(&self, path: &str, content: &str) -> Result<(), ConvertError>;
}

/// ローカルファイルシステム上のファイルハンドル
#[derive(Debug, Clone)]
pub struct LocalFileHandle {
    path: PathBuf,
}

impl LocalFileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn permission(&self, mode: AccessMode) -> PermissionState {
        match fs::metadata(&self.path) {
            Ok(metadata) => {
                if mode == AccessMode::ReadWrite && metadata.permissions().readonly() {
                    PermissionState::Denied
                } else {
                    PermissionState::Granted
                }
            }
            // 未作成のファイルは書き込み時に作成される
            Err(e) if e.kind() == io::ErrorKind::NotFound => match mode {
                AccessMode::Read => PermissionState::Denied,
                AccessMode::ReadWrite => PermissionState::Prompt,
            },
            Err(_) => PermissionState::Denied,
        }
    }
}

impl FileHandle for LocalFileHandle {
    fn query_permission(&self, mode: AccessMode) -> PermissionState {
        self.permission(mode)
    }

    fn request_permission(&self, mode: AccessMode) -> PermissionState {
        match self.permission(mode) {
            PermissionState::Prompt => PermissionState::Granted,
            state => state,
        }
    }

    fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }

    fn write(&self, content: &str) -> io::Result<()> {
        fs::write(&self.path, content)
    }
}

/// ルートディレクトリ配下にファイルを読み書きするバックエンド
///
/// 絶対パスや`..`を含むパスは`SecurityViolation`として拒否します。
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ConvertError> {
        let relative = validate_archive_path(path).map_err(|reason| {
            ConvertError::SecurityViolation(format!("Invalid file path: {}", reason))
        })?;
        Ok(self.root.join(relative))
    }
}

impl FileBackend for DirectoryBackend {
    fn read(&self, path: &str) -> Result<String, ConvertError> {
        let full = self.resolve(path)?;
        fs::read_to_string(&full).map_err(|e| ConvertError::from_read(full, e))
    }

    fn write(&self, path: &str, content: &str) -> Result<(), ConvertError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;
        Ok(())
    }
}
