//! Viewer Tests
//!
//! ファイルマネージャー・プリセット・変更監視を、実際のディレクトリと
//! JSONファイルストアを使って組み合わせて検証します。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetomarkdown::viewer::{
    Change, ChangeMonitor, DirectoryBackend, FileManager, JsonFileStore, KeyValueStore, NewFile,
    PresetStore, SaveTarget, ViewerEvent, PRESETS_KEY,
};
use filetomarkdown::ConverterBuilder;

/// ディレクトリ配下のファイルを相対パス付きで列挙する
fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn sample_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/guide")).unwrap();
    fs::write(root.join("README.md"), "# Readme").unwrap();
    fs::write(root.join("docs/intro.md"), "# Intro").unwrap();
    fs::write(root.join("docs/guide/setup.md"), "# Setup").unwrap();
}

fn open_tree(root: &Path) -> FileManager {
    let files = collect_files(root)
        .iter()
        .map(|p| NewFile::from_path(root, p).unwrap())
        .collect();
    let mut manager = FileManager::new();
    manager.add_files(files);
    manager
}

#[test]
fn test_open_directory_builds_tree() {
    let dir = tempfile::tempdir().unwrap();
    sample_tree(dir.path());

    let mut manager = open_tree(dir.path());
    assert_eq!(manager.files().len(), 3);
    assert_eq!(manager.take_events(), vec![ViewerEvent::FileListChanged]);

    let index = manager.find_file_by_path("docs/guide/setup.md").unwrap();
    assert_eq!(manager.files()[index].content.as_deref(), Some("# Setup"));
    assert!(manager.files()[index].uses_file_system_api);

    let guide = manager.folder("docs/guide").unwrap();
    assert_eq!(guide.parent.as_deref(), Some("docs"));
    assert_eq!(
        manager.resolve_path("../intro.md", "docs/guide"),
        "docs/intro.md"
    );
}

#[test]
fn test_edit_save_and_detect_external_change() {
    let dir = tempfile::tempdir().unwrap();
    sample_tree(dir.path());
    let mut manager = open_tree(dir.path());
    manager.take_events();

    let intro = dir.path().join("docs/intro.md");
    let mut monitor = ChangeMonitor::new();
    monitor.watch_directory(dir.path()).unwrap();

    // ビューアーからの保存はハンドル経由でディスクに書き込まれる
    let index = manager.find_file_by_path("docs/intro.md").unwrap();
    assert_eq!(
        manager.save_file(index, "# Intro\n\nEdited in viewer").unwrap(),
        SaveTarget::Handle
    );
    assert_eq!(
        fs::read_to_string(&intro).unwrap(),
        "# Intro\n\nEdited in viewer"
    );
    assert_eq!(monitor.poll(), vec![Change::Modified(intro.clone())]);

    // 外部エディタでの変更を検出して読み直す
    fs::write(&intro, "# Intro\n\nEdited elsewhere, longer").unwrap();
    let changes = monitor.poll();
    assert_eq!(changes, vec![Change::Modified(intro.clone())]);

    let relative = changes[0]
        .path()
        .strip_prefix(dir.path())
        .unwrap()
        .to_string_lossy()
        .replace('\\', "/");
    assert!(manager.reload_file(&relative).unwrap());
    assert_eq!(
        manager.take_events(),
        vec![ViewerEvent::FileChanged {
            path: "docs/intro.md".to_string()
        }]
    );
    assert_eq!(
        manager.files()[index].content.as_deref(),
        Some("# Intro\n\nEdited elsewhere, longer")
    );
    // 内容が同じなら通知しない
    assert!(!manager.reload_file(&relative).unwrap());
}

#[test]
fn test_save_through_backend_for_converted_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "Notes\n===\n* one").unwrap();
    let markdown = ConverterBuilder::new()
        .build()
        .unwrap()
        .convert_path(&input)
        .unwrap();

    let out_root = dir.path().join("out");
    let mut manager =
        FileManager::new().with_backend(Arc::new(DirectoryBackend::new(&out_root)));
    manager.add_files(vec![NewFile::new("notes.md")
        .in_folder("converted")
        .with_content(markdown.clone())]);
    manager.take_events();

    assert_eq!(manager.save_current_file(&markdown).unwrap(), SaveTarget::Backend);
    assert!(manager.take_events().is_empty());
    assert_eq!(
        fs::read_to_string(out_root.join("converted/notes.md")).unwrap(),
        "# Notes\n- one\n"
    );
    assert_eq!(manager.read_file(0).unwrap(), "# Notes\n- one\n");
}

#[test]
fn test_presets_persist_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    sample_tree(&dir.path().join("tree"));
    let store_path = dir.path().join("viewer-state.json");

    let manager = open_tree(&dir.path().join("tree"));
    {
        let mut presets = PresetStore::new(JsonFileStore::open(&store_path).unwrap()).unwrap();
        presets.save("tree", &manager).unwrap();
        presets
            .save_expanded_folders(&["docs".to_string()])
            .unwrap();
    }

    // 新しいセッション
    let store = JsonFileStore::open(&store_path).unwrap();
    assert!(store.get(PRESETS_KEY).unwrap().is_some());
    let presets = PresetStore::new(store).unwrap();
    assert_eq!(presets.names(), vec!["tree"]);
    assert_eq!(presets.load_expanded_folders().unwrap(), vec!["docs"]);

    let mut restored = FileManager::new();
    assert_eq!(presets.load("tree", &mut restored).unwrap(), 3);
    assert_eq!(restored.folders(), manager.folders());
    assert_eq!(restored.files().len(), manager.files().len());
    for (a, b) in restored.files().iter().zip(manager.files()) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.content, b.content);
        // ハンドルは保存されない
        assert!(!a.uses_file_system_api);
    }
    assert_eq!(
        restored.take_events().last(),
        Some(&ViewerEvent::FileSelected {
            index: 0,
            path: restored.files()[0].path.clone()
        })
    );
}

#[test]
fn test_remove_folder_contents() {
    let dir = tempfile::tempdir().unwrap();
    sample_tree(dir.path());
    let mut manager = open_tree(dir.path());

    let below = manager.all_file_paths_in_and_below("docs");
    assert_eq!(below.len(), 2);
    assert!(manager.remove_files(&below));
    assert_eq!(manager.files().len(), 1);
    assert!(manager.folders().is_empty());
    assert_eq!(manager.current_file().unwrap().path, "README.md");
}
