//! Security Tests
//!
//! セキュリティ対策のテストケースを実装します。
//! ZIP bomb攻撃、XXE攻撃、パストラバーサル攻撃などへの対策を、
//! アーカイブ（ZIP）とOffice文書（ZIPパッケージ）の両方で検証します。

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use filetomarkdown::{ConvertError, ConverterBuilder, SecurityConfig};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

fn assert_security_violation(result: Result<String, ConvertError>, expected: &str) {
    match result {
        Err(ConvertError::SecurityViolation(msg)) => {
            assert!(msg.contains(expected), "unexpected message: {}", msg);
        }
        other => panic!("Expected SecurityViolation error, got {:?}", other),
    }
}

/// ZIP bomb攻撃のテスト: エントリ数が上限を超えるアーカイブ
#[test]
fn test_zip_bomb_too_many_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.zip");
    let names: Vec<String> = (0..6).map(|i| format!("file{}.txt", i)).collect();
    let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
    write_zip(&path, &entries);

    let converter = ConverterBuilder::new()
        .with_security_config(SecurityConfig {
            max_file_count: 5,
            ..SecurityConfig::default()
        })
        .build()
        .unwrap();
    assert_security_violation(converter.convert_path(&path), "too many files");
}

/// ZIP bomb攻撃のテスト: 単一エントリのサイズが上限を超えるアーカイブ
#[test]
fn test_zip_bomb_single_entry_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = dir.path().join("tmp");
    fs::create_dir(&temp_root).unwrap();
    let path = dir.path().join("large.zip");
    write_zip(&path, &[("big.txt", &[b'a'; 1024])]);

    let converter = ConverterBuilder::new()
        .with_temp_root(&temp_root)
        .with_security_config(SecurityConfig {
            max_file_size: 100,
            ..SecurityConfig::default()
        })
        .build()
        .unwrap();
    assert!(matches!(
        converter.convert_path(&path),
        Err(ConvertError::SecurityViolation(_))
    ));
    // 失敗時も一時ディレクトリは残らない
    assert_eq!(fs::read_dir(&temp_root).unwrap().count(), 0);
}

/// ZIP bomb攻撃のテスト: 展開後の合計サイズが上限を超えるアーカイブ
#[test]
fn test_zip_bomb_total_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("total.zip");
    let chunk = [b'z'; 400];
    write_zip(&path, &[("a.txt", &chunk), ("b.txt", &chunk), ("c.txt", &chunk)]);

    let converter = ConverterBuilder::new()
        .with_security_config(SecurityConfig {
            max_decompressed_size: 1000,
            ..SecurityConfig::default()
        })
        .build()
        .unwrap();
    assert!(matches!(
        converter.convert_path(&path),
        Err(ConvertError::SecurityViolation(_))
    ));
}

/// 入力ファイル自体のサイズ制限
#[test]
fn test_input_file_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.zip");
    write_zip(&path, &[("a.txt", &[b'a'; 512])]);

    let converter = ConverterBuilder::new()
        .with_security_config(SecurityConfig {
            max_input_file_size: 64,
            ..SecurityConfig::default()
        })
        .build()
        .unwrap();
    assert_security_violation(converter.convert_path(&path), "Input file size exceeds maximum");
}

/// パストラバーサル攻撃のテスト: `..`を含むパス
#[test]
fn test_path_traversal_dotdot() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = dir.path().join("tmp");
    fs::create_dir(&temp_root).unwrap();
    let path = dir.path().join("evil.zip");
    write_zip(&path, &[("ok.txt", b"fine"), ("../../evil.txt", b"pwned")]);

    let converter = ConverterBuilder::new()
        .with_temp_root(&temp_root)
        .build()
        .unwrap();
    assert_security_violation(converter.convert_path(&path), "Path traversal detected");
    assert!(!dir.path().join("evil.txt").exists());
    assert_eq!(fs::read_dir(&temp_root).unwrap().count(), 0);
}

/// パストラバーサル攻撃のテスト: 絶対パス
#[test]
fn test_path_traversal_absolute() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absolute.zip");
    write_zip(&path, &[("/tmp/evil.txt", b"pwned")]);

    let converter = ConverterBuilder::new().build().unwrap();
    assert_security_violation(converter.convert_path(&path), "Absolute path is not allowed");
}

/// Office文書のパッケージも同じ制限を受ける
///
/// ODTはフォーマットエラーをプレースホルダーに置き換えるが、
/// セキュリティ違反はそのまま返す。
#[test]
fn test_office_package_traversal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let converter = ConverterBuilder::new().build().unwrap();

    for name in ["evil.docx", "evil.odt", "evil.pptx", "evil.odp"] {
        let path = dir.path().join(name);
        write_zip(&path, &[("content.xml", b"<x/>"), ("../escape.xml", b"<x/>")]);
        assert!(
            matches!(
                converter.convert_path(&path),
                Err(ConvertError::SecurityViolation(_))
            ),
            "{} should be rejected",
            name
        );
    }
}

/// XXE攻撃のテスト: 外部エンティティは展開されない
#[test]
fn test_xxe_entity_not_expanded() {
    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    fs::write(&secret, "TOP-SECRET").unwrap();

    let document = format!(
        r#"<?xml version="1.0"?>
<!DOCTYPE w:document [<!ENTITY xxe SYSTEM "file://{}">]>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>&xxe;</w:t></w:r></w:p></w:body></w:document>"#,
        secret.display()
    );
    let path = dir.path().join("xxe.docx");
    write_zip(&path, &[("word/document.xml", document.as_bytes())]);

    let converter = ConverterBuilder::new().build().unwrap();
    match converter.convert_path(&path) {
        Ok(markdown) => assert!(!markdown.contains("TOP-SECRET")),
        Err(e) => assert_eq!(e.code(), "FORMAT_ERROR"),
    }
}

/// 不正なUTF-8は置換文字として出力され、UTF-8として有効なMarkdownになる
#[test]
fn test_invalid_utf8_text_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.txt");
    fs::write(&path, b"caf\xe9\n").unwrap();

    let converter = ConverterBuilder::new().build().unwrap();
    assert_eq!(converter.convert_path(&path).unwrap(), "caf\u{fffd}\n");
}
