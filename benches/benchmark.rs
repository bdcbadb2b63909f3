//! パフォーマンスベンチマーク
//!
//! テキスト整形とアーカイブ変換の処理速度を測定します。
//! 入力データはベンチマーク実行時に一時ディレクトリへ生成します。

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

use filetomarkdown::{format_text, ConverterBuilder};

/// 見出し・リスト・コードブロックを含むテキストを生成
fn generate_text(sections: usize) -> String {
    let mut text = String::new();
    for i in 0..sections {
        text.push_str(&format!("Section {}\n===\n", i));
        text.push_str("Some introductory prose for this section.\n");
        text.push_str("* first item\n- second item\n1. numbered item\n");
        text.push_str("    let value = compute();\n    println!(\"{}\", value);\n\n");
    }
    text
}

/// テキストファイルを含むZIPアーカイブを生成
fn write_archive(path: &Path, folders: usize, files_per_folder: usize) -> std::io::Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = FileOptions::default();
    let body = generate_text(4);
    for folder in 0..folders {
        for file in 0..files_per_folder {
            zip.start_file(format!("dir{}/file{}.txt", folder, file), options)?;
            zip.write_all(body.as_bytes())?;
        }
    }
    zip.finish()?;
    Ok(())
}

/// テキスト整形のスループット
fn benchmark_format_text(c: &mut Criterion) {
    let text = generate_text(1_000);

    let mut group = c.benchmark_group("format_text");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("1000_sections", |b| {
        b.iter(|| format_text(black_box(&text)));
    });
    group.finish();
}

/// アーカイブ変換（展開・並列レンダリング・一時ディレクトリの削除を含む）
fn benchmark_archive(c: &mut Criterion) {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: Failed to create temp dir: {}. Skipping benchmark.", e);
            return;
        }
    };
    let path = dir.path().join("bench.zip");
    if let Err(e) = write_archive(&path, 10, 20) {
        eprintln!("Warning: Failed to generate archive: {}. Skipping benchmark.", e);
        return;
    }

    let converter = match ConverterBuilder::new().build() {
        Ok(converter) => converter,
        Err(e) => {
            eprintln!("Warning: Failed to build converter: {}. Skipping benchmark.", e);
            return;
        }
    };

    let mut group = c.benchmark_group("archive");
    group.throughput(Throughput::Elements(200));
    group.sample_size(20);
    group.bench_function("zip_200_files", |b| {
        b.iter(|| {
            let result = converter.convert_path(black_box(&path));
            black_box(result).ok();
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_format_text, benchmark_archive);
criterion_main!(benches);
