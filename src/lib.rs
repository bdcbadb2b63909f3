//! filetomarkdown - Pure-Rust file to Markdown converter
//!
//! This crate converts documents (PDF, DOCX, ODT/ODP, PPTX, XLSX/ODS),
//! archives (ZIP/7Z), plain text and source files into Markdown through a single
//! `convert_path(path) -> String` contract, and provides the state core of a
//! Markdown viewer (file registry, folder tree, presets, external-change polling).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use filetomarkdown::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // Convert a document to a Markdown string
//!     let markdown = converter.convert_path("report.docx")?;
//!     println!("{}", markdown);
//!
//!     // Or write the result next to it
//!     converter.convert_to_file("slides.pptx", "slides.md")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use filetomarkdown::{ConverterBuilder, SecurityConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let security = SecurityConfig {
//!         max_file_count: 500,
//!         ..SecurityConfig::default()
//!     };
//!
//!     let converter = ConverterBuilder::new()
//!         .with_text_extensions(["txt", "md", "rs", "toml"]) // embedded as code blocks in archives
//!         .with_temp_root("/var/tmp")                         // where archives are extracted
//!         .with_security_config(security)
//!         .with_code_files(false)                             // reject .rs/.py/... inputs
//!         .build()?;
//!
//!     let markdown = converter.convert_path("bundle.zip")?;
//!     println!("{}", markdown);
//!     Ok(())
//! }
//! ```
//!
//! # Viewer State
//!
//! ```rust
//! use filetomarkdown::viewer::{FileManager, MemoryStore, NewFile, PresetStore};
//!
//! # fn main() -> Result<(), filetomarkdown::ConvertError> {
//! let mut manager = FileManager::new();
//! manager.add_files(vec![
//!     NewFile::new("intro.md").with_relative_path("docs/intro.md").with_content("# Intro"),
//! ]);
//!
//! let mut presets = PresetStore::new(MemoryStore::new())?;
//! presets.save("docs", &manager)?;
//! assert_eq!(presets.names(), vec!["docs"]);
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod converters;
mod error;
mod package;
mod security;
mod xml;

pub mod viewer;

// 公開API
pub use api::{code_extensions, FileType};
pub use builder::{convert, Converter, ConverterBuilder};
pub use converters::text::format_text;
pub use error::ConvertError;
pub use security::SecurityConfig;
