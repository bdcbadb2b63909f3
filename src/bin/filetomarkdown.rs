//! Command-line front end for filetomarkdown
//!
//! # Usage
//!
//! ```bash
//! # Print the Markdown rendering of a document
//! filetomarkdown convert report.docx
//!
//! # Write the result to a file
//! filetomarkdown convert bundle.zip -o bundle.md
//!
//! # List supported input types
//! filetomarkdown filetypes
//! ```
//!
//! Log output is controlled with `RUST_LOG` (default: `warn`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use filetomarkdown::{code_extensions, ConverterBuilder, FileType};

/// Convert documents, archives and text files to Markdown
#[derive(Parser, Debug)]
#[command(name = "filetomarkdown")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file to Markdown
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List supported file types
    Filetypes,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match args.command {
        Command::Convert { input, output } => {
            let result = ConverterBuilder::new().build().and_then(|converter| match &output {
                Some(output) => converter.convert_to_file(&input, output),
                None => converter.convert_path(&input).map(|markdown| println!("{}", markdown)),
            });
            match result {
                Ok(()) => {
                    if let Some(output) = output {
                        eprintln!("Converted {} -> {}", input.display(), output.display());
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("[{}] {}", e.code(), e);
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Filetypes => {
            println!("Supported file types:");
            for file_type in FileType::all() {
                println!("  • {:<6} - {}", file_type.extension(), file_type.description());
            }
            let code: Vec<&str> = code_extensions().collect();
            println!(
                "  • {:<6} - {} ({})",
                FileType::Code.extension(),
                FileType::Code.description(),
                code.join(", ")
            );
            ExitCode::SUCCESS
        }
    }
}
