//! pdfedit command-line editor
//!
//! Each invocation opens one editing session, applies the requested edits
//! and writes `edited_<input name>` to the output directory.

mod commands;
mod script;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pdfedit_session::EditorConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfedit")]
#[command(version, about = "Reorder, delete, merge, annotate and retitle PDF pages")]
struct Cli {
    /// Session configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for edited output files
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a PDF and print what it contains
    Info {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write one PNG thumbnail per page plus a JSON manifest
    Thumbs { file: PathBuf },
    /// Append the pages of `second` to `first`
    Merge { first: PathBuf, second: PathBuf },
    /// Move a page (0-based indices)
    Move {
        file: PathBuf,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Delete a page (0-based index)
    Delete {
        file: PathBuf,
        #[arg(long)]
        page: usize,
    },
    /// Print metadata, or update it when any field is given
    Meta {
        file: PathBuf,
        #[command(flatten)]
        fields: commands::MetaArgs,
    },
    /// Apply visual filters and a border to one page
    Filter {
        file: PathBuf,
        #[arg(long)]
        page: usize,
        #[command(flatten)]
        filter: commands::FilterArgs,
    },
    /// Draw text on one page
    Text {
        file: PathBuf,
        #[arg(long)]
        page: usize,
        #[command(flatten)]
        text: commands::TextArgs,
    },
    /// Apply a TOML script of edits to one document
    Run { script: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<EditorConfig> {
    let config = match path {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    config.with_env_overrides()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Output files and printed results go to stdout; logs stay on stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(?config, "Loaded configuration");

    let out_dir = cli.out_dir;
    match cli.command {
        Command::Info { file, json } => commands::info(&file, json),
        Command::Thumbs { file } => commands::thumbs(&config, &file, &out_dir).await,
        Command::Merge { first, second } => {
            commands::merge(&config, &first, &second, &out_dir).await
        }
        Command::Move { file, from, to } => {
            commands::move_page(&config, &file, from, to, &out_dir).await
        }
        Command::Delete { file, page } => commands::delete(&config, &file, page, &out_dir).await,
        Command::Meta { file, fields } => commands::meta(&config, &file, fields, &out_dir).await,
        Command::Filter { file, page, filter } => {
            commands::filter(&config, &file, page, filter, &out_dir).await
        }
        Command::Text { file, page, text } => {
            commands::text(&config, &file, page, text, &out_dir).await
        }
        Command::Run { script } => {
            let written = script::run_file(&config, &script, &out_dir).await?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}
