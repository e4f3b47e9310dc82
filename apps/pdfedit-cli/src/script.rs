//! Edit scripts
//!
//! A script names one input document and a list of steps applied to it in
//! order, through a single session:
//!
//! ```toml
//! input = "contract.pdf"
//!
//! [[steps]]
//! op = "delete"
//! page = 2
//!
//! [[steps]]
//! op = "merge"
//! file = "appendix.pdf"
//!
//! [[steps]]
//! op = "metadata"
//! title = "Signed contract"
//!
//! [[steps]]
//! op = "select"
//! page = 0
//!
//! [[steps]]
//! op = "text"
//! text = "COPY"
//! x = 72.0
//! y = 72.0
//! ```
//!
//! Relative paths are resolved against the script's directory. The edited
//! document is written once at the end, and additionally at every `export`
//! step.

use crate::commands::{display_name, read_pdf, write_export};
use anyhow::{Context, Result};
use pdfedit_session::{
    BorderConfig, EditorConfig, EditorSession, Metadata, Outcome, PageFilter, TextConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Script {
    pub input: PathBuf,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Merge {
        file: PathBuf,
    },
    Move {
        from: usize,
        to: usize,
    },
    Delete {
        page: usize,
    },
    Metadata(Metadata),
    Select {
        page: Option<usize>,
    },
    Filter {
        #[serde(default)]
        filter: PageFilter,
        border: Option<BorderConfig>,
    },
    Text(TextConfig),
    Export,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Merge { .. } => "merge",
            Step::Move { .. } => "move",
            Step::Delete { .. } => "delete",
            Step::Metadata(_) => "metadata",
            Step::Select { .. } => "select",
            Step::Filter { .. } => "filter",
            Step::Text(_) => "text",
            Step::Export => "export",
        }
    }
}

impl Script {
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse edit script")
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load and run the script at `path`. Returns every file written.
pub async fn run_file(config: &EditorConfig, path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let script = Script::from_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    run(config, &script, base, out_dir).await
}

pub async fn run(
    config: &EditorConfig,
    script: &Script,
    base: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let input = resolve(base, &script.input);
    let session = EditorSession::new(config);
    session
        .load(display_name(&input), read_pdf(&input)?)
        .await
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let mut written = Vec::new();
    for (i, step) in script.steps.iter().enumerate() {
        tracing::info!(step = i + 1, op = step.name(), "Running step");
        let outcome = apply(&session, step, base, out_dir, &mut written)
            .await
            .with_context(|| format!("Step {} ({}) failed", i + 1, step.name()))?;
        if outcome == Some(Outcome::Unchanged) {
            tracing::warn!(step = i + 1, op = step.name(), "Step changed nothing");
        }
    }

    written.push(write_export(&session, out_dir)?);
    Ok(written)
}

/// Run one step. Returns `None` for steps that never touch the document.
async fn apply(
    session: &EditorSession,
    step: &Step,
    base: &Path,
    out_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<Option<Outcome>> {
    let outcome = match step {
        Step::Merge { file } => session.merge(read_pdf(&resolve(base, file))?).await?,
        Step::Move { from, to } => session.reorder_page(*from, *to).await?,
        Step::Delete { page } => session.delete_page(*page).await?,
        Step::Metadata(metadata) => session.set_metadata(metadata.clone()).await?,
        Step::Filter { filter, border } => {
            session
                .apply_filters(filter.clone(), border.clone())
                .await?
        }
        Step::Text(config) => session.add_text(config.clone()).await?,
        Step::Select { page } => {
            session.select_page(*page).await?;
            return Ok(None);
        }
        Step::Export => {
            written.push(write_export(session, out_dir)?);
            return Ok(None);
        }
    };
    Ok(Some(outcome))
}
