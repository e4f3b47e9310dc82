//! Subcommand handlers

use anyhow::{Context, Result};
use base64::Engine;
use clap::Args;
use pdfedit_session::{
    BorderConfig, BorderStyle, EditorConfig, EditorSession, Metadata, Outcome, PageFilter,
    TextConfig, TextStyle, Tint,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct MetaArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub keywords: Option<String>,
    #[arg(long)]
    pub creator: Option<String>,
    #[arg(long)]
    pub producer: Option<String>,
}

impl From<MetaArgs> for Metadata {
    fn from(args: MetaArgs) -> Self {
        Metadata {
            title: args.title,
            author: args.author,
            subject: args.subject,
            keywords: args.keywords,
            creator: args.creator,
            producer: args.producer,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Desaturation strength, 0..=1
    #[arg(long, default_value_t = 0.0)]
    pub grayscale: f32,
    /// Sepia strength, 0..=1
    #[arg(long, default_value_t = 0.0)]
    pub sepia: f32,
    #[arg(long)]
    pub invert: bool,
    /// -1 (darker) ..= 1 (lighter)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub brightness: f32,
    /// Tint color as #rrggbb
    #[arg(long)]
    pub tint: Option<String>,
    #[arg(long, default_value_t = 0.3)]
    pub tint_strength: f32,
    /// Border stroke width in points
    #[arg(long)]
    pub border_width: Option<f32>,
    #[arg(long, default_value = "#000000")]
    pub border_color: String,
    /// solid, dashed or dotted
    #[arg(long, default_value = "solid", value_parser = parse_border_style)]
    pub border_style: BorderStyle,
    #[arg(long, default_value_t = 0.0)]
    pub border_inset: f32,
}

fn parse_border_style(s: &str) -> Result<BorderStyle, String> {
    match s {
        "solid" => Ok(BorderStyle::Solid),
        "dashed" => Ok(BorderStyle::Dashed),
        "dotted" => Ok(BorderStyle::Dotted),
        other => Err(format!("unknown border style '{}'", other)),
    }
}

impl FilterArgs {
    fn into_parts(self) -> (PageFilter, Option<BorderConfig>) {
        let filter = PageFilter {
            grayscale: self.grayscale,
            sepia: self.sepia,
            invert: self.invert,
            brightness: self.brightness,
            tint: self.tint.map(|color| Tint {
                color,
                strength: self.tint_strength,
            }),
        };
        let border = self.border_width.map(|width| BorderConfig {
            width,
            color: self.border_color,
            style: self.border_style,
            inset: self.border_inset,
        });
        (filter, border)
    }
}

#[derive(Args, Debug)]
pub struct TextArgs {
    #[arg(long)]
    pub text: String,
    /// Baseline origin in points from the lower-left corner
    #[arg(long, default_value_t = 72.0)]
    pub x: f32,
    #[arg(long, default_value_t = 72.0)]
    pub y: f32,
    #[arg(long, default_value_t = 12.0)]
    pub size: f32,
    #[arg(long, default_value = "#000000")]
    pub color: String,
    /// Font family hint, e.g. "Helvetica", "Times", "Courier"
    #[arg(long)]
    pub font: Option<String>,
    #[arg(long)]
    pub bold: bool,
    #[arg(long)]
    pub italic: bool,
    #[arg(long, default_value_t = 1.0)]
    pub opacity: f32,
    /// Counter-clockwise, in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotation: f32,
}

impl From<TextArgs> for TextConfig {
    fn from(args: TextArgs) -> Self {
        TextConfig {
            style: TextStyle {
                font_size: args.size,
                color: args.color,
                font_name: args.font,
                is_italic: args.italic,
                is_bold: args.bold,
            },
            opacity: args.opacity,
            rotation: args.rotation,
            ..TextConfig::new(args.text, args.x, args.y)
        }
    }
}

pub(crate) fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Start a session and load `path` into it
pub(crate) async fn open(config: &EditorConfig, path: &Path) -> Result<EditorSession> {
    let bytes = read_pdf(path)?;
    let session = EditorSession::new(config);
    session
        .load(display_name(path), bytes)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(session)
}

/// Write the session's document as `edited_<name>` into `out_dir`
pub(crate) fn write_export(session: &EditorSession, out_dir: &Path) -> Result<PathBuf> {
    let export = session.export()?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join(&export.file_name);
    fs::write(&path, &export.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), size = export.bytes.len(), "Wrote edited PDF");
    Ok(path)
}

fn report(outcome: Outcome, what: &str) {
    if outcome == Outcome::Unchanged {
        tracing::warn!("{}: nothing to change", what);
    }
}

pub fn info(path: &Path, json: bool) -> Result<()> {
    let bytes = read_pdf(path)?;
    let info = pdfedit_core::validate_pdf(&bytes)
        .with_context(|| format!("{} is not an editable PDF", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File:      {}", path.display());
        println!("Version:   {}", info.version);
        println!("Pages:     {}", info.page_count);
        println!("Size:      {} bytes", info.size_bytes);
        if let Some(title) = &info.title {
            println!("Title:     {}", title);
        }
        if let Some(author) = &info.author {
            println!("Author:    {}", author);
        }
    }
    Ok(())
}

pub async fn thumbs(config: &EditorConfig, path: &Path, out_dir: &Path) -> Result<()> {
    let session = open(config, path).await?;
    let state = session.state();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let engine = base64::engine::general_purpose::STANDARD;
    for thumb in state.thumbnails.iter() {
        let encoded = thumb
            .image
            .strip_prefix("data:image/png;base64,")
            .context("Thumbnail is not a PNG data URL")?;
        let png = engine
            .decode(encoded)
            .context("Thumbnail data is not valid base64")?;
        let file = out_dir.join(format!("page-{:03}.png", thumb.index + 1));
        fs::write(&file, png).with_context(|| format!("Failed to write {}", file.display()))?;
    }

    let manifest = out_dir.join("thumbnails.json");
    fs::write(&manifest, serde_json::to_string_pretty(&*state.thumbnails)?)
        .with_context(|| format!("Failed to write {}", manifest.display()))?;
    println!("{} thumbnails in {}", state.thumbnails.len(), out_dir.display());
    Ok(())
}

pub async fn merge(config: &EditorConfig, first: &Path, second: &Path, out_dir: &Path) -> Result<()> {
    let session = open(config, first).await?;
    session
        .merge(read_pdf(second)?)
        .await
        .with_context(|| format!("Failed to merge {}", second.display()))?;
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}

pub async fn move_page(
    config: &EditorConfig,
    path: &Path,
    from: usize,
    to: usize,
    out_dir: &Path,
) -> Result<()> {
    let session = open(config, path).await?;
    let outcome = session.reorder_page(from, to).await?;
    report(outcome, "move");
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}

pub async fn delete(config: &EditorConfig, path: &Path, page: usize, out_dir: &Path) -> Result<()> {
    let session = open(config, path).await?;
    session.delete_page(page).await?;
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}

pub async fn meta(config: &EditorConfig, path: &Path, fields: MetaArgs, out_dir: &Path) -> Result<()> {
    let session = open(config, path).await?;
    let update = Metadata::from(fields);

    if update.is_empty() {
        let metadata = session.get_metadata().await?;
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    session.set_metadata(update).await?;
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}

pub async fn filter(
    config: &EditorConfig,
    path: &Path,
    page: usize,
    args: FilterArgs,
    out_dir: &Path,
) -> Result<()> {
    let session = open(config, path).await?;
    session.select_page(Some(page)).await?;
    let (filter, border) = args.into_parts();
    let outcome = session.apply_filters(filter, border).await?;
    report(outcome, "filter");
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}

pub async fn text(
    config: &EditorConfig,
    path: &Path,
    page: usize,
    args: TextArgs,
    out_dir: &Path,
) -> Result<()> {
    let session = open(config, path).await?;
    session.select_page(Some(page)).await?;
    session.add_text(TextConfig::from(args)).await?;
    println!("{}", write_export(&session, out_dir)?.display());
    Ok(())
}
