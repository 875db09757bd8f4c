//! `atlas`: print or export an outline from a structure JSON file.

use anyhow::{Context, Result, bail};
use atlas_core::{LevelFilter, StructureTree, filter_by_level, hydrate, parse_raw_tree};
use atlas_editor::EditorConfig;
use atlas_render::{RenderNode, assign_colors, project};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(about = "Outline and mind-map tools for WBS structures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Editor config file (JSON). Missing keys use defaults.
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the outline as an indented list
    Outline {
        /// Structure payload or raw outline JSON
        file: PathBuf,

        /// Only show elements at this level (and their ancestors)
        #[arg(long)]
        level: Option<u32>,

        /// Prefix labels with their WBS code
        #[arg(long)]
        show_wbs: bool,
    },

    /// Write a standalone HTML mind map
    Export {
        /// Structure payload or raw outline JSON
        file: PathBuf,

        /// Output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page title (defaults to the root label)
        #[arg(long)]
        title: Option<String>,

        /// Prefix labels with their WBS code
        #[arg(long)]
        show_wbs: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            EditorConfig::from_json(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Outline {
            file,
            level,
            show_wbs,
        } => {
            let tree = load_tree(&file)?;
            print!("{}", outline(&tree, level, show_wbs, &config)?);
        }
        Command::Export {
            file,
            output,
            title,
            show_wbs,
        } => {
            let tree = load_tree(&file)?;
            let mut export = config.export.clone();
            export.show_wbs |= show_wbs;
            if let Some(title) = title {
                export.title = title;
            }
            let html = atlas_core::export_html(&tree, &export)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    log::info!("wrote {}", path.display());
                }
                None => print!("{html}"),
            }
        }
    }
    Ok(())
}

/// Read a structure payload (has `elements`) or a raw single-root outline.
fn load_tree(path: &Path) -> Result<StructureTree> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let tree = if value.get("elements").is_some() {
        let payload = serde_json::from_value(value)
            .with_context(|| format!("{} is not a structure payload", path.display()))?;
        hydrate(&payload)?
    } else {
        parse_raw_tree(&text)?
    };
    log::debug!("loaded {} elements from {}", tree.len(), path.display());
    Ok(tree)
}

fn outline(
    tree: &StructureTree,
    level: Option<u32>,
    show_wbs: bool,
    config: &EditorConfig,
) -> Result<String> {
    let colored = assign_colors(tree, &config.palette());
    let source = match level {
        None => colored,
        Some(level) => match filter_by_level(&colored, level) {
            LevelFilter::Matches(filtered) => filtered,
            LevelFilter::NoResults => bail!("no elements at level {level}"),
            LevelFilter::NoData => bail!("the outline is empty"),
        },
    };
    let Some(root) = project(&source, show_wbs, &config.projection) else {
        bail!("the outline is empty");
    };
    let mut out = String::new();
    write_node(&mut out, &root, 0);
    Ok(out)
}

fn write_node(out: &mut String, node: &RenderNode, depth: usize) {
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.content);
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}
