mod commands;
mod util;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Program to catalog mods and deploy a selection of them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the folders mods are loaded from
    Source {
        #[command(subcommand)]
        action: SourceCommand,
    },
    /// Scans the source folders and reports new and broken mods
    Scan,
    /// Lists cataloged mods
    List {
        /// Only show mods matching the given tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Match mods carrying any of the tags instead of all of them
        #[arg(short, long)]
        any: bool,

        /// Only show mods in the given category
        #[arg(short, long)]
        category: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        details: bool,
    },
    /// View tags and the mods carrying them
    Tags {
        /// Only show given tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Only show tags containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// Show index statistics
        #[arg(long)]
        stats: bool,
    },
    /// View categories
    Categories {
        /// Show categories as a tree split on '/'
        #[arg(long)]
        tree: bool,

        /// Only show categories containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Edit mod information and tags
    Edit {
        /// Edit interactively. Cannot be used with other options.
        #[arg(short, long)]
        interactive: bool,

        /// Mod ID or name to edit
        #[arg(short, long)]
        mod_id: Option<String>,

        /// Mod name to set
        #[arg(short, long)]
        name: Option<String>,

        /// Source URL to set
        #[arg(short, long)]
        source_url: Option<String>,

        /// Tags to set
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Category to set
        #[arg(short, long)]
        category: Option<String>,

        /// Description to set
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Renames a mod's folder, keeping its ID
    Rename {
        /// Mod ID or name
        mod_id: String,

        /// New folder name
        folder: String,
    },
    /// Adds mods to the selection
    Select {
        /// Mod IDs or names
        mods: Vec<String>,

        /// Select every cataloged mod
        #[arg(short, long)]
        all: bool,
    },
    /// Removes mods from the selection
    Deselect {
        /// Mod IDs or names
        mods: Vec<String>,

        /// Clear the selection
        #[arg(short, long)]
        all: bool,
    },
    /// Shows or sets the deployment target
    Target {
        /// Deploy by linking mods into this directory
        #[arg(long)]
        symlink: Option<PathBuf>,

        /// Deploy by renaming mods inside this source folder
        #[arg(long)]
        traditional: Option<PathBuf>,

        /// Keep mod names equal to their folder names
        #[arg(long)]
        pin_names: Option<bool>,
    },
    /// Applies the selection to the deployment target
    Deploy {
        /// Only show what would change
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Deploy the mods of a preset instead of the current selection
        #[arg(short, long)]
        preset: Option<String>,
    },
    /// Shows which mods are deployed
    Status,
    /// Lists conflicts between deployed mods
    Conflicts,
    /// Manage saved selections
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// Adds a source folder
    Add { path: PathBuf },
    /// Removes a source folder. Mod folders are not touched.
    Remove { path: PathBuf },
    /// Lists source folders
    List,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// Saves the current selection as a preset
    Save {
        /// Preset ID, also used as its file name
        id: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Presets whose mods are included as well
        #[arg(short, long, value_delimiter = ',')]
        inherits: Option<Vec<String>>,
    },
    /// Lists presets
    List,
    /// Shows a preset and the mods it resolves to
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("Starting modshelf version {}", env!("CARGO_PKG_VERSION"));
    let args = Args::parse();
    match args.command {
        Command::Source { action } => commands::source(action).await,
        Command::Scan => commands::scan().await,
        Command::List {
            tags,
            any,
            category,
            details,
        } => {
            if any && tags.is_none() {
                eprintln!("--any requires --tags.");
                std::process::exit(1);
            }
            commands::list(tags, any, category, details).await
        }
        Command::Tags {
            tags,
            search,
            stats,
        } => {
            if search.is_some() && tags.is_some() {
                eprintln!("Search and show tag options are mutually exclusive.");
                std::process::exit(1);
            }
            commands::tags(tags, search, stats).await
        }
        Command::Categories { tree, search } => {
            if tree && search.is_some() {
                eprintln!("Tree and search options are mutually exclusive.");
                std::process::exit(1);
            }
            commands::categories(tree, search).await
        }
        Command::Edit {
            interactive,
            mod_id,
            name,
            source_url,
            tags,
            category,
            description,
        } => {
            if !interactive {
                if mod_id.is_none() {
                    eprintln!("Mod ID required to edit non-interactively");
                    std::process::exit(1);
                } else if name.is_none()
                    && source_url.is_none()
                    && tags.is_none()
                    && category.is_none()
                    && description.is_none()
                {
                    eprintln!("At least one field to edit must be provided");
                    std::process::exit(1);
                }
            }
            commands::edit(
                interactive,
                mod_id,
                commands::EditFields {
                    name,
                    source_url,
                    tags,
                    category,
                    description,
                },
            )
            .await
        }
        Command::Rename { mod_id, folder } => commands::rename(mod_id, folder).await,
        Command::Select { mods, all } => {
            if all && !mods.is_empty() {
                eprintln!("--all cannot be combined with mod IDs.");
                std::process::exit(1);
            }
            commands::select(mods, all).await
        }
        Command::Deselect { mods, all } => {
            if all && !mods.is_empty() {
                eprintln!("--all cannot be combined with mod IDs.");
                std::process::exit(1);
            }
            commands::deselect(mods, all).await
        }
        Command::Target {
            symlink,
            traditional,
            pin_names,
        } => {
            if symlink.is_some() && traditional.is_some() {
                eprintln!("Symlink and traditional targets are mutually exclusive.");
                std::process::exit(1);
            }
            commands::target(symlink, traditional, pin_names).await
        }
        Command::Deploy { dry_run, preset } => commands::deploy(dry_run, preset).await,
        Command::Status => commands::status().await,
        Command::Conflicts => commands::conflicts().await,
        Command::Preset { action } => commands::preset(action).await,
    }
}
