//! Command-line arguments.

use apkshelf_config::{Config, TieBreak};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Organize a directory of APK archives.
///
/// Renames every archive after its application and version, marks superseded
/// versions `.old` and colliding copies `.dupe`, and extracts launcher icons.
#[derive(Parser, Debug)]
#[command(name = "apkshelf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "APKSHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Library directory (defaults to the configured one)
    #[arg(short, long, global = true)]
    pub library: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// Log what would change without touching any file
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rename archives after their application and version
    Organize(OrganizeArgs),

    /// Extract launcher icons
    Icons(IconsArgs),
}

#[derive(Args, Debug)]
pub struct OrganizeArgs {
    /// Delete duplicates instead of renaming them to `.dupe`
    #[arg(long)]
    pub delete_duplicates: bool,

    /// Delete superseded versions instead of renaming them to `.old`
    #[arg(long)]
    pub delete_old_versions: bool,

    /// Which of several archives sharing the newest version keeps the name
    #[arg(long, value_name = "first-seen|path")]
    pub tie_break: Option<TieBreak>,
}

#[derive(Args, Debug)]
pub struct IconsArgs {
    /// Highest icon density (dpi) to extract
    #[arg(long, value_name = "DPI")]
    pub max_resolution: Option<u16>,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration. Flags can only
    /// switch behaviour on; leaving one out keeps the configured value.
    pub fn apply(&self, config: &mut Config) {
        if let Some(library) = &self.library {
            config.library = library.clone();
        }
        config.recursive |= self.recursive;
        match &self.command {
            Command::Organize(args) => {
                config.delete_duplicates |= args.delete_duplicates;
                config.delete_old_versions |= args.delete_old_versions;
                if let Some(tie_break) = args.tie_break {
                    config.tie_break = tie_break;
                }
            },
            Command::Icons(args) => {
                if let Some(max_resolution) = args.max_resolution {
                    config.icons.max_resolution = max_resolution;
                }
            },
        }
    }
}
