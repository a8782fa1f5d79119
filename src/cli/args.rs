//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// pkgassets - resolve package assets from a restored dependency graph
///
/// Selects the compile, runtime, native, resource, and analyzer assets a
/// build needs and keeps them in a fingerprinted binary cache next to the
/// graph.
#[derive(Parser, Debug)]
#[command(name = "pkgassets")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PKGASSETS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the assets of a project from its dependency graph
    Resolve(ResolveArgs),

    /// Show the header and group sizes of a cache file
    Inspect(InspectArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Dependency graph document (JSON)
    pub graph: PathBuf,

    /// Project file the graph was restored for
    #[arg(short, long)]
    pub project: String,

    /// Target framework, e.g. net8.0
    #[arg(short = 'f', long)]
    pub framework: String,

    /// Runtime identifier, e.g. linux-x64
    #[arg(short, long)]
    pub rid: Option<String>,

    /// Project language (default: from config)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Cache file (default: next to the graph)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Resolve in memory without reading or writing the cache file
    #[arg(long)]
    pub no_cache: bool,

    /// Report a runtime identifier no package recognizes
    #[arg(long)]
    pub ensure_runtime_package_dependencies: bool,

    /// Skip framework assembly references
    #[arg(long)]
    pub disable_framework_assemblies: bool,

    /// Skip project references reached only through other references
    #[arg(long)]
    pub disable_transitive_project_references: bool,

    /// Tolerate a missing target, producing empty results
    #[arg(long)]
    pub design_time: bool,

    /// Keep satellite assemblies only for this culture (repeatable)
    #[arg(long = "satellite-language", value_name = "CULTURE")]
    pub satellite_languages: Vec<String>,

    /// Copy runtime-target assets to the output directory
    #[arg(long)]
    pub copy_local_runtime_targets: bool,

    /// Never copy this package's assets to the output directory (repeatable)
    #[arg(long = "no-copy-local", value_name = "PACKAGE")]
    pub no_copy_local: Vec<String>,

    /// Leave this package reference out of publish (repeatable)
    #[arg(long, value_name = "PACKAGE")]
    pub exclude_from_publish: Vec<String>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Cache file to inspect
    pub cache: PathBuf,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
