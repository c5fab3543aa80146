//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::sync::DeletionPolicy;

pub mod commands;

/// mkdocs2notion - publish a Markdown / MkDocs tree to Notion
#[derive(Parser, Debug)]
#[command(name = "mkdocs2notion", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON (for scripting)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish the docs tree under a Notion page
    Push(PushArgs),

    /// Show what a push would create, update, or remove, without calling Notion
    DryRun(DryRunArgs),

    /// Check structure and Markdown, reporting every warning
    Validate(SourceArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Where the docs come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Docs directory, MkDocs project root, or mkdocs.yml
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Explicit mkdocs.yml (overrides discovery)
    #[arg(long)]
    pub mkdocs: Option<PathBuf>,

    /// Treat any warning as a failure
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Parent page id or URL (default: NOTION_PARENT_PAGE_ID)
    #[arg(long)]
    pub parent: Option<String>,

    /// Ignore the identity map and publish every document as a new page
    #[arg(long)]
    pub fresh: bool,

    /// What to do with pages whose source file was removed
    #[arg(long, value_enum, default_value_t)]
    pub on_delete: DeletionPolicy,

    /// Write warnings to a timestamped log file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DryRunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Plan as if the identity map were empty
    #[arg(long)]
    pub fresh: bool,

    /// Deletion policy to plan with
    #[arg(long, value_enum, default_value_t)]
    pub on_delete: DeletionPolicy,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_flags() {
        let cli = Cli::parse_from([
            "mkdocs2notion",
            "push",
            "site",
            "--parent",
            "abc",
            "--on-delete",
            "mark",
            "--strict",
            "-vv",
        ]);
        let Commands::Push(args) = cli.command else {
            panic!("expected push");
        };
        assert_eq!(args.source.path, PathBuf::from("site"));
        assert_eq!(args.parent.as_deref(), Some("abc"));
        assert_eq!(args.on_delete, DeletionPolicy::Mark);
        assert!(args.source.strict);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["mkdocs2notion", "dry-run"]);
        let Commands::DryRun(args) = cli.command else {
            panic!("expected dry-run");
        };
        assert_eq!(args.source.path, PathBuf::from("."));
        assert_eq!(args.on_delete, DeletionPolicy::Archive);
        assert!(!args.fresh);
    }
}
