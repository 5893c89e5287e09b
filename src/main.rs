use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use specweave_archive::config::ArchiveConfig;
use specweave_archive::guard::GitWorkingTree;
use specweave_archive::models::{ArchiveOptions, EpicId, FeatureArchiveOptions, FeatureId};
use specweave_archive::{
    FeatureArchiverPort, FeatureEpicLifecycleManager, IdentifierRegistry,
    IncrementLifecycleManager, IncrementNumberCache, Layout, LinkRewriter,
};

#[derive(Parser)]
#[command(name = "sw-archive")]
#[command(about = "Archive and restore SpecWeave increments, features and epics")]
struct Cli {
    /// Repository root (defaults to $SPECWEAVE_ROOT, then the current directory)
    #[arg(long, global = true, env = "SPECWEAVE_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive active increments
    Archive(ArchiveArgs),
    /// Restore an archived increment and its feature
    Restore {
        /// Increment name or number
        increment: String,
    },
    /// List archived increments
    List,
    /// Increment and living-docs counts
    Stats,
    /// Report increment numbers held by more than one directory
    Duplicates,
    /// Feature cascade operations
    Features {
        #[command(subcommand)]
        command: FeatureCommands,
    },
    /// Epic operations
    Epics {
        #[command(subcommand)]
        command: EpicCommands,
    },
    /// Remove archived copies of features and epics that are also active
    Cleanup,
    /// Clean duplicates, then re-run the feature cascade
    Reconcile(CascadeArgs),
    /// Next free increment number
    NextNumber,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Archive features and epics whose increments are all archived
    Archive(CascadeArgs),
    /// Restore an archived feature
    Restore { id: String },
}

#[derive(Subcommand)]
enum EpicCommands {
    /// Restore an archived epic
    Restore { id: String },
}

#[derive(Args)]
struct ArchiveArgs {
    /// Keep the last N increments out of candidacy
    #[arg(long)]
    keep_last: Option<usize>,

    /// Only increments inactive for more than N days
    #[arg(long)]
    older_than: Option<u32>,

    /// Archive completed increments without the uncommitted-work check
    #[arg(long)]
    completed: bool,

    /// Allow archiving active and paused increments
    #[arg(long)]
    include_active: bool,

    /// Case-insensitive regex over increment names
    #[arg(long)]
    pattern: Option<String>,

    /// Refuse increments with uncommitted git changes
    #[arg(long)]
    check_git: bool,

    /// Explicit increments (names or numbers); overrides every other filter
    increments: Vec<String>,

    #[command(flatten)]
    cascade: CascadeArgs,
}

#[derive(Args)]
struct CascadeArgs {
    /// Report decisions without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Leave markdown links untouched
    #[arg(long)]
    no_links: bool,

    /// Archive features no increment links to
    #[arg(long)]
    orphaned_features: bool,

    /// Archive epics no feature links to
    #[arg(long)]
    orphaned_epics: bool,

    /// Ignore open user stories once every linked increment is archived
    #[arg(long)]
    force: bool,

    /// Reason recorded in the archive metadata
    #[arg(long)]
    reason: Option<String>,
}

impl CascadeArgs {
    fn apply(&self, mut options: FeatureArchiveOptions) -> FeatureArchiveOptions {
        options.dry_run = self.dry_run;
        options.update_links = !self.no_links;
        options.archive_orphaned_features |= self.orphaned_features;
        options.archive_orphaned_epics |= self.orphaned_epics;
        options.force_archive_when_all_increments_archived |= self.force;
        if self.reason.is_some() {
            options.custom_reason = self.reason.clone();
        }
        options
    }
}

impl ArchiveArgs {
    fn apply(&self, mut options: ArchiveOptions) -> ArchiveOptions {
        if self.keep_last.is_some() {
            options.keep_last = self.keep_last;
        }
        options.older_than_days = self.older_than;
        options.archive_completed |= self.completed;
        if self.include_active {
            options.preserve_active = false;
        }
        options.pattern = self.pattern.clone();
        options.increments = self.increments.clone();
        options.dry_run = self.cascade.dry_run;
        options
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "specweave_archive=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let layout = Layout::new(root);
    let config = ArchiveConfig::load(&layout);
    let features = FeatureEpicLifecycleManager::new(layout.clone()).with_link_rewriter(
        LinkRewriter::new(layout.root()).with_excludes(config.link_scan_excludes.clone()),
    );
    let cache = IncrementNumberCache::new();

    match cli.command {
        Commands::Archive(args) => {
            let cascade = args.cascade.apply(config.feature_options());
            let mut manager = IncrementLifecycleManager::new(layout.clone(), cache)
                .with_cascade(features, cascade);
            if args.check_git {
                manager = manager.with_guard(GitWorkingTree);
            }
            let result = manager.archive(&args.apply(config.archive_options()))?;
            print_json(&result)?;
        }
        Commands::Restore { increment } => {
            let manager = IncrementLifecycleManager::new(layout.clone(), cache)
                .with_cascade(features, config.feature_options());
            let outcome = manager.restore(&increment)?;
            let feature = match &outcome.feature_sync {
                Ok(sync) => serde_json::to_value(sync)?,
                Err(e) => serde_json::json!({ "action": "failed", "error": e.to_string() }),
            };
            print_json(&serde_json::json!({
                "increment": outcome.increment,
                "feature": feature,
            }))?;
        }
        Commands::List => {
            let manager = IncrementLifecycleManager::new(layout.clone(), cache);
            print_json(&manager.list_archived()?)?;
        }
        Commands::Stats => {
            let manager = IncrementLifecycleManager::new(layout.clone(), cache);
            print_json(&serde_json::json!({
                "increments": manager.get_stats()?,
                "livingDocs": features.get_archive_stats()?,
            }))?;
        }
        Commands::Duplicates => {
            let registry = IdentifierRegistry::new(layout.clone());
            print_json(&registry.detect_all_duplicates()?)?;
        }
        Commands::Features { command } => match command {
            FeatureCommands::Archive(args) => {
                let result = features.archive_features(&args.apply(config.feature_options()))?;
                print_json(&result)?;
            }
            FeatureCommands::Restore { id } => {
                let id = FeatureId::parse(&id)?;
                print_json(&features.restore_feature(&id)?)?;
            }
        },
        Commands::Epics { command } => match command {
            EpicCommands::Restore { id } => {
                let id = EpicId::parse(&id)?;
                print_json(&features.restore_epic(&id)?)?;
            }
        },
        Commands::Cleanup => {
            print_json(&features.cleanup_duplicates()?)?;
        }
        Commands::Reconcile(args) => {
            let report = features.reconcile(&args.apply(config.feature_options()))?;
            print_json(&report)?;
        }
        Commands::NextNumber => {
            let manager = IncrementLifecycleManager::new(layout.clone(), cache);
            print_json(&manager.next_number()?.to_string())?;
        }
    }

    Ok(())
}
