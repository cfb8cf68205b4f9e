//! Baron Builder CLI
//!
//! Command-line interface for managing Pathfinder: Kingmaker saves.

use std::path::PathBuf;
use std::process::ExitCode;

use baron_builder::container::Codec;
use baron_builder::storage::LocationKind;
use baron_builder::{Config, Engine, Operation, Outcome, RestoreSource};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// Baron Builder CLI
#[derive(Parser, Debug)]
#[command(name = "baron-builder")]
#[command(about = "Edit, back up and archive Pathfinder: Kingmaker saves")]
#[command(version)]
struct Args {
    /// Live save directory (defaults to the game's save folder)
    #[arg(short, long)]
    save_dir: Option<PathBuf>,

    /// Live manifest (defaults to manifest.json next to the save directory)
    #[arg(long)]
    live_manifest: Option<PathBuf>,

    /// Codec for new archives
    #[arg(long, default_value = "bzip2")]
    archive_codec: Codec,

    /// Compression level for new archives
    #[arg(long, default_value = "9")]
    archive_level: i64,

    /// Codec used when a save is rebuilt from an archive
    #[arg(long, default_value = "deflated")]
    restore_codec: Codec,

    /// Skip the .bak copy of the live manifest on startup
    #[arg(long)]
    no_manifest_backup: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List save files in one location
    List {
        #[arg(short, long, value_enum, default_value = "live")]
        location: Location,
    },

    /// Extract a live save into the working area
    Unpack {
        /// Save name, with or without extension
        filename: String,
    },

    /// Pack the working area back into the live save
    Repack {
        filename: String,

        /// Remove the working directory afterwards
        #[arg(long)]
        clean: bool,
    },

    /// Copy a live save into the backup store
    Backup { filename: String },

    /// Move a live save into the archive store
    Archive { filename: String },

    /// Bring a save back into the live directory
    Restore {
        filename: String,

        #[arg(long, value_enum, default_value = "backup")]
        from: Source,
    },

    /// Check every location against its manifest
    Verify,

    /// Show unfinished transfers, optionally clearing them
    Journal {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Location {
    Live,
    Backup,
    Archive,
}

impl From<Location> for LocationKind {
    fn from(location: Location) -> Self {
        match location {
            Location::Live => LocationKind::Live,
            Location::Backup => LocationKind::Backup,
            Location::Archive => LocationKind::Archive,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Source {
    Backup,
    Archive,
}

impl From<Source> for RestoreSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Backup => RestoreSource::Backup,
            Source::Archive => RestoreSource::Archive,
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,baron_builder=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_consistency_warning() {
                tracing::warn!("run `baron-builder verify` to see which location is out of step");
            }
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> baron_builder::Result<()> {
    let save_dir = match args.save_dir {
        Some(dir) => dir,
        None => baron_builder::paths::default_save_dir()?,
    };
    tracing::info!("Baron Builder v{}", baron_builder::VERSION);
    tracing::info!("Save directory: {}", save_dir.display());

    let mut builder = Config::builder()
        .live_dir(save_dir)
        .archive_codec(args.archive_codec, Some(args.archive_level))
        .restore_codec(args.restore_codec)
        .backup_live_manifest(!args.no_manifest_backup);
    if let Some(manifest) = args.live_manifest {
        builder = builder.live_manifest(manifest);
    }
    let mut engine = Engine::open(builder.build())?;

    let operation = match args.command {
        Commands::List { location } => {
            for save in engine.list(location.into())? {
                println!("{}", save.name);
            }
            return Ok(());
        }
        Commands::Verify => {
            let report = engine.verify_all()?;
            for (kind, location) in &report.locations {
                let status = if location.is_ok() { "ok" } else { "INCONSISTENT" };
                println!("{:<8} {}", kind.as_str(), status);
                for name in &location.missing_files {
                    println!("  missing file:   {}", name);
                }
                for name in &location.untracked_files {
                    println!("  untracked file: {}", name);
                }
                for name in &location.ambiguous_entries {
                    println!("  duplicate entry: {}", name);
                }
            }
            for pending in &report.pending {
                println!(
                    "unfinished {} of {} (transfer #{}) stopped after {}",
                    pending.kind, pending.filename, pending.transfer_id, pending.reached
                );
            }
            return Ok(());
        }
        Commands::Journal { clear } => {
            let pending = engine.pending_transfers();
            if pending.is_empty() {
                println!("no unfinished transfers");
            }
            for transfer in pending {
                println!(
                    "#{} {} {} reached {} (lsn {})",
                    transfer.transfer_id,
                    transfer.kind,
                    transfer.filename,
                    transfer.reached,
                    transfer.last_lsn
                );
            }
            if clear {
                engine.clear_journal()?;
                println!("journal cleared");
            }
            return Ok(());
        }
        Commands::Unpack { filename } => Operation::Unpack { filename },
        Commands::Repack { filename, clean } => {
            let outcome = engine.execute(Operation::Repack {
                filename: filename.clone(),
            })?;
            print_outcome(&outcome);
            if clean && engine.discard_working_dir(&filename)? {
                println!("working directory removed");
            }
            return Ok(());
        }
        Commands::Backup { filename } => Operation::Backup { filename },
        Commands::Archive { filename } => Operation::Archive { filename },
        Commands::Restore { filename, from } => Operation::Restore {
            filename,
            from: from.into(),
        },
    };

    let outcome = engine.execute(operation)?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Unpacked {
            working_dir,
            members,
        } => {
            println!("unpacked {} members into {}", members.len(), working_dir.display());
            for member in members {
                println!("  {}", member);
            }
        }
        Outcome::Repacked { path } => println!("repacked {}", path.display()),
        Outcome::Transferred(report) => {
            println!(
                "{} #{}: {} -> {}",
                report.kind,
                report.transfer_id,
                report.source.display(),
                report.destination.display()
            );
            for entry in &report.entries {
                println!("  {} v{}", entry.filename, entry.version);
            }
        }
    }
}
