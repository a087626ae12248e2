//! # savevault CLI - Snapshots for your save files
//!
//! Command-line front end for the savevault library.
//!
//! ## Features
//! - Group save locations into named profiles
//! - Snapshot a profile into a single timestamped zip archive
//! - Restore any archive, with an automatic safeguard snapshot first
//! - List, rename, remove and inspect archives
//!
//! ## Usage
//! ```bash
//! # Create a profile and track its save directory
//! savevault create elden-ring
//! savevault track elden-ring ~/.steam/steam/steamapps/compatdata/1245620/pfx/.../EldenRing
//!
//! # Take a snapshot
//! savevault backup elden-ring
//!
//! # List snapshots, newest first
//! savevault archives elden-ring --detailed
//!
//! # Go back
//! savevault restore elden-ring elden-ring_20240101_120000_<md5>.zip
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use savevault::{CompressionLevel, Result, Vault, VaultBuilder, VaultError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// savevault CLI - Snapshot and restore named save profiles
#[derive(Parser)]
#[command(name = "savevault")]
#[command(version)]
#[command(about = "Snapshot and restore named save profiles")]
#[command(long_about = None)]
struct Cli {
    /// Vault root directory (defaults to ~/game_saves)
    #[arg(short, long, global = true, env = "SAVEVAULT_ROOT")]
    root: Option<PathBuf>,

    /// Compression level for new archives (persisted in the vault)
    #[arg(long, global = true, value_enum)]
    compression: Option<CompressionMode>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the vault root directory
    Root,

    /// List profiles
    #[command(alias = "ls")]
    Profiles,

    /// Create a profile
    Create {
        /// Profile name
        profile: String,
    },

    /// Delete a profile and all of its archives
    Delete {
        /// Profile name
        profile: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Track files or directories in a profile
    Track {
        /// Profile name
        profile: String,

        /// Paths to track
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Stop tracking a path
    Untrack {
        /// Profile name
        profile: String,

        /// Tracked path
        path: PathBuf,
    },

    /// Show tracked paths of a profile
    Tracked {
        /// Profile name
        profile: String,
    },

    /// Snapshot a profile
    #[command(alias = "bk")]
    Backup {
        /// Profile name
        profile: String,
    },

    /// List archives of a profile, newest first
    Archives {
        /// Profile name
        profile: String,

        /// Show detailed info
        #[arg(short, long)]
        detailed: bool,

        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Restore an archive
    #[command(alias = "rs")]
    Restore {
        /// Profile name
        profile: String,

        /// Archive file name
        archive: String,
    },

    /// Rename an archive
    Rename {
        /// Profile name
        profile: String,

        /// Current archive name
        old: String,

        /// New archive name (.zip appended if missing)
        new: String,
    },

    /// Delete an archive
    #[command(alias = "rm")]
    Remove {
        /// Profile name
        profile: String,

        /// Archive file name
        archive: String,
    },

    /// Show the manifest of an archive
    Inspect {
        /// Profile name
        profile: String,

        /// Archive file name
        archive: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompressionMode {
    Fast,
    Balanced,
    Best,
}

impl From<CompressionMode> for CompressionLevel {
    fn from(mode: CompressionMode) -> Self {
        match mode {
            CompressionMode::Fast => CompressionLevel::Fast,
            CompressionMode::Balanced => CompressionLevel::Balanced,
            CompressionMode::Best => CompressionLevel::Best,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    // Run command
    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => default_root()?,
    };
    let mut builder = VaultBuilder::new();
    if let Some(mode) = cli.compression {
        builder = builder.compression_level(mode.into());
    }
    let vault = builder.build(root)?;

    match cli.command {
        Commands::Root => {
            println!("{}", vault.root().display());
            Ok(())
        }
        Commands::Profiles => cmd_profiles(&vault),
        Commands::Create { profile } => cmd_create(&vault, &profile),
        Commands::Delete { profile, yes } => cmd_delete(&vault, &profile, yes),
        Commands::Track { profile, paths } => cmd_track(&vault, &profile, paths),
        Commands::Untrack { profile, path } => cmd_untrack(&vault, &profile, &path),
        Commands::Tracked { profile } => cmd_tracked(&vault, &profile),
        Commands::Backup { profile } => cmd_backup(&vault, &profile),
        Commands::Archives { profile, detailed, limit } => cmd_archives(&vault, &profile, detailed, limit),
        Commands::Restore { profile, archive } => cmd_restore(&vault, &profile, &archive),
        Commands::Rename { profile, old, new } => cmd_rename(&vault, &profile, &old, &new),
        Commands::Remove { profile, archive } => cmd_remove(&vault, &profile, &archive),
        Commands::Inspect { profile, archive } => cmd_inspect(&vault, &profile, &archive),
    }
}

/// List all profiles with their archive counts
fn cmd_profiles(vault: &Vault) -> Result<()> {
    let profiles = vault.list_profiles()?;
    if profiles.is_empty() {
        println!("{}", "No profiles found.".yellow());
        println!("  Create one with: {}", "savevault create <profile>".yellow());
        return Ok(());
    }

    println!("{}", "Profiles:".blue().bold());
    for profile in &profiles {
        let archives = vault.list_archives(profile)?.len();
        let tracked = vault.tracked_paths(profile)?.len();
        println!(
            "  {} {}",
            profile.cyan().bold(),
            format!("({} tracked, {} archives)", tracked, archives).dimmed()
        );
    }
    Ok(())
}

fn cmd_create(vault: &Vault, profile: &str) -> Result<()> {
    let dir = vault.create_profile(profile)?;
    println!("{} Created profile {}", "✓".green().bold(), profile.cyan().bold());
    println!("  Directory: {}", dir.display().to_string().cyan());
    println!("\nNext steps:");
    println!("  - Track save files: {}", format!("savevault track {} <paths...>", profile).yellow());
    println!("  - Take a snapshot: {}", format!("savevault backup {}", profile).yellow());
    Ok(())
}

/// Delete a profile
///
/// Without `--yes` this asks for confirmation on stdin, since every archive of
/// the profile is deleted with it.
fn cmd_delete(vault: &Vault, profile: &str, yes: bool) -> Result<()> {
    let archives = vault.list_archives(profile)?.len();
    if !yes {
        println!(
            "{} This deletes profile {} and {} archive(s).",
            "Warning:".yellow().bold(),
            profile.cyan().bold(),
            archives
        );
        print!("Continue? [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    vault.remove_profile(profile)?;
    println!("{} Deleted profile {}", "✓".green().bold(), profile.cyan().bold());
    Ok(())
}

/// Track paths
///
/// Relative paths are resolved against the current directory before being
/// stored, since tracked paths are always absolute.
fn cmd_track(vault: &Vault, profile: &str, paths: Vec<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let paths: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| if p.is_absolute() { p } else { cwd.join(p) })
        .collect();

    for path in &paths {
        if !path.exists() {
            println!("{} {} does not exist yet", "Note:".yellow().bold(), path.display());
        }
    }

    let tracked = vault.add_tracked_paths(profile, &paths)?;
    println!(
        "{} Profile {} now tracks {} path(s)",
        "✓".green().bold(),
        profile.cyan().bold(),
        tracked.len().to_string().cyan()
    );
    Ok(())
}

fn cmd_untrack(vault: &Vault, profile: &str, path: &Path) -> Result<()> {
    let tracked = vault.remove_tracked_path(profile, path)?;
    println!(
        "{} Stopped tracking {} ({} path(s) left)",
        "✓".green().bold(),
        path.display().to_string().cyan(),
        tracked.len()
    );
    Ok(())
}

fn cmd_tracked(vault: &Vault, profile: &str) -> Result<()> {
    let tracked = vault.tracked_paths(profile)?;
    if tracked.is_empty() {
        println!("{}", "No tracked paths.".yellow());
        return Ok(());
    }

    println!("{}", format!("Tracked by {}:", profile).blue().bold());
    for path in &tracked {
        let marker = if path.is_dir() {
            "dir ".dimmed()
        } else if path.exists() {
            "file".dimmed()
        } else {
            "gone".red()
        };
        println!("  {} {}", marker, path.display());
    }
    Ok(())
}

/// Snapshot a profile
fn cmd_backup(vault: &Vault, profile: &str) -> Result<()> {
    let start = Instant::now();
    let pb = spinner("Packing files...");
    let snapshot = vault.backup(profile);
    pb.finish_and_clear();
    let snapshot = snapshot?;

    println!("{} Created archive {}", "✓".green().bold(), snapshot.name.yellow().bold());
    println!("  Files: {}", snapshot.member_count.to_string().cyan());
    println!("  Size: {} ({} packed)", format_bytes(snapshot.total_size).cyan(), format_bytes(snapshot.archive_size).cyan());
    println!("  Digest: {}", snapshot.digest.dimmed());
    println!("  Time: {}", format_duration(round_ms(start.elapsed())).to_string().cyan());
    Ok(())
}

/// List archives, newest first
fn cmd_archives(vault: &Vault, profile: &str, detailed: bool, limit: Option<usize>) -> Result<()> {
    let archives = vault.list_archives(profile)?;
    if archives.is_empty() {
        println!("{}", "No archives found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Archives of {}:", profile).blue().bold());
    println!();

    let display_count = limit.unwrap_or(archives.len()).min(archives.len());
    for archive in archives.iter().take(display_count) {
        let marker = if archive.is_auto { "auto".magenta() } else { "    ".normal() };
        print!("{} {} ", marker, archive.name.yellow());
        println!("{}", archive.modified.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string().dimmed());

        if detailed {
            println!("     Size: {}", format_bytes(archive.size).dimmed());
            match vault.inspect_archive(profile, &archive.name) {
                Ok(manifest) => {
                    println!(
                        "     Files: {} | Content: {}",
                        manifest.members.len().to_string().dimmed(),
                        format_bytes(manifest.total_size()).dimmed()
                    );
                    if !manifest.digest.is_empty() {
                        println!("     Digest: {}", manifest.digest.dimmed());
                    }
                }
                Err(e) => println!("     {}", format!("Unreadable: {}", e).red()),
            }
            println!();
        }
    }

    if display_count < archives.len() {
        println!("\n{}", format!("Showing {} of {} archives", display_count, archives.len()).dimmed());
    }
    Ok(())
}

/// Restore an archive
///
/// The library takes a safeguard snapshot first; its name is printed so the
/// user can go back.
fn cmd_restore(vault: &Vault, profile: &str, archive: &str) -> Result<()> {
    println!("{} {}", "Restoring".blue().bold(), archive.yellow());

    let pb = spinner("Restoring files...");
    let result = vault.restore(profile, archive);
    pb.finish_and_clear();
    let result = result?;

    println!("{} Restoration complete", "✓".green().bold());
    if let Some(safeguard) = &result.safeguard {
        println!("  Safeguard: {}", safeguard.magenta());
    }
    println!("  Files restored: {}", result.files_restored.to_string().cyan());
    println!("  Files deleted: {}", result.files_deleted.to_string().yellow());
    println!("  Bytes written: {}", format_bytes(result.bytes_written).cyan());
    println!("  Time: {}", format_duration(Duration::from_millis(result.duration_ms)).to_string().cyan());

    if !result.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for warning in &result.warnings {
            println!("  - {}", warning.yellow());
        }
    }
    Ok(())
}

fn cmd_rename(vault: &Vault, profile: &str, old: &str, new: &str) -> Result<()> {
    let renamed = vault.rename_archive(profile, old, new)?;
    println!("{} Renamed {} to {}", "✓".green().bold(), old.dimmed(), renamed.yellow().bold());
    Ok(())
}

fn cmd_remove(vault: &Vault, profile: &str, archive: &str) -> Result<()> {
    vault.remove_archive(profile, archive)?;
    println!("{} Removed archive {}", "✓".green().bold(), archive.yellow());
    Ok(())
}

/// Show archive manifest
fn cmd_inspect(vault: &Vault, profile: &str, archive: &str) -> Result<()> {
    let manifest = vault.inspect_archive(profile, archive)?;

    println!("{}", "Archive Information".blue().bold());
    println!("{}", "═".repeat(50).blue());
    println!("Name: {}", archive.yellow().bold());
    println!("Profile: {}", manifest.profile.cyan());
    println!("Created: {}", manifest.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string().cyan());
    println!("Safeguard: {}", if manifest.auto { "yes".magenta() } else { "no".normal() });
    if manifest.digest.is_empty() {
        println!("Digest: {}", "unknown".dimmed());
    } else {
        println!("Digest: {}", manifest.digest.cyan());
    }
    if manifest.format_version == savevault::restore::LEGACY_FORMAT_VERSION {
        println!("Format: {}", "legacy (entry comments)".yellow());
    }

    println!("\n{}", format!("Files ({}, {}):", manifest.members.len(), format_bytes(manifest.total_size())).bold());
    for member in &manifest.members {
        println!(
            "  {} {} {}",
            member.archive_path.cyan(),
            "→".dimmed(),
            if member.source_path.is_empty() {
                "<missing target>".red()
            } else {
                member.source_path.normal()
            }
        );
    }
    Ok(())
}

// Helper functions

/// `~/game_saves`
fn default_root() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("game_saves"))
        .ok_or_else(|| VaultError::InvalidConfiguration("cannot determine home directory, pass --root".to_string()))
}

fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn round_ms(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

/// Format bytes in human-readable form
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
