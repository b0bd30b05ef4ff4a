//! Toolcache CLI
//!
//! Entry point for the `toolcache` command-line tool.

use std::fmt::Display;
use std::path::PathBuf;
use std::process;
use std::time::SystemTime;

use chrono::Utc;
use clap::{Parser, Subcommand};
use toolcache::format::{format_bytes, format_file_count};
use toolcache::logging::init_logging;
use toolcache::units::{parse_byte_size, parse_duration};
use toolcache::{
    CacheManager, CliOverrides, Confirm, EnvironmentFlags, Inventory, KindFilter, Prompt,
    PruneOptions, Settings, StatusReport,
};
use toolcache_toolchain::{SystemRunner, ToolchainEnv};

#[derive(Parser)]
#[command(name = "toolcache")]
#[command(about = "Inspect, clean and migrate toolchain build caches", version)]
struct Cli {
    /// Installation root (default: $GOENV_ROOT or ~/.goenv)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show caches for every installed version
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Skip exact file counting
        #[arg(long)]
        fast: bool,
    },

    /// Remove caches
    Clean {
        /// Cache kind: build, mod or all
        #[arg(default_value = "all")]
        kind: String,

        /// Only caches of this version
        #[arg(long)]
        version: Option<String>,

        /// Only legacy unqualified build caches
        #[arg(long)]
        old_format: bool,

        /// Keep the newest caches up to this size (e.g. 1GB)
        #[arg(long, value_name = "SIZE")]
        max_bytes: Option<String>,

        /// Only caches not modified within this duration (e.g. 30d)
        #[arg(long, value_name = "DURATION")]
        older_than: Option<String>,

        /// Show what would be removed
        #[arg(long, short = 'n')]
        dry_run: bool,

        /// Do not ask for confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Rename legacy build caches for the current platform
    Migrate {
        /// Do not ask for confirmation
        #[arg(long, short = 'f')]
        force: bool,

        /// Show what would be renamed
        #[arg(long, short = 'n')]
        dry_run: bool,
    },

    /// Show the native toolchain recorded for build caches
    Info {
        /// Only caches of this version
        version: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the cache name and fingerprint for the current environment
    Fingerprint {
        /// Write build.info into this version's matching cache
        #[arg(long, value_name = "VERSION")]
        record: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let force = matches!(
        cli.command,
        Commands::Clean { force: true, .. } | Commands::Migrate { force: true, .. }
    );
    let overrides = CliOverrides {
        root: cli.root.clone(),
        force,
    };
    let settings = match Settings::resolve(|k| std::env::var(k).ok(), &overrides) {
        Ok(s) => s,
        Err(e) => exit_with("Configuration error", e),
    };
    let manager = CacheManager::new(settings, SystemRunner);

    match cli.command {
        Commands::Status { json, fast } => run_status(&manager, json, fast),
        Commands::Clean {
            kind,
            version,
            old_format,
            max_bytes,
            older_than,
            dry_run,
            force: _,
        } => {
            let options = match build_prune_options(
                &kind,
                version,
                old_format,
                max_bytes.as_deref(),
                older_than.as_deref(),
                dry_run,
            ) {
                Ok(o) => o,
                Err(e) => exit_with("Error", e),
            };
            run_clean(&manager, &options, cli.verbose);
        }
        Commands::Migrate { force: _, dry_run } => run_migrate(&manager, dry_run),
        Commands::Info { version, json } => run_info(&manager, version.as_deref(), json),
        Commands::Fingerprint { record, json } => run_fingerprint(&manager, record.as_deref(), json),
    }
}

fn exit_with(context: &str, err: impl Display) -> ! {
    eprintln!("{}: {}", context, err);
    process::exit(1);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with("Error serializing output", e),
    }
}

fn build_prune_options(
    kind: &str,
    version: Option<String>,
    old_format: bool,
    max_bytes: Option<&str>,
    older_than: Option<&str>,
    dry_run: bool,
) -> Result<PruneOptions, toolcache::CacheError> {
    let mut options = PruneOptions::default().with_kind(kind.parse::<KindFilter>()?);
    if let Some(v) = version {
        options = options.with_version(v);
    }
    if old_format {
        options = options.with_old_format_only();
    }
    if let Some(size) = max_bytes {
        options.max_retained_bytes = parse_byte_size(size)?;
    }
    if let Some(age) = older_than {
        options.max_age = parse_duration(age)?;
    }
    if dry_run {
        options = options.with_dry_run();
    }
    Ok(options)
}

fn run_status(manager: &CacheManager<SystemRunner>, json: bool, fast: bool) {
    let inventory = manager.status(fast);

    if json {
        let flags = EnvironmentFlags::detect(manager.runner());
        print_json(&StatusReport::new(&inventory, manager.host(), flags, Utc::now()));
        return;
    }

    if inventory.is_empty() {
        println!("No caches found under {}", manager.layout().root().display());
        return;
    }

    print_inventory(&inventory);

    let warnings = manager.validate(&inventory, SystemTime::now());
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            println!("  ! {}", warning.message);
        }
    }
}

fn print_inventory(inventory: &Inventory) {
    for summary in inventory.by_version() {
        println!(
            "Go {} ({}, {} files)",
            summary.version,
            format_bytes(summary.size_bytes),
            format_file_count(summary.files)
        );
        for entry in inventory
            .entries
            .iter()
            .filter(|e| e.toolchain_version == summary.version)
        {
            println!(
                "  {:<5} {:<24} {:>10} {:>10} files",
                entry.kind.to_string(),
                entry.label(),
                format_bytes(entry.size_bytes),
                format_file_count(entry.files)
            );
        }
    }
    println!();
    println!(
        "Total: {} caches, {}, {} files",
        inventory.entries.len(),
        format_bytes(inventory.total_bytes),
        format_file_count(inventory.total_files)
    );
}

fn run_clean(manager: &CacheManager<SystemRunner>, options: &PruneOptions, verbose: bool) {
    let plan = match manager.plan_clean(options) {
        Ok(p) => p,
        Err(e) => exit_with("Error", e),
    };

    if plan.is_empty() {
        println!("No caches match the given filters.");
        return;
    }

    for entry in &plan.entries {
        if options.dry_run || verbose {
            println!(
                "  {} {} {} ({})",
                entry.toolchain_version,
                entry.kind,
                entry.label(),
                format_bytes(entry.size_bytes)
            );
        }
    }

    if options.dry_run {
        println!(
            "Would remove {} cache(s), reclaiming {}",
            plan.len(),
            format_bytes(plan.total_bytes)
        );
        return;
    }

    let prompt = Prompt::new(manager.settings().assume_yes);
    let question = format!(
        "Remove {} cache(s) ({})?",
        plan.len(),
        format_bytes(plan.total_bytes)
    );
    match prompt.confirm(&question) {
        Ok(true) => {}
        Ok(false) => {
            println!("Aborted.");
            return;
        }
        Err(e) => exit_with("Error", e),
    }

    let result = manager.execute_clean(&plan, false);
    println!(
        "Removed {} cache(s), reclaimed {}",
        result.caches_removed,
        format_bytes(result.bytes_reclaimed)
    );
    if !result.is_success() {
        eprintln!("Failed: {} cache(s)", result.errors.len());
        for err in &result.errors {
            eprintln!("  {}", err);
        }
        process::exit(1);
    }
}

fn run_migrate(manager: &CacheManager<SystemRunner>, dry_run: bool) {
    let tasks = manager.plan_migration();
    if tasks.is_empty() {
        println!("No old-format caches to migrate.");
        return;
    }

    let host = manager.host();
    for task in &tasks {
        println!("  {} -> {}", task.from.display(), task.to.display());
    }

    if !dry_run {
        let prompt = Prompt::new(manager.settings().assume_yes);
        let question = format!(
            "Migrate {} cache(s) to {}/{}?",
            tasks.len(),
            host.os,
            host.arch
        );
        match prompt.confirm(&question) {
            Ok(true) => {}
            Ok(false) => {
                println!("Aborted.");
                return;
            }
            Err(e) => exit_with("Error", e),
        }
    }

    let result = manager.migrate(dry_run);
    let verb = if dry_run { "Would migrate" } else { "Migrated" };
    println!("{} {} cache(s)", verb, result.caches_migrated);
    for skipped in &result.skipped {
        println!("  Skipped {} (destination exists)", skipped.display());
    }
    if !result.is_success() {
        for err in &result.errors {
            eprintln!("  {}", err);
        }
        process::exit(1);
    }
}

fn run_info(manager: &CacheManager<SystemRunner>, version: Option<&str>, json: bool) {
    let records = match manager.info(version) {
        Ok(r) => r,
        Err(e) => exit_with("Error", e),
    };

    if json {
        print_json(&records);
        return;
    }

    if records.is_empty() {
        println!("No build caches found.");
        return;
    }

    for record in &records {
        println!("Go {} {}", record.version, record.cache_dir);
        match (&record.build_info, &record.error) {
            (_, Some(err)) => println!("  error: {}", err),
            (Some(info), None) if info.uses_native_toolchain() => {
                println!("  CC:       {} {}", info.cc, info.cc_version);
                if !info.cxx.is_empty() {
                    println!("  CXX:      {} {}", info.cxx, info.cxx_version);
                }
                println!("  Hash:     {}", info.short_hash());
                println!("  Created:  {}", info.created.to_rfc3339());
            }
            (Some(_), None) => println!("  native toolchain: disabled"),
            (None, None) => println!("  no build info recorded"),
        }
    }
}

fn run_fingerprint(manager: &CacheManager<SystemRunner>, record: Option<&str>, json: bool) {
    let env = ToolchainEnv::from_process();
    let name = manager.cache_name_for(&env);
    let fingerprint = manager.fingerprint(&env);

    let recorded = match record {
        Some(version) => match manager.record_build_info(version, &env) {
            Ok(dir) => Some(dir),
            Err(e) => exit_with("Error", e),
        },
        None => None,
    };

    if json {
        print_json(&serde_json::json!({
            "cache_dir": name.encode(),
            "fingerprint": fingerprint,
            "recorded": recorded,
        }));
        return;
    }

    println!("Cache dir:    {}", name);
    println!(
        "Fingerprint:  {}",
        fingerprint.as_deref().unwrap_or("(none, native toolchain disabled)")
    );
    if let Some(dir) = recorded {
        println!("Recorded:     {}", dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_prune_options() {
        let options =
            build_prune_options("mod", Some("1.22.0".into()), false, Some("1GB"), Some("30d"), true)
                .unwrap();
        assert_eq!(options.kind, KindFilter::Module);
        assert_eq!(options.version.as_deref(), Some("1.22.0"));
        assert_eq!(options.max_retained_bytes, 1_073_741_824);
        assert_eq!(options.max_age, Duration::from_secs(30 * 86_400));
        assert!(options.dry_run);
    }

    #[test]
    fn test_build_prune_options_rejects_bad_input() {
        assert!(build_prune_options("objects", None, false, None, None, false).is_err());
        assert!(build_prune_options("all", None, false, Some("lots"), None, false).is_err());
        assert!(build_prune_options("all", None, false, None, Some("soon"), false).is_err());
    }
}
