//! apkshelf command-line entry point.

mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use apkshelf_cache::{Cache, JsonCache};
use apkshelf_config::Config;
use apkshelf_library::{ApkReader, Context, IconEntry, build_library, extract_icons, reconcile};
use apkshelf_storage::backend::{LocalBackend, ReadOnlyBackend};
use apkshelf_storage::{BackendHandle, FileInfo};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("apkshelf=warn"),
        1 => EnvFilter::new("apkshelf=info"),
        _ => EnvFilter::new("apkshelf=debug"),
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    let started = Instant::now();
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    config.validate().or_raise(|| ErrorKind::Config)?;
    let ctx = Context::try_from(&config).or_raise(|| ErrorKind::Config)?;

    let local: BackendHandle = Arc::new(LocalBackend::new(&config.library).or_raise(|| ErrorKind::Storage)?);
    let backend: BackendHandle = if cli.dry_run {
        tracing::info!("Dry run: no files will be changed");
        Arc::new(ReadOnlyBackend::new(local))
    } else {
        local
    };
    let files = backend.list(&config.extension, config.recursive).or_raise(|| ErrorKind::Storage)?;
    tracing::info!(library = %config.library.display(), files = files.len(), "Library listed");

    match cli.command {
        Command::Organize(_) => organize(&backend, &ctx, &files),
        Command::Icons(_) => icons(&backend, &ctx, &config, &files)?,
    }
    tracing::info!(elapsed = ?started.elapsed(), "Finished");
    Ok(())
}

fn organize(backend: &BackendHandle, ctx: &Context, files: &[FileInfo]) {
    let library = build_library(backend, &ApkReader, files.iter().map(|file| &file.path));
    let summary = reconcile(backend, library, ctx);
    println!("Old versions => {}", summary.old);
    println!("Duplicate versions => {}", summary.duplicates);
    if summary.failed() > 0 {
        println!("Failed => {}", summary.failed());
    }
}

fn icons(backend: &BackendHandle, ctx: &Context, config: &Config, files: &[FileInfo]) -> Result<()> {
    let mut cache: JsonCache<IconEntry> = JsonCache::new(backend.clone(), &config.cache.file);
    cache.reconstruct();
    let summary = extract_icons(backend, &ApkReader, &mut cache, ctx, files);
    cache.commit().or_raise(|| ErrorKind::Cache)?;
    println!("Icons extracted => {}", summary.extracted);
    println!("Without icon => {}", summary.failed);
    println!("Already processed => {}", summary.cached);
    println!("Unreadable => {}", summary.skipped);
    println!("Stale cache entries removed => {}", summary.removed);
    Ok(())
}
