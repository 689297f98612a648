//! `dk init`: create `.docket/` with a starter config and an empty store.

use super::Context;
use crate::output::{pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use docket_core::config::{DOCKET_DIR, STARTER_CONFIG, database_path};
use docket_core::Docket;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the starter config even if `.docket/` already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct Initialized {
    config: String,
    database: String,
    config_written: bool,
}

/// ```text
/// .docket/
///   config.toml       (starter project config)
///   docket.sqlite3    (store, migrated)
///   .gitignore
/// ```
///
/// # Errors
///
/// Returns an error if `.docket/` exists without `--force`, or on any
/// filesystem or store failure.
pub fn run_init(args: &InitArgs, ctx: &Context<'_>) -> Result<()> {
    let dir = ctx.project_root.join(DOCKET_DIR);
    if dir.exists() && !args.force {
        anyhow::bail!("{DOCKET_DIR}/ already exists. Use `dk init --force` to reinitialize.");
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, STARTER_CONFIG)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }
    let gitignore = dir.join(".gitignore");
    std::fs::write(&gitignore, "docket.sqlite3*\n")
        .with_context(|| format!("Failed to write {}", gitignore.display()))?;

    // Opening creates and migrates the store.
    drop(Docket::open(ctx.project_root)?);

    let result = Initialized {
        config: config_path.display().to_string(),
        database: database_path(ctx.project_root).display().to_string(),
        config_written,
    };
    render(ctx.output, &result, |r, w| {
        writeln!(w, "Initialized {DOCKET_DIR}/")?;
        pretty_kv(w, "Config", &r.config)?;
        pretty_kv(w, "Database", &r.database)?;
        writeln!(w)?;
        writeln!(w, "Next: set DOCKET_ACTOR and file a document with `dk file`.")
    })
}
