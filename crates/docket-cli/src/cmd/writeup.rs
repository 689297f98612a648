//! `dk writeup`: read, replace or regenerate writeup texts.

use super::{Context, finish, render_events};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use docket_core::collab::WriteupKind;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct WriteupArgs {
    #[command(subcommand)]
    pub command: WriteupCommand,
}

#[derive(Subcommand, Debug)]
pub enum WriteupCommand {
    /// Print the stored text.
    Show {
        name: String,
        /// last-call, ballot-writeup or ballot-approval.
        kind: WriteupKind,
    },
    /// Store new text from a file, or stdin with `-`.
    Set {
        name: String,
        kind: WriteupKind,
        file: PathBuf,
    },
    /// Replace the stored text with freshly generated text.
    Regenerate { name: String, kind: WriteupKind },
}

#[derive(Debug, Serialize)]
struct WriteupView<'a> {
    name: &'a str,
    kind: WriteupKind,
    text: Option<String>,
}

fn read_text(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading writeup from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
    }
}

pub fn run_writeup(args: &WriteupArgs, ctx: &Context<'_>) -> Result<()> {
    match &args.command {
        WriteupCommand::Show { name, kind } => {
            let docket = ctx.open()?;
            let view = WriteupView {
                name,
                kind: *kind,
                text: docket.writeup(name, *kind)?,
            };
            crate::output::render(ctx.output, &view, |v, w| match &v.text {
                Some(text) => writeln!(w, "{}", text.trim_end()),
                None => writeln!(w, "No {} stored for {}.", v.kind.name(), v.name),
            })
        }
        WriteupCommand::Set { name, kind, file } => {
            let text = read_text(file)?;
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.update_writeup(name, &by, *kind, &text)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
        WriteupCommand::Regenerate { name, kind } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.regenerate_writeup(name, &by, *kind)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
    }
}
