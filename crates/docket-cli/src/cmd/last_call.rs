//! `dk last-call`: request, send, list and sweep IETF last calls.

use super::{Context, finish, render_events};
use crate::output::{pretty_kv, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use docket_core::{ExpiredLastCall, SweepReport};
use std::io::Write;
use tracing::info;

#[derive(Args, Debug)]
pub struct LastCallArgs {
    #[command(subcommand)]
    pub command: LastCallCommand,
}

#[derive(Subcommand, Debug)]
pub enum LastCallCommand {
    /// Ask the secretariat to issue a last call.
    Request { name: String },
    /// Issue the requested last call and start the clock.
    Send { name: String },
    /// Documents whose last call has run out, without changing them.
    Expired,
    /// Expire one document's last call now.
    Expire { name: String },
    /// Expire every last call that has run out.
    Sweep,
}

pub fn run_last_call(args: &LastCallArgs, ctx: &Context<'_>) -> Result<()> {
    match &args.command {
        LastCallCommand::Request { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.request_last_call(name, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        LastCallCommand::Send { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.send_last_call(name, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        LastCallCommand::Expired => {
            let docket = ctx.open()?;
            let expired = docket
                .expired_last_calls()?
                .collect::<docket_core::Result<Vec<ExpiredLastCall>>>()?;
            render(ctx.output, &expired, |rows, w| {
                if rows.is_empty() {
                    return writeln!(w, "No expired last calls.");
                }
                for row in rows {
                    writeln!(w, "{}\t{}", row.name, row.expires.format("%Y-%m-%d"))?;
                }
                Ok(())
            })
        }
        LastCallCommand::Expire { name } => {
            let mut docket = ctx.open()?;
            let events = docket.expire_last_call(name)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        LastCallCommand::Sweep => {
            let mut docket = ctx.open()?;
            let report = docket.run_last_call_sweep()?;
            finish(&mut docket);
            info!(
                expired = report.expired.len(),
                failed = report.failed.len(),
                "sweep finished"
            );
            render_mode(ctx.output, &report, write_sweep_text, write_sweep_pretty)
        }
    }
}

fn write_sweep_text(report: &SweepReport, w: &mut dyn Write) -> std::io::Result<()> {
    for name in &report.expired {
        writeln!(w, "expired\t{name}")?;
    }
    for name in &report.skipped {
        writeln!(w, "skipped\t{name}")?;
    }
    for (name, error) in &report.failed {
        writeln!(w, "failed\t{name}\t{error}")?;
    }
    Ok(())
}

fn write_sweep_pretty(report: &SweepReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "Expired", report.expired.len().to_string())?;
    for name in &report.expired {
        writeln!(w, "  {name}")?;
    }
    if !report.skipped.is_empty() {
        pretty_kv(w, "Skipped", report.skipped.join(", "))?;
    }
    if !report.failed.is_empty() {
        pretty_kv(w, "Failed", report.failed.len().to_string())?;
        for (name, error) in &report.failed {
            writeln!(w, "  {name}: {error}")?;
        }
    }
    Ok(())
}
