//! `dk outbox`: mail that failed delivery after its change was committed.

use super::Context;
use crate::output::render;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::Write;

#[derive(Args, Debug)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub command: OutboxCommand,
}

#[derive(Subcommand, Debug)]
pub enum OutboxCommand {
    /// Messages waiting for redelivery.
    List,
    /// Try every waiting message again.
    Retry,
}

pub fn run_outbox(args: &OutboxArgs, ctx: &Context<'_>) -> Result<()> {
    let mut docket = ctx.open()?;
    match args.command {
        OutboxCommand::List => {
            let pending = docket.pending_mail()?;
            render(ctx.output, &pending, |pending, w| {
                if pending.is_empty() {
                    return writeln!(w, "Outbox is empty.");
                }
                for entry in pending {
                    writeln!(
                        w,
                        "#{}\t{}\t{} attempt(s)\t{}",
                        entry.id, entry.mail.doc, entry.attempts, entry.mail.subject
                    )?;
                    if let Some(err) = &entry.last_error {
                        writeln!(w, "\t{err}")?;
                    }
                }
                Ok(())
            })
        }
        OutboxCommand::Retry => {
            let report = docket.retry_outbox()?;
            render(ctx.output, &report, |r, w| {
                writeln!(w, "Delivered {}, still failing {}.", r.delivered, r.failed)
            })
        }
    }
}
