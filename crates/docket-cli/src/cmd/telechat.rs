//! `dk telechat`: the calendar and per-document scheduling.

use super::{Context, finish, render_events};
use crate::output::render;
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct TelechatArgs {
    #[command(subcommand)]
    pub command: TelechatCommand,
}

#[derive(Subcommand, Debug)]
pub enum TelechatCommand {
    /// Add dates (YYYY-MM-DD) to the calendar.
    Add {
        #[arg(required = true)]
        dates: Vec<NaiveDate>,
    },
    /// Upcoming dates.
    List,
    /// Put a document on a telechat agenda.
    Schedule { name: String, date: NaiveDate },
    /// Take a document off the agenda.
    Unschedule { name: String },
}

#[derive(Debug, Serialize)]
struct Added {
    date: NaiveDate,
    added: bool,
}

pub fn run_telechat(args: &TelechatArgs, ctx: &Context<'_>) -> Result<()> {
    match &args.command {
        TelechatCommand::Add { dates } => {
            let mut docket = ctx.open()?;
            let mut results = Vec::with_capacity(dates.len());
            for date in dates {
                results.push(Added {
                    date: *date,
                    added: docket.add_telechat_date(*date)?,
                });
            }
            render(ctx.output, &results, |rows, w| {
                for row in rows {
                    let note = if row.added { "added" } else { "already on the calendar" };
                    writeln!(w, "{}\t{note}", row.date)?;
                }
                Ok(())
            })
        }
        TelechatCommand::List => {
            let docket = ctx.open()?;
            let dates = docket.upcoming_telechats(docket.now().date_naive())?;
            render(ctx.output, &dates, |dates, w| {
                if dates.is_empty() {
                    return writeln!(w, "No upcoming telechats.");
                }
                for date in dates {
                    writeln!(w, "{date}")?;
                }
                Ok(())
            })
        }
        TelechatCommand::Schedule { name, date } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.schedule_for_telechat(name, &by, Some(*date))?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
        TelechatCommand::Unschedule { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.schedule_for_telechat(name, &by, None)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
    }
}
