//! `dk log` and `dk history`: the event log and stored snapshots.

use super::{Context, write_events};
use crate::output::{pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use std::io::Write;

#[derive(Args, Debug)]
pub struct LogArgs {
    pub name: String,

    /// Show at most this many events.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub name: String,

    /// The document as it stood at this instant (RFC 3339).
    #[arg(long, conflicts_with = "rev")]
    pub at: Option<DateTime<Utc>>,

    /// The document as it stood when this revision was current.
    #[arg(long)]
    pub rev: Option<String>,
}

pub fn run_log(args: &LogArgs, ctx: &Context<'_>) -> Result<()> {
    let docket = ctx.open()?;
    let mut events = docket.events(&args.name)?;
    if let Some(limit) = args.limit {
        events.truncate(limit);
    }
    render(ctx.output, &events, |events, w| write_events(w, events))
}

pub fn run_history(args: &HistoryArgs, ctx: &Context<'_>) -> Result<()> {
    let docket = ctx.open()?;
    let past = match (&args.at, &args.rev) {
        (Some(at), _) => Some(docket.document_at(&args.name, *at)?),
        (None, Some(rev)) => Some(docket.document_at_rev(&args.name, rev)?),
        (None, None) => None,
    };

    if let Some(doc) = past {
        return render_mode(
            ctx.output,
            &doc,
            |doc, w| match doc {
                Some(d) => {
                    let states: Vec<String> =
                        d.states.iter().map(|s| format!("{}={}", s.state_type, s.slug)).collect();
                    writeln!(w, "{}\t{}\t{}", d.name, d.rev, states.join(","))
                }
                None => writeln!(w, "{} did not exist yet.", args.name),
            },
            |doc, w| match doc {
                Some(d) => {
                    pretty_section(w, &format!("{}-{} as of {}", d.name, d.rev, d.time.format("%Y-%m-%d %H:%M")))?;
                    pretty_kv(w, "Title", &d.title)?;
                    for s in d.states.iter() {
                        pretty_kv(w, &s.state_type, &s.name)?;
                    }
                    if let Some(sub) = d.substate {
                        pretty_kv(w, "Substate", sub.name())?;
                    }
                    Ok(())
                }
                None => writeln!(w, "{} did not exist yet.", args.name),
            },
        );
    }

    let snapshots = docket.history(&args.name)?;
    render(ctx.output, &snapshots, |snapshots, w| {
        for snap in snapshots {
            let states: Vec<&str> = snap.document.states.iter().map(|s| s.slug.as_str()).collect();
            writeln!(
                w,
                "{}\t{}\t{}",
                snap.time.format("%Y-%m-%d %H:%M:%S"),
                snap.rev,
                states.join(",")
            )?;
        }
        Ok(())
    })
}
