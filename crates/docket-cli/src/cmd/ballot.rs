//! `dk ballot`: issue, record, tally, defer and approve.

use super::{Context, finish, render_events};
use crate::output::{pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use docket_core::{BallotTally, PersonId, PositionInput, PositionKind, PositionSummary};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct BallotArgs {
    #[command(subcommand)]
    pub command: BallotCommand,
}

#[derive(Subcommand, Debug)]
pub enum BallotCommand {
    /// Open the ballot and move the document into evaluation.
    Issue {
        name: String,
        /// Ballot type; defaults to the kind's first.
        #[arg(long = "type")]
        ballot_type: Option<String>,
    },
    /// Record a position on the document's open ballot.
    Position {
        name: String,
        /// yes, noobj, discuss, block, abstain, recuse, norecord.
        pos: PositionKind,
        /// Who holds the position; defaults to the actor.
        #[arg(long)]
        balloter: Option<String>,
        /// Text for a blocking position.
        #[arg(long)]
        discuss: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long = "type")]
        ballot_type: Option<String>,
    },
    /// Positions and the verdict. Defaults to the newest ballot.
    Tally {
        name: String,
        /// Tally this ballot id instead.
        #[arg(long)]
        id: Option<i64>,
    },
    /// Every ballot opened on a document.
    List { name: String },
    /// Close a ballot by id.
    Close { id: i64 },
    /// Defer to the second upcoming telechat.
    Defer { name: String },
    /// Back to evaluation on the next telechat.
    Undefer { name: String },
    /// Approve and send the announcement.
    Approve { name: String },
}

#[derive(Debug, Serialize)]
struct Issued {
    ballot: docket_core::ballot::Ballot,
    events: Vec<docket_core::Event>,
}

fn write_position(w: &mut dyn Write, p: &PositionSummary) -> io::Result<()> {
    let prior = if p.prior.is_empty() {
        String::new()
    } else {
        let labels: Vec<String> = p.prior.iter().map(|k| k.name().to_string()).collect();
        format!("  (was {})", labels.join(", "))
    };
    writeln!(w, "  {:<20} {:<12}{prior}", p.name, p.pos.name())?;
    for (label, text) in [("discuss", &p.discuss), ("comment", &p.comment)] {
        if let Some(first) = text.lines().next() {
            writeln!(w, "  {:<20}   {label}: {first}", "")?;
        }
    }
    Ok(())
}

fn write_tally(w: &mut dyn Write, t: &BallotTally) -> io::Result<()> {
    let state = if t.ballot.is_open() { "open" } else { "closed" };
    pretty_section(w, &format!("{} #{} ({state})", t.ballot_name, t.ballot.id))?;
    if !t.question.is_empty() {
        writeln!(w, "{}", t.question)?;
        writeln!(w)?;
    }
    for p in &t.active {
        write_position(w, p)?;
    }
    if !t.historic.is_empty() {
        writeln!(w)?;
        writeln!(w, "No longer balloting:")?;
        for p in &t.historic {
            write_position(w, p)?;
        }
    }
    writeln!(w)?;
    pretty_kv(w, "Verdict", t.verdict())
}

fn show_tally(ctx: &Context<'_>, tally: &BallotTally) -> Result<()> {
    render_mode(
        ctx.output,
        tally,
        |t, w| {
            for p in &t.active {
                writeln!(w, "{}\t{}", p.balloter, p.pos)?;
            }
            writeln!(w, "{}", t.verdict())
        },
        |t, w| write_tally(w, t),
    )
}

pub fn run_ballot(args: &BallotArgs, ctx: &Context<'_>) -> Result<()> {
    match &args.command {
        BallotCommand::Issue { name, ballot_type } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let (ballot, events) = docket.issue_ballot(name, &by, ballot_type.as_deref())?;
            finish(&mut docket);
            let issued = Issued { ballot, events };
            render(ctx.output, &issued, |i, w| {
                writeln!(w, "Ballot #{} ({}) open on {}", i.ballot.id, i.ballot.ballot_type, i.ballot.doc)?;
                super::write_events(w, &i.events)
            })
        }
        BallotCommand::Position {
            name,
            pos,
            balloter,
            discuss,
            comment,
            ballot_type,
        } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let Some(ballot) = docket.open_ballot(name, ballot_type.as_deref())? else {
                anyhow::bail!("{name} has no open ballot. Run `dk ballot issue {name}` first.");
            };
            let balloter = balloter.as_deref().map_or_else(|| by.clone(), PersonId::new);
            let mut input = PositionInput::new(*pos);
            if let Some(text) = discuss {
                input = input.discuss(text);
            }
            if let Some(text) = comment {
                input = input.comment(text);
            }
            let events = docket.record_position(ballot.id, &balloter, &by, input)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        BallotCommand::Tally { name, id } => {
            let docket = ctx.open()?;
            let tally = match id {
                Some(id) => Some(docket.tally(*id)?),
                None => docket.ballot_tally(name)?,
            };
            match tally {
                Some(tally) => show_tally(ctx, &tally),
                None => render(ctx.output, &serde_json::Value::Null, |_, w| {
                    writeln!(w, "{name} has no ballot.")
                }),
            }
        }
        BallotCommand::List { name } => {
            let docket = ctx.open()?;
            docket.document(name)?;
            let ballots = docket.ballots(name)?;
            render(ctx.output, &ballots, |ballots, w| {
                for b in ballots {
                    let closed = b
                        .closed_at
                        .map_or_else(|| "open".to_string(), |t| format!("closed {}", t.format("%Y-%m-%d")));
                    writeln!(
                        w,
                        "#{}\t{}\topened {} by {}\t{closed}",
                        b.id,
                        b.ballot_type,
                        b.opened_at.format("%Y-%m-%d"),
                        b.opened_by
                    )?;
                }
                Ok(())
            })
        }
        BallotCommand::Close { id } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.close_ballot(*id, &by)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
        BallotCommand::Defer { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.defer_ballot(name, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        BallotCommand::Undefer { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.undefer_ballot(name, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        BallotCommand::Approve { name } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.approve_ballot(name, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
    }
}
