//! `dk relate`: typed edges between documents.

use super::{Context, finish, render_events};
use crate::output::{pretty_section, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use docket_core::RelationKind;
use docket_core::model::Relation;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct RelateArgs {
    #[command(subcommand)]
    pub command: RelateCommand,
}

#[derive(Subcommand, Debug)]
pub enum RelateCommand {
    /// Add `name --kind--> target`.
    Add {
        name: String,
        /// replaces, obs, updates, refnorm, refinfo, refunk, conflrev, tops, ...
        kind: RelationKind,
        target: String,
    },
    /// Remove an edge.
    Remove {
        name: String,
        kind: RelationKind,
        target: String,
    },
    /// Edges from and to a document.
    List {
        name: String,
        /// Only these kinds. Repeatable.
        #[arg(long = "kind")]
        kinds: Vec<RelationKind>,
    },
    /// `replacing` replaces `replaced`; the replaced draft moves to `repl`.
    Replace { replacing: String, replaced: String },
    /// Approve a downward normative reference.
    ApproveDownref { name: String, target: String },
}

#[derive(Debug, Serialize)]
struct RelationsView {
    outgoing: Vec<Relation>,
    incoming: Vec<Relation>,
}

pub fn run_relate(args: &RelateArgs, ctx: &Context<'_>) -> Result<()> {
    match &args.command {
        RelateCommand::List { name, kinds } => {
            let docket = ctx.open()?;
            docket.document(name)?;
            let view = RelationsView {
                outgoing: docket.related_that_doc(name, kinds)?,
                incoming: docket.related_that(name, kinds)?,
            };
            render_mode(
                ctx.output,
                &view,
                |v, w| {
                    for r in v.outgoing.iter().chain(&v.incoming) {
                        writeln!(w, "{}\t{}\t{}", r.source, r.kind, r.target)?;
                    }
                    Ok(())
                },
                |v, w| {
                    pretty_section(w, "Outgoing")?;
                    for r in &v.outgoing {
                        writeln!(w, "  {:<28} {}", r.kind.name(), r.target)?;
                    }
                    writeln!(w)?;
                    pretty_section(w, "Incoming")?;
                    for r in &v.incoming {
                        writeln!(w, "  {:<28} {}", r.kind.name(), r.source)?;
                    }
                    Ok(())
                },
            )
        }
        RelateCommand::Add { name, kind, target } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.add_relation(name, &by, *kind, target)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
        RelateCommand::Remove { name, kind, target } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let event = docket.remove_relation(name, &by, *kind, target)?;
            finish(&mut docket);
            render_events(ctx.output, event.as_slice())
        }
        RelateCommand::Replace { replacing, replaced } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.mark_replaced(replacing, replaced, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
        RelateCommand::ApproveDownref { name, target } => {
            let by = ctx.actor()?;
            let mut docket = ctx.open()?;
            let events = docket.approve_downref(name, target, &by)?;
            finish(&mut docket);
            render_events(ctx.output, &events)
        }
    }
}
