//! `dk undo`: revert a state change or ballot position.

use super::{Context, finish, render_events};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Event id, as shown by `dk log`.
    pub event_id: i64,
}

/// Undo is administrative: it needs an actor like any mutation, but the
/// removed event keeps its original author.
pub fn run_undo(args: &UndoArgs, ctx: &Context<'_>) -> Result<()> {
    ctx.actor()?;
    let mut docket = ctx.open()?;
    let event = docket.undo_event(args.event_id)?;
    finish(&mut docket);
    render_events(ctx.output, &[event])
}
