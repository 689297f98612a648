//! `dk state` and `dk unset-state`.

use super::{Context, finish, render_events};
use anyhow::Result;
use clap::Args;
use docket_core::{IesgSubstate, StateChange, SubstateChange};
use std::collections::BTreeSet;

#[derive(Args, Debug)]
pub struct StateArgs {
    pub name: String,

    /// State dimension, e.g. `draft-iesg`.
    pub state_type: String,

    /// Target state slug. Omit to change only the substate or labels.
    pub state: Option<String>,

    /// Set the IESG substate (need-rev, ad-f-up, point, extpty).
    #[arg(long, conflicts_with = "clear_substate")]
    pub substate: Option<IesgSubstate>,

    #[arg(long)]
    pub clear_substate: bool,

    /// Replace the document's labels. Repeatable.
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Remove every label.
    #[arg(long, conflicts_with = "labels")]
    pub clear_labels: bool,

    /// Free-text comment stored with the change.
    #[arg(long, short = 'm')]
    pub comment: Option<String>,
}

impl StateArgs {
    fn change(&self) -> StateChange {
        let substate = match (self.substate, self.clear_substate) {
            (Some(sub), _) => SubstateChange::Set(sub),
            (None, true) => SubstateChange::Clear,
            (None, false) => SubstateChange::Keep,
        };
        let mut change = match &self.state {
            Some(state) => StateChange::to(&self.state_type, state).with_substate(substate),
            None => StateChange::substate_only(&self.state_type, substate),
        };
        if self.clear_labels || !self.labels.is_empty() {
            change = change.with_tags(self.labels.iter().cloned().collect::<BTreeSet<_>>());
        }
        change
    }
}

#[derive(Args, Debug)]
pub struct UnsetStateArgs {
    pub name: String,
    pub state_type: String,
}

pub fn run_state(args: &StateArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;
    let events = docket.change_state(&args.name, &by, &args.change(), args.comment.as_deref())?;
    finish(&mut docket);
    render_events(ctx.output, &events)
}

pub fn run_unset_state(args: &UnsetStateArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;
    let events = docket.unset_state(&args.name, &by, &args.state_type)?;
    finish(&mut docket);
    render_events(ctx.output, &events)
}
