//! The state-change orchestrator: the one gateway through which a
//! document's states, substate and labels move.
//!
//! Composite workflows (ballots, last call, defer) build their state
//! changes with [`apply`] so several events can share one save, then call
//! [`finish`] to recompute action holders and persist.

use crate::collab::OutgoingMail;
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{ActionHoldersData, Event, EventData, StateChangeData};
use crate::history::save_with_history;
use crate::model::document::Document;
use crate::model::names::IesgSubstate;
use crate::model::person::PersonId;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// What to do with the IESG substate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubstateChange {
    #[default]
    Keep,
    Clear,
    Set(IesgSubstate),
}

/// A requested move in one state dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub state_type: String,
    /// Target state slug; `None` keeps the current state of the dimension.
    pub state: Option<String>,
    pub substate: SubstateChange,
    /// Replacement label set; `None` keeps the labels.
    pub tags: Option<BTreeSet<String>>,
}

impl StateChange {
    pub fn to(state_type: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            state_type: state_type.into(),
            state: Some(state.into()),
            substate: SubstateChange::Keep,
            tags: None,
        }
    }

    /// Keep the state, change only the substate.
    pub fn substate_only(state_type: impl Into<String>, substate: SubstateChange) -> Self {
        Self {
            state_type: state_type.into(),
            state: None,
            substate,
            tags: None,
        }
    }

    #[must_use]
    pub const fn with_substate(mut self, substate: SubstateChange) -> Self {
        self.substate = substate;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

fn state_label(name: &str, substate: Option<IesgSubstate>) -> String {
    match substate {
        Some(sub) => format!("{name}::{}", sub.name()),
        None => name.to_string(),
    }
}

fn join(tags: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    tags.into_iter()
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Apply `change` to `doc` in memory and describe it.
///
/// Returns `None` when the dimension is inactive for the document kind or
/// when state, substate and labels would all stay the same.
///
/// # Errors
///
/// Validation failure for an unknown or retired state, a state type that
/// does not belong to the document kind, or a substate on a non-IESG
/// dimension.
pub(crate) fn apply(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    change: &StateChange,
) -> Result<Option<Event>> {
    let catalog = txn.catalog;
    let Some(state_type) = catalog.state_type(&change.state_type) else {
        return Err(DocketError::validation(
            ErrorCode::InvalidState,
            format!("unknown state type '{}'", change.state_type),
        ));
    };
    if !catalog.is_active(&change.state_type) {
        debug!(doc = %doc.name, state_type = %change.state_type, "inactive dimension; nothing to do");
        return Ok(None);
    }

    let is_iesg_dimension = doc.kind.iesg_state_type() == Some(change.state_type.as_str());
    if !is_iesg_dimension && change.substate != SubstateChange::Keep {
        return Err(DocketError::validation(
            ErrorCode::InvalidState,
            format!("'{}' has no substates", change.state_type),
        ));
    }

    let prev_state = doc.get_state(&change.state_type).cloned();
    let target = match (&change.state, &prev_state) {
        (Some(slug), _) => catalog.enterable(doc.kind, &change.state_type, slug)?.clone(),
        (None, Some(current)) => current.clone(),
        (None, None) => {
            return Err(DocketError::validation(
                ErrorCode::InvalidState,
                format!("{} has no '{}' state to annotate", doc.name, change.state_type),
            ));
        }
    };

    let prev_substate = if is_iesg_dimension { doc.substate } else { None };
    let new_substate = match change.substate {
        SubstateChange::Keep => prev_substate,
        SubstateChange::Clear => None,
        SubstateChange::Set(sub) => Some(sub),
    };
    let prev_tags = doc.tags.clone();
    let new_tags = change.tags.clone().unwrap_or_else(|| prev_tags.clone());

    let same_state = prev_state.as_ref().is_some_and(|s| s.slug == target.slug);
    if same_state && prev_substate == new_substate && prev_tags == new_tags {
        debug!(doc = %doc.name, state_type = %change.state_type, state = %target.slug, "no-op state change");
        return Ok(None);
    }

    let mut desc = format!(
        "{} changed to {}",
        state_type.label,
        state_label(&target.name, new_substate)
    );
    if let Some(prev) = &prev_state {
        desc.push_str(" from ");
        desc.push_str(&state_label(&prev.name, prev_substate));
    }
    let added: Vec<_> = new_tags.difference(&prev_tags).collect();
    let removed: Vec<_> = prev_tags.difference(&new_tags).collect();
    if !added.is_empty() {
        desc.push_str("; labels added: ");
        desc.push_str(&join(added));
    }
    if !removed.is_empty() {
        desc.push_str("; labels removed: ");
        desc.push_str(&join(removed));
    }

    let data = StateChangeData {
        state_type: change.state_type.clone(),
        prev_state: prev_state.as_ref().map(|s| s.slug.clone()),
        new_state: Some(target.slug.clone()),
        prev_substate,
        new_substate,
        prev_tags,
        new_tags: new_tags.clone(),
    };

    doc.set_state(target);
    if is_iesg_dimension {
        doc.substate = new_substate;
    }
    doc.tags = new_tags;

    Ok(Some(Event::new(doc, by, txn.now, desc, EventData::ChangedState(data))))
}

/// Recompute who must act next; append an event when that changed.
pub(crate) fn update_action_holders(
    txn: &Txn<'_>,
    prev: &Document,
    doc: &mut Document,
    by: &PersonId,
    events: &mut Vec<Event>,
) {
    let holders = txn.policy.recompute(prev, doc);
    if holders == doc.action_holders {
        return;
    }
    let desc = if holders.is_empty() {
        "Removed all action holders".to_string()
    } else {
        format!(
            "Changed action holders to {}",
            join(holders.iter().map(|p| txn.person_name(p)))
        )
    };
    doc.action_holders = holders;
    events.push(Event::new(
        doc,
        by,
        txn.now,
        desc,
        EventData::ChangedActionHolders(ActionHoldersData {
            holders: doc.action_holders.iter().cloned().collect(),
        }),
    ));
}

/// Everyone who hears about changes to `doc`: its notify list plus the
/// IESG list.
pub(crate) fn notification(txn: &Txn<'_>, doc: &Document, subject: String, body: String) -> OutgoingMail {
    let mut to: Vec<String> = doc
        .notify
        .split([',', ' ', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    to.push(txn.settings.mail.iesg.clone());
    OutgoingMail::new(doc.name.clone(), to, subject, body)
}

/// Recompute action holders, save with history and queue the change
/// notice.
///
/// # Errors
///
/// Anything [`save_with_history`] reports.
pub(crate) fn finish(
    txn: &Txn<'_>,
    prev: &Document,
    doc: &mut Document,
    by: &PersonId,
    mut events: Vec<Event>,
) -> Result<Vec<Event>> {
    update_action_holders(txn, prev, doc, by, &mut events);
    save_with_history(txn, doc, &mut events)?;
    for event in events.iter().filter(|e| matches!(e.data, EventData::ChangedState(_))) {
        info!(doc = %doc.name, event = event.id, desc = %event.desc, "state changed");
        txn.queue_mail(notification(
            txn,
            doc,
            format!("{}: {}", doc.name, event.desc),
            format!("{}\n\nChanged by {}.\n", event.desc, txn.person_name(by)),
        ));
    }
    Ok(events)
}

/// Change one dimension, optionally with a comment. Returns the events
/// written; empty for a no-op.
///
/// # Errors
///
/// Validation failures from [`apply`], plus save failures.
pub(crate) fn change_state(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    change: &StateChange,
    comment: Option<&str>,
) -> Result<Vec<Event>> {
    let prev = doc.clone();
    let Some(event) = apply(txn, doc, by, change)? else {
        return Ok(Vec::new());
    };
    let mut events = vec![event];
    if let Some(text) = comment.map(str::trim).filter(|t| !t.is_empty()) {
        events.push(Event::new(doc, by, txn.now, text, EventData::AddedComment));
    }
    finish(txn, &prev, doc, by, events)
}

/// Clear a dimension. Returns the events written; empty when it was
/// already unset.
///
/// # Errors
///
/// Invariant violation for an IESG process dimension the document has
/// entered; save failures.
pub(crate) fn unset_state(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    state_type: &str,
) -> Result<Vec<Event>> {
    let prev = doc.clone();
    let Some(removed) = doc.unset_state(txn.catalog, state_type)? else {
        debug!(doc = %doc.name, state_type, "dimension already unset");
        return Ok(Vec::new());
    };
    let label = txn
        .catalog
        .state_type(state_type)
        .map_or(state_type, |t| t.label.as_str());
    let event = Event::new(
        doc,
        by,
        txn.now,
        format!("{label} cleared (was {})", removed.name),
        EventData::ChangedState(StateChangeData {
            state_type: state_type.to_string(),
            prev_state: Some(removed.slug),
            new_state: None,
            prev_substate: None,
            new_substate: None,
            prev_tags: doc.tags.clone(),
            new_tags: doc.tags.clone(),
        }),
    );
    finish(txn, &prev, doc, by, vec![event])
}

impl Docket {
    /// Move `name` in one state dimension.
    ///
    /// # Errors
    ///
    /// Not-found, validation, or storage failures.
    pub fn change_state(
        &mut self,
        name: &str,
        by: &PersonId,
        change: &StateChange,
        comment: Option<&str>,
    ) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            change_state(txn, &mut doc, by, change, comment)
        })
    }

    /// Clear a non-IESG dimension of `name`.
    ///
    /// # Errors
    ///
    /// Not-found, invariant violation for IESG dimensions, storage failures.
    pub fn unset_state(&mut self, name: &str, by: &PersonId, state_type: &str) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            unset_state(txn, &mut doc, by, state_type)
        })
    }
}
