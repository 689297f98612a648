//! Administrative undo. Removes one event and the effect it caused; the
//! only path that ever deletes from the log.

use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData, StateChangeData};
use crate::model::document::Document;
use tracing::warn;

fn unsupported(event: &Event, reason: &str) -> DocketError {
    DocketError::precondition(
        ErrorCode::UndoUnsupported,
        format!("event {} ({}) cannot be undone: {reason}", event.id, event.event_type),
    )
}

/// Put back the dimension recorded in `data`. The document must still be
/// in the state the event moved it to.
fn restore_state(txn: &Txn<'_>, doc: &mut Document, event: &Event, data: &StateChangeData) -> Result<()> {
    let current = doc.state_slug(&data.state_type).map(str::to_string);
    if current != data.new_state {
        return Err(unsupported(event, "the document has moved on since"));
    }
    match &data.prev_state {
        Some(slug) => {
            let state = txn.catalog.state(&data.state_type, slug).ok_or_else(|| {
                DocketError::Corrupt(format!("unknown state '{slug}' in '{}'", data.state_type))
            })?;
            doc.set_state(state.clone());
        }
        None if txn.catalog.is_iesg_process(&data.state_type) => {
            return Err(unsupported(event, "it would leave the IESG dimension unset"));
        }
        None => {
            doc.states.remove(&data.state_type);
        }
    }
    if doc.kind.iesg_state_type() == Some(data.state_type.as_str()) {
        doc.substate = data.prev_substate;
    }
    doc.tags.clone_from(&data.prev_tags);

    let persisted = txn.document(&doc.name)?;
    store::insert_snapshot(txn.conn, &persisted)?;
    doc.version = persisted.version + 1;
    store::update_document(txn.conn, doc, persisted.version)
}

pub(crate) fn undo(txn: &Txn<'_>, event_id: i64) -> Result<Event> {
    let event = query::event_by_id(txn.conn, event_id)?.ok_or(DocketError::EventNotFound(event_id))?;
    match &event.data {
        EventData::ChangedState(data) => {
            let mut doc = txn.document(&event.doc)?;
            restore_state(txn, &mut doc, &event, data)?;
        }
        // The position row shares the event id and goes with it.
        EventData::ChangedBallotPosition(_) => {}
        _ => return Err(unsupported(&event, "only state changes and ballot positions")),
    }
    store::delete_event(txn.conn, event.id)?;
    warn!(
        event = event.id,
        doc = %event.doc,
        event_type = %event.event_type,
        desc = %event.desc,
        "event undone"
    );
    Ok(event)
}

impl Docket {
    /// Remove one event and reverse its effect. Returns the removed event.
    ///
    /// # Errors
    ///
    /// Not-found for an unknown id; precondition failure for an event type
    /// that cannot be undone or a state the document has since left;
    /// storage failures.
    pub fn undo_event(&mut self, event_id: i64) -> Result<Event> {
        self.transact(|txn| undo(txn, event_id))
    }
}
