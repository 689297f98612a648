//! Snapshot-then-save, and reading a document as it was.

use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData, EventType};
use crate::model::document::Document;
use crate::model::relation::Relation;
use chrono::{DateTime, Utc};
use tracing::info;

/// Persist `doc` together with the events that explain the change.
///
/// Inside the caller's transaction: snapshot the stored document, write
/// the new attribute set (guarded by the version `doc` was loaded at),
/// then append `events`, stamping each with its log id. The document's
/// modification time advances to the newest event time, never backwards.
///
/// # Errors
///
/// - invariant violation when `events` is empty, or when an IESG process
///   dimension the stored document had is missing from `doc`
/// - precondition failure when the stored version moved on
/// - storage failures
pub(crate) fn save_with_history(txn: &Txn<'_>, doc: &mut Document, events: &mut [Event]) -> Result<()> {
    if events.is_empty() {
        return Err(DocketError::invariant(format!(
            "refusing to save {} without an event",
            doc.name
        )));
    }
    let persisted = txn.document(&doc.name)?;
    if persisted.version != doc.version {
        return Err(DocketError::precondition(
            ErrorCode::ConcurrentModification,
            format!(
                "{} is at version {}, change was prepared against {}",
                doc.name, persisted.version, doc.version
            ),
        ));
    }
    for state in persisted.states.iter() {
        if txn.catalog.is_iesg_process(&state.state_type) && doc.get_state(&state.state_type).is_none() {
            return Err(DocketError::invariant(format!(
                "{} would leave {} unset",
                doc.name, state.state_type
            )));
        }
    }

    store::insert_snapshot(txn.conn, &persisted)?;

    if let Some(newest) = events.iter().map(|e| e.time).max() {
        doc.touch(newest);
    }
    doc.version = persisted.version + 1;
    store::update_document(txn.conn, doc, persisted.version)?;

    for event in events.iter_mut() {
        store::append_event(txn.conn, event)?;
    }
    info!(
        doc = %doc.name,
        version = doc.version,
        events = ?events.iter().map(|e| e.id).collect::<Vec<_>>(),
        "saved"
    );
    Ok(())
}

/// The document as it stood at `time`: the live row if it was last
/// modified by then, else the newest snapshot taken of a state that was
/// current at `time`. `None` if the document did not exist yet.
pub(crate) fn document_at(txn: &Txn<'_>, name: &str, time: DateTime<Utc>) -> Result<Option<Document>> {
    let live = txn.document(name)?;
    if live.time <= time {
        return Ok(Some(live));
    }
    Ok(query::snapshot_at(txn.conn, name, time)?.map(|s| s.document))
}

/// Outgoing edges of `name` as they stood at `time`.
pub(crate) fn relations_at(txn: &Txn<'_>, name: &str, time: DateTime<Utc>) -> Result<Vec<Relation>> {
    let live = txn.document(name)?;
    if live.time <= time {
        return query::relations_from(txn.conn, name);
    }
    Ok(query::snapshot_at(txn.conn, name, time)?.map_or_else(Vec::new, |s| s.relations))
}

/// The document as it stood at revision `rev`.
///
/// Falls back to rebuilding from the live document and the `new_revision`
/// event for `rev` when no snapshot was taken at that revision.
pub(crate) fn document_at_rev(txn: &Txn<'_>, name: &str, rev: &str) -> Result<Option<Document>> {
    let live = txn.document(name)?;
    if live.rev == rev {
        return Ok(Some(live));
    }
    if let Some(snapshot) = query::snapshot_for_rev(txn.conn, name, rev)? {
        return Ok(Some(snapshot.document));
    }

    let revision = query::events_of_type(txn.conn, name, EventType::NewRevision)?
        .into_iter()
        .find(|e| matches!(&e.data, EventData::NewRevision(data) if data.rev == rev));
    Ok(revision.map(|event| {
        let mut doc = live;
        doc.rev = rev.to_string();
        doc.time = event.time;
        doc
    }))
}

impl Docket {
    /// # Errors
    ///
    /// Not-found when the document does not exist; storage failures.
    pub fn document_at(&self, name: &str, time: DateTime<Utc>) -> Result<Option<Document>> {
        document_at(&self.reader(), name, time)
    }

    /// # Errors
    ///
    /// Not-found when the document does not exist; storage failures.
    pub fn document_at_rev(&self, name: &str, rev: &str) -> Result<Option<Document>> {
        document_at_rev(&self.reader(), name, rev)
    }

    /// # Errors
    ///
    /// Not-found when the document does not exist; storage failures.
    pub fn relations_at(&self, name: &str, time: DateTime<Utc>) -> Result<Vec<Relation>> {
        relations_at(&self.reader(), name, time)
    }

    /// Stored snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// Not-found when the document does not exist; storage failures.
    pub fn history(&self, name: &str) -> Result<Vec<query::Snapshot>> {
        let reader = self.reader();
        reader.document(name)?;
        query::snapshots(reader.conn, name)
    }

    /// Full event log, newest first.
    ///
    /// # Errors
    ///
    /// Not-found when the document does not exist; storage failures.
    pub fn events(&self, name: &str) -> Result<Vec<Event>> {
        let reader = self.reader();
        reader.document(name)?;
        query::events_for(reader.conn, name)
    }
}
