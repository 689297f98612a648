//! Stored writeup texts. The generator produces them; docket only keeps
//! the latest version of each as an event.

use crate::collab::{WriteupContext, WriteupKind};
use crate::db::query;
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::Event;
use crate::history::save_with_history;
use crate::model::document::Document;
use crate::model::person::PersonId;
use crate::relations;
use tracing::debug;

/// Latest stored text of `kind` for `doc`.
pub(crate) fn latest(txn: &Txn<'_>, doc: &str, kind: WriteupKind) -> Result<Option<String>> {
    Ok(query::latest_event(txn.conn, doc, &[kind.event_type()])?
        .and_then(|e| e.data.writeup_text().map(str::to_string)))
}

/// Event storing `text`, or `None` when it matches what is stored.
pub(crate) fn writeup_event(
    txn: &Txn<'_>,
    doc: &Document,
    by: &PersonId,
    kind: WriteupKind,
    text: String,
) -> Result<Option<Event>> {
    if text.trim().is_empty() {
        return Err(DocketError::validation(
            ErrorCode::EmptyText,
            format!("{} is empty", kind.name()),
        ));
    }
    if latest(txn, &doc.name, kind)?.as_deref() == Some(text.as_str()) {
        debug!(doc = %doc.name, kind = %kind, "writeup unchanged");
        return Ok(None);
    }
    Ok(Some(Event::new(
        doc,
        by,
        txn.now,
        format!("{} was changed", kind.name()),
        kind.event_data(text),
    )))
}

/// Ask the generator for `kind`.
///
/// # Errors
///
/// Collaborator failure when the generator errors; storage failures
/// while collecting downrefs.
pub(crate) fn generate(
    txn: &Txn<'_>,
    doc: &Document,
    kind: WriteupKind,
    mut ctx: WriteupContext,
) -> Result<String> {
    if kind == WriteupKind::LastCall && ctx.downrefs.is_empty() {
        ctx.downrefs = relations::downrefs(txn, doc)?;
    }
    txn.writeups
        .generate(doc, kind, &ctx)
        .map_err(|err| Txn::writeup_failed(&err))
}

/// Stored text, generating and storing it first when there is none yet.
pub(crate) fn current_or_generate(
    txn: &Txn<'_>,
    doc: &Document,
    by: &PersonId,
    kind: WriteupKind,
    events: &mut Vec<Event>,
) -> Result<String> {
    if let Some(text) = latest(txn, &doc.name, kind)? {
        return Ok(text);
    }
    let text = generate(txn, doc, kind, WriteupContext::default())?;
    events.extend(writeup_event(txn, doc, by, kind, text.clone())?);
    Ok(text)
}

fn store_text(txn: &Txn<'_>, doc: &mut Document, by: &PersonId, kind: WriteupKind, text: String) -> Result<Option<Event>> {
    let Some(event) = writeup_event(txn, doc, by, kind, text)? else {
        return Ok(None);
    };
    let mut events = [event];
    save_with_history(txn, doc, &mut events)?;
    let [event] = events;
    Ok(Some(event))
}

impl Docket {
    /// Store new text for `kind`. Unchanged text stores nothing.
    ///
    /// # Errors
    ///
    /// Validation failure for empty text; not-found and storage failures.
    pub fn update_writeup(
        &mut self,
        name: &str,
        by: &PersonId,
        kind: WriteupKind,
        text: &str,
    ) -> Result<Option<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            store_text(txn, &mut doc, by, kind, text.to_string())
        })
    }

    /// Replace the stored text of `kind` with freshly generated text.
    ///
    /// # Errors
    ///
    /// Collaborator failure from the generator; not-found and storage
    /// failures.
    pub fn regenerate_writeup(&mut self, name: &str, by: &PersonId, kind: WriteupKind) -> Result<Option<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            let text = generate(txn, &doc, kind, WriteupContext::default())?;
            store_text(txn, &mut doc, by, kind, text)
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn writeup(&self, name: &str, kind: WriteupKind) -> Result<Option<String>> {
        let reader = self.reader();
        reader.document(name)?;
        latest(&reader, name, kind)
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::collab::{WRITEUP_BOILERPLATE, WriteupKind};
    use crate::docket::{Docket, DocketBuilder};
    use crate::documents::NewDocument;
    use crate::error::ErrorCode;
    use crate::model::names::DocKind;
    use crate::model::person::PersonId;
    use chrono::DateTime;

    fn docket() -> Docket {
        let mut docket = DocketBuilder::new()
            .clock(FixedClock::new(DateTime::from_timestamp(1_000_000, 0).unwrap()))
            .in_memory()
            .unwrap();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &PersonId::new("ad"))
            .unwrap();
        docket
    }

    #[test]
    fn unchanged_text_stores_nothing() {
        let mut docket = docket();
        let by = PersonId::new("ad");
        let first = docket
            .update_writeup("draft-a", &by, WriteupKind::BallotWriteup, "Summary")
            .unwrap();
        assert_eq!(first.map(|e| e.desc), Some("Ballot writeup was changed".to_string()));
        assert!(
            docket
                .update_writeup("draft-a", &by, WriteupKind::BallotWriteup, "Summary")
                .unwrap()
                .is_none()
        );
        assert_eq!(
            docket.writeup("draft-a", WriteupKind::BallotWriteup).unwrap().as_deref(),
            Some("Summary")
        );
        assert!(docket.writeup("draft-a", WriteupKind::LastCall).unwrap().is_none());
    }

    #[test]
    fn empty_text_is_rejected() {
        let mut docket = docket();
        let err = docket
            .update_writeup("draft-a", &PersonId::new("ad"), WriteupKind::LastCall, "  ")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyText);
    }

    #[test]
    fn regenerate_uses_the_generator() {
        let mut docket = docket();
        docket
            .regenerate_writeup("draft-a", &PersonId::new("ad"), WriteupKind::BallotWriteup)
            .unwrap();
        let text = docket.writeup("draft-a", WriteupKind::BallotWriteup).unwrap().unwrap();
        assert!(text.contains(WRITEUP_BOILERPLATE));
    }
}
