//! Filing documents and editing what they say about themselves.

use crate::catalog::defaults::draft;
use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{ActionHoldersData, ChangedFieldsData, Event, EventData, NewRevisionData};
use crate::history::save_with_history;
use crate::model::document::{CurrentStates, Document, Group};
use crate::model::names::{DocKind, IesgSubstate, StdLevel, Stream};
use crate::model::person::PersonId;
use crate::transition::{self, StateChange, SubstateChange};
use tracing::info;

/// Everything needed to file a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub kind: DocKind,
    pub title: String,
    /// Defaults to `00`.
    pub rev: Option<String>,
    pub abstract_text: String,
    pub notify: String,
    pub ad: Option<PersonId>,
    pub shepherd: Option<PersonId>,
    pub stream: Option<Stream>,
    pub group: Group,
    pub intended_std_level: Option<StdLevel>,
    pub std_level: Option<StdLevel>,
    pub rfc_number: Option<u32>,
    pub authors: Vec<PersonId>,
    /// Initial `(state_type, slug)` pairs. The primary dimension defaults
    /// to its first state.
    pub states: Vec<(String, String)>,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, kind: DocKind, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            title: title.into(),
            rev: None,
            abstract_text: String::new(),
            notify: String::new(),
            ad: None,
            shepherd: None,
            stream: None,
            group: Group::individual(),
            intended_std_level: None,
            std_level: None,
            rfc_number: None,
            authors: Vec::new(),
            states: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(mut self, state_type: impl Into<String>, slug: impl Into<String>) -> Self {
        self.states.push((state_type.into(), slug.into()));
        self
    }
}

/// Attribute changes; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeEdit {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub notify: Option<String>,
    pub ad: Option<Option<PersonId>>,
    pub shepherd: Option<Option<PersonId>>,
    pub stream: Option<Option<Stream>>,
    pub group: Option<Group>,
    pub intended_std_level: Option<Option<StdLevel>>,
    pub std_level: Option<Option<StdLevel>>,
    pub rfc_number: Option<Option<u32>>,
    pub authors: Option<Vec<PersonId>>,
}

fn validate_rev(rev: &str) -> Result<()> {
    if rev.len() == 2 && rev.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(DocketError::validation(
            ErrorCode::InvalidRevision,
            format!("revision '{rev}' is not two digits"),
        ))
    }
}

fn file(txn: &Txn<'_>, new: NewDocument, by: &PersonId) -> Result<Document> {
    Document::validate_name(&new.name)?;
    if query::document_exists(txn.conn, &new.name)? {
        return Err(DocketError::validation(
            ErrorCode::InvalidName,
            format!("document '{}' already exists", new.name),
        ));
    }
    let rev = new.rev.unwrap_or_else(|| "00".to_string());
    validate_rev(&rev)?;

    let mut doc = Document::new(new.name, new.kind, new.title);
    doc.rev = rev;
    doc.abstract_text = new.abstract_text;
    doc.notify = new.notify;
    doc.ad = new.ad;
    doc.shepherd = new.shepherd;
    doc.stream = new.stream;
    doc.group = new.group;
    doc.intended_std_level = new.intended_std_level;
    doc.std_level = new.std_level;
    doc.rfc_number = new.rfc_number;
    doc.authors = new.authors;
    doc.time = txn.now;

    for (state_type, slug) in &new.states {
        let state = txn.catalog.enterable(doc.kind, state_type, slug)?;
        doc.set_state(state.clone());
    }
    let primary = doc.kind.primary_state_type();
    if doc.get_state(primary).is_none() {
        if let Some(first) = txn.catalog.states(primary).iter().find(|s| s.used) {
            doc.set_state(first.clone());
        }
    }

    let blank = Document {
        states: CurrentStates::default(),
        ..doc.clone()
    };
    doc.action_holders = txn.policy.recompute(&blank, &doc);

    store::insert_document(txn.conn, &doc)?;

    let desc = match doc.kind {
        DocKind::Draft => format!("New version available: {}-{}.txt", doc.name, doc.rev),
        _ => format!("{} filed", doc.kind.name()),
    };
    let mut events = vec![Event::new(
        &doc,
        by,
        txn.now,
        desc,
        EventData::NewRevision(NewRevisionData { rev: doc.rev.clone() }),
    )];
    if !doc.action_holders.is_empty() {
        events.push(Event::new(
            &doc,
            by,
            txn.now,
            format!(
                "Changed action holders to {}",
                doc.action_holders
                    .iter()
                    .map(|p| txn.person_name(p))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            EventData::ChangedActionHolders(ActionHoldersData {
                holders: doc.action_holders.iter().cloned().collect(),
            }),
        ));
    }
    for event in &mut events {
        store::append_event(txn.conn, event)?;
    }
    info!(doc = %doc.name, kind = %doc.kind, rev = %doc.rev, "filed");
    Ok(doc)
}

fn new_revision(txn: &Txn<'_>, doc: &mut Document, by: &PersonId, rev: &str) -> Result<Vec<Event>> {
    validate_rev(rev)?;
    if rev <= doc.rev.as_str() {
        return Err(DocketError::validation(
            ErrorCode::InvalidRevision,
            format!("revision {rev} does not follow {}", doc.rev),
        ));
    }
    let prev = doc.clone();
    doc.rev = rev.to_string();
    let mut events = vec![Event::new(
        doc,
        by,
        txn.now,
        format!("New version available: {}-{rev}.txt", doc.name),
        EventData::NewRevision(NewRevisionData { rev: rev.to_string() }),
    )];

    if doc.kind == DocKind::Draft && doc.state_slug(draft::TYPE) == Some(draft::EXPIRED) {
        let revive = StateChange::to(draft::TYPE, draft::ACTIVE);
        events.extend(transition::apply(txn, doc, by, &revive)?);
    }
    if doc.substate == Some(IesgSubstate::RevisedIdNeeded) {
        if let Some(iesg) = doc.kind.iesg_state_type() {
            let cleared = StateChange::substate_only(iesg, SubstateChange::Clear);
            events.extend(transition::apply(txn, doc, by, &cleared)?);
        }
    }
    transition::finish(txn, &prev, doc, by, events)
}

/// How an attribute value reads in an event description.
trait Shown {
    fn shown(&self) -> String;
}

impl Shown for String {
    fn shown(&self) -> String {
        format!("'{self}'")
    }
}

impl<T: std::fmt::Display> Shown for Option<T> {
    fn shown(&self) -> String {
        self.as_ref().map_or_else(|| "(none)".to_string(), ToString::to_string)
    }
}

impl Shown for Group {
    fn shown(&self) -> String {
        self.acronym.clone()
    }
}

impl Shown for Vec<PersonId> {
    fn shown(&self) -> String {
        self.iter().map(PersonId::as_str).collect::<Vec<_>>().join(", ")
    }
}

fn describe<T: PartialEq + Shown>(
    field: &str,
    old: &mut T,
    new: Option<T>,
    changes: &mut Vec<(String, String)>,
) {
    if let Some(new) = new {
        if *old != new {
            changes.push((
                field.to_string(),
                format!("{field} changed to {} from {}", new.shown(), old.shown()),
            ));
            *old = new;
        }
    }
}

fn edit_attributes(txn: &Txn<'_>, doc: &mut Document, by: &PersonId, edit: AttributeEdit) -> Result<Vec<Event>> {
    let prev = doc.clone();
    let mut changes = Vec::new();
    describe("title", &mut doc.title, edit.title, &mut changes);
    describe("abstract", &mut doc.abstract_text, edit.abstract_text, &mut changes);
    describe("notify", &mut doc.notify, edit.notify, &mut changes);
    describe("ad", &mut doc.ad, edit.ad, &mut changes);
    describe("shepherd", &mut doc.shepherd, edit.shepherd, &mut changes);
    describe("stream", &mut doc.stream, edit.stream, &mut changes);
    describe("group", &mut doc.group, edit.group, &mut changes);
    describe(
        "intended_std_level",
        &mut doc.intended_std_level,
        edit.intended_std_level,
        &mut changes,
    );
    describe("std_level", &mut doc.std_level, edit.std_level, &mut changes);
    describe("rfc_number", &mut doc.rfc_number, edit.rfc_number, &mut changes);
    describe("authors", &mut doc.authors, edit.authors, &mut changes);

    if changes.is_empty() {
        return Ok(Vec::new());
    }
    let (fields, descs): (Vec<_>, Vec<_>) = changes.into_iter().unzip();
    let event = Event::new(
        doc,
        by,
        txn.now,
        descs.join("; "),
        EventData::ChangedDocument(ChangedFieldsData { fields }),
    );
    transition::finish(txn, &prev, doc, by, vec![event])
}

pub(crate) fn comment_event(txn: &Txn<'_>, doc: &Document, by: &PersonId, text: &str) -> Result<Event> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DocketError::validation(ErrorCode::EmptyText, "comment is empty"));
    }
    Ok(Event::new(doc, by, txn.now, text, EventData::AddedComment))
}

impl Docket {
    /// File a new document.
    ///
    /// # Errors
    ///
    /// Validation failure for a malformed or taken name, a bad revision or
    /// an initial state that does not apply; storage failures.
    pub fn create_document(&mut self, new: NewDocument, by: &PersonId) -> Result<Document> {
        self.transact(|txn| file(txn, new, by))
    }

    /// # Errors
    ///
    /// Not-found when there is no such document; storage failures.
    pub fn document(&self, name: &str) -> Result<Document> {
        self.reader().document(name)
    }

    /// # Errors
    ///
    /// Storage failure.
    pub fn document_names(&self) -> Result<Vec<String>> {
        query::document_names(self.connection())
    }

    /// Record a new revision. Clears "Revised I-D Needed" and revives an
    /// expired draft.
    ///
    /// # Errors
    ///
    /// Not-found, validation failure for a malformed or non-increasing
    /// revision, storage failures.
    pub fn new_revision(&mut self, name: &str, by: &PersonId, rev: &str) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            new_revision(txn, &mut doc, by, rev)
        })
    }

    /// Change attributes; an edit that changes nothing writes nothing.
    ///
    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn edit_attributes(&mut self, name: &str, by: &PersonId, edit: AttributeEdit) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            edit_attributes(txn, &mut doc, by, edit)
        })
    }

    /// # Errors
    ///
    /// Not-found, validation failure for empty text, storage failures.
    pub fn add_comment(&mut self, name: &str, by: &PersonId, text: &str) -> Result<Event> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            let mut events = [comment_event(txn, &doc, by, text)?];
            save_with_history(txn, &mut doc, &mut events)?;
            let [event] = events;
            Ok(event)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeEdit, NewDocument};
    use crate::catalog::defaults::{draft, draft_iesg};
    use crate::clock::FixedClock;
    use crate::docket::{Docket, DocketBuilder};
    use crate::error::{DocketError, ErrorCode};
    use crate::event::EventType;
    use crate::model::names::{DocKind, StdLevel};
    use crate::model::person::PersonId;
    use chrono::DateTime;

    fn docket() -> Docket {
        DocketBuilder::new()
            .clock(FixedClock::new(DateTime::from_timestamp(1_000_000, 0).unwrap()))
            .in_memory()
            .unwrap()
    }

    fn ad() -> PersonId {
        PersonId::new("ad")
    }

    #[test]
    fn filing_defaults_primary_state_and_logs_revision() {
        let mut docket = docket();
        let doc = docket
            .create_document(NewDocument::new("draft-ietf-foo-bar", DocKind::Draft, "Foo"), &ad())
            .unwrap();
        assert_eq!(doc.state_slug(draft::TYPE), Some(draft::ACTIVE));
        let events = docket.events("draft-ietf-foo-bar").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::NewRevision);
        assert!(docket.history("draft-ietf-foo-bar").unwrap().is_empty());
    }

    #[test]
    fn duplicate_and_malformed_names_are_rejected() {
        let mut docket = docket();
        let new = NewDocument::new("draft-a", DocKind::Draft, "A");
        docket.create_document(new.clone(), &ad()).unwrap();
        let err = docket.create_document(new, &ad()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidName);

        let err = docket
            .create_document(NewDocument::new("Draft_A", DocKind::Draft, "A"), &ad())
            .unwrap_err();
        assert!(matches!(err, DocketError::Validation { code: ErrorCode::InvalidName, .. }));
    }

    #[test]
    fn filing_into_iesg_state_gives_ad_the_action() {
        let mut docket = docket();
        let mut new = NewDocument::new("draft-a", DocKind::Draft, "A")
            .state(draft_iesg::TYPE, draft_iesg::PUB_REQ);
        new.ad = Some(ad());
        let doc = docket.create_document(new, &ad()).unwrap();
        assert!(doc.action_holders.contains(&ad()));
    }

    #[test]
    fn revisions_must_increase() {
        let mut docket = docket();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &ad())
            .unwrap();
        docket.new_revision("draft-a", &ad(), "01").unwrap();
        let err = docket.new_revision("draft-a", &ad(), "01").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRevision);
        assert_eq!(docket.document("draft-a").unwrap().rev, "01");
    }

    #[test]
    fn no_op_edit_writes_nothing() {
        let mut docket = docket();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &ad())
            .unwrap();
        let same = AttributeEdit {
            title: Some("A".into()),
            ..AttributeEdit::default()
        };
        assert!(docket.edit_attributes("draft-a", &ad(), same).unwrap().is_empty());

        let edit = AttributeEdit {
            intended_std_level: Some(Some(StdLevel::ProposedStandard)),
            ..AttributeEdit::default()
        };
        let events = docket.edit_attributes("draft-a", &ad(), edit).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            docket.document("draft-a").unwrap().intended_std_level,
            Some(StdLevel::ProposedStandard)
        );
        assert_eq!(docket.history("draft-a").unwrap().len(), 1);
    }

    #[test]
    fn empty_comment_is_rejected() {
        let mut docket = docket();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &ad())
            .unwrap();
        let err = docket.add_comment("draft-a", &ad(), "   ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyText);
        let event = docket.add_comment("draft-a", &ad(), "looks good").unwrap();
        assert!(event.is_persisted());
    }
}
