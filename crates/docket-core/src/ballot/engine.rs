//! Opening, closing and recording positions on ballots.

use crate::ballot::types::{Ballot, BallotPosition, BallotType, PositionKind};
use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{BallotData, Event, EventData, PositionData};
use crate::history::save_with_history;
use crate::model::document::Document;
use crate::model::person::PersonId;
use crate::transition;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// A position as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInput {
    pub pos: PositionKind,
    /// Required for blocking positions, dropped for the rest.
    pub discuss: String,
    pub comment: String,
}

impl PositionInput {
    #[must_use]
    pub const fn new(pos: PositionKind) -> Self {
        Self {
            pos,
            discuss: String::new(),
            comment: String::new(),
        }
    }

    #[must_use]
    pub fn discuss(mut self, text: impl Into<String>) -> Self {
        self.discuss = text.into();
        self
    }

    #[must_use]
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = text.into();
        self
    }
}

pub(crate) fn load_ballot(txn: &Txn<'_>, id: i64) -> Result<Ballot> {
    query::ballot(txn.conn, id)?.ok_or(DocketError::BallotNotFound(id))
}

pub(crate) fn ballot_type<'a>(txn: &Txn<'a>, doc: &Document, ballot: &Ballot) -> Result<&'a BallotType> {
    txn.ballots.resolve(doc.kind, Some(&ballot.ballot_type))
}

/// The open ballot of the resolved type, or a fresh one plus its
/// creation event.
pub(crate) fn create_if_not_open(
    txn: &Txn<'_>,
    doc: &Document,
    by: &PersonId,
    slug: Option<&str>,
) -> Result<(Ballot, Option<Event>)> {
    let ty = txn.ballots.resolve(doc.kind, slug)?;
    if let Some(open) = query::open_ballot(txn.conn, &doc.name, &ty.slug)? {
        debug!(doc = %doc.name, ballot = open.id, "ballot already open");
        return Ok((open, None));
    }
    let ballot = store::insert_ballot(txn.conn, &doc.name, &ty.slug, by, txn.now)?;
    info!(doc = %doc.name, ballot = ballot.id, ballot_type = %ty.slug, "ballot opened");
    let event = Event::new(
        doc,
        by,
        txn.now,
        format!("Created \"{}\" ballot", ty.name),
        EventData::CreatedBallot(BallotData {
            ballot_id: ballot.id,
            ballot_type: ty.slug.clone(),
        }),
    );
    Ok((ballot, Some(event)))
}

/// Close `ballot`; `None` when it was already closed.
pub(crate) fn close(txn: &Txn<'_>, doc: &Document, by: &PersonId, ballot: &Ballot) -> Result<Option<Event>> {
    if !store::close_ballot(txn.conn, ballot.id, txn.now)? {
        return Ok(None);
    }
    let name = txn
        .ballots
        .resolve(doc.kind, Some(&ballot.ballot_type))
        .map_or_else(|_| ballot.ballot_type.clone(), |t| t.name.clone());
    info!(doc = %doc.name, ballot = ballot.id, "ballot closed");
    Ok(Some(Event::new(
        doc,
        by,
        txn.now,
        format!("Closed \"{name}\" ballot"),
        EventData::ClosedBallot(BallotData {
            ballot_id: ballot.id,
            ballot_type: ballot.ballot_type.clone(),
        }),
    )))
}

pub(crate) fn close_open(txn: &Txn<'_>, doc: &Document, by: &PersonId) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for ballot in query::ballots_for(txn.conn, &doc.name)?.iter().filter(|b| b.is_open()) {
        events.extend(close(txn, doc, by, ballot)?);
    }
    Ok(events)
}

fn describe(txn: &Txn<'_>, balloter: &PersonId, by: &PersonId, pos: PositionKind, prev: Option<PositionKind>) -> String {
    let who = txn.person_name(balloter);
    let mut desc = match prev {
        Some(prev) if prev == pos => format!("Ballot discuss and comment text updated for {who}"),
        None | Some(PositionKind::NoRecord) => {
            format!("New position, {}, has been recorded for {who}", pos.name())
        }
        Some(prev) => format!(
            "Position for {who} has been changed to {} from {}",
            pos.name(),
            prev.name()
        ),
    };
    if by != balloter {
        desc.push_str(" by ");
        desc.push_str(&txn.person_name(by));
    }
    desc
}

/// Record a position on an open ballot. Empty result when the balloter's
/// current position and texts are already exactly these.
///
/// # Errors
///
/// - precondition failure when the ballot is closed
/// - validation failure for a position the ballot type does not allow, or
///   a blocking position without discuss text
/// - save failures
pub(crate) fn record(
    txn: &Txn<'_>,
    doc: &mut Document,
    ballot: &Ballot,
    balloter: &PersonId,
    by: &PersonId,
    input: PositionInput,
) -> Result<Vec<Event>> {
    if !ballot.is_open() {
        return Err(DocketError::precondition(
            ErrorCode::BallotNotOpen,
            format!("ballot {} on {} is closed", ballot.id, doc.name),
        ));
    }
    let ty = ballot_type(txn, doc, ballot)?;
    if !ty.allows(input.pos) {
        return Err(DocketError::validation(
            ErrorCode::InvalidPosition,
            format!("'{}' is not a position on the \"{}\" ballot", input.pos, ty.name),
        ));
    }
    let blocking = input.pos.is_blocking();
    let discuss = if blocking { input.discuss.trim().to_string() } else { String::new() };
    let comment = input.comment.trim().to_string();
    if blocking && discuss.is_empty() {
        return Err(DocketError::validation(
            ErrorCode::InvalidPosition,
            format!("a {} position needs discuss text", input.pos.name()),
        ));
    }

    let old = query::current_position(txn.conn, ballot.id, balloter)?;
    let (old_discuss, old_comment) = old
        .as_ref()
        .map_or((String::new(), String::new()), |o| (o.discuss.clone(), o.comment.clone()));
    let prev_pos = old.as_ref().map(|o| o.pos);
    if prev_pos == Some(input.pos) && old_discuss == discuss && old_comment == comment {
        debug!(doc = %doc.name, ballot = ballot.id, balloter = %balloter, "position unchanged");
        return Ok(Vec::new());
    }

    let moved = |text: &str, old_text: &str, old_time: Option<DateTime<Utc>>| {
        if text == old_text {
            old_time
        } else if text.is_empty() {
            None
        } else {
            Some(txn.now)
        }
    };
    let discuss_changed = discuss != old_discuss;
    let comment_changed = comment != old_comment;
    let discuss_time = moved(&discuss, &old_discuss, old.as_ref().and_then(|o| o.discuss_time));
    let comment_time = moved(&comment, &old_comment, old.as_ref().and_then(|o| o.comment_time));

    let mut events = vec![Event::new(
        doc,
        by,
        txn.now,
        describe(txn, balloter, by, input.pos, prev_pos),
        EventData::ChangedBallotPosition(PositionData {
            ballot_id: ballot.id,
            balloter: balloter.clone(),
            pos: input.pos,
            prev_pos,
            discuss: discuss.clone(),
            comment: comment.clone(),
        }),
    )];
    if discuss_changed && !discuss.is_empty() {
        events.push(Event::new(
            doc,
            by,
            txn.now,
            format!("[Ballot {}]\n{discuss}", input.pos.as_str()),
            EventData::AddedComment,
        ));
    }
    if comment_changed && !comment.is_empty() {
        events.push(Event::new(
            doc,
            by,
            txn.now,
            format!("[Ballot comment]\n{comment}"),
            EventData::AddedComment,
        ));
    }

    save_with_history(txn, doc, &mut events)?;
    let position = BallotPosition {
        id: events[0].id,
        ballot_id: ballot.id,
        balloter: balloter.clone(),
        pos: input.pos,
        discuss: discuss.clone(),
        discuss_time,
        comment: comment.clone(),
        comment_time,
        time: txn.now,
        by: by.clone(),
    };
    store::insert_position(txn.conn, &position)?;
    info!(doc = %doc.name, ballot = ballot.id, balloter = %balloter, pos = %input.pos, "position recorded");

    if discuss_changed || comment_changed {
        let mut body = format!("{}\n", events[0].desc);
        if !discuss.is_empty() {
            body.push_str(&format!("\n{}:\n{discuss}\n", input.pos.shout()));
        }
        if !comment.is_empty() {
            body.push_str(&format!("\nCOMMENT:\n{comment}\n"));
        }
        txn.queue_mail(transition::notification(
            txn,
            doc,
            format!(
                "{}'s {} on {}",
                txn.person_name(balloter),
                input.pos.name(),
                doc.name
            ),
            body,
        ));
    }
    Ok(events)
}

impl Docket {
    /// Open a ballot of `ballot_type` (default: the kind's first) unless
    /// one is open already; either way return the open ballot.
    ///
    /// # Errors
    ///
    /// Validation failure when the kind has no such ballot type; not-found
    /// and storage failures.
    pub fn create_ballot_if_not_open(
        &mut self,
        name: &str,
        by: &PersonId,
        ballot_type: Option<&str>,
    ) -> Result<Ballot> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            let (ballot, event) = create_if_not_open(txn, &doc, by, ballot_type)?;
            if let Some(event) = event {
                save_with_history(txn, &mut doc, &mut [event])?;
            }
            Ok(ballot)
        })
    }

    /// Close a ballot. Closing a closed ballot returns `None`.
    ///
    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn close_ballot(&mut self, ballot_id: i64, by: &PersonId) -> Result<Option<Event>> {
        self.transact(|txn| {
            let ballot = load_ballot(txn, ballot_id)?;
            let mut doc = txn.document(&ballot.doc)?;
            let Some(event) = close(txn, &doc, by, &ballot)? else {
                return Ok(None);
            };
            let mut events = [event];
            save_with_history(txn, &mut doc, &mut events)?;
            let [event] = events;
            Ok(Some(event))
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn close_open_ballots(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            let mut events = close_open(txn, &doc, by)?;
            if !events.is_empty() {
                save_with_history(txn, &mut doc, &mut events)?;
            }
            Ok(events)
        })
    }

    /// Record `balloter`'s position, entered by `by`.
    ///
    /// # Errors
    ///
    /// See [`record`]; not-found for an unknown ballot.
    pub fn record_position(
        &mut self,
        ballot_id: i64,
        balloter: &PersonId,
        by: &PersonId,
        input: PositionInput,
    ) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let ballot = load_ballot(txn, ballot_id)?;
            let mut doc = txn.document(&ballot.doc)?;
            record(txn, &mut doc, &ballot, balloter, by, input)
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn ballot(&self, ballot_id: i64) -> Result<Ballot> {
        load_ballot(&self.reader(), ballot_id)
    }

    /// Ballots on `name`, newest first.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn ballots(&self, name: &str) -> Result<Vec<Ballot>> {
        query::ballots_for(self.connection(), name)
    }

    /// Open ballot of `ballot_type` (default: the kind's first), if any.
    ///
    /// # Errors
    ///
    /// Not-found, unknown ballot type, storage failures.
    pub fn open_ballot(&self, name: &str, ballot_type: Option<&str>) -> Result<Option<Ballot>> {
        let doc = self.document(name)?;
        let ty = self.ballot_catalog().resolve(doc.kind, ballot_type)?;
        query::open_ballot(self.connection(), name, &ty.slug)
    }

    /// Full position history of a ballot, newest first.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn positions(&self, ballot_id: i64) -> Result<Vec<BallotPosition>> {
        query::positions_for(self.connection(), ballot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::PositionInput;
    use crate::ballot::types::PositionKind;
    use crate::clock::{Clock, FixedClock};
    use crate::collab::MemoryMailer;
    use crate::docket::{Docket, DocketBuilder};
    use crate::documents::NewDocument;
    use crate::error::ErrorCode;
    use crate::event::EventType;
    use crate::model::names::DocKind;
    use crate::model::person::PersonId;
    use chrono::{DateTime, Duration};

    fn docket() -> (Docket, FixedClock, MemoryMailer) {
        let clock = FixedClock::new(DateTime::from_timestamp(1_000_000, 0).unwrap());
        let mailer = MemoryMailer::new();
        let mut docket = DocketBuilder::new()
            .clock(clock.clone())
            .mailer(mailer.clone())
            .in_memory()
            .unwrap();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &PersonId::new("ad"))
            .unwrap();
        (docket, clock, mailer)
    }

    fn ad1() -> PersonId {
        PersonId::new("ad1")
    }

    #[test]
    fn create_is_idempotent_while_open() {
        let (mut docket, _, _) = docket();
        let first = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        let second = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(docket.ballots("draft-a").unwrap().len(), 1);

        let created = docket
            .events("draft-a")
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == EventType::CreatedBallot)
            .count();
        assert_eq!(created, 1);
    }

    #[test]
    fn close_is_idempotent_and_reopen_creates_a_fresh_ballot() {
        let (mut docket, _, _) = docket();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        assert!(docket.close_ballot(ballot.id, &ad1()).unwrap().is_some());
        assert!(docket.close_ballot(ballot.id, &ad1()).unwrap().is_none());
        assert!(docket.open_ballot("draft-a", None).unwrap().is_none());

        let fresh = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        assert_ne!(fresh.id, ballot.id);
    }

    #[test]
    fn blocking_without_discuss_is_rejected() {
        let (mut docket, _, _) = docket();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        let err = docket
            .record_position(ballot.id, &ad1(), &ad1(), PositionInput::new(PositionKind::Discuss))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPosition);

        let err = docket
            .record_position(ballot.id, &ad1(), &ad1(), PositionInput::new(PositionKind::Block).discuss("x"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPosition, "drafts do not use BLOCK");
        assert!(docket.positions(ballot.id).unwrap().is_empty());
    }

    #[test]
    fn closed_ballots_refuse_positions() {
        let (mut docket, _, _) = docket();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        docket.close_ballot(ballot.id, &ad1()).unwrap();
        let err = docket
            .record_position(ballot.id, &ad1(), &ad1(), PositionInput::new(PositionKind::Yes))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BallotNotOpen);
        assert!(err.is_retryable());
    }

    #[test]
    fn position_descriptions_and_side_events() {
        let (mut docket, clock, mailer) = docket();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();

        let events = docket
            .record_position(ballot.id, &ad1(), &ad1(), PositionInput::new(PositionKind::Yes))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].desc, "New position, Yes, has been recorded for ad1");
        assert!(mailer.sent().iter().all(|m| !m.subject.contains("ad1's")));

        clock.advance(Duration::minutes(5));
        let events = docket
            .record_position(
                ballot.id,
                &ad1(),
                &PersonId::new("secretary"),
                PositionInput::new(PositionKind::Discuss).discuss("Section 3 is unclear"),
            )
            .unwrap();
        assert_eq!(
            events[0].desc,
            "Position for ad1 has been changed to Discuss from Yes by secretary"
        );
        assert_eq!(events[1].desc, "[Ballot discuss]\nSection 3 is unclear");
        assert_eq!(mailer.sent().last().map(|m| m.subject.clone()), Some("ad1's Discuss on draft-a".to_string()));

        let current = &docket.positions(ballot.id).unwrap()[0];
        assert_eq!(current.pos, PositionKind::Discuss);
        assert_eq!(current.id, events[0].id);
        assert_eq!(current.discuss_time, Some(clock.now()));
    }

    #[test]
    fn identical_position_records_nothing_and_text_times_stick() {
        let (mut docket, clock, _) = docket();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad1(), None).unwrap();
        let input = PositionInput::new(PositionKind::NoObjection).comment("nit in 2.1");
        docket.record_position(ballot.id, &ad1(), &ad1(), input.clone()).unwrap();
        let first_time = docket.positions(ballot.id).unwrap()[0].comment_time;

        clock.advance(Duration::hours(1));
        assert!(docket.record_position(ballot.id, &ad1(), &ad1(), input).unwrap().is_empty());

        let events = docket
            .record_position(
                ballot.id,
                &ad1(),
                &ad1(),
                PositionInput::new(PositionKind::Yes).comment("nit in 2.1"),
            )
            .unwrap();
        assert_eq!(events.len(), 1, "unchanged comment adds no side event");
        assert_eq!(docket.positions(ballot.id).unwrap()[0].comment_time, first_time);
    }
}
