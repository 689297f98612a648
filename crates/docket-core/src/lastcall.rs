//! The last-call timer: request, send, find expired, expire, sweep.

use crate::catalog::defaults::{draft_iesg, statchg};
use crate::collab::{DOWNREF_MARKER, OutgoingMail, WRITEUP_BOILERPLATE, WriteupContext, WriteupKind};
use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData, EventType, LastCallData};
use crate::model::document::Document;
use crate::model::names::DocKind;
use crate::model::person::PersonId;
use crate::relations;
use crate::transition::{self, StateChange};
use crate::writeups;
use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// `(state type, requested, in last call)` for kinds that go through one.
fn last_call_states(kind: DocKind) -> Option<(&'static str, &'static str, &'static str)> {
    match kind {
        DocKind::Draft => Some((draft_iesg::TYPE, draft_iesg::LC_REQ, draft_iesg::LC)),
        DocKind::StatusChange => Some((statchg::TYPE, statchg::LC_REQ, statchg::IN_LC)),
        DocKind::Rfc | DocKind::Charter | DocKind::ConflictReview => None,
    }
}

fn unexpected(doc: &Document, action: &str) -> DocketError {
    DocketError::precondition(
        ErrorCode::UnexpectedPriorState,
        format!("cannot {action} for {} in its current state", doc.name),
    )
}

/// Midnight UTC, `days` (plus the individual/area extension) after today.
fn expiry(txn: &Txn<'_>, doc: &Document) -> Result<DateTime<Utc>> {
    let config = &txn.settings.last_call;
    let mut days = config.days;
    if doc.group.is_individual_or_area() {
        days += config.individual_extra_days;
    }
    let date = txn
        .now
        .date_naive()
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| DocketError::invariant(format!("last call of {days} days overflows the calendar")))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Expiry of the most recent last call sent for `doc`.
pub(crate) fn latest_expiry(txn: &Txn<'_>, doc: &str) -> Result<Option<LastCallData>> {
    Ok(
        query::latest_event(txn.conn, doc, &[EventType::SentLastCall])?.and_then(|e| match e.data {
            EventData::SentLastCall(data) => Some(data),
            _ => None,
        }),
    )
}

fn request(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let Some((state_type, requested, in_last_call)) = last_call_states(doc.kind) else {
        return Err(unexpected(doc, "request last call"));
    };
    let current = doc.state_slug(state_type);
    if current == Some(requested) || current == Some(in_last_call) {
        return Err(DocketError::precondition(
            ErrorCode::LastCallAlreadyRequested,
            format!("last call for {} was already requested", doc.name),
        ));
    }
    if doc.kind == DocKind::Draft && current.is_none_or(|s| s == draft_iesg::ID_EXISTS) {
        return Err(unexpected(doc, "request last call"));
    }

    let prev = doc.clone();
    let mut events: Vec<Event> = transition::apply(txn, doc, by, &StateChange::to(state_type, requested))?
        .into_iter()
        .collect();
    events.push(Event::new(
        doc,
        by,
        txn.now,
        "Last call was requested",
        EventData::RequestedLastCall,
    ));
    let text = writeups::current_or_generate(txn, doc, by, WriteupKind::LastCall, &mut events)?;
    let saved = transition::finish(txn, &prev, doc, by, events)?;

    txn.queue_mail(OutgoingMail::new(
        doc.name.clone(),
        vec![txn.settings.mail.secretariat.clone()],
        format!("Last Call requested: {} ({})", doc.name, doc.title),
        text,
    ));
    info!(doc = %doc.name, "last call requested");
    Ok(saved)
}

fn send(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let Some((state_type, requested, in_last_call)) = last_call_states(doc.kind) else {
        return Err(unexpected(doc, "send last call"));
    };
    if doc.state_slug(state_type) != Some(requested) {
        return Err(unexpected(doc, "send last call"));
    }
    let expires = expiry(txn, doc)?;

    let prev = doc.clone();
    let mut events = Vec::new();
    let text = match writeups::latest(txn, &doc.name, WriteupKind::LastCall)? {
        Some(text) => text,
        None => {
            let ctx = WriteupContext {
                expires: Some(expires.date_naive()),
                ..WriteupContext::default()
            };
            let text = writeups::generate(txn, doc, WriteupKind::LastCall, ctx)?;
            events.extend(writeups::writeup_event(txn, doc, by, WriteupKind::LastCall, text.clone())?);
            text
        }
    };
    events.extend(transition::apply(txn, doc, by, &StateChange::to(state_type, in_last_call))?);
    events.push(Event::new(
        doc,
        by,
        txn.now,
        format!("Last call sent; ends {}", expires.date_naive()),
        EventData::SentLastCall(LastCallData {
            expires,
            text: text.clone(),
        }),
    ));
    let saved = transition::finish(txn, &prev, doc, by, events)?;

    let mail = &txn.settings.mail;
    txn.queue_mail(OutgoingMail::new(
        doc.name.clone(),
        vec![mail.announce.clone(), mail.iesg.clone()],
        format!("Last Call: <{}-{}.txt> ({})", doc.name, doc.rev, doc.title),
        text,
    ));
    info!(doc = %doc.name, %expires, "last call sent");
    Ok(saved)
}

/// Follow-up state once the last call is over.
fn follow_up(txn: &Txn<'_>, doc: &Document) -> Result<Option<(&'static str, &'static str)>> {
    match doc.kind {
        DocKind::Draft => {
            // An untouched canned writeup means nobody has written one yet.
            let started = writeups::latest(txn, &doc.name, WriteupKind::BallotWriteup)?
                .is_some_and(|text| !text.contains(WRITEUP_BOILERPLATE));
            let next = if started { draft_iesg::GO_AHEAD } else { draft_iesg::WRITEUP_NEEDED };
            Ok(Some((draft_iesg::TYPE, next)))
        }
        DocKind::StatusChange => Ok(Some((statchg::TYPE, statchg::GO_AHEAD))),
        DocKind::Rfc | DocKind::Charter | DocKind::ConflictReview => Ok(None),
    }
}

/// Move `doc` out of last call. Empty when it is no longer in last call.
pub(crate) fn expire(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let Some((state_type, _, in_last_call)) = last_call_states(doc.kind) else {
        return Ok(Vec::new());
    };
    if doc.state_slug(state_type) != Some(in_last_call) {
        return Ok(Vec::new());
    }
    let Some((state_type, next)) = follow_up(txn, doc)? else {
        return Ok(Vec::new());
    };

    let sent = latest_expiry(txn, &doc.name)?;
    let saved = transition::change_state(txn, doc, by, &StateChange::to(state_type, next), None)?;

    let mail = &txn.settings.mail;
    txn.queue_mail(OutgoingMail::new(
        doc.name.clone(),
        vec![mail.iesg.clone(), mail.secretariat.clone()],
        format!("Last Call Expired: {}", doc.name),
        format!("The last call for {} has ended.\n", doc.name),
    ));
    if sent.is_some_and(|s| s.text.contains(DOWNREF_MARKER)) {
        let downrefs = relations::downrefs(txn, doc)?;
        let mut body = format!(
            "The last call for {} named downward references. Please check them:\n",
            doc.name
        );
        for target in &downrefs {
            body.push_str("    ");
            body.push_str(target);
            body.push('\n');
        }
        txn.queue_mail(OutgoingMail::new(
            doc.name.clone(),
            vec![mail.iesg.clone()],
            format!("Downward references in {}", doc.name),
            body,
        ));
    }
    info!(doc = %doc.name, next, "last call expired");
    Ok(saved)
}

/// One document whose last call is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredLastCall {
    pub name: String,
    pub expires: DateTime<Utc>,
}

/// Lazy walk over documents in last call whose latest expiration has
/// passed. Each step reads the store; call
/// [`Docket::expired_last_calls`] again to start over.
pub struct ExpiredLastCalls<'a> {
    txn: Txn<'a>,
    candidates: std::vec::IntoIter<String>,
}

impl Iterator for ExpiredLastCalls<'_> {
    type Item = Result<ExpiredLastCall>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let name = self.candidates.next()?;
            match latest_expiry(&self.txn, &name) {
                Ok(Some(sent)) if sent.expires <= self.txn.now => {
                    return Some(Ok(ExpiredLastCall {
                        name,
                        expires: sent.expires,
                    }));
                }
                Ok(_) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: Vec<String>,
    /// Already moved on by the time the sweep reached them.
    pub skipped: Vec<String>,
    /// `(document, error)`
    pub failed: Vec<(String, String)>,
}

impl Docket {
    /// # Errors
    ///
    /// Precondition failure when already requested or when the document
    /// cannot go to last call from where it is; writeup-generator,
    /// not-found and storage failures.
    pub fn request_last_call(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            request(txn, &mut doc, by)
        })
    }

    /// Announce the last call and start its timer.
    ///
    /// # Errors
    ///
    /// Precondition failure unless last call was requested; writeup
    /// generator, not-found and storage failures.
    pub fn send_last_call(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            send(txn, &mut doc, by)
        })
    }

    /// Documents whose last call ended at or before now.
    ///
    /// # Errors
    ///
    /// Storage failure listing the candidates; per-document failures come
    /// out of the iterator.
    pub fn expired_last_calls(&self) -> Result<ExpiredLastCalls<'_>> {
        let txn = self.reader();
        let mut candidates = query::docs_in_state(txn.conn, draft_iesg::TYPE, draft_iesg::LC)?;
        candidates.extend(query::docs_in_state(txn.conn, statchg::TYPE, statchg::IN_LC)?);
        Ok(ExpiredLastCalls {
            txn,
            candidates: candidates.into_iter(),
        })
    }

    /// Expire one last call as the system actor. Repeating it is a no-op.
    ///
    /// # Errors
    ///
    /// Not-found and storage failures.
    pub fn expire_last_call(&mut self, name: &str) -> Result<Vec<Event>> {
        let system = PersonId::system();
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            expire(txn, &mut doc, &system)
        })
    }

    /// Expire every finished last call, each in its own transaction. A
    /// failure on one document is reported and the sweep goes on.
    ///
    /// # Errors
    ///
    /// Storage failure listing candidates or recording the sweep time.
    pub fn run_last_call_sweep(&mut self) -> Result<SweepReport> {
        let now = self.now();
        let due: Vec<Result<ExpiredLastCall>> = self.expired_last_calls()?.collect();
        let mut report = SweepReport::default();
        for item in due {
            let found = match item {
                Ok(found) => found,
                Err(err) => {
                    warn!(error = %err, "could not read last call");
                    report.failed.push((String::new(), err.to_string()));
                    continue;
                }
            };
            match self.expire_last_call(&found.name) {
                Ok(events) if events.is_empty() => report.skipped.push(found.name),
                Ok(_) => report.expired.push(found.name),
                Err(err) => {
                    warn!(doc = %found.name, error = %err, "last call expiry failed");
                    report.failed.push((found.name, err.to_string()));
                }
            }
        }
        self.transact(|txn| store::set_last_sweep(txn.conn, now))?;
        info!(
            expired = report.expired.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "last call sweep finished"
        );
        Ok(report)
    }

    /// When the sweep last ran.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn last_sweep(&self) -> Result<Option<DateTime<Utc>>> {
        query::last_sweep(self.connection())
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::defaults::{draft_iesg, statchg};
    use crate::clock::{Clock, FixedClock};
    use crate::collab::{MemoryMailer, WriteupKind};
    use crate::docket::{Docket, DocketBuilder};
    use crate::documents::NewDocument;
    use crate::error::ErrorCode;
    use crate::event::EventType;
    use crate::model::names::{DocKind, GroupKind, StdLevel};
    use crate::model::person::PersonId;
    use crate::model::relation::RelationKind;
    use chrono::{Duration, TimeZone, Utc};

    fn ad() -> PersonId {
        PersonId::new("ad")
    }

    fn setup() -> (Docket, FixedClock, MemoryMailer) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 11, 2, 15, 30, 0).unwrap());
        let mailer = MemoryMailer::new();
        let mut docket = DocketBuilder::new()
            .clock(clock.clone())
            .mailer(mailer.clone())
            .in_memory()
            .unwrap();
        let mut new = NewDocument::new("draft-ietf-foo-bar", DocKind::Draft, "Foo")
            .state(draft_iesg::TYPE, draft_iesg::AD_EVAL);
        new.group.kind = GroupKind::WorkingGroup;
        new.group.acronym = "foo".into();
        docket.create_document(new, &ad()).unwrap();
        (docket, clock, mailer)
    }

    fn state(docket: &Docket) -> String {
        docket
            .document("draft-ietf-foo-bar")
            .unwrap()
            .state_slug(draft_iesg::TYPE)
            .unwrap()
            .to_string()
    }

    #[test]
    fn requesting_twice_is_a_precondition_failure() {
        let (mut docket, _, _) = setup();
        docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        assert_eq!(state(&docket), draft_iesg::LC_REQ);
        let err = docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LastCallAlreadyRequested);
    }

    #[test]
    fn send_requires_a_request() {
        let (mut docket, _, _) = setup();
        let err = docket.send_last_call("draft-ietf-foo-bar", &ad()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnexpectedPriorState);
    }

    #[test]
    fn working_group_last_call_ends_at_midnight_fourteen_days_out() {
        let (mut docket, _, mailer) = setup();
        docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        docket.send_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        assert_eq!(state(&docket), draft_iesg::LC);

        let summary = docket.state_summary("draft-ietf-foo-bar").unwrap();
        assert_eq!(
            summary.last_call_expires,
            Some(Utc.with_ymd_and_hms(2026, 11, 16, 0, 0, 0).unwrap())
        );
        assert_eq!(summary.summary, "In Last Call (ends 2026-11-16)");
        assert!(mailer.sent().iter().any(|m| m.subject.starts_with("Last Call: <draft-ietf-foo-bar-00.txt>")));
    }

    #[test]
    fn individual_submissions_get_the_extension() {
        let (mut docket, _, _) = setup();
        docket
            .create_document(
                NewDocument::new("draft-smith-thing", DocKind::Draft, "Thing")
                    .state(draft_iesg::TYPE, draft_iesg::AD_EVAL),
                &ad(),
            )
            .unwrap();
        docket.request_last_call("draft-smith-thing", &ad()).unwrap();
        docket.send_last_call("draft-smith-thing", &ad()).unwrap();
        let summary = docket.state_summary("draft-smith-thing").unwrap();
        assert_eq!(
            summary.last_call_expires,
            Some(Utc.with_ymd_and_hms(2026, 11, 30, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn sweep_only_expires_finished_last_calls_once() {
        let (mut docket, clock, _) = setup();
        docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        docket.send_last_call("draft-ietf-foo-bar", &ad()).unwrap();

        clock.advance(Duration::days(2));
        assert_eq!(docket.expired_last_calls().unwrap().count(), 0);
        let report = docket.run_last_call_sweep().unwrap();
        assert!(report.expired.is_empty());
        assert_eq!(state(&docket), draft_iesg::LC);

        clock.set(Utc.with_ymd_and_hms(2026, 11, 16, 0, 0, 0).unwrap());
        let before = docket.events("draft-ietf-foo-bar").unwrap().len();
        let report = docket.run_last_call_sweep().unwrap();
        assert_eq!(report.expired, ["draft-ietf-foo-bar"]);
        assert_eq!(state(&docket), draft_iesg::WRITEUP_NEEDED);
        let events = docket.events("draft-ietf-foo-bar").unwrap();
        let changed: Vec<_> = events[..events.len() - before]
            .iter()
            .filter(|e| e.event_type == EventType::ChangedState)
            .map(|e| e.by.clone())
            .collect();
        assert_eq!(changed, [PersonId::system()]);
        assert_eq!(docket.last_sweep().unwrap(), Some(clock.now()));

        assert!(docket.expire_last_call("draft-ietf-foo-bar").unwrap().is_empty());
        assert!(docket.run_last_call_sweep().unwrap().expired.is_empty());
    }

    #[test]
    fn edited_writeup_routes_to_go_ahead() {
        let (mut docket, clock, _) = setup();
        docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        docket.send_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        docket
            .update_writeup(
                "draft-ietf-foo-bar",
                &ad(),
                WriteupKind::BallotWriteup,
                "Technical Summary\n\n  Foo makes bar interoperable.",
            )
            .unwrap();
        clock.advance(Duration::days(30));
        docket.run_last_call_sweep().unwrap();
        assert_eq!(state(&docket), draft_iesg::GO_AHEAD);
    }

    #[test]
    fn downref_in_last_call_text_sends_a_notice() {
        let (mut docket, clock, mailer) = setup();
        let mut rfc = NewDocument::new("rfc1234", DocKind::Rfc, "Old");
        rfc.std_level = Some(StdLevel::Informational);
        docket.create_document(rfc, &ad()).unwrap();
        docket
            .edit_attributes(
                "draft-ietf-foo-bar",
                &ad(),
                crate::documents::AttributeEdit {
                    intended_std_level: Some(Some(StdLevel::ProposedStandard)),
                    ..Default::default()
                },
            )
            .unwrap();
        docket
            .add_relation("draft-ietf-foo-bar", &ad(), RelationKind::RefNormative, "rfc1234")
            .unwrap();

        docket.request_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        docket.send_last_call("draft-ietf-foo-bar", &ad()).unwrap();
        clock.advance(Duration::days(15));
        docket.run_last_call_sweep().unwrap();

        let notice = mailer
            .sent()
            .into_iter()
            .find(|m| m.subject == "Downward references in draft-ietf-foo-bar")
            .expect("downref notice");
        assert!(notice.body.contains("rfc1234"));
    }

    #[test]
    fn status_change_goes_to_go_ahead() {
        let (mut docket, clock, _) = setup();
        docket
            .create_document(
                NewDocument::new("status-change-x", DocKind::StatusChange, "X")
                    .state(statchg::TYPE, statchg::EVALUATION),
                &ad(),
            )
            .unwrap();
        docket.request_last_call("status-change-x", &ad()).unwrap();
        docket.send_last_call("status-change-x", &ad()).unwrap();
        clock.advance(Duration::days(60));
        let report = docket.run_last_call_sweep().unwrap();
        assert!(report.expired.contains(&"status-change-x".to_string()));
        let doc = docket.document("status-change-x").unwrap();
        assert_eq!(doc.state_slug(statchg::TYPE), Some(statchg::GO_AHEAD));
    }
}
