//! Ballot workflows layered on the state-change orchestrator: issuing,
//! deferring and approving.

use crate::ballot::engine::{self, PositionInput};
use crate::ballot::types::{Ballot, PositionKind};
use crate::catalog::defaults::{conflrev, draft_iesg, statchg};
use crate::collab::{OutgoingMail, WriteupKind};
use crate::db::query;
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData};
use crate::model::document::Document;
use crate::model::names::DocKind;
use crate::model::person::PersonId;
use crate::telechat;
use crate::transition::{self, StateChange};
use crate::writeups;
use tracing::info;

/// `(state type, evaluation, deferred)` for kinds that can be deferred.
fn evaluation_states(kind: DocKind) -> Option<(&'static str, &'static str, &'static str)> {
    match kind {
        DocKind::Draft => Some((draft_iesg::TYPE, draft_iesg::EVALUATION, draft_iesg::DEFER)),
        DocKind::StatusChange => Some((statchg::TYPE, statchg::EVALUATION, statchg::DEFER)),
        DocKind::ConflictReview => Some((conflrev::TYPE, conflrev::EVALUATION, conflrev::DEFER)),
        DocKind::Charter | DocKind::Rfc => None,
    }
}

fn unexpected(doc: &Document, action: &str) -> DocketError {
    let current = doc
        .kind
        .iesg_state_type()
        .and_then(|t| doc.get_state(t))
        .map_or("no IESG state", |s| s.name.as_str());
    DocketError::precondition(
        ErrorCode::UnexpectedPriorState,
        format!("cannot {action} {} from {current}", doc.name),
    )
}

fn require_open(txn: &Txn<'_>, doc: &Document) -> Result<Ballot> {
    let ty = txn.ballots.resolve(doc.kind, None)?;
    query::open_ballot(txn.conn, &doc.name, &ty.slug)?.ok_or_else(|| {
        DocketError::precondition(
            ErrorCode::BallotNotOpen,
            format!("{} has no open \"{}\" ballot", doc.name, ty.name),
        )
    })
}

fn issue(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    ballot_type: Option<&str>,
) -> Result<(Ballot, Vec<Event>)> {
    let prev = doc.clone();
    let (ballot, created) = engine::create_if_not_open(txn, doc, by, ballot_type)?;
    let mut events: Vec<Event> = created.into_iter().collect();

    if let Some((state_type, evaluation, deferred)) = evaluation_states(doc.kind) {
        let current = doc.state_slug(state_type);
        if current != Some(evaluation) && current != Some(deferred) {
            events.extend(transition::apply(txn, doc, by, &StateChange::to(state_type, evaluation))?);
        }
    }
    let opened = !events.is_empty();
    let writeup = writeups::current_or_generate(txn, doc, by, WriteupKind::BallotWriteup, &mut events)?;

    let mut saved = if events.is_empty() {
        Vec::new()
    } else {
        transition::finish(txn, &prev, doc, by, events)?
    };

    if let Some(ad) = doc.ad.clone() {
        if query::current_position(txn.conn, ballot.id, &ad)?.is_none() {
            saved.extend(engine::record(txn, doc, &ballot, &ad, by, PositionInput::new(PositionKind::Yes))?);
        }
    }

    // Re-issuing an open ballot in evaluation announces nothing.
    if opened {
        txn.queue_mail(OutgoingMail::new(
            doc.name.clone(),
            vec![txn.settings.mail.iesg.clone()],
            format!("Evaluation: {} - {}", doc.name, doc.title),
            writeup,
        ));
        info!(doc = %doc.name, ballot = ballot.id, "ballot issued");
    }
    Ok((ballot, saved))
}

fn defer(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let Some((state_type, evaluation, deferred)) = evaluation_states(doc.kind) else {
        return Err(unexpected(doc, "defer"));
    };
    if doc.state_slug(state_type) != Some(evaluation) {
        return Err(unexpected(doc, "defer"));
    }
    require_open(txn, doc)?;
    let date = telechat::nth_upcoming(txn, 1)?;

    let prev = doc.clone();
    let mut events: Vec<Event> = transition::apply(txn, doc, by, &StateChange::to(state_type, deferred))?
        .into_iter()
        .collect();
    events.extend(telechat::schedule_event(txn, doc, by, Some(date))?);
    info!(doc = %doc.name, %date, "deferred");
    transition::finish(txn, &prev, doc, by, events)
}

fn undefer(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let Some((state_type, evaluation, deferred)) = evaluation_states(doc.kind) else {
        return Err(unexpected(doc, "undefer"));
    };
    if doc.state_slug(state_type) != Some(deferred) {
        return Err(unexpected(doc, "undefer"));
    }
    let date = telechat::nth_upcoming(txn, 0)?;

    let prev = doc.clone();
    let (_, created) = engine::create_if_not_open(txn, doc, by, None)?;
    let mut events: Vec<Event> = created.into_iter().collect();
    events.extend(transition::apply(txn, doc, by, &StateChange::to(state_type, evaluation))?);
    events.extend(telechat::schedule_event(txn, doc, by, Some(date))?);
    info!(doc = %doc.name, %date, "undeferred");
    transition::finish(txn, &prev, doc, by, events)
}

fn approve(txn: &Txn<'_>, doc: &mut Document, by: &PersonId) -> Result<Vec<Event>> {
    let (state_type, target) = match doc.kind {
        DocKind::Draft
            if matches!(
                doc.state_slug(draft_iesg::TYPE),
                Some(draft_iesg::EVALUATION | draft_iesg::DEFER)
            ) =>
        {
            (draft_iesg::TYPE, draft_iesg::ANNOUNCED)
        }
        DocKind::StatusChange
            if matches!(
                doc.state_slug(statchg::TYPE),
                Some(statchg::EVALUATION | statchg::DEFER)
            ) =>
        {
            (statchg::TYPE, statchg::APPROVED_SENT)
        }
        _ => return Err(unexpected(doc, "approve")),
    };

    let prev = doc.clone();
    let mut events: Vec<Event> = transition::apply(txn, doc, by, &StateChange::to(state_type, target))?
        .into_iter()
        .collect();
    events.push(Event::new(
        doc,
        by,
        txn.now,
        "IESG has approved the document",
        EventData::IesgApproved,
    ));
    events.extend(engine::close_open(txn, doc, by)?);
    let announcement = writeups::current_or_generate(txn, doc, by, WriteupKind::BallotApproval, &mut events)?;
    let saved = transition::finish(txn, &prev, doc, by, events)?;

    let action = if doc.intended_std_level.is_some_and(|l| l.is_standards_track_or_bcp()) {
        "Protocol Action"
    } else {
        "Document Action"
    };
    let mail = &txn.settings.mail;
    txn.queue_mail(OutgoingMail::new(
        doc.name.clone(),
        vec![mail.announce.clone(), mail.iesg.clone()],
        format!("{action}: '{}' ({})", doc.title, doc.name),
        announcement,
    ));
    info!(doc = %doc.name, "approved");
    Ok(saved)
}

impl Docket {
    /// Open the ballot, move the document into evaluation, and record a
    /// "yes" for the responsible AD if they have no position yet.
    ///
    /// # Errors
    ///
    /// Validation failure for an unknown ballot type; writeup-generator,
    /// not-found and storage failures.
    pub fn issue_ballot(
        &mut self,
        name: &str,
        by: &PersonId,
        ballot_type: Option<&str>,
    ) -> Result<(Ballot, Vec<Event>)> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            issue(txn, &mut doc, by, ballot_type)
        })
    }

    /// Move an evaluated document to deferred and onto the second upcoming
    /// telechat. The ballot stays open.
    ///
    /// # Errors
    ///
    /// Precondition failure when the document is not in evaluation, has no
    /// open ballot, or the calendar has fewer than two upcoming telechats.
    pub fn defer_ballot(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            defer(txn, &mut doc, by)
        })
    }

    /// Back to evaluation on the first upcoming telechat; reopens the
    /// ballot if it was closed meanwhile.
    ///
    /// # Errors
    ///
    /// Precondition failure when the document is not deferred or there is
    /// no upcoming telechat.
    pub fn undefer_ballot(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            undefer(txn, &mut doc, by)
        })
    }

    /// Approve and announce; closes open ballots.
    ///
    /// # Errors
    ///
    /// Precondition failure for a kind or state that cannot be approved;
    /// writeup-generator, not-found and storage failures.
    pub fn approve_ballot(&mut self, name: &str, by: &PersonId) -> Result<Vec<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            approve(txn, &mut doc, by)
        })
    }
}
