//! Aggregating a ballot's positions for display and for the verdict.

use crate::ballot::criteria::{NeededPositions, needed_positions};
use crate::ballot::engine::{ballot_type, load_ballot};
use crate::ballot::history::prior_positions;
use crate::ballot::types::{Ballot, BallotPosition, PositionKind};
use crate::db::query;
use crate::docket::{Docket, Txn};
use crate::error::Result;
use crate::model::person::PersonId;
use crate::relations;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One balloter's standing on a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSummary {
    pub balloter: PersonId,
    pub name: String,
    pub pos: PositionKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discuss: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// `None` for the synthetic no-record of someone who has not voted.
    pub time: Option<DateTime<Utc>>,
    /// Earlier positions, compacted, newest first.
    pub prior: Vec<PositionKind>,
}

/// Read-only view of a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallotTally {
    pub ballot: Ballot,
    pub ballot_name: String,
    pub question: String,
    /// Current voting roster, in roster order.
    pub active: Vec<PositionSummary>,
    /// Positions of people no longer on the roster; not counted.
    pub historic: Vec<PositionSummary>,
    pub needed: NeededPositions,
}

impl BallotTally {
    /// `needed` rendered as the fixed-vocabulary sentence.
    #[must_use]
    pub fn verdict(&self) -> String {
        self.needed.to_string()
    }
}

fn summarize(
    txn: &Txn<'_>,
    balloter: &PersonId,
    history: &[&BallotPosition],
) -> Option<PositionSummary> {
    let (current, _) = history.split_first()?;
    let sequence: Vec<PositionKind> = history.iter().map(|p| p.pos).collect();
    Some(PositionSummary {
        balloter: balloter.clone(),
        name: txn.person_name(balloter),
        pos: current.pos,
        discuss: current.discuss.clone(),
        comment: current.comment.clone(),
        time: Some(current.time),
        prior: prior_positions(&sequence),
    })
}

pub(crate) fn tally(txn: &Txn<'_>, ballot: Ballot) -> Result<BallotTally> {
    let doc = txn.document(&ballot.doc)?;
    let ty = ballot_type(txn, &doc, &ballot)?;
    let members = txn.roster.active_members(ty);

    // Newest first, so each balloter's slice starts with the current one.
    let positions = query::positions_for(txn.conn, ballot.id)?;
    let mut by_balloter: BTreeMap<&PersonId, Vec<&BallotPosition>> = BTreeMap::new();
    for pos in &positions {
        by_balloter.entry(&pos.balloter).or_default().push(pos);
    }

    let mut active = Vec::with_capacity(members.len());
    for member in &members {
        let history = by_balloter.remove(&member.id).unwrap_or_default();
        match summarize(txn, &member.id, &history) {
            Some(summary) => active.push(summary),
            None if ballot.is_open() => active.push(PositionSummary {
                balloter: member.id.clone(),
                name: member.name.clone(),
                pos: PositionKind::NoRecord,
                discuss: String::new(),
                comment: String::new(),
                time: None,
                prior: Vec::new(),
            }),
            None => {}
        }
    }
    let historic: Vec<PositionSummary> = by_balloter
        .iter()
        .filter_map(|(balloter, history)| summarize(txn, balloter, history))
        .collect();

    let targets = relations::status_change_targets(txn, &doc)?;
    let current: Vec<PositionKind> = active.iter().map(|s| s.pos).collect();
    let needed = needed_positions(&doc, &targets, &current, members.len())?;

    Ok(BallotTally {
        ballot_name: ty.name.clone(),
        question: ty.question.clone(),
        ballot,
        active,
        historic,
        needed,
    })
}

impl Docket {
    /// # Errors
    ///
    /// Not-found, quota out of range, storage failures.
    pub fn tally(&self, ballot_id: i64) -> Result<BallotTally> {
        let reader = self.reader();
        let ballot = load_ballot(&reader, ballot_id)?;
        tally(&reader, ballot)
    }

    /// Tally of the newest ballot on `name`; `None` if it never had one.
    ///
    /// # Errors
    ///
    /// Not-found, quota out of range, storage failures.
    pub fn ballot_tally(&self, name: &str) -> Result<Option<BallotTally>> {
        let reader = self.reader();
        reader.document(name)?;
        let Some(ballot) = query::ballots_for(reader.conn, name)?.into_iter().next() else {
            return Ok(None);
        };
        tally(&reader, ballot).map(Some)
    }
}
