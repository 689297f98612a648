//! Document-to-document edges, read both ways from one table.

use crate::ballot::criteria::StatusChangeTarget;
use crate::catalog::defaults::draft;
use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData, RelationData};
use crate::history::save_with_history;
use crate::model::document::Document;
use crate::model::names::DocKind;
use crate::model::person::PersonId;
use crate::model::relation::{Relation, RelationKind};
use crate::transition::{self, StateChange};
use tracing::info;

fn invalid(reason: String) -> DocketError {
    DocketError::validation(ErrorCode::InvalidRelation, reason)
}

fn validate(txn: &Txn<'_>, relation: &Relation) -> Result<()> {
    if relation.target.trim().is_empty() {
        return Err(invalid(format!("{} relationship needs a target", relation.kind)));
    }
    if relation.source == relation.target {
        return Err(invalid(format!("{} cannot relate to itself", relation.source)));
    }
    if !query::document_exists(txn.conn, &relation.target)? {
        return Err(invalid(format!("unknown target document '{}'", relation.target)));
    }
    Ok(())
}

pub(crate) fn add_relation(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    kind: RelationKind,
    target: &str,
) -> Result<Option<Event>> {
    let relation = Relation::new(doc.name.clone(), kind, target);
    validate(txn, &relation)?;
    if query::relations_from(txn.conn, &doc.name)?.contains(&relation) {
        return Ok(None);
    }
    let mut events = [Event::new(
        doc,
        by,
        txn.now,
        format!("Added \"{}\" relationship to {target}", kind.name()),
        EventData::AddedRelationship(RelationData {
            kind,
            target: target.to_string(),
        }),
    )];
    save_with_history(txn, doc, &mut events)?;
    store::insert_relation(txn.conn, &relation)?;
    let [event] = events;
    Ok(Some(event))
}

fn remove_relation(
    txn: &Txn<'_>,
    doc: &mut Document,
    by: &PersonId,
    kind: RelationKind,
    target: &str,
) -> Result<Option<Event>> {
    let relation = Relation::new(doc.name.clone(), kind, target);
    if !query::relations_from(txn.conn, &doc.name)?.contains(&relation) {
        return Ok(None);
    }
    let mut events = [Event::new(
        doc,
        by,
        txn.now,
        format!("Removed \"{}\" relationship to {target}", kind.name()),
        EventData::RemovedRelationship(RelationData {
            kind,
            target: target.to_string(),
        }),
    )];
    save_with_history(txn, doc, &mut events)?;
    store::delete_relation(txn.conn, &relation)?;
    let [event] = events;
    Ok(Some(event))
}

/// Normative references to documents of lower maturity than `doc` aims
/// for, minus the ones already approved.
pub(crate) fn downrefs(txn: &Txn<'_>, doc: &Document) -> Result<Vec<String>> {
    let Some(own_level) = doc.intended_std_level else {
        return Ok(Vec::new());
    };
    let edges = query::relations_from(txn.conn, &doc.name)?;
    let approved: Vec<&str> = edges
        .iter()
        .filter(|r| r.kind == RelationKind::DownrefApproval)
        .map(|r| r.target.as_str())
        .collect();

    let mut found = Vec::new();
    for edge in edges.iter().filter(|r| r.kind == RelationKind::RefNormative) {
        if approved.contains(&edge.target.as_str()) {
            continue;
        }
        let Some(target) = store::load_document(txn.conn, txn.catalog, &edge.target)? else {
            continue;
        };
        let level = target.std_level.or(target.intended_std_level);
        if level.is_some_and(|l| l.maturity() < own_level.maturity()) {
            found.push(edge.target.clone());
        }
    }
    Ok(found)
}

/// RFCs a status change moves, with their current levels.
pub(crate) fn status_change_targets(txn: &Txn<'_>, doc: &Document) -> Result<Vec<StatusChangeTarget>> {
    if doc.kind != DocKind::StatusChange {
        return Ok(Vec::new());
    }
    let mut targets = Vec::new();
    for edge in query::relations_from(txn.conn, &doc.name)? {
        if !edge.kind.is_status_change() {
            continue;
        }
        let current_level = store::load_document(txn.conn, txn.catalog, &edge.target)?
            .and_then(|t| t.std_level.or(t.intended_std_level));
        targets.push(StatusChangeTarget {
            kind: edge.kind,
            current_level,
        });
    }
    Ok(targets)
}

fn filter(relations: Vec<Relation>, kinds: &[RelationKind]) -> Vec<Relation> {
    relations
        .into_iter()
        .filter(|r| kinds.is_empty() || kinds.contains(&r.kind))
        .collect()
}

impl Docket {
    /// Add `name --kind--> target`. Returns `None` if the edge existed.
    ///
    /// # Errors
    ///
    /// Validation failure for an empty, self or unknown target; not-found
    /// for `name`; storage failures.
    pub fn add_relation(
        &mut self,
        name: &str,
        by: &PersonId,
        kind: RelationKind,
        target: &str,
    ) -> Result<Option<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            add_relation(txn, &mut doc, by, kind, target)
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn remove_relation(
        &mut self,
        name: &str,
        by: &PersonId,
        kind: RelationKind,
        target: &str,
    ) -> Result<Option<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            remove_relation(txn, &mut doc, by, kind, target)
        })
    }

    /// Outgoing edges of `name`, optionally limited to `kinds`.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn related_that_doc(&self, name: &str, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        Ok(filter(query::relations_from(self.connection(), name)?, kinds))
    }

    /// Incoming edges of `name`, optionally limited to `kinds`.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn related_that(&self, name: &str, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        Ok(filter(query::relations_to(self.connection(), name)?, kinds))
    }

    /// `replacing` replaces `replaced`: the edge is written on `replacing`,
    /// then `replaced` moves to the replaced state in a second, independent
    /// transaction.
    ///
    /// # Errors
    ///
    /// Validation failure when either document is not a draft; the
    /// failures of the two underlying writes.
    pub fn mark_replaced(
        &mut self,
        replacing: &str,
        replaced: &str,
        by: &PersonId,
    ) -> Result<Vec<Event>> {
        for name in [replacing, replaced] {
            if self.document(name)?.kind != DocKind::Draft {
                return Err(invalid(format!("{name} is not a draft")));
            }
        }
        let mut events: Vec<Event> = self
            .add_relation(replacing, by, RelationKind::Replaces, replaced)?
            .into_iter()
            .collect();
        let comment = format!("Replaced by {replacing}");
        events.extend(self.change_state(
            replaced,
            by,
            &StateChange::to(draft::TYPE, draft::REPLACED),
            Some(&comment),
        )?);
        info!(replacing, replaced, "marked replaced");
        Ok(events)
    }

    /// Approve `target` as a downward reference of `name`.
    ///
    /// # Errors
    ///
    /// Validation failure when `target` is not an unapproved downref of
    /// `name`; not-found and storage failures.
    pub fn approve_downref(&mut self, name: &str, target: &str, by: &PersonId) -> Result<Vec<Event>> {
        let mut events = self.transact(|txn| {
            let mut doc = txn.document(name)?;
            if !downrefs(txn, &doc)?.iter().any(|d| d == target) {
                return Err(invalid(format!("{target} is not an unapproved downref of {name}")));
            }
            let relation = Relation::new(name, RelationKind::DownrefApproval, target);
            let prev = doc.clone();
            let event = Event::new(
                &doc,
                by,
                txn.now,
                format!("Downref to {target} approved"),
                EventData::DownrefApproved(RelationData {
                    kind: RelationKind::DownrefApproval,
                    target: target.to_string(),
                }),
            );
            let saved = transition::finish(txn, &prev, &mut doc, by, vec![event])?;
            store::insert_relation(txn.conn, &relation)?;
            Ok(saved)
        })?;
        let note = format!("Approved as a downward reference from {name}");
        events.push(self.add_comment(target, by, &note)?);
        Ok(events)
    }

    /// Unapproved downrefs of `name`.
    ///
    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn downrefs(&self, name: &str) -> Result<Vec<String>> {
        let reader = self.reader();
        let doc = reader.document(name)?;
        downrefs(&reader, &doc)
    }
}
