//! Human-readable status line per document kind, and the `show` view.

use crate::catalog::defaults::{draft, draft_iesg, statchg};
use crate::db::query;
use crate::docket::Docket;
use crate::error::Result;
use crate::event::{EventData, EventType};
use crate::model::document::Document;
use crate::model::names::DocKind;
use crate::model::person::PersonId;
use crate::model::relation::RelationKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Facts outside the document row that the status line depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryInputs {
    /// Expiry of the most recent last call sent.
    pub last_call_expires: Option<DateTime<Utc>>,
    /// Documents that replace this one.
    pub replaced_by: Vec<String>,
}

/// Canonical status line. Pure over the document and `inputs`.
#[must_use]
pub fn friendly_state(doc: &Document, inputs: &SummaryInputs) -> String {
    let Some(primary) = doc.primary_state() else {
        return "Unknown state".to_string();
    };
    if doc.kind != DocKind::Draft {
        return primary.name.clone();
    }

    let iesg = doc.get_state(draft_iesg::TYPE);
    let iesg_dead = iesg.is_some_and(|s| s.slug == draft_iesg::DEAD);
    match primary.slug.as_str() {
        draft::ACTIVE => match iesg {
            Some(state) if state.slug == draft_iesg::ID_EXISTS => "I-D Exists".to_string(),
            Some(_) if iesg_dead => "I-D Exists (IESG: Dead)".to_string(),
            Some(state) => {
                let mut text = state.name.clone();
                if let Some(sub) = doc.substate {
                    text.push_str("::");
                    text.push_str(sub.name());
                }
                if state.slug == draft_iesg::LC {
                    if let Some(expires) = inputs.last_call_expires {
                        text.push_str(&format!(" (ends {})", expires.date_naive()));
                    }
                }
                text
            }
            None => "I-D Exists".to_string(),
        },
        draft::REPLACED if inputs.replaced_by.is_empty() => "Replaced".to_string(),
        draft::REPLACED => format!("Replaced by {}", inputs.replaced_by.join(", ")),
        draft::RFC => {
            let mut text = doc
                .rfc_number
                .map_or_else(|| "RFC".to_string(), |n| format!("RFC {n}"));
            if let Some(level) = doc.std_level.or(doc.intended_std_level) {
                text.push_str(&format!(" ({})", level.name()));
            }
            text
        }
        _ if iesg_dead => format!("{} (IESG: Dead)", primary.name),
        _ => primary.name.clone(),
    }
}

/// One row of the per-dimension state listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionState {
    pub state_type: String,
    pub label: String,
    pub slug: String,
    pub name: String,
    pub next: Vec<String>,
}

/// Read-only overview of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub name: String,
    pub kind: DocKind,
    pub title: String,
    pub rev: String,
    pub summary: String,
    pub states: Vec<DimensionState>,
    pub substate: Option<String>,
    pub tags: BTreeSet<String>,
    pub action_holders: Vec<PersonId>,
    pub last_call_expires: Option<DateTime<Utc>>,
    pub time: DateTime<Utc>,
}

impl Docket {
    /// Gather what [`friendly_state`] needs from the log and edge table.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn summary_inputs(&self, doc: &Document) -> Result<SummaryInputs> {
        let conn = self.connection();
        let in_last_call = doc.state_slug(draft_iesg::TYPE) == Some(draft_iesg::LC)
            || doc.state_slug(statchg::TYPE) == Some(statchg::IN_LC);
        let last_call_expires = if in_last_call {
            query::latest_event(conn, &doc.name, &[EventType::SentLastCall])?.and_then(|e| match e.data {
                EventData::SentLastCall(data) => Some(data.expires),
                _ => None,
            })
        } else {
            None
        };
        let replaced_by = query::relations_to(conn, &doc.name)?
            .into_iter()
            .filter(|r| r.kind == RelationKind::Replaces)
            .map(|r| r.source)
            .collect();
        Ok(SummaryInputs {
            last_call_expires,
            replaced_by,
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn state_summary(&self, name: &str) -> Result<StateSummary> {
        let doc = self.document(name)?;
        let inputs = self.summary_inputs(&doc)?;
        let catalog = self.catalog();
        let states = doc
            .states
            .iter()
            .map(|state| DimensionState {
                state_type: state.state_type.clone(),
                label: catalog
                    .state_type(&state.state_type)
                    .map_or_else(|| state.state_type.clone(), |t| t.label.clone()),
                slug: state.slug.clone(),
                name: state.name.clone(),
                next: catalog
                    .next_states(state)
                    .into_iter()
                    .map(|s| s.slug.clone())
                    .collect(),
            })
            .collect();
        Ok(StateSummary {
            summary: friendly_state(&doc, &inputs),
            name: doc.name,
            kind: doc.kind,
            title: doc.title,
            rev: doc.rev,
            states,
            substate: doc.substate.map(|s| s.as_str().to_string()),
            tags: doc.tags,
            action_holders: doc.action_holders.into_iter().collect(),
            last_call_expires: inputs.last_call_expires,
            time: doc.time,
        })
    }
}
