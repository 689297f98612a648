//! The append-only event log model.
//!
//! Every mutation of a document is explained by at least one [`Event`].
//! Events are ordered by `(time, id)`; `id` is the SQLite AUTOINCREMENT
//! sequence and breaks ties between events stamped with the same instant.

pub mod data;
pub mod types;

pub use data::{
    ActionHoldersData, BallotData, ChangedFieldsData, DataParseError, EventData, LastCallData,
    NewRevisionData, PositionData, RelationData, StateChangeData, TelechatData, WriteupData,
};
pub use types::{EventType, UnknownEventType};

use crate::model::document::Document;
use crate::model::person::PersonId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Log sequence number; 0 until the event is appended.
    pub id: i64,
    pub time: DateTime<Utc>,
    pub by: PersonId,
    pub doc: String,
    /// Document revision when the event happened.
    pub rev: String,
    pub event_type: EventType,
    pub desc: String,
    pub data: EventData,
}

impl Event {
    pub fn new(
        doc: &Document,
        by: &PersonId,
        time: DateTime<Utc>,
        desc: impl Into<String>,
        data: EventData,
    ) -> Self {
        Self {
            id: 0,
            time,
            by: by.clone(),
            doc: doc.name.clone(),
            rev: doc.rev.clone(),
            event_type: data.event_type(),
            desc: desc.into(),
            data,
        }
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id > 0
    }
}
