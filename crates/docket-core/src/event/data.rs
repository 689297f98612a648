//! Typed payloads for each event type.
//!
//! The discriminant lives in the `event_type` column, not in the JSON, so
//! `EventData` serializes as the bare inner struct and is read back with
//! [`EventData::deserialize_for`].

use crate::ballot::types::PositionKind;
use crate::model::names::IesgSubstate;
use crate::model::person::PersonId;
use crate::model::relation::RelationKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::types::EventType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    NewRevision(NewRevisionData),
    ChangedState(StateChangeData),
    ChangedDocument(ChangedFieldsData),
    /// The comment text is the event description.
    AddedComment,
    CreatedBallot(BallotData),
    ClosedBallot(BallotData),
    ChangedBallotPosition(PositionData),
    ScheduledForTelechat(TelechatData),
    ChangedLastCallText(WriteupData),
    ChangedBallotWriteupText(WriteupData),
    ChangedBallotApprovalText(WriteupData),
    RequestedLastCall,
    SentLastCall(LastCallData),
    ChangedActionHolders(ActionHoldersData),
    AddedRelationship(RelationData),
    RemovedRelationship(RelationData),
    DownrefApproved(RelationData),
    IesgApproved,
}

impl EventData {
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::NewRevision(_) => EventType::NewRevision,
            Self::ChangedState(_) => EventType::ChangedState,
            Self::ChangedDocument(_) => EventType::ChangedDocument,
            Self::AddedComment => EventType::AddedComment,
            Self::CreatedBallot(_) => EventType::CreatedBallot,
            Self::ClosedBallot(_) => EventType::ClosedBallot,
            Self::ChangedBallotPosition(_) => EventType::ChangedBallotPosition,
            Self::ScheduledForTelechat(_) => EventType::ScheduledForTelechat,
            Self::ChangedLastCallText(_) => EventType::ChangedLastCallText,
            Self::ChangedBallotWriteupText(_) => EventType::ChangedBallotWriteupText,
            Self::ChangedBallotApprovalText(_) => EventType::ChangedBallotApprovalText,
            Self::RequestedLastCall => EventType::RequestedLastCall,
            Self::SentLastCall(_) => EventType::SentLastCall,
            Self::ChangedActionHolders(_) => EventType::ChangedActionHolders,
            Self::AddedRelationship(_) => EventType::AddedRelationship,
            Self::RemovedRelationship(_) => EventType::RemovedRelationship,
            Self::DownrefApproved(_) => EventType::DownrefApproved,
            Self::IesgApproved => EventType::IesgApproved,
        }
    }

    /// Deserialize a stored payload for a known event type.
    ///
    /// # Errors
    ///
    /// Returns a [`DataParseError`] if the JSON does not match the schema
    /// for `event_type`.
    pub fn deserialize_for(event_type: EventType, json: &str) -> Result<Self, DataParseError> {
        let result = match event_type {
            EventType::NewRevision => serde_json::from_str(json).map(Self::NewRevision),
            EventType::ChangedState => serde_json::from_str(json).map(Self::ChangedState),
            EventType::ChangedDocument => serde_json::from_str(json).map(Self::ChangedDocument),
            EventType::AddedComment => {
                serde_json::from_str::<serde_json::Value>(json).map(|_| Self::AddedComment)
            }
            EventType::CreatedBallot => serde_json::from_str(json).map(Self::CreatedBallot),
            EventType::ClosedBallot => serde_json::from_str(json).map(Self::ClosedBallot),
            EventType::ChangedBallotPosition => {
                serde_json::from_str(json).map(Self::ChangedBallotPosition)
            }
            EventType::ScheduledForTelechat => {
                serde_json::from_str(json).map(Self::ScheduledForTelechat)
            }
            EventType::ChangedLastCallText => {
                serde_json::from_str(json).map(Self::ChangedLastCallText)
            }
            EventType::ChangedBallotWriteupText => {
                serde_json::from_str(json).map(Self::ChangedBallotWriteupText)
            }
            EventType::ChangedBallotApprovalText => {
                serde_json::from_str(json).map(Self::ChangedBallotApprovalText)
            }
            EventType::RequestedLastCall => {
                serde_json::from_str::<serde_json::Value>(json).map(|_| Self::RequestedLastCall)
            }
            EventType::SentLastCall => serde_json::from_str(json).map(Self::SentLastCall),
            EventType::ChangedActionHolders => {
                serde_json::from_str(json).map(Self::ChangedActionHolders)
            }
            EventType::AddedRelationship => {
                serde_json::from_str(json).map(Self::AddedRelationship)
            }
            EventType::RemovedRelationship => {
                serde_json::from_str(json).map(Self::RemovedRelationship)
            }
            EventType::DownrefApproved => serde_json::from_str(json).map(Self::DownrefApproved),
            EventType::IesgApproved => {
                serde_json::from_str::<serde_json::Value>(json).map(|_| Self::IesgApproved)
            }
        };

        result.map_err(|source| DataParseError { event_type, source })
    }

    /// Writeup text carried by writeup-change events.
    #[must_use]
    pub fn writeup_text(&self) -> Option<&str> {
        match self {
            Self::ChangedLastCallText(d)
            | Self::ChangedBallotWriteupText(d)
            | Self::ChangedBallotApprovalText(d) => Some(&d.text),
            Self::SentLastCall(d) => Some(&d.text),
            _ => None,
        }
    }
}

impl Serialize for EventData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NewRevision(d) => d.serialize(serializer),
            Self::ChangedState(d) => d.serialize(serializer),
            Self::ChangedDocument(d) => d.serialize(serializer),
            Self::CreatedBallot(d) | Self::ClosedBallot(d) => d.serialize(serializer),
            Self::ChangedBallotPosition(d) => d.serialize(serializer),
            Self::ScheduledForTelechat(d) => d.serialize(serializer),
            Self::ChangedLastCallText(d)
            | Self::ChangedBallotWriteupText(d)
            | Self::ChangedBallotApprovalText(d) => d.serialize(serializer),
            Self::SentLastCall(d) => d.serialize(serializer),
            Self::ChangedActionHolders(d) => d.serialize(serializer),
            Self::AddedRelationship(d) | Self::RemovedRelationship(d) | Self::DownrefApproved(d) => {
                d.serialize(serializer)
            }
            Self::AddedComment | Self::RequestedLastCall | Self::IesgApproved => {
                serializer.serialize_map(Some(0))?.end()
            }
        }
    }
}

/// Error returned when a stored payload does not match its event type.
#[derive(Debug)]
pub struct DataParseError {
    pub event_type: EventType,
    pub source: serde_json::Error,
}

impl fmt::Display for DataParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} data payload: {}", self.event_type, self.source)
    }
}

impl std::error::Error for DataParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRevisionData {
    pub rev: String,
}

/// One dimension's transition, with enough detail to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeData {
    pub state_type: String,
    pub prev_state: Option<String>,
    pub new_state: Option<String>,
    #[serde(default)]
    pub prev_substate: Option<IesgSubstate>,
    #[serde(default)]
    pub new_substate: Option<IesgSubstate>,
    #[serde(default)]
    pub prev_tags: BTreeSet<String>,
    #[serde(default)]
    pub new_tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFieldsData {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotData {
    pub ballot_id: i64,
    pub ballot_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionData {
    pub ballot_id: i64,
    pub balloter: PersonId,
    pub pos: PositionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_pos: Option<PositionKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub discuss: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelechatData {
    /// `None` removes the document from the agenda.
    pub telechat_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteupData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCallData {
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHoldersData {
    pub holders: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationData {
    pub kind: RelationKind,
    pub target: String,
}
