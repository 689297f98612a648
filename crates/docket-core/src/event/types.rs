//! Closed catalog of event types.
//!
//! The string form is the snake_case slug stored in the `events.event_type`
//! column; it is also what `dk log --json` prints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A revision of the document was filed.
    NewRevision,
    /// A state dimension, the IESG substate or the label set changed.
    ChangedState,
    /// Plain attributes (title, levels, AD...) changed.
    ChangedDocument,
    AddedComment,
    CreatedBallot,
    ClosedBallot,
    ChangedBallotPosition,
    ScheduledForTelechat,
    ChangedLastCallText,
    ChangedBallotWriteupText,
    ChangedBallotApprovalText,
    RequestedLastCall,
    /// Last call announcement went out; carries the expiration.
    SentLastCall,
    ChangedActionHolders,
    AddedRelationship,
    RemovedRelationship,
    DownrefApproved,
    IesgApproved,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type '{}'", self.raw)
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    pub const ALL: [Self; 18] = [
        Self::NewRevision,
        Self::ChangedState,
        Self::ChangedDocument,
        Self::AddedComment,
        Self::CreatedBallot,
        Self::ClosedBallot,
        Self::ChangedBallotPosition,
        Self::ScheduledForTelechat,
        Self::ChangedLastCallText,
        Self::ChangedBallotWriteupText,
        Self::ChangedBallotApprovalText,
        Self::RequestedLastCall,
        Self::SentLastCall,
        Self::ChangedActionHolders,
        Self::AddedRelationship,
        Self::RemovedRelationship,
        Self::DownrefApproved,
        Self::IesgApproved,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewRevision => "new_revision",
            Self::ChangedState => "changed_state",
            Self::ChangedDocument => "changed_document",
            Self::AddedComment => "added_comment",
            Self::CreatedBallot => "created_ballot",
            Self::ClosedBallot => "closed_ballot",
            Self::ChangedBallotPosition => "changed_ballot_position",
            Self::ScheduledForTelechat => "scheduled_for_telechat",
            Self::ChangedLastCallText => "changed_last_call_text",
            Self::ChangedBallotWriteupText => "changed_ballot_writeup_text",
            Self::ChangedBallotApprovalText => "changed_ballot_approval_text",
            Self::RequestedLastCall => "requested_last_call",
            Self::SentLastCall => "sent_last_call",
            Self::ChangedActionHolders => "changed_action_holders",
            Self::AddedRelationship => "added_relationship",
            Self::RemovedRelationship => "removed_relationship",
            Self::DownrefApproved => "downref_approved",
            Self::IesgApproved => "iesg_approved",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType { raw: s.to_string() })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
