//! The document aggregate and its current-state projection.

use crate::catalog::{State, StateCatalog};
use crate::error::{DocketError, ErrorCode, Result};
use crate::model::names::{DocKind, GroupKind, IesgSubstate, StdLevel, Stream};
use crate::model::person::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Owning group of a document. Individual submissions use the `none` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub acronym: String,
    pub kind: GroupKind,
}

impl Group {
    #[must_use]
    pub fn individual() -> Self {
        Self {
            acronym: "none".to_string(),
            kind: GroupKind::Individual,
        }
    }

    /// Individual submissions and area-sponsored documents get a longer
    /// last call.
    #[must_use]
    pub const fn is_individual_or_area(&self) -> bool {
        matches!(self.kind, GroupKind::Individual | GroupKind::Area)
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::individual()
    }
}

/// The document's position in each state dimension, keyed by state type.
///
/// Holding at most one state per dimension is a property of the map itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrentStates(BTreeMap<String, State>);

impl CurrentStates {
    #[must_use]
    pub fn get(&self, state_type: &str) -> Option<&State> {
        self.0.get(state_type)
    }

    /// Replace whatever state the dimension held. Returns the previous one.
    pub fn set(&mut self, state: State) -> Option<State> {
        self.0.insert(state.state_type.clone(), state)
    }

    pub fn remove(&mut self, state_type: &str) -> Option<State> {
        self.0.remove(state_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.0.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A tracked document: identity, attributes and current states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub kind: DocKind,
    pub title: String,
    pub rev: String,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub notify: String,
    pub ad: Option<PersonId>,
    pub shepherd: Option<PersonId>,
    pub stream: Option<Stream>,
    #[serde(default)]
    pub group: Group,
    pub intended_std_level: Option<StdLevel>,
    pub std_level: Option<StdLevel>,
    pub rfc_number: Option<u32>,
    #[serde(default)]
    pub authors: Vec<PersonId>,
    /// Last modification; only ever moves forward.
    pub time: DateTime<Utc>,
    pub states: CurrentStates,
    pub substate: Option<IesgSubstate>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Derived: who must act next. Recomputed on every state change.
    #[serde(default)]
    pub action_holders: BTreeSet<PersonId>,
    /// Optimistic concurrency version, bumped by every committed save.
    #[serde(default)]
    pub version: u64,
}

impl Document {
    pub fn new(name: impl Into<String>, kind: DocKind, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            title: title.into(),
            rev: "00".to_string(),
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
            time: DateTime::<Utc>::UNIX_EPOCH,
            states: CurrentStates::default(),
            substate: None,
            tags: BTreeSet::new(),
            action_holders: BTreeSet::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn get_state(&self, state_type: &str) -> Option<&State> {
        self.states.get(state_type)
    }

    /// Slug of the current state in a dimension, if any.
    #[must_use]
    pub fn state_slug(&self, state_type: &str) -> Option<&str> {
        self.get_state(state_type).map(|s| s.slug.as_str())
    }

    /// The state in the document's own lifecycle dimension.
    #[must_use]
    pub fn primary_state(&self) -> Option<&State> {
        self.get_state(self.kind.primary_state_type())
    }

    #[must_use]
    pub fn iesg_state(&self) -> Option<&State> {
        self.kind
            .iesg_state_type()
            .and_then(|t| self.get_state(t))
    }

    /// True once the document has entered an IESG process dimension.
    #[must_use]
    pub fn in_iesg_processing(&self) -> bool {
        self.iesg_state().is_some()
    }

    /// Replace the state of `state.state_type`, returning the previous one.
    ///
    /// Removing and adding happen as one map insert, so no intermediate
    /// view ever holds two states of the same type or none.
    pub fn set_state(&mut self, state: State) -> Option<State> {
        self.states.set(state)
    }

    /// Clear a dimension.
    ///
    /// # Errors
    ///
    /// Returns an invariant error when asked to clear an IESG process
    /// dimension that the document has already entered.
    pub fn unset_state(&mut self, catalog: &StateCatalog, state_type: &str) -> Result<Option<State>> {
        if catalog.is_iesg_process(state_type) && self.states.get(state_type).is_some() {
            return Err(DocketError::invariant(format!(
                "refusing to unset {state_type} on {}: IESG processing already started",
                self.name
            )));
        }
        Ok(self.states.remove(state_type))
    }

    /// Advance the modification time; older timestamps are ignored.
    pub fn touch(&mut self, time: DateTime<Utc>) {
        if time > self.time {
            self.time = time;
        }
    }

    /// Check a document name: non-empty, lowercase ASCII letters, digits
    /// and single hyphens, starting with a letter.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first problem found.
    pub fn validate_name(name: &str) -> Result<()> {
        let invalid = |reason: &str| {
            Err(DocketError::validation(
                ErrorCode::InvalidName,
                format!("invalid document name '{name}': {reason}"),
            ))
        };
        if name.is_empty() {
            return invalid("empty");
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return invalid("must start with a lowercase letter");
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return invalid("only lowercase letters, digits and '-' are allowed");
        }
        if name.ends_with('-') || name.contains("--") {
            return invalid("hyphens must separate words");
        }
        Ok(())
    }
}
