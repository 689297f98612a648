//! State catalog: typed, ordered state vocabularies with transition graphs.
//!
//! A [`StateType`] is one independent dimension a document moves through
//! (its own lifecycle, the IESG process, a stream's adoption process...).
//! Each dimension owns an ordered list of [`State`]s. A dimension with no
//! states is inactive for its document kind: lookups return nothing and
//! callers treat it as a no-op.

pub mod defaults;

use crate::error::{DocketError, ErrorCode, Result};
use crate::model::names::DocKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named state dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateType {
    pub slug: String,
    pub label: String,
    pub doc_kind: DocKind,
    /// Once entered, this dimension can never become unset again.
    pub iesg_process: bool,
}

/// One state within a [`StateType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub state_type: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub order: u32,
    /// Retired states stay resolvable for history but cannot be entered.
    pub used: bool,
    #[serde(default)]
    pub next_states: Vec<String>,
}

impl State {
    #[must_use]
    pub fn is(&self, state_type: &str, slug: &str) -> bool {
        self.state_type == state_type && self.slug == slug
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateCatalog {
    types: BTreeMap<String, StateType>,
    states: BTreeMap<String, Vec<State>>,
}

impl StateCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The IETF vocabulary shipped with docket.
    #[must_use]
    pub fn ietf() -> Self {
        defaults::ietf_catalog()
    }

    pub fn add_type(&mut self, state_type: StateType) {
        self.states.entry(state_type.slug.clone()).or_default();
        self.types.insert(state_type.slug.clone(), state_type);
    }

    /// Register a state. States stay sorted by `(order, slug)`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the state's type is unknown or the slug
    /// is already taken within the type.
    pub fn add_state(&mut self, state: State) -> Result<()> {
        if !self.types.contains_key(&state.state_type) {
            return Err(DocketError::validation(
                ErrorCode::InvalidState,
                format!("unknown state type '{}'", state.state_type),
            ));
        }
        let list = self.states.entry(state.state_type.clone()).or_default();
        if list.iter().any(|s| s.slug == state.slug) {
            return Err(DocketError::validation(
                ErrorCode::InvalidState,
                format!("duplicate state '{}' in '{}'", state.slug, state.state_type),
            ));
        }
        list.push(state);
        list.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.slug.cmp(&b.slug)));
        Ok(())
    }

    #[must_use]
    pub fn state_type(&self, slug: &str) -> Option<&StateType> {
        self.types.get(slug)
    }

    /// Ordered states of a dimension; empty when the dimension is inactive.
    #[must_use]
    pub fn states(&self, state_type: &str) -> &[State] {
        self.states.get(state_type).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_active(&self, state_type: &str) -> bool {
        !self.states(state_type).is_empty()
    }

    #[must_use]
    pub fn state(&self, state_type: &str, slug: &str) -> Option<&State> {
        self.states(state_type).iter().find(|s| s.slug == slug)
    }

    /// Look up a state that a document of `kind` may enter now.
    ///
    /// # Errors
    ///
    /// Validation error when the type does not belong to `kind`, the slug is
    /// unknown, or the state is retired.
    pub fn enterable(&self, kind: DocKind, state_type: &str, slug: &str) -> Result<&State> {
        let ty = self.state_type(state_type).ok_or_else(|| {
            DocketError::validation(
                ErrorCode::InvalidState,
                format!("unknown state type '{state_type}'"),
            )
        })?;
        if ty.doc_kind != kind {
            return Err(DocketError::validation(
                ErrorCode::InvalidState,
                format!("state type '{state_type}' does not apply to {kind} documents"),
            ));
        }
        let state = self.state(state_type, slug).ok_or_else(|| {
            DocketError::validation(
                ErrorCode::InvalidState,
                format!("unknown state '{slug}' in '{state_type}'"),
            )
        })?;
        if !state.used {
            return Err(DocketError::validation(
                ErrorCode::InvalidState,
                format!("state '{slug}' in '{state_type}' is retired"),
            ));
        }
        Ok(state)
    }

    /// Permitted next states from `state`, in catalog order.
    #[must_use]
    pub fn next_states(&self, state: &State) -> Vec<&State> {
        self.states(&state.state_type)
            .iter()
            .filter(|s| state.next_states.contains(&s.slug))
            .collect()
    }

    /// State types that apply to a document kind.
    pub fn types_for(&self, kind: DocKind) -> impl Iterator<Item = &StateType> {
        self.types.values().filter(move |t| t.doc_kind == kind)
    }

    #[must_use]
    pub fn is_iesg_process(&self, state_type: &str) -> bool {
        self.state_type(state_type).is_some_and(|t| t.iesg_process)
    }
}
