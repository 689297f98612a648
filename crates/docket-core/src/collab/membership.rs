//! Active-membership provider: who may ballot right now.

use crate::ballot::types::BallotType;
use crate::config::RosterConfig;
use crate::model::person::{Person, PersonId};
use std::collections::BTreeMap;

pub trait MembershipProvider: Send + Sync {
    /// Current voting roster for a ballot type, in display order.
    fn active_members(&self, ballot_type: &BallotType) -> Vec<Person>;

    /// Display name for anyone the provider knows, active or not.
    fn display_name(&self, id: &PersonId) -> Option<String>;
}

/// A fixed roster per ballot body, usually read from `[[roster.members]]`.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    bodies: BTreeMap<String, Vec<Person>>,
    retired: Vec<Person>,
}

impl StaticRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &RosterConfig) -> Self {
        let mut roster = Self::new();
        for member in &config.members {
            roster.add(&member.ballot_body, Person::new(member.id.clone(), member.name.clone()));
        }
        roster
    }

    pub fn add(&mut self, body: &str, person: Person) {
        let members = self.bodies.entry(body.to_string()).or_default();
        members.retain(|p| p.id != person.id);
        members.push(person);
        members.sort_by(|a, b| a.last_name().cmp(b.last_name()).then_with(|| a.id.cmp(&b.id)));
    }

    /// Take someone off a body. They stay resolvable by name so their old
    /// positions still render.
    pub fn retire(&mut self, body: &str, id: &PersonId) {
        if let Some(members) = self.bodies.get_mut(body) {
            if let Some(idx) = members.iter().position(|p| &p.id == id) {
                self.retired.push(members.remove(idx));
            }
        }
    }
}

impl MembershipProvider for StaticRoster {
    fn active_members(&self, ballot_type: &BallotType) -> Vec<Person> {
        self.bodies
            .get(&ballot_type.body)
            .cloned()
            .unwrap_or_default()
    }

    fn display_name(&self, id: &PersonId) -> Option<String> {
        self.bodies
            .values()
            .flatten()
            .chain(&self.retired)
            .find(|p| &p.id == id)
            .map(|p| p.name.clone())
    }
}
