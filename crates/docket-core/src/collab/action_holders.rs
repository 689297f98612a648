//! Action-holder recomputation: who must act next on a document.

use crate::catalog::defaults::{draft, draft_iesg};
use crate::model::document::Document;
use crate::model::names::{DocKind, IesgSubstate};
use crate::model::person::PersonId;
use std::collections::BTreeSet;

pub trait ActionHolderPolicy: Send + Sync {
    /// Holders for `next`, given the document as it was before the change.
    fn recompute(&self, prev: &Document, next: &Document) -> BTreeSet<PersonId>;
}

/// IESG states in which nobody is waited on.
pub const CLEAR_STATES: &[&str] = &[
    draft_iesg::APPROVED,
    draft_iesg::ANNOUNCED,
    draft_iesg::RFC_QUEUE,
    draft_iesg::PUBLISHED,
    draft_iesg::DEAD,
];

/// The IESG rules: the responsible AD holds the action while the document
/// is in an active IESG state, authors hold it while a revision is needed,
/// and terminal states clear everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct IesgActionHolders;

impl ActionHolderPolicy for IesgActionHolders {
    fn recompute(&self, prev: &Document, next: &Document) -> BTreeSet<PersonId> {
        let mut holders = next.action_holders.clone();

        if next.kind == DocKind::Draft
            && next.state_slug(draft::TYPE) == Some(draft::EXPIRED)
            && prev.state_slug(draft::TYPE) != Some(draft::EXPIRED)
        {
            holders.clear();
            return holders;
        }

        let prev_iesg = prev.iesg_state().map(|s| s.slug.as_str());
        let next_iesg = next.iesg_state().map(|s| s.slug.as_str());
        let iesg_changed = prev_iesg != next_iesg;
        let substate_added = |s: IesgSubstate| next.substate == Some(s) && prev.substate != Some(s);
        let substate_removed = |s: IesgSubstate| prev.substate == Some(s) && next.substate != Some(s);

        // Removals first, so someone with two roles ends up added back.
        if iesg_changed && next_iesg.is_some_and(|slug| CLEAR_STATES.contains(&slug)) {
            holders.clear();
        }
        if substate_removed(IesgSubstate::RevisedIdNeeded) {
            for author in &next.authors {
                holders.remove(author);
            }
        }

        if let Some(ad) = &next.ad {
            if iesg_changed && next_iesg.is_some_and(|slug| !CLEAR_STATES.contains(&slug)) {
                holders.insert(ad.clone());
            }
            if substate_added(IesgSubstate::AdFollowup) {
                holders.insert(ad.clone());
            }
        }
        if substate_added(IesgSubstate::RevisedIdNeeded) {
            holders.extend(next.authors.iter().cloned());
        }

        holders
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionHolderPolicy, IesgActionHolders};
    use crate::catalog::StateCatalog;
    use crate::catalog::defaults::{draft, draft_iesg};
    use crate::model::document::Document;
    use crate::model::names::{DocKind, IesgSubstate};
    use crate::model::person::PersonId;

    fn doc(catalog: &StateCatalog, iesg: &str) -> Document {
        let mut doc = Document::new("draft-x", DocKind::Draft, "X");
        doc.ad = Some(PersonId::new("ad"));
        doc.authors = vec![PersonId::new("a1"), PersonId::new("a2")];
        doc.set_state(catalog.state(draft::TYPE, draft::ACTIVE).unwrap().clone());
        doc.set_state(catalog.state(draft_iesg::TYPE, iesg).unwrap().clone());
        doc
    }

    fn ids(set: &std::collections::BTreeSet<PersonId>) -> Vec<&str> {
        set.iter().map(PersonId::as_str).collect()
    }

    #[test]
    fn ad_takes_the_action_on_active_iesg_state() {
        let catalog = StateCatalog::ietf();
        let prev = doc(&catalog, draft_iesg::PUB_REQ);
        let next = doc(&catalog, draft_iesg::AD_EVAL);
        assert_eq!(ids(&IesgActionHolders.recompute(&prev, &next)), ["ad"]);
    }

    #[test]
    fn clear_states_drop_everyone() {
        let catalog = StateCatalog::ietf();
        let mut prev = doc(&catalog, draft_iesg::EVALUATION);
        prev.action_holders.insert(PersonId::new("ad"));
        let mut next = doc(&catalog, draft_iesg::APPROVED);
        next.action_holders = prev.action_holders.clone();
        assert!(IesgActionHolders.recompute(&prev, &next).is_empty());
    }

    #[test]
    fn revision_needed_moves_action_to_authors_and_back() {
        let catalog = StateCatalog::ietf();
        let prev = doc(&catalog, draft_iesg::EVALUATION);
        let mut next = prev.clone();
        next.substate = Some(IesgSubstate::RevisedIdNeeded);
        let holders = IesgActionHolders.recompute(&prev, &next);
        assert_eq!(ids(&holders), ["a1", "a2"]);

        let mut cleared = next.clone();
        cleared.action_holders = holders;
        cleared.substate = None;
        assert!(IesgActionHolders.recompute(&next, &cleared).is_empty());
    }

    #[test]
    fn ad_followup_adds_ad_without_state_change() {
        let catalog = StateCatalog::ietf();
        let prev = doc(&catalog, draft_iesg::EVALUATION);
        let mut next = prev.clone();
        next.substate = Some(IesgSubstate::AdFollowup);
        assert_eq!(ids(&IesgActionHolders.recompute(&prev, &next)), ["ad"]);
    }

    #[test]
    fn expiry_clears_all() {
        let catalog = StateCatalog::ietf();
        let mut prev = doc(&catalog, draft_iesg::AD_EVAL);
        prev.action_holders.insert(PersonId::new("ad"));
        let mut next = prev.clone();
        next.set_state(catalog.state(draft::TYPE, draft::EXPIRED).unwrap().clone());
        assert!(IesgActionHolders.recompute(&prev, &next).is_empty());
    }
}
