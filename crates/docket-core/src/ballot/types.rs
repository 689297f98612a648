//! Ballot vocabulary: position kinds, ballot types and ballot records.

use crate::error::{DocketError, ErrorCode, Result};
use crate::model::names::{DocKind, slug_enum};
use crate::model::person::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

slug_enum! {
    /// A balloter's position.
    pub enum PositionKind ("ballot position") {
        Yes => ("yes", "Yes"),
        NoObjection => ("noobj", "No Objection"),
        Discuss => ("discuss", "Discuss"),
        Block => ("block", "Block"),
        Abstain => ("abstain", "Abstain"),
        Recuse => ("recuse", "Recuse"),
        NoRecord => ("norecord", "No Record"),
    }
}

impl PositionKind {
    /// Blocking positions withhold approval and need discuss text.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Discuss | Self::Block)
    }

    /// Counts toward the quota needed to pass.
    #[must_use]
    pub const fn supports_passing(self) -> bool {
        matches!(self, Self::Yes | Self::NoObjection)
    }

    /// Upper-case label used in verdict text, e.g. `DISCUSS`.
    #[must_use]
    pub fn shout(self) -> String {
        self.name().to_uppercase()
    }

    /// `DISCUSSes`, `BLOCKs`.
    #[must_use]
    pub fn shout_plural(self) -> String {
        let label = self.shout();
        if label.ends_with('S') {
            format!("{label}es")
        } else {
            format!("{label}s")
        }
    }
}

/// Per document-kind ballot definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotType {
    pub slug: String,
    pub name: String,
    pub doc_kind: DocKind,
    pub question: String,
    /// Body whose active members ballot (`iesg`).
    pub body: String,
    pub order: u32,
    pub positions: Vec<PositionKind>,
}

impl BallotType {
    #[must_use]
    pub fn allows(&self, pos: PositionKind) -> bool {
        self.positions.contains(&pos)
    }

    /// The blocking kind this ballot uses, if any.
    #[must_use]
    pub fn blocking_kind(&self) -> Option<PositionKind> {
        self.positions.iter().copied().find(|p| p.is_blocking())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BallotCatalog {
    types: Vec<BallotType>,
}

impl BallotCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ietf() -> Self {
        use PositionKind::{Abstain, Block, Discuss, NoObjection, NoRecord, Recuse, Yes};

        let iesg = |slug: &str, name: &str, kind, question: &str, order, positions: &[PositionKind]| {
            BallotType {
                slug: slug.to_string(),
                name: name.to_string(),
                doc_kind: kind,
                question: question.to_string(),
                body: "iesg".to_string(),
                order,
                positions: positions.to_vec(),
            }
        };
        let discuss_ballot = [Yes, NoObjection, Discuss, Abstain, Recuse, NoRecord];
        let block_ballot = [Yes, NoObjection, Block, Abstain, NoRecord];

        let mut catalog = Self::new();
        catalog.add(iesg(
            "approve",
            "Approve",
            DocKind::Draft,
            "Is this draft ready for publication?",
            1,
            &discuss_ballot,
        ));
        catalog.add(iesg(
            "approve",
            "Approve",
            DocKind::Charter,
            "Do we approve of this charter?",
            1,
            &block_ballot,
        ));
        catalog.add(iesg(
            "r-extrev",
            "Ready for external review",
            DocKind::Charter,
            "Is this charter ready for external review?",
            2,
            &block_ballot,
        ));
        catalog.add(iesg(
            "conflrev",
            "Approve",
            DocKind::ConflictReview,
            "Is this the correct conflict review response?",
            1,
            &discuss_ballot,
        ));
        catalog.add(iesg(
            "statchg",
            "Approve",
            DocKind::StatusChange,
            "Do we approve these RFC status changes?",
            1,
            &discuss_ballot,
        ));
        catalog
    }

    pub fn add(&mut self, ballot_type: BallotType) {
        self.types.push(ballot_type);
        self.types
            .sort_by(|a, b| (a.doc_kind, a.order).cmp(&(b.doc_kind, b.order)));
    }

    pub fn for_kind(&self, kind: DocKind) -> impl Iterator<Item = &BallotType> {
        self.types.iter().filter(move |t| t.doc_kind == kind)
    }

    /// Resolve a ballot type for a document kind; `None` picks the first
    /// in catalog order.
    ///
    /// # Errors
    ///
    /// Validation error when the kind has no ballot or the slug is unknown.
    pub fn resolve(&self, kind: DocKind, slug: Option<&str>) -> Result<&BallotType> {
        let mut candidates = self.for_kind(kind);
        let found = match slug {
            Some(slug) => candidates.find(|t| t.slug == slug),
            None => candidates.next(),
        };
        found.ok_or_else(|| {
            DocketError::validation(
                ErrorCode::InvalidPosition,
                format!(
                    "no ballot type '{}' for {kind} documents",
                    slug.unwrap_or("(default)")
                ),
            )
        })
    }
}

/// One opened ballot instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: i64,
    pub doc: String,
    pub ballot_type: String,
    pub opened_by: PersonId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ballot {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// One recorded position; `id` is the id of the event that recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotPosition {
    pub id: i64,
    pub ballot_id: i64,
    pub balloter: PersonId,
    pub pos: PositionKind,
    pub discuss: String,
    pub discuss_time: Option<DateTime<Utc>>,
    pub comment: String,
    pub comment_time: Option<DateTime<Utc>>,
    pub time: DateTime<Utc>,
    pub by: PersonId,
}

#[cfg(test)]
mod tests {
    use super::{BallotCatalog, PositionKind};
    use crate::model::names::DocKind;

    #[test]
    fn plural_labels() {
        assert_eq!(PositionKind::Discuss.shout(), "DISCUSS");
        assert_eq!(PositionKind::Discuss.shout_plural(), "DISCUSSes");
        assert_eq!(PositionKind::Block.shout_plural(), "BLOCKs");
    }

    #[test]
    fn every_ballot_kind_has_one_blocking_position() {
        let catalog = BallotCatalog::ietf();
        for kind in DocKind::ALL {
            for ty in catalog.for_kind(*kind) {
                let blocking: Vec<_> = ty.positions.iter().filter(|p| p.is_blocking()).collect();
                assert_eq!(blocking.len(), 1, "{}/{}", kind, ty.slug);
                assert!(ty.allows(PositionKind::NoRecord));
            }
        }
    }

    #[test]
    fn resolve_defaults_to_first_in_order() {
        let catalog = BallotCatalog::ietf();
        assert_eq!(catalog.resolve(DocKind::Charter, None).unwrap().slug, "approve");
        assert_eq!(
            catalog.resolve(DocKind::Charter, Some("r-extrev")).unwrap().slug,
            "r-extrev"
        );
        assert!(catalog.resolve(DocKind::Rfc, None).is_err());
        assert!(catalog.resolve(DocKind::Draft, Some("nope")).is_err());
    }

    #[test]
    fn charter_ballots_block_rather_than_discuss() {
        let catalog = BallotCatalog::ietf();
        let ty = catalog.resolve(DocKind::Charter, None).unwrap();
        assert_eq!(ty.blocking_kind(), Some(PositionKind::Block));
        assert!(!ty.allows(PositionKind::Discuss));
    }
}
