//! Closed name vocabularies shared by documents, ballots and relations.
//!
//! Every enum here round-trips through a short lowercase slug, which is the
//! form stored in SQLite and accepted on the command line.

use std::fmt;

/// Error returned when parsing a vocabulary value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNameError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseNameError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

/// Declares a slug-backed enum with `as_str`, `name`, `ALL`, `Display`,
/// `FromStr` and serde support.
macro_rules! slug_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $ty:ident ($expected:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => ($slug:literal, $name:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $ty {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $ty {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable slug used in storage and on the command line.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $slug,)+
                }
            }

            /// Human-readable name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::model::names::ParseNameError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match $crate::model::names::normalize(s).as_str() {
                    $($slug => Ok(Self::$variant),)+
                    _ => Err($crate::model::names::ParseNameError {
                        expected: $expected,
                        got: s.to_string(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                <Self as ::std::str::FromStr>::from_str(&s).map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use slug_enum;

slug_enum! {
    /// The kinds of document tracked.
    pub enum DocKind ("document kind") {
        Draft => ("draft", "Internet-Draft"),
        Rfc => ("rfc", "RFC"),
        Charter => ("charter", "Charter"),
        ConflictReview => ("conflrev", "Conflict Review"),
        StatusChange => ("statchg", "Status Change"),
    }
}

impl DocKind {
    /// The state type that carries the document's own lifecycle.
    #[must_use]
    pub const fn primary_state_type(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Rfc => "rfc",
            Self::Charter => "charter",
            Self::ConflictReview => "conflrev",
            Self::StatusChange => "statchg",
        }
    }

    /// The state type the IESG moves through while processing the document.
    #[must_use]
    pub const fn iesg_state_type(self) -> Option<&'static str> {
        match self {
            Self::Draft => Some("draft-iesg"),
            Self::Charter => Some("charter"),
            Self::ConflictReview => Some("conflrev"),
            Self::StatusChange => Some("statchg"),
            Self::Rfc => None,
        }
    }
}

slug_enum! {
    /// Standards level, either intended (drafts) or achieved (RFCs).
    pub enum StdLevel ("standards level") {
        Informational => ("inf", "Informational"),
        Experimental => ("exp", "Experimental"),
        Bcp => ("bcp", "Best Current Practice"),
        ProposedStandard => ("ps", "Proposed Standard"),
        DraftStandard => ("ds", "Draft Standard"),
        InternetStandard => ("std", "Internet Standard"),
        Historic => ("hist", "Historic"),
        Unknown => ("unkn", "Unknown"),
    }
}

impl StdLevel {
    /// BCP and the three standards-track maturity levels.
    #[must_use]
    pub const fn is_standards_track_or_bcp(self) -> bool {
        matches!(
            self,
            Self::Bcp | Self::ProposedStandard | Self::DraftStandard | Self::InternetStandard
        )
    }

    /// Maturity rank used to detect downward normative references.
    #[must_use]
    pub const fn maturity(self) -> u8 {
        match self {
            Self::Informational | Self::Experimental | Self::Historic | Self::Unknown => 0,
            Self::ProposedStandard | Self::Bcp => 1,
            Self::DraftStandard => 2,
            Self::InternetStandard => 3,
        }
    }
}

slug_enum! {
    /// Publication stream.
    pub enum Stream ("stream") {
        Ietf => ("ietf", "IETF"),
        Irtf => ("irtf", "IRTF"),
        Iab => ("iab", "IAB"),
        Ise => ("ise", "ISE"),
        Legacy => ("legacy", "Legacy"),
    }
}

slug_enum! {
    /// Kind of group that owns a document.
    pub enum GroupKind ("group kind") {
        Individual => ("individ", "Individual"),
        Area => ("area", "Area"),
        WorkingGroup => ("wg", "Working Group"),
        ResearchGroup => ("rg", "Research Group"),
        Program => ("program", "Program"),
    }
}

slug_enum! {
    /// Finer-grained IESG status layered on the coarse IESG state.
    pub enum IesgSubstate ("IESG substate") {
        RevisedIdNeeded => ("need-rev", "Revised I-D Needed"),
        AdFollowup => ("ad-f-up", "AD Followup"),
        PointRaised => ("point", "Point Raised - writeup needed"),
        ExternalParty => ("extpty", "External Party"),
    }
}

#[cfg(test)]
mod tests {
    use super::{DocKind, GroupKind, IesgSubstate, StdLevel, Stream};
    use std::str::FromStr;

    #[test]
    fn display_parse_roundtrips() {
        for kind in DocKind::ALL {
            assert_eq!(DocKind::from_str(&kind.to_string()).ok(), Some(*kind));
        }
        for level in StdLevel::ALL {
            assert_eq!(StdLevel::from_str(level.as_str()).ok(), Some(*level));
        }
        for stream in Stream::ALL {
            assert_eq!(Stream::from_str(stream.as_str()).ok(), Some(*stream));
        }
        for group in GroupKind::ALL {
            assert_eq!(GroupKind::from_str(group.as_str()).ok(), Some(*group));
        }
        for sub in IesgSubstate::ALL {
            assert_eq!(IesgSubstate::from_str(sub.as_str()).ok(), Some(*sub));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(DocKind::from_str(" Draft ").ok(), Some(DocKind::Draft));
        let err = StdLevel::from_str("gold").unwrap_err();
        assert_eq!(err.expected, "standards level");
        assert!(err.to_string().contains("gold"));
    }

    #[test]
    fn standards_track_membership() {
        let track: Vec<_> = StdLevel::ALL
            .iter()
            .filter(|l| l.is_standards_track_or_bcp())
            .map(|l| l.as_str())
            .collect();
        assert_eq!(track, ["bcp", "ps", "ds", "std"]);
    }

    #[test]
    fn serde_uses_slugs() {
        assert_eq!(
            serde_json::to_string(&IesgSubstate::AdFollowup).unwrap(),
            "\"ad-f-up\""
        );
        assert_eq!(
            serde_json::from_str::<DocKind>("\"statchg\"").unwrap(),
            DocKind::StatusChange
        );
    }

    #[test]
    fn iesg_dimension_per_kind() {
        assert_eq!(DocKind::Draft.iesg_state_type(), Some("draft-iesg"));
        assert_eq!(DocKind::Rfc.iesg_state_type(), None);
        assert_eq!(DocKind::StatusChange.primary_state_type(), "statchg");
    }
}
