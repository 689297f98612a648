use std::fmt;

/// Machine-readable error codes for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    DocumentNotFound,
    BallotNotFound,
    EventNotFound,
    InvalidName,
    InvalidState,
    InvalidPosition,
    InvalidRelation,
    QuotaOutOfRange,
    InvalidRevision,
    EmptyText,
    BallotNotOpen,
    LastCallAlreadyRequested,
    UnexpectedPriorState,
    NoTelechatSlot,
    UndoUnsupported,
    ConcurrentModification,
    InvariantViolated,
    CorruptRecord,
    StorageFailed,
    MailDeliveryFailed,
    WriteupFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::DocumentNotFound => "E2001",
            Self::BallotNotFound => "E2002",
            Self::EventNotFound => "E2003",
            Self::InvalidName => "E3001",
            Self::InvalidState => "E3002",
            Self::InvalidPosition => "E3003",
            Self::InvalidRelation => "E3004",
            Self::QuotaOutOfRange => "E3005",
            Self::InvalidRevision => "E3006",
            Self::EmptyText => "E3007",
            Self::BallotNotOpen => "E4001",
            Self::LastCallAlreadyRequested => "E4002",
            Self::UnexpectedPriorState => "E4003",
            Self::NoTelechatSlot => "E4004",
            Self::UndoUnsupported => "E4005",
            Self::ConcurrentModification => "E4006",
            Self::InvariantViolated => "E5001",
            Self::CorruptRecord => "E5002",
            Self::StorageFailed => "E5003",
            Self::MailDeliveryFailed => "E6001",
            Self::WriteupFailed => "E6002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::DocumentNotFound => "Document not found",
            Self::BallotNotFound => "Ballot not found",
            Self::EventNotFound => "Event not found",
            Self::InvalidName => "Invalid document name",
            Self::InvalidState => "Invalid state for this document",
            Self::InvalidPosition => "Invalid ballot position",
            Self::InvalidRelation => "Invalid relationship target",
            Self::QuotaOutOfRange => "Ballot quota input out of range",
            Self::InvalidRevision => "Invalid document revision",
            Self::EmptyText => "Text must not be empty",
            Self::BallotNotOpen => "Ballot is not open",
            Self::LastCallAlreadyRequested => "Last call already requested",
            Self::UnexpectedPriorState => "Document is not in the expected state",
            Self::NoTelechatSlot => "No open telechat slot",
            Self::UndoUnsupported => "Event cannot be undone",
            Self::ConcurrentModification => "Document changed concurrently",
            Self::InvariantViolated => "Internal invariant violated",
            Self::CorruptRecord => "Corrupt stored record",
            Self::StorageFailed => "Storage failure",
            Self::MailDeliveryFailed => "Mail delivery failed",
            Self::WriteupFailed => "Writeup generation failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `dk init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .docket/config.toml and retry."),
            Self::DocumentNotFound | Self::BallotNotFound | Self::EventNotFound => None,
            Self::InvalidName => {
                Some("Use lowercase letters, digits and '-' (e.g. draft-ietf-foo-bar).")
            }
            Self::InvalidState => Some("Run `dk show <doc>` to list the states valid for its kind."),
            Self::InvalidPosition => {
                Some("Blocking positions need discuss text; check the ballot's position list.")
            }
            Self::InvalidRelation => Some("Relate two distinct, existing documents."),
            Self::QuotaOutOfRange | Self::EmptyText => None,
            Self::InvalidRevision => Some("Revisions are two digits and must increase (00, 01, ...)."),
            Self::BallotNotOpen => Some("Issue the ballot first with `dk ballot issue`."),
            Self::LastCallAlreadyRequested => None,
            Self::UnexpectedPriorState => Some("Refresh the document state and retry."),
            Self::NoTelechatSlot => Some("Add telechat dates with `dk telechat add`."),
            Self::UndoUnsupported => {
                Some("Only state changes and ballot positions can be undone.")
            }
            Self::ConcurrentModification => Some("Reload the document and retry."),
            Self::InvariantViolated | Self::CorruptRecord => {
                Some("Retry once. If persistent, report a bug with logs.")
            }
            Self::StorageFailed => Some("Check disk space and write permissions."),
            Self::MailDeliveryFailed => Some("Run `dk outbox retry` once the mailer is reachable."),
            Self::WriteupFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// External services the core calls out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Mailer,
    WriteupGenerator,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mailer => "mailer",
            Self::WriteupGenerator => "writeup generator",
        })
    }
}

/// Every failure the core can report.
///
/// Variants are grouped by how a caller should react: validation and
/// precondition failures are raised before any mutation, invariant
/// violations abort the operation, collaborator failures happen after the
/// ledger is committed.
#[derive(Debug, thiserror::Error)]
pub enum DocketError {
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("{reason}")]
    Validation { code: ErrorCode, reason: String },

    #[error("{reason}")]
    Precondition { code: ErrorCode, reason: String },

    #[error("document '{0}' not found")]
    DocumentNotFound(String),

    #[error("ballot {0} not found")]
    BallotNotFound(i64),

    #[error("event {0} not found")]
    EventNotFound(i64),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: Collaborator,
        message: String,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocketError {
    pub fn validation(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::Validation {
            code,
            reason: reason.into(),
        }
    }

    pub fn precondition(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::Precondition {
            code,
            reason: reason.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Invariant(_) => ErrorCode::InvariantViolated,
            Self::Validation { code, .. } | Self::Precondition { code, .. } => *code,
            Self::DocumentNotFound(_) => ErrorCode::DocumentNotFound,
            Self::BallotNotFound(_) => ErrorCode::BallotNotFound,
            Self::EventNotFound(_) => ErrorCode::EventNotFound,
            Self::Collaborator { collaborator, .. } => match collaborator {
                Collaborator::Mailer => ErrorCode::MailDeliveryFailed,
                Collaborator::WriteupGenerator => ErrorCode::WriteupFailed,
            },
            Self::Corrupt(_) | Self::Serialization(_) => ErrorCode::CorruptRecord,
            Self::Storage(_) => ErrorCode::StorageFailed,
        }
    }

    /// True when the same call may succeed after refreshing state or
    /// waiting for a collaborator.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Precondition { .. } | Self::Collaborator { .. } | Self::Storage(_)
        )
    }

    /// True for failures that must never be shown to end users verbatim.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_) | Self::Corrupt(_))
    }
}

pub type Result<T, E = DocketError> = std::result::Result<T, E>;
