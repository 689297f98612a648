//! Canonical SQLite schema for the docket store.
//!
//! - `documents` holds the live attribute set, one row per document
//! - `document_states` keys on `(doc, state_type)`, so a document holds at
//!   most one state per dimension
//! - `events` is the append-only log; its AUTOINCREMENT id orders events
//!   stamped with the same instant
//! - `doc_history` keeps the JSON snapshot taken before every save, with
//!   the document's outgoing edges at that moment
//! - `ballots` carries a partial unique index: one open ballot per
//!   `(doc, ballot_type)`
//! - `relations` is the single directed edge table, read both ways

/// Migration v1: documents, states, events, history, ballots, relations.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    name TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('draft', 'rfc', 'charter', 'conflrev', 'statchg')),
    title TEXT NOT NULL,
    rev TEXT NOT NULL,
    abstract TEXT NOT NULL DEFAULT '',
    notify TEXT NOT NULL DEFAULT '',
    ad TEXT,
    shepherd TEXT,
    stream TEXT,
    group_acronym TEXT NOT NULL DEFAULT 'none',
    group_kind TEXT NOT NULL DEFAULT 'individ',
    intended_std_level TEXT,
    std_level TEXT,
    rfc_number INTEGER,
    substate TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    time_us INTEGER NOT NULL,
    CHECK (length(name) > 0)
);

CREATE TABLE IF NOT EXISTS document_states (
    doc TEXT NOT NULL REFERENCES documents(name) ON DELETE CASCADE,
    state_type TEXT NOT NULL,
    state TEXT NOT NULL,
    PRIMARY KEY (doc, state_type)
);

CREATE TABLE IF NOT EXISTS document_tags (
    doc TEXT NOT NULL REFERENCES documents(name) ON DELETE CASCADE,
    tag TEXT NOT NULL CHECK (length(trim(tag)) > 0),
    PRIMARY KEY (doc, tag)
);

CREATE TABLE IF NOT EXISTS document_authors (
    doc TEXT NOT NULL REFERENCES documents(name) ON DELETE CASCADE,
    person TEXT NOT NULL,
    ord INTEGER NOT NULL,
    PRIMARY KEY (doc, person)
);

CREATE TABLE IF NOT EXISTS action_holders (
    doc TEXT NOT NULL REFERENCES documents(name) ON DELETE CASCADE,
    person TEXT NOT NULL,
    PRIMARY KEY (doc, person)
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc TEXT NOT NULL REFERENCES documents(name),
    time_us INTEGER NOT NULL,
    by_person TEXT NOT NULL,
    rev TEXT NOT NULL,
    event_type TEXT NOT NULL,
    description TEXT NOT NULL,
    data_json TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS doc_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc TEXT NOT NULL REFERENCES documents(name),
    rev TEXT NOT NULL,
    time_us INTEGER NOT NULL,
    snapshot_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ballots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc TEXT NOT NULL REFERENCES documents(name),
    ballot_type TEXT NOT NULL,
    opened_by TEXT NOT NULL,
    opened_at_us INTEGER NOT NULL,
    closed_at_us INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ballots_one_open
    ON ballots(doc, ballot_type)
    WHERE closed_at_us IS NULL;

CREATE TABLE IF NOT EXISTS ballot_positions (
    event_id INTEGER PRIMARY KEY REFERENCES events(id) ON DELETE CASCADE,
    ballot_id INTEGER NOT NULL REFERENCES ballots(id),
    balloter TEXT NOT NULL,
    pos TEXT NOT NULL,
    discuss TEXT NOT NULL DEFAULT '',
    discuss_time_us INTEGER,
    comment TEXT NOT NULL DEFAULT '',
    comment_time_us INTEGER,
    time_us INTEGER NOT NULL,
    by_person TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relations (
    source TEXT NOT NULL REFERENCES documents(name),
    target TEXT NOT NULL REFERENCES documents(name),
    kind TEXT NOT NULL,
    PRIMARY KEY (source, target, kind),
    CHECK (source <> target)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    last_sweep_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, last_sweep_at_us) VALUES (1, 1, 0);
";

/// Migration v2: telechat calendar, mail outbox and read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS telechat_dates (
    date TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS mail_outbox (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc TEXT NOT NULL,
    recipients_json TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at_us INTEGER NOT NULL,
    delivered_at_us INTEGER
);

CREATE INDEX IF NOT EXISTS idx_events_doc_time
    ON events(doc, time_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_events_doc_type_time
    ON events(doc, event_type, time_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_doc_history_doc_time
    ON doc_history(doc, time_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_document_states_type_state
    ON document_states(state_type, state, doc);

CREATE INDEX IF NOT EXISTS idx_ballot_positions_ballot_balloter
    ON ballot_positions(ballot_id, balloter, time_us DESC, event_id DESC);

CREATE INDEX IF NOT EXISTS idx_relations_target_kind
    ON relations(target, kind, source);

CREATE INDEX IF NOT EXISTS idx_mail_outbox_pending
    ON mail_outbox(delivered_at_us, id);
";

/// Migration v3: outgoing edges captured with each history snapshot.
pub const MIGRATION_V3_SQL: &str = r"
ALTER TABLE doc_history ADD COLUMN relations_json TEXT NOT NULL DEFAULT '[]';
";

/// Indexes that must exist once the schema is fully migrated.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_ballots_one_open",
    "idx_events_doc_time",
    "idx_events_doc_type_time",
    "idx_doc_history_doc_time",
    "idx_document_states_type_state",
    "idx_ballot_positions_ballot_balloter",
    "idx_relations_target_kind",
    "idx_mail_outbox_pending",
];
