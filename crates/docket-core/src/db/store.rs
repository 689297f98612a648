//! Write path: documents, snapshots, events, ballots and side tables.
//!
//! Every function takes a plain `&Connection` so callers can run several
//! writes inside one `BEGIN IMMEDIATE` transaction (a `Transaction` derefs
//! to `Connection`).

use super::{from_us, to_us};
use crate::ballot::types::{Ballot, BallotPosition};
use crate::catalog::StateCatalog;
use crate::collab::mail::OutgoingMail;
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::Event;
use crate::model::document::{CurrentStates, Document, Group};
use crate::model::person::PersonId;
use crate::model::relation::Relation;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

pub(crate) fn corrupt(what: impl Display) -> DocketError {
    DocketError::Corrupt(what.to_string())
}

pub(crate) fn parse_slug<T>(column: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|err| corrupt(format!("{column}: {err}")))
}

fn version_to_sql(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| DocketError::invariant("document version overflow"))
}

/// Insert a brand-new document with its states, tags, authors and action
/// holders.
///
/// # Errors
///
/// Returns a storage error if the name is already taken.
pub fn insert_document(conn: &Connection, doc: &Document) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (
            name, kind, title, rev, abstract, notify, ad, shepherd, stream,
            group_acronym, group_kind, intended_std_level, std_level, rfc_number,
            substate, version, time_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            doc.name,
            doc.kind.as_str(),
            doc.title,
            doc.rev,
            doc.abstract_text,
            doc.notify,
            doc.ad.as_ref().map(PersonId::as_str),
            doc.shepherd.as_ref().map(PersonId::as_str),
            doc.stream.map(|s| s.as_str()),
            doc.group.acronym,
            doc.group.kind.as_str(),
            doc.intended_std_level.map(|l| l.as_str()),
            doc.std_level.map(|l| l.as_str()),
            doc.rfc_number.map(i64::from),
            doc.substate.map(|s| s.as_str()),
            version_to_sql(doc.version)?,
            to_us(doc.time),
        ],
    )?;
    replace_children(conn, doc)
}

/// Overwrite the live row of `doc`, guarded by the version it was loaded at.
///
/// # Errors
///
/// Precondition failure if another writer bumped the version first.
pub fn update_document(conn: &Connection, doc: &Document, expected_version: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE documents SET
            kind = ?2, title = ?3, rev = ?4, abstract = ?5, notify = ?6, ad = ?7,
            shepherd = ?8, stream = ?9, group_acronym = ?10, group_kind = ?11,
            intended_std_level = ?12, std_level = ?13, rfc_number = ?14,
            substate = ?15, version = ?16, time_us = ?17
         WHERE name = ?1 AND version = ?18",
        params![
            doc.name,
            doc.kind.as_str(),
            doc.title,
            doc.rev,
            doc.abstract_text,
            doc.notify,
            doc.ad.as_ref().map(PersonId::as_str),
            doc.shepherd.as_ref().map(PersonId::as_str),
            doc.stream.map(|s| s.as_str()),
            doc.group.acronym,
            doc.group.kind.as_str(),
            doc.intended_std_level.map(|l| l.as_str()),
            doc.std_level.map(|l| l.as_str()),
            doc.rfc_number.map(i64::from),
            doc.substate.map(|s| s.as_str()),
            version_to_sql(doc.version)?,
            to_us(doc.time),
            version_to_sql(expected_version)?,
        ],
    )?;
    if updated == 0 {
        return Err(DocketError::precondition(
            ErrorCode::ConcurrentModification,
            format!(
                "{} changed since version {expected_version} was read",
                doc.name
            ),
        ));
    }
    replace_children(conn, doc)
}

fn replace_children(conn: &Connection, doc: &Document) -> Result<()> {
    for table in [
        "document_states",
        "document_tags",
        "document_authors",
        "action_holders",
    ] {
        conn.execute(&format!("DELETE FROM {table} WHERE doc = ?1"), [&doc.name])?;
    }

    let mut states =
        conn.prepare_cached("INSERT INTO document_states (doc, state_type, state) VALUES (?1, ?2, ?3)")?;
    for state in doc.states.iter() {
        states.execute(params![doc.name, state.state_type, state.slug])?;
    }

    let mut tags = conn.prepare_cached("INSERT INTO document_tags (doc, tag) VALUES (?1, ?2)")?;
    for tag in &doc.tags {
        tags.execute(params![doc.name, tag])?;
    }

    let mut authors =
        conn.prepare_cached("INSERT INTO document_authors (doc, person, ord) VALUES (?1, ?2, ?3)")?;
    for (ord, author) in (0_i64..).zip(&doc.authors) {
        authors.execute(params![doc.name, author.as_str(), ord])?;
    }

    let mut holders =
        conn.prepare_cached("INSERT INTO action_holders (doc, person) VALUES (?1, ?2)")?;
    for person in &doc.action_holders {
        holders.execute(params![doc.name, person.as_str()])?;
    }
    Ok(())
}

struct DocumentRow {
    name: String,
    kind: String,
    title: String,
    rev: String,
    abstract_text: String,
    notify: String,
    ad: Option<String>,
    shepherd: Option<String>,
    stream: Option<String>,
    group_acronym: String,
    group_kind: String,
    intended_std_level: Option<String>,
    std_level: Option<String>,
    rfc_number: Option<i64>,
    substate: Option<String>,
    version: i64,
    time_us: i64,
}

fn parse_opt<T>(column: &str, raw: Option<&str>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|raw| parse_slug(column, raw)).transpose()
}

/// Load the live document, resolving its states through `catalog`.
///
/// # Errors
///
/// Storage errors, or a corrupt-record error when a stored value no longer
/// parses or a state is missing from the catalog.
pub fn load_document(
    conn: &Connection,
    catalog: &StateCatalog,
    name: &str,
) -> Result<Option<Document>> {
    let row = conn
        .query_row(
            "SELECT name, kind, title, rev, abstract, notify, ad, shepherd, stream,
                    group_acronym, group_kind, intended_std_level, std_level, rfc_number,
                    substate, version, time_us
             FROM documents WHERE name = ?1",
            [name],
            |row| {
                Ok(DocumentRow {
                    name: row.get(0)?,
                    kind: row.get(1)?,
                    title: row.get(2)?,
                    rev: row.get(3)?,
                    abstract_text: row.get(4)?,
                    notify: row.get(5)?,
                    ad: row.get(6)?,
                    shepherd: row.get(7)?,
                    stream: row.get(8)?,
                    group_acronym: row.get(9)?,
                    group_kind: row.get(10)?,
                    intended_std_level: row.get(11)?,
                    std_level: row.get(12)?,
                    rfc_number: row.get(13)?,
                    substate: row.get(14)?,
                    version: row.get(15)?,
                    time_us: row.get(16)?,
                })
            },
        )
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut doc = Document::new(row.name, parse_slug("kind", &row.kind)?, row.title);
    doc.rev = row.rev;
    doc.abstract_text = row.abstract_text;
    doc.notify = row.notify;
    doc.ad = row.ad.map(PersonId::new);
    doc.shepherd = row.shepherd.map(PersonId::new);
    doc.stream = parse_opt("stream", row.stream.as_deref())?;
    doc.group = Group {
        acronym: row.group_acronym,
        kind: parse_slug("group_kind", &row.group_kind)?,
    };
    doc.intended_std_level = parse_opt("intended_std_level", row.intended_std_level.as_deref())?;
    doc.std_level = parse_opt("std_level", row.std_level.as_deref())?;
    doc.rfc_number = row
        .rfc_number
        .map(u32::try_from)
        .transpose()
        .map_err(|err| corrupt(format!("rfc_number: {err}")))?;
    doc.substate = parse_opt("substate", row.substate.as_deref())?;
    doc.version = u64::try_from(row.version).map_err(|err| corrupt(format!("version: {err}")))?;
    doc.time = from_us(row.time_us)?;

    doc.states = load_states(conn, catalog, &doc.name)?;
    doc.tags = conn
        .prepare_cached("SELECT tag FROM document_tags WHERE doc = ?1 ORDER BY tag")?
        .query_map([&doc.name], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    doc.authors = conn
        .prepare_cached("SELECT person FROM document_authors WHERE doc = ?1 ORDER BY ord")?
        .query_map([&doc.name], |row| row.get::<_, String>(0).map(PersonId::new))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    doc.action_holders = conn
        .prepare_cached("SELECT person FROM action_holders WHERE doc = ?1 ORDER BY person")?
        .query_map([&doc.name], |row| row.get::<_, String>(0).map(PersonId::new))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;

    Ok(Some(doc))
}

fn load_states(conn: &Connection, catalog: &StateCatalog, doc: &str) -> Result<CurrentStates> {
    let rows = conn
        .prepare_cached("SELECT state_type, state FROM document_states WHERE doc = ?1")?
        .query_map([doc], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut states = CurrentStates::default();
    for (state_type, slug) in rows {
        let state = catalog
            .state(&state_type, &slug)
            .ok_or_else(|| corrupt(format!("{doc}: unknown state {state_type}/{slug}")))?;
        states.set(state.clone());
    }
    Ok(states)
}

/// Persist an immutable JSON snapshot of `doc` as it is now, together
/// with its stored outgoing edges. Callers snapshot before they touch
/// the edge table.
///
/// # Errors
///
/// Storage or serialization failure.
pub fn insert_snapshot(conn: &Connection, doc: &Document) -> Result<i64> {
    let json = serde_json::to_string(doc)?;
    let relations = serde_json::to_string(&super::query::relations_from(conn, &doc.name)?)?;
    conn.execute(
        "INSERT INTO doc_history (doc, rev, time_us, snapshot_json, relations_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![doc.name, doc.rev, to_us(doc.time), json, relations],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append an event and stamp it with its log id.
///
/// # Errors
///
/// Storage or serialization failure.
pub fn append_event(conn: &Connection, event: &mut Event) -> Result<i64> {
    let data = serde_json::to_string(&event.data)?;
    conn.execute(
        "INSERT INTO events (doc, time_us, by_person, rev, event_type, description, data_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.doc,
            to_us(event.time),
            event.by.as_str(),
            event.rev,
            event.event_type.as_str(),
            event.desc,
            data,
        ],
    )?;
    event.id = conn.last_insert_rowid();
    Ok(event.id)
}

/// Administrative removal of one event. Cascades to a ballot position the
/// event recorded.
///
/// # Errors
///
/// Storage failure.
pub fn delete_event(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn.execute("DELETE FROM events WHERE id = ?1", [id])? > 0)
}

/// # Errors
///
/// Storage failure, including the unique-index violation raised when an
/// open ballot of the same type already exists.
pub fn insert_ballot(
    conn: &Connection,
    doc: &str,
    ballot_type: &str,
    by: &PersonId,
    time: DateTime<Utc>,
) -> Result<Ballot> {
    conn.execute(
        "INSERT INTO ballots (doc, ballot_type, opened_by, opened_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![doc, ballot_type, by.as_str(), to_us(time)],
    )?;
    Ok(Ballot {
        id: conn.last_insert_rowid(),
        doc: doc.to_string(),
        ballot_type: ballot_type.to_string(),
        opened_by: by.clone(),
        opened_at: time,
        closed_at: None,
    })
}

/// Close a ballot. Returns `false` when it was already closed.
///
/// # Errors
///
/// Storage failure.
pub fn close_ballot(conn: &Connection, id: i64, time: DateTime<Utc>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE ballots SET closed_at_us = ?2 WHERE id = ?1 AND closed_at_us IS NULL",
        params![id, to_us(time)],
    )?;
    Ok(updated > 0)
}

/// Record a position row; `pos.id` must be the id of its event.
///
/// # Errors
///
/// Storage failure.
pub fn insert_position(conn: &Connection, pos: &BallotPosition) -> Result<()> {
    conn.execute(
        "INSERT INTO ballot_positions (
            event_id, ballot_id, balloter, pos, discuss, discuss_time_us,
            comment, comment_time_us, time_us, by_person
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            pos.id,
            pos.ballot_id,
            pos.balloter.as_str(),
            pos.pos.as_str(),
            pos.discuss,
            pos.discuss_time.map(to_us),
            pos.comment,
            pos.comment_time.map(to_us),
            to_us(pos.time),
            pos.by.as_str(),
        ],
    )?;
    Ok(())
}

/// Returns `false` if the edge already existed.
///
/// # Errors
///
/// Storage failure.
pub fn insert_relation(conn: &Connection, relation: &Relation) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO relations (source, target, kind) VALUES (?1, ?2, ?3)",
        params![relation.source, relation.target, relation.kind.as_str()],
    )?;
    Ok(inserted > 0)
}

/// Returns `false` if there was no such edge.
///
/// # Errors
///
/// Storage failure.
pub fn delete_relation(conn: &Connection, relation: &Relation) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM relations WHERE source = ?1 AND target = ?2 AND kind = ?3",
        params![relation.source, relation.target, relation.kind.as_str()],
    )?;
    Ok(deleted > 0)
}

/// Returns `false` if the date was already on the calendar.
///
/// # Errors
///
/// Storage failure.
pub fn insert_telechat_date(conn: &Connection, date: NaiveDate) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO telechat_dates (date) VALUES (?1)",
        [date.to_string()],
    )?;
    Ok(inserted > 0)
}

/// Park undelivered mail for a later retry.
///
/// # Errors
///
/// Storage or serialization failure.
pub fn enqueue_mail(
    conn: &Connection,
    mail: &OutgoingMail,
    error: &str,
    time: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO mail_outbox (doc, recipients_json, subject, body, attempts, last_error, created_at_us)
         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
        params![
            mail.doc,
            serde_json::to_string(&mail.to)?,
            mail.subject,
            mail.body,
            error,
            to_us(time),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
///
/// Storage failure.
pub fn mark_mail_delivered(conn: &Connection, id: i64, time: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE mail_outbox SET delivered_at_us = ?2, attempts = attempts + 1, last_error = NULL
         WHERE id = ?1",
        params![id, to_us(time)],
    )?;
    Ok(())
}

/// # Errors
///
/// Storage failure.
pub fn mark_mail_failed(conn: &Connection, id: i64, error: &str) -> Result<()> {
    conn.execute(
        "UPDATE mail_outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
        params![id, error],
    )?;
    Ok(())
}

/// # Errors
///
/// Storage failure.
pub fn set_last_sweep(conn: &Connection, time: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE store_meta SET last_sweep_at_us = ?1 WHERE id = 1",
        [to_us(time)],
    )?;
    Ok(())
}
