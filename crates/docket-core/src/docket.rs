//! The service facade: one store connection plus the collaborators every
//! operation needs.
//!
//! Every mutating call goes through [`Docket::transact`], which opens a
//! `BEGIN IMMEDIATE` transaction, hands the operation a [`Txn`], commits,
//! and only then delivers whatever mail the operation queued. A failed
//! delivery is logged, parked in the outbox and reported through
//! [`Docket::take_delivery_failures`]; the committed change stays.

use crate::ballot::types::BallotCatalog;
use crate::catalog::StateCatalog;
use crate::clock::{Clock, SystemClock};
use crate::collab::{
    ActionHolderPolicy, CannedWriteups, IesgActionHolders, LogMailer, Mailer, MembershipProvider,
    OutgoingMail, StaticRoster, WriteupGenerator,
};
use crate::config::{self, LastCallConfig, MailConfig, ProjectConfig};
use crate::db::{self, query, store};
use crate::error::{Collaborator, DocketError, Result};
use crate::model::document::Document;
use crate::model::person::PersonId;
use anyhow::Context as _;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use tracing::{debug, info, warn};

/// Tunables that come from project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub last_call: LastCallConfig,
    pub mail: MailConfig,
    /// Seeded into the telechat calendar when the service is built.
    pub telechat_dates: Vec<NaiveDate>,
}

impl Settings {
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            last_call: config.last_call.clone(),
            mail: config.mail.clone(),
            telechat_dates: config.telechat.dates.clone(),
        }
    }
}

pub struct Docket {
    conn: Connection,
    catalog: StateCatalog,
    ballots: BallotCatalog,
    clock: Box<dyn Clock>,
    roster: Box<dyn MembershipProvider>,
    writeups: Box<dyn WriteupGenerator>,
    mailer: Box<dyn Mailer>,
    policy: Box<dyn ActionHolderPolicy>,
    settings: Settings,
    delivery_failures: Vec<DocketError>,
}

impl std::fmt::Debug for Docket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Docket")
            .field("settings", &self.settings)
            .field("delivery_failures", &self.delivery_failures.len())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Docket`]; unset collaborators fall back to the defaults
/// shipped with the crate.
#[derive(Default)]
pub struct DocketBuilder {
    catalog: Option<StateCatalog>,
    ballots: Option<BallotCatalog>,
    clock: Option<Box<dyn Clock>>,
    roster: Option<Box<dyn MembershipProvider>>,
    writeups: Option<Box<dyn WriteupGenerator>>,
    mailer: Option<Box<dyn Mailer>>,
    policy: Option<Box<dyn ActionHolderPolicy>>,
    settings: Settings,
}

impl DocketBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings and the static roster from a project config.
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            roster: Some(Box::new(StaticRoster::from_config(&config.roster))),
            settings: Settings::from_config(config),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn catalog(mut self, catalog: StateCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn ballots(mut self, ballots: BallotCatalog) -> Self {
        self.ballots = Some(ballots);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    #[must_use]
    pub fn roster(mut self, roster: impl MembershipProvider + 'static) -> Self {
        self.roster = Some(Box::new(roster));
        self
    }

    #[must_use]
    pub fn writeups(mut self, writeups: impl WriteupGenerator + 'static) -> Self {
        self.writeups = Some(Box::new(writeups));
        self
    }

    #[must_use]
    pub fn mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Some(Box::new(mailer));
        self
    }

    #[must_use]
    pub fn action_holders(mut self, policy: impl ActionHolderPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Wrap an already-migrated connection.
    ///
    /// # Errors
    ///
    /// Storage failure while seeding the telechat calendar.
    pub fn build(self, conn: Connection) -> Result<Docket> {
        for date in &self.settings.telechat_dates {
            store::insert_telechat_date(&conn, *date)?;
        }
        Ok(Docket {
            conn,
            catalog: self.catalog.unwrap_or_else(StateCatalog::ietf),
            ballots: self.ballots.unwrap_or_else(BallotCatalog::ietf),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            roster: self
                .roster
                .unwrap_or_else(|| Box::new(StaticRoster::new())),
            writeups: self.writeups.unwrap_or_else(|| Box::new(CannedWriteups)),
            mailer: self.mailer.unwrap_or_else(|| Box::new(LogMailer)),
            policy: self.policy.unwrap_or_else(|| Box::new(IesgActionHolders)),
            settings: self.settings,
            delivery_failures: Vec::new(),
        })
    }

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(self, path: &Path) -> anyhow::Result<Docket> {
        let conn = db::open_store(path)?;
        self.build(conn).context("seed store")
    }

    /// Fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create or migrate the database.
    pub fn in_memory(self) -> Result<Docket> {
        let conn = db::open_in_memory()?;
        self.build(conn)
    }
}

/// One unit of work: the open transaction plus read access to the
/// catalogs and collaborators. Mail queued here is delivered after commit.
pub struct Txn<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) catalog: &'a StateCatalog,
    pub(crate) ballots: &'a BallotCatalog,
    pub(crate) roster: &'a dyn MembershipProvider,
    pub(crate) writeups: &'a dyn WriteupGenerator,
    pub(crate) policy: &'a dyn ActionHolderPolicy,
    pub(crate) settings: &'a Settings,
    pub(crate) now: DateTime<Utc>,
    mail: RefCell<Vec<OutgoingMail>>,
}

impl Txn<'_> {
    /// Load a document or fail with not-found.
    pub(crate) fn document(&self, name: &str) -> Result<Document> {
        store::load_document(self.conn, self.catalog, name)?
            .ok_or_else(|| DocketError::DocumentNotFound(name.to_string()))
    }

    pub(crate) fn queue_mail(&self, mail: OutgoingMail) {
        self.mail.borrow_mut().push(mail);
    }

    /// Display name for descriptions; falls back to the raw id.
    pub(crate) fn person_name(&self, id: &PersonId) -> String {
        self.roster
            .display_name(id)
            .unwrap_or_else(|| id.to_string())
    }

    pub(crate) fn writeup_failed(err: &anyhow::Error) -> DocketError {
        DocketError::Collaborator {
            collaborator: Collaborator::WriteupGenerator,
            message: format!("{err:#}"),
        }
    }

    fn into_mail(self) -> Vec<OutgoingMail> {
        self.mail.into_inner()
    }
}

/// Result of redelivering the outbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl Docket {
    /// Open the project rooted at `project_root` with its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config does not parse or the store cannot be
    /// opened.
    pub fn open(project_root: &Path) -> anyhow::Result<Self> {
        let project = config::load_project_config(project_root)?;
        DocketBuilder::from_config(&project).open(&config::database_path(project_root))
    }

    #[must_use]
    pub fn builder() -> DocketBuilder {
        DocketBuilder::new()
    }

    #[must_use]
    pub const fn catalog(&self) -> &StateCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn ballot_catalog(&self) -> &BallotCatalog {
        &self.ballots
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Raw connection, for read-only inspection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mail failures since the last call, oldest first.
    pub fn take_delivery_failures(&mut self) -> Vec<DocketError> {
        std::mem::take(&mut self.delivery_failures)
    }

    /// Run `f` in one immediate transaction; deliver its mail after commit.
    pub(crate) fn transact<T>(&mut self, f: impl FnOnce(&Txn<'_>) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (value, mail) = {
            let txn = Txn {
                conn: &tx,
                catalog: &self.catalog,
                ballots: &self.ballots,
                roster: self.roster.as_ref(),
                writeups: self.writeups.as_ref(),
                policy: self.policy.as_ref(),
                settings: &self.settings,
                now,
                mail: RefCell::new(Vec::new()),
            };
            let value = f(&txn)?;
            (value, txn.into_mail())
        };
        tx.commit()?;
        self.dispatch(mail, now);
        Ok(value)
    }

    /// Read-only view over the live store, outside any transaction.
    pub(crate) fn reader(&self) -> Txn<'_> {
        Txn {
            conn: &self.conn,
            catalog: &self.catalog,
            ballots: &self.ballots,
            roster: self.roster.as_ref(),
            writeups: self.writeups.as_ref(),
            policy: self.policy.as_ref(),
            settings: &self.settings,
            now: self.clock.now(),
            mail: RefCell::new(Vec::new()),
        }
    }

    fn dispatch(&mut self, mail: Vec<OutgoingMail>, now: DateTime<Utc>) {
        for message in mail {
            match self.mailer.send(&message) {
                Ok(()) => debug!(doc = %message.doc, subject = %message.subject, "mail sent"),
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(
                        doc = %message.doc,
                        subject = %message.subject,
                        error = %reason,
                        "mail delivery failed; queued for retry"
                    );
                    if let Err(queue_err) = store::enqueue_mail(&self.conn, &message, &reason, now) {
                        warn!(doc = %message.doc, error = %queue_err, "could not queue mail");
                    }
                    self.delivery_failures.push(DocketError::Collaborator {
                        collaborator: Collaborator::Mailer,
                        message: format!("{}: {reason}", message.subject),
                    });
                }
            }
        }
    }

    /// Redeliver every parked message.
    ///
    /// # Errors
    ///
    /// Storage failure reading or updating the outbox. Delivery failures
    /// are counted, not returned.
    pub fn retry_outbox(&mut self) -> Result<RetryReport> {
        let now = self.clock.now();
        let mut report = RetryReport::default();
        for entry in query::pending_mail(&self.conn)? {
            match self.mailer.send(&entry.mail) {
                Ok(()) => {
                    store::mark_mail_delivered(&self.conn, entry.id, now)?;
                    report.delivered += 1;
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(id = entry.id, doc = %entry.mail.doc, error = %reason, "mail retry failed");
                    store::mark_mail_failed(&self.conn, entry.id, &reason)?;
                    report.failed += 1;
                }
            }
        }
        info!(delivered = report.delivered, failed = report.failed, "outbox retried");
        Ok(report)
    }

    /// # Errors
    ///
    /// Storage failure.
    pub fn pending_mail(&self) -> Result<Vec<query::OutboxEntry>> {
        query::pending_mail(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::DocketBuilder;
    use crate::clock::FixedClock;
    use crate::collab::{MemoryMailer, OutgoingMail};
    use crate::error::DocketError;
    use chrono::DateTime;

    #[test]
    fn failed_transaction_queues_no_mail() {
        let mailer = MemoryMailer::new();
        let mut docket = DocketBuilder::new()
            .mailer(mailer.clone())
            .in_memory()
            .unwrap();
        let result: Result<(), DocketError> = docket.transact(|txn| {
            txn.queue_mail(OutgoingMail::new("draft-a", vec![], "s", "b"));
            Err(DocketError::invariant("boom"))
        });
        assert!(result.is_err());
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn mail_failure_is_parked_and_retried() {
        let mailer = MemoryMailer::new();
        mailer.set_failing(true);
        let mut docket = DocketBuilder::new()
            .clock(FixedClock::new(DateTime::from_timestamp(1_000, 0).unwrap()))
            .mailer(mailer.clone())
            .in_memory()
            .unwrap();
        docket
            .transact(|txn| {
                txn.queue_mail(OutgoingMail::new("draft-a", vec!["x@y".into()], "s", "b"));
                Ok(())
            })
            .unwrap();

        assert_eq!(docket.take_delivery_failures().len(), 1);
        assert_eq!(docket.pending_mail().unwrap().len(), 1);

        mailer.set_failing(false);
        let report = docket.retry_outbox().unwrap();
        assert_eq!(report.delivered, 1);
        assert!(docket.pending_mail().unwrap().is_empty());
        assert_eq!(mailer.sent().len(), 1);
    }
}
