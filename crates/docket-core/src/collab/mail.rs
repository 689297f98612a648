//! Outbound notification seam.
//!
//! The core hands finished messages to a [`Mailer`] only after the change
//! that produced them is committed. Delivery failures never reach back
//! into the ledger; they are parked in the `mail_outbox` table instead.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    /// Document the message is about.
    pub doc: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(
        doc: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            doc: doc.into(),
            to,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Any transport failure; the caller queues the message for retry.
    fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(
            doc = %mail.doc,
            to = %mail.to.join(", "),
            subject = %mail.subject,
            "mail"
        );
        Ok(())
    }
}

/// Collects messages in memory; cloning shares the mailbox.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("mail transport unavailable");
        }
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("mailbox lock poisoned"))?
            .push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mailer, MemoryMailer, OutgoingMail};

    #[test]
    fn memory_mailer_shares_mailbox_and_can_fail() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();
        let mail = OutgoingMail::new("draft-x", vec!["iesg@example.org".into()], "Hi", "Body");

        mailer.send(&mail).unwrap();
        assert_eq!(handle.sent(), vec![mail.clone()]);

        handle.set_failing(true);
        assert!(mailer.send(&mail).is_err());
        assert_eq!(handle.sent().len(), 1);
    }
}
