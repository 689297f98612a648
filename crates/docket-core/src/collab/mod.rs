//! Narrow interfaces to the services the core consumes but does not own.

pub mod action_holders;
pub mod mail;
pub mod membership;
pub mod writeup;

pub use action_holders::{ActionHolderPolicy, IesgActionHolders};
pub use mail::{LogMailer, Mailer, MemoryMailer, OutgoingMail};
pub use membership::{MembershipProvider, StaticRoster};
pub use writeup::{
    CannedWriteups, DOWNREF_MARKER, WRITEUP_BOILERPLATE, WriteupContext, WriteupGenerator, WriteupKind,
};
