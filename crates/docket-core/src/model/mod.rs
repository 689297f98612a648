pub mod document;
pub mod names;
pub mod person;
pub mod relation;

pub use document::{CurrentStates, Document, Group};
pub use names::{DocKind, GroupKind, IesgSubstate, ParseNameError, StdLevel, Stream};
pub use person::{Person, PersonId};
pub use relation::{Relation, RelationKind};
