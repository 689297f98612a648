//! Ballots: types and positions, pass criteria, and the workflows that
//! open, record, tally and close them.

pub mod criteria;
pub mod engine;
pub mod history;
pub mod tally;
pub mod types;
pub mod workflow;

pub use criteria::{NeededPositions, PassStatus, StatusChangeTarget, needed_positions, two_thirds_rule};
pub use engine::PositionInput;
pub use history::prior_positions;
pub use tally::{BallotTally, PositionSummary};
pub use types::{Ballot, BallotCatalog, BallotPosition, BallotType, PositionKind};
