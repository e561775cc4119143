pub mod amount;
pub mod chain;
pub mod metadata;
pub mod poll;
pub mod rules;

pub use amount::Amount;
pub use chain::{ChainPollRecord, MinimumRequirements, UserAccount};
pub use metadata::{PollMetadata, ProfileMetadata};
pub use poll::{LocalFeedback, LocalPoll, NewFeedback, NewPoll};
