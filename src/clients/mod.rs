pub mod ledger;
pub mod metadata;

pub use ledger::{InMemoryLedger, LedgerError, PollLedger};
pub use metadata::{InMemoryMetadataStore, MetadataClient, MetadataError, PinataClient};
