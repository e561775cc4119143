//! Poll reconciliation: one view per poll across the local cache and the ledger.
//!
//! A view is either a cached poll, a ledger poll (with its metadata document
//! if it could be fetched), or both once a cached poll's chain identifier is
//! matched to a ledger index. Display fields resolve local value first, then
//! metadata, then a placeholder.

pub mod filter;
pub mod listing;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::format::{format_date, format_wei_to_eth};
use crate::models::rules::{PollStatus, calculate_progress, creator_label, poll_status};
use crate::models::{Amount, ChainPollRecord, LocalFeedback, LocalPoll, PollMetadata};

pub use filter::{BrowseFilter, StatusFilter};
pub use listing::{Listing, ListingMode, SkippedPoll, load_listing, load_poll};

pub const CHAIN_VIEW_PREFIX: &str = "blockchain_";

/// Ledger side of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainPoll {
    pub id: u64,
    pub data_hash: String,
    /// None when the metadata document could not be fetched or decoded.
    pub metadata: Option<PollMetadata>,
    pub details: ChainPollRecord,
}

impl ChainPoll {
    /// Whether this ledger record is the one `local` was created as: same
    /// creator, and same metadata hash when both sides carry one.
    pub fn belongs_to(&self, local: &LocalPoll) -> bool {
        if !self.details.is_created_by(&local.creator) {
            return false;
        }
        match (local.ipfs_hash.as_deref().and_then(non_empty), non_empty(&self.data_hash)) {
            (Some(cached), Some(ledger)) => cached == ledger,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollSource {
    Local(LocalPoll),
    Chain(ChainPoll),
    Combined { local: LocalPoll, chain: ChainPoll },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    Local,
    Blockchain,
    Combined,
}

/// How a view relates to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "chainId", rename_all = "lowercase")]
pub enum LinkStatus {
    /// Cached only, never linked to a chain identifier.
    Unlinked,
    /// Cached poll carries a chain identifier that matched no readable ledger
    /// index, or whose ledger record belongs to a different poll.
    Unconfirmed(u64),
    /// Ledger data is attached.
    Confirmed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub received: u64,
    pub max: u64,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPollView {
    pub id: String,
    pub source: PollSource,
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() { None } else { Some(s) }
}

impl CombinedPollView {
    pub fn local(poll: LocalPoll) -> Self {
        CombinedPollView {
            id: poll.id.clone(),
            source: PollSource::Local(poll),
        }
    }

    pub fn chain(chain: ChainPoll) -> Self {
        CombinedPollView {
            id: format!("{CHAIN_VIEW_PREFIX}{}", chain.id),
            source: PollSource::Chain(chain),
        }
    }

    pub fn combined(local: LocalPoll, chain: ChainPoll) -> Self {
        CombinedPollView {
            id: local.id.clone(),
            source: PollSource::Combined { local, chain },
        }
    }

    /// Attach ledger data, turning a cached view into a combined one.
    /// Views that already carry ledger data are returned unchanged.
    pub fn attach_chain(self, chain: ChainPoll) -> Self {
        match self.source {
            PollSource::Local(local) => CombinedPollView::combined(local, chain),
            other => CombinedPollView { id: self.id, source: other },
        }
    }

    pub fn kind(&self) -> PollKind {
        match &self.source {
            PollSource::Local(_) => PollKind::Local,
            PollSource::Chain(_) => PollKind::Blockchain,
            PollSource::Combined { .. } => PollKind::Combined,
        }
    }

    pub fn local_data(&self) -> Option<&LocalPoll> {
        match &self.source {
            PollSource::Local(local) | PollSource::Combined { local, .. } => Some(local),
            PollSource::Chain(_) => None,
        }
    }

    pub fn chain_data(&self) -> Option<&ChainPoll> {
        match &self.source {
            PollSource::Chain(chain) | PollSource::Combined { chain, .. } => Some(chain),
            PollSource::Local(_) => None,
        }
    }

    fn metadata(&self) -> Option<&PollMetadata> {
        self.chain_data().and_then(|c| c.metadata.as_ref())
    }

    pub fn link_status(&self) -> LinkStatus {
        match &self.source {
            PollSource::Local(local) => match local.contract_id {
                Some(id) => LinkStatus::Unconfirmed(id),
                None => LinkStatus::Unlinked,
            },
            PollSource::Chain(chain) | PollSource::Combined { chain, .. } => {
                LinkStatus::Confirmed(chain.id)
            }
        }
    }

    /// Ledger identifier to submit feedback against, when ledger data is attached.
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_data().map(|c| c.id)
    }

    pub fn title(&self) -> String {
        if let Some(t) = self.local_data().and_then(|l| non_empty(&l.title)) {
            return t.to_string();
        }
        if let Some(t) = self.metadata().and_then(|m| non_empty(&m.title)) {
            return t.to_string();
        }
        match self.chain_id() {
            Some(id) => format!("Poll #{id}"),
            None => "Poll #Unknown".to_string(),
        }
    }

    pub fn description(&self) -> String {
        self.local_data()
            .and_then(|l| non_empty(&l.description))
            .or_else(|| self.metadata().and_then(|m| non_empty(&m.description)))
            .unwrap_or("No description available")
            .to_string()
    }

    pub fn category(&self) -> String {
        self.local_data()
            .and_then(|l| non_empty(&l.category))
            .or_else(|| self.metadata().and_then(|m| non_empty(&m.category)))
            .unwrap_or("Other")
            .to_string()
    }

    pub fn questions(&self) -> Vec<String> {
        match (self.local_data(), self.metadata()) {
            (Some(l), _) if !l.questions.is_empty() => l.questions.clone(),
            (_, Some(m)) => m.questions.clone(),
            _ => Vec::new(),
        }
    }

    pub fn duration_days(&self) -> Option<u32> {
        self.local_data()
            .map(|l| l.duration)
            .or_else(|| self.metadata().map(|m| m.duration))
    }

    pub fn reward_per_feedback(&self) -> Amount {
        match &self.source {
            PollSource::Local(local) | PollSource::Combined { local, .. } => {
                local.reward_per_feedback.clone()
            }
            PollSource::Chain(chain) => chain.details.reward_per_feedback.clone(),
        }
    }

    pub fn reward_pool(&self) -> Amount {
        match &self.source {
            PollSource::Local(local) | PollSource::Combined { local, .. } => {
                local.reward_pool.clone()
            }
            PollSource::Chain(chain) => chain.details.reward_pool.clone(),
        }
    }

    pub fn creator(&self) -> Option<&str> {
        self.local_data()
            .and_then(|l| non_empty(&l.creator))
            .or_else(|| self.chain_data().and_then(|c| non_empty(&c.details.creator)))
    }

    pub fn is_created_by(&self, account: &str) -> bool {
        self.creator().is_some_and(|c| c.eq_ignore_ascii_case(account))
    }

    pub fn progress(&self) -> Progress {
        let (received, max) = match &self.source {
            PollSource::Local(local) | PollSource::Combined { local, .. } => {
                (local.feedbacks.len() as u64, local.max_feedbacks)
            }
            PollSource::Chain(chain) => {
                (chain.details.feedbacks_received, chain.details.max_feedbacks)
            }
        };
        Progress {
            received,
            max,
            percentage: calculate_progress(received, max),
        }
    }

    /// Activity used by the status filter: a linked cached poll answers for
    /// itself, otherwise ledger data decides, otherwise the cached flag.
    pub fn is_active(&self) -> bool {
        match &self.source {
            PollSource::Local(local) => local.is_active,
            PollSource::Combined { local, chain } => {
                if local.contract_id.is_some() {
                    local.is_active
                } else {
                    chain.details.is_active
                }
            }
            PollSource::Chain(chain) => chain.details.is_active,
        }
    }

    pub fn status(&self) -> PollStatus {
        let p = self.progress();
        poll_status(self.is_active(), p.received, p.max)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.local_data()
            .map(|l| l.created_at)
            .or_else(|| self.metadata().map(|m| m.created_at))
    }

    pub fn feedbacks(&self) -> &[LocalFeedback] {
        self.local_data().map(|l| l.feedbacks.as_slice()).unwrap_or(&[])
    }

    pub fn card(&self) -> PollCard {
        PollCard {
            id: self.id.clone(),
            kind: self.kind(),
            link: self.link_status(),
            title: self.title(),
            description: self.description(),
            category: self.category(),
            reward_per_feedback: format_wei_to_eth(&self.reward_per_feedback(), 4),
            creator: creator_label(self.creator()),
            progress: self.progress(),
            status: self.status(),
            status_label: self.status().label(),
            date: self
                .created_at()
                .map(|at| format_date(&at))
                .unwrap_or_else(|| "Unknown date".to_string()),
        }
    }
}

/// Newest first; views without any timestamp go last.
pub fn sort_newest_first(views: &mut [CombinedPollView]) {
    views.sort_by(|a, b| match (a.created_at(), b.created_at()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Listing entry with every display field resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCard {
    pub id: String,
    pub kind: PollKind,
    pub link: LinkStatus,
    pub title: String,
    pub description: String,
    pub category: String,
    pub reward_per_feedback: String,
    pub creator: String,
    pub progress: Progress,
    pub status: PollStatus,
    /// Display text for `status`.
    pub status_label: &'static str,
    pub date: String,
}
