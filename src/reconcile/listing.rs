use crate::clients::metadata::fetch_as;
use crate::clients::{LedgerError, MetadataClient, PollLedger};
use crate::errors::AppError;
use crate::models::rules::is_valid_content_hash;
use crate::models::{LocalPoll, PollMetadata};

use super::{CHAIN_VIEW_PREFIX, ChainPoll, CombinedPollView, sort_newest_first};

/// Which polls a listing shows relative to the viewing account.
#[derive(Debug, Clone, Copy)]
pub enum ListingMode<'a> {
    /// Everyone else's polls; all polls when nobody is connected.
    Browse { viewer: Option<&'a str> },
    /// Only the viewer's own polls.
    Dashboard { viewer: &'a str },
}

impl ListingMode<'_> {
    fn includes(&self, creator: &str) -> bool {
        match self {
            ListingMode::Browse { viewer: None } => true,
            ListingMode::Browse { viewer: Some(v) } => !creator.eq_ignore_ascii_case(v),
            ListingMode::Dashboard { viewer } => creator.eq_ignore_ascii_case(viewer),
        }
    }
}

/// Ledger index that could not be read and was left out of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPoll {
    pub chain_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub polls: Vec<CombinedPollView>,
    pub skipped: Vec<SkippedPoll>,
    /// Set when the ledger could not be enumerated at all; `polls` then holds
    /// cached polls only.
    pub chain_error: Option<String>,
}

/// Build the reconciled listing for `mode`.
///
/// `local` is a snapshot of the cache, read before any ledger call. Ledger
/// indices `1..=total` are read in ascending order; any per-index failure is
/// recorded in [`Listing::skipped`] and the rest continue. A cached poll whose
/// chain identifier matches an index, and which that ledger record
/// [belongs to](ChainPoll::belongs_to), is upgraded in place to a combined
/// view, so each poll appears at most once. A cached poll claiming a record
/// that is not its own stays unconfirmed.
pub async fn load_listing(
    local: Vec<LocalPoll>,
    ledger: &dyn PollLedger,
    metadata: &dyn MetadataClient,
    mode: ListingMode<'_>,
) -> Listing {
    let mut listing = Listing {
        polls: local
            .into_iter()
            .filter(|p| mode.includes(&p.creator))
            .map(CombinedPollView::local)
            .collect(),
        ..Default::default()
    };

    if let ListingMode::Dashboard { viewer } = mode {
        match ledger.get_user_data(viewer).await {
            Ok(user) if user.is_registered => {}
            Ok(_) => {
                log::debug!("Dashboard for unregistered {viewer}: cached polls only");
                sort_newest_first(&mut listing.polls);
                return listing;
            }
            Err(e) => {
                log::warn!("Could not read account {viewer}: {e}");
                listing.chain_error = Some(e.to_string());
                sort_newest_first(&mut listing.polls);
                return listing;
            }
        }
    }

    let total = match ledger.get_total_polls().await {
        Ok(total) => total,
        Err(e) => {
            log::warn!("Could not enumerate ledger polls: {e}");
            listing.chain_error = Some(e.to_string());
            sort_newest_first(&mut listing.polls);
            return listing;
        }
    };

    for chain_id in 1..=total {
        let chain = match read_chain_poll(ledger, metadata, chain_id, Some(&mode)).await {
            Ok(Some(chain)) => chain,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping ledger poll {chain_id}: {e}");
                listing.skipped.push(SkippedPoll {
                    chain_id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let linked = listing.polls.iter().position(|v| {
            v.local_data()
                .is_some_and(|l| l.contract_id == Some(chain_id) && chain.belongs_to(l))
        });
        match linked {
            Some(i) => {
                let view = listing.polls.swap_remove(i);
                listing.polls.push(view.attach_chain(chain));
            }
            None => listing.polls.push(CombinedPollView::chain(chain)),
        }
    }

    sort_newest_first(&mut listing.polls);
    listing
}

/// Read one ledger poll and its metadata document. Returns `None` when the
/// creator is outside `mode`. A missing, malformed or unreadable metadata
/// hash is not an error; the view falls back to placeholders.
async fn read_chain_poll(
    ledger: &dyn PollLedger,
    metadata: &dyn MetadataClient,
    chain_id: u64,
    mode: Option<&ListingMode<'_>>,
) -> Result<Option<ChainPoll>, LedgerError> {
    let details = ledger.get_poll_details(chain_id).await?;
    if let Some(mode) = mode {
        if !mode.includes(&details.creator) {
            return Ok(None);
        }
    }
    let data_hash = ledger.get_poll_data_hash(chain_id).await?;

    let meta = if data_hash.is_empty() {
        None
    } else if !is_valid_content_hash(&data_hash) {
        log::warn!("Ledger poll {chain_id} has malformed metadata hash {data_hash:?}");
        None
    } else {
        match fetch_as::<PollMetadata>(metadata, &data_hash).await {
            Ok(m) => Some(m),
            Err(e) => {
                log::warn!("Metadata for ledger poll {chain_id} unavailable: {e}");
                None
            }
        }
    };

    Ok(Some(ChainPoll {
        id: chain_id,
        data_hash,
        metadata: meta,
        details,
    }))
}

/// Parse a `blockchain_<n>` view id, or a bare ledger index.
pub fn parse_chain_view_id(id: &str) -> Option<u64> {
    id.strip_prefix(CHAIN_VIEW_PREFIX)
        .unwrap_or(id)
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
}

/// Resolve one poll by view id: a cached poll id, `blockchain_<n>`, or `<n>`.
///
/// Cached polls with a chain identifier get their ledger data attached when it
/// can be read and belongs to them. A ledger id that a cached poll links to
/// resolves to that cached poll's combined view.
pub async fn load_poll(
    id: &str,
    local: &[LocalPoll],
    ledger: &dyn PollLedger,
    metadata: &dyn MetadataClient,
) -> Result<CombinedPollView, AppError> {
    if let Some(poll) = local.iter().find(|p| p.id == id) {
        let view = CombinedPollView::local(poll.clone());
        let Some(chain_id) = poll.contract_id else {
            return Ok(view);
        };
        return match read_chain_poll(ledger, metadata, chain_id, None).await {
            Ok(Some(chain)) if chain.belongs_to(poll) => Ok(view.attach_chain(chain)),
            Ok(Some(chain)) => {
                log::warn!(
                    "Poll {id} claims ledger poll {chain_id}, but that record belongs to another poll (creator {})",
                    chain.details.creator
                );
                Ok(view)
            }
            Ok(None) => Ok(view),
            Err(e) => {
                log::warn!("Ledger data for {id} (chain id {chain_id}) unavailable: {e}");
                Ok(view)
            }
        };
    }

    let chain_id = parse_chain_view_id(id).ok_or_else(|| AppError::NotFound("Poll".into()))?;
    let chain = match read_chain_poll(ledger, metadata, chain_id, None).await {
        Ok(Some(chain)) => chain,
        Ok(None) => return Err(AppError::NotFound("Poll".into())),
        Err(LedgerError::Reverted(reason)) => {
            log::debug!("Ledger poll {chain_id} not readable: {reason}");
            return Err(AppError::NotFound("Poll".into()));
        }
        Err(e) => return Err(e.into()),
    };

    match local
        .iter()
        .find(|p| p.contract_id == Some(chain_id) && chain.belongs_to(p))
    {
        Some(poll) => Ok(CombinedPollView::combined(poll.clone(), chain)),
        None => Ok(CombinedPollView::chain(chain)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_view_ids() {
        assert_eq!(parse_chain_view_id("blockchain_12"), Some(12));
        assert_eq!(parse_chain_view_id("7"), Some(7));
        assert_eq!(parse_chain_view_id("blockchain_0"), None);
        assert_eq!(parse_chain_view_id("poll_1_abc"), None);
    }

    #[test]
    fn mode_membership_ignores_case() {
        let browse = ListingMode::Browse { viewer: Some("0xABC") };
        assert!(!browse.includes("0xabc"));
        assert!(browse.includes("0xdef"));
        assert!(ListingMode::Browse { viewer: None }.includes("0xabc"));
        assert!(ListingMode::Dashboard { viewer: "0xabc" }.includes("0xABC"));
    }
}
