//! Acquisition channel attribution.
//!
//! A uid's channel is resolved once per run with an ordered strategy chain:
//! paid-campaign conversion, then successful ad-network "register"
//! conversion, then `"organic"`. Both evidence sources are prefetched with
//! one bulk query each; cohort sizes reach tens of thousands of uids.

use std::collections::HashMap;

use engine_core::{EntityStore, Uid};
use tracing::{info, warn};

/// Fallback channel when no attribution evidence exists.
pub const ORGANIC: &str = "organic";

/// `uid → channel`, resolved once per job run. Not time-varying within a
/// single day's statistics.
#[derive(Debug, Default)]
pub struct ChannelMap {
    map: HashMap<Uid, String>,
}

impl ChannelMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn channel(&self, uid: Uid) -> &str {
        self.map.get(&uid).map(String::as_str).unwrap_or(ORGANIC)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// One step of the resolution chain.
type Strategy<'a> = &'a dyn Fn(Uid) -> Option<String>;

/// First strategy producing a value wins.
fn first_match(uid: Uid, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| s(uid))
}

/// Resolve channels for all candidate uids.
///
/// A failed evidence query degrades that source to "no evidence" (the chain
/// falls through), never the whole run.
pub async fn resolve_channels(
    entities: &dyn EntityStore,
    tenant: &str,
    uids: &[Uid],
) -> ChannelMap {
    if uids.is_empty() {
        return ChannelMap::empty();
    }

    let campaign: HashMap<Uid, String> = match entities.campaign_conversions(tenant, uids).await {
        Ok(records) => records
            .into_iter()
            .filter_map(|r| r.channel.map(|c| (r.uid, c)))
            .collect(),
        Err(e) => {
            warn!(tenant = tenant, error = %e, "Campaign conversion query failed");
            HashMap::new()
        }
    };

    let ad: HashMap<Uid, String> = match entities.ad_conversions(tenant, uids).await {
        Ok(records) => records
            .into_iter()
            .filter(|r| r.event == "register" && r.report_status == "success")
            .filter_map(|r| r.platform.map(|p| (r.uid, p)))
            .collect(),
        Err(e) => {
            warn!(tenant = tenant, error = %e, "Ad conversion query failed");
            HashMap::new()
        }
    };

    let from_campaign = |uid: Uid| campaign.get(&uid).cloned();
    let from_ad = |uid: Uid| ad.get(&uid).cloned();
    let strategies: [Strategy; 2] = [&from_campaign, &from_ad];

    let map: HashMap<Uid, String> = uids
        .iter()
        .filter_map(|&uid| first_match(uid, &strategies).map(|c| (uid, c)))
        .collect();

    info!(
        tenant = tenant,
        candidates = uids.len(),
        attributed = map.len(),
        "Channel attribution resolved"
    );

    ChannelMap { map }
}
