//! Dimension keys, per-dimension metric values, and output row types.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cohort::Cohort;
use crate::device::Device;

/// User id in the identity store.
pub type Uid = i64;

/// PV/UV accumulator for one dimension key.
///
/// UV is kept as the resolved-uid set and only collapsed to a count when a
/// row is emitted; a running counter would double-count under duplicate
/// event delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricStats {
    pub pv: u64,
    pub uv: HashSet<Uid>,
}

impl MetricStats {
    /// Record one event occurrence by the given user.
    pub fn hit(&mut self, uid: Uid) {
        self.pv += 1;
        self.uv.insert(uid);
    }

    pub fn uv_count(&self) -> u64 {
        self.uv.len() as u64
    }
}

/// Order/GMV accumulator for one dimension key. Amounts stay in the ledger's
/// minor currency unit until materialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub count: u64,
    pub amount_minor: i64,
}

impl OrderStats {
    pub fn add(&mut self, amount_minor: i64) {
        self.count += 1;
        self.amount_minor += amount_minor;
    }
}

/// Per-dimension metric table produced by one collector. `BTreeMap` keeps
/// iteration deterministic so repeated runs emit rows in the same order.
pub type MetricMap<K> = BTreeMap<K, MetricStats>;

/// Per-dimension order table produced by the order collector.
pub type OrderMap<K> = BTreeMap<K, OrderStats>;

/// Convert a minor-unit amount (cents) to the major currency unit, rounding
/// to the nearest minor unit first. Applied exactly once, at materialization.
pub fn minor_to_major(amount_minor: i64) -> f64 {
    (amount_minor as f64).round() / 100.0
}

// ---------------------------------------------------------------------------
// Dimension keys, one per daily job
// ---------------------------------------------------------------------------

/// Dimension key of the channel daily job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey {
    pub device: Device,
    pub channel: String,
    pub cohort: Cohort,
}

/// Dimension key of the search daily job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchKey {
    pub device: Device,
    pub search_term: String,
}

/// Dimension key of the template daily job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateKey {
    pub device: Device,
    pub template_id: String,
}

/// Dimension key of the new-user window job: behavior within the user's own
/// N-day registration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey {
    pub device: Device,
    pub window_days: u32,
}

// ---------------------------------------------------------------------------
// Output rows (natural key first, then metric columns)
// ---------------------------------------------------------------------------

/// One row of the channel daily statistics table.
/// Natural key: (tenant, date, device, channel, cohort).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDailyRow {
    pub tenant: String,
    pub date: NaiveDate,
    pub device: Device,
    pub channel: String,
    pub cohort: Cohort,

    pub view_pv: u64,
    pub view_uv: u64,
    pub click_pv: u64,
    pub click_uv: u64,
    pub intercept_pv: u64,
    pub intercept_uv: u64,
    pub creation_pv: u64,
    pub creation_uv: u64,
    pub conversion_pv: u64,
    pub conversion_uv: u64,
    pub order_count: u64,
    /// GMV in the major currency unit.
    pub gmv: f64,
}

impl ChannelDailyRow {
    pub fn is_zero(&self) -> bool {
        self.view_pv == 0
            && self.click_pv == 0
            && self.intercept_pv == 0
            && self.creation_pv == 0
            && self.conversion_pv == 0
            && self.order_count == 0
            && self.gmv == 0.0
    }
}

/// One row of the search daily statistics table.
/// Natural key: (tenant, date, device, search_term).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDailyRow {
    pub tenant: String,
    pub date: NaiveDate,
    pub device: Device,
    pub search_term: String,

    pub search_pv: u64,
    pub search_uv: u64,
    pub click_pv: u64,
    pub click_uv: u64,
}

impl SearchDailyRow {
    pub fn is_zero(&self) -> bool {
        self.search_pv == 0 && self.click_pv == 0
    }
}

/// One row of the template daily statistics table.
/// Natural key: (tenant, date, device, template_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDailyRow {
    pub tenant: String,
    pub date: NaiveDate,
    pub device: Device,
    pub template_id: String,

    pub exposure_pv: u64,
    pub exposure_uv: u64,
    pub click_pv: u64,
    pub click_uv: u64,
    pub creation_pv: u64,
    pub creation_uv: u64,
}

impl TemplateDailyRow {
    pub fn is_zero(&self) -> bool {
        self.exposure_pv == 0 && self.click_pv == 0 && self.creation_pv == 0
    }
}

/// One row of the new-user window statistics table.
/// Natural key: (tenant, date, device, window_days).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortWindowRow {
    pub tenant: String,
    pub date: NaiveDate,
    pub device: Device,
    pub window_days: u32,

    pub creation_pv: u64,
    pub creation_uv: u64,
    pub conversion_pv: u64,
    pub conversion_uv: u64,
    pub order_count: u64,
    pub gmv: f64,
}

impl CohortWindowRow {
    pub fn is_zero(&self) -> bool {
        self.creation_pv == 0 && self.conversion_pv == 0 && self.order_count == 0 && self.gmv == 0.0
    }
}
