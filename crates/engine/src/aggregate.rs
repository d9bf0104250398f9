//! Dimensional aggregation: fold all collector outputs into output rows.
//!
//! For every key in the observed dimension universe, each collector's value
//! is read with a zero default and one row is emitted. All-zero rows are
//! suppressed to bound table growth; the delete-then-insert write strategy
//! keeps that safe across runs. Minor→major GMV conversion happens here,
//! when the persisted row representation is built, and nowhere upstream.

use chrono::NaiveDate;
use engine_core::{
    minor_to_major, ChannelDailyRow, ChannelKey, CohortWindowRow, MetricMap, MetricStats,
    OrderMap, OrderStats, SearchDailyRow, SearchKey, TemplateDailyRow, TemplateKey, WindowKey,
};

use crate::universe::dimension_universe;

fn metric<K: Ord>(map: &MetricMap<K>, key: &K) -> MetricStats {
    map.get(key).cloned().unwrap_or_default()
}

fn orders<K: Ord>(map: &OrderMap<K>, key: &K) -> OrderStats {
    map.get(key).copied().unwrap_or_default()
}

/// Collector outputs feeding the channel daily table.
pub struct ChannelMetrics<'a> {
    pub views: &'a MetricMap<ChannelKey>,
    pub clicks: &'a MetricMap<ChannelKey>,
    pub intercepts: &'a MetricMap<ChannelKey>,
    /// Cross-source merged creation evidence.
    pub creations: &'a MetricMap<ChannelKey>,
    pub conversions: &'a MetricMap<ChannelKey>,
    pub orders: &'a OrderMap<ChannelKey>,
}

pub fn channel_rows(
    tenant: &str,
    date: NaiveDate,
    m: &ChannelMetrics,
) -> Vec<ChannelDailyRow> {
    let universe = dimension_universe(
        m.views
            .keys()
            .chain(m.clicks.keys())
            .chain(m.intercepts.keys())
            .chain(m.creations.keys())
            .chain(m.conversions.keys())
            .chain(m.orders.keys()),
    );

    universe
        .into_iter()
        .map(|key| {
            let view = metric(m.views, &key);
            let click = metric(m.clicks, &key);
            let intercept = metric(m.intercepts, &key);
            let creation = metric(m.creations, &key);
            let conversion = metric(m.conversions, &key);
            let order = orders(m.orders, &key);

            ChannelDailyRow {
                tenant: tenant.to_string(),
                date,
                device: key.device,
                channel: key.channel,
                cohort: key.cohort,
                view_pv: view.pv,
                view_uv: view.uv_count(),
                click_pv: click.pv,
                click_uv: click.uv_count(),
                intercept_pv: intercept.pv,
                intercept_uv: intercept.uv_count(),
                creation_pv: creation.pv,
                creation_uv: creation.uv_count(),
                conversion_pv: conversion.pv,
                conversion_uv: conversion.uv_count(),
                order_count: order.count,
                gmv: minor_to_major(order.amount_minor),
            }
        })
        .filter(|row| !row.is_zero())
        .collect()
}

/// Collector outputs feeding the search daily table.
pub struct SearchMetrics<'a> {
    pub searches: &'a MetricMap<SearchKey>,
    pub clicks: &'a MetricMap<SearchKey>,
}

pub fn search_rows(tenant: &str, date: NaiveDate, m: &SearchMetrics) -> Vec<SearchDailyRow> {
    let universe = dimension_universe(m.searches.keys().chain(m.clicks.keys()));

    universe
        .into_iter()
        .map(|key| {
            let search = metric(m.searches, &key);
            let click = metric(m.clicks, &key);
            SearchDailyRow {
                tenant: tenant.to_string(),
                date,
                device: key.device,
                search_term: key.search_term,
                search_pv: search.pv,
                search_uv: search.uv_count(),
                click_pv: click.pv,
                click_uv: click.uv_count(),
            }
        })
        .filter(|row| !row.is_zero())
        .collect()
}

/// Collector outputs feeding the template daily table.
pub struct TemplateMetrics<'a> {
    pub exposures: &'a MetricMap<TemplateKey>,
    pub clicks: &'a MetricMap<TemplateKey>,
    pub creations: &'a MetricMap<TemplateKey>,
}

pub fn template_rows(tenant: &str, date: NaiveDate, m: &TemplateMetrics) -> Vec<TemplateDailyRow> {
    let universe = dimension_universe(
        m.exposures
            .keys()
            .chain(m.clicks.keys())
            .chain(m.creations.keys()),
    );

    universe
        .into_iter()
        .map(|key| {
            let exposure = metric(m.exposures, &key);
            let click = metric(m.clicks, &key);
            let creation = metric(m.creations, &key);
            TemplateDailyRow {
                tenant: tenant.to_string(),
                date,
                device: key.device,
                template_id: key.template_id,
                exposure_pv: exposure.pv,
                exposure_uv: exposure.uv_count(),
                click_pv: click.pv,
                click_uv: click.uv_count(),
                creation_pv: creation.pv,
                creation_uv: creation.uv_count(),
            }
        })
        .filter(|row| !row.is_zero())
        .collect()
}

/// Collector outputs feeding the new-user window table.
pub struct WindowMetrics<'a> {
    pub creations: &'a MetricMap<WindowKey>,
    pub conversions: &'a MetricMap<WindowKey>,
    pub orders: &'a OrderMap<WindowKey>,
}

pub fn window_rows(tenant: &str, date: NaiveDate, m: &WindowMetrics) -> Vec<CohortWindowRow> {
    let universe = dimension_universe(
        m.creations
            .keys()
            .chain(m.conversions.keys())
            .chain(m.orders.keys()),
    );

    universe
        .into_iter()
        .map(|key| {
            let creation = metric(m.creations, &key);
            let conversion = metric(m.conversions, &key);
            let order = orders(m.orders, &key);
            CohortWindowRow {
                tenant: tenant.to_string(),
                date,
                device: key.device,
                window_days: key.window_days,
                creation_pv: creation.pv,
                creation_uv: creation.uv_count(),
                conversion_pv: conversion.pv,
                conversion_uv: conversion.uv_count(),
                order_count: order.count,
                gmv: minor_to_major(order.amount_minor),
            }
        })
        .filter(|row| !row.is_zero())
        .collect()
}
