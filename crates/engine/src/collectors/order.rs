//! Order collector: paid orders from the ledger store.
//!
//! Amounts are accumulated in the ledger's minor currency unit; conversion
//! to major units happens once, at materialization.

use engine_core::{
    ChannelKey, DayWindow, LedgerStore, OrderMap, OrderRecord, Result, WindowKey,
};

use super::FoldCtx;

pub async fn fetch(
    ledger: &dyn LedgerStore,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<OrderRecord>> {
    ledger.paid_orders(tenant, window.from, window.to).await
}

pub fn fold_by_channel(ctx: &FoldCtx, orders: &[OrderRecord]) -> OrderMap<ChannelKey> {
    let mut map = OrderMap::new();
    for order in orders {
        let uid = match ctx.admit_uid(order.uid) {
            Some(uid) => uid,
            None => continue,
        };
        // Orders carry no platform of their own; the profile device decides.
        let key = ctx.channel_key(uid, None);
        map.entry(key).or_default().add(order.amount_minor);
    }
    map
}

pub fn fold_windows(ctx: &FoldCtx, orders: &[OrderRecord], windows: &[u32]) -> OrderMap<WindowKey> {
    let mut map = OrderMap::new();
    for order in orders {
        let uid = match ctx.admit_uid(order.uid) {
            Some(uid) => uid,
            None => continue,
        };
        for key in ctx.window_keys(uid, order.paid_at, None, windows) {
            map.entry(key).or_default().add(order.amount_minor);
        }
    }
    map
}
