//! Ledger store reads: paid orders joined with their extension records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{Error, LedgerStore, OrderRecord, Result};
use sqlx::FromRow;

use crate::client::PostgresStore;

#[derive(Debug, FromRow)]
struct OrderRow {
    order_id: String,
    uid: i64,
    amount_minor: i64,
    paid_at: DateTime<Utc>,
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn paid_orders(
        &self,
        tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OrderRecord>> {
        // The order row itself carries the amount; the buyer uid lives on
        // the per-order extension record.
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT o.order_id, e.uid, o.amount_minor, o.paid_at FROM orders o \
             JOIN order_extensions e ON e.order_id = o.order_id \
             WHERE o.tenant = $1 AND o.status = 'paid' \
               AND o.paid_at >= $2 AND o.paid_at < $3",
        )
        .bind(tenant)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await
        .map_err(|e| Error::source(format!("Ledger query error: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| OrderRecord {
                order_id: r.order_id,
                uid: r.uid,
                amount_minor: r.amount_minor,
                paid_at: r.paid_at,
            })
            .collect())
    }
}
