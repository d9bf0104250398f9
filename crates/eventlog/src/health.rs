//! Event log connection health probe.

use crate::client::EventLogClient;
use tracing::{debug, error};

/// Check connectivity with a trivial query.
pub async fn check_connection(client: &EventLogClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("Event log connection healthy");
            true
        }
        Err(e) => {
            error!(error = %e, "Event log connection check failed");
            false
        }
    }
}
