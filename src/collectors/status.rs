use log::{debug, error};
use std::time::Instant;

use crate::client::PitmasterClient;
use crate::models::status::StatusSnapshot;

/// Fetch the live status. Failures are logged and swallowed so the poll
/// loop keeps its cadence and the previous reading stays on screen.
pub async fn collect_status(client: &PitmasterClient) -> Option<StatusSnapshot> {
    let start = Instant::now();
    let result = match client.fetch_status().await {
        Ok(status) => Some(status),
        Err(e) => {
            error!("status poll failed: {}", e);
            None
        }
    };
    debug!("collect_status took: {} ms", start.elapsed().as_millis());
    result
}
