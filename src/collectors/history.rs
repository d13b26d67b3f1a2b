use log::{debug, error};
use std::time::Instant;

use crate::client::PitmasterClient;
use crate::models::history::HistoryPoint;

pub async fn collect_history(client: &PitmasterClient, minutes: u32) -> Option<Vec<HistoryPoint>> {
    let start = Instant::now();
    let result = match client.fetch_history(minutes).await {
        Ok(points) => Some(points),
        Err(e) => {
            error!("history poll failed: {}", e);
            None
        }
    };
    debug!("collect_history took: {} ms", start.elapsed().as_millis());
    result
}
