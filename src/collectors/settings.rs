use log::{debug, error};
use std::time::Instant;

use crate::client::PitmasterClient;
use crate::models::settings::DeviceSettings;

/// Refresh the device settings. Runs on a slower cadence than status;
/// a failure keeps the previously fetched record.
pub async fn collect_settings(client: &PitmasterClient) -> Option<DeviceSettings> {
    let start = Instant::now();
    let result = match client.fetch_settings().await {
        Ok(settings) => Some(settings),
        Err(e) => {
            error!("settings poll failed: {}", e);
            None
        }
    };
    debug!("collect_settings took: {} ms", start.elapsed().as_millis());
    result
}
