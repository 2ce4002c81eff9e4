/// Bluetooth Low Energy scanning for configured MikroTik tags
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use std::error::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::bluetooth::decoder::MIKROTIK_MANUFACTURER_ID;
use crate::config::MonitorConfig;
use crate::models::AdvertisementFrame;

/// Returned by `scan_for_tags` when the receiving side has gone away
#[derive(Debug, thiserror::Error)]
#[error("frame receiver closed")]
pub struct ReceiverClosed;

/// Run one discovery window and forward MikroTik manufacturer data
///
/// This function performs a Bluetooth Low Energy scan for `scan_duration`,
/// then reads the manufacturer data and signal strength of every configured
/// tag that was seen. Only the 0x094F manufacturer entry is forwarded; the
/// payload itself is not inspected here.
///
/// # Arguments
/// * `config` - Configuration containing tag MAC addresses to look for
/// * `tx` - Bounded channel to the frame consumer
///
/// # Returns
/// Number of frames sent, or an error if the Bluetooth stack failed or the
/// receiver was closed (`ReceiverClosed`)
pub async fn scan_for_tags(
    config: &MonitorConfig,
    tx: &mpsc::Sender<AdvertisementFrame>,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    // Get the default Bluetooth adapter
    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    // Ensure Bluetooth adapter is powered on
    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    // Tags advertise the same manufacturer data repeatedly, so duplicates are
    // needed to see value changes
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: true,
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    // Start device discovery in background
    let discovery_handle = match adapter.discover_devices().await {
        Ok(discovery_stream) => tokio::spawn(async move {
            let mut stream = discovery_stream;
            while let Some(event) = stream.next().await {
                debug!("Discovery event: {:?}", event);
            }
        }),
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e.into());
        }
    };

    // Let discovery run for the configured duration
    sleep(config.scan_duration).await;

    // Stop discovery
    discovery_handle.abort();

    // Get all discovered device addresses
    let devices = match adapter.device_addresses().await {
        Ok(devices) => devices,
        Err(e) => {
            error!("Failed to get device addresses: {}", e);
            return Err(e.into());
        }
    };

    let mut sent = 0;
    for addr in devices {
        let device = match adapter.device(addr) {
            Ok(device) => device,
            Err(_) => continue,
        };

        let addr_str = device.address().to_string().to_uppercase();

        // Only process devices that are in our configuration
        if config.tag_name(&addr_str).is_none() {
            continue;
        }

        let manufacturer_data = match device.manufacturer_data().await {
            Ok(Some(manufacturer_data)) => manufacturer_data,
            Ok(None) => {
                debug!("No manufacturer data for {}", addr_str);
                continue;
            }
            Err(e) => {
                debug!("Failed to get manufacturer data for {}: {}", addr_str, e);
                continue;
            }
        };

        let Some(data) = manufacturer_data.get(&MIKROTIK_MANUFACTURER_ID) else {
            debug!("{} has no MikroTik manufacturer data", addr_str);
            continue;
        };

        // RSSI is attached by the radio, it is not part of the payload
        let rssi = device.rssi().await.unwrap_or_else(|e| {
            debug!("Failed to get RSSI for {}: {}", addr_str, e);
            None
        });

        let frame = AdvertisementFrame {
            address: addr_str,
            manufacturer_id: MIKROTIK_MANUFACTURER_ID,
            data: data.clone(),
            rssi,
            received_at: OffsetDateTime::now_utc(),
        };
        if tx.send(frame).await.is_err() {
            return Err(ReceiverClosed.into());
        }
        sent += 1;
    }

    Ok(sent)
}

/// Repeat discovery windows every `scan_interval` until the receiver closes
///
/// Scan failures are logged and retried on the next window. Cancellation is
/// the caller's business: abort the task or drop the receiver.
pub async fn run_scanner(config: MonitorConfig, tx: mpsc::Sender<AdvertisementFrame>) {
    info!(
        "Scanning for {} tags every {}s ({}s windows)",
        config.tags.len(),
        config.scan_interval.as_secs(),
        config.scan_duration.as_secs()
    );

    loop {
        match scan_for_tags(&config, &tx).await {
            Ok(sent) => debug!("Scan window forwarded {} frames", sent),
            Err(e) if e.is::<ReceiverClosed>() => {
                info!("Frame receiver closed, stopping scanner");
                return;
            }
            Err(e) => error!("Scan failed: {}", e),
        }

        // Wait until next window, the scan itself took scan_duration
        let pause = config.scan_interval.saturating_sub(config.scan_duration);
        tokio::select! {
            _ = sleep(pause) => {}
            _ = tx.closed() => {
                info!("Frame receiver closed, stopping scanner");
                return;
            }
        }
    }
}
