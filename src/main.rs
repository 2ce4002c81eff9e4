use log::{error, info};
use tokio::sync::mpsc;

use mikrotik_tag_monitor::bluetooth::run_scanner;
use mikrotik_tag_monitor::{run_monitor, MonitorConfig, TagMonitor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Scanner -> monitor, bounded so a stalled consumer slows the scanner down
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let monitor = TagMonitor::new(config.tags.clone());
    let summary_interval = config.summary_interval;

    let scanner = tokio::spawn(run_scanner(config, tx));
    let consumer = tokio::spawn(run_monitor(rx, monitor, summary_interval));

    // Run until the tasks stop or Ctrl+C arrives
    tokio::select! {
        result = scanner => {
            if let Err(e) = result {
                error!("Scanner task failed: {}", e);
            }
        }
        result = consumer => {
            match result {
                Ok(monitor) => info!("Monitor stopped after {} rejected frames", monitor.rejected_frames()),
                Err(e) => error!("Monitor task failed: {}", e),
            }
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
