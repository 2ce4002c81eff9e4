use log::{debug, info, warn};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
const DEFAULT_SCAN_DURATION_SECS: u64 = 20;
const DEFAULT_SUMMARY_INTERVAL_SECS: u64 = 1800; // 30 minutes
const DEFAULT_FRAME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No MikroTik tags configured. Please set MIKROTIK_TAGS or MIKROTIK_TAG_<N>_MAC/MIKROTIK_TAG_<N>_NAME environment variables")]
    NoTags,

    #[error("Invalid MAC address '{0}': expected 12 hex digits")]
    InvalidMac(String),

    #[error("Tag {0} is configured more than once")]
    DuplicateMac(String),

    #[error("Invalid tag entry '{0}': expected MAC=Name")]
    InvalidEntry(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidNumber { key: String, value: String },

    #[error("{0}")]
    InvalidDuration(String),
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Normalised MAC ("AA:BB:CC:DD:EE:FF") -> display name
    pub tags: HashMap<String, String>,
    pub scan_interval: Duration,
    pub scan_duration: Duration,
    pub summary_interval: Duration,
    pub channel_capacity: usize,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let tags = match env::var("MIKROTIK_TAGS") {
            Ok(list) => {
                debug!("Found MIKROTIK_TAGS: '{}'", list);
                parse_tag_list(&list)?
            }
            Err(_) => {
                // Fallback to individual environment variables
                info!("MIKROTIK_TAGS environment variable not found, trying individual variables");
                parse_indexed_tags(env::vars())?
            }
        };

        let config = MonitorConfig {
            tags,
            scan_interval: Duration::from_secs(env_number(
                "SCAN_INTERVAL_SECS",
                DEFAULT_SCAN_INTERVAL_SECS,
            )?),
            scan_duration: Duration::from_secs(env_number(
                "SCAN_DURATION_SECS",
                DEFAULT_SCAN_DURATION_SECS,
            )?),
            summary_interval: Duration::from_secs(env_number(
                "SUMMARY_INTERVAL_SECS",
                DEFAULT_SUMMARY_INTERVAL_SECS,
            )?),
            channel_capacity: env_number("FRAME_CHANNEL_CAPACITY", DEFAULT_FRAME_CHANNEL_CAPACITY)?,
        };
        config.validate()?;

        info!("Total tags loaded: {}", config.tags.len());
        for (mac, name) in &config.tags {
            info!("Tag: {} -> {}", mac, name);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::NoTags);
        }
        if self.scan_duration.is_zero() || self.summary_interval.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "scan duration and summary interval must be positive".into(),
            ));
        }
        if self.scan_duration > self.scan_interval {
            return Err(ConfigError::InvalidDuration(format!(
                "scan duration ({}s) exceeds scan interval ({}s)",
                self.scan_duration.as_secs(),
                self.scan_interval.as_secs()
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "FRAME_CHANNEL_CAPACITY".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    pub fn tag_name(&self, address: &str) -> Option<&str> {
        self.tags.get(address).map(String::as_str)
    }
}

/// Normalise a MAC to upper-case, colon separated form.
///
/// ':' and '-' separators are accepted; anything else must be hex digits.
pub fn normalize_mac(mac: &str) -> Result<String, ConfigError> {
    let digits: String = mac
        .trim()
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidMac(mac.trim().to_string()));
    }

    let digits = digits.to_ascii_uppercase();
    let octets: Vec<&str> = (0..12).step_by(2).map(|i| &digits[i..i + 2]).collect();
    Ok(octets.join(":"))
}

/// Parse "MAC=Name,MAC=Name"
pub fn parse_tag_list(list: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tags = HashMap::new();

    for pair in list.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (mac, name) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidEntry(pair.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidEntry(pair.to_string()));
        }
        insert_tag(&mut tags, mac, name)?;
    }

    Ok(tags)
}

/// Collect MIKROTIK_TAG_<N>_MAC / MIKROTIK_TAG_<N>_NAME pairs
pub fn parse_indexed_tags<I>(vars: I) -> Result<HashMap<String, String>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars.into_iter().collect();
    let mut tags = HashMap::new();

    for (key, mac) in &vars {
        let Some(index) = key
            .strip_prefix("MIKROTIK_TAG_")
            .and_then(|s| s.strip_suffix("_MAC"))
        else {
            continue;
        };

        let name_key = format!("MIKROTIK_TAG_{}_NAME", index);
        match vars.get(&name_key) {
            Some(name) if !name.trim().is_empty() => insert_tag(&mut tags, mac, name.trim())?,
            _ => warn!("{} is set but {} is missing, skipping", key, name_key),
        }
    }

    Ok(tags)
}

fn insert_tag(
    tags: &mut HashMap<String, String>,
    mac: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let mac = normalize_mac(mac)?;
    if tags.contains_key(&mac) {
        return Err(ConfigError::DuplicateMac(mac));
    }
    debug!("Found MAC: '{}', Name: '{}'", mac, name);
    tags.insert(mac, name.to_string());
    Ok(())
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(default),
    }
}
