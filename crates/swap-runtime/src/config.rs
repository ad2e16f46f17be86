//! Runtime configuration.
//!
//! Starts from `SwapConfig::default()`, replaced by the JSON file named in
//! `SWAP_CONFIG` when set, then applies single-value env overrides.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use swap_core::SwapConfig;

/// Chain seconds the in-memory ledgers advance per wall-clock second.
pub const DEFAULT_TIME_WARP: u64 = 30;

/// Everything the binary needs besides the signing key.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Engine configuration.
    pub swap: SwapConfig,
    /// Directory holding handoff files.
    pub handoff_dir: PathBuf,
    /// Ledger clock speed-up for the in-memory demo.
    pub time_warp: u64,
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<RuntimeConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_config_from<F>(lookup: F) -> Result<RuntimeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut swap = match lookup("SWAP_CONFIG") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            let config: SwapConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path))?;
            info!("Loaded swap configuration from {}", path);
            config
        }
        None => SwapConfig::default(),
    };

    if let Some(value) = lookup("SWAP_POLL_INTERVAL_MS") {
        match value.parse() {
            Ok(ms) => swap.poll_interval_ms = ms,
            Err(_) => warn!("SWAP_POLL_INTERVAL_MS must be an integer, got {:?}", value),
        }
    }

    let time_warp = match lookup("SWAP_TIME_WARP") {
        Some(value) => match value.parse::<u64>() {
            Ok(warp) if warp > 0 => warp,
            _ => {
                warn!("SWAP_TIME_WARP must be a positive integer, got {:?}", value);
                DEFAULT_TIME_WARP
            }
        },
        None => DEFAULT_TIME_WARP,
    };

    let handoff_dir = lookup("SWAP_HANDOFF_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("swap-handoff"));

    swap.validate().context("Invalid swap configuration")?;
    Ok(RuntimeConfig {
        swap,
        handoff_dir,
        time_warp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load_config_from(lookup(&[])).unwrap();
        assert_eq!(config.swap, SwapConfig::default());
        assert_eq!(config.time_warp, DEFAULT_TIME_WARP);
        assert!(config.handoff_dir.ends_with("swap-handoff"));
    }

    #[test]
    fn test_env_overrides() {
        let config = load_config_from(lookup(&[
            ("SWAP_POLL_INTERVAL_MS", "250"),
            ("SWAP_TIME_WARP", "5"),
            ("SWAP_HANDOFF_DIR", "/var/lib/swap"),
        ]))
        .unwrap();
        assert_eq!(config.swap.poll_interval_ms, 250);
        assert_eq!(config.time_warp, 5);
        assert_eq!(config.handoff_dir, PathBuf::from("/var/lib/swap"));
    }

    #[test]
    fn test_bad_override_keeps_default() {
        let config = load_config_from(lookup(&[
            ("SWAP_POLL_INTERVAL_MS", "fast"),
            ("SWAP_TIME_WARP", "0"),
        ]))
        .unwrap();
        assert_eq!(config.swap.poll_interval_ms, SwapConfig::default().poll_interval_ms);
        assert_eq!(config.time_warp, DEFAULT_TIME_WARP);
    }

    #[test]
    fn test_config_file_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let expected = SwapConfig::for_testing();
        file.write_all(serde_json::to_string(&expected).unwrap().as_bytes())
            .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = load_config_from(lookup(&[("SWAP_CONFIG", path.as_str())])).unwrap();
        assert_eq!(config.swap, expected);
    }

    #[test]
    fn test_invalid_config_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut config = SwapConfig::for_testing();
        config.destination.chain_id = config.source.chain_id;
        file.write_all(serde_json::to_string(&config).unwrap().as_bytes())
            .unwrap();
        let path = file.path().to_string_lossy().to_string();

        assert!(load_config_from(lookup(&[("SWAP_CONFIG", path.as_str())])).is_err());
        assert!(load_config_from(lookup(&[("SWAP_CONFIG", "/nonexistent/swap.json")])).is_err());
    }
}
