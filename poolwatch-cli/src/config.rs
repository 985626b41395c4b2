use anyhow::{Context, Result};
use clap::Args;
use poolwatch_common::WatchConfig;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, global = true, env = "POOLWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Args, Debug, Default)]
pub struct PollArgs {
    /// Status endpoint to long-poll
    #[arg(short, long, env = "POOLWATCH_URL")]
    pub url: Option<String>,

    /// Delay between rounds in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Request timeout in seconds
    #[arg(short, long)]
    pub timeout_secs: Option<u64>,

    /// Only chart this pool (repeatable)
    #[arg(short, long = "pool")]
    pub pools: Vec<String>,
}

/// Config file (or defaults) with command line overrides applied
pub fn load(global: &GlobalArgs, poll: &PollArgs) -> Result<WatchConfig> {
    let mut config = match &global.config {
        Some(path) => WatchConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => WatchConfig::default(),
    };

    if let Some(url) = &poll.url {
        config.url = url.clone();
    }
    if let Some(interval) = poll.interval_ms {
        config.poll_delay_ms = interval;
    }
    if let Some(timeout) = poll.timeout_secs {
        config.request_timeout_secs = Some(timeout);
    }
    if !poll.pools.is_empty() {
        config.pools = poll.pools.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = load(&GlobalArgs::default(), &PollArgs::default()).unwrap();
        assert_eq!(config, WatchConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolwatch.toml");
        std::fs::write(&path, "url = \"http://conductor:8000/status/\"\npoll_delay_ms = 500\n").unwrap();

        let global = GlobalArgs {
            config: Some(path),
            ..Default::default()
        };
        let poll = PollArgs {
            interval_ms: Some(2000),
            pools: vec!["workers".into()],
            ..Default::default()
        };

        let config = load(&global, &poll).unwrap();
        assert_eq!(config.url, "http://conductor:8000/status/");
        assert_eq!(config.poll_delay_ms, 2000);
        assert_eq!(config.pools, vec!["workers".to_string()]);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let poll = PollArgs {
            interval_ms: Some(0),
            ..Default::default()
        };
        assert!(load(&GlobalArgs::default(), &poll).is_err());
    }
}
