//! Collector configuration
//!
//! Defines all configurable parameters for the collector including
//! the entry store location, scheduling intervals, constraint probing
//! and where drained entries are forwarded.

use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::service::ResultPolicy;

/// Where drained entries are forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Application log through `tracing` (target `crash_log`)
    Tracing,
    /// One JSON object per line appended to `output_path`
    JsonLines,
}

impl FromStr for SinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tracing" | "log" => Ok(SinkKind::Tracing),
            "jsonl" | "json-lines" => Ok(SinkKind::JsonLines),
            other => anyhow::bail!("unknown sink kind '{}'", other),
        }
    }
}

/// Collector configuration
///
/// All timeouts and intervals are configurable so the collector can be tuned
/// for different devices (busy servers vs. idle kiosks, flaky networks).
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this collector instance
    pub collector_id: String,

    /// Directory holding the crash-entry store
    pub store_dir: PathBuf,

    /// Entry tag drained by the collection job
    pub tag: String,

    /// How often the scheduler re-evaluates pending requests
    pub poll_interval: Duration,

    /// Maximum time a collection run may take before it is cancelled
    pub job_timeout: Duration,

    /// Whether schedule requests require network connectivity
    pub requires_network: bool,

    /// Address the network probe connects to (host:port)
    pub network_probe_addr: String,

    /// How long the network probe waits for a connection
    pub network_probe_timeout: Duration,

    /// Periodic trigger, disabled when unset
    pub trigger_interval: Option<Duration>,

    /// Submit a request as soon as the collector starts
    pub trigger_on_start: bool,

    pub sink: SinkKind,

    /// Output file for the JSON-lines sink
    pub output_path: Option<PathBuf>,

    pub result_policy: ResultPolicy,

    /// Remember the newest drained timestamp in memory and stop the next
    /// walk there
    pub skip_seen: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(collector_id: String, store_dir: PathBuf) -> Self {
        Self {
            collector_id,
            store_dir,
            tag: "system_app_crash".to_string(),
            poll_interval: Duration::from_secs(5),
            job_timeout: Duration::from_secs(300), // 5 minutes
            requires_network: true,
            network_probe_addr: "1.1.1.1:53".to_string(),
            network_probe_timeout: Duration::from_secs(2),
            trigger_interval: None,
            trigger_on_start: true,
            sink: SinkKind::Tracing,
            output_path: None,
            result_policy: ResultPolicy::Reporting,
            skip_seen: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - COLLECTOR_STORE_DIR (default: /var/lib/siphon/dropbox)
    /// - COLLECTOR_ID (default: random UUID)
    /// - COLLECTOR_TAG (default: system_app_crash)
    /// - COLLECTOR_POLL_INTERVAL (seconds, default: 5)
    /// - COLLECTOR_JOB_TIMEOUT (seconds, default: 300)
    /// - COLLECTOR_REQUIRES_NETWORK (default: true)
    /// - COLLECTOR_NETWORK_PROBE_ADDR (default: 1.1.1.1:53)
    /// - COLLECTOR_NETWORK_PROBE_TIMEOUT (seconds, default: 2)
    /// - COLLECTOR_TRIGGER_INTERVAL (seconds, default: disabled)
    /// - COLLECTOR_TRIGGER_ON_START (default: true)
    /// - COLLECTOR_SINK (tracing|jsonl, default: tracing)
    /// - COLLECTOR_OUTPUT_PATH (required for jsonl)
    /// - COLLECTOR_RESULT_POLICY (reporting|lenient, default: reporting)
    /// - COLLECTOR_SKIP_SEEN (default: false)
    ///
    /// A variable that is set but malformed is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let store_dir = lookup("COLLECTOR_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);
        let collector_id = lookup("COLLECTOR_ID").unwrap_or(defaults.collector_id);

        let mut config = Self::new(collector_id, store_dir);

        if let Some(tag) = lookup("COLLECTOR_TAG") {
            config.tag = tag;
        }

        if let Some(interval) = parse_secs(&lookup, "COLLECTOR_POLL_INTERVAL")? {
            config.poll_interval = interval;
        }

        if let Some(timeout) = parse_secs(&lookup, "COLLECTOR_JOB_TIMEOUT")? {
            config.job_timeout = timeout;
        }

        if let Some(requires_network) = parse_flag(&lookup, "COLLECTOR_REQUIRES_NETWORK")? {
            config.requires_network = requires_network;
        }

        if let Some(addr) = lookup("COLLECTOR_NETWORK_PROBE_ADDR") {
            config.network_probe_addr = addr;
        }

        if let Some(timeout) = parse_secs(&lookup, "COLLECTOR_NETWORK_PROBE_TIMEOUT")? {
            config.network_probe_timeout = timeout;
        }

        config.trigger_interval = parse_secs(&lookup, "COLLECTOR_TRIGGER_INTERVAL")?;

        if let Some(on_start) = parse_flag(&lookup, "COLLECTOR_TRIGGER_ON_START")? {
            config.trigger_on_start = on_start;
        }

        if let Some(sink) = lookup("COLLECTOR_SINK") {
            config.sink = sink
                .parse::<SinkKind>()
                .with_context(|| format!("invalid COLLECTOR_SINK '{}'", sink))?;
        }

        config.output_path = lookup("COLLECTOR_OUTPUT_PATH").map(PathBuf::from);

        if let Some(policy) = lookup("COLLECTOR_RESULT_POLICY") {
            config.result_policy = policy
                .parse::<ResultPolicy>()
                .with_context(|| format!("invalid COLLECTOR_RESULT_POLICY '{}'", policy))?;
        }

        if let Some(skip_seen) = parse_flag(&lookup, "COLLECTOR_SKIP_SEEN")? {
            config.skip_seen = skip_seen;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.collector_id.is_empty() {
            anyhow::bail!("collector_id cannot be empty");
        }

        if self.store_dir.as_os_str().is_empty() {
            anyhow::bail!("store_dir cannot be empty");
        }

        if self.tag.is_empty() {
            anyhow::bail!("tag cannot be empty");
        }

        if self.tag.contains(['/', '\\']) {
            anyhow::bail!("tag cannot contain path separators");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.requires_network && self.network_probe_addr.is_empty() {
            anyhow::bail!("network_probe_addr cannot be empty when the network is required");
        }

        if self.trigger_interval.is_some_and(|interval| interval.is_zero()) {
            anyhow::bail!("trigger_interval must be greater than 0 when set");
        }

        if self.sink == SinkKind::JsonLines && self.output_path.is_none() {
            anyhow::bail!("output_path is required for the jsonl sink");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            PathBuf::from("/var/lib/siphon/dropbox"),
        )
    }
}

fn parse_secs<F>(lookup: &F, name: &str) -> anyhow::Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{} must be a number of seconds, got '{}'", name, value))
        })
        .transpose()
}

fn parse_flag<F>(lookup: &F, name: &str) -> anyhow::Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            parse_bool(&value)
                .with_context(|| format!("{} must be true or false, got '{}'", name, value))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
