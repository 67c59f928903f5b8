use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default host list; positional arguments on the command line replace it.
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub mail: Mail,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub output: Output,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings that would make the scan spin or stall.
    pub fn validate(&self) -> Result<()> {
        if self.scan.concurrency == 0 {
            anyhow::bail!("scan.concurrency must be at least 1");
        }
        if self.scan.poll_interval_secs == 0 {
            anyhow::bail!("scan.poll_interval_secs must be at least 1");
        }
        if self.service.blocking_poll_interval_secs == 0 {
            anyhow::bail!("service.blocking_poll_interval_secs must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub blocking_poll_interval_secs: u64,
    pub blocking_timeout_secs: u64,
    pub publish: bool,
    pub ignore_mismatch: bool,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "https://api.ssllabs.com/api/v3".into(),
            user_agent: format!("tls-scan/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            blocking_poll_interval_secs: 10,
            blocking_timeout_secs: 1800,
            publish: false,
            ignore_mismatch: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scan {
    pub concurrency: usize,
    pub cooldown_secs: u64,
    pub poll_interval_secs: u64,
    pub max_poll_errors: u32,
    pub assessment_timeout_secs: u64,
}
impl Default for Scan {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cooldown_secs: 2,
            poll_interval_secs: 15,
            max_poll_errors: 5,
            assessment_timeout_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mail {
    pub from: String,
    /// Comma or semicolon separated recipients.
    pub to: String,
    /// `host` or `host:port`.
    pub server: String,
    pub user: String,
    /// Base64-encoded password.
    pub pass: String,
    pub subject: String,
}
impl Default for Mail {
    fn default() -> Self {
        Self {
            from: "".into(),
            to: "".into(),
            server: "".into(),
            user: "".into(),
            pass: "".into(),
            subject: "TLS/SSL Scan Report".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "tls-scan.log".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    /// Where to write the JSON run summary; empty disables it.
    pub summary_path: String,
}
