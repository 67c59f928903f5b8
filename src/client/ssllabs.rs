use super::{types::*, AssessmentClient, Capacity, ClientError, Outcome, ReportMode, Wait};
use crate::{
    config::Service,
    host::Host,
    scheduler::{Sleeper, ThreadSleeper},
    util::rounds_within,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `AssessmentClient` backed by the SSL Labs assessment API.
pub struct SslLabsClient<S = ThreadSleeper> {
    cfg: Service,
    mode: ReportMode,
    http: reqwest::blocking::Client,
    sleeper: S,
}

impl SslLabsClient {
    pub fn new(cfg: &Service, mode: ReportMode) -> Result<Self> {
        Self::with_sleeper(cfg, mode, ThreadSleeper)
    }
}

impl<S: Sleeper> SslLabsClient<S> {
    /// Same as [`SslLabsClient::new`], pausing through `sleeper` between blocking polls.
    pub fn with_sleeper(cfg: &Service, mode: ReportMode, sleeper: S) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            cfg: cfg.clone(),
            mode,
            http,
            sleeper,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value, ClientError> {
        let url = self.url(path);
        debug!(%url, ?query, "GET");
        let resp = self.http.get(&url).query(query).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(ClientError::Status {
                code: status.as_u16(),
                message: body.trim().to_string(),
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| ClientError::Decode(format!("{path}: {e}")))
    }

    fn analyze(&self, host: &Host, start_new: bool) -> Result<(HostReport, serde_json::Value), ClientError> {
        let mut query = vec![
            ("host", host.as_str()),
            ("all", "done"),
            ("publish", on_off(self.cfg.publish)),
            ("ignoreMismatch", on_off(self.cfg.ignore_mismatch)),
        ];
        if start_new {
            query.push(("startNew", "on"));
        }
        let raw = self.get_json("analyze", &query)?;
        let report: HostReport = serde_json::from_value(raw.clone())
            .map_err(|e| ClientError::Decode(format!("analyze {host}: {e}")))?;
        if report.is_error() {
            return Err(ClientError::AssessmentFailed(format!(
                "{host}: {}",
                report.error_message()
            )));
        }
        Ok((report, raw))
    }

    fn poll_once(&self, host: &Host) -> Result<Option<Outcome>, ClientError> {
        let (report, raw) = self.analyze(host, false)?;
        if !report.is_ready() {
            debug!(%host, status = %report.status, "assessment pending");
            return Ok(None);
        }
        let outcome = match self.mode {
            ReportMode::Grades => Outcome::Grades(report.grade_lines()),
            ReportMode::Json => Outcome::Report(raw),
        };
        Ok(Some(outcome))
    }

    /// Polls up to `blocking_timeout_secs / blocking_poll_interval_secs` times (at least
    /// once), pausing one interval between attempts.
    fn poll_until_ready(&self, host: &Host) -> Result<Option<Outcome>, ClientError> {
        let timeout = Duration::from_secs(self.cfg.blocking_timeout_secs);
        let interval = Duration::from_secs(self.cfg.blocking_poll_interval_secs.max(1));
        let attempts = rounds_within(timeout, interval).max(1);
        for attempt in 1..=attempts {
            match self.poll_once(host) {
                Ok(Some(outcome)) => return Ok(Some(outcome)),
                Ok(None) => {}
                Err(e) if e.is_transient() => warn!(%host, "status query failed, retrying: {e}"),
                Err(e) => return Err(e),
            }
            if attempt < attempts {
                self.sleeper.sleep(interval);
            }
        }
        Err(ClientError::Timeout(timeout))
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

impl<S: Sleeper> AssessmentClient for SslLabsClient<S> {
    fn probe_capacity(&self) -> Result<Capacity, ClientError> {
        let raw = self.get_json("info", &[])?;
        let info: Info =
            serde_json::from_value(raw).map_err(|e| ClientError::Decode(format!("info: {e}")))?;
        for msg in &info.messages {
            info!("service message: {msg}");
        }
        debug!(
            engine = ?info.engine_version,
            criteria = ?info.criteria_version,
            "service info"
        );
        Ok(Capacity {
            max_assessments: info.max_assessments,
            current_assessments: info.current_assessments,
            cool_off: Duration::from_millis(info.new_assessment_cool_off),
        })
    }

    fn start_assessment(&self, host: &Host) -> Result<(), ClientError> {
        let (report, _) = self.analyze(host, true)?;
        debug!(%host, status = %report.status, "assessment started");
        Ok(())
    }

    fn query_status(&self, host: &Host, wait: Wait) -> Result<Option<Outcome>, ClientError> {
        match wait {
            Wait::NonBlocking => self.poll_once(host),
            Wait::Blocking => self.poll_until_ready(host),
        }
    }
}
