use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub criteria_version: Option<String>,
    pub max_assessments: u32,
    pub current_assessments: u32,
    /// Milliseconds.
    #[serde(default)]
    pub new_assessment_cool_off: u64,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostReport {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub ip_address: String,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

pub const STATUS_READY: &str = "READY";
pub const STATUS_ERROR: &str = "ERROR";

impl HostReport {
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }

    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }

    pub fn error_message(&self) -> String {
        self.status_message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// One `grade<TAB>host (ip)` line per endpoint.
    pub fn grade_lines(&self) -> Vec<String> {
        if self.endpoints.is_empty() {
            return vec![format!("-\t{}", self.host)];
        }
        self.endpoints
            .iter()
            .map(|ep| match ep.grade.as_deref() {
                Some(grade) => format!("{}\t{} ({})", grade, self.host, ep.ip_address),
                None => format!(
                    "-\t{} ({}) {}",
                    self.host,
                    ep.ip_address,
                    ep.status_message.as_deref().unwrap_or("no grade")
                ),
            })
            .collect()
    }
}
