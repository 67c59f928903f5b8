#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;
use tls_scan::{
    client::{AssessmentClient, Capacity, ClientError, Outcome, ReportMode, Wait},
    host::Host,
    policy::PollPolicy,
    scheduler::{ScanSettings, Sleeper},
};

pub const COOLDOWN: Duration = Duration::from_secs(2);
pub const POLL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Status(String, Wait),
    Sleep(Duration),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Debug, Clone, Copy)]
pub enum PollFailure {
    /// Transient errors for the first `n` non-blocking queries, then normal behaviour.
    Transient(u32),
    /// Always fails with a non-retryable error.
    Fatal,
}

/// Scripted stand-in for the assessment service.
pub struct MockClient {
    pub log: CallLog,
    pub mode: ReportMode,
    pub capacity: Option<Capacity>,
    /// Hosts whose submission is rejected.
    pub reject: HashSet<String>,
    /// Non-blocking queries a host needs before it reports READY (default 1).
    pub ready_after: HashMap<String, u32>,
    pub grades: HashMap<String, String>,
    pub poll_failures: HashMap<String, PollFailure>,
    polls: RefCell<HashMap<String, u32>>,
}

impl MockClient {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Rc::clone(log),
            mode: ReportMode::Grades,
            capacity: Some(Capacity {
                max_assessments: 25,
                current_assessments: 0,
                cool_off: Duration::from_secs(1),
            }),
            reject: HashSet::new(),
            ready_after: HashMap::new(),
            grades: HashMap::new(),
            poll_failures: HashMap::new(),
            polls: RefCell::new(HashMap::new()),
        }
    }

    pub fn reject(mut self, host: &str) -> Self {
        self.reject.insert(host.to_string());
        self
    }

    pub fn ready_after(mut self, host: &str, polls: u32) -> Self {
        self.ready_after.insert(host.to_string(), polls);
        self
    }

    pub fn grade(mut self, host: &str, grade: &str) -> Self {
        self.grades.insert(host.to_string(), grade.to_string());
        self
    }

    pub fn failing(mut self, host: &str, failure: PollFailure) -> Self {
        self.poll_failures.insert(host.to_string(), failure);
        self
    }

    pub fn json(mut self) -> Self {
        self.mode = ReportMode::Json;
        self
    }

    fn outcome(&self, host: &Host) -> Outcome {
        let grade = self
            .grades
            .get(host.as_str())
            .cloned()
            .unwrap_or_else(|| "A".to_string());
        match self.mode {
            ReportMode::Grades => Outcome::Grades(vec![format!("{grade}\t{host} (192.0.2.1)")]),
            ReportMode::Json => Outcome::Report(serde_json::json!({
                "host": host.as_str(),
                "status": "READY",
                "endpoints": [{"ipAddress": "192.0.2.1", "grade": grade}],
            })),
        }
    }
}

impl AssessmentClient for MockClient {
    fn probe_capacity(&self) -> Result<Capacity, ClientError> {
        self.capacity.ok_or(ClientError::Status {
            code: 503,
            message: "service unavailable".into(),
        })
    }

    fn start_assessment(&self, host: &Host) -> Result<(), ClientError> {
        self.log.borrow_mut().push(Call::Start(host.to_string()));
        if self.reject.contains(host.as_str()) {
            return Err(ClientError::AssessmentFailed(format!(
                "{host}: Unable to resolve domain name"
            )));
        }
        Ok(())
    }

    fn query_status(&self, host: &Host, wait: Wait) -> Result<Option<Outcome>, ClientError> {
        self.log
            .borrow_mut()
            .push(Call::Status(host.to_string(), wait));

        let mut polls = self.polls.borrow_mut();
        let n = polls.entry(host.to_string()).or_insert(0);
        *n += 1;

        match self.poll_failures.get(host.as_str()) {
            Some(PollFailure::Fatal) => {
                return Err(ClientError::Decode("garbled status document".into()));
            }
            Some(PollFailure::Transient(k)) if *n <= *k => {
                return Err(ClientError::Status {
                    code: 529,
                    message: "overloaded".into(),
                });
            }
            _ => {}
        }

        if wait == Wait::Blocking {
            return Ok(Some(self.outcome(host)));
        }

        let needed = self.ready_after.get(host.as_str()).copied().unwrap_or(1);
        let successful = match self.poll_failures.get(host.as_str()) {
            Some(PollFailure::Transient(k)) => *n - *k,
            _ => *n,
        };
        if needed > 0 && successful >= needed {
            Ok(Some(self.outcome(host)))
        } else {
            Ok(None)
        }
    }
}

/// Records pauses in the shared call log instead of sleeping.
pub struct RecordingSleeper {
    pub log: CallLog,
}

impl RecordingSleeper {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Rc::clone(log),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, dur: Duration) {
        self.log.borrow_mut().push(Call::Sleep(dur));
    }
}

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn settings(concurrency: usize) -> ScanSettings {
    ScanSettings {
        concurrency,
        cooldown: COOLDOWN,
        poll_interval: POLL,
        policy: PollPolicy {
            max_poll_errors: 3,
            max_rounds: 0,
        },
    }
}

pub fn hosts(names: &[&str]) -> Vec<Host> {
    names.iter().map(|n| Host::new(*n)).collect()
}
