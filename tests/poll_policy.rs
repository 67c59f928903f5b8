mod common;

use common::{new_log, Call, MockClient, RecordingSleeper};
use std::time::Duration;
use tls_scan::{
    client::ClientError,
    config::Scan,
    host::Host,
    policy::{PollDecision, PollPolicy},
    report::ScanEvent,
    scheduler::{ScanScheduler, ScanSettings, MIN_POLL_INTERVAL},
};

fn overloaded() -> ClientError {
    ClientError::Status {
        code: 529,
        message: "overloaded".into(),
    }
}

#[test]
fn transient_errors_retry_until_budget_is_spent() {
    let policy = PollPolicy {
        max_poll_errors: 2,
        max_rounds: 0,
    };
    assert_eq!(policy.on_error(&overloaded(), 1), PollDecision::Retry);
    assert_eq!(policy.on_error(&overloaded(), 2), PollDecision::Retry);
    assert_eq!(policy.on_error(&overloaded(), 3), PollDecision::Abandon);
}

#[test]
fn fatal_errors_abandon_immediately() {
    let policy = PollPolicy {
        max_poll_errors: 10,
        max_rounds: 0,
    };
    let bad_request = ClientError::Status {
        code: 400,
        message: "invalid parameter".into(),
    };
    assert_eq!(policy.on_error(&bad_request, 1), PollDecision::Abandon);
    assert_eq!(
        policy.on_error(&ClientError::AssessmentFailed("unable to resolve".into()), 1),
        PollDecision::Abandon
    );
}

#[test]
fn round_limit_derives_from_timeout() {
    let cfg = Scan {
        poll_interval_secs: 15,
        assessment_timeout_secs: 100,
        ..Scan::default()
    };
    let policy = PollPolicy::from_config(&cfg);
    assert_eq!(policy.max_rounds, 7);
    assert!(!policy.timed_out(6));
    assert!(policy.timed_out(7));
}

#[test]
fn zero_timeout_never_times_out() {
    let cfg = Scan {
        assessment_timeout_secs: 0,
        ..Scan::default()
    };
    let policy = PollPolicy::from_config(&cfg);
    assert!(!policy.timed_out(u32::MAX));
}

#[test]
fn zero_poll_interval_keeps_a_round_limit() {
    let cfg = Scan {
        poll_interval_secs: 0,
        assessment_timeout_secs: 30,
        ..Scan::default()
    };
    let policy = PollPolicy::from_config(&cfg);
    assert_eq!(policy.max_rounds, 30);

    let settings = ScanSettings::from_config(&cfg);
    assert_eq!(settings.poll_interval, MIN_POLL_INTERVAL);
}

#[test]
fn never_ready_host_stops_at_the_round_limit_with_real_pauses() {
    let log = new_log();
    let client = MockClient::new(&log).ready_after("a.example", 5000);
    let cfg = Scan {
        concurrency: 2,
        poll_interval_secs: 0,
        assessment_timeout_secs: 30,
        ..Scan::default()
    };
    let sched = ScanScheduler::new(&client, RecordingSleeper::new(&log), ScanSettings::from_config(&cfg));

    let events: Vec<_> = sched.run(vec![Host::new("a.example")], false).collect();

    assert!(matches!(&events[0], ScanEvent::Failed { .. }));
    let calls = log.borrow();
    let polls = calls.iter().filter(|c| matches!(c, Call::Status(..))).count();
    assert_eq!(polls, 30);
    assert!(!calls.contains(&Call::Sleep(Duration::ZERO)));
}
