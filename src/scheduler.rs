//! Batched, paced driving of remote assessments.
//!
//! Hosts are sliced into batches no larger than the concurrency limit. Each batch is
//! submitted with a fixed cooldown between submissions, then polled on a fixed interval
//! until every host in it has settled; only then does the next batch start. With a
//! concurrency of one, hosts are instead handled one at a time with a blocking status
//! query.
//!
//! All work happens on the caller's thread while it pulls events from [`Scan`].

use crate::{
    batch::{Batch, BatchPlan},
    client::{AssessmentClient, Wait},
    config::Scan as ScanConfig,
    host::Host,
    policy::{PollDecision, PollPolicy},
    report::{ScanEvent, ScanResult},
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Every pause a scan takes, including blocking client polls, goes through this.
pub trait Sleeper {
    fn sleep(&self, dur: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, dur: Duration) {
        (**self).sleep(dur);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Maximum hosts in flight at once; always at least 1.
    pub concurrency: usize,
    pub cooldown: Duration,
    pub poll_interval: Duration,
    pub policy: PollPolicy,
}

/// Floor for the poll interval so a pending batch never busy-polls the service.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

impl ScanSettings {
    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self {
            concurrency: cfg.concurrency.max(1),
            cooldown: Duration::from_secs(cfg.cooldown_secs),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs).max(MIN_POLL_INTERVAL),
            policy: PollPolicy::from_config(cfg),
        }
    }
}

pub struct ScanScheduler<C, S = ThreadSleeper> {
    client: C,
    sleeper: S,
    settings: ScanSettings,
}

impl<C: AssessmentClient, S: Sleeper> ScanScheduler<C, S> {
    pub fn new(client: C, sleeper: S, mut settings: ScanSettings) -> Self {
        settings.concurrency = settings.concurrency.max(1);
        settings.poll_interval = settings.poll_interval.max(MIN_POLL_INTERVAL);
        Self {
            client,
            sleeper,
            settings,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Starts a scan over `hosts`, which must already be validated and de-duplicated.
    ///
    /// Nothing is sent to the service until the returned iterator is polled. When
    /// `use_cache` is set no new assessments are submitted; status queries return whatever
    /// the service has cached.
    pub fn run(&self, hosts: Vec<Host>, use_cache: bool) -> Scan<'_, C, S> {
        let plan = BatchPlan::partition(&hosts, self.settings.concurrency);
        info!(
            hosts = plan.host_count,
            batches = plan.batches.len(),
            batch_size = plan.batch_size,
            use_cache,
            "scan plan"
        );
        Scan {
            scheduler: self,
            use_cache,
            batches: plan.batches.into_iter(),
            live: None,
            ready: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Pending,
    Completed,
}

#[derive(Debug)]
struct Slot {
    host: Host,
    state: HostState,
    /// Consecutive failed status queries.
    errors: u32,
}

#[derive(Debug)]
struct LiveBatch {
    index: usize,
    slots: Vec<Slot>,
    rounds: u32,
}

impl LiveBatch {
    fn completed(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == HostState::Completed)
            .count()
    }

    fn is_complete(&self) -> bool {
        self.completed() == self.slots.len()
    }
}

/// A running scan. Yields one [`ScanEvent`] per host, in completion order.
pub struct Scan<'a, C, S> {
    scheduler: &'a ScanScheduler<C, S>,
    use_cache: bool,
    batches: std::vec::IntoIter<Batch>,
    live: Option<LiveBatch>,
    ready: VecDeque<ScanEvent>,
}

impl<C: AssessmentClient, S: Sleeper> Scan<'_, C, S> {
    fn run_sequential(&mut self, batch: Batch) {
        let client = &self.scheduler.client;
        for host in batch.hosts {
            if !self.use_cache {
                if let Err(e) = client.start_assessment(&host) {
                    self.ready.push_back(ScanEvent::Skipped {
                        host,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }
            let event = match client.query_status(&host, Wait::Blocking) {
                Ok(Some(outcome)) => ScanEvent::Finished(ScanResult { host, outcome }),
                Ok(None) => ScanEvent::Failed {
                    host,
                    reason: "blocking status query returned no result".to_string(),
                },
                Err(e) => ScanEvent::Failed {
                    host,
                    reason: e.to_string(),
                },
            };
            self.ready.push_back(event);
        }
    }

    fn begin_batch(&mut self, batch: Batch) -> LiveBatch {
        let settings = &self.scheduler.settings;
        debug!(batch = batch.index, hosts = batch.len(), "batch start");

        let mut slots: Vec<Slot> = batch
            .hosts
            .into_iter()
            .map(|host| Slot {
                host,
                state: HostState::Pending,
                errors: 0,
            })
            .collect();

        if !self.use_cache {
            for (i, slot) in slots.iter_mut().enumerate() {
                if i > 0 {
                    self.scheduler.sleeper.sleep(settings.cooldown);
                }
                if let Err(e) = self.scheduler.client.start_assessment(&slot.host) {
                    slot.state = HostState::Completed;
                    self.ready.push_back(ScanEvent::Skipped {
                        host: slot.host.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        LiveBatch {
            index: batch.index,
            slots,
            rounds: 0,
        }
    }

    fn poll_round(&mut self) {
        let scheduler = self.scheduler;
        let policy = scheduler.settings.policy;
        let Some(batch) = self.live.as_mut() else {
            return;
        };

        scheduler.sleeper.sleep(scheduler.settings.poll_interval);
        batch.rounds += 1;
        let rounds = batch.rounds;

        for slot in batch
            .slots
            .iter_mut()
            .filter(|s| s.state == HostState::Pending)
        {
            match scheduler.client.query_status(&slot.host, Wait::NonBlocking) {
                Ok(Some(outcome)) => {
                    slot.state = HostState::Completed;
                    self.ready.push_back(ScanEvent::Finished(ScanResult {
                        host: slot.host.clone(),
                        outcome,
                    }));
                    continue;
                }
                Ok(None) => slot.errors = 0,
                Err(e) => {
                    slot.errors += 1;
                    match policy.on_error(&e, slot.errors) {
                        PollDecision::Retry => {
                            warn!(host = %slot.host, "status query failed ({}), retrying: {e}", slot.errors);
                        }
                        PollDecision::Abandon => {
                            slot.state = HostState::Completed;
                            self.ready.push_back(ScanEvent::Failed {
                                host: slot.host.clone(),
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    }
                }
            }

            if policy.timed_out(rounds) {
                slot.state = HostState::Completed;
                self.ready.push_back(ScanEvent::Failed {
                    host: slot.host.clone(),
                    reason: format!("still pending after {rounds} poll rounds"),
                });
            }
        }

        debug!(
            batch = batch.index,
            round = rounds,
            completed = batch.completed(),
            total = batch.slots.len(),
            "poll round"
        );
    }
}

impl<C: AssessmentClient, S: Sleeper> Iterator for Scan<'_, C, S> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<ScanEvent> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }

            if self.live.as_ref().is_some_and(|b| !b.is_complete()) {
                self.poll_round();
                continue;
            }
            if let Some(done) = self.live.take() {
                debug!(batch = done.index, "batch complete");
            }

            let batch = self.batches.next()?;
            if self.scheduler.settings.concurrency == 1 {
                self.run_sequential(batch);
            } else {
                self.live = Some(self.begin_batch(batch));
            }
        }
    }
}
