use crate::services::job::Job;
use crate::services::logger::{LogLevel, Logger};
use crate::services::probe::Prober;
use crate::stores::postgres::ResultSink;
use crate::stores::schedule::{Bucket, BucketCounts, Pass, Schedule};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub initial_count: usize,
    pub attempted: usize,
    pub dropped: usize,
    pub rows_written: usize,
    pub row_failures: usize,
    pub counts: BucketCounts,
    pub elapsed_s: f64,
}

/// How far the second pass takes a rejected job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRetryMode {
    /// One more credential per job, then stop.
    #[default]
    Single,
    /// Keep retrying until the job succeeds, fails otherwise or runs out of
    /// credentials.
    Exhaust,
}

impl AuthRetryMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "single" => Some(AuthRetryMode::Single),
            "exhaust" => Some(AuthRetryMode::Exhaust),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct WriteStats {
    written: usize,
    failed: usize,
}

/// Runs the two probing passes over a `Schedule`, one request at a time.
#[derive(Clone)]
pub struct Dispatcher {
    logger: Logger,
    prober: Arc<dyn Prober>,
    sink: Arc<dyn ResultSink>,
    retry_mode: AuthRetryMode,
}

impl Dispatcher {
    pub fn new(logger: Logger, prober: Arc<dyn Prober>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            logger: logger.child("dispatch"),
            prober,
            sink,
            retry_mode: AuthRetryMode::default(),
        }
    }

    pub fn with_retry_mode(mut self, retry_mode: AuthRetryMode) -> Self {
        self.retry_mode = retry_mode;
        self
    }

    pub async fn run(&self, schedule: &mut Schedule) -> RunSummary {
        let mut stats = WriteStats::default();

        schedule.set_pass(Pass::InitialAttempts);
        self.logger.info(
            "initial attempts",
            Some(&serde_json::json!({ "jobs": schedule.len(Bucket::Initial) })),
        );
        while let Some(job) = schedule.pop(Bucket::Initial) {
            self.dispatch(schedule, job, &mut stats).await;
        }

        schedule.set_pass(Pass::AuthRetries);
        self.logger.info(
            "auth retries",
            Some(&serde_json::json!({
                "jobs": schedule.len(Bucket::AuthError),
                "mode": self.retry_mode,
            })),
        );
        match self.retry_mode {
            AuthRetryMode::Single => {
                // A job rejected again here stays in the auth-error queue.
                let retries = schedule.take(Bucket::AuthError);
                for job in retries {
                    self.dispatch(schedule, job, &mut stats).await;
                }
            }
            AuthRetryMode::Exhaust => {
                while let Some(job) = schedule.pop(Bucket::AuthError) {
                    self.dispatch(schedule, job, &mut stats).await;
                }
            }
        }

        let leftovers: Vec<Job> = schedule.take(Bucket::AuthError).into_iter().collect();
        for job in &leftovers {
            self.emit(job, schedule, &mut stats).await;
        }
        for job in leftovers {
            schedule.push(Bucket::AuthError, job);
        }

        let summary = RunSummary {
            run_id: schedule.run_id().to_string(),
            initial_count: schedule.initial_count(),
            attempted: schedule.attempted(),
            dropped: schedule.dropped(),
            rows_written: stats.written,
            row_failures: stats.failed,
            counts: schedule.counts(),
            elapsed_s: schedule.elapsed_secs(),
        };
        self.logger.info(
            "run complete",
            Some(&serde_json::to_value(&summary).unwrap_or_default()),
        );
        summary
    }

    async fn dispatch(&self, schedule: &mut Schedule, mut job: Job, stats: &mut WriteStats) {
        let Some(attempt) = job.current_attempt() else {
            self.logger
                .warn("job has no attempt left; dropped", Some(&job.describe()));
            schedule.record_drop();
            return;
        };
        let target = attempt.target.clone();
        let credential = attempt.credential.clone();

        schedule.record_attempt();
        let result = self.prober.probe(&target, &credential).await;
        job.handle_result(result);

        match job.route() {
            Some(bucket) => {
                if bucket == Bucket::Success && !job.recovered_credentials().is_empty() {
                    self.logger.info(
                        &format!(
                            "recovered {} login(s) from {}",
                            job.recovered_credentials().len(),
                            job.panel().storage_name
                        ),
                        None,
                    );
                }
                if bucket.is_terminal() {
                    self.emit(&job, schedule, stats).await;
                }
                schedule.push(bucket, job);
            }
            None => {
                let mut meta = job.describe();
                if let Some(detail) = job.last_result().map(|r| r.error_detail()) {
                    meta["error"] = detail;
                }
                self.logger
                    .error("unclassified transport error; job dropped", Some(&meta));
                schedule.record_drop();
            }
        }

        if self.logger.enabled(LogLevel::Debug) {
            self.logger.debug("status", Some(&schedule.status()));
        }
    }

    async fn emit(&self, job: &Job, schedule: &Schedule, stats: &mut WriteStats) {
        let Some(row) = job.result_row(schedule.run_id()) else {
            self.logger
                .warn("storage_id is not numeric; row skipped", Some(&job.describe()));
            stats.failed += 1;
            return;
        };
        match self.sink.write_result(&row).await {
            Ok(()) => {
                stats.written += 1;
                let done = stats.written + stats.failed;
                let pct = if schedule.initial_count() == 0 {
                    100.0
                } else {
                    done as f64 / schedule.initial_count() as f64 * 100.0
                };
                self.logger.info(
                    &format!(
                        "inserted {}, {:.0}% complete",
                        job.panel().storage_name,
                        pct
                    ),
                    None,
                );
            }
            Err(err) => {
                stats.failed += 1;
                let mut meta = job.describe();
                meta["error"] = serde_json::to_value(&err).unwrap_or_default();
                self.logger.error("failed to write result row", Some(&meta));
            }
        }
    }
}
