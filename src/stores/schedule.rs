use crate::services::job::Job;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Initial,
    HostUnreachable,
    ConnectionRefused,
    AuthError,
    UnknownLogin,
    Success,
    TimedOut,
}

impl Bucket {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Bucket::Initial | Bucket::AuthError)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    InitialAttempts,
    AuthRetries,
}

/// Scheduler context for one run. Jobs are moved between queues by value,
/// so a job lives in exactly one of them at a time.
#[derive(Debug)]
pub struct Schedule {
    run_id: String,
    initial: VecDeque<Job>,
    host_unreachable: VecDeque<Job>,
    connection_refused: VecDeque<Job>,
    auth_error: VecDeque<Job>,
    unknown_logins: VecDeque<Job>,
    success: VecDeque<Job>,
    timed_out: VecDeque<Job>,
    initial_count: usize,
    attempted: usize,
    dropped: usize,
    pass: Pass,
    started: Instant,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub initial: usize,
    pub auth_error: usize,
    pub unknown_login: usize,
    pub timed_out: usize,
    pub host_unreachable: usize,
    pub connection_refused: usize,
    pub success: usize,
}

impl Schedule {
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        let initial: VecDeque<Job> = jobs.into_iter().collect();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            initial_count: initial.len(),
            initial,
            host_unreachable: VecDeque::new(),
            connection_refused: VecDeque::new(),
            auth_error: VecDeque::new(),
            unknown_logins: VecDeque::new(),
            success: VecDeque::new(),
            timed_out: VecDeque::new(),
            attempted: 0,
            dropped: 0,
            pass: Pass::InitialAttempts,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    fn queue(&self, bucket: Bucket) -> &VecDeque<Job> {
        match bucket {
            Bucket::Initial => &self.initial,
            Bucket::HostUnreachable => &self.host_unreachable,
            Bucket::ConnectionRefused => &self.connection_refused,
            Bucket::AuthError => &self.auth_error,
            Bucket::UnknownLogin => &self.unknown_logins,
            Bucket::Success => &self.success,
            Bucket::TimedOut => &self.timed_out,
        }
    }

    fn queue_mut(&mut self, bucket: Bucket) -> &mut VecDeque<Job> {
        match bucket {
            Bucket::Initial => &mut self.initial,
            Bucket::HostUnreachable => &mut self.host_unreachable,
            Bucket::ConnectionRefused => &mut self.connection_refused,
            Bucket::AuthError => &mut self.auth_error,
            Bucket::UnknownLogin => &mut self.unknown_logins,
            Bucket::Success => &mut self.success,
            Bucket::TimedOut => &mut self.timed_out,
        }
    }

    pub fn push(&mut self, bucket: Bucket, job: Job) {
        self.queue_mut(bucket).push_back(job);
    }

    pub fn pop(&mut self, bucket: Bucket) -> Option<Job> {
        self.queue_mut(bucket).pop_front()
    }

    /// Takes the whole queue, leaving it empty for jobs routed back during
    /// the current pass.
    pub fn take(&mut self, bucket: Bucket) -> VecDeque<Job> {
        std::mem::take(self.queue_mut(bucket))
    }

    pub fn jobs(&self, bucket: Bucket) -> impl Iterator<Item = &Job> {
        self.queue(bucket).iter()
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.queue(bucket).len()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn initial_count(&self) -> usize {
        self.initial_count
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempted += 1;
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub(crate) fn set_pass(&mut self, pass: Pass) {
        self.pass = pass;
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            initial: self.initial.len(),
            auth_error: self.auth_error.len(),
            unknown_login: self.unknown_logins.len(),
            timed_out: self.timed_out.len(),
            host_unreachable: self.host_unreachable.len(),
            connection_refused: self.connection_refused.len(),
            success: self.success.len(),
        }
    }

    pub fn status(&self) -> serde_json::Value {
        let remaining = match self.pass {
            Pass::InitialAttempts => self.initial.len(),
            Pass::AuthRetries => self.auth_error.len(),
        };
        serde_json::json!({
            "run_id": self.run_id,
            "pass": self.pass,
            "attempted": self.attempted,
            "initial_count": self.initial_count,
            "remaining_in_pass": remaining,
            "counts": self.counts(),
            "started_at": self.started_at.to_rfc3339(),
            "elapsed_s": self.elapsed_secs(),
        })
    }
}
