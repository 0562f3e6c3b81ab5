mod common;
use common::{panel, MemorySink, ScriptedProber, StaticPanels};

use base64::Engine;
use panelprobe::app::App;
use panelprobe::errors::{PanelError, PanelErrorKind};
use panelprobe::managers::dispatcher::{AuthRetryMode, Dispatcher};
use panelprobe::models::{ConnectionResult, Credential, TransportErrorKind};
use panelprobe::services::job::Job;
use panelprobe::services::logger::{LogLevel, Logger};
use panelprobe::stores::schedule::{Bucket, Schedule};
use std::sync::Arc;

fn logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

fn success(payload: Vec<u8>) -> ConnectionResult {
    ConnectionResult::Success {
        payload,
        latency_ms: 20,
    }
}

fn auth_error() -> ConnectionResult {
    ConnectionResult::AuthError { latency_ms: 5 }
}

fn transport(kind: TransportErrorKind) -> ConnectionResult {
    ConnectionResult::Error {
        kind,
        message: format!("{:?}", kind),
    }
}

fn telemetry_with_login(login: &str) -> Vec<u8> {
    let mut payload = vec![0x20u8; 1000];
    payload.push(0x0c);
    payload.extend_from_slice(
        base64::engine::general_purpose::STANDARD
            .encode(login)
            .as_bytes(),
    );
    payload.push(0x03);
    payload
}

#[tokio::test]
async fn success_then_auth_retry_timeout() {
    let prober = Arc::new(
        ScriptedProber::default()
            .script("10.0.0.1", vec![success(b"telemetry".to_vec())])
            .script("10.0.0.2", vec![auth_error(), ConnectionResult::Timeout]),
    );
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Dispatcher::new(logger(), prober.clone(), sink.clone());

    let mut schedule = Schedule::new(vec![
        Job::new(panel("1", "10.0.0.1", &["site/pw"])),
        Job::new(panel("2", "10.0.0.2", &[])),
    ]);
    let summary = dispatcher.run(&mut schedule).await;

    let success_ids: Vec<_> = schedule
        .jobs(Bucket::Success)
        .map(|j| j.panel().storage_id.clone())
        .collect();
    let timed_out_ids: Vec<_> = schedule
        .jobs(Bucket::TimedOut)
        .map(|j| j.panel().storage_id.clone())
        .collect();
    assert_eq!(success_ids, vec!["1"]);
    assert_eq!(timed_out_ids, vec!["2"]);
    assert_eq!(schedule.len(Bucket::AuthError), 0);
    assert_eq!(schedule.len(Bucket::Initial), 0);

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.counts.success, 1);
    assert_eq!(summary.counts.timed_out, 1);
    assert_eq!(summary.dropped, 0);
    assert_eq!(summary.rows_written, 2);

    assert_eq!(
        prober.calls_for("10.0.0.2"),
        vec![Credential::new("agri", "7008"), Credential::new("agri", "stor")]
    );

    let rows = sink.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].storage_id, 1);
    assert_eq!(rows[0].result["result"], "success");
    assert_eq!(rows[0].response_bytes.as_deref(), Some(&b"telemetry"[..]));
    assert_eq!(rows[1].storage_id, 2);
    assert_eq!(rows[1].result["result"], "timeout");
    assert_eq!(rows[1].result["auth_attempts"], 1);
    assert!(rows[1].latency_ms.is_none());
    assert_eq!(rows[0].result["run_id"], rows[1].result["run_id"]);
}

#[tokio::test]
async fn second_pass_tries_only_one_more_credential() {
    let prober = Arc::new(
        ScriptedProber::default().script("10.0.0.3", vec![auth_error(), auth_error(), auth_error()]),
    );
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Dispatcher::new(logger(), prober.clone(), sink.clone());

    let mut schedule = Schedule::new(vec![Job::new(panel("3", "10.0.0.3", &[]))]);
    let summary = dispatcher.run(&mut schedule).await;

    assert_eq!(prober.calls().len(), 2);
    assert_eq!(summary.counts.auth_error, 1);
    assert_eq!(summary.counts.unknown_login, 0);
    let job = schedule.jobs(Bucket::AuthError).next().expect("job");
    assert_eq!(job.info().auth_attempts, 2);

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result["result"], "autherror");
    assert_eq!(rows[0].latency_ms, Some(5));
}

#[tokio::test]
async fn exhaust_mode_stops_one_short_of_the_last_credential() {
    let prober = Arc::new(
        ScriptedProber::default().script("10.0.0.4", vec![auth_error(); 5]),
    );
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Dispatcher::new(logger(), prober.clone(), sink.clone())
        .with_retry_mode(AuthRetryMode::Exhaust);

    let mut schedule = Schedule::new(vec![Job::new(panel("4", "10.0.0.4", &[]))]);
    let summary = dispatcher.run(&mut schedule).await;

    let job = schedule.jobs(Bucket::UnknownLogin).next().expect("unknown login job");
    assert!(job.info().unknown_login);
    assert_eq!(job.info().auth_attempts, job.candidate_count() - 1);
    assert_eq!(prober.calls().len(), job.candidate_count() - 1);
    assert_eq!(summary.counts.unknown_login, 1);
    assert_eq!(summary.counts.auth_error, 0);
    assert_eq!(sink.rows()[0].result["unknown_login"], true);
}

#[tokio::test]
async fn transport_errors_route_by_kind() {
    let prober = Arc::new(
        ScriptedProber::default()
            .script("10.0.0.5", vec![transport(TransportErrorKind::ConnectionRefused)])
            .script("10.0.0.6", vec![transport(TransportErrorKind::HostUnreachable)])
            .script("10.0.0.7", vec![transport(TransportErrorKind::Unclassified)])
            .script("10.0.0.8", vec![transport(TransportErrorKind::TimedOut)]),
    );
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Dispatcher::new(logger(), prober.clone(), sink.clone());

    let mut schedule = Schedule::new(vec![
        Job::new(panel("5", "10.0.0.5", &[])),
        Job::new(panel("6", "10.0.0.6", &[])),
        Job::new(panel("7", "10.0.0.7", &[])),
        Job::new(panel("8", "10.0.0.8", &[])),
    ]);
    let summary = dispatcher.run(&mut schedule).await;

    assert_eq!(summary.counts.connection_refused, 1);
    assert_eq!(summary.counts.host_unreachable, 1);
    assert_eq!(summary.counts.timed_out, 1);
    assert_eq!(summary.dropped, 1);
    assert_eq!(prober.calls().len(), 4);

    let written: Vec<i64> = sink.rows().iter().map(|r| r.storage_id).collect();
    assert_eq!(written, vec![5, 6, 8]);
    for bucket in [
        Bucket::Initial,
        Bucket::AuthError,
        Bucket::UnknownLogin,
        Bucket::Success,
        Bucket::TimedOut,
        Bucket::HostUnreachable,
        Bucket::ConnectionRefused,
    ] {
        assert!(schedule.jobs(bucket).all(|j| j.panel().storage_id != "7"));
    }
}

#[tokio::test]
async fn recovered_logins_stay_on_the_job() {
    let prober = Arc::new(
        ScriptedProber::default()
            .script("10.0.0.9", vec![success(telemetry_with_login("alice:secret"))]),
    );
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Dispatcher::new(logger(), prober, sink.clone());

    let mut schedule = Schedule::new(vec![Job::new(panel("9", "10.0.0.9", &[]))]);
    dispatcher.run(&mut schedule).await;

    let job = schedule.jobs(Bucket::Success).next().expect("job");
    assert!(job.info().completed_successfully);
    assert_eq!(job.recovered_credentials(), &[Credential::new("alice", "secret")]);
    assert_eq!(sink.rows()[0].result["recovered_login_count"], 1);
}

#[tokio::test]
async fn write_failures_do_not_stop_the_run() {
    let prober = Arc::new(
        ScriptedProber::default()
            .script("10.0.1.1", vec![ConnectionResult::Timeout])
            .script("10.0.1.2", vec![ConnectionResult::Timeout])
            .script("10.0.1.3", vec![ConnectionResult::Timeout]),
    );
    let sink = Arc::new(MemorySink::failing_for(&[11]));
    let dispatcher = Dispatcher::new(logger(), prober.clone(), sink.clone());

    let mut bad_id = panel("13", "10.0.1.3", &[]);
    bad_id.storage_id = "not-a-number".to_string();
    let mut schedule = Schedule::new(vec![
        Job::new(panel("11", "10.0.1.1", &[])),
        Job::new(panel("12", "10.0.1.2", &[])),
        Job::new(bad_id),
    ]);
    let summary = dispatcher.run(&mut schedule).await;

    assert_eq!(prober.calls().len(), 3);
    assert_eq!(summary.counts.timed_out, 3);
    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.row_failures, 2);
    assert_eq!(sink.rows()[0].storage_id, 12);
}

#[tokio::test]
async fn app_run_fails_when_panel_list_cannot_load() {
    let app = App::new(
        logger(),
        Arc::new(StaticPanels(Err(PanelError::database("relation does not exist")))),
        Arc::new(ScriptedProber::default()),
        Arc::new(MemorySink::default()),
    );
    let err = app.run().await.expect_err("load failure is fatal");
    assert_eq!(err.kind, PanelErrorKind::Database);
}

#[tokio::test]
async fn app_run_probes_loaded_panels() {
    let prober = Arc::new(
        ScriptedProber::default().script("10.0.2.1", vec![success(Vec::new())]),
    );
    let sink = Arc::new(MemorySink::default());
    let app = App::new(
        logger(),
        Arc::new(StaticPanels(Ok(vec![panel("21", "10.0.2.1", &["op/pw"])]))),
        prober.clone(),
        sink.clone(),
    );
    let summary = app.run().await.expect("run");
    assert_eq!(summary.initial_count, 1);
    assert_eq!(summary.counts.success, 1);
    assert_eq!(prober.calls_for("10.0.2.1"), vec![Credential::new("op", "pw")]);
    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].result["payload_sha256"],
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
