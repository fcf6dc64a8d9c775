//! Lifecycle tests against the scripted network.
//!
//! Every test runs on tokio's paused clock, so the 3 s retry delay and the
//! 3 s inactivity guard elapse instantly while keeping exact virtual timings.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket_connector::simulator::{Script, ScriptedConnector, Step};
use socket_connector::{
    AttemptConfig, ConnectionAttemptManager, ConnectorConfig, Decoding, Observer, OnDecodeError,
    Outcome,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn manager(connector: &ScriptedConnector) -> ConnectionAttemptManager<ScriptedConnector> {
    ConnectionAttemptManager::new(connector.clone(), ConnectorConfig::default())
}

fn ping(retries: u32) -> AttemptConfig {
    AttemptConfig::new("sim.example", 7000, "PING").with_max_retries(retries)
}

/// Observer that records every callback it receives.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Outcome>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Outcome> {
        self.calls.lock().unwrap().clone()
    }
}

impl Observer for Recorder {
    fn on_success(self, data: Vec<u8>) {
        self.calls.lock().unwrap().push(Outcome::Success { data });
    }

    fn on_error(self, code: i32, message: String) {
        self.calls.lock().unwrap().push(Outcome::Error { code, message });
    }

    fn on_timeout(self) {
        self.calls.lock().unwrap().push(Outcome::Timeout);
    }
}

/// Virtual time is exact up to the timer wheel's millisecond resolution.
fn assert_elapsed(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

fn refused() -> Script {
    Script::new([Step::fail(61, "Connection refused")])
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn ping_pong_succeeds() {
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::Writable,
        Step::data("PONG"),
        Step::Close,
    ])]);

    let outcome = manager(&connector).request(ping(0)).await;

    assert_eq!(outcome, Outcome::Success { data: b"PONG".to_vec() });
    let probe = connector.probe();
    assert_eq!(probe.written, vec![b"PING".to_vec()]);
    assert_eq!(probe.closes, 1);
}

#[tokio::test(start_paused = true)]
async fn chunks_are_concatenated_in_arrival_order() {
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::Writable,
        Step::data("AB"),
        Step::data("CD"),
        Step::End,
    ])]);

    let outcome = manager(&connector).request(ping(0)).await;
    assert_eq!(outcome, Outcome::Success { data: b"ABCD".to_vec() });
}

#[tokio::test(start_paused = true)]
async fn empty_payload_and_immediate_close_is_empty_success() {
    let connector = ScriptedConnector::new([Script::new([Step::Open, Step::Close])]);

    let attempt = AttemptConfig::new("sim.example", 7000, Vec::new());
    let outcome = manager(&connector).request(attempt).await;

    assert_eq!(outcome, Outcome::Success { data: Vec::new() });
    assert!(connector.probe().written[0].is_empty());
}

#[tokio::test(start_paused = true)]
async fn partial_writes_send_whole_payload_once() {
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::Writable,
        Step::Writable,
        Step::Writable,
        Step::Writable,
        Step::data("ok"),
        Step::Close,
    ])
    .with_write_budget(3)]);

    let outcome = manager(&connector).request(ping(0)).await;

    assert_eq!(outcome, Outcome::Success { data: b"ok".to_vec() });
    assert_eq!(connector.probe().written, vec![b"PING".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn data_before_writable_is_kept() {
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::data("early "),
        Step::Writable,
        Step::data("late"),
        Step::End,
    ])]);

    let outcome = manager(&connector).request(ping(0)).await;
    assert_eq!(outcome, Outcome::Success { data: b"early late".to_vec() });
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unreachable_host_retries_then_reports_error() {
    let connector = ScriptedConnector::new([refused(), refused(), refused()]);
    let recorder = Recorder::default();

    manager(&connector)
        .start(ping(2), recorder.clone())
        .await
        .unwrap();

    assert_eq!(
        recorder.calls(),
        vec![Outcome::Error { code: 61, message: "Connection refused".into() }]
    );
    let probe = connector.probe();
    assert_eq!(probe.opens.len(), 3, "one attempt plus two retries");
    for pair in probe.opens.windows(2) {
        assert_elapsed(pair[1] - pair[0], Duration::from_secs(3));
    }
    assert_eq!(probe.closes, 3);
}

#[tokio::test(start_paused = true)]
async fn retry_succeeds_with_fresh_buffer_and_resent_payload() {
    let connector = ScriptedConnector::new([
        Script::new([
            Step::Open,
            Step::Writable,
            Step::data("stale"),
            Step::fail(54, "Connection reset by peer"),
        ]),
        Script::new([Step::Open, Step::Writable, Step::data("fresh"), Step::Close]),
    ]);
    let recorder = Recorder::default();

    manager(&connector)
        .start(ping(1), recorder.clone())
        .await
        .unwrap();

    assert_eq!(recorder.calls(), vec![Outcome::Success { data: b"fresh".to_vec() }]);
    assert_eq!(
        connector.probe().written,
        vec![b"PING".to_vec(), b"PING".to_vec()]
    );
}

#[tokio::test(start_paused = true)]
async fn events_after_a_failure_stay_with_their_attempt() {
    let connector = ScriptedConnector::new([
        Script::new([
            Step::Open,
            Step::fail(54, "Connection reset by peer"),
            Step::data("stale"),
            Step::Close,
        ]),
        Script::new([Step::Open, Step::Writable, Step::data("fresh"), Step::Close]),
    ]);

    let outcome = manager(&connector).request(ping(1)).await;

    assert_eq!(outcome, Outcome::Success { data: b"fresh".to_vec() });
    let probe = connector.probe();
    assert_eq!(probe.opens.len(), 2);
    assert_eq!(probe.written, vec![Vec::new(), b"PING".to_vec()]);
    assert_eq!(probe.closes, 2);
}

#[tokio::test(start_paused = true)]
async fn synchronous_open_failure_is_retried() {
    let connector = ScriptedConnector::new([
        Script::refused(111),
        Script::new([Step::Open, Step::Writable, Step::data("up"), Step::End]),
    ]);

    let outcome = manager(&connector).request(ping(1)).await;
    assert_eq!(outcome, Outcome::Success { data: b"up".to_vec() });
    assert_eq!(connector.probe().opens.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn synchronous_open_failure_reports_os_code() {
    let connector = ScriptedConnector::new([Script::refused(111)]);

    let outcome = manager(&connector).request(ping(0)).await;
    assert_eq!(outcome.status_code(), 111);
}

#[tokio::test(start_paused = true)]
async fn no_retries_means_single_attempt() {
    let connector = ScriptedConnector::new([refused(), refused()]);

    let outcome = manager(&connector).request(ping(0)).await;

    assert!(matches!(outcome, Outcome::Error { code: 61, .. }));
    assert_eq!(connector.probe().opens.len(), 1);
}

// ---------------------------------------------------------------------------
// Timeout guard
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out_and_is_closed() {
    let connector = ScriptedConnector::new([Script::new([Step::Open, Step::Writable, Step::Stall])]);
    let start = tokio::time::Instant::now();

    let outcome = manager(&connector).request(ping(0)).await;

    assert_eq!(outcome, Outcome::Timeout);
    assert_elapsed(start.elapsed(), Duration::from_secs(3));
    assert_eq!(connector.probe().closes, 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_bypasses_remaining_retries() {
    let connector = ScriptedConnector::new([
        Script::new([Step::Stall]),
        Script::new([Step::Open, Step::End]),
    ]);
    let recorder = Recorder::default();

    manager(&connector)
        .start(ping(5), recorder.clone())
        .await
        .unwrap();

    assert_eq!(recorder.calls(), vec![Outcome::Timeout]);
    assert_eq!(connector.probe().opens.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn guard_measures_inactivity_not_total_duration() {
    let gap = Duration::from_secs(2);
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::Writable,
        Step::Pause(gap),
        Step::data("a"),
        Step::Pause(gap),
        Step::data("b"),
        Step::Pause(gap),
        Step::Close,
    ])]);
    let start = tokio::time::Instant::now();

    let outcome = manager(&connector).request(ping(0)).await;

    assert_eq!(outcome, Outcome::Success { data: b"ab".to_vec() });
    assert_elapsed(start.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn guard_interval_is_configurable() {
    let connector = ScriptedConnector::new([Script::new([Step::Stall])]);
    let config = ConnectorConfig::default().with_inactivity_timeout(Duration::from_millis(500));
    let start = tokio::time::Instant::now();

    let outcome = ConnectionAttemptManager::new(connector.clone(), config)
        .request(ping(0))
        .await;

    assert_eq!(outcome, Outcome::Timeout);
    assert_elapsed(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn timeout_after_a_failed_attempt_still_wins() {
    let connector = ScriptedConnector::new([refused(), Script::new([Step::Open, Step::Stall])]);

    let outcome = manager(&connector).request(ping(3)).await;

    assert_eq!(outcome, Outcome::Timeout);
    assert_eq!(connector.probe().opens.len(), 2);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shift_jis_response_is_transcoded() {
    // "テスト" in Shift_JIS.
    let sjis = vec![0x83, 0x65, 0x83, 0x58, 0x83, 0x67];
    let connector = ScriptedConnector::new([Script::new([Step::Open, Step::Data(sjis), Step::End])]);
    let config = ConnectorConfig::default().with_decoding(Decoding::shift_jis());

    let outcome = ConnectionAttemptManager::new(connector, config)
        .request(AttemptConfig::new("sim.example", 7000, ""))
        .await;

    assert_eq!(outcome, Outcome::Success { data: "テスト".as_bytes().to_vec() });
}

#[tokio::test(start_paused = true)]
async fn undecodable_response_is_reported_by_default() {
    let connector = ScriptedConnector::new([
        Script::new([Step::Open, Step::Data(vec![0x83]), Step::End]),
        Script::new([Step::Open, Step::End]),
    ]);
    let config = ConnectorConfig::default().with_decoding(Decoding::shift_jis());

    let outcome = ConnectionAttemptManager::new(connector.clone(), config)
        .request(ping(2))
        .await;

    assert!(matches!(outcome, Outcome::Error { code: -3, .. }), "got {outcome:?}");
    assert_eq!(connector.probe().opens.len(), 1, "decode failures are not retried");
}

#[tokio::test(start_paused = true)]
async fn undecodable_response_can_be_empty_success() {
    let connector = ScriptedConnector::new([Script::new([
        Step::Open,
        Step::Data(vec![0x83]),
        Step::End,
    ])]);
    let config = ConnectorConfig::default()
        .with_decoding(Decoding::shift_jis())
        .with_on_decode_error(OnDecodeError::EmptySuccess);

    let outcome = ConnectionAttemptManager::new(connector, config)
        .request(ping(0))
        .await;

    assert_eq!(outcome, Outcome::Success { data: Vec::new() });
}

// ---------------------------------------------------------------------------
// Exactly-once delivery
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn every_request_gets_exactly_one_callback() {
    let scenarios = vec![
        vec![Script::new([Step::Open, Step::Writable, Step::data("x"), Step::Close])],
        vec![refused(), refused(), refused()],
        vec![Script::new([Step::Open, Step::Stall])],
        vec![refused(), Script::new([Step::Open, Step::End])],
        // Events after end-of-stream must never be seen.
        vec![Script::new([
            Step::Open,
            Step::End,
            Step::fail(-1, "late error"),
            Step::data("late data"),
        ])],
    ];

    for scripts in scenarios {
        let connector = ScriptedConnector::new(scripts);
        let recorder = Recorder::default();
        manager(&connector)
            .start(ping(2), recorder.clone())
            .await
            .unwrap();
        assert_eq!(recorder.calls().len(), 1, "calls: {:?}", recorder.calls());

        let probe = connector.probe();
        let opened = probe.written.len();
        assert_eq!(probe.closes, opened, "every opened transport is closed once");
    }
}
