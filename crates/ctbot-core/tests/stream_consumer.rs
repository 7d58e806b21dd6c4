//! Stream consumer behaviour over a scripted connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctbot_core::BoxFuture;
use ctbot_core::daemon::ShutdownSignal;
use ctbot_core::dispatch::{EventHandler, NotifyingHandler};
use ctbot_core::event::{EventKind, Module, Release};
use ctbot_core::notify::NotifyError;
use ctbot_core::stats::DaemonStats;
use ctbot_core::stream::{
    ConsumerSettings, EventConsumer, FrameStream, StreamConnector, StreamError,
};
use ctbot_test_utils::fixtures::{
    marker_only_frame, module_created_frame, module_deleted_frame, release_created_frame,
};
use ctbot_test_utils::sink::RecordingSink;
use ctbot_test_utils::stream::{ScriptStep, ScriptedConnector};
use ctbot_test_utils::tracing_setup::init_test_tracing;
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(2);

fn settings() -> ConsumerSettings {
    ConsumerSettings {
        ping_interval: Duration::from_secs(30),
        idle_timeout: Duration::from_secs(60),
        reconnect_initial: Duration::from_millis(5),
        reconnect_max: Duration::from_millis(20),
        drain_timeout: Duration::from_millis(500),
    }
}

/// Records which handler ran, per module name.
#[derive(Default)]
struct KindRecorder(Mutex<Vec<(EventKind, String)>>);

impl KindRecorder {
    fn record(&self, kind: EventKind, module: &Module) -> BoxFuture<'_, Result<(), NotifyError>> {
        self.0.lock().unwrap().push((kind, module.name.clone()));
        Box::pin(async { Ok(()) })
    }

    fn calls(&self) -> Vec<(EventKind, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl EventHandler for KindRecorder {
    fn on_module_created<'a>(&'a self, m: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.record(EventKind::ModuleCreated, m)
    }

    fn on_release_created<'a>(
        &'a self,
        m: &'a Module,
        _: &'a Release,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.record(EventKind::ReleaseCreated, m)
    }

    fn on_module_deleted<'a>(&'a self, m: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.record(EventKind::ModuleDeleted, m)
    }
}

struct Running {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    stats: Arc<DaemonStats>,
    handle: JoinHandle<Result<(), StreamError>>,
}

impl Running {
    async fn stop(self) -> Result<(), StreamError> {
        let _ = self.shutdown_tx.send(ShutdownSignal);
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("consumer did not stop")
            .expect("consumer panicked")
    }
}

fn start(
    connector: Arc<dyn StreamConnector>,
    settings: ConsumerSettings,
    handler: Arc<dyn EventHandler>,
) -> Running {
    init_test_tracing();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let stats = Arc::new(DaemonStats::new());
    let consumer = EventConsumer::new(connector, settings, stats.clone());
    let handle = tokio::spawn(consumer.run(handler, shutdown_rx));
    Running {
        shutdown_tx,
        stats,
        handle,
    }
}

async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn module_deleted_frame_reaches_only_its_handler() {
    let connector = Arc::new(
        ScriptedConnector::new().session(vec![ScriptStep::Text(module_deleted_frame("Gone")), ScriptStep::Hold]),
    );
    let recorder = Arc::new(KindRecorder::default());
    let running = start(connector, settings(), recorder.clone());

    wait_until("dispatch", || !recorder.calls().is_empty()).await;
    let stats = running.stats.clone();
    running.stop().await.unwrap();

    assert_eq!(recorder.calls(), vec![(EventKind::ModuleDeleted, "Gone".to_string())]);
    assert_eq!(stats.snapshot().events_dispatched, 1);
}

#[tokio::test]
async fn unrecognized_frames_are_dropped_and_stream_continues() {
    let connector = Arc::new(ScriptedConnector::new().session(vec![
        ScriptStep::Text(r#"{"type":"heartbeat"}"#.to_string()),
        ScriptStep::Text("garbage".to_string()),
        ScriptStep::Text(r#"{"type":"module_created","module":{"name":42}}"#.to_string()),
        ScriptStep::Control,
        ScriptStep::Text(module_created_frame("After")),
        ScriptStep::Hold,
    ]));
    let recorder = Arc::new(KindRecorder::default());
    let running = start(connector, settings(), recorder.clone());

    wait_until("dispatch", || !recorder.calls().is_empty()).await;
    let stats = running.stats.snapshot();
    running.stop().await.unwrap();

    assert_eq!(recorder.calls(), vec![(EventKind::ModuleCreated, "After".to_string())]);
    assert_eq!(stats.frames_received, 4);
    assert_eq!(stats.frames_rejected, 3);
}

#[tokio::test]
async fn events_are_dispatched_in_arrival_order() {
    let connector = Arc::new(ScriptedConnector::new().session(vec![
        ScriptStep::Text(module_created_frame("A")),
        ScriptStep::Text(release_created_frame("A", "1.0.0")),
        ScriptStep::Text(marker_only_frame("module_created", "B")),
        ScriptStep::Text(module_deleted_frame("A")),
        ScriptStep::Hold,
    ]));
    let recorder = Arc::new(KindRecorder::default());
    let running = start(connector, settings(), recorder.clone());

    wait_until("four dispatches", || recorder.calls().len() == 4).await;
    running.stop().await.unwrap();

    assert_eq!(
        recorder.calls(),
        vec![
            (EventKind::ModuleCreated, "A".to_string()),
            (EventKind::ReleaseCreated, "A".to_string()),
            (EventKind::ModuleCreated, "B".to_string()),
            (EventKind::ModuleDeleted, "A".to_string()),
        ]
    );
}

#[tokio::test]
async fn reconnects_after_refusal_and_transport_failure() {
    let connector = Arc::new(
        ScriptedConnector::new()
            .refuse("connection refused")
            .session(vec![
                ScriptStep::Text(module_created_frame("First")),
                ScriptStep::Fail("reset by peer".to_string()),
            ])
            .session(vec![ScriptStep::Text(module_created_frame("Second")), ScriptStep::Close])
            .session(vec![ScriptStep::Text(module_deleted_frame("Third")), ScriptStep::Hold]),
    );
    let recorder = Arc::new(KindRecorder::default());
    let running = start(connector.clone(), settings(), recorder.clone());

    wait_until("three dispatches", || recorder.calls().len() == 3).await;
    let stats = running.stats.snapshot();
    running.stop().await.unwrap();

    let names: Vec<String> = recorder.calls().into_iter().map(|(_, name)| name).collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
    assert_eq!(connector.connects(), 4);
    assert_eq!(stats.reconnects, 3);
    assert!(stats.stream_connected);
}

#[tokio::test]
async fn pings_on_interval_while_connected() {
    let connector = Arc::new(ScriptedConnector::new().session(vec![ScriptStep::Hold]));
    let settings = ConsumerSettings {
        ping_interval: Duration::from_millis(10),
        ..settings()
    };
    let running = start(connector.clone(), settings, Arc::new(KindRecorder::default()));

    wait_until("three pings", || connector.pings() >= 3).await;
    running.stop().await.unwrap();
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn idle_connection_is_replaced() {
    let connector = Arc::new(
        ScriptedConnector::new()
            .session(vec![ScriptStep::Hold])
            .session(vec![ScriptStep::Text(module_created_frame("Fresh")), ScriptStep::Hold]),
    );
    let settings = ConsumerSettings {
        idle_timeout: Duration::from_millis(30),
        ..settings()
    };
    let recorder = Arc::new(KindRecorder::default());
    let running = start(connector.clone(), settings, recorder.clone());

    wait_until("dispatch after reconnect", || !recorder.calls().is_empty()).await;
    running.stop().await.unwrap();
    assert!(connector.connects() >= 2);
}

/// Always fails with an error that reconnecting cannot fix.
struct BadEndpoint(AtomicUsize);

impl StreamConnector for BadEndpoint {
    fn endpoint(&self) -> &str {
        "nope://"
    }

    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameStream>, StreamError>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(StreamError::InvalidEndpoint("unsupported scheme".to_string())) })
    }
}

#[tokio::test]
async fn invalid_endpoint_stops_the_consumer() {
    let connector = Arc::new(BadEndpoint(AtomicUsize::new(0)));
    let running = start(connector.clone(), settings(), Arc::new(KindRecorder::default()));

    let result = tokio::time::timeout(WAIT, running.handle)
        .await
        .expect("consumer should stop on its own")
        .expect("consumer panicked");
    assert!(matches!(result, Err(StreamError::InvalidEndpoint(_))));
    assert_eq!(connector.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_notifications_do_not_stop_dispatch() {
    let connector = Arc::new(ScriptedConnector::new().session(vec![
        ScriptStep::Text(module_created_frame("A")),
        ScriptStep::Text(module_deleted_frame("A")),
        ScriptStep::Hold,
    ]));
    let sink = Arc::new(RecordingSink::failing());
    let handler = Arc::new(NotifyingHandler::new(sink.clone(), "https://m/"));
    let running = start(connector, settings(), handler);

    sink.wait_for(2, WAIT).await;
    let stats = running.stats.clone();
    running.stop().await.unwrap();

    assert_eq!(sink.titles(), vec!["Module created: A", "Module deleted: A"]);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.events_dispatched, 2);
    assert_eq!(snapshot.notify_failures, 2);
}

/// A handler whose notifications never finish.
#[derive(Default)]
struct StuckHandler(AtomicUsize);

impl StuckHandler {
    fn hang(&self) -> BoxFuture<'_, Result<(), NotifyError>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }
}

impl EventHandler for StuckHandler {
    fn on_module_created<'a>(&'a self, _: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.hang()
    }

    fn on_release_created<'a>(
        &'a self,
        _: &'a Module,
        _: &'a Release,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.hang()
    }

    fn on_module_deleted<'a>(&'a self, _: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.hang()
    }
}

#[tokio::test]
async fn stuck_handler_does_not_stall_pings_or_shutdown() {
    let mut steps: Vec<ScriptStep> = (0..100)
        .map(|i| ScriptStep::Text(module_created_frame(&format!("M{i}"))))
        .collect();
    steps.push(ScriptStep::Hold);
    let connector = Arc::new(ScriptedConnector::new().session(steps));
    let settings = ConsumerSettings {
        ping_interval: Duration::from_millis(20),
        drain_timeout: Duration::from_millis(100),
        ..settings()
    };
    let handler = Arc::new(StuckHandler::default());
    let running = start(connector.clone(), settings, handler.clone());

    wait_until("pings with a full dispatch queue", || connector.pings() >= 3).await;
    let stats = running.stats.clone();
    running.stop().await.unwrap();

    assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    assert_eq!(connector.connects(), 1);
    let snapshot = stats.snapshot();
    assert!(snapshot.frames_received < 100, "reader kept reading: {}", snapshot.frames_received);
    assert_eq!(snapshot.events_dispatched, 0);
}
