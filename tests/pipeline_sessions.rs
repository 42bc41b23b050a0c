//! End-to-end session tests driven through the public API with the mock
//! producer and engine.

use longscribe::pipeline::types::FailureReason;
use longscribe::{
    Coordinator, MockEngine, MockProducer, MockReply, PipelineConfig, SessionState,
    SessionStatus, SessionStore, SourceMedia, SubmitRequest,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

struct Fixture {
    dir: TempDir,
    source: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("lecture.m4a");
        std::fs::write(&source, b"placeholder media").unwrap();
        Self { dir, source }
    }

    fn work_dir(&self) -> PathBuf {
        self.dir.path().join("segments")
    }

    fn producer(&self) -> MockProducer {
        MockProducer::new(self.work_dir())
    }

    fn request(&self, duration: f64) -> SubmitRequest {
        SubmitRequest::new(SourceMedia::borrowed(&self.source), "test-model", duration)
    }
}

fn config(max_attempts: u32) -> PipelineConfig {
    PipelineConfig {
        segment_length_secs: 300.0,
        attempt_timeout: Duration::from_millis(50),
        max_attempts,
        retry_delay: Duration::ZERO,
    }
}

fn coordinator(producer: MockProducer, engine: Arc<MockEngine>, max_attempts: u32) -> Coordinator {
    Coordinator::new(
        Arc::new(SessionStore::new()),
        Arc::new(producer),
        engine,
        config(max_attempts),
    )
}

fn leftover_artifacts(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

fn lines(state: &SessionState) -> Vec<String> {
    state
        .final_transcript
        .as_deref()
        .unwrap_or_default()
        .split("\n\n")
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn seven_hundred_seconds_with_one_failing_segment() {
    let fixture = Fixture::new();
    let engine = Arc::new(
        MockEngine::new()
            .with_reply_at(0, MockReply::Text("opening words".to_string()))
            .with_reply_at(300, MockReply::Fail("engine crashed".to_string()))
            .with_reply_at(600, MockReply::Text("closing words".to_string())),
    );
    let coordinator = coordinator(fixture.producer(), Arc::clone(&engine), 2);

    let handle = coordinator.submit(fixture.request(700.0));
    let id = handle.id().to_string();
    assert_eq!(handle.wait().await, SessionStatus::Completed);

    let state = coordinator.poll_progress(&id).unwrap();
    assert_eq!(state.total_segments, 3);
    assert_eq!(state.fragments.len(), 3);
    assert_eq!(state.progress_percent, 100.0);
    assert_eq!(state.successful_segments, Some(2));
    let rate = state.success_rate.unwrap();
    assert!((rate - 66.67).abs() < 0.01, "success rate {rate}");
    assert_eq!(
        lines(&state),
        vec![
            "[00:00] opening words",
            "[05:00] SEGMENT 2 FAILED AFTER 2 ATTEMPTS",
            "[10:00] closing words",
        ]
    );

    let offsets: Vec<f64> = engine.calls().iter().map(|c| c.offset_secs).collect();
    assert_eq!(offsets, vec![0.0, 300.0, 300.0, 600.0]);
    assert!(engine.calls().iter().all(|c| c.model == "test-model"));
    assert_eq!(leftover_artifacts(&fixture.work_dir()), 0);
}

#[tokio::test]
async fn hanging_engine_times_out_after_every_attempt_without_blocking() {
    let fixture = Fixture::new();
    let engine = Arc::new(MockEngine::new().with_reply_at(0, MockReply::Hang));
    let coordinator = coordinator(fixture.producer(), Arc::clone(&engine), 3);

    let handle = coordinator.submit(fixture.request(700.0));
    let id = handle.id().to_string();
    assert_eq!(handle.wait().await, SessionStatus::Completed);

    assert_eq!(engine.calls_at(0), 3);
    assert_eq!(engine.calls_at(300), 1);
    assert_eq!(engine.calls_at(600), 1);

    let state = coordinator.poll_progress(&id).unwrap();
    let first = state.fragments.iter().find(|f| f.index == 0).unwrap();
    assert_eq!(first.outcome.failure_reason(), Some(FailureReason::Timeout));
    assert_eq!(lines(&state)[0], "[00:00] SEGMENT 1 TIMED OUT AFTER 3 ATTEMPTS");
    assert_eq!(state.successful_segments, Some(2));
    assert_eq!(leftover_artifacts(&fixture.work_dir()), 0);
}

#[tokio::test]
async fn producer_failure_is_recorded_without_engine_call() {
    let fixture = Fixture::new();
    let engine = Arc::new(MockEngine::new());
    let coordinator = coordinator(
        fixture.producer().with_failure_at(1),
        Arc::clone(&engine),
        2,
    );

    let handle = coordinator.submit(fixture.request(700.0));
    let id = handle.id().to_string();
    assert_eq!(handle.wait().await, SessionStatus::Completed);

    assert_eq!(engine.calls_at(300), 0);
    let state = coordinator.poll_progress(&id).unwrap();
    assert_eq!(state.fragments.len(), 3);
    // Producer failures are recorded during segmentation, ahead of the rest.
    assert_eq!(state.fragments[0].index, 1);
    assert!(lines(&state)[1].starts_with("[05:00] SEGMENT 2 ERROR: "));
    assert_eq!(state.successful_segments, Some(2));
}

#[tokio::test]
async fn exact_multiple_plans_trailing_window() {
    let fixture = Fixture::new();
    let engine = Arc::new(MockEngine::new());
    // The trailing window starts at end-of-input and yields an empty file.
    let coordinator = coordinator(
        fixture.producer().with_empty_at(2),
        Arc::clone(&engine),
        2,
    );

    let handle = coordinator.submit(fixture.request(600.0));
    let id = handle.id().to_string();
    assert_eq!(handle.wait().await, SessionStatus::Completed);

    let state = coordinator.poll_progress(&id).unwrap();
    assert_eq!(state.total_segments, 3);
    assert_eq!(
        state.fragments.iter().find(|f| f.index == 2).unwrap().outcome.failure_reason(),
        Some(FailureReason::ProducerError)
    );
    assert_eq!(engine.calls().len(), 2);
    assert_eq!(leftover_artifacts(&fixture.work_dir()), 0);
}

#[tokio::test]
async fn cancel_mid_transcription_finishes_in_flight_segment_then_stops() {
    let fixture = Fixture::new();
    let gate = Arc::new(Semaphore::new(0));
    let engine = Arc::new(MockEngine::new().with_gate(Arc::clone(&gate)));
    let started = engine.started();
    let coordinator = coordinator(fixture.producer(), Arc::clone(&engine), 2);

    let handle = coordinator.submit(fixture.request(700.0));
    let id = handle.id().to_string();

    // First segment is now inside the engine.
    started.notified().await;
    let state = coordinator.poll_progress(&id).unwrap();
    assert_eq!(state.status, SessionStatus::Transcribing);
    assert_eq!(state.progress_percent, 30.0);

    assert!(coordinator.cancel(&id));
    assert!(coordinator.poll_progress(&id).is_none());
    assert!(!coordinator.cancel(&id));

    gate.add_permits(10);
    assert_eq!(handle.wait().await, SessionStatus::Cancelled);

    assert_eq!(engine.calls().len(), 1);
    assert!(coordinator.poll_progress(&id).is_none());
    assert_eq!(leftover_artifacts(&fixture.work_dir()), 0);
}

#[tokio::test]
async fn cancel_before_start_produces_nothing() {
    let fixture = Fixture::new();
    let engine = Arc::new(MockEngine::new());
    let producer = Arc::new(fixture.producer());
    let coordinator = Coordinator::new(
        Arc::new(SessionStore::new()),
        Arc::clone(&producer) as Arc<dyn longscribe::SegmentProducer>,
        Arc::clone(&engine) as Arc<dyn longscribe::TranscriptionEngine>,
        config(2),
    );

    let handle = coordinator.submit(fixture.request(700.0));
    assert!(coordinator.cancel(handle.id()));
    assert_eq!(handle.wait().await, SessionStatus::Cancelled);

    assert!(producer.calls().is_empty());
    assert!(engine.calls().is_empty());
    assert!(coordinator.store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pollers_observe_monotonic_progress() {
    let fixture = Fixture::new();
    let engine = Arc::new(MockEngine::new());
    let coordinator = coordinator(fixture.producer(), engine, 2);

    let handle = coordinator.submit(fixture.request(3000.0));
    let id = handle.id().to_string();

    let pollers: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = coordinator.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    let state = coordinator.poll_progress(&id).unwrap();
                    let done = state.is_terminal();
                    seen.push((state.status, state.progress_percent));
                    if done {
                        return seen;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    assert_eq!(handle.wait().await, SessionStatus::Completed);

    for poller in pollers {
        let seen = poller.await.unwrap();
        for pair in seen.windows(2) {
            assert!(pair[1].1 >= pair[0].1, "progress went backwards: {pair:?}");
        }
        for (status, progress) in &seen {
            if *progress == 100.0 {
                assert_eq!(*status, SessionStatus::Completed);
            }
            if *status == SessionStatus::Segmenting {
                assert!(*progress <= 30.0);
            }
        }
        assert_eq!(seen.last().unwrap().0, SessionStatus::Completed);
    }

    let state = coordinator.poll_progress(&id).unwrap();
    assert_eq!(state.fragments.len(), 11);
    assert_eq!(state.success_rate, Some(100.0));
}

#[tokio::test]
async fn sessions_are_independent() {
    let fixture = Fixture::new();
    let engine = Arc::new(
        MockEngine::new().with_reply_at(0, MockReply::Fail("always".to_string())),
    );
    let coordinator = coordinator(fixture.producer(), engine, 1);

    let short = coordinator.submit(fixture.request(100.0));
    let long = coordinator.submit(fixture.request(700.0));
    let (short_id, long_id) = (short.id().to_string(), long.id().to_string());
    assert_ne!(short_id, long_id);

    assert_eq!(short.wait().await, SessionStatus::Completed);
    assert_eq!(long.wait().await, SessionStatus::Completed);

    let short_state = coordinator.poll_progress(&short_id).unwrap();
    assert_eq!(short_state.total_segments, 1);
    assert_eq!(short_state.success_rate, Some(0.0));
    assert_eq!(
        short_state.final_transcript.as_deref(),
        Some("[00:00] SEGMENT 1 FAILED AFTER 1 ATTEMPTS")
    );

    let long_state = coordinator.poll_progress(&long_id).unwrap();
    assert_eq!(long_state.total_segments, 3);
    assert_eq!(long_state.successful_segments, Some(2));
    assert_eq!(coordinator.store().len(), 2);
}
