//! Session lifecycle tests through the public LearnerService API
//!
//! Each test drives a service wired to in-memory fetcher, sink and policy
//! mocks and asserts on what the policy saw and what the sink received.

use std::sync::Arc;
use std::time::Duration;

use cadet_core::{
    Annotation, AnnotationTask, AnnotationUnitIdentifier, Communication, ContactInfo,
    LearnerConfig, LearnerService, MockFetcher, MockPolicyFactory, MockSinkFactory, PolicyCall,
    PolicyCallLog, RecordingSink, SessionError, SessionId, WakeStrategy, WorkerState,
};

struct Harness {
    service: LearnerService,
    sink: Arc<RecordingSink>,
    log: PolicyCallLog,
}

fn harness(threshold: usize, poll: Duration, wake: WakeStrategy) -> Harness {
    harness_with(threshold, poll, wake, MockFetcher::new(), MockPolicyFactory::new())
}

fn harness_with(
    threshold: usize,
    poll: Duration,
    wake: WakeStrategy,
    fetcher: MockFetcher,
    policies: MockPolicyFactory,
) -> Harness {
    let sinks = MockSinkFactory::new();
    let sink = sinks.sink();
    let log = policies.log();
    let config = LearnerConfig {
        retrain_threshold: threshold,
        poll_interval: poll,
        wake,
    };
    let service = LearnerService::new(
        config,
        Arc::new(fetcher),
        Arc::new(sinks),
        Arc::new(policies),
    );
    Harness { service, sink, log }
}

fn three_items() -> AnnotationTask {
    AnnotationTask::new(vec![
        AnnotationUnitIdentifier::new("doc-1"),
        AnnotationUnitIdentifier::new("doc-2"),
        AnnotationUnitIdentifier::new("doc-3"),
    ])
}

fn contact() -> ContactInfo {
    ContactInfo::new("broker.local", 9091)
}

fn annotation(id: &str) -> Annotation {
    Annotation::new(
        AnnotationUnitIdentifier::new(id),
        Communication::new(id).with_text("relevant"),
    )
}

async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn retrain_runs_once_when_threshold_is_reached() {
    let h = harness(2, Duration::from_millis(50), WakeStrategy::Poll);
    let id = SessionId::new("scenario-1");
    h.service.start(id.clone(), three_items(), contact()).await.unwrap();
    let initial = h.sink.wait_for_deliveries(1).await;

    assert!(h.service.add_annotations(&id, vec![annotation("doc-1")]).await);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(h.log.train_count(), 0, "one annotation must not retrain");

    assert!(h.service.add_annotations(&id, vec![annotation("doc-2")]).await);
    let deliveries = h.sink.wait_for_deliveries(2).await;

    assert_eq!(h.log.train_count(), 1);
    assert_eq!(h.log.rank_count(), 2);
    assert_eq!(
        h.log.ingested(),
        vec![vec![annotation("doc-1"), annotation("doc-2")]]
    );
    assert_ne!(deliveries[1].ranking, initial[0].ranking);
    assert_eq!(deliveries[1].ranking.len(), 3);

    h.service.stop(&id).await.unwrap();
}

#[tokio::test]
async fn retrain_follows_ingest_in_call_order() {
    let h = harness(1, Duration::from_millis(10), WakeStrategy::Poll);
    let id = SessionId::new("ordered");
    h.service.start(id.clone(), three_items(), contact()).await.unwrap();

    h.service.add_annotations(&id, vec![annotation("doc-3")]).await;
    h.sink.wait_for_deliveries(2).await;
    h.service.stop(&id).await.unwrap();

    let calls: Vec<_> = h
        .log
        .calls()
        .into_iter()
        .filter(|call| !matches!(call, PolicyCall::Created { .. }))
        .collect();
    assert_eq!(
        calls,
        vec![
            PolicyCall::Rank,
            PolicyCall::AddAnnotations(vec![annotation("doc-3")]),
            PolicyCall::Train,
            PolicyCall::Rank,
        ]
    );
}

#[tokio::test]
async fn stop_immediately_after_start_never_delivers_late() {
    let h = harness(2, Duration::from_millis(50), WakeStrategy::Poll);
    let id = SessionId::new("scenario-2");

    h.service.start(id.clone(), three_items(), contact()).await.unwrap();
    h.service.stop(&id).await.unwrap();
    let delivered_at_stop = h.sink.delivery_count().await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(delivered_at_stop <= 1);
    assert_eq!(h.sink.delivery_count().await, delivered_at_stop);
    assert_eq!(h.service.session_count().await, 0);
}

#[tokio::test]
async fn unknown_session_is_rejected_without_state() {
    let h = harness(2, Duration::from_millis(50), WakeStrategy::Poll);
    let id = SessionId::new("never-started");

    assert!(!h.service.add_annotations(&id, vec![annotation("doc-1")]).await);
    h.service.stop(&id).await.unwrap();

    assert_eq!(h.service.session_count().await, 0);
    assert!(h.service.list_sessions().await.is_empty());
    assert_eq!(h.log.created_count(), 0);
}

#[tokio::test]
async fn policy_receives_fetched_content_and_language() {
    let h = harness(2, Duration::from_millis(50), WakeStrategy::Poll);
    let id = SessionId::new("context");
    let task = three_items().with_language("eng");

    h.service.start(id.clone(), task, contact()).await.unwrap();
    h.service.stop(&id).await.unwrap();

    assert_eq!(
        h.log.calls()[0],
        PolicyCall::Created {
            session_id: id,
            units: 3,
            communications: 3,
            language: Some("eng".to_string()),
        }
    );
}

#[tokio::test]
async fn fetch_failure_aborts_start() {
    let h = harness_with(
        2,
        Duration::from_millis(50),
        WakeStrategy::Poll,
        MockFetcher::failing("connection refused"),
        MockPolicyFactory::new(),
    );
    let id = SessionId::new("unreachable");

    let result = h.service.start(id.clone(), three_items(), contact()).await;

    assert!(matches!(result, Err(SessionError::Fetch { .. })));
    assert_eq!(h.service.session_count().await, 0);
    assert_eq!(h.log.created_count(), 0);
    assert!(!h.service.add_annotations(&id, vec![annotation("doc-1")]).await);
}

#[tokio::test]
async fn empty_ranking_is_not_delivered() {
    let h = harness_with(
        1,
        Duration::from_millis(10),
        WakeStrategy::Poll,
        MockFetcher::new(),
        MockPolicyFactory::new()
            .with_ranking(None)
            .with_ranking(Some(vec![])),
    );
    let id = SessionId::new("quiet");
    h.service.start(id.clone(), three_items(), contact()).await.unwrap();

    h.service.add_annotations(&id, vec![annotation("doc-1")]).await;
    let log = h.log.clone();
    wait_until(|| log.rank_count() == 2).await;
    h.service.add_annotations(&id, vec![annotation("doc-2")]).await;
    h.sink.wait_for_deliveries(1).await;
    h.service.stop(&id).await.unwrap();

    assert_eq!(h.log.rank_count(), 3);
    assert_eq!(h.sink.delivery_count().await, 1);
}

#[tokio::test]
async fn delivery_failure_keeps_worker_running() {
    let sink = Arc::new(RecordingSink::failing_first(1));
    let policies = MockPolicyFactory::new();
    let log = policies.log();
    let config = LearnerConfig {
        retrain_threshold: 1,
        poll_interval: Duration::from_millis(10),
        wake: WakeStrategy::Poll,
    };
    let service = LearnerService::new(
        config,
        Arc::new(MockFetcher::new()),
        Arc::new(MockSinkFactory::with_sink(sink.clone())),
        Arc::new(policies),
    );
    let id = SessionId::new("flaky-broker");
    service.start(id.clone(), three_items(), contact()).await.unwrap();
    wait_until(|| log.rank_count() == 1).await;

    service.add_annotations(&id, vec![annotation("doc-1")]).await;
    sink.wait_for_deliveries(1).await;

    let info = service.list_sessions().await.remove(0);
    assert_eq!(info.state, WorkerState::Running);
    assert_eq!(log.train_count(), 1);

    service.stop(&id).await.unwrap();
}

#[tokio::test]
async fn policy_failure_terminates_only_that_session() {
    let h = harness(1, Duration::from_millis(10), WakeStrategy::Poll);
    let healthy = SessionId::new("healthy");
    h.service
        .start(healthy.clone(), three_items(), contact())
        .await
        .unwrap();

    let failing_policies = MockPolicyFactory::new().failing_train();
    let failing = LearnerService::new(
        LearnerConfig {
            retrain_threshold: 1,
            poll_interval: Duration::from_millis(10),
            wake: WakeStrategy::Poll,
        },
        Arc::new(MockFetcher::new()),
        Arc::new(MockSinkFactory::new()),
        Arc::new(failing_policies),
    );
    let broken = SessionId::new("broken");
    failing
        .start(broken.clone(), three_items(), contact())
        .await
        .unwrap();

    failing.add_annotations(&broken, vec![annotation("doc-1")]).await;
    let handle = failing.registry().get(&broken).await.unwrap();
    handle.wait_for_state(WorkerState::Terminated).await;

    assert!(handle.failure().is_some());
    assert!(failing.registry().contains(&broken).await);

    h.service.add_annotations(&healthy, vec![annotation("doc-1")]).await;
    h.sink.wait_for_deliveries(2).await;
    assert_eq!(
        h.service.list_sessions().await[0].state,
        WorkerState::Running
    );

    failing.stop(&broken).await.unwrap();
    h.service.stop(&healthy).await.unwrap();
}

#[tokio::test]
async fn notify_wake_retrains_without_waiting_for_poll() {
    let h = harness(2, Duration::from_secs(30), WakeStrategy::Notify);
    let id = SessionId::new("notify");
    h.service.start(id.clone(), three_items(), contact()).await.unwrap();
    h.sink.wait_for_deliveries(1).await;

    h.service
        .add_annotations(&id, vec![annotation("doc-1"), annotation("doc-2")])
        .await;

    tokio::time::timeout(Duration::from_secs(2), h.sink.wait_for_deliveries(2))
        .await
        .expect("notify wake should retrain well before the poll interval");
    assert_eq!(h.log.train_count(), 1);

    h.service.stop(&id).await.unwrap();
}
