use flight_ingest::types::*;
use flight_ingest::{
    BatchSender, CycleOutcome, EventHubSink, FetchConfig, PollLoop, SinkConfig, SnapshotFetcher,
    SnapshotSource, StreamSink, TransportBatch,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SAS_TOKEN: &str = "SharedAccessSignature sr=test&sig=abc&se=1&skn=send";

fn state(i: usize) -> Value {
    json!([
        format!("a{:05x}", i), format!("FLT{}  ", i), "Netherlands", 1756046666, 1756046667,
        4.76, 52.31, 3200.0, false, 180.25, 270.0, 5.2, null, 3300.0, "1000", false, 0
    ])
}

fn snapshot_body(count: usize) -> Value {
    json!({
        "time": 1756046666,
        "states": (0..count).map(state).collect::<Vec<_>>()
    })
}

fn fetch_config(server: &MockServer) -> FetchConfig {
    FetchConfig {
        endpoint: format!("{}/api/states/all", server.uri()),
        timeout_seconds: 5,
        ..Default::default()
    }
}

fn sink_config(server: &MockServer, max_batch_bytes: usize) -> SinkConfig {
    SinkConfig {
        endpoint: Some(server.uri()),
        hub_name: Some("flights".to_string()),
        sas_token: Some(SAS_TOKEN.to_string()),
        max_batch_bytes,
        sink_timeout_seconds: 5,
    }
}

#[test_log::test(tokio::test)]
async fn fetch_returns_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/states/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&server)).unwrap();
    let FetchOutcome::Snapshot(snapshot) = fetcher.fetch().await else {
        panic!("expected a snapshot");
    };

    assert_eq!(snapshot.time, Some(1756046666));
    let states = snapshot.states().unwrap();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].as_array().map(Vec::len), Some(17));
}

#[test_log::test(tokio::test)]
async fn malformed_state_does_not_drop_the_snapshot() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "time": 1756046666,
            "states": [state(0), state(1), null]
        })))
        .mount(&source)
        .await;
    let hub = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&hub)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&source)).unwrap();
    let sink = EventHubSink::new(&sink_config(&hub, 1_046_528)).unwrap();
    let poll_loop = PollLoop::new(
        Arc::new(fetcher),
        BatchSender::new(Arc::new(sink)),
        Duration::from_secs(10),
    );

    let CycleOutcome::Sent(report) = poll_loop.run_cycle().await else {
        panic!("expected a send");
    };
    assert_eq!(report.records_submitted, 3);
    assert_eq!(report.records_sent, 2);
    assert_eq!(report.records_skipped, 1);

    let requests = hub.received_requests().await.unwrap();
    let body: Vec<Value> = serde_json::from_slice(&requests[0].body).unwrap();
    let received: Vec<Value> = body
        .iter()
        .map(|event| serde_json::from_str(event["Body"].as_str().unwrap()).unwrap())
        .collect();
    assert_eq!(received, vec![state(0), state(1)]);
}

#[test_log::test(tokio::test)]
async fn non_success_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&server)).unwrap();

    match fetcher.fetch().await {
        FetchOutcome::Failed(reason) => assert!(reason.contains("429"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn unparseable_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&server)).unwrap();

    assert!(matches!(fetcher.fetch().await, FetchOutcome::Failed(_)));
}

#[test_log::test(tokio::test)]
async fn unreachable_source_is_a_failure() {
    let config = FetchConfig {
        endpoint: "http://127.0.0.1:9/api/states/all".to_string(),
        timeout_seconds: 2,
        ..Default::default()
    };
    let fetcher = SnapshotFetcher::new(config).unwrap();

    assert!(matches!(fetcher.fetch().await, FetchOutcome::Failed(_)));
}

#[test_log::test(tokio::test)]
async fn retries_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body(1)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_retries: 2,
        retry_delay_seconds: 1,
        ..fetch_config(&server)
    };
    let fetcher = SnapshotFetcher::new(config).unwrap();

    assert!(matches!(fetcher.fetch().await, FetchOutcome::Snapshot(_)));
}

#[test]
fn invalid_endpoint_is_rejected() {
    let config = FetchConfig {
        endpoint: "not a url".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        SnapshotFetcher::new(config),
        Err(IngestError::InvalidUrl(_))
    ));
}

#[test_log::test(tokio::test)]
async fn sink_posts_event_hub_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flights/messages"))
        .and(header("content-type", "application/vnd.microsoft.servicebus.json"))
        .and(header("authorization", SAS_TOKEN))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sink = EventHubSink::new(&sink_config(&server, 4096)).unwrap();
    let mut batch = TransportBatch::new(sink.max_batch_bytes());
    batch.try_append(state(1).to_string()).unwrap();
    batch.try_append(state(2).to_string()).unwrap();

    sink.send_batch(&batch).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Vec<Value> = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body.len(), 2);
    let first: Value = serde_json::from_str(body[0]["Body"].as_str().unwrap()).unwrap();
    assert_eq!(first, state(1));
}

#[test_log::test(tokio::test)]
async fn sink_reports_rejected_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let sink = EventHubSink::new(&sink_config(&server, 4096)).unwrap();
    let mut batch = TransportBatch::new(4096);
    batch.try_append("[1]".to_string()).unwrap();

    match sink.send_batch(&batch).await {
        Err(IngestError::Sink { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("expected sink error, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn every_request_stays_within_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let limit = 1000;
    let sink = Arc::new(EventHubSink::new(&sink_config(&server, limit)).unwrap());
    let sender = BatchSender::new(sink);
    let records: Vec<RawStateVector> = (0..40)
        .map(|i| serde_json::from_value(state(i)).unwrap())
        .collect();

    let report = sender.send_batch(&records).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), report.batches_attempted);
    assert!(requests.len() > 1);

    let mut received = Vec::new();
    for request in &requests {
        assert!(request.body.len() <= limit);
        let body: Vec<Value> = serde_json::from_slice(&request.body).unwrap();
        for event in body {
            received.push(serde_json::from_str::<Value>(event["Body"].as_str().unwrap()).unwrap());
        }
    }
    let expected: Vec<Value> = (0..40).map(state).collect();
    assert_eq!(received, expected);
    assert_eq!(report.records_sent, 40);
}

#[test_log::test(tokio::test)]
async fn cycle_moves_snapshot_to_sink() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body(5)))
        .mount(&source)
        .await;
    let hub = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&hub)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&source)).unwrap();
    let sink = EventHubSink::new(&sink_config(&hub, 1_046_528)).unwrap();
    let poll_loop = PollLoop::new(
        Arc::new(fetcher),
        BatchSender::new(Arc::new(sink)),
        Duration::from_secs(10),
    );

    match poll_loop.run_cycle().await {
        CycleOutcome::Sent(report) => {
            assert_eq!(report.records_submitted, 5);
            assert_eq!(report.records_sent, 5);
            assert_eq!(report.batches_attempted, 1);
        }
        other => panic!("expected a send, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn cycle_with_empty_states_sends_nothing() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"time": 1, "states": null})))
        .mount(&source)
        .await;
    let hub = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&hub)
        .await;

    let fetcher = SnapshotFetcher::new(fetch_config(&source)).unwrap();
    let sink = EventHubSink::new(&sink_config(&hub, 1_046_528)).unwrap();
    let poll_loop = PollLoop::new(
        Arc::new(fetcher),
        BatchSender::new(Arc::new(sink)),
        Duration::from_secs(10),
    );

    assert_eq!(poll_loop.run_cycle().await, CycleOutcome::NoData);
}
