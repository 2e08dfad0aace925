use std::{collections::HashMap, sync::Arc};

use axum::{extract::Query, extract::State, http::StatusCode, routing::get, Router};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone, Default)]
struct DeviceLog {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

async fn spawn_device(get_body: &'static str) -> (Url, DeviceLog) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let log = DeviceLog::default();

    let app = Router::new()
        .route(
            "/get",
            get(
                move |State(log): State<DeviceLog>, Query(q): Query<HashMap<String, String>>| async move {
                    log.requests.lock().await.push(("/get".into(), q));
                    get_body
                },
            ),
        )
        .route(
            "/set",
            get(
                |State(log): State<DeviceLog>, Query(q): Query<HashMap<String, String>>| async move {
                    log.requests.lock().await.push(("/set".into(), q));
                    (StatusCode::BAD_REQUEST, "invalid value")
                },
            ),
        )
        .with_state(log.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let origin = Url::parse(&format!("http://{addr}")).expect("origin");
    (origin, log)
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn resolves_integer_attributes() {
    let identity = resolve_identity(Some("1"), Some("7")).expect("identity");
    assert_eq!(identity, Identity::new(1, 7));

    let negative = resolve_identity(Some("-2"), Some("0")).expect("identity");
    assert_eq!(negative, Identity::new(-2, 0));
}

#[test]
fn rejects_missing_or_malformed_attributes() {
    for (channel, cc) in [
        (None, Some("7")),
        (Some("1"), None),
        (Some("x"), Some("7")),
        (Some("1.5"), Some("7")),
        (Some(" 1"), Some("7")),
        (Some("1"), Some("")),
    ] {
        let err = resolve_identity(channel, cc).expect_err("must be invalid");
        assert!(matches!(err, ControlError::InvalidIdentity { .. }), "{err}");
    }
}

#[test]
fn checked_integer_rejects_fractions_and_non_finite_values() {
    assert_eq!(checked_integer(64.0).expect("integer"), 64);
    assert_eq!(checked_integer(-3.0).expect("integer"), -3);
    for value in [0.5, f64::NAN, f64::INFINITY, 1e19] {
        assert!(matches!(
            checked_integer(value),
            Err(ControlError::ValueType(_))
        ));
    }
}

#[tokio::test]
async fn fetch_sends_channel_and_cc_and_trims_body() {
    let (origin, log) = spawn_device(" 64\n").await;
    let channel = HttpValueChannel::new(&origin).expect("channel");

    let value = channel
        .fetch_value(Identity::new(1, 7))
        .await
        .expect("fetch");
    assert_eq!(value, 64);

    let requests = log.requests.lock().await;
    assert_eq!(
        *requests,
        vec![("/get".to_string(), query(&[("channel", "1"), ("cc", "7")]))]
    );
}

#[tokio::test]
async fn fetch_returns_out_of_range_values_unclamped() {
    let (origin, _log) = spawn_device("300").await;
    let channel = HttpValueChannel::new(&origin).expect("channel");
    let value = channel
        .fetch_value(Identity::new(0, 1))
        .await
        .expect("fetch");
    assert_eq!(value, 300);
}

#[tokio::test]
async fn fetch_rejects_non_integer_body() {
    let (origin, _log) = spawn_device("abc").await;
    let channel = HttpValueChannel::new(&origin).expect("channel");
    let err = channel
        .fetch_value(Identity::new(1, 7))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ControlError::Protocol(_)), "{err}");
    assert!(err.to_string().contains("invalid integer response"));
}

#[tokio::test]
async fn push_ignores_the_response_status() {
    let (origin, log) = spawn_device("0").await;
    let channel = HttpValueChannel::new(&origin).expect("channel");

    channel
        .push_value(Some(Identity::new(3, 74)), 100.0)
        .await
        .expect("push");

    let requests = log.requests.lock().await;
    assert_eq!(
        *requests,
        vec![(
            "/set".to_string(),
            query(&[("channel", "3"), ("cc", "74"), ("value", "100")])
        )]
    );
}

#[tokio::test]
async fn push_guards_run_before_any_request() {
    let (origin, log) = spawn_device("0").await;
    let channel = HttpValueChannel::new(&origin).expect("channel");

    let err = channel
        .push_value(Some(Identity::new(1, 7)), 1.25)
        .await
        .expect_err("fractional value");
    assert!(matches!(err, ControlError::ValueType(_)));

    let err = channel
        .push_value(None, 10.0)
        .await
        .expect_err("missing identity");
    assert!(matches!(err, ControlError::MissingIdentity));

    let err = channel
        .push_value(None, f64::NAN)
        .await
        .expect_err("value is checked first");
    assert!(matches!(err, ControlError::ValueType(_)));

    assert!(log.requests.lock().await.is_empty());
}

#[tokio::test]
async fn unreachable_device_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let origin = Url::parse(&format!("http://{addr}")).expect("origin");
    let channel = HttpValueChannel::with_timeout(&origin, Duration::from_secs(2)).expect("channel");
    let err = channel
        .fetch_value(Identity::new(1, 7))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ControlError::Network(_)), "{err}");
}
