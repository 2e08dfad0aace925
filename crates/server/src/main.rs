use std::{collections::HashMap, path::Path, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{any, get},
    Router,
};
use clap::Parser;
use shared::{
    error::ProtocolError,
    protocol::{parse_byte_field, GET_PATH, SET_ACK_BODY, SET_PATH},
};
use tower_http::services::ServeDir;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod device;
mod midi;

use config::load_settings;
use device::{load_initial_values, replay_on_ready, DeviceState};
use midi::{LoggingMidiOutput, MidiOutput};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    node: Option<String>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    device: Option<PathBuf>,
}

type Params = Query<HashMap<String, String>>;
type Rejection = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(node) = args.node {
        settings.node_name = node;
    }
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(device) = args.device {
        settings.device_dir = device;
    }
    settings.validate()?;

    let initial = load_initial_values(&settings.init_file())
        .context("failed to load initial values")?;

    let midi = Arc::new(LoggingMidiOutput::new(settings.node_name.clone()));
    let state = Arc::new(DeviceState::new(midi.clone()));
    state.seed(initial).await;
    tokio::spawn(replay_on_ready(Arc::clone(&state), midi.readiness()));

    let web_dir = settings.web_dir();
    let app = build_router(state, &web_dir);

    let addr = settings.bind_addr()?;
    info!(%addr, node = %settings.node_name, web_dir = %web_dir.display(), "device server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<DeviceState>, web_dir: &Path) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(GET_PATH, any(get_value))
        .route(SET_PATH, any(set_value))
        .fallback_service(ServeDir::new(web_dir))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_value(
    State(state): State<Arc<DeviceState>>,
    Query(params): Params,
) -> Result<String, Rejection> {
    let channel = field(&params, "channel")?;
    let cc = field(&params, "cc")?;
    Ok(state.get(channel, cc).await.to_string())
}

async fn set_value(
    State(state): State<Arc<DeviceState>>,
    Query(params): Params,
) -> Result<&'static str, Rejection> {
    let channel = field(&params, "channel")?;
    let cc = field(&params, "cc")?;
    let value = field(&params, "value")?;
    state.set(channel, cc, value).await;
    debug!(channel, cc, value, "cc value updated");
    Ok(SET_ACK_BODY)
}

fn field(params: &HashMap<String, String>, name: &'static str) -> Result<u8, Rejection> {
    parse_byte_field(params.get(name).map(String::as_str), name).map_err(bad_request)
}

fn bad_request(error: ProtocolError) -> Rejection {
    (StatusCode::BAD_REQUEST, format!("{error}\n"))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
