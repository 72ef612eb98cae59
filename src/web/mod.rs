use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::{
    Interface, Trunk, VirtualMachine, Vlan, VlanScopeError,
    analysis::{
        ConnectedPort, DeviceSummary, DiffusionReport, LinkReport, LinkSummary, SnapshotInfo,
        SnapshotStore, TupleReport,
    },
    config::{AppConfig, ViewOptions},
    incoherence::{EdgeDiffusion, Incoherence, VlanState},
    matching::InterfaceTuple,
    topology::LinkKey,
    web::on_response::DefaultOnResponse,
};

pub mod on_response;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: SnapshotStore, config: AppConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    fn view_options(&self, query: ViewQuery) -> ViewOptions {
        self.config
            .view_options(query.vlan, query.show_vms.unwrap_or(false))
    }
}

/// Query string accepted by the read endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub vlan: Option<String>,
    pub show_vms: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopologyLink {
    #[serde(flatten)]
    pub summary: LinkSummary,
    pub tuples: Vec<InterfaceTuple>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopologyResponse {
    pub version: u64,
    pub vlan: Option<String>,
    pub links: Vec<TopologyLink>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "vlanscope", description = "LLDP topology and VLAN coherence API"),
    components(schemas(
        ConnectedPort,
        DeviceSummary,
        DiffusionReport,
        EdgeDiffusion,
        Incoherence,
        Interface,
        InterfaceTuple,
        LinkKey,
        LinkReport,
        LinkSummary,
        SnapshotInfo,
        TopologyLink,
        TopologyResponse,
        Trunk,
        TupleReport,
        VirtualMachine,
        Vlan,
        VlanState,
    ))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, String);

fn api_error(err: VlanScopeError) -> ApiError {
    let status = match err {
        VlanScopeError::NotFound(_) => StatusCode::NOT_FOUND,
        VlanScopeError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %err, "Request failed");
    } else {
        debug!(error = %err, "Request rejected");
    }
    (status, err.to_string())
}

pub fn create_router(state: AppState) -> Router {
    // response headers only show up when debug logging is on
    let tracelayer = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().include_headers(tracing::enabled!(Level::DEBUG)))
        .make_span_with(
            DefaultMakeSpan::default()
                .include_headers(false)
                .level(Level::INFO),
        );

    Router::new()
        .route("/api/snapshot", get(get_snapshot_info))
        .route("/api/snapshot/reload", post(reload_snapshot))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/{device_id}", get(get_device_details))
        .route("/api/topology", get(get_topology))
        .route("/api/vlans", get(list_vlans))
        .route("/api/vlans/{vlan_id}/diffusion", get(get_vlan_diffusion))
        .route("/api/links/{from}/{to}", get(get_link_report))
        .route("/api/openapi.json", get(get_openapi))
        .layer(tracelayer)
        .with_state(state)
}

#[instrument(skip(state), fields(version), level = "info")]
pub async fn get_snapshot_info(State(state): State<AppState>) -> Json<SnapshotInfo> {
    let info = state.store.current().info();
    tracing::Span::current().record("version", info.version);
    Json(info)
}

#[instrument(skip(state), fields(version), level = "info")]
pub async fn reload_snapshot(State(state): State<AppState>) -> Result<Json<SnapshotInfo>, ApiError> {
    let analysis = state.store.reload().map_err(api_error)?;
    tracing::Span::current().record("version", analysis.version());
    info!(
        path = %state.store.path().display(),
        version = analysis.version(),
        "Snapshot reloaded"
    );
    Ok(Json(analysis.info()))
}

#[instrument(skip(state, query), fields(device_count), level = "info")]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let options = state.view_options(query);
    let analysis = state.store.current();

    let devices = analysis
        .directory()
        .iter()
        .map(|device| analysis.device_summary(&device.mac_address, &options))
        .collect::<Result<Vec<_>, _>>()
        .map_err(api_error)?;

    tracing::Span::current().record("device_count", devices.len());
    Ok(Json(devices))
}

#[instrument(skip(state, query), level = "info")]
pub async fn get_device_details(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<DeviceSummary>, ApiError> {
    debug!(%device_id, "Looking up device details");
    let options = state.view_options(query);
    state
        .store
        .current()
        .device_summary(&device_id, &options)
        .map(Json)
        .map_err(api_error)
}

#[instrument(skip(state, query), fields(link_count), level = "info")]
pub async fn get_topology(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<TopologyResponse> {
    let options = state.view_options(query);
    let analysis = state.store.current();

    let links: Vec<TopologyLink> = analysis
        .topology()
        .links()
        .zip(analysis.links(&options))
        .map(|(link, summary)| TopologyLink {
            summary,
            tuples: link.tuples.clone(),
        })
        .collect();

    tracing::Span::current().record("link_count", links.len());
    Json(TopologyResponse {
        version: analysis.version(),
        vlan: options.vlan,
        links,
    })
}

#[instrument(skip(state), fields(vlan_count), level = "info")]
pub async fn list_vlans(State(state): State<AppState>) -> Json<Vec<Vlan>> {
    let analysis = state.store.current();
    let vlans: Vec<Vlan> = analysis.catalog().sorted().into_iter().cloned().collect();
    tracing::Span::current().record("vlan_count", vlans.len());
    Json(vlans)
}

#[instrument(skip(state), level = "info")]
pub async fn get_vlan_diffusion(
    Path(vlan_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DiffusionReport>, ApiError> {
    state
        .store
        .current()
        .diffusion(&vlan_id)
        .map(Json)
        .map_err(api_error)
}

#[instrument(skip(state, query), fields(incoherence_count), level = "info")]
pub async fn get_link_report(
    Path((from, to)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<LinkReport>, ApiError> {
    let options = state.view_options(query);
    let report = state
        .store
        .current()
        .link_report(&from, &to, &options)
        .map_err(api_error)?;
    tracing::Span::current().record("incoherence_count", report.incoherences.len());
    Ok(Json(report))
}

pub async fn get_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Start the web server with the given configuration and bind address/port
/// This function is used by both the CLI and tests
pub async fn web_server_command(
    app_config: &AppConfig,
    address: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting web server on {}:{}", address, port);

    let store = SnapshotStore::load(&app_config.snapshot_path)?;
    let state = AppState::new(store, app_config.clone());

    let app = create_router(state);

    let bind_addr = format!("{}:{}", address, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("API available at: http://{}/api", bind_addr);
    info!("Schema at: http://{}/api/openapi.json", bind_addr);
    info!("Press Ctrl+C to stop the server");

    axum::serve(listener, app).await?;

    Ok(())
}
