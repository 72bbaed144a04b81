//! REST API for the placement service.
//!
//! Accepts a container and an item list in the caller's units, runs the chosen
//! strategy (or the remote fitting service when asked) and answers in the same
//! units. Uses Axum as the web framework and supports CORS.

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{AppConfig, PackerConfig};
use crate::model::{Item, PlacedItem, ValidationError};
use crate::packer::{PackEvent, Strategy};
use crate::presets;
use crate::remote::RemoteFitter;
use crate::session::{ItemInput, LoadingStats, PackingResult, PackingSession, round_to};
use crate::types::EPSILON;
use crate::units::{LengthUnit, UnitSystem, WeightUnit};

#[derive(Clone)]
struct ApiState {
    packer: PackerConfig,
    remote: Option<RemoteFitter>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>freight-fit API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// The container, either from the preset catalog or given explicitly.
#[derive(Deserialize, Clone, Debug, ToSchema)]
#[serde(untagged)]
pub enum ContainerRequest {
    Preset { preset: String },
    Dimensions { length: f64, width: f64, height: f64 },
}

fn default_quantity() -> u32 {
    1
}

/// One item line of a request; `quantity` expands into numbered items.
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct ItemRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub non_stackable: bool,
    #[serde(default)]
    pub non_rotatable: bool,
}

impl From<ItemRequest> for ItemInput {
    fn from(req: ItemRequest) -> Self {
        ItemInput {
            id: req.id,
            name: req.name,
            length: req.length,
            width: req.width,
            height: req.height,
            weight: req.weight,
            quantity: req.quantity,
            non_stackable: req.non_stackable,
            non_rotatable: req.non_rotatable,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[schema(
    example = json!({
        "units": { "length": "in", "weight": "lb" },
        "container": { "preset": "20ft-dv" },
        "items": [
            { "name": "Pallet", "length": 48.0, "width": 40.0, "height": 56.0, "weight": 900.0, "quantity": 10 },
            { "id": "glass", "length": 40.0, "width": 30.0, "height": 30.0, "non_stackable": true }
        ],
        "strategy": "greedy_adjacency"
    })
)]
pub struct PackRequest {
    #[serde(default)]
    pub units: UnitSystem,
    pub container: ContainerRequest,
    #[serde(default)]
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub use_remote: bool,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    session: PackingSession,
    use_remote: bool,
}

impl PackRequest {
    fn into_validated(self, packer: &PackerConfig) -> Result<ValidatedPackRequest, ValidationError> {
        let session = match self.container {
            ContainerRequest::Preset { preset } => PackingSession::from_preset(self.units, &preset)?,
            ContainerRequest::Dimensions {
                length,
                width,
                height,
            } => PackingSession::new(self.units, length, width, height),
        };
        let mut session = session
            .with_strategy(self.strategy.unwrap_or(packer.default_strategy()))
            .with_config(packer.packing_config());

        for item in self.items {
            session.add_items(item.into())?;
        }

        Ok(ValidatedPackRequest {
            session,
            use_remote: self.use_remote,
        })
    }
}

/// Where the placements came from.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlacementSource {
    Local,
    Remote,
}

#[derive(Serialize, ToSchema)]
pub struct ContainerDimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Single item in the response, in the request's units.
///
/// Unfitted items are reported at the origin with their given dimensions.
#[derive(Serialize, ToSchema)]
pub struct PackedItem {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub fitted: bool,
    pub rotated: bool,
    pub non_stackable: bool,
    pub non_rotatable: bool,
}

#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub strategy: Strategy,
    pub source: PlacementSource,
    pub units: UnitSystem,
    pub container: ContainerDimensions,
    pub items: Vec<PackedItem>,
    /// Weights in the request's weight unit, volume in cubic metres
    pub stats: LoadingStats,
}

impl PackResponse {
    fn from_result(session: &PackingSession, result: &PackingResult, source: PlacementSource) -> Self {
        let units = session.units();
        let length = |value: f64| units.length_from_canonical(value);
        let weight = |value: f64| units.weight_from_canonical(value);
        let given: HashMap<&str, (&Item, &str)> = session
            .named_items()
            .map(|(item, name)| (item.id.as_str(), (item, name)))
            .collect();

        let items = result
            .placements
            .iter()
            .map(|placed| {
                let (name, rotated) = match given.get(placed.id()) {
                    Some((item, name)) => (
                        name.to_string(),
                        placed.fitted && (item.length - placed.item.length).abs() > EPSILON,
                    ),
                    None => (placed.id().to_string(), false),
                };
                PackedItem {
                    id: placed.item.id.clone(),
                    name,
                    x: length(placed.x),
                    y: length(placed.y),
                    z: length(placed.z),
                    length: length(placed.item.length),
                    width: length(placed.item.width),
                    height: length(placed.item.height),
                    weight: weight(placed.item.weight),
                    fitted: placed.fitted,
                    rotated,
                    non_stackable: placed.item.non_stackable,
                    non_rotatable: placed.item.non_rotatable,
                }
            })
            .collect();

        // Converted from unrounded sums, rounded last.
        let total_weight: f64 = result.placements.iter().map(|p| p.item.weight).sum();
        let fitted_weight: f64 = result.fitted().map(|p| p.item.weight).sum();

        let container = session.container();
        Self {
            strategy: result.strategy,
            source,
            units,
            container: ContainerDimensions {
                length: length(container.length),
                width: length(container.width),
                height: length(container.height),
            },
            items,
            stats: LoadingStats {
                total_weight: round_to(weight(total_weight), 2),
                fitted_weight: round_to(weight(fitted_weight), 2),
                ..result.stats.clone()
            },
        }
    }
}

/// Catalog entry as served by `GET /presets`.
#[derive(Serialize, ToSchema)]
pub struct PresetResponse {
    pub key: String,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub unit: LengthUnit,
}

impl From<&presets::ContainerPreset> for PresetResponse {
    fn from(preset: &presets::ContainerPreset) -> Self {
        Self {
            key: preset.key.to_string(),
            name: preset.name.to_string(),
            length: preset.length,
            width: preset.width,
            height: preset.height,
            unit: preset.unit,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    packer: &PackerConfig,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(packer) {
        Ok(validated) => Ok(validated),
        Err(err @ ValidationError::UnknownPreset(_)) => Err(container_config_error(err.to_string())),
        Err(err) => Err(validation_error(err.to_string())),
    }
}

/// Reports an engine event in the request's units.
fn event_in_units(event: &PackEvent, units: UnitSystem) -> PackEvent {
    match event {
        PackEvent::ItemPlaced {
            id,
            x,
            y,
            z,
            length,
            width,
            height,
            rotated,
        } => PackEvent::ItemPlaced {
            id: id.clone(),
            x: units.length_from_canonical(*x),
            y: units.length_from_canonical(*y),
            z: units.length_from_canonical(*z),
            length: units.length_from_canonical(*length),
            width: units.length_from_canonical(*width),
            height: units.length_from_canonical(*height),
            rotated: *rotated,
        },
        other => other.clone(),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_presets),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            ItemRequest,
            PackResponse,
            PackedItem,
            ContainerDimensions,
            PlacementSource,
            PresetResponse,
            LoadingStats,
            ErrorResponse,
            UnitSystem,
            LengthUnit,
            WeightUnit,
            Strategy
        )
    ),
    tags((name = "packing", description = "Endpoints for cargo placement"))
)]
struct ApiDoc;

/// Builds the application router.
///
/// `remote` is the fitting service used for requests with `use_remote`.
pub fn router(packer: PackerConfig, remote: Option<RemoteFitter>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { packer, remote };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/presets", get(handle_presets))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: AppConfig) -> std::io::Result<()> {
    let remote = match config.remote.url() {
        Some(url) => match RemoteFitter::new(url, config.remote.timeout()) {
            Ok(fitter) => Some(
                fitter.with_support_ratio(config.packer.packing_config().adjacency_support_ratio),
            ),
            Err(err) => {
                warn!("Remote fitting disabled, client could not be created: {err}");
                None
            }
        },
        None => None,
    };

    let app = router(config.packer.clone(), remote);
    let addr = config.api.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.api.display_host(),
        config.api.port()
    );
    if config.api.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.api.port());
    }
    info!("Endpoints: POST /pack, POST /pack_stream, GET /presets, GET /docs");
    if let Some(url) = config.remote.url() {
        info!("Remote fitting service: {url}");
    }

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Places the items into the container and returns every item with its
/// position, plus loading statistics.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Placement computed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let ValidatedPackRequest {
        mut session,
        use_remote,
    } = match parse_pack_request(payload, &state.packer) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        items = session.item_count(),
        strategy = %session.strategy(),
        use_remote,
        "New pack request"
    );

    let remote_placements = match (use_remote, state.remote.as_ref()) {
        (true, Some(remote)) => {
            let items: Vec<Item> = session.items().cloned().collect();
            match remote.fit(session.container(), &items).await {
                Ok(placements) => Some(placements),
                Err(err) => {
                    warn!(endpoint = remote.endpoint(), "Remote fitting failed, packing locally: {err}");
                    None
                }
            }
        }
        (true, None) => {
            warn!("Remote fitting requested but no service is configured, packing locally");
            None
        }
        (false, _) => None,
    };

    let (result, source) = match remote_placements {
        Some(placements) => (session.adopt(placements).clone(), PlacementSource::Remote),
        None => (session.repack().clone(), PlacementSource::Local),
    };
    if !result.is_complete() {
        let left_out: Vec<&str> = result.unfitted().map(PlacedItem::id).collect();
        info!(?left_out, "Some items did not fit");
    }

    let response = PackResponse::from_result(&session, &result, source);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams placement events as Server-Sent Events while the local engine runs,
/// followed by a `result` event carrying the complete response.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let ValidatedPackRequest {
        mut session,
        use_remote,
    } = match parse_pack_request(payload, &state.packer) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if use_remote {
        warn!("Streaming requests are always packed locally");
    }

    let (tx, rx) = mpsc::channel::<Event>(32);

    tokio::task::spawn_blocking(move || {
        let units = session.units();
        let result = session
            .repack_with_progress(&mut |evt: &PackEvent| {
                if let Ok(json) = serde_json::to_string(&event_in_units(evt, units)) {
                    // A closed receiver only drops the remaining events.
                    let _ = tx.blocking_send(Event::default().data(json));
                }
            })
            .clone();

        let response = PackResponse::from_result(&session, &result, PlacementSource::Local);
        if let Ok(json) = serde_json::to_string(&response) {
            let _ = tx.blocking_send(Event::default().event("result").data(json));
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, std::convert::Infallible>);
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /presets: the container catalog in its native unit.
#[utoipa::path(
    get,
    path = "/presets",
    responses((status = 200, description = "Container catalog", body = [PresetResponse])),
    tag = "packing"
)]
async fn handle_presets() -> impl IntoResponse {
    let catalog: Vec<PresetResponse> = presets::all().iter().map(PresetResponse::from).collect();
    Json(catalog)
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::Value;

    async fn spawn_app(packer: PackerConfig, remote: Option<RemoteFitter>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(packer, remote)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_json(url: String, body: Value) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/pack", "/pack_stream", "/presets"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PackRequest", "PackResponse", "ErrorResponse", "LoadingStats"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn pack_request_accepts_preset_or_dimensions() {
        let json = r#"{ "container": { "preset": "sprinter" }, "items": [] }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(matches!(request.container, ContainerRequest::Preset { ref preset } if preset == "sprinter"));
        assert_eq!(request.units, UnitSystem::CANONICAL);
        assert_eq!(request.strategy, None);
        assert!(!request.use_remote);

        let json = r#"{
            "units": { "length": "mm" },
            "container": { "length": 1000, "width": 800, "height": 600 },
            "items": [{ "length": 100, "width": 100, "height": 100 }],
            "strategy": "grid_floor_pass"
        }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(matches!(request.container, ContainerRequest::Dimensions { length, .. } if length == 1000.0));
        assert_eq!(request.items[0].quantity, 1);
        assert_eq!(request.items[0].weight, 0.0);
        assert_eq!(request.strategy, Some(Strategy::GridFloorPass));
    }

    #[test]
    fn validated_request_uses_configured_default_strategy() {
        let packer = PackerConfig::default().with_default_strategy(Strategy::GridFloorPass);
        let request: PackRequest = serde_json::from_str(
            r#"{ "container": { "length": 10, "width": 10, "height": 10 },
                 "items": [{ "name": "Box", "length": 1, "width": 1, "height": 1, "quantity": 2 }] }"#,
        )
        .unwrap();

        let validated = request.into_validated(&packer).expect("Should validate successfully");
        assert_eq!(validated.session.strategy(), Strategy::GridFloorPass);
        assert_eq!(validated.session.item_count(), 2);
    }

    #[test]
    fn placed_events_are_converted_to_request_units() {
        let units = UnitSystem::new(LengthUnit::M, WeightUnit::Kg);
        let event = PackEvent::ItemPlaced {
            id: "a".into(),
            x: 150.0,
            y: 0.0,
            z: 0.0,
            length: 100.0,
            width: 50.0,
            height: 25.0,
            rotated: false,
        };
        match event_in_units(&event, units) {
            PackEvent::ItemPlaced { x, length, height, .. } => {
                assert!((x - 1.5).abs() < 1e-9);
                assert!((length - 1.0).abs() < 1e-9);
                assert!((height - 0.25).abs() < 1e-9);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn pack_answers_in_request_units() {
        let base = spawn_app(PackerConfig::default(), None).await;
        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "units": { "length": "in", "weight": "lb" },
                "container": { "length": 100.0, "width": 50.0, "height": 50.0 },
                "items": [
                    { "id": "crate", "name": "Crate", "length": 40.0, "width": 20.0, "height": 10.0, "weight": 100.0 },
                    { "id": "huge", "length": 200.0, "width": 20.0, "height": 10.0, "weight": 1.0 }
                ],
                "strategy": "greedy_adjacency"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["strategy"], "greedy_adjacency");
        assert_eq!(body["source"], "local");
        assert_eq!(body["units"]["length"], "in");
        assert!((body["container"]["length"].as_f64().unwrap() - 100.0).abs() < 1e-9);

        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "crate");
        assert_eq!(items[0]["name"], "Crate");
        assert_eq!(items[0]["fitted"], true);
        assert!((items[0]["length"].as_f64().unwrap() - 40.0).abs() < 1e-9);
        assert!((items[0]["weight"].as_f64().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(items[1]["fitted"], false);

        assert_eq!(body["stats"]["fitted"], 1);
        assert_eq!(body["stats"]["unfitted"], 1);
        assert_eq!(body["stats"]["total_weight"], 101.0);
    }

    #[tokio::test]
    async fn pack_rejects_invalid_requests() {
        let base = spawn_app(PackerConfig::default(), None).await;

        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 10.0, "width": 10.0, "height": 10.0 },
                "items": [
                    { "id": "a", "length": 1.0, "width": 1.0, "height": 1.0 },
                    { "id": "a", "length": 1.0, "width": 1.0, "height": 1.0 }
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid input data");

        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({ "container": { "preset": "70ft-mega" }, "items": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid container configuration");

        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({ "container": { "length": 10.0 }, "items": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid JSON data");

        let (status, _) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 10.0, "width": 10.0, "height": 10.0 },
                "items": [{ "length": 1.0, "width": 1.0, "height": 1.0, "quantity": 0 }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn degenerate_geometry_is_reported_unfitted() {
        let base = spawn_app(PackerConfig::default(), None).await;
        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 0.0, "width": 10.0, "height": 10.0 },
                "items": [{ "length": 1.0, "width": 1.0, "height": 1.0 }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["fitted"], 0);
        assert_eq!(body["stats"]["efficiency"], 0);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local_engine() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);
        let remote = RemoteFitter::new(format!("http://{dead}/fit"), Duration::from_secs(2)).unwrap();

        let base = spawn_app(PackerConfig::default(), Some(remote)).await;
        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 100.0, "width": 100.0, "height": 100.0 },
                "items": [{ "id": "a", "length": 10.0, "width": 10.0, "height": 10.0 }],
                "use_remote": true
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "local");
        assert_eq!(body["items"][0]["fitted"], true);
    }

    #[tokio::test]
    async fn remote_placements_are_used_when_available() {
        let fit_service = Router::new().route(
            "/fit",
            post(|| async { Json(json!([{ "id": "a", "fitted": true, "x": 5.0, "y": 0.0, "z": 0.0 }])) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, fit_service).await.unwrap();
        });
        let remote = RemoteFitter::new(format!("http://{addr}/fit"), Duration::from_secs(5)).unwrap();

        let base = spawn_app(PackerConfig::default(), Some(remote)).await;
        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 100.0, "width": 100.0, "height": 100.0 },
                "items": [{ "id": "a", "length": 10.0, "width": 10.0, "height": 10.0 }],
                "use_remote": true
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "remote");
        assert_eq!(body["items"][0]["x"], 5.0);
        assert_eq!(body["stats"]["fitted"], 1);
    }

    #[tokio::test]
    async fn rule_breaking_remote_answers_fall_back_to_local_engine() {
        let fit_service = Router::new().route(
            "/fit",
            post(|| async {
                Json(json!([
                    { "id": "a", "fitted": true, "x": 0.0, "y": 0.0, "z": 0.0 },
                    { "id": "b", "fitted": true, "x": 5.0, "y": 5.0, "z": 0.0 }
                ]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, fit_service).await.unwrap();
        });
        let remote = RemoteFitter::new(format!("http://{addr}/fit"), Duration::from_secs(5)).unwrap();

        let base = spawn_app(PackerConfig::default(), Some(remote)).await;
        let (status, body) = post_json(
            format!("{base}/pack"),
            json!({
                "container": { "length": 100.0, "width": 100.0, "height": 100.0 },
                "items": [
                    { "id": "a", "length": 10.0, "width": 10.0, "height": 10.0 },
                    { "id": "b", "length": 10.0, "width": 10.0, "height": 10.0 }
                ],
                "use_remote": true
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "local");
        assert_eq!(body["stats"]["fitted"], 2);
        assert_eq!(body["items"][1]["x"], 10.0);
    }

    #[tokio::test]
    async fn presets_endpoint_lists_catalog() {
        let base = spawn_app(PackerConfig::default(), None).await;
        let body: Value = reqwest::get(format!("{base}/presets"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), presets::all().len());
        assert!(entries.iter().any(|p| p["key"] == "40ft-hc" && p["unit"] == "in"));
    }

    #[tokio::test]
    async fn pack_stream_emits_events_then_result() {
        let base = spawn_app(PackerConfig::default(), None).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/pack_stream"))
            .json(&json!({
                "container": { "length": 50.0, "width": 50.0, "height": 50.0 },
                "items": [
                    { "id": "a", "length": 30.0, "width": 30.0, "height": 30.0 },
                    { "id": "b", "length": 30.0, "width": 30.0, "height": 30.0 }
                ]
            }))
            .send()
            .await
            .unwrap();

        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let body = response.text().await.unwrap();
        assert!(body.contains("\"type\":\"ItemPlaced\""));
        assert!(body.contains("\"type\":\"ItemRejected\""));
        assert!(body.contains("\"type\":\"Finished\""));
        assert!(body.contains("event: result"));
    }
}
