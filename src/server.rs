use crate::classify::color_for;
use crate::config::{AppConfig, MapConfig};
use crate::interaction::{HoverState, InteractionError, InteractionLayer, StyleUpdate};
use crate::legend::{legend_rows, LegendRow};
use crate::region_layer::RegionLayer;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct AppState {
    pub layer: RegionLayer,
    pub interaction: Mutex<InteractionLayer>,
    pub map: MapConfig,
}

impl AppState {
    pub fn new(layer: RegionLayer, map: MapConfig) -> Self {
        let interaction = Mutex::new(layer.interaction());
        Self {
            layer,
            interaction,
            map,
        }
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    name: String,
    count: Option<u32>,
    color: &'static str,
}

#[derive(Deserialize)]
pub struct PointerEvent {
    name: String,
    #[serde(default = "default_bring_to_front")]
    bring_to_front_supported: bool,
}

fn default_bring_to_front() -> bool {
    true
}

#[derive(Serialize)]
pub struct InfoResponse {
    text: String,
    hover: HoverState,
}

#[derive(Serialize)]
pub struct MapSettings {
    center: [f64; 2],
    zoom: u8,
    max_zoom: u8,
    tile_url: String,
    attribution: String,
    tile_size: u32,
    zoom_offset: i8,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/regions", get(regions_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/info", get(info_handler))
        .route("/api/query", get(query_handler))
        .route("/api/map", get(map_handler))
        .route("/api/pointer/enter", post(enter_handler))
        .route("/api/pointer/leave", post(leave_handler))
        .with_state(state)
}

pub async fn start_server(config: AppConfig, layer: RegionLayer) -> Result<()> {
    let state = Arc::new(AppState::new(layer, config.map.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state)
        .nest_service("/tiles", ServeDir::new(&config.output.tile_dir))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.layer.to_geojson() {
        Ok(collection) => Json(collection).into_response(),
        Err(err) => {
            error!("Failed to build region GeoJSON: {:?}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn legend_handler() -> Json<Vec<LegendRow>> {
    Json(legend_rows())
}

async fn map_handler(State(state): State<Arc<AppState>>) -> Json<MapSettings> {
    Json(MapSettings {
        center: state.map.center,
        zoom: state.map.zoom,
        max_zoom: state.map.max_zoom,
        tile_url: state.map.resolved_tile_url(),
        attribution: state.map.attribution.clone(),
        tile_size: state.map.tile_size,
        zoom_offset: state.map.zoom_offset,
    })
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.interaction.lock() {
        Ok(interaction) => Json(InfoResponse {
            text: interaction.panel().text().to_string(),
            hover: interaction.state().clone(),
        })
        .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(state.layer.locate(params.lon, params.lat).map(|region| {
        let count = state.layer.count(&region.name);
        QueryResponse {
            name: region.name.clone(),
            count,
            color: color_for(count),
        }
    }))
}

async fn enter_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> Response {
    transition(&state, |interaction| {
        interaction.pointer_enter(&event.name, event.bring_to_front_supported)
    })
}

async fn leave_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> Response {
    transition(&state, |interaction| interaction.pointer_leave(&event.name))
}

fn transition<F>(state: &AppState, apply: F) -> Response
where
    F: FnOnce(&mut InteractionLayer) -> Result<StyleUpdate, InteractionError>,
{
    let mut interaction = match state.interaction.lock() {
        Ok(guard) => guard,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    match apply(&mut interaction) {
        Ok(update) => Json(update).into_response(),
        Err(err @ InteractionError::UnknownRegion(_)) => {
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::CONFLICT, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region_layer::tests::sample_layer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(sample_layer(), MapConfig::default()))
    }

    fn event(name: &str) -> Json<PointerEvent> {
        Json(PointerEvent {
            name: name.to_string(),
            bring_to_front_supported: true,
        })
    }

    #[tokio::test]
    async fn query_finds_region_and_color() {
        let Json(found) = query_handler(
            State(state()),
            Query(QueryParams { lat: 0.0, lon: -10.0 }),
        )
        .await;
        let found = found.unwrap();
        assert_eq!(found.name, "Westland");
        assert_eq!(found.count, Some(75));
        assert_eq!(found.color, "#6baed6");
    }

    #[tokio::test]
    async fn query_outside_regions_is_empty() {
        let Json(found) = query_handler(
            State(state()),
            Query(QueryParams { lat: 60.0, lon: 100.0 }),
        )
        .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn pointer_events_drive_the_info_panel() {
        let state = state();

        let response = enter_handler(State(state.clone()), event("Westland")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.interaction.lock().unwrap().panel().text(),
            "Westland: 75 airports"
        );

        let response = enter_handler(State(state.clone()), event("Eastland")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = leave_handler(State(state.clone()), event("Westland")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.interaction.lock().unwrap().state(),
            &HoverState::Idle
        );
    }

    #[tokio::test]
    async fn unknown_region_is_not_found() {
        let response = enter_handler(State(state()), event("Atlantis")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn legend_has_eight_rows() {
        let Json(rows) = legend_handler().await;
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[7].label, "1000+");
    }

    #[tokio::test]
    async fn map_settings_use_defaults() {
        let Json(settings) = map_handler(State(state())).await;
        assert_eq!(settings.center, [45.0, 0.0]);
        assert_eq!(settings.zoom, 2);
    }

    #[tokio::test]
    async fn map_settings_carry_tile_geometry() {
        let map = MapConfig {
            tile_size: 512,
            zoom_offset: -1,
            ..MapConfig::default()
        };
        let state = Arc::new(AppState::new(sample_layer(), map));
        let Json(settings) = map_handler(State(state)).await;
        assert_eq!(settings.tile_size, 512);
        assert_eq!(settings.zoom_offset, -1);
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_event(uri: &str, name: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "name": name }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn info_route_follows_pointer_events() {
        let app = router(state());

        let (status, info) = call(&app, get_request("/api/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["text"], crate::interaction::DEFAULT_PROMPT);
        assert_eq!(info["hover"]["state"], "idle");

        let (status, update) = call(&app, post_event("/api/pointer/enter", "Westland")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(update["style"]["weight"], 5);
        assert_eq!(update["bring_to_front"], true);

        let (_, info) = call(&app, get_request("/api/info")).await;
        assert_eq!(info["text"], "Westland: 75 airports");
        assert_eq!(info["hover"]["state"], "hovering");
        assert_eq!(info["hover"]["region"], "Westland");
    }

    #[tokio::test]
    async fn moving_between_regions_leaves_before_entering() {
        let app = router(state());

        call(&app, post_event("/api/pointer/enter", "Westland")).await;

        // Out of order: the next enter arrives before the leave and is refused.
        let (status, _) = call(&app, post_event("/api/pointer/enter", "Eastland")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, update) = call(&app, post_event("/api/pointer/leave", "Westland")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(update["style"]["weight"], 2);
        assert_eq!(update["style"]["dashArray"], "3");

        let (status, _) = call(&app, post_event("/api/pointer/enter", "Eastland")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, info) = call(&app, get_request("/api/info")).await;
        assert_eq!(info["text"], "Eastland: 0 airports");
    }

    #[tokio::test]
    async fn regions_route_serves_styled_collection() {
        let app = router(state());

        let (status, collection) = call(&app, get_request("/api/regions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collection["type"], "FeatureCollection");

        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["style"]["fillColor"], "#6baed6");
        assert_eq!(features[1]["properties"]["style"]["fillColor"], "#deebf7");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = router(state());
        let (status, _) = call(&app, get_request("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
