//! Web server for the quakeboard dashboard.
//!
//! Serves the dashboard page and everything it paints from:
//! - HTML fragments for the counters, table and details regions
//! - marker descriptors for the Leaflet map
//! - a single select endpoint shared by table rows and map markers
//! - SSE (Server-Sent Events) announcing refreshes and selections

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::client::{FeedType, UsgsClient};
use crate::dashboard::{Dashboard, LoadStatus, Notice, SharedDashboard, notice_channel};
use crate::models::Record;
use crate::scheduler::{DEFAULT_REFRESH_SECS, RefreshScheduler};
use crate::stats::Stats;
use crate::view::{DetailView, MarkerView, TABLE_ROW_CAP, TableView};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub feed_type: FeedType,
    pub refresh_interval: Duration,
    pub table_rows: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            feed_type: FeedType::default(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            table_rows: TABLE_ROW_CAP,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Store, views and load status
    dashboard: SharedDashboard,
    /// Channel for pushing change notices to SSE clients
    notices: broadcast::Sender<Notice>,
}

impl AppState {
    #[must_use]
    pub fn new(dashboard: SharedDashboard, notices: broadcast::Sender<Notice>) -> Self {
        Self { dashboard, notices }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/regions/stats", get(stats_region_handler))
        .route("/regions/table", get(table_region_handler))
        .route("/regions/details", get(details_region_handler))
        .route("/map/markers", get(markers_handler))
        .route("/select/{id}", post(select_handler))
        .route("/api/records", get(records_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server and the background refresh.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let client = UsgsClient::new(config.feed_type)?;
    let dashboard = Dashboard::shared(config.table_rows);
    let notices = notice_channel();

    let scheduler = Arc::new(RefreshScheduler::new(
        client,
        Arc::clone(&dashboard),
        notices.clone(),
        config.refresh_interval,
    ));
    tokio::spawn(scheduler.run());

    let app = create_router(AppState::new(dashboard, notices));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 quakeboard starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Fragment rendering
// ============================================================================

const EMPTY_MESSAGE: &str = "No earthquakes recorded";
const NO_SELECTION_MESSAGE: &str = "Select an earthquake on the map or in the table";

/// Escape HTML special characters.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Counters region.
fn render_stats(stats: &Stats) -> String {
    format!(
        r#"<div class="stat"><span class="stat-value" id="totalEarthquakes">{total}</span><span class="stat-label">Total</span></div>
<div class="stat stat-severe"><span class="stat-value" id="severeEarthquakes">{severe}</span><span class="stat-label">Magnitude 5+</span></div>
<div class="stat stat-moderate"><span class="stat-value" id="moderateEarthquakes">{moderate}</span><span class="stat-label">Magnitude 4-5</span></div>"#,
        total = stats.total,
        severe = stats.severe,
        moderate = stats.moderate,
    )
}

fn empty_state(class: &str, message: &str) -> String {
    format!(
        r#"<div class="empty-state {class}"><p>{}</p></div>"#,
        escape_html(message)
    )
}

/// Table region: rows, empty state or first-load error.
fn render_table(table: &TableView) -> String {
    let rows = match table {
        TableView::Rows(rows) => rows,
        TableView::Empty => return empty_state("", EMPTY_MESSAGE),
        TableView::Error(message) => return empty_state("error", message),
    };

    let mut html = String::from(
        r#"<div class="table-container"><table>
<thead><tr><th>Location</th><th>Magnitude</th><th>Depth</th><th>Time</th></tr></thead>
<tbody>
"#,
    );
    for row in rows {
        html.push_str(&format!(
            "<tr data-record-id=\"{id}\"><td>{place}</td><td><span class=\"magnitude-badge {badge}\">{mag}</span></td><td>{depth}</td><td>{time}</td></tr>\n",
            id = escape_html(&row.id),
            place = escape_html(&row.place),
            badge = row.badge.css_class(),
            mag = row.magnitude,
            depth = row.depth,
            time = row.time,
        ));
    }
    html.push_str("</tbody>\n</table></div>");
    html
}

fn detail_item(label: &str, value: &str, class: &str) -> String {
    format!(
        r#"<div class="detail-item"><div class="detail-label">{label}</div><div class="detail-value {class}">{}</div></div>"#,
        escape_html(value)
    )
}

/// Details region for the highlighted record.
fn render_details(detail: Option<&DetailView>) -> String {
    let Some(detail) = detail else {
        return empty_state("", NO_SELECTION_MESSAGE);
    };

    let mut html = String::new();
    html.push_str(&detail_item("Location", &detail.place, ""));
    html.push_str(&detail_item("Magnitude", &detail.magnitude, "large"));
    html.push_str(&detail_item("Depth", &detail.depth, ""));
    html.push_str(&detail_item("Coordinates", &detail.coordinates, ""));
    html.push_str(&detail_item("Time", &detail.time, ""));
    if let Some(url) = &detail.detail_url {
        html.push_str(&format!(
            r#"<div class="detail-item"><a href="{}" target="_blank" rel="noopener" class="btn btn-block">View on USGS</a></div>"#,
            escape_html(url)
        ));
    }
    html
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// SSE stream handler for change notices.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notices.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(Notice::Refreshed) => Some(Ok(Event::default().event("refresh").data("refresh"))),
        Ok(Notice::Highlighted(id)) => Some(Ok(Event::default().event("highlight").data(id))),
        // Lagged receivers just wait for the next notice.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn stats_region_handler(State(state): State<AppState>) -> Html<String> {
    let stats = state.dashboard.read().await.stats();
    Html(render_stats(&stats))
}

async fn table_region_handler(State(state): State<AppState>) -> Html<String> {
    let table = state.dashboard.read().await.table();
    Html(render_table(&table))
}

async fn details_region_handler(State(state): State<AppState>) -> Html<String> {
    let detail = state.dashboard.read().await.details();
    Html(render_details(detail.as_ref()))
}

#[derive(Debug, Serialize)]
struct MarkersPayload {
    highlighted: Option<String>,
    markers: Vec<MarkerView>,
}

/// Marker descriptors for the browser map, styles already applied.
async fn markers_handler(State(state): State<AppState>) -> Json<MarkersPayload> {
    let dashboard = state.dashboard.read().await;
    Json(MarkersPayload {
        highlighted: dashboard.highlighted().map(str::to_string),
        markers: dashboard.map().markers().to_vec(),
    })
}

/// Select a record from a table row or a map marker.
async fn select_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let detail = state.dashboard.write().await.select(&id);
    match detail {
        Some(detail) => {
            let _ = state.notices.send(Notice::Highlighted(id));
            Html(render_details(Some(&detail))).into_response()
        }
        None => (StatusCode::NOT_FOUND, format!("unknown record: {id}")).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct RecordsPayload {
    status: LoadStatus,
    stats: Stats,
    records: Vec<Record>,
}

/// Current snapshot as JSON.
async fn records_handler(State(state): State<AppState>) -> Json<RecordsPayload> {
    let dashboard = state.dashboard.read().await;
    Json(RecordsPayload {
        status: dashboard.status().clone(),
        stats: dashboard.stats(),
        records: dashboard.records().to_vec(),
    })
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>quakeboard · Earthquake Dashboard</title>

    <!-- Leaflet -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <style>
        :root {
            --font: -apple-system, BlinkMacSystemFont, 'Inter', sans-serif;
            --bg-primary: #09090b;
            --bg-elevated: #1c1c1f;
            --bg-tertiary: #18181b;
            --bg-hover: #27272a;
            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --text-tertiary: #71717a;
            --border: #27272a;
            --accent: #818cf8;
            --danger: #ef4444;
            --radius-sm: 6px;
            --radius-md: 10px;
            --radius-lg: 16px;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
        }

        .header {
            padding: 1rem 1.5rem;
            border-bottom: 1px solid var(--border);
            font-weight: 600;
            font-size: 1.125rem;
        }

        .main {
            max-width: 1400px;
            margin: 0 auto;
            padding: 1.5rem;
            display: grid;
            grid-template-columns: 1fr 320px;
            gap: 1.25rem;
        }

        .stats {
            grid-column: 1 / -1;
            display: grid;
            grid-template-columns: repeat(3, 1fr);
            gap: 1rem;
        }

        .stat, .panel {
            background: var(--bg-elevated);
            border: 1px solid var(--border);
            border-radius: var(--radius-lg);
            padding: 1rem 1.25rem;
        }

        .stat-value { display: block; font-size: 1.75rem; font-weight: 700; }
        .stat-label { font-size: 0.8125rem; color: var(--text-tertiary); }
        .stat-severe .stat-value { color: #FF6600; }
        .stat-moderate .stat-value { color: #FFFF00; }

        #map { height: 480px; border-radius: var(--radius-md); }

        .panel-title { font-size: 0.875rem; color: var(--text-secondary); margin-bottom: 0.75rem; }

        .table-panel { grid-column: 1 / -1; }

        table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
        th { text-align: left; color: var(--text-tertiary); font-weight: 500; padding: 0.5rem; }
        td { padding: 0.5rem; border-top: 1px solid var(--border); }
        tbody tr { cursor: pointer; }
        tbody tr:hover { background: var(--bg-hover); }

        .magnitude-badge {
            display: inline-block;
            min-width: 2.5rem;
            text-align: center;
            padding: 0.125rem 0.5rem;
            border-radius: var(--radius-sm);
            font-weight: 600;
            color: #09090b;
        }
        .magnitude-7 { background: #8B0000; color: #fafafa; }
        .magnitude-6 { background: #FF0000; color: #fafafa; }
        .magnitude-5 { background: #FF6600; }
        .magnitude-4 { background: #FFFF00; }
        .magnitude-low { background: #00FF00; }

        .detail-item { margin-bottom: 0.875rem; }
        .detail-label { font-size: 0.75rem; color: var(--text-tertiary); text-transform: uppercase; }
        .detail-value { font-weight: 500; }
        .detail-value.large { font-size: 1.75rem; font-weight: 700; }

        .btn {
            display: block;
            text-align: center;
            padding: 0.5rem 1rem;
            border-radius: var(--radius-md);
            background: var(--accent);
            color: white;
            text-decoration: none;
            font-size: 0.875rem;
        }

        .empty-state { padding: 2rem 1rem; text-align: center; color: var(--text-tertiary); }
        .empty-state.error { color: var(--danger); }

        .footer { padding: 1.5rem; text-align: center; font-size: 0.8125rem; color: var(--text-tertiary); }
        .footer a { color: var(--text-secondary); }

        @media (max-width: 900px) {
            .main { grid-template-columns: 1fr; }
        }
    </style>
</head>
<body>
    <header class="header">🌍 quakeboard</header>

    <main class="main">
        <section class="stats" id="stats">
            <div class="stat"><span class="stat-value">-</span><span class="stat-label">Loading</span></div>
        </section>

        <section class="panel">
            <div id="map"></div>
        </section>

        <aside class="panel">
            <h2 class="panel-title">Details</h2>
            <div id="detailsContent"></div>
        </aside>

        <section class="panel table-panel">
            <h2 class="panel-title">Recent earthquakes</h2>
            <div id="tableContent">
                <div class="empty-state"><p>Loading seismic data...</p></div>
            </div>
        </section>
    </main>

    <footer class="footer">
        Data from <a href="https://earthquake.usgs.gov/" target="_blank">USGS Earthquake Hazards Program</a>
    </footer>

    <script>
        const map = L.map('map').setView([20, 0], 3);
        L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
            attribution: '&copy; OpenStreetMap contributors',
            maxZoom: 19
        }).addTo(map);

        let markers = {};

        async function loadRegion(id, url) {
            const response = await fetch(url);
            if (response.ok) {
                document.getElementById(id).innerHTML = await response.text();
            }
        }

        function popupHtml(p) {
            const div = document.createElement('div');
            const strong = document.createElement('strong');
            strong.textContent = p.place;
            div.appendChild(strong);
            [`Magnitude: ${p.magnitude}`, `Depth: ${p.depth}`, p.time].forEach(line => {
                div.appendChild(document.createElement('br'));
                div.appendChild(document.createTextNode(line));
            });
            return div;
        }

        async function fetchMarkers() {
            const response = await fetch('/map/markers');
            return response.ok ? response.json() : null;
        }

        // Full rebuild, only after the store was replaced.
        async function syncMarkers() {
            const payload = await fetchMarkers();
            if (!payload) return;

            Object.values(markers).forEach(m => map.removeLayer(m));
            markers = {};

            payload.markers.forEach(m => {
                const marker = L.circleMarker([m.latitude, m.longitude], m.style).addTo(map);
                marker.bindPopup(popupHtml(m.popup));
                marker.on('click', () => selectRecord(m.id));
                markers[m.id] = marker;
            });
        }

        // Selection changes only styles; existing layers keep their popups.
        async function restyleMarkers() {
            const payload = await fetchMarkers();
            if (!payload) return;

            payload.markers.forEach(m => {
                const marker = markers[m.id];
                if (marker) marker.setStyle(m.style);
            });
        }

        async function selectRecord(id) {
            const response = await fetch(`/select/${encodeURIComponent(id)}`, { method: 'POST' });
            if (!response.ok) return;
            document.getElementById('detailsContent').innerHTML = await response.text();
        }

        function refreshAll() {
            loadRegion('stats', '/regions/stats');
            loadRegion('tableContent', '/regions/table');
            loadRegion('detailsContent', '/regions/details');
            syncMarkers();
        }

        document.getElementById('tableContent').addEventListener('click', e => {
            const row = e.target.closest('tr[data-record-id]');
            if (row) selectRecord(row.dataset.recordId);
        });

        const events = new EventSource('/stream');
        events.addEventListener('refresh', refreshAll);
        events.addEventListener('highlight', () => {
            loadRegion('detailsContent', '/regions/details');
            restyleMarkers();
        });

        refreshAll();
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::models::fixtures::record;
    use crate::view::RowView;

    fn loaded_state() -> AppState {
        let mut dashboard = Dashboard::new(TABLE_ROW_CAP);
        dashboard.apply_snapshot(
            1,
            vec![
                record("big", Some(7.2)),
                record("mid", Some(4.5)),
                record("small", Some(3.0)),
            ],
        );
        AppState::new(
            Arc::new(tokio::sync::RwLock::new(dashboard)),
            notice_channel(),
        )
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom's" & co</b>"#),
            "&lt;b&gt;&quot;Tom&#39;s&quot; &amp; co&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_stats() {
        let html = render_stats(&Stats {
            total: 3,
            severe: 1,
            moderate: 1,
        });
        assert!(html.contains(r#"id="totalEarthquakes">3<"#));
        assert!(html.contains(r#"id="severeEarthquakes">1<"#));
        assert!(html.contains(r#"id="moderateEarthquakes">1<"#));
    }

    #[test]
    fn test_render_table_states() {
        assert!(render_table(&TableView::Empty).contains(EMPTY_MESSAGE));

        let error = render_table(&TableView::Error("Failed to load".into()));
        assert!(error.contains("empty-state error"));
        assert!(!error.contains("<table>"));

        let rows = render_table(&TableView::Rows(vec![RowView::from_record(&record(
            "x<1>",
            Some(5.1),
        ))]));
        assert!(rows.contains(r#"data-record-id="x&lt;1&gt;""#));
        assert!(rows.contains(r#"class="magnitude-badge magnitude-5">5.1<"#));
    }

    #[test]
    fn test_render_details() {
        assert!(render_details(None).contains(NO_SELECTION_MESSAGE));

        let detail = DetailView::from_record(&record("big", Some(7.2)));
        let html = render_details(Some(&detail));
        assert!(html.contains("7.2"));
        assert!(html.contains("View on USGS"));
        assert!(html.contains("35.50°, -117.25°"));
    }

    #[tokio::test]
    async fn test_index_restyles_on_highlight_and_rebuilds_on_refresh() {
        let app = create_router(loaded_state());
        let html = body_text(app.oneshot(get("/")).await.unwrap()).await;

        let start = html.find("addEventListener('highlight'").unwrap();
        let end = html[start..].find("});").unwrap() + start;
        let highlight = &html[start..end];
        assert!(highlight.contains("restyleMarkers()"));
        assert!(!highlight.contains("syncMarkers()"));

        assert!(html.contains("addEventListener('refresh', refreshAll)"));
        assert!(html.contains("marker.setStyle(m.style)"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(loaded_state());
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_table_region_lists_rows_in_feed_order() {
        let app = create_router(loaded_state());
        let html = body_text(app.oneshot(get("/regions/table")).await.unwrap()).await;

        let big = html.find(r#"data-record-id="big""#).unwrap();
        let mid = html.find(r#"data-record-id="mid""#).unwrap();
        let small = html.find(r#"data-record-id="small""#).unwrap();
        assert!(big < mid && mid < small);
    }

    #[tokio::test]
    async fn test_pending_dashboard_regions() {
        let state = AppState::new(Dashboard::shared(TABLE_ROW_CAP), notice_channel());
        let app = create_router(state);

        let table = body_text(app.clone().oneshot(get("/regions/table")).await.unwrap()).await;
        assert!(table.contains(EMPTY_MESSAGE));

        let stats = body_text(app.oneshot(get("/regions/stats")).await.unwrap()).await;
        assert!(stats.contains(r#"id="totalEarthquakes">0<"#));
    }

    #[tokio::test]
    async fn test_select_known_record() {
        let state = loaded_state();
        let mut rx = state.notices.subscribe();
        let app = create_router(state.clone());

        let response = app.clone().oneshot(post("/select/mid")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("4.5"));
        assert_eq!(rx.try_recv().unwrap(), Notice::Highlighted("mid".into()));

        let markers = body_text(app.oneshot(get("/map/markers")).await.unwrap()).await;
        let payload: serde_json::Value = serde_json::from_str(&markers).unwrap();
        assert_eq!(payload["highlighted"], "mid");
        let mid = payload["markers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["id"] == "mid")
            .unwrap();
        assert_eq!(mid["style"]["color"], "#0000FF");
        assert_eq!(mid["style"]["weight"], 3.0);
    }

    #[tokio::test]
    async fn test_select_unknown_record_is_404_and_noop() {
        let state = loaded_state();
        state.dashboard.write().await.select("big");
        let app = create_router(state.clone());

        let response = app.oneshot(post("/select/ghost")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.dashboard.read().await.highlighted(), Some("big"));
    }

    #[tokio::test]
    async fn test_markers_scenario() {
        let app = create_router(loaded_state());
        let body = body_text(app.oneshot(get("/map/markers")).await.unwrap()).await;
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();

        let markers = payload["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0]["id"], "big");
        assert_eq!(markers[0]["style"]["fillColor"], "#8B0000");
        let radius = markers[0]["style"]["radius"].as_f64().unwrap();
        assert!((radius - 21.6).abs() < 1e-9);
        assert!(payload["highlighted"].is_null());
    }

    #[tokio::test]
    async fn test_records_api() {
        let app = create_router(loaded_state());
        let body = body_text(app.oneshot(get("/api/records")).await.unwrap()).await;
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(payload["status"]["state"], "loaded");
        assert_eq!(payload["stats"]["total"], 3);
        assert_eq!(payload["stats"]["severe"], 1);
        assert_eq!(payload["records"][0]["id"], "big");
    }
}
