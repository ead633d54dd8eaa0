//! View models for the map and the table, and the highlight relationship
//! between them.
//!
//! The renderer never copies record data into its own state. It keeps the
//! ids of the markers it placed and the id of the highlighted record; every
//! descriptor it hands out is derived from the store at call time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{self, BadgeCategory, Color};
use crate::models::Record;
use crate::store::RecordStore;

/// Maximum number of rows the table shows.
pub const TABLE_ROW_CAP: usize = 20;

/// Outline color of the highlighted marker.
pub const HIGHLIGHT_COLOR: Color = Color("#0000FF");

const DEFAULT_WEIGHT: f64 = 1.0;
const HIGHLIGHT_WEIGHT: f64 = 3.0;
const MARKER_OPACITY: f64 = 0.8;
const MARKER_FILL_OPACITY: f64 = 0.7;

/// Circle marker styling. Field names serialize to Leaflet's option names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: Color,
    pub color: Color,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl MarkerStyle {
    /// Default style for a record of the given magnitude.
    #[must_use]
    pub fn for_magnitude(magnitude: Option<f64>) -> Self {
        let color = classify::color_for(magnitude);
        Self {
            radius: classify::radius_for(magnitude),
            fill_color: color,
            color,
            weight: DEFAULT_WEIGHT,
            opacity: MARKER_OPACITY,
            fill_opacity: MARKER_FILL_OPACITY,
        }
    }

    /// Same marker with the selection outline applied.
    #[must_use]
    pub fn emphasized(self) -> Self {
        Self {
            color: HIGHLIGHT_COLOR,
            weight: HIGHLIGHT_WEIGHT,
            ..self
        }
    }
}

/// Short summary shown when a marker is opened on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPopup {
    pub place: String,
    pub magnitude: String,
    pub depth: String,
    pub time: String,
}

/// One map marker. `id` is the click binding: clicking selects that record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub style: MarkerStyle,
    pub popup: MarkerPopup,
}

impl MarkerView {
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            style: MarkerStyle::for_magnitude(record.magnitude),
            popup: MarkerPopup {
                place: record.place.clone(),
                magnitude: magnitude_label(record.magnitude),
                depth: depth_label(record.depth_km),
                time: time_label(record.occurred_at),
            },
        }
    }
}

/// One table row. `id` is the click binding, same as for markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: String,
    pub place: String,
    pub magnitude: String,
    pub badge: BadgeCategory,
    pub depth: String,
    pub time: String,
}

impl RowView {
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            place: record.place.clone(),
            magnitude: magnitude_label(record.magnitude),
            badge: classify::badge_category_for(record.magnitude),
            depth: depth_label(record.depth_km),
            time: time_label(record.occurred_at),
        }
    }
}

/// What the table region should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "content", rename_all = "lowercase")]
pub enum TableView {
    Rows(Vec<RowView>),
    Empty,
    Error(String),
}

/// Contents of the details panel for the highlighted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub id: String,
    pub place: String,
    pub magnitude: String,
    pub depth: String,
    pub coordinates: String,
    pub time: String,
    pub detail_url: Option<String>,
}

impl DetailView {
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            place: record.place.clone(),
            magnitude: magnitude_label(record.magnitude),
            depth: depth_label(record.depth_km),
            coordinates: format!("{:.2}°, {:.2}°", record.latitude, record.longitude),
            time: time_label(record.occurred_at),
            detail_url: record.detail_url.clone(),
        }
    }
}

#[must_use]
pub fn magnitude_label(magnitude: Option<f64>) -> String {
    classify::usable(magnitude).map_or_else(|| "?".into(), |m| format!("{m:.1}"))
}

#[must_use]
pub fn depth_label(depth_km: Option<f64>) -> String {
    depth_km.map_or_else(|| "unknown".into(), |d| format!("{d:.1} km"))
}

#[must_use]
pub fn time_label(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Map widget operations the renderer drives.
///
/// Implementations only place and style; panning, zooming and tiles are the
/// widget's own business.
pub trait MapWidget {
    fn add_marker(&mut self, marker: MarkerView);
    fn remove_marker(&mut self, id: &str);
    fn restyle_marker(&mut self, id: &str, style: MarkerStyle);
}

/// Ordered marker registry, published to the browser map as JSON.
///
/// `index` maps each id to its position in `markers`.
#[derive(Debug, Default, Clone)]
pub struct MarkerLayer {
    markers: Vec<MarkerView>,
    index: HashMap<String, usize>,
}

impl MarkerLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers in placement order.
    #[must_use]
    pub fn markers(&self) -> &[MarkerView] {
        &self.markers
    }
}

impl MapWidget for MarkerLayer {
    fn add_marker(&mut self, marker: MarkerView) {
        if let Some(&at) = self.index.get(&marker.id) {
            self.markers[at] = marker;
            return;
        }
        self.index.insert(marker.id.clone(), self.markers.len());
        self.markers.push(marker);
    }

    fn remove_marker(&mut self, id: &str) {
        let Some(at) = self.index.remove(id) else {
            return;
        };
        self.markers.remove(at);
        // Removing the last marker leaves every other position intact.
        if at < self.markers.len() {
            for (pos, marker) in self.markers.iter().enumerate().skip(at) {
                self.index.insert(marker.id.clone(), pos);
            }
        }
    }

    fn restyle_marker(&mut self, id: &str, style: MarkerStyle) {
        if let Some(&at) = self.index.get(id) {
            self.markers[at].style = style;
        }
    }
}

/// Projects the record store onto a table and a map widget.
#[derive(Debug)]
pub struct ViewRenderer<M> {
    map: M,
    placed: Vec<String>,
    highlight: Option<String>,
    row_cap: usize,
}

impl<M: MapWidget> ViewRenderer<M> {
    #[must_use]
    pub fn with_row_cap(map: M, row_cap: usize) -> Self {
        Self {
            map,
            placed: Vec::new(),
            highlight: None,
            row_cap,
        }
    }

    /// Full repaint after the store was replaced.
    ///
    /// The highlight is dropped because its record may be gone.
    pub fn repaint(&mut self, store: &RecordStore) {
        self.highlight = None;
        self.sync_map(store);
    }

    /// Remove every placed marker, then place one per record.
    fn sync_map(&mut self, store: &RecordStore) {
        for id in self.placed.drain(..).rev() {
            self.map.remove_marker(&id);
        }
        for record in store.all() {
            self.map.add_marker(MarkerView::from_record(record));
            self.placed.push(record.id.clone());
        }
    }

    /// Table rows for the current store, capped, in feed order.
    ///
    /// `load_error` is the first-load failure message, if any; it takes the
    /// place of the table while there is no data.
    #[must_use]
    pub fn table(&self, store: &RecordStore, load_error: Option<&str>) -> TableView {
        if store.is_empty() {
            return match load_error {
                Some(message) => TableView::Error(message.to_string()),
                None => TableView::Empty,
            };
        }
        TableView::Rows(
            store
                .all()
                .iter()
                .take(self.row_cap)
                .map(RowView::from_record)
                .collect(),
        )
    }

    /// Select a record from either view.
    ///
    /// Unknown ids change nothing and return `None`.
    pub fn select(&mut self, store: &RecordStore, id: &str) -> Option<DetailView> {
        let record = store.find_by_id(id)?;
        let detail = DetailView::from_record(record);
        self.highlight = Some(record.id.clone());
        self.repaint_highlight(store);
        Some(detail)
    }

    /// Restyle every placed marker: the highlighted one emphasized, the rest
    /// back to their default look.
    ///
    /// Placed markers are exactly the store's records since the last repaint,
    /// so one pass over the store covers them.
    fn repaint_highlight(&mut self, store: &RecordStore) {
        for record in store.all() {
            let style = MarkerStyle::for_magnitude(record.magnitude);
            let style = if self.highlight.as_deref() == Some(record.id.as_str()) {
                style.emphasized()
            } else {
                style
            };
            self.map.restyle_marker(&record.id, style);
        }
    }

    /// Details for the highlighted record, if it still exists.
    #[must_use]
    pub fn details(&self, store: &RecordStore) -> Option<DetailView> {
        let id = self.highlight.as_deref()?;
        store.find_by_id(id).map(DetailView::from_record)
    }

    #[must_use]
    pub fn highlighted(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.placed.len()
    }

    #[must_use]
    pub fn map(&self) -> &M {
        &self.map
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{MapCall, RecordingMap};
    use super::*;
    use crate::models::fixtures::record;

    fn renderer<M: MapWidget>(map: M) -> ViewRenderer<M> {
        ViewRenderer::with_row_cap(map, TABLE_ROW_CAP)
    }

    fn store_of(records: Vec<Record>) -> RecordStore {
        let mut store = RecordStore::new();
        store.replace_all(records);
        store
    }

    fn scenario_store() -> RecordStore {
        store_of(vec![
            record("big", Some(7.2)),
            record("mid", Some(4.5)),
            record("small", Some(3.0)),
        ])
    }

    #[test]
    fn test_scenario_table_and_markers() {
        let store = scenario_store();
        let mut view = renderer(MarkerLayer::new());
        view.repaint(&store);

        let TableView::Rows(rows) = view.table(&store, None) else {
            panic!("expected rows");
        };
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["big", "mid", "small"]);
        assert_eq!(rows[0].badge, BadgeCategory::Magnitude7);
        assert_eq!(rows[0].magnitude, "7.2");

        let marker = view.map().get("big").expect("marker for big");
        assert_eq!(marker.style.fill_color, Color("#8B0000"));
        assert_eq!(marker.style.color, Color("#8B0000"));
        assert!((marker.style.radius - 21.6).abs() < 1e-9);
        assert_eq!(view.marker_count(), 3);
    }

    #[test]
    fn test_table_is_capped_in_feed_order() {
        let records: Vec<Record> = (0..30)
            .map(|i| record(&format!("ev{i:02}"), Some(2.5)))
            .collect();
        let store = store_of(records);
        let view = renderer(MarkerLayer::new());

        let TableView::Rows(rows) = view.table(&store, None) else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), TABLE_ROW_CAP);
        assert_eq!(rows[0].id, "ev00");
        assert_eq!(rows[19].id, "ev19");
    }

    #[test]
    fn test_empty_store_shows_empty_state_and_no_markers() {
        let mut view = renderer(MarkerLayer::new());
        view.repaint(&scenario_store());
        let empty = RecordStore::new();
        view.repaint(&empty);

        assert_eq!(view.table(&empty, None), TableView::Empty);
        assert!(view.map().markers().is_empty());
        assert_eq!(view.marker_count(), 0);
    }

    #[test]
    fn test_first_load_error_replaces_table() {
        let view = renderer(MarkerLayer::new());
        let empty = RecordStore::new();
        assert_eq!(
            view.table(&empty, Some("boom")),
            TableView::Error("boom".into())
        );
    }

    #[test]
    fn test_repaint_removes_all_then_adds() {
        let mut view = renderer(RecordingMap::default());
        let first = store_of(vec![record("a", Some(3.0)), record("b", Some(4.0))]);
        view.repaint(&first);
        view.map.take();

        let second = store_of(vec![record("c", Some(5.0))]);
        view.repaint(&second);
        assert_eq!(
            view.map.take(),
            vec![
                MapCall::Remove("b".into()),
                MapCall::Remove("a".into()),
                MapCall::Add("c".into()),
            ]
        );
    }

    #[test]
    fn test_select_emphasizes_exactly_one_marker() {
        let store = scenario_store();
        let mut view = renderer(MarkerLayer::new());
        view.repaint(&store);

        let detail = view.select(&store, "mid").expect("known id");
        assert_eq!(detail.id, "mid");
        assert_eq!(view.highlighted(), Some("mid"));

        let emphasized: Vec<&str> = view
            .map()
            .markers()
            .iter()
            .filter(|m| m.style.is_emphasized())
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(emphasized, ["mid"]);

        // Moving the selection reverts the previous marker completely.
        view.select(&store, "small").expect("known id");
        let mid = view.map().get("mid").unwrap();
        assert_eq!(mid.style, MarkerStyle::for_magnitude(Some(4.5)));
        assert!(view.map().get("small").unwrap().style.is_emphasized());
    }

    #[test]
    fn test_select_restyles_every_marker() {
        let store = scenario_store();
        let mut view = renderer(RecordingMap::default());
        view.repaint(&store);
        view.map.take();

        view.select(&store, "big");
        let calls = view.map.take();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| matches!(c, MapCall::Restyle(..))));
    }

    #[test]
    fn test_marker_layer_index_survives_removal() {
        let mut layer = MarkerLayer::new();
        for (id, mag) in [("a", 3.0), ("b", 4.5), ("c", 6.2)] {
            layer.add_marker(MarkerView::from_record(&record(id, Some(mag))));
        }

        layer.remove_marker("a");
        layer.remove_marker("missing");
        let emphasized = MarkerStyle::for_magnitude(Some(6.2)).emphasized();
        layer.restyle_marker("c", emphasized);

        let ids: Vec<&str> = layer.markers().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
        assert!(layer.get("c").unwrap().style.is_emphasized());
        assert!(!layer.get("b").unwrap().style.is_emphasized());
        assert!(layer.get("a").is_none());
    }

    #[test]
    fn test_select_in_large_snapshot_touches_each_marker_once() {
        let records: Vec<Record> = (0..2000)
            .map(|i| record(&format!("ev{i}"), Some(f64::from(i % 80) / 10.0)))
            .collect();
        let store = store_of(records);
        let mut view = renderer(RecordingMap::default());
        view.repaint(&store);
        view.map.take();

        view.select(&store, "ev1999").expect("known id");
        let calls = view.map.take();
        assert_eq!(calls.len(), 2000);
        assert!(matches!(&calls[1999], MapCall::Restyle(id, style) if id == "ev1999" && style.is_emphasized()));
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let store = scenario_store();
        let mut view = renderer(RecordingMap::default());
        view.repaint(&store);
        view.select(&store, "big");
        view.map.take();

        assert!(view.select(&store, "nope").is_none());
        assert_eq!(view.highlighted(), Some("big"));
        assert!(view.map.take().is_empty());
    }

    #[test]
    fn test_repaint_clears_highlight() {
        let store = scenario_store();
        let mut view = renderer(MarkerLayer::new());
        view.repaint(&store);
        view.select(&store, "big");

        view.repaint(&store);
        assert_eq!(view.highlighted(), None);
        assert!(view.details(&store).is_none());
        assert!(view.map().markers().iter().all(|m| !m.style.is_emphasized()));
    }

    #[test]
    fn test_detail_fields() {
        let mut rec = record("d", Some(6.04));
        rec.latitude = -33.456;
        rec.longitude = 70.654;
        rec.depth_km = None;
        let detail = DetailView::from_record(&rec);

        assert_eq!(detail.magnitude, "6.0");
        assert_eq!(detail.coordinates, "-33.46°, 70.65°");
        assert_eq!(detail.depth, "unknown");
        assert_eq!(detail.time, "2023-11-14 22:13:20 UTC");
        assert!(detail.detail_url.is_some());
    }

    #[test]
    fn test_labels() {
        assert_eq!(magnitude_label(None), "?");
        assert_eq!(magnitude_label(Some(4.26)), "4.3");
        assert_eq!(depth_label(Some(-1.84)), "-1.8 km");
    }

    #[test]
    fn test_marker_style_serializes_with_leaflet_names() {
        let json = serde_json::to_value(MarkerStyle::for_magnitude(Some(5.5))).unwrap();
        assert_eq!(json["fillColor"], "#FF6600");
        assert_eq!(json["fillOpacity"], 0.7);
        assert_eq!(json["weight"], 1.0);
    }
}
