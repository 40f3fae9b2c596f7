use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;
use serde_json::json;

use crate::collect::global_variables::{CLASS_FIELD, MEAN_FIELD};
use crate::collect::wards::{Ward, WardCollection};
use crate::commons::basic_functions::{display_value, escape_html, escape_script_json};
use crate::commons::NtlError;
use crate::config::{MapConfig, TileLayer};
use crate::geometric::classify::{Classification, NtlClass};
use crate::render::overlay::decorations_html;

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";

/// GeoJSON overlay: one feature per ward, in ward order.
///
/// Each feature keeps the ward's properties and gains `ntl_mean` and
/// `ntl_class` (null when undefined). Leaflet style and tooltip markup are
/// attached as the foreign members `style` and `tooltip`.
pub fn overlay_features(
    wards: &WardCollection,
    classification: &Classification,
    means: &[Option<f64>],
    config: &MapConfig,
) -> Result<FeatureCollection, NtlError> {
    if classification.labels.len() != wards.len() || means.len() != wards.len() {
        return Err(NtlError::InvalidInput(format!(
            "{} wards but {} classes and {} zonal means",
            wards.len(),
            classification.labels.len(),
            means.len()
        )));
    }

    let features = wards
        .iter()
        .zip(classification.labels.iter().zip(means))
        .map(|(ward, (class, mean))| ward_feature(ward, *class, *mean, config))
        .collect();

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn ward_feature(ward: &Ward, class: Option<NtlClass>, mean: Option<f64>, config: &MapConfig) -> Feature {
    let mut properties = ward.properties.clone();
    properties.insert(
        MEAN_FIELD.to_string(),
        mean.and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
    );
    properties.insert(
        CLASS_FIELD.to_string(),
        class
            .map(|c| JsonValue::from(c.label()))
            .unwrap_or(JsonValue::Null),
    );

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "style".to_string(),
        json!({
            "fillColor": config.palette.color_for(class),
            "color": config.stroke.color,
            "weight": config.stroke.weight,
            "fillOpacity": config.stroke.fill_opacity,
        }),
    );
    foreign_members.insert(
        "tooltip".to_string(),
        JsonValue::from(tooltip_html(&properties, config)),
    );

    let geometry = if ward.is_empty() {
        None
    } else {
        Some(Geometry::new(geojson::Value::from(&ward.geometry)))
    };

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: Some(foreign_members),
    }
}

/// Two-column (alias, value) table for the configured tooltip fields
pub fn tooltip_html(properties: &JsonObject, config: &MapConfig) -> String {
    let rows: String = config
        .tooltip
        .fields
        .iter()
        .map(|f| {
            format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(&f.alias),
                escape_html(&display_value(properties.get(&f.field), config.tooltip.precision))
            )
        })
        .collect();
    format!("<table>{}</table>", rows)
}

/// Full standalone HTML page
pub fn page(overlay: &FeatureCollection, config: &MapConfig, tiles: &TileLayer) -> Result<String, NtlError> {
    let overlay_json = script_json(overlay)?;
    let tile_options = script_json(&json!({
        "attribution": tiles.attribution,
        "maxZoom": tiles.max_zoom,
        "subdomains": tiles.subdomains,
    }))?;
    let tile_url = script_json(&tiles.url)?;
    let center = script_json(&config.center)?;

    let decorations = config
        .decorations
        .as_ref()
        .map(|d| decorations_html(d, &config.palette))
        .unwrap_or_default();
    let title = config
        .decorations
        .as_ref()
        .map(|d| escape_html(&d.title))
        .unwrap_or_else(|| "Nighttime lights".to_string());

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no" />
    <title>{title}</title>
    <link rel="stylesheet" href="{css}"/>
    <script src="{js}"></script>
    <style>
        html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
        #map {{ position: absolute; top: 0; bottom: 0; right: 0; left: 0; }}
        .ntl-tooltip table {{ border-collapse: collapse; font-family: sans-serif; }}
        .ntl-tooltip th {{ text-align: left; padding-right: 8px; }}
    </style>
</head>
<body>
    <div id="map"></div>
{decorations}
    <script>
        var map = L.map("map", {{ center: {center}, zoom: {zoom}, zoomControl: true, preferCanvas: false }});
        L.tileLayer({tile_url}, {tile_options}).addTo(map);
        var wards = {overlay_json};
        L.geoJson(wards, {{
            style: function (feature) {{ return feature.style; }},
            onEachFeature: function (feature, layer) {{
                layer.bindTooltip(feature.tooltip, {{ sticky: true, className: "ntl-tooltip" }});
            }}
        }}).addTo(map);
    </script>
</body>
</html>
"#,
        title = title,
        css = LEAFLET_CSS,
        js = LEAFLET_JS,
        decorations = decorations,
        center = center,
        zoom = config.zoom,
        tile_url = tile_url,
        tile_options = tile_options,
        overlay_json = overlay_json,
    ))
}

/// Serialize for embedding in a `<script>` element
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, NtlError> {
    serde_json::to_string(value)
        .map(|s| escape_script_json(&s))
        .map_err(|e| NtlError::InvalidInput(format!("cannot serialize map data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::wards::WardCollection;
    use crate::config::TooltipField;
    use crate::geometric::classify::classify;

    const WARDS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"NAME_3": "Aundh"},
         "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Baner"},
         "geometry": {"type": "Polygon", "coordinates": [[[1, 0], [2, 0], [2, 1], [1, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Kothrud & <Karve>"},
         "geometry": {"type": "Polygon", "coordinates": [[[2, 0], [3, 0], [3, 1], [2, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Hadapsar"},
         "geometry": {"type": "Polygon", "coordinates": [[[3, 0], [4, 0], [4, 1], [3, 0]]]}},
        {"type": "Feature", "properties": {},
         "geometry": {"type": "Polygon", "coordinates": [[[9, 9], [10, 9], [10, 10], [9, 9]]]}}
    ]}"#;

    fn fixture() -> (WardCollection, Vec<Option<f64>>, Classification) {
        let wards = WardCollection::from_geojson(WARDS.as_bytes()).unwrap();
        let means = vec![Some(1.0), Some(5.0), Some(9.0), Some(13.0), None];
        let classification = classify(&means).unwrap();
        (wards, means, classification)
    }

    #[test]
    fn test_one_feature_per_ward_in_order() {
        let (wards, means, classification) = fixture();
        let fc = overlay_features(&wards, &classification, &means, &MapConfig::default()).unwrap();
        assert_eq!(fc.features.len(), 5);
        let names: Vec<Option<&str>> = fc
            .features
            .iter()
            .map(|f| f.property("NAME_3").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![Some("Aundh"), Some("Baner"), Some("Kothrud & <Karve>"), Some("Hadapsar"), None]
        );
    }

    #[test]
    fn test_style_follows_class() {
        let (wards, means, classification) = fixture();
        let fc = overlay_features(&wards, &classification, &means, &MapConfig::default()).unwrap();
        let fill = |i: usize| {
            fc.features[i].foreign_members.as_ref().unwrap()["style"]["fillColor"]
                .as_str()
                .unwrap()
                .to_string()
        };
        assert_eq!(fill(0), "#2c7bb6");
        assert_eq!(fill(3), "#d7191c");
        assert_eq!(fill(4), "#cccccc");
        assert_eq!(fc.features[3].property("ntl_class"), Some(&JsonValue::from("Very High")));
        assert_eq!(fc.features[4].property("ntl_class"), Some(&JsonValue::Null));
        assert_eq!(fc.features[4].property("ntl_mean"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_tooltip_blank_for_missing_values() {
        let (wards, means, classification) = fixture();
        let fc = overlay_features(&wards, &classification, &means, &MapConfig::default()).unwrap();
        let tooltip = |i: usize| {
            fc.features[i].foreign_members.as_ref().unwrap()["tooltip"]
                .as_str()
                .unwrap()
                .to_string()
        };
        assert_eq!(
            tooltip(1),
            "<table><tr><th>Ward</th><td>Baner</td></tr><tr><th>Mean NTL (Dec 2025)</th><td>5.0</td></tr></table>"
        );
        assert!(tooltip(2).contains("Kothrud &amp; &lt;Karve&gt;"));
        assert_eq!(
            tooltip(4),
            "<table><tr><th>Ward</th><td></td></tr><tr><th>Mean NTL (Dec 2025)</th><td></td></tr></table>"
        );
    }

    #[test]
    fn test_tooltip_precision_and_fields() {
        let mut config = MapConfig::default();
        config.tooltip.precision = Some(1);
        config.tooltip.fields.push(TooltipField::new("ntl_class", "Class"));
        let mut properties = JsonObject::new();
        properties.insert("ntl_mean".to_string(), JsonValue::from(3.14159));
        properties.insert("ntl_class".to_string(), JsonValue::from("Low"));
        let html = tooltip_html(&properties, &config);
        assert!(html.contains("<td>3.1</td>"));
        assert!(html.contains("<th>Class</th><td>Low</td>"));
    }

    #[test]
    fn test_length_mismatch() {
        let (wards, _, classification) = fixture();
        let err = overlay_features(&wards, &classification, &[Some(1.0)], &MapConfig::default())
            .unwrap_err();
        assert!(matches!(err, NtlError::InvalidInput(_)));
    }

    #[test]
    fn test_page_embeds_map_and_decorations() {
        let (wards, means, classification) = fixture();
        let config = MapConfig::default();
        let fc = overlay_features(&wards, &classification, &means, &config).unwrap();
        let tiles = config.tiles.resolve().unwrap();
        let html = page(&fc, &config, &tiles).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("center: [18.55,73.97], zoom: 10"));
        assert!(html.contains("dark_all"));
        assert!(html.contains("Pune Nightlight Intensity (Dec 2025)"));
        assert!(html.contains("<b>NTL Class</b>"));
        assert!(!html.contains("</table>\""));

        let bare = MapConfig {
            decorations: None,
            ..MapConfig::default()
        };
        let html = page(&fc, &bare, &tiles).unwrap();
        assert!(!html.contains("position:fixed"));
        assert!(!html.contains("NTL Class"));
    }
}
