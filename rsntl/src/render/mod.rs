pub mod choropleth;
pub mod overlay;

use log::info;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::collect::wards::WardCollection;
use crate::commons::NtlError;
use crate::config::MapConfig;
use crate::geometric::classify::Classification;

/// A fully rendered, self-contained HTML map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    html: String,
}

impl MapDocument {
    pub fn new(html: String) -> Self {
        MapDocument { html }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Write the document to `path`, replacing any existing file.
    ///
    /// The HTML goes to a temporary file in the destination directory which
    /// is then renamed over `path`, so a failed write never leaves a partial map.
    pub fn save(&self, path: &Path) -> Result<(), NtlError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| NtlError::output_write(path, e))?;
        tmp.write_all(self.html.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| NtlError::output_write(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o644))
                .map_err(|e| NtlError::output_write(path, e))?;
        }

        tmp.persist(path)
            .map_err(|e| NtlError::output_write(path, e.error))?;
        info!("Map written to {:?} ({} bytes)", path, self.html.len());
        Ok(())
    }
}

/// Render the choropleth for classified wards.
///
/// `classification.labels` and `means` must hold one entry per ward, in ward
/// order. The output is a pure function of its inputs.
pub fn render(
    wards: &WardCollection,
    classification: &Classification,
    means: &[Option<f64>],
    config: &MapConfig,
) -> Result<MapDocument, NtlError> {
    let tiles = config.tiles.resolve()?;
    let overlay = choropleth::overlay_features(wards, classification, means, config)?;
    let html = choropleth::page(&overlay, config, &tiles)?;
    Ok(MapDocument::new(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::classify::classify;
    use tempfile::tempdir;

    const WARDS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"NAME_3": "Shivajinagar"},
         "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Yerawada"},
         "geometry": {"type": "Polygon", "coordinates": [[[1, 0], [2, 0], [2, 1], [1, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Wanowrie"},
         "geometry": {"type": "Polygon", "coordinates": [[[2, 0], [3, 0], [3, 1], [2, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Dhankawadi"},
         "geometry": {"type": "Polygon", "coordinates": [[[3, 0], [4, 0], [4, 1], [3, 0]]]}},
        {"type": "Feature", "properties": {"NAME_3": "Lohegaon"},
         "geometry": {"type": "Polygon", "coordinates": [[[9, 9], [10, 9], [10, 10], [9, 9]]]}}
    ]}"#;

    fn document(config: &MapConfig) -> MapDocument {
        let wards = WardCollection::from_geojson(WARDS.as_bytes()).unwrap();
        let means = vec![Some(2.5), Some(7.0), Some(11.25), Some(30.0), None];
        let classification = classify(&means).unwrap();
        render(&wards, &classification, &means, config).unwrap()
    }

    #[test]
    fn test_every_ward_rendered_in_order() {
        let doc = document(&MapConfig::default());
        let html = doc.as_str();
        let positions: Vec<usize> = ["Shivajinagar", "Yerawada", "Wanowrie", "Dhankawadi", "Lohegaon"]
            .iter()
            .map(|name| html.find(name).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ward_without_data_is_gray() {
        let html = document(&MapConfig::default()).into_string();
        assert!(html.contains("\"fillColor\":\"#cccccc\""));
        assert!(html.contains("<th>Mean NTL (Dec 2025)<\\/th><td><\\/td>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = MapConfig::default();
        assert_eq!(document(&config), document(&config));
    }

    #[test]
    fn test_decorations_toggle() {
        let decorated = document(&MapConfig::default());
        assert!(decorated.as_str().contains("<b>NTL Class</b>"));

        let bare = document(&MapConfig {
            decorations: None,
            ..MapConfig::default()
        });
        assert!(!bare.as_str().contains("NTL Class"));
        assert!(bare.as_str().contains("L.geoJson"));
    }

    #[test]
    fn test_unknown_tiles_fail_before_rendering() {
        let wards = WardCollection::from_geojson(WARDS.as_bytes()).unwrap();
        let means = vec![Some(2.5), Some(7.0), Some(11.25), Some(30.0), None];
        let classification = classify(&means).unwrap();
        let config = MapConfig {
            tiles: crate::config::TileTheme::Named("Stamen Watercolor".to_string()),
            ..MapConfig::default()
        };
        assert!(matches!(
            render(&wards, &classification, &means, &config).unwrap_err(),
            NtlError::Config(_)
        ));
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "stale").unwrap();

        let doc = document(&MapConfig::default());
        doc.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc.as_str());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("index.html");
        let err = MapDocument::new("<html></html>".to_string()).save(&path).unwrap_err();
        assert!(matches!(err, NtlError::OutputWrite { .. }));
        assert!(!path.exists());
    }
}
