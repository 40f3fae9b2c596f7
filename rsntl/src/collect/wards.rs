use geo::{BoundingRect, Geometry as GeoGeometry, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use log::{debug, info};
use std::path::Path;

use crate::commons::NtlError;
use crate::geo_core::{parse_epsg, BoundingBox};

/// One administrative ward: its boundary plus the attributes from the source file
#[derive(Debug, Clone, PartialEq)]
pub struct Ward {
    /// Boundary; single polygons are promoted, null geometries are empty
    pub geometry: MultiPolygon<f64>,
    /// Feature properties, untouched
    pub properties: JsonObject,
}

impl Ward {
    pub fn new(geometry: MultiPolygon<f64>, properties: JsonObject) -> Self {
        Ward {
            geometry,
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Ward name from `field`; `None` when the attribute is missing or null
    pub fn name(&self, field: &str) -> Option<String> {
        match self.properties.get(field)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from_rect)
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// Ordered ward boundaries, in the order of the source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WardCollection {
    wards: Vec<Ward>,
    /// EPSG from the legacy GeoJSON `crs` member
    declared_epsg: Option<u32>,
}

impl WardCollection {
    pub fn new(wards: Vec<Ward>) -> Self {
        WardCollection {
            wards,
            declared_epsg: None,
        }
    }

    /// Read a GeoJSON boundary file
    pub fn from_path(path: &Path) -> Result<Self, NtlError> {
        let content = std::fs::read(path).map_err(|e| NtlError::data_access(path, e.to_string()))?;
        let collection = Self::parse(&content, path)?;
        info!(
            "Wards {:?}: {} features{}",
            path,
            collection.len(),
            collection
                .declared_epsg
                .map(|e| format!(", declared EPSG:{}", e))
                .unwrap_or_default()
        );
        Ok(collection)
    }

    /// Parse GeoJSON bytes (FeatureCollection, Feature or bare Geometry)
    pub fn from_geojson(content: &[u8]) -> Result<Self, NtlError> {
        Self::parse(content, Path::new("<memory>"))
    }

    fn parse(content: &[u8], path: &Path) -> Result<Self, NtlError> {
        let text = std::str::from_utf8(content)
            .map_err(|e| NtlError::data_access(path, format!("not valid UTF-8: {}", e)))?;
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| NtlError::data_access(path, format!("invalid GeoJSON: {}", e)))?;

        let (features, foreign_members) = match geojson {
            GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
            GeoJson::Feature(f) => (vec![f], None),
            GeoJson::Geometry(g) => (vec![Feature::from(g)], None),
        };

        let wards = features
            .into_iter()
            .enumerate()
            .map(|(idx, feature)| feature_to_ward(feature).map_err(|reason| {
                NtlError::data_access(path, format!("feature {}: {}", idx, reason))
            }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WardCollection {
            wards,
            declared_epsg: foreign_members.as_ref().and_then(declared_epsg),
        })
    }

    pub fn wards(&self) -> &[Ward] {
        &self.wards
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ward> {
        self.wards.iter()
    }

    pub fn len(&self) -> usize {
        self.wards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }

    pub fn declared_epsg(&self) -> Option<u32> {
        self.declared_epsg
    }

    pub fn set_declared_epsg(&mut self, epsg: Option<u32>) {
        self.declared_epsg = epsg;
    }

    /// Union of all ward bounding boxes
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.wards
            .iter()
            .filter_map(Ward::bounding_box)
            .reduce(|a, b| a.union(&b))
    }

    /// Number of wards without a usable `field` value
    pub fn count_missing(&self, field: &str) -> usize {
        self.wards.iter().filter(|w| w.name(field).is_none()).count()
    }
}

impl<'a> IntoIterator for &'a WardCollection {
    type Item = &'a Ward;
    type IntoIter = std::slice::Iter<'a, Ward>;

    fn into_iter(self) -> Self::IntoIter {
        self.wards.iter()
    }
}

fn feature_to_ward(feature: Feature) -> Result<Ward, String> {
    let properties = feature.properties.unwrap_or_default();
    let geometry = match feature.geometry {
        None => {
            debug!("Feature without geometry kept as an empty ward");
            MultiPolygon(vec![])
        }
        Some(geometry) => {
            let geo_geom: GeoGeometry<f64> = geometry
                .try_into()
                .map_err(|e: geojson::Error| format!("invalid geometry: {}", e))?;
            polygonal(geo_geom)?
        }
    };
    Ok(Ward::new(geometry, properties))
}

/// Keep the areal part of a geometry; points and lines are not ward boundaries
fn polygonal(geometry: GeoGeometry<f64>) -> Result<MultiPolygon<f64>, String> {
    match geometry {
        GeoGeometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        GeoGeometry::MultiPolygon(mp) => Ok(mp),
        GeoGeometry::Rect(r) => Ok(MultiPolygon(vec![r.to_polygon()])),
        GeoGeometry::Triangle(t) => Ok(MultiPolygon(vec![t.to_polygon()])),
        GeoGeometry::GeometryCollection(gc) => {
            let polygons: Vec<Polygon<f64>> = gc
                .0
                .into_iter()
                .filter_map(|g| polygonal(g).ok())
                .flat_map(|mp| mp.0)
                .collect();
            if polygons.is_empty() {
                Err("geometry collection holds no polygons".to_string())
            } else {
                Ok(MultiPolygon(polygons))
            }
        }
        other => Err(format!("{} is not a polygon geometry", geometry_name(&other))),
    }
}

fn geometry_name(geometry: &GeoGeometry<f64>) -> &'static str {
    match geometry {
        GeoGeometry::Point(_) => "Point",
        GeoGeometry::MultiPoint(_) => "MultiPoint",
        GeoGeometry::Line(_) => "Line",
        GeoGeometry::LineString(_) => "LineString",
        GeoGeometry::MultiLineString(_) => "MultiLineString",
        _ => "geometry",
    }
}

/// EPSG from a legacy `"crs": {"type": "name", "properties": {"name": ...}}` member
fn declared_epsg(foreign_members: &JsonObject) -> Option<u32> {
    let name = foreign_members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    parse_epsg(name)
}
