use geo::{coord, Coord, LineString, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// EPSG code of WGS 84 geographic coordinates
pub const WGS84_EPSG: u32 = 4326;

/// Base struct for CRS bookkeeping
/// Holds the EPSG code attached to a dataset and, once known, its extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCore {
    /// EPSG code
    pub epsg: u32,
    /// Extent in the CRS units
    pub bbox: Option<BoundingBox>,
}

impl GeoCore {
    /// Create a new GeoCore with EPSG
    pub fn new(epsg: u32) -> Self {
        GeoCore { epsg, bbox: None }
    }

    /// Get EPSG code
    pub fn get_epsg(&self) -> u32 {
        self.epsg
    }

    /// Set EPSG code
    pub fn set_epsg(&mut self, epsg: u32) {
        self.epsg = epsg;
    }

    /// Get bounding box
    pub fn get_bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// Set bounding box
    pub fn set_bbox(&mut self, bbox: Option<BoundingBox>) {
        self.bbox = bbox;
    }

    /// `EPSG:nnnn` authority string
    pub fn crs_string(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl Default for GeoCore {
    fn default() -> Self {
        GeoCore::new(WGS84_EPSG)
    }
}

/// Parse an EPSG code out of a CRS name.
///
/// Accepts `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326` and the OGC CRS84
/// aliases (lon/lat WGS 84).
pub fn parse_epsg(name: &str) -> Option<u32> {
    let name = name.trim();
    let upper = name.to_ascii_uppercase();
    if upper.ends_with("CRS84") {
        return Some(WGS84_EPSG);
    }
    if !upper.contains("EPSG") {
        return None;
    }
    upper.rsplit(':').next()?.trim().parse().ok()
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// True when the boxes share at least one point
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Affine pixel-to-world transform, stored in GDAL coefficient order:
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from the upper-left corner and cell size
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        GeoTransform {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            col_rotation: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// Convert (fractional) pixel coordinates to world coordinates
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert world coordinates to fractional pixel coordinates.
    /// Returns `None` for a singular transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < f64::EPSILON * f64::EPSILON || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;
        Some((col, row))
    }

    /// World coordinate of a cell centre
    pub fn cell_center(&self, col: usize, row: usize) -> Coord<f64> {
        let (x, y) = self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
        coord! { x: x, y: y }
    }

    /// Footprint of a cell as a closed polygon
    pub fn cell_polygon(&self, col: usize, row: usize) -> Polygon<f64> {
        let (c, r) = (col as f64, row as f64);
        let corners = [(c, r), (c + 1.0, r), (c + 1.0, r + 1.0), (c, r + 1.0), (c, r)];
        let ring: Vec<Coord<f64>> = corners
            .iter()
            .map(|&(cc, rr)| {
                let (x, y) = self.pixel_to_geo(cc, rr);
                coord! { x: x, y: y }
            })
            .collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    /// World extent of a `width` x `height` grid
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(width as f64, 0.0),
            self.pixel_to_geo(0.0, height as f64),
            self.pixel_to_geo(width as f64, height as f64),
        ];
        let mut bbox = BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            bbox = bbox.union(&BoundingBox::new(x, y, x, y));
        }
        bbox
    }
}
