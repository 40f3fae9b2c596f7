use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::commons::NtlError;
use crate::geo_core::{BoundingBox, GeoCore, GeoTransform};

/// GeoKey ids read from the GeoKeyDirectoryTag
const GT_RASTER_TYPE_GEO_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u32 = 3072;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

/// Single-band raster grid held in memory
///
/// Cells are stored row-major as `f64`. Cells matching the file's own nodata
/// sentinel are masked to NaN on load.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    data: Vec<f64>,
    transform: GeoTransform,
    /// Nodata sentinel declared by the file (already masked to NaN)
    nodata: Option<f64>,
    /// EPSG declared by the file, before any assignment
    source_epsg: Option<u32>,
    /// CRS attached to the grid
    pub geo_core: GeoCore,
}

impl Raster {
    /// Build a raster from row-major cell values
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        transform: GeoTransform,
    ) -> Result<Self, NtlError> {
        if data.len() != width * height {
            return Err(NtlError::InvalidInput(format!(
                "raster of {}x{} cells needs {} values, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        let mut geo_core = GeoCore::default();
        geo_core.set_bbox(Some(transform.extent(width, height)));
        Ok(Raster {
            width,
            height,
            data,
            transform,
            nodata: None,
            source_epsg: None,
            geo_core,
        })
    }

    /// Mask cells equal to `nodata` to NaN and remember the sentinel
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        if let Some(nd) = nodata {
            for v in self.data.iter_mut() {
                if *v == nd || (nd.is_nan() && v.is_nan()) {
                    *v = f64::NAN;
                }
            }
        }
        self.nodata = nodata;
        self
    }

    fn with_source_epsg(mut self, epsg: Option<u32>) -> Self {
        self.source_epsg = epsg;
        if let Some(code) = epsg {
            self.geo_core.set_epsg(code);
        }
        self
    }

    /// Overwrite the CRS without touching cell values or the transform
    pub fn assign_crs(&mut self, epsg: u32) {
        if let Some(source) = self.source_epsg {
            if source != epsg {
                warn!(
                    "Raster declares EPSG:{} but EPSG:{} is assigned; coordinates are not reprojected",
                    source, epsg
                );
            }
        }
        self.geo_core.set_epsg(epsg);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn source_epsg(&self) -> Option<u32> {
        self.source_epsg
    }

    pub fn epsg(&self) -> u32 {
        self.geo_core.get_epsg()
    }

    /// Cell value at (col, row); `None` outside the grid
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    pub fn extent(&self) -> BoundingBox {
        self.transform.extent(self.width, self.height)
    }
}

/// Loads a nighttime-light raster and assigns it a fixed CRS
pub struct RasterLoader {
    path: PathBuf,
    geo_core: GeoCore,
}

impl RasterLoader {
    /// Create a loader for `path`; the CRS defaults to EPSG:4326
    pub fn new(path: impl AsRef<Path>) -> Self {
        RasterLoader {
            path: path.as_ref().to_path_buf(),
            geo_core: GeoCore::default(),
        }
    }

    /// Set the EPSG code written onto the loaded raster
    pub fn set_crs(&mut self, epsg: u32) {
        self.geo_core.set_epsg(epsg);
    }

    /// Open the raster and assign the configured CRS
    pub fn run(&self) -> Result<Raster, NtlError> {
        #[cfg(feature = "gdal")]
        let mut raster = Self::open_gdal(&self.path)?;
        #[cfg(not(feature = "gdal"))]
        let mut raster = Self::open(&self.path)?;

        raster.assign_crs(self.geo_core.get_epsg());
        info!(
            "Raster {:?}: {}x{} cells, {}, nodata {:?}",
            self.path,
            raster.width(),
            raster.height(),
            raster.geo_core.crs_string(),
            raster.nodata()
        );
        Ok(raster)
    }

    /// Decode a GeoTIFF file
    pub fn open(path: &Path) -> Result<Raster, NtlError> {
        let file = File::open(path).map_err(|e| NtlError::data_access(path, e.to_string()))?;
        Self::decode(BufReader::new(file), path)
    }

    /// Decode a GeoTIFF from any seekable reader; `path` is only used in errors
    pub fn decode<R: Read + Seek>(reader: R, path: &Path) -> Result<Raster, NtlError> {
        let tiff_err = |what: &str, e: tiff::TiffError| {
            NtlError::data_access(path, format!("{}: {}", what, e))
        };

        let mut decoder = Decoder::new(reader)
            .map_err(|e| tiff_err("not a TIFF file", e))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| tiff_err("cannot read dimensions", e))?;
        let (width, height) = (width as usize, height as usize);

        let geokeys = read_geokeys(&mut decoder);
        let transform = read_geotransform(&mut decoder, &geokeys)
            .map_err(|e| tiff_err("cannot read georeferencing", e))?
            .ok_or_else(|| {
                NtlError::data_access(path, "no GeoTIFF georeferencing tags (tiepoint/scale or transformation)")
            })?;
        let nodata = read_gdal_nodata(&mut decoder);
        let source_epsg = geokeys.epsg();

        let image = decoder
            .read_image()
            .map_err(|e| tiff_err("cannot decode pixels", e))?;
        let samples = decoding_result_to_f64(image)
            .ok_or_else(|| NtlError::data_access(path, "unsupported pixel sample format"))?;

        let cells = width * height;
        if cells == 0 || samples.len() % cells != 0 {
            return Err(NtlError::data_access(
                path,
                format!("{} samples do not fit a {}x{} grid", samples.len(), width, height),
            ));
        }
        let per_pixel = samples.len() / cells;
        let data = if per_pixel == 1 {
            samples
        } else {
            debug!("{} samples per pixel, keeping the first band", per_pixel);
            samples.into_iter().step_by(per_pixel).collect()
        };

        Ok(Raster::new(width, height, data, transform)?
            .with_nodata(nodata)
            .with_source_epsg(source_epsg))
    }

    /// Read the first band through GDAL
    #[cfg(feature = "gdal")]
    pub fn open_gdal(path: &Path) -> Result<Raster, NtlError> {
        use gdal::Dataset;

        let gdal_err = |e: gdal::errors::GdalError| NtlError::data_access(path, e.to_string());

        let dataset = Dataset::open(path).map_err(gdal_err)?;
        let gt = dataset.geo_transform().map_err(gdal_err)?;
        let (width, height) = dataset.raster_size();
        let band = dataset.rasterband(1).map_err(gdal_err)?;
        let nodata = band.no_data_value();
        let buffer = band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .map_err(gdal_err)?;
        let source_epsg = dataset
            .spatial_ref()
            .ok()
            .and_then(|srs| srs.auth_code().ok())
            .map(|code| code as u32);

        Ok(Raster::new(
            width,
            height,
            buffer.data().to_vec(),
            GeoTransform::from_gdal(gt),
        )?
        .with_nodata(nodata)
        .with_source_epsg(source_epsg))
    }
}

/// Parsed GeoKeyDirectoryTag entries with inline values
#[derive(Debug, Default)]
struct GeoKeys {
    entries: Vec<(u32, u32)>,
}

impl GeoKeys {
    fn get(&self, key: u32) -> Option<u32> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn pixel_is_point(&self) -> bool {
        self.get(GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT)
    }

    fn epsg(&self) -> Option<u32> {
        self.get(PROJECTED_CS_TYPE_GEO_KEY)
            .or_else(|| self.get(GEOGRAPHIC_TYPE_GEO_KEY))
            .filter(|code| *code != USER_DEFINED && *code != 0)
    }
}

fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoKeys {
    let values = match decoder.find_tag(Tag::GeoKeyDirectoryTag) {
        Ok(Some(value)) => value.into_u32_vec().unwrap_or_default(),
        _ => return GeoKeys::default(),
    };
    // header: version, revision, minor revision, number of keys
    let Some(count) = values.get(3).map(|c| *c as usize) else {
        return GeoKeys::default();
    };
    let entries = values[4..]
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect();
    GeoKeys { entries }
}

fn read_geotransform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    geokeys: &GeoKeys,
) -> tiff::TiffResult<Option<GeoTransform>> {
    let mut transform = if let Some(matrix) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let m = matrix.into_f64_vec()?;
        if m.len() < 8 {
            return Ok(None);
        }
        GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]])
    } else {
        let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;
        let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
        let (Some(tiepoint), Some(scale)) = (tiepoint, scale) else {
            return Ok(None);
        };
        let tp = tiepoint.into_f64_vec()?;
        let sc = scale.into_f64_vec()?;
        if tp.len() < 6 || sc.len() < 2 {
            return Ok(None);
        }
        // tiepoint (I, J, K, X, Y, Z) maps raster (I, J) onto model (X, Y)
        GeoTransform::from_gdal([tp[3] - tp[0] * sc[0], sc[0], 0.0, tp[4] + tp[1] * sc[1], 0.0, -sc[1]])
    };

    if geokeys.pixel_is_point() {
        let (x, y) = transform.pixel_to_geo(-0.5, -0.5);
        transform.origin_x = x;
        transform.origin_y = y;
    }
    Ok(Some(transform))
}

fn read_gdal_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let value = decoder.find_tag(Tag::GdalNodata).ok()??;
    let text = value.into_string().ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

fn decoding_result_to_f64(image: DecodingResult) -> Option<Vec<f64>> {
    let values = match image {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(values)
}
