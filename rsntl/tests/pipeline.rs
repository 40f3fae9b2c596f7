use approx::assert_relative_eq;
use std::fs::File;
use std::path::Path;
use tempfile::tempdir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use rsntl::collect::raster::RasterLoader;
use rsntl::collect::wards::WardCollection;
use rsntl::geometric::classify::{classify, NtlClass};
use rsntl::geometric::zonal::compute_means;
use rsntl::{run, NtlError, PipelineConfig};

const WIDTH: u32 = 8;
const HEIGHT: u32 = 2;
const ORIGIN: (f64, f64) = (73.0, 19.0);
const PIXEL: f64 = 0.1;

// Ward i covers columns 2i and 2i+1; its valid cells average to 1, 5, 9, 13
const CELLS: [f32; 16] = [
    0.0, 1.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, //
    1.0, 1.0, 5.0, 5.0, 9.0, 9.0, 13.0, 13.0,
];

fn write_geotiff(path: &Path, cells: &[f32]) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(WIDTH, HEIGHT)
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[PIXEL, PIXEL, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::ModelTiepointTag,
            &[0.0, 0.0, 0.0, ORIGIN.0, ORIGIN.1, 0.0][..],
        )
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1u16, 1, 0, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326][..],
        )
        .unwrap();
    image.write_data(cells).unwrap();
}

fn polygon(x0: f64, x1: f64, y0: f64, y1: f64) -> String {
    format!(
        "[[[{x0}, {y0}], [{x1}, {y0}], [{x1}, {y1}], [{x0}, {y1}], [{x0}, {y0}]]]",
        x0 = x0,
        x1 = x1,
        y0 = y0,
        y1 = y1
    )
}

fn wards_geojson() -> String {
    let names = ["Kasba Peth", "Bhavani Peth", "Dhole Patil Road", "Sangamwadi"];
    let mut features: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let x0 = ORIGIN.0 + 2.0 * PIXEL * i as f64;
            format!(
                r#"{{"type": "Feature", "properties": {{"NAME_3": "{}"}}, "geometry": {{"type": "Polygon", "coordinates": {}}}}}"#,
                name,
                polygon(x0, x0 + 2.0 * PIXEL, 18.8, 19.0)
            )
        })
        .collect();
    // well east of the raster
    features.push(format!(
        r#"{{"type": "Feature", "properties": {{"NAME_3": "Wagholi"}}, "geometry": {{"type": "Polygon", "coordinates": {}}}}}"#,
        polygon(74.5, 74.7, 18.8, 19.0)
    ));
    format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        features.join(",\n")
    )
}

fn setup(dir: &Path, cells: &[f32]) -> PipelineConfig {
    let raster_path = dir.join("viirs.tif");
    let wards_path = dir.join("Pune.geojson");
    write_geotiff(&raster_path, cells);
    std::fs::write(&wards_path, wards_geojson()).unwrap();
    PipelineConfig {
        raster_path,
        wards_path,
        output_path: dir.join("index.html"),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_means_and_classes() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &CELLS);

    let raster = RasterLoader::new(&config.raster_path).run().unwrap();
    assert_eq!((raster.width(), raster.height()), (8, 2));
    assert_eq!(raster.epsg(), 4326);

    let wards = WardCollection::from_path(&config.wards_path).unwrap();
    let means = compute_means(&wards, &raster, 0.0);
    assert_eq!(means.len(), 5);
    for (mean, expected) in means.iter().zip([1.0, 5.0, 9.0, 13.0]) {
        assert_relative_eq!(mean.unwrap(), expected);
    }
    assert_eq!(means[4], None);

    let classification = classify(&means).unwrap();
    assert_eq!(
        classification.labels,
        vec![
            Some(NtlClass::Low),
            Some(NtlClass::Medium),
            Some(NtlClass::High),
            Some(NtlClass::VeryHigh),
            None
        ]
    );
}

#[test]
fn test_full_run_writes_choropleth() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &CELLS);

    let report = run(&config).unwrap();
    assert_eq!(report.ward_count, 5);
    assert_eq!(report.wards_with_data, 4);
    assert_eq!(report.class_counts, [1, 1, 1, 1]);
    assert_eq!(report.edges, [1.0, 4.0, 7.0, 10.0, 13.0]);

    let html = std::fs::read_to_string(&config.output_path).unwrap();
    for name in ["Kasba Peth", "Bhavani Peth", "Dhole Patil Road", "Sangamwadi", "Wagholi"] {
        assert_eq!(html.matches(name).count(), 2, "{} once in properties, once in tooltip", name);
    }
    assert!(html.contains("\"ntl_class\":\"Very High\""));
    assert!(html.contains("\"fillColor\":\"#cccccc\""));
    assert!(html.contains("Pune Nightlight Intensity (Dec 2025)"));
}

#[test]
fn test_runs_are_identical() {
    let dir = tempdir().unwrap();
    let mut config = setup(dir.path(), &CELLS);

    run(&config).unwrap();
    let first = std::fs::read(&config.output_path).unwrap();
    config.output_path = dir.path().join("again.html");
    run(&config).unwrap();
    let second = std::fs::read(&config.output_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_failed_run_leaves_no_file() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &[7.0; 16]);

    let err = run(&config).unwrap_err();
    assert!(matches!(err, NtlError::ClassificationDegenerate { .. }));
    assert!(!config.output_path.exists());
    // only the inputs remain
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_all_touched_widens_selection() {
    let dir = tempdir().unwrap();
    let mut config = setup(dir.path(), &CELLS);
    config.all_touched = true;
    config.output_path = dir.path().join("touched.html");

    let report = run(&config).unwrap();
    // shared edges pull neighbouring columns into every ward
    assert!(report.cells_used > 15);
    assert!(config.output_path.exists());
}
