// Example: ward nightlight choropleth from synthetic data
// Builds a small in-memory raster and three wards, then runs each stage by hand
use anyhow::{Context, Result};
use std::path::Path;

use rsntl::collect::raster::Raster;
use rsntl::collect::wards::WardCollection;
use rsntl::config::MapConfig;
use rsntl::geo_core::GeoTransform;
use rsntl::geometric::classify::classify;
use rsntl::geometric::zonal::{ZonalOptions, ZonalStats};
use rsntl::render::render;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Example: synthetic nightlight wards ===\n");

    // 10x10 cells of 0.01 degrees over central Pune, brighter towards the centre
    let (width, height) = (10usize, 10usize);
    let data: Vec<f64> = (0..width * height)
        .map(|i| {
            let (col, row) = ((i % width) as f64, (i / width) as f64);
            let d = ((col - 4.5).powi(2) + (row - 4.5).powi(2)).sqrt();
            (60.0 - 8.0 * d).max(0.0)
        })
        .collect();
    let transform = GeoTransform::north_up(73.80, 18.57, 0.01, 0.01);
    let raster = Raster::new(width, height, data, transform)?;

    let geojson_data = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NAME_3": "Shivajinagar" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [73.84, 18.53], [73.86, 18.53], [73.86, 18.51], [73.84, 18.51], [73.84, 18.53]
                ]] }
            },
            {
                "type": "Feature",
                "properties": { "NAME_3": "Kothrud" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [73.80, 18.57], [73.83, 18.57], [73.83, 18.54], [73.80, 18.54], [73.80, 18.57]
                ]] }
            },
            {
                "type": "Feature",
                "properties": { "NAME_3": "Aundh" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [73.86, 18.57], [73.90, 18.57], [73.90, 18.53], [73.86, 18.53], [73.86, 18.57]
                ]] }
            },
            {
                "type": "Feature",
                "properties": { "NAME_3": "Hadapsar" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [73.82, 18.51], [73.88, 18.51], [73.88, 18.48], [73.82, 18.48], [73.82, 18.51]
                ]] }
            },
            {
                "type": "Feature",
                "properties": { "NAME_3": "Wagholi" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [74.00, 18.60], [74.05, 18.60], [74.05, 18.55], [74.00, 18.55], [74.00, 18.60]
                ]] }
            }
        ]
    }
    "#;
    let wards = WardCollection::from_geojson(geojson_data.as_bytes())?;
    println!("Wards loaded: {}", wards.len());

    let stats = ZonalStats::compute(&wards, &raster, &ZonalOptions::default());
    let means: Vec<Option<f64>> = stats.iter().map(|s| s.mean).collect();

    let classification = classify(&means).context("Failed to classify ward means")?;
    println!("\nQuartile edges: {:?}", classification.edges.edges());
    for ((ward, stat), class) in wards.iter().zip(&stats).zip(&classification.labels) {
        println!(
            "  {:<14} mean {:>8} over {:>2} cells -> {}",
            ward.name("NAME_3").unwrap_or_default(),
            stat.mean.map(|m| format!("{:.2}", m)).unwrap_or_else(|| "-".to_string()),
            stat.count,
            class.map(|c| c.label()).unwrap_or("no data")
        );
    }

    let config = MapConfig {
        center: [18.53, 73.85],
        zoom: 12,
        ..MapConfig::default()
    };
    let document = render(&wards, &classification, &means, &config)?;

    std::fs::create_dir_all("output")?;
    let output = Path::new("output/synthetic_ntl.html");
    document.save(output)?;
    println!("\nMap saved to {:?} ({} bytes)", output, document.len());

    Ok(())
}
