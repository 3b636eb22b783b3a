//! End-to-end tests: GeoTIFF grids on disk through the pipeline and the
//! batch runner into a CSV results table

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use byteorder::{LittleEndian, WriteBytesExt};

use seaice_extent::batch::{self, CancellationToken};
use seaice_extent::commands::{Command, InspectCommand, RunCommand};
use seaice_extent::compression::AdobeDeflateHandler;
use seaice_extent::coordinate::{Crs, CrsRegistry, GeoTransform};
use seaice_extent::tiff::{GeoTiffWriter, SampleType};
use seaice_extent::{extract_area, CsvResultTable, ExtentConfig, ExtentError, ExtentResult, ResultRecord, ResultTable};

const NODATA: f64 = 255.0;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("seaice_it_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn laea() -> Crs {
    CrsRegistry::lookup("EPSG:6932").unwrap()
}

fn write_grid(path: &Path, width: usize, height: usize, values: &[f64], transform: &GeoTransform, crs: &Crs) {
    let mut geo = crs.to_geo_reference();
    geo.nodata = Some(NODATA);
    let geo = transform.to_geo_reference(geo);

    GeoTiffWriter::new(width, height, SampleType::U8)
        .with_compression(Box::new(AdobeDeflateHandler))
        .with_geo_reference(geo)
        .write(values, path)
        .unwrap();
}

/// 4x4 grid of 25 km cells with a 2x2 block of 80 % ice in the middle
fn block_values() -> Vec<f64> {
    let mut values = vec![0.0; 16];
    for i in [5, 6, 9, 10] {
        values[i] = 80.0;
    }
    values
}

fn default_transform() -> GeoTransform {
    GeoTransform::north_up(-50_000.0, 50_000.0, 25_000.0, 25_000.0)
}

/// Uncompressed 8-bit strip TIFF claiming `width` x `height` cells with a single data byte
fn write_oversized_header(path: &Path, width: u32, height: u32) {
    let data_offset: u32 = 8 + 2 + 8 * 12 + 4;
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();

    buffer.write_u16::<LittleEndian>(8).unwrap();
    for (tag, field_type, value) in [
        (256u16, 4u16, width),
        (257, 4, height),
        (258, 3, 8),
        (259, 3, 1),
        (273, 4, data_offset),
        (277, 3, 1),
        (278, 4, height),
        (279, 4, 1),
    ] {
        buffer.write_u16::<LittleEndian>(tag).unwrap();
        buffer.write_u16::<LittleEndian>(field_type).unwrap();
        buffer.write_u32::<LittleEndian>(1).unwrap();
        if field_type == 3 {
            buffer.write_u16::<LittleEndian>(value as u16).unwrap();
            buffer.write_u16::<LittleEndian>(0).unwrap();
        } else {
            buffer.write_u32::<LittleEndian>(value).unwrap();
        }
    }
    buffer.write_u32::<LittleEndian>(0).unwrap();
    buffer.push(80);

    fs::write(path, buffer).unwrap();
}

/// Table that fails on one append and remembers everything it was given
struct FailingTable {
    fail_on: usize,
    attempts: usize,
    records: Vec<ResultRecord>,
}

impl ResultTable for FailingTable {
    fn ensure_exists(&mut self) -> ExtentResult<()> {
        Ok(())
    }

    fn append(&mut self, record: &ResultRecord) -> ExtentResult<()> {
        self.attempts += 1;
        if self.attempts == self.fail_on {
            return Err(ExtentError::storage("failing.csv", io::Error::other("no space left on device")));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "failing.csv".to_string()
    }
}

fn batch_config(dir: &Path) -> ExtentConfig {
    let mut config = ExtentConfig::default();
    config.working_dir = dir.to_path_buf();
    config.input_pattern = "nt_*.tif".to_string();
    config.output_table = PathBuf::from("extent_results.csv");
    config.workers = 2;
    config
}

#[test]
fn test_single_block_area() {
    let dir = scratch_dir("block");
    let path = dir.join("nt_20140101_f17_v1.1_s.tif");
    write_grid(&path, 4, 4, &block_values(), &default_transform(), &laea());

    let report = extract_area(&path, &ExtentConfig::default()).unwrap();
    assert_eq!(report.record.source_identifier, "nt_20140101_f17_v1.1_s");
    assert_eq!(report.record.total_area, 2.5e9);
    assert_eq!(report.polygon_count, 1);
    assert!(!report.reprojected);
    assert_eq!(report.source_info.map(|s| s.sensor), Some("f17".to_string()));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_all_nodata_grid() {
    let dir = scratch_dir("nodata");
    let path = dir.join("empty.tif");
    write_grid(&path, 3, 3, &[NODATA; 9], &default_transform(), &laea());

    let report = extract_area(&path, &ExtentConfig::default()).unwrap();
    assert_eq!(report.record.total_area, 0.0);
    assert!(report.empty_mask);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_two_regions_and_threshold_edge() {
    let dir = scratch_dir("regions");
    let path = dir.join("regions.tif");
    let values = [
        15.0, 15.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 14.0,
        0.0, 0.0, 0.0, 100.0,
        NODATA, 0.0, 0.0, 100.0,
    ];
    write_grid(&path, 4, 4, &values, &default_transform(), &laea());

    let report = extract_area(&path, &ExtentConfig::default()).unwrap();
    assert_eq!(report.polygon_count, 2);
    assert_eq!(report.true_cells, 4);
    assert_eq!(report.record.total_area, 4.0 * 6.25e8);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_translation_invariance_and_cell_scaling() {
    let dir = scratch_dir("scaling");
    let base = dir.join("base.tif");
    let shifted = dir.join("shifted.tif");
    let coarse = dir.join("coarse.tif");

    write_grid(&base, 4, 4, &block_values(), &default_transform(), &laea());
    write_grid(&shifted, 4, 4, &block_values(),
               &GeoTransform::north_up(-1_250_000.0, 2_000_000.0, 25_000.0, 25_000.0), &laea());
    write_grid(&coarse, 4, 4, &block_values(),
               &GeoTransform::north_up(-100_000.0, 100_000.0, 50_000.0, 50_000.0), &laea());

    let config = ExtentConfig::default();
    let base_area = extract_area(&base, &config).unwrap().record.total_area;
    let shifted_area = extract_area(&shifted, &config).unwrap().record.total_area;
    let coarse_area = extract_area(&coarse, &config).unwrap().record.total_area;

    assert_relative_eq!(base_area, shifted_area, max_relative = 1e-12);
    assert_relative_eq!(coarse_area, 4.0 * base_area, max_relative = 1e-12);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_stereographic_grid_is_reprojected() {
    let dir = scratch_dir("stere");
    let path = dir.join("nt_19810103_n07_v01_s.tif");
    let stere = CrsRegistry::from_epsg(3412).unwrap();

    // 60x60 block of 25 km cells centred on the pole
    let mut values = vec![0.0; 64 * 64];
    for row in 2..62 {
        for col in 2..62 {
            values[row * 64 + col] = 80.0;
        }
    }
    write_grid(&path, 64, 64, &values, &GeoTransform::north_up(-800_000.0, 800_000.0, 25_000.0, 25_000.0), &stere);

    let report = extract_area(&path, &ExtentConfig::default()).unwrap();
    assert!(report.reprojected);
    assert_eq!(report.polygon_count, 1);
    // map area over the squared scale factor at the pole (0.969858 for true scale at 70S)
    let expected = 3600.0 * 6.25e8 / 0.969_858f64.powi(2);
    assert_relative_eq!(report.record.total_area, expected, max_relative = 0.05);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_rejects_non_equal_area_target() {
    let dir = scratch_dir("target");
    let path = dir.join("grid.tif");
    write_grid(&path, 4, 4, &block_values(), &default_transform(), &laea());

    let mut config = ExtentConfig::default();
    config.target_crs = "EPSG:3412".to_string();
    assert!(matches!(extract_area(&path, &config), Err(ExtentError::Projection(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_inspect_describes_grid() {
    let dir = scratch_dir("inspect");
    let path = dir.join("grid.tif");
    write_grid(&path, 4, 4, &block_values(), &default_transform(), &laea());

    let text = InspectCommand::new(&path, false).describe().unwrap();
    assert!(text.contains("Dimensions: 4x4"));
    assert!(text.contains("Compression: Adobe Deflate"));
    assert!(text.contains("Nodata: 255"));
    assert!(text.contains("EPSG:6932"));
    assert!(text.contains("Cell size: 25000 x 25000"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_batch_continues_after_failure() {
    let dir = scratch_dir("batch");
    for (day, cells) in [(1, 4usize), (3, 2), (4, 0)] {
        let mut values = vec![0.0; 16];
        for v in values.iter_mut().take(cells) {
            *v = 90.0;
        }
        let path = dir.join(format!("nt_2014010{}_f17_v1.1_s.tif", day));
        write_grid(&path, 4, 4, &values, &default_transform(), &laea());
    }
    fs::write(dir.join("nt_20140102_f17_v1.1_s.tif"), b"not a tiff").unwrap();

    let config = batch_config(&dir);
    let mut table = CsvResultTable::new(config.output_table_path());
    let outcome = batch::run_batch(&config, &mut table, &CancellationToken::new());
    assert_eq!(batch::exit_code(&outcome), 1);

    let summary = outcome.unwrap();
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].0.ends_with("nt_20140102_f17_v1.1_s.tif"));
    assert!(!summary.cancelled);

    let records = table.read_records().unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.source_identifier.as_str()).collect();
    assert_eq!(names, vec!["nt_20140101_f17_v1.1_s", "nt_20140103_f17_v1.1_s", "nt_20140104_f17_v1.1_s"]);
    assert_eq!(records[0].total_area, 2.5e9);
    assert_eq!(records[1].total_area, 1.25e9);
    assert_eq!(records[2].total_area, 0.0);
    assert_eq!(summary.total_area, 3.75e9);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_fail_fast_stops_at_first_failure() {
    let dir = scratch_dir("failfast");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());
    fs::write(dir.join("nt_20140102_f17_v1.1_s.tif"), b"II*\0garbage").unwrap();
    write_grid(&dir.join("nt_20140103_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let mut config = batch_config(&dir);
    config.fail_fast = true;
    let mut table = CsvResultTable::new(config.output_table_path());
    let summary = batch::run_batch(&config, &mut table, &CancellationToken::new()).unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert!(summary.cancelled);
    assert_eq!(summary.exit_code(), 1);
    let records = table.read_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_identifier, "nt_20140101_f17_v1.1_s");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_rerun_appends_without_truncating() {
    let dir = scratch_dir("rerun");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let config = batch_config(&dir);
    let mut table = CsvResultTable::new(config.output_table_path());
    for _ in 0..2 {
        let summary = batch::run_batch(&config, &mut table, &CancellationToken::new()).unwrap();
        assert_eq!(summary.exit_code(), 0);
    }

    let content = fs::read_to_string(config.output_table_path()).unwrap();
    assert_eq!(content.matches("data_source,area").count(), 1);
    assert_eq!(table.read_records().unwrap().len(), 2);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_cancelled_batch_writes_nothing() {
    let dir = scratch_dir("cancel");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let config = batch_config(&dir);
    let mut table = CsvResultTable::new(config.output_table_path());
    let token = CancellationToken::new();
    token.cancel();

    let summary = batch::run_batch(&config, &mut table, &token).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.exit_code(), 2);
    assert!(table.read_records().unwrap().is_empty());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unwritable_table_is_fatal() {
    let dir = scratch_dir("storage");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let mut config = batch_config(&dir);
    config.output_table = PathBuf::from("results_dir");
    fs::create_dir_all(dir.join("results_dir")).unwrap();
    fs::write(dir.join("results_dir").join("keep"), b"x").unwrap();

    let mut table = CsvResultTable::new(config.output_table_path());
    let outcome = batch::run_batch(&config, &mut table, &CancellationToken::new());
    assert!(matches!(outcome, Err(ExtentError::Storage { .. })));
    assert_eq!(batch::exit_code(&outcome), 2);
    assert!(table.location().ends_with("results_dir"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_no_inputs() {
    let dir = scratch_dir("none");
    let config = batch_config(&dir);
    let mut table = CsvResultTable::new(config.output_table_path());

    let summary = batch::run_batch(&config, &mut table, &CancellationToken::new()).unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(config.output_table_path().exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_oversized_header_is_a_decode_error() {
    let dir = scratch_dir("oversized");
    let path = dir.join("huge.tif");
    write_oversized_header(&path, u32::MAX, u32::MAX);

    let result = extract_area(&path, &ExtentConfig::default());
    assert!(matches!(result, Err(ExtentError::Decode { .. })), "{:?}", result.err());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_batch_survives_oversized_header() {
    let dir = scratch_dir("oversized_batch");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());
    write_oversized_header(&dir.join("nt_20140102_f17_v1.1_s.tif"), u32::MAX, u32::MAX);
    write_grid(&dir.join("nt_20140103_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let config = batch_config(&dir);
    let mut table = CsvResultTable::new(config.output_table_path());
    let outcome = batch::run_batch(&config, &mut table, &CancellationToken::new());
    assert_eq!(batch::exit_code(&outcome), 1);

    let summary = outcome.unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].0.ends_with("nt_20140102_f17_v1.1_s.tif"));

    let names: Vec<String> = table.read_records().unwrap().into_iter().map(|r| r.source_identifier).collect();
    assert_eq!(names, vec!["nt_20140101_f17_v1.1_s", "nt_20140103_f17_v1.1_s"]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_append_failure_mid_batch_stops_writing() {
    let dir = scratch_dir("append_failure");
    for day in 1..=4 {
        let path = dir.join(format!("nt_2014010{}_f17_v1.1_s.tif", day));
        write_grid(&path, 4, 4, &block_values(), &default_transform(), &laea());
    }

    let mut config = batch_config(&dir);
    config.workers = 1;
    let mut table = FailingTable { fail_on: 2, attempts: 0, records: Vec::new() };
    let outcome = batch::run_batch(&config, &mut table, &CancellationToken::new());

    assert!(matches!(outcome, Err(ExtentError::Storage { .. })));
    assert_eq!(batch::exit_code(&outcome), 2);
    assert_eq!(table.attempts, 2);
    assert_eq!(table.records.len(), 1);
    assert_eq!(table.records[0].source_identifier, "nt_20140101_f17_v1.1_s");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_run_command_honours_cancellation() {
    let dir = scratch_dir("run_cancel");
    write_grid(&dir.join("nt_20140101_f17_v1.1_s.tif"), 4, 4, &block_values(), &default_transform(), &laea());

    let config = batch_config(&dir);
    let table_path = config.output_table_path();
    let command = RunCommand::new(config);
    command.cancellation_token().cancel();

    assert_eq!(command.execute().unwrap(), 2);
    assert!(CsvResultTable::new(table_path).read_records().unwrap().is_empty());

    fs::remove_dir_all(&dir).unwrap();
}
