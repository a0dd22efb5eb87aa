use rain_config::{Connectivity, RowOrder, SelectionPolicy, SourceKind, load_toml};
use rstest::rstest;

const MINIMAL: &str = r#"
[observer]
latitude = -24.98
longitude = 151.86
"#;

#[test]
fn minimal_config_uses_defaults() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.source.kind, SourceKind::Rainviewer);
    assert_eq!(cfg.analysis.rain_threshold, 50);
    assert_eq!(cfg.analysis.min_cell_pixels, 5);
    assert_eq!(cfg.analysis.connectivity, Connectivity::Four);
    assert_eq!(cfg.analysis.row_order, RowOrder::NorthUp);
    assert_eq!(cfg.tracking.min_track_length, 2);
    assert_eq!(cfg.selection.policy, SelectionPolicy::Nearest);
    assert_eq!(cfg.defaults.no_rain_value, 999.0);
    assert_eq!(cfg.run_interval().as_secs(), 180);
}

#[test]
fn missing_observer_is_a_parse_error() {
    let err = load_toml("[analysis]\nrain_threshold = 40\n").expect_err("observer is required");
    assert!(err.to_string().contains("observer"));
}

#[test]
fn accepts_full_config() {
    let toml = r#"
[observer]
latitude = 51.5
longitude = -0.12

[source]
kind = "simulated"
sim_interval_s = 300
sim_heading_deg = 90.0

[image]
size = 512
zoom = 7

[timeouts]
index_ms = 5000
tile_ms = 8000

[analysis]
rain_threshold = 40
min_cell_pixels = 3
connectivity = "eight"
row_order = "south_up"
arrival_angle_threshold_deg = 75.0

[tracking]
max_tracking_distance_km = 200.0
min_track_length = 3
max_track_positions = 8

[selection]
policy = "weighted"

[smoothing]
eta_alpha = 0.5

[schedule]
run_interval_minutes = "5"

[logging]
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.timeouts.frame_ms, 8000);
    assert_eq!(cfg.analysis.connectivity, Connectivity::Eight);
    assert_eq!(cfg.analysis.row_order, RowOrder::SouthUp);
    assert_eq!(cfg.analysis.approach_angle_deg, 75.0);
    assert_eq!(cfg.selection.policy, SelectionPolicy::Weighted);
    assert_eq!(cfg.schedule.run_interval_minutes, 5);
}

#[rstest]
#[case("[tracking]\nmin_track_length = 1\n", "min_track_length must be >= 2")]
#[case("[tracking]\nmax_tracking_distance_km = 0.0\n", "max_tracking_distance_km must be > 0")]
#[case("[analysis]\nmin_cell_pixels = 0\n", "min_cell_pixels must be >= 1")]
#[case("[analysis]\nconsensus_tolerance_deg = 200.0\n", "consensus_tolerance_deg")]
#[case("[smoothing]\neta_alpha = 1.5\n", "eta_alpha must be in (0.0, 1.0]")]
#[case("[schedule]\nrun_interval_minutes = 0\n", "run_interval_minutes must be >= 1")]
#[case("[image]\nsize = 300\n", "image.size must be 256 or 512")]
#[case("[source]\nkind = \"directory\"\n", "source.directory is required")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_out_of_range(#[case] section: &str, #[case] needle: &str) {
    let toml = format!("{MINIMAL}\n{section}");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn rejects_observer_out_of_range() {
    let cfg = load_toml("[observer]\nlatitude = 95.0\nlongitude = 0.0\n").expect("parse TOML");
    let err = cfg.validate().expect_err("latitude 95 is invalid");
    assert!(err.to_string().contains("observer.latitude"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/rain_config.toml");
    let cfg = rain_config::load_file(&path).expect("sample parses");
    cfg.validate().expect("sample validates");
    assert_eq!(cfg.source.kind, rain_config::SourceKind::Rainviewer);
}
