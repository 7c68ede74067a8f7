//! Configuration files and end-to-end runs

use nav_cache::EXTERNAL_PRICING_CACHE;
use nav_cli::{run_simulation, ConfigError, NavigatorConfig, SimulationOptions};
use nav_preview::{InputField, PreviewPhase};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn load_toml_file() {
    let file = write_config(
        ".toml",
        r#"
[cache]
default_ttl_secs = 120
response_window = 50

[preview]
debounce_ms = 300
required_fields = ["marital_status", "employment_income"]
"#,
    );

    let config = NavigatorConfig::load(file.path()).unwrap();
    assert_eq!(config.cache.default_ttl(), Duration::from_secs(120));
    assert_eq!(config.cache.response_window, 50);
    assert_eq!(config.preview.debounce(), Duration::from_millis(300));
    assert_eq!(
        config.preview.required_fields,
        vec![InputField::MaritalStatus, InputField::EmploymentIncome]
    );
}

#[test]
fn load_yaml_file() {
    let file = write_config(".yml", "preview:\n  call_timeout_ms: 2500\n");

    let config = NavigatorConfig::load(file.path()).unwrap();
    assert_eq!(config.preview.call_timeout(), Duration::from_millis(2_500));
    assert_eq!(config.cache, NavigatorConfig::default().cache);
}

#[test]
fn load_empty_file() {
    let file = write_config(".yaml", "");
    assert_eq!(NavigatorConfig::load(file.path()).unwrap(), NavigatorConfig::default());
}

#[test]
fn load_rejects_unknown_extension_and_missing_file() {
    let file = write_config(".json", "{}");
    assert!(matches!(
        NavigatorConfig::load(file.path()),
        Err(ConfigError::UnsupportedFormat(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        NavigatorConfig::load(dir.path().join("absent.toml")),
        Err(ConfigError::Read { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn simulation_coalesces_burst() {
    let options = SimulationOptions {
        edits: 8,
        interval: Duration::from_millis(50),
        failure_rate: 0.0,
        latency: Duration::from_millis(200),
        seed: 1,
    };
    let report = run_simulation(&NavigatorConfig::default(), &options).await.unwrap();

    assert_eq!(report.calculator_calls, 1);
    assert_eq!(report.phase, PreviewPhase::Settled);
    assert!(!report.in_flight);
    assert!(!report.stale);
    assert!(report.error.is_none());
    let estimate = report.estimate.unwrap();
    assert_eq!(estimate.federal.adjusted_gross_income, 20_000.0);

    let pricing = &report.cache.caches[EXTERNAL_PRICING_CACHE];
    assert_eq!(pricing.misses, 1);
    assert_eq!(pricing.hits, 0);
}

#[tokio::test(start_paused = true)]
async fn simulation_with_total_outage_reports_error() {
    let options = SimulationOptions {
        edits: 3,
        interval: Duration::from_millis(10),
        failure_rate: 1.0,
        latency: Duration::from_millis(20),
        seed: 3,
    };
    let report = run_simulation(&NavigatorConfig::default(), &options).await.unwrap();

    assert_eq!(report.calculator_calls, 1);
    assert!(report.estimate.is_none());
    assert!(report.error.is_some());
    assert!(report.computed_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn simulation_rejects_bad_failure_rate() {
    let options = SimulationOptions {
        failure_rate: -0.5,
        ..SimulationOptions::default()
    };
    assert!(run_simulation(&NavigatorConfig::default(), &options).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn report_serializes_as_json() {
    let options = SimulationOptions {
        edits: 1,
        ..SimulationOptions::default()
    };
    let report = run_simulation(&NavigatorConfig::default(), &options).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["calculator_calls"], 1);
    assert!(json["cache"]["overall"]["total_misses"].is_u64());
    assert_eq!(json["estimate"]["state"]["state"], "MD");
}

#[test]
fn shipped_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/navigator.example.toml");
    let config = NavigatorConfig::load(path).unwrap();
    assert_eq!(config.cache.sweep_interval(), Some(Duration::from_secs(60)));
    assert_eq!(config.preview, nav_preview::PreviewConfig::default());
}
