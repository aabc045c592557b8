//! End-to-end runs of the analysis pipeline over temp files.

use std::{fs, path::Path};

use loadtest_analysis::{
    config::AnalysisConfig,
    error::AnalysisError,
    pipeline,
    report::{
        chart::{ChartLayout, NO_METADATA_CAPTION, header_lines},
        console::render_summary,
    },
};
use tempfile::TempDir;

fn point(metric: &str, secs: f64, value: f64) -> String {
    let ms = (secs * 1000.0) as i64;
    format!(
        r#"{{"type":"Point","metric":"{}","data":{{"time":"1970-01-01T00:{:02}:{:02}.{:03}Z","value":{}}}}}"#,
        metric,
        ms / 60_000,
        (ms / 1000) % 60,
        ms % 1000,
        value
    )
}

fn cpu_line(secs: u32, cpu: &str) -> String {
    format!(r#"{{"time":"1970-01-01T00:00:{:02}Z","cpu":"{}"}}"#, secs, cpu)
}

fn write_lines(path: &Path, lines: &[String]) {
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn config_in(dir: &TempDir) -> AnalysisConfig {
    AnalysisConfig::with_inputs(
        dir.path().join("events.json"),
        dir.path().join("stats.jsonl"),
        dir.path().join("environment.json"),
    )
}

fn sample_events() -> Vec<String> {
    vec![
        r#"{"type":"Metric","metric":"vus","data":{"type":"gauge"}}"#.to_string(),
        point("vus", 0.5, 50.0),
        point("vus", 6.0, 100.0),
        point("http_req_duration", 1.0, 100.0),
        point("http_req_duration", 6.0, 200.0),
        "{\"type\":\"Point\",\"metric\":\"http_req_dur".to_string(),
        point("http_reqs", 7.0, 1.0),
        point("vus", 12.0, 80.0),
        point("http_req_duration", 13.0, 450.0),
    ]
}

#[test]
fn full_run_with_all_inputs() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config_in(&dir);
    cfg.csv = Some(dir.path().join("out").join("series.csv"));

    write_lines(&cfg.events, &sample_events());
    write_lines(
        &cfg.resources,
        &[
            cpu_line(1, "40.00%"),
            cpu_line(5, "160.00%"),
            "garbage".to_string(),
            cpu_line(21, "30.00%"),
        ],
    );
    fs::write(
        &cfg.environment,
        r#"{"host":{"os":"Linux","cpus":4},"container":{"name":"api"},"testDateLocal":"today"}"#,
    )
    .unwrap();

    let report = pipeline::run(&cfg).unwrap();

    assert_eq!(report.event_stats.accepted, 6);
    assert_eq!(report.event_stats.malformed, 1);
    assert_eq!(report.series.buckets, vec![0, 1, 2]);
    assert_eq!(report.series.latency_p95, vec![Some(200.0), Some(450.0), None]);
    assert_eq!(report.series.concurrency_max, vec![Some(100.0), Some(80.0), None]);
    assert_eq!(report.series.cpu_max, vec![Some(160.0), None, Some(30.0)]);

    let s = &report.summary;
    assert_eq!(s.max_concurrency, 100.0);
    assert_eq!(s.latency.min, 200.0);
    assert_eq!(s.latency.max, 450.0);
    assert_eq!(s.cpu.count, 3);
    assert!((s.cpu.mean - 230.0 / 3.0).abs() < 1e-9);
    assert_eq!(s.cpu.max, 160.0);
    assert_eq!(report.local_cores, 4.0);

    let inflection = s.inflection.expect("450 ms is more than twice 200 ms");
    assert_eq!(inflection.bucket, 1);
    assert_eq!(inflection.concurrency, Some(80.0));

    let csv = fs::read_to_string(cfg.csv.as_ref().unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let env = report.environment.as_ref().unwrap();
    assert_eq!(header_lines(Some(env))[0], "Test date: today");
}

#[test]
fn missing_resource_log_omits_cpu() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    write_lines(&cfg.events, &sample_events());

    let report = pipeline::run(&cfg).unwrap();

    assert!(!report.summary.has_cpu());
    assert!(report.series.cpu_max.iter().all(Option::is_none));
    assert_eq!(report.cpu_samples, 0);
    assert_eq!(ChartLayout::new(&report.series, None).cpu_upper, None);
    assert!(!render_summary(&report.summary).contains("CPU"));
}

#[test]
fn missing_environment_uses_placeholder_caption() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    write_lines(&cfg.events, &sample_events());

    let report = pipeline::run(&cfg).unwrap();
    assert!(report.environment.is_none());
    assert_eq!(
        ChartLayout::new(&report.series, report.environment.as_ref()).header,
        vec![NO_METADATA_CAPTION.to_string()]
    );
}

#[test]
fn unreadable_environment_is_treated_as_absent() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    write_lines(&cfg.events, &sample_events());
    fs::write(&cfg.environment, "{not json").unwrap();

    let report = pipeline::run(&cfg).unwrap();
    assert!(report.environment.is_none());
}

#[test]
fn missing_event_log_is_fatal() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);

    let err = pipeline::run(&cfg).unwrap_err();
    assert!(matches!(err, AnalysisError::EventLogUnavailable { .. }));
}

#[test]
fn event_log_without_tracked_points_yields_zero_stats() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    write_lines(&cfg.events, &["{}".to_string(), point("http_reqs", 1.0, 1.0)]);

    let report = pipeline::run(&cfg).unwrap();
    assert!(report.series.is_empty());
    assert_eq!(report.summary.max_concurrency, 0.0);
    assert_eq!(report.summary.latency.mean, 0.0);
    assert_eq!(report.event_stats.lines, 2);
}

#[test]
fn svg_chart_includes_cpu_axis_only_with_cpu_samples() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config_in(&dir);
    cfg.chart = Some(dir.path().join("out").join("report.svg"));
    write_lines(&cfg.events, &sample_events());

    pipeline::run(&cfg).unwrap();
    let without_cpu = fs::read_to_string(cfg.chart.as_ref().unwrap()).unwrap();
    assert!(without_cpu.contains("<svg"));
    assert!(without_cpu.contains(NO_METADATA_CAPTION));
    assert!(without_cpu.contains("P95 latency (ms)"));
    assert!(!without_cpu.contains("CPU (%)"));

    write_lines(&cfg.resources, &[cpu_line(1, "40.00%"), cpu_line(21, "130.00%")]);
    pipeline::run(&cfg).unwrap();
    let with_cpu = fs::read_to_string(cfg.chart.as_ref().unwrap()).unwrap();
    assert!(with_cpu.contains("CPU (%)"));
}

#[test]
fn non_svg_extension_writes_bitmap() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config_in(&dir);
    cfg.chart = Some(dir.path().join("out").join("report.png"));
    write_lines(&cfg.events, &sample_events());
    write_lines(&cfg.resources, &[cpu_line(1, "40.00%")]);

    pipeline::run(&cfg).unwrap();
    let bytes = fs::read(cfg.chart.as_ref().unwrap()).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
}
