use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    BrowseResult, ChartsResult, HealthResult, PipelineResult, ProgressEvent, ProgressSink,
    ProgressSinkKind,
};
use crate::charts::ChartSeries;
use crate::controller::{DisplayStatus, format_thousands};
use crate::domain::Dataset;
use crate::quick::FilterOptions;

pub const LOAD_FAILED: &str = "Data load failed";
pub const NO_RESULTS: &str = "No matching datasets.";

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_browse(result: &BrowseResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_pipeline(result: &PipelineResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_charts(result: &ChartsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_options(result: &FilterOptions) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_health(result: &HealthResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_failure(message: &str) -> io::Result<()> {
        Self::print_json(&serde_json::json!({
            "status": DisplayStatus::RetrievalFailure,
            "message": LOAD_FAILED,
            "error": message,
        }))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

pub struct TextOutput {
    kind: ProgressSinkKind,
}

impl TextOutput {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self { kind }
    }

    pub fn print_browse(result: &BrowseResult) {
        println!("{CYAN}{}{RESET}", result.message);
        if result.status == DisplayStatus::NoResults {
            println!("{YELLOW}{NO_RESULTS}{RESET}");
            return;
        }
        print_table(&result.rows);
        let pages = result.total.div_ceil(crate::controller::PAGE_SIZE);
        println!("page {}/{} ({} rows)", result.page, pages.max(1), result.total);
    }

    pub fn print_pipeline(result: &PipelineResult) {
        println!("{CYAN}{}{RESET}", result.message);
        let report = &result.report;
        print_series("phase 1&2 modalities", &report.criteria_charts.modality);
        print_series("phase 1&2 tasks", &report.criteria_charts.task);
        if let Some(selection) = &report.selection_charts {
            print_series("phase 3 modalities", &selection.modality);
            print_series("phase 3 tasks", &selection.task);
        }
        println!(
            "{GREEN}{:<20} {:>9} {:>14} {:>6} {:>7}{RESET}",
            "modality", "datasets", "images", "orgs", "ratio"
        );
        for row in &report.summary {
            println!(
                "{:<20} {:>9} {:>14} {:>6} {:>7.3}",
                row.modality,
                row.datasets,
                format_thousands(row.images),
                row.organizations,
                row.ratio
            );
        }
        if result.status == DisplayStatus::NoResults {
            println!("{YELLOW}{NO_RESULTS}{RESET}");
        }
    }

    pub fn print_charts(result: &ChartsResult) {
        println!("{CYAN}{}{RESET}", result.message);
        if let Some((chart, label)) = &result.highlight {
            println!("{YELLOW}selected {chart:?}: {label}{RESET}");
        }
        print_series("dimension", &result.charts.dimension);
        print_series("modality", &result.charts.modality);
        print_series("task", &result.charts.task);
    }

    pub fn print_options(result: &FilterOptions) {
        println!("{GREEN}modalities{RESET}: {}", result.modalities.join(", "));
        println!("{GREEN}tasks{RESET}: {}", result.tasks.join(", "));
    }

    pub fn print_health(result: &HealthResult) {
        println!(
            "{GREEN}ok{RESET}: {} datasets from {}",
            result.count, result.source
        );
    }

    pub fn print_failure(message: &str) {
        eprintln!("{RED}{LOAD_FAILED}{RESET}: {message}");
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!(
                "[{:?}] {} ({} ms)",
                self.kind,
                event.message,
                elapsed.as_millis()
            ),
            None => eprintln!("[{:?}] {}", self.kind, event.message),
        }
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

fn joined_or_na(values: &[String]) -> String {
    if values.is_empty() {
        "N/A".to_string()
    } else {
        values.join(", ")
    }
}

fn print_table(rows: &[Dataset]) {
    println!(
        "{GREEN}{:<32} {:<16} {:<16} {:<20} {:<14} {:>12} {:<6} {:<20} {:<12} {}{RESET}",
        "name",
        "dimension",
        "modality",
        "task",
        "organ",
        "images",
        "year",
        "organization",
        "license",
        "link"
    );
    for row in rows {
        println!(
            "{:<32} {:<16} {:<16} {:<20} {:<14} {:>12} {:<6} {:<20} {:<12} {}",
            or_na(&row.name),
            joined_or_na(&row.dimension),
            joined_or_na(&row.modality),
            joined_or_na(&row.task),
            or_na(&row.organ),
            format_thousands(row.data_volume_total),
            or_na(&row.year),
            or_na(&row.organization),
            or_na(&row.license),
            or_na(&row.link),
        );
    }
}

fn print_series(title: &str, series: &ChartSeries) {
    println!("{GREEN}{title}{RESET}");
    if series.is_empty() {
        println!("  (none)");
        return;
    }
    for (label, count) in series.labels.iter().zip(&series.counts) {
        println!("  {label:<24} {count}");
    }
}
