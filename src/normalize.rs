use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::Dataset;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("valid numeric strip pattern"));

const LINK_FIELDS: [&str; 2] = ["link", "homepage_url"];
const YEAR_FIELDS: [&str; 3] = ["year", "release_year", "release_date"];
const MODALITY_FIELDS: [&str; 2] = ["modality", "modalities"];
const TASK_FIELDS: [&str; 2] = ["task", "task_types"];
const VOLUME_FIELDS: [&str; 3] = ["data_volume_total", "images", "number"];

pub fn normalize_records(records: &[Value]) -> Vec<Dataset> {
    let datasets = records.iter().map(normalize_record).collect::<Vec<_>>();
    tracing::debug!(records = datasets.len(), "normalized records");
    datasets
}

pub fn normalize_record(record: &Value) -> Dataset {
    Dataset {
        name: string_field(record, "name"),
        organization: string_field(record, "organization"),
        organ: string_field(record, "organ"),
        license: string_field(record, "license"),
        link: sanitize_link(&value_to_string(first_present(record, &LINK_FIELDS))),
        year: value_to_string(first_present(record, &YEAR_FIELDS)),
        dimension: to_tags(record.get("dimension")),
        modality: to_tags(first_present(record, &MODALITY_FIELDS)),
        task: to_tags(first_present(record, &TASK_FIELDS)),
        data_volume_total: sanitize_number(first_present(record, &VOLUME_FIELDS)),
    }
}

fn first_present<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|value| !value.is_null())
}

fn string_field(record: &Value, field: &str) -> String {
    value_to_string(record.get(field))
}

fn value_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(other) => stringify(other),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

pub fn to_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        Some(scalar) => vec![stringify(scalar)],
    }
}

pub fn sanitize_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => {
            let cleaned = NON_NUMERIC.replace_all(text, "");
            if cleaned.is_empty() {
                0.0
            } else {
                cleaned.parse::<f64>().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    };
    if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        0.0
    }
}

pub fn sanitize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else {
        String::new()
    }
}
