use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use reqwest::blocking::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::CatalogError;

pub const SOURCE_ENV: &str = "CLEANED_JSON_PATH";
pub const DATA_FILE: &str = "cleaned_total.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Path(Utf8PathBuf),
    Url(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Path(path) => write!(f, "{path}"),
            SourceLocation::Url(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for SourceLocation {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidSource(value.to_string()));
        }
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Ok(SourceLocation::Url(trimmed.to_string()))
        } else {
            Ok(SourceLocation::Path(Utf8PathBuf::from(trimmed)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    candidates: Vec<SourceLocation>,
}

impl SourceList {
    pub fn new(candidates: Vec<SourceLocation>) -> Self {
        Self { candidates }
    }

    pub fn default_chain() -> Self {
        let mut candidates = Vec::new();
        if let Ok(value) = std::env::var(SOURCE_ENV) {
            if let Ok(location) = value.parse() {
                candidates.push(location);
            }
        }
        for path in [
            "./static/data/cleaned_total.json",
            "./cleaned_total.json",
            "./data/cleaned_total.json",
        ] {
            candidates.push(SourceLocation::Path(Utf8PathBuf::from(path)));
        }
        if let Some(dirs) = ProjectDirs::from("org", "imaging-catalog", "imaging-catalog") {
            if let Ok(dir) = Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()) {
                candidates.push(SourceLocation::Path(dir.join(DATA_FILE)));
            }
        }
        Self { candidates }
    }

    pub fn candidates(&self) -> &[SourceLocation] {
        &self.candidates
    }
}

pub trait RecordSource: Send + Sync {
    fn fetch_json(&self, location: &SourceLocation) -> Result<Value, CatalogError>;
}

#[derive(Clone)]
pub struct HttpRecordSource {
    client: Client,
}

impl HttpRecordSource {
    pub fn new() -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("imcat/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::SourceHttp(err.to_string()))?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CatalogError::SourceHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn fetch_url(&self, url: &str) -> Result<Value, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CatalogError::SourceHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "source request failed".to_string());
            return Err(CatalogError::SourceStatus { status, message });
        }
        response
            .json()
            .map_err(|err| CatalogError::SourceHttp(err.to_string()))
    }
}

impl RecordSource for HttpRecordSource {
    fn fetch_json(&self, location: &SourceLocation) -> Result<Value, CatalogError> {
        match location {
            SourceLocation::Url(url) => self.fetch_url(url),
            SourceLocation::Path(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|_| CatalogError::SourceRead(path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| CatalogError::SourceShape(format!("{path}: {err}")))
            }
        }
    }
}

pub fn extract_records(payload: Value) -> Result<Vec<Value>, CatalogError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove("rows") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(CatalogError::SourceShape(
                "object without a `rows` array".to_string(),
            )),
        },
        other => Err(CatalogError::SourceShape(format!(
            "unexpected top-level {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct Retrieved {
    pub location: SourceLocation,
    pub records: Vec<Value>,
}

pub fn fetch_first_available<S: RecordSource + ?Sized>(
    source: &S,
    candidates: &SourceList,
    sink: &dyn ProgressSink,
) -> Result<Retrieved, CatalogError> {
    for location in candidates.candidates() {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; probing {location}"),
            elapsed: None,
        });
        match source.fetch_json(location).and_then(extract_records) {
            Ok(records) => {
                tracing::info!(source = %location, records = records.len(), "loaded records");
                return Ok(Retrieved {
                    location: location.clone(),
                    records,
                });
            }
            Err(err) => {
                tracing::warn!(source = %location, error = %err, "source unavailable");
            }
        }
    }
    Err(CatalogError::Retrieval {
        tried: candidates
            .candidates()
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::output::JsonOutput;

    struct ScriptedSource {
        calls: Mutex<Vec<String>>,
    }

    impl RecordSource for ScriptedSource {
        fn fetch_json(&self, location: &SourceLocation) -> Result<Value, CatalogError> {
            self.calls.lock().unwrap().push(location.to_string());
            match location.to_string().as_str() {
                "broken" => Err(CatalogError::SourceStatus {
                    status: 404,
                    message: "missing".to_string(),
                }),
                "scalar" => Ok(json!("nope")),
                "rows" => Ok(json!({ "rows": [{ "name": "a" }] })),
                _ => Ok(json!([{ "name": "b" }, { "name": "c" }])),
            }
        }
    }

    fn list(items: &[&str]) -> SourceList {
        SourceList::new(items.iter().map(|s| s.parse().unwrap()).collect())
    }

    #[test]
    fn first_success_wins_and_each_candidate_is_tried_once() {
        let source = ScriptedSource {
            calls: Mutex::new(Vec::new()),
        };
        let candidates = list(&["broken", "scalar", "rows", "array"]);
        let retrieved = fetch_first_available(&source, &candidates, &JsonOutput).unwrap();
        assert_eq!(retrieved.location.to_string(), "rows");
        assert_eq!(retrieved.records.len(), 1);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["broken", "scalar", "rows"]
        );
    }

    #[test]
    fn all_candidates_failing_is_terminal() {
        let source = ScriptedSource {
            calls: Mutex::new(Vec::new()),
        };
        let err = fetch_first_available(&source, &list(&["broken", "scalar"]), &JsonOutput)
            .unwrap_err();
        assert_matches!(err, CatalogError::Retrieval { ref tried } if tried.len() == 2);
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn parse_locations() {
        assert_matches!(
            "https://example.org/data.json".parse::<SourceLocation>().unwrap(),
            SourceLocation::Url(_)
        );
        assert_matches!(
            "./data/cleaned_total.json".parse::<SourceLocation>().unwrap(),
            SourceLocation::Path(_)
        );
    }

    #[test]
    fn extract_rejects_objects_without_rows() {
        let err = extract_records(json!({ "data": [] })).unwrap_err();
        assert_matches!(err, CatalogError::SourceShape(_));
    }
}
