use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Value, json};

use imaging_catalog::app::App;
use imaging_catalog::error::CatalogError;
use imaging_catalog::output::JsonOutput;
use imaging_catalog::source::{
    HttpRecordSource, RecordSource, SourceList, SourceLocation, extract_records,
};

fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).unwrap()
}

#[test]
fn loads_the_first_readable_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = utf8(dir.path().join("missing.json"));
    let scalar = utf8(dir.path().join("scalar.json"));
    let good = utf8(dir.path().join("cleaned_total.json"));
    fs::write(&scalar, "42").unwrap();
    fs::write(
        &good,
        json!([
            { "name": "LIDC", "modality": "CT", "data_volume_total": "1,018" },
            { "name": "BraTS", "modalities": ["MRI"], "images": 2000 }
        ])
        .to_string(),
    )
    .unwrap();

    let sources = SourceList::new(vec![
        SourceLocation::Path(missing),
        SourceLocation::Path(scalar),
        SourceLocation::Path(good.clone()),
    ]);
    let app = App::new(HttpRecordSource::new().unwrap(), sources);
    let loaded = app.load(&JsonOutput).unwrap();

    assert_eq!(loaded.location, SourceLocation::Path(good));
    let datasets = loaded.catalog.datasets();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].data_volume_total, 1018.0);
    assert_eq!(datasets[1].modality, vec!["MRI".to_string()]);
}

#[test]
fn every_candidate_failing_is_a_retrieval_error() {
    let dir = tempfile::tempdir().unwrap();
    let first = utf8(dir.path().join("a.json"));
    let second = utf8(dir.path().join("b.json"));
    let sources = SourceList::new(vec![
        SourceLocation::Path(first.clone()),
        SourceLocation::Path(second.clone()),
    ]);
    let app = App::new(HttpRecordSource::new().unwrap(), sources);

    let err = app.health(&JsonOutput).unwrap_err();
    assert_matches!(err, CatalogError::Retrieval { tried } => {
        assert_eq!(tried, vec![first.to_string(), second.to_string()]);
    });
}

#[test]
fn invalid_json_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let broken = utf8(dir.path().join("broken.json"));
    fs::write(&broken, "{ not json").unwrap();
    let source = HttpRecordSource::new().unwrap();
    let err = source
        .fetch_json(&SourceLocation::Path(broken))
        .unwrap_err();
    assert_matches!(err, CatalogError::SourceShape(_));
}

#[test]
fn payload_shapes() {
    assert_eq!(extract_records(json!([1, 2])).unwrap().len(), 2);
    assert_eq!(
        extract_records(json!({ "rows": [{ "name": "a" }] })).unwrap().len(),
        1
    );
    assert_matches!(
        extract_records(json!({ "items": [] })),
        Err(CatalogError::SourceShape(_))
    );
    assert_matches!(extract_records(Value::Null), Err(CatalogError::SourceShape(_)));
}

#[test]
fn locations_parse_by_scheme() {
    assert_eq!(
        "HTTPS://example.org/cleaned_total.json".parse::<SourceLocation>().unwrap(),
        SourceLocation::Url("HTTPS://example.org/cleaned_total.json".to_string())
    );
    assert_eq!(
        " ./static/data/cleaned_total.json ".parse::<SourceLocation>().unwrap(),
        SourceLocation::Path(Utf8PathBuf::from("./static/data/cleaned_total.json"))
    );
    assert_matches!(
        "  ".parse::<SourceLocation>(),
        Err(CatalogError::InvalidSource(_))
    );
}

struct FixedSource(Value);

impl RecordSource for FixedSource {
    fn fetch_json(&self, _location: &SourceLocation) -> Result<Value, CatalogError> {
        Ok(self.0.clone())
    }
}

#[test]
fn options_are_sorted_and_distinct() {
    let source = FixedSource(json!([
        { "name": "a", "modality": ["MRI", "CT"], "task": "segmentation" },
        { "name": "b", "modality": "CT", "task": ["classification", "segmentation"] }
    ]));
    let app = App::new(source, SourceList::new(vec!["memory".parse().unwrap()]));
    let options = app.options(&JsonOutput).unwrap();
    assert_eq!(options.modalities, vec!["CT".to_string(), "MRI".to_string()]);
    assert_eq!(
        options.tasks,
        vec!["classification".to_string(), "segmentation".to_string()]
    );
}
