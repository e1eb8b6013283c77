use std::time::{Duration, Instant};

use serde::Serialize;

use crate::charts::{ChartKind, ChartSelection, OverviewCharts};
use crate::config::FilterConfig;
use crate::controller::{Banner, Catalog, DisplayStatus, Event, PipelineReport, QuickChange};
use crate::domain::Dataset;
use crate::error::CatalogError;
use crate::normalize::normalize_records;
use crate::pipeline::PipelineStage;
use crate::quick::{FilterOptions, QuickFilter};
use crate::source::{RecordSource, SourceList, SourceLocation, fetch_first_available};

#[derive(Debug, Clone, Serialize)]
pub struct BrowseResult {
    pub status: DisplayStatus,
    pub banner: Banner,
    pub message: String,
    pub page: usize,
    pub total: usize,
    pub rows: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub status: DisplayStatus,
    pub banner: Banner,
    pub message: String,
    pub report: PipelineReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartsResult {
    pub status: DisplayStatus,
    pub message: String,
    pub highlight: Option<(ChartKind, String)>,
    pub charts: OverviewCharts,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub ok: bool,
    pub count: usize,
    pub source: String,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Load,
    Browse,
    Pipeline,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub catalog: Catalog,
    pub location: SourceLocation,
}

#[derive(Clone)]
pub struct App<S: RecordSource> {
    source: S,
    sources: SourceList,
}

impl<S: RecordSource> App<S> {
    pub fn new(source: S, sources: SourceList) -> Self {
        Self { source, sources }
    }

    pub fn load(&self, sink: &dyn ProgressSink) -> Result<Loaded, CatalogError> {
        let started = Instant::now();
        let retrieved = fetch_first_available(&self.source, &self.sources, sink)?;
        let datasets = normalize_records(&retrieved.records);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Normalize; {} records from {}",
                datasets.len(),
                retrieved.location
            ),
            elapsed: Some(started.elapsed()),
        });
        Ok(Loaded {
            catalog: Catalog::new(datasets),
            location: retrieved.location,
        })
    }

    pub fn health(&self, sink: &dyn ProgressSink) -> Result<HealthResult, CatalogError> {
        let loaded = self.load(sink)?;
        Ok(HealthResult {
            ok: true,
            count: loaded.catalog.datasets().len(),
            source: loaded.location.to_string(),
        })
    }

    pub fn options(&self, sink: &dyn ProgressSink) -> Result<FilterOptions, CatalogError> {
        let loaded = self.load(sink)?;
        Ok(FilterOptions::collect(loaded.catalog.datasets()))
    }

    pub fn browse(
        &self,
        filter: QuickFilter,
        page: usize,
        sink: &dyn ProgressSink,
    ) -> Result<BrowseResult, CatalogError> {
        let catalog = self.load(sink)?.catalog;
        sink.event(ProgressEvent {
            message: "phase=Filter; applying quick filters".to_string(),
            elapsed: None,
        });
        let mut state = catalog.initial_state();
        let mut view = catalog.render(&state);
        for change in quick_changes(filter) {
            let recomputed = catalog.dispatch(&state, Event::Quick(change))?;
            state = recomputed.state;
            view = recomputed.view;
        }
        let page = page.max(1);
        Ok(BrowseResult {
            status: view.status(),
            message: view.banner.message(),
            page,
            total: view.displayed.len(),
            rows: view.page(page).to_vec(),
            banner: view.banner,
        })
    }

    pub fn pipeline(
        &self,
        config: &FilterConfig,
        stage: PipelineStage,
        sink: &dyn ProgressSink,
    ) -> Result<PipelineResult, CatalogError> {
        let catalog = self.load(sink)?.catalog;
        sink.event(ProgressEvent {
            message: format!("phase=Pipeline; running {}", stage.label()),
            elapsed: None,
        });
        let recomputed = catalog.run_pipeline(config, stage);
        let view = recomputed.view;
        let status = view.status();
        let message = view.banner.message();
        let report = view.pipeline.ok_or_else(|| {
            CatalogError::InvalidStage(format!("{} produced no report", stage.label()))
        })?;
        Ok(PipelineResult {
            status,
            banner: view.banner,
            message,
            report,
        })
    }

    pub fn charts(
        &self,
        click: Option<(ChartKind, ChartSelection)>,
        sink: &dyn ProgressSink,
    ) -> Result<ChartsResult, CatalogError> {
        let catalog = self.load(sink)?.catalog;
        let state = catalog.initial_state();
        let recomputed = match click {
            Some((chart, selection)) => {
                catalog.dispatch(&state, Event::ChartClick { chart, selection })?
            }
            None => {
                let view = catalog.render(&state);
                crate::controller::Recomputed { state, view }
            }
        };
        Ok(ChartsResult {
            status: recomputed.view.status(),
            message: recomputed.view.banner.message(),
            highlight: recomputed.state.highlight,
            charts: recomputed.view.charts,
        })
    }
}

fn quick_changes(filter: QuickFilter) -> Vec<QuickChange> {
    let mut changes = Vec::new();
    if !filter.search.is_empty() {
        changes.push(QuickChange::Search(filter.search));
    }
    if filter.dimension.is_some() {
        changes.push(QuickChange::Dimension(filter.dimension));
    }
    if !filter.include_mixed {
        changes.push(QuickChange::IncludeMixed(false));
    }
    if filter.modality.is_some() {
        changes.push(QuickChange::Modality(filter.modality));
    }
    if filter.task.is_some() {
        changes.push(QuickChange::Task(filter.task));
    }
    changes
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::output::JsonOutput;

    struct FixedSource(Value);

    impl RecordSource for FixedSource {
        fn fetch_json(&self, _location: &SourceLocation) -> Result<Value, CatalogError> {
            Ok(self.0.clone())
        }
    }

    fn app() -> App<FixedSource> {
        let records = json!({ "rows": [
            { "name": "LIDC", "organization": "NCI", "modality": "CT", "dimension": ["3D CT"], "data_volume_total": "1,018" },
            { "name": "BraTS", "organization": "MICCAI", "modality": ["MRI"], "task": ["segmentation"], "dimension": "3D MRI", "images": 2000 },
            { "name": "Kvasir", "organization": "Simula", "modality": ["Endoscopy"], "dimension": ["video", "2D"], "number": "8000" }
        ]});
        let sources = SourceList::new(vec!["memory".parse().unwrap()]);
        App::new(FixedSource(records), sources)
    }

    #[test]
    fn browse_pages_the_filtered_collection() {
        let filter = QuickFilter {
            search: "b".to_string(),
            ..QuickFilter::default()
        };
        let result = app().browse(filter, 1, &JsonOutput).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.rows[0].name, "BraTS");
        assert_eq!(result.banner.images, 2000.0);
        assert!(result.banner.via.ends_with("+ Quick filters"));
    }

    #[test]
    fn browse_reports_empty_results() {
        let filter = QuickFilter {
            modality: Some("PET".to_string()),
            ..QuickFilter::default()
        };
        let result = app().browse(filter, 1, &JsonOutput).unwrap();
        assert_eq!(result.status, DisplayStatus::NoResults);
        assert!(result.message.starts_with("Found 0 matching datasets."));
    }

    #[test]
    fn pipeline_returns_summary() {
        let config = FilterConfig {
            dimension: Some(crate::domain::DimensionChoice::ThreeD),
            ..FilterConfig::default()
        };
        let result = app()
            .pipeline(&config, PipelineStage::Criteria, &JsonOutput)
            .unwrap();
        assert_eq!(result.banner.datasets, 2);
        assert_eq!(result.banner.images, 3018.0);
        assert_eq!(result.report.summary.len(), 2);
    }

    #[test]
    fn health_counts_records() {
        let health = app().health(&JsonOutput).unwrap();
        assert!(health.ok);
        assert_eq!(health.count, 3);
        assert_eq!(health.source, "memory");
    }
}
