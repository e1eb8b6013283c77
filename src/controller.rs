use serde::Serialize;

use crate::charts::{ChartKind, ChartSelection, OverviewCharts, PhaseCharts};
use crate::config::{ConfigLoader, FilterConfig, FilterCriteria};
use crate::domain::{Dataset, DimensionChoice};
use crate::error::CatalogError;
use crate::pipeline::{ModalityTotal, PipelineStage, SummaryRow, modality_totals, run_pipeline};
use crate::quick::QuickFilter;

pub const PAGE_SIZE: usize = 100;
pub const ALL_DATASETS_LABEL: &str = "All datasets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    None,
    QuickFilter,
    Pipeline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeState {
    pub mode: Mode,
    pub base: Vec<Dataset>,
    pub base_label: String,
    pub last_config: Option<FilterCriteria>,
    pub last_stage: Option<PipelineStage>,
    pub quick: QuickFilter,
    pub pages: usize,
    pub highlight: Option<(ChartKind, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuickChange {
    Search(String),
    Dimension(Option<DimensionChoice>),
    IncludeMixed(bool),
    Modality(Option<String>),
    Task(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Quick(QuickChange),
    RunPipeline {
        stage: PipelineStage,
        config_text: String,
    },
    ChartClick {
        chart: ChartKind,
        selection: ChartSelection,
    },
    NextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Results,
    NoResults,
    RetrievalFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub rows: usize,
    pub datasets: usize,
    pub images: f64,
    pub via: String,
    pub by_modality: Option<Vec<ModalityTotal>>,
}

impl Banner {
    pub fn message(&self) -> String {
        if self.rows == 0 {
            return format!("Found 0 matching datasets. [via: {}]", self.via);
        }
        let listed = if self.rows == self.datasets {
            String::new()
        } else {
            format!(" ({} rows listed)", self.rows)
        };
        format!(
            "Found {} matching datasets, with approximately {} images in total{listed}. [via: {}]",
            self.datasets,
            format_thousands(self.images),
            self.via
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub stage: PipelineStage,
    pub criteria_charts: PhaseCharts,
    pub selection_charts: Option<PhaseCharts>,
    pub summary: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub displayed: Vec<Dataset>,
    pub banner: Banner,
    pub charts: OverviewCharts,
    pub pipeline: Option<PipelineReport>,
    pub visible_rows: usize,
}

impl View {
    pub fn status(&self) -> DisplayStatus {
        if self.displayed.is_empty() {
            DisplayStatus::NoResults
        } else {
            DisplayStatus::Results
        }
    }

    pub fn rows(&self) -> &[Dataset] {
        &self.displayed[..self.visible_rows]
    }

    pub fn page(&self, page: usize) -> &[Dataset] {
        let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
        if start >= self.displayed.len() {
            return &[];
        }
        let end = (start + PAGE_SIZE).min(self.displayed.len());
        &self.displayed[start..end]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recomputed {
    pub state: ModeState,
    pub view: View,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    datasets: Vec<Dataset>,
}

impl Catalog {
    pub fn new(datasets: Vec<Dataset>) -> Self {
        Self { datasets }
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn initial_state(&self) -> ModeState {
        ModeState {
            mode: Mode::None,
            base: self.datasets.clone(),
            base_label: ALL_DATASETS_LABEL.to_string(),
            last_config: None,
            last_stage: None,
            quick: QuickFilter::default(),
            pages: 1,
            highlight: None,
        }
    }

    pub fn dispatch(&self, state: &ModeState, event: Event) -> Result<Recomputed, CatalogError> {
        let next = match event {
            Event::Quick(change) => {
                let mut next = self.enter_quick_mode(state);
                apply_quick_change(&mut next.quick, change);
                next.highlight = None;
                next
            }
            Event::ChartClick { chart, selection } => {
                let mut next = self.enter_quick_mode(state);
                apply_chart_click(&mut next.quick, chart, &selection)?;
                next.highlight = selection
                    .filter_value()
                    .map(|label| (chart, label.to_string()));
                next
            }
            Event::RunPipeline { stage, config_text } => {
                let config = ConfigLoader::from_text(&config_text)?;
                self.enter_pipeline_mode(&config, stage)
            }
            Event::NextPage => {
                let mut next = state.clone();
                let shown = self.displayed(&next).len();
                if next.pages * PAGE_SIZE < shown {
                    next.pages += 1;
                }
                next
            }
        };
        let view = self.render(&next);
        Ok(Recomputed { state: next, view })
    }

    pub fn run_pipeline(&self, config: &FilterConfig, stage: PipelineStage) -> Recomputed {
        let state = self.enter_pipeline_mode(config, stage);
        let view = self.render(&state);
        Recomputed { state, view }
    }

    pub fn render(&self, state: &ModeState) -> View {
        let displayed = self.displayed(state);
        let banner = self.banner(state, &displayed);
        let charts = OverviewCharts::build(&displayed);
        let pipeline = match (&state.last_config, state.last_stage) {
            (Some(criteria), Some(stage)) if state.mode == Mode::Pipeline => {
                Some(self.pipeline_report(criteria, stage))
            }
            _ => None,
        };
        let visible_rows = (state.pages.max(1) * PAGE_SIZE).min(displayed.len());
        View {
            displayed,
            banner,
            charts,
            pipeline,
            visible_rows,
        }
    }

    fn displayed(&self, state: &ModeState) -> Vec<Dataset> {
        state.quick.apply(&state.base)
    }

    fn banner(&self, state: &ModeState, displayed: &[Dataset]) -> Banner {
        let via = if state.quick.is_active() {
            format!("{} + Quick filters", state.base_label)
        } else {
            state.base_label.clone()
        };
        match (state.mode, &state.last_config) {
            (Mode::Pipeline, Some(criteria)) => {
                let totals = modality_totals(&state.base, criteria);
                Banner {
                    rows: displayed.len(),
                    datasets: totals.iter().map(|t| t.datasets).sum(),
                    images: totals.iter().map(|t| t.images).sum(),
                    via,
                    by_modality: Some(totals),
                }
            }
            _ => Banner {
                rows: displayed.len(),
                datasets: displayed.len(),
                images: displayed.iter().map(|d| d.data_volume_total).sum(),
                via,
                by_modality: None,
            },
        }
    }

    fn pipeline_report(&self, criteria: &FilterCriteria, stage: PipelineStage) -> PipelineReport {
        let run = run_pipeline(&self.datasets, criteria, stage);
        PipelineReport {
            stage,
            criteria_charts: PhaseCharts::build(&run.criteria_output, criteria),
            selection_charts: run
                .selection_output
                .as_deref()
                .map(|selected| PhaseCharts::build(selected, criteria)),
            summary: run.summary,
        }
    }

    fn enter_quick_mode(&self, state: &ModeState) -> ModeState {
        if state.mode == Mode::QuickFilter {
            let mut next = state.clone();
            next.pages = 1;
            return next;
        }
        tracing::debug!(from = ?state.mode, "entering quick filter mode");
        ModeState {
            mode: Mode::QuickFilter,
            base: self.datasets.clone(),
            base_label: ALL_DATASETS_LABEL.to_string(),
            last_config: None,
            last_stage: None,
            quick: state.quick.clone(),
            pages: 1,
            highlight: None,
        }
    }

    fn enter_pipeline_mode(&self, config: &FilterConfig, stage: PipelineStage) -> ModeState {
        let criteria = config.resolve();
        let run = run_pipeline(&self.datasets, &criteria, stage);
        tracing::debug!(stage = stage.label(), base = run.output().len(), "entering pipeline mode");
        ModeState {
            mode: Mode::Pipeline,
            base: run.output().to_vec(),
            base_label: stage.label().to_string(),
            last_config: Some(criteria),
            last_stage: Some(stage),
            quick: QuickFilter::default(),
            pages: 1,
            highlight: None,
        }
    }
}

fn apply_quick_change(quick: &mut QuickFilter, change: QuickChange) {
    match change {
        QuickChange::Search(term) => quick.search = term,
        QuickChange::Dimension(choice) => quick.dimension = choice,
        QuickChange::IncludeMixed(include) => quick.include_mixed = include,
        QuickChange::Modality(value) => quick.modality = value.filter(|v| !v.is_empty()),
        QuickChange::Task(value) => quick.task = value.filter(|v| !v.is_empty()),
    }
}

fn apply_chart_click(
    quick: &mut QuickFilter,
    chart: ChartKind,
    selection: &ChartSelection,
) -> Result<(), CatalogError> {
    let value = selection.filter_value();
    match chart {
        ChartKind::Dimension => {
            quick.dimension = value.map(str::parse::<DimensionChoice>).transpose()?;
        }
        ChartKind::Modality => quick.modality = value.map(str::to_string),
        ChartKind::Task => quick.task = value.map(str::to_string),
    }
    Ok(())
}

pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn dataset(
        name: &str,
        organization: &str,
        modality: &str,
        dimension: &[&str],
        volume: f64,
    ) -> Dataset {
        Dataset {
            name: name.to_string(),
            organization: organization.to_string(),
            modality: vec![modality.to_string()],
            dimension: dimension.iter().map(|s| s.to_string()).collect(),
            data_volume_total: volume,
            ..Dataset::default()
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            dataset("ct-1", "a", "CT", &["3D CT"], 100.0),
            dataset("mr-1", "a", "MRI", &["3D MRI"], 10.0),
            dataset("mr-2", "b", "MRI", &["2D MRI", "3D MRI"], 20.0),
            dataset("mr-3", "c", "MRI", &["2D MRI"], 30.0),
        ])
    }

    #[test]
    fn starts_in_none_mode_over_everything() {
        let catalog = catalog();
        let state = catalog.initial_state();
        let view = catalog.render(&state);
        assert_eq!(state.mode, Mode::None);
        assert_eq!(view.banner.datasets, 4);
        assert_eq!(view.banner.images, 160.0);
        assert_eq!(view.banner.via, ALL_DATASETS_LABEL);
        assert_eq!(view.status(), DisplayStatus::Results);
    }

    #[test]
    fn bad_config_leaves_state_untouched() {
        let catalog = catalog();
        let state = catalog.initial_state();
        let err = catalog
            .dispatch(
                &state,
                Event::RunPipeline {
                    stage: PipelineStage::Criteria,
                    config_text: "{ not json".to_string(),
                },
            )
            .unwrap_err();
        assert_matches!(err, CatalogError::ConfigParse(_));
        assert_eq!(state, catalog.initial_state());
    }

    #[test]
    fn pipeline_resets_quick_controls() {
        let catalog = catalog();
        let state = catalog.initial_state();
        let quick = catalog
            .dispatch(&state, Event::Quick(QuickChange::Search("mr".to_string())))
            .unwrap();
        assert_eq!(quick.state.mode, Mode::QuickFilter);
        let piped = catalog
            .dispatch(
                &quick.state,
                Event::RunPipeline {
                    stage: PipelineStage::Criteria,
                    config_text: r#"{ "modalities": ["MRI"] }"#.to_string(),
                },
            )
            .unwrap();
        assert_eq!(piped.state.mode, Mode::Pipeline);
        assert_eq!(piped.state.quick, QuickFilter::default());
        assert_eq!(piped.state.base.len(), 3);
        assert_eq!(piped.view.banner.via, "Phase 1&2");
    }

    #[test]
    fn banner_matches_summary_after_criteria_run() {
        let catalog = catalog();
        let run = catalog.run_pipeline(&FilterConfig::default(), PipelineStage::Criteria);
        let report = run.view.pipeline.as_ref().unwrap();
        let rows_datasets: usize = report.summary.iter().map(|r| r.datasets).sum();
        let rows_images: f64 = report.summary.iter().map(|r| r.images).sum();
        assert_eq!(run.view.banner.datasets, rows_datasets);
        assert_eq!(run.view.banner.images, rows_images);
    }

    #[test]
    fn chart_click_sets_filter_and_highlight() {
        let catalog = catalog();
        let state = catalog.initial_state();
        let clicked = catalog
            .dispatch(
                &state,
                Event::ChartClick {
                    chart: ChartKind::Dimension,
                    selection: ChartSelection::Label("2D".to_string()),
                },
            )
            .unwrap();
        assert_eq!(clicked.state.quick.dimension, Some(DimensionChoice::TwoD));
        assert_eq!(
            clicked.state.highlight,
            Some((ChartKind::Dimension, "2D".to_string()))
        );
        assert_eq!(clicked.view.displayed.len(), 2);

        let typed = catalog
            .dispatch(&clicked.state, Event::Quick(QuickChange::IncludeMixed(false)))
            .unwrap();
        assert_eq!(typed.state.highlight, None);
        assert_eq!(typed.view.displayed.len(), 1);
    }

    #[test]
    fn next_page_stops_at_the_end() {
        let datasets = (0..250)
            .map(|i| dataset(&format!("d{i}"), "o", "CT", &["2D"], 1.0))
            .collect();
        let catalog = Catalog::new(datasets);
        let mut state = catalog.initial_state();
        for _ in 0..5 {
            state = catalog.dispatch(&state, Event::NextPage).unwrap().state;
        }
        assert_eq!(state.pages, 3);
        let view = catalog.render(&state);
        assert_eq!(view.rows().len(), 250);
        assert_eq!(view.page(3).len(), 50);
        assert!(view.page(4).is_empty());

        let reset = catalog
            .dispatch(&state, Event::Quick(QuickChange::Search("d1".to_string())))
            .unwrap();
        assert_eq!(reset.state.pages, 1);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(1234.0), "1,234");
        assert_eq!(format_thousands(1234567.4), "1,234,567");
        assert_eq!(format_thousands(-1000.0), "-1,000");
    }
}
