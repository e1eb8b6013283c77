use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use serde::Serialize;

use crate::config::FilterCriteria;
use crate::domain::Dataset;

pub mod criteria;
pub mod selection;
pub mod summary;

pub use criteria::run_criteria;
pub use selection::run_selection;
pub use summary::{SummaryRow, summarize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[value(alias = "phase12", alias = "p12")]
    Criteria,
    #[value(alias = "phase3", alias = "phase34", alias = "p34")]
    Selection,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Criteria => "Phase 1&2",
            PipelineStage::Selection => "Phase 3&4",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub stage: PipelineStage,
    pub criteria_output: Vec<Dataset>,
    pub selection_output: Option<Vec<Dataset>>,
    pub summary: Vec<SummaryRow>,
}

impl PipelineRun {
    pub fn output(&self) -> &[Dataset] {
        self.selection_output
            .as_deref()
            .unwrap_or(&self.criteria_output)
    }
}

pub fn run_pipeline(
    datasets: &[Dataset],
    criteria: &FilterCriteria,
    stage: PipelineStage,
) -> PipelineRun {
    let criteria_output = run_criteria(datasets, criteria);
    let selection_output = match stage {
        PipelineStage::Criteria => None,
        PipelineStage::Selection => Some(run_selection(&criteria_output, criteria, true)),
    };
    let selected = selection_output.as_deref().unwrap_or(&criteria_output);
    let summary = summarize(&criteria_output, selected, criteria);
    tracing::info!(
        stage = stage.label(),
        kept = criteria_output.len(),
        selected = selected.len(),
        modalities = summary.len(),
        "pipeline run"
    );
    PipelineRun {
        stage,
        criteria_output,
        selection_output,
        summary,
    }
}

#[derive(Debug, Default)]
pub(crate) struct ModalityGroup<'a> {
    pub names: HashSet<&'a str>,
    pub organizations: HashSet<&'a str>,
    pub volume: f64,
}

pub(crate) fn group_by_modality<'a>(
    datasets: &'a [Dataset],
    criteria: &FilterCriteria,
) -> Vec<(&'a str, ModalityGroup<'a>)> {
    let mut index = HashMap::<&str, usize>::new();
    let mut groups: Vec<(&str, ModalityGroup<'a>)> = Vec::new();
    for dataset in datasets {
        for modality in &dataset.modality {
            if !criteria.allows_modality(modality) {
                continue;
            }
            let slot = *index.entry(modality.as_str()).or_insert_with(|| {
                groups.push((modality.as_str(), ModalityGroup::default()));
                groups.len() - 1
            });
            let group = &mut groups[slot].1;
            group.names.insert(dataset.name.as_str());
            group.organizations.insert(dataset.organization_or_unknown());
            group.volume += dataset.data_volume_total;
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalityTotal {
    pub modality: String,
    pub datasets: usize,
    pub images: f64,
}

pub fn modality_totals(datasets: &[Dataset], criteria: &FilterCriteria) -> Vec<ModalityTotal> {
    group_by_modality(datasets, criteria)
        .into_iter()
        .map(|(modality, group)| ModalityTotal {
            modality: modality.to_string(),
            datasets: group.names.len(),
            images: group.volume,
        })
        .collect()
}
