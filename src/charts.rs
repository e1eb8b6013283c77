use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::config::FilterCriteria;
use crate::domain::{Dataset, DimensionChoice};
use crate::error::CatalogError;

pub const TOP_N: usize = 8;
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
}

impl ChartSeries {
    fn from_pairs(pairs: Vec<(String, usize)>) -> Self {
        let (labels, counts) = pairs.into_iter().unzip();
        Self { labels, counts }
    }

    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|candidate| candidate == label)
            .map(|idx| self.counts[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    fn into_entries(self) -> Vec<(String, usize)> {
        self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Dimension,
    Modality,
    Task,
}

impl FromStr for ChartKind {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "dimension" => Ok(ChartKind::Dimension),
            "modality" => Ok(ChartKind::Modality),
            "task" => Ok(ChartKind::Task),
            _ => Err(CatalogError::InvalidChartSelection(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChartSelection {
    Label(String),
    Clear,
}

impl ChartSelection {
    pub fn filter_value(&self) -> Option<&str> {
        match self {
            ChartSelection::Label(label) if label != OTHER_LABEL => Some(label.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewCharts {
    pub dimension: ChartSeries,
    pub modality: ChartSeries,
    pub task: ChartSeries,
}

impl OverviewCharts {
    pub fn build(datasets: &[Dataset]) -> Self {
        Self {
            dimension: dimension_chart(datasets),
            modality: top_n_chart(datasets, |d| &d.modality, TOP_N),
            task: top_n_chart(datasets, |d| &d.task, TOP_N),
        }
    }

    pub fn series(&self, kind: ChartKind) -> &ChartSeries {
        match kind {
            ChartKind::Dimension => &self.dimension,
            ChartKind::Modality => &self.modality,
            ChartKind::Task => &self.task,
        }
    }
}

pub fn dimension_chart(datasets: &[Dataset]) -> ChartSeries {
    let choices = [
        DimensionChoice::TwoD,
        DimensionChoice::ThreeD,
        DimensionChoice::Video,
    ];
    let mut counts = [0usize; 3];
    for dataset in datasets {
        let flags = dataset.dim_flags();
        for (slot, choice) in choices.iter().enumerate() {
            if flags.has(*choice) {
                counts[slot] += 1;
            }
        }
    }
    ChartSeries {
        labels: choices.iter().map(|c| c.chart_label().to_string()).collect(),
        counts: counts.to_vec(),
    }
}

pub fn top_n_chart<F>(datasets: &[Dataset], field: F, top_n: usize) -> ChartSeries
where
    F: Fn(&Dataset) -> &Vec<String>,
{
    let mut tally = Tally::default();
    for dataset in datasets {
        for tag in field(dataset) {
            tally.add(tag);
        }
    }
    let mut entries = tally.into_entries();
    entries.sort_by(|left, right| right.1.cmp(&left.1));
    if entries.len() > top_n {
        let rest = entries.split_off(top_n);
        entries.push((OTHER_LABEL.to_string(), rest.iter().map(|(_, c)| c).sum()));
    }
    ChartSeries::from_pairs(entries)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseCharts {
    pub modality: ChartSeries,
    pub task: ChartSeries,
}

impl PhaseCharts {
    pub fn build(datasets: &[Dataset], criteria: &FilterCriteria) -> Self {
        let modalities = lowered(criteria.modalities.as_deref());
        let tasks = lowered(criteria.task_types.as_deref());
        let mut modality = Tally::default();
        let mut task = Tally::default();
        for dataset in datasets {
            for tag in dataset.modality.iter().filter(|t| allowed(t, &modalities)) {
                modality.add(tag);
            }
            for tag in dataset.task.iter().filter(|t| allowed(t, &tasks)) {
                task.add(tag);
            }
        }
        Self {
            modality: ChartSeries::from_pairs(modality.into_entries()),
            task: ChartSeries::from_pairs(task.into_entries()),
        }
    }
}

fn lowered(values: Option<&[String]>) -> Option<Vec<String>> {
    values.map(|values| values.iter().map(|v| v.to_lowercase()).collect())
}

fn allowed(tag: &str, allowlist: &Option<Vec<String>>) -> bool {
    allowlist
        .as_ref()
        .is_none_or(|allowed| allowed.contains(&tag.to_lowercase()))
}
