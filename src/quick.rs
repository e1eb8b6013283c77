use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{Dataset, DimensionChoice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickFilter {
    pub search: String,
    pub dimension: Option<DimensionChoice>,
    pub include_mixed: bool,
    pub modality: Option<String>,
    pub task: Option<String>,
}

impl Default for QuickFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            dimension: None,
            include_mixed: true,
            modality: None,
            task: None,
        }
    }
}

impl QuickFilter {
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty()
            || self.dimension.is_some()
            || self.modality.is_some()
            || self.task.is_some()
            || !self.include_mixed
    }

    pub fn matches(&self, dataset: &Dataset) -> bool {
        self.matches_with_term(dataset, &self.search.trim().to_lowercase())
    }

    pub fn apply(&self, base: &[Dataset]) -> Vec<Dataset> {
        let term = self.search.trim().to_lowercase();
        base.iter()
            .filter(|dataset| self.matches_with_term(dataset, &term))
            .cloned()
            .collect()
    }

    fn matches_with_term(&self, dataset: &Dataset, term: &str) -> bool {
        self.matches_search(dataset, term)
            && self.matches_dimension(dataset)
            && self
                .modality
                .as_ref()
                .is_none_or(|wanted| dataset.modality.contains(wanted))
            && self
                .task
                .as_ref()
                .is_none_or(|wanted| dataset.task.contains(wanted))
    }

    fn matches_search(&self, dataset: &Dataset, term: &str) -> bool {
        term.is_empty()
            || [&dataset.name, &dataset.organization, &dataset.organ]
                .iter()
                .any(|field| field.to_lowercase().contains(term))
    }

    fn matches_dimension(&self, dataset: &Dataset) -> bool {
        let Some(choice) = self.dimension else {
            return true;
        };
        let flags = dataset.dim_flags();
        flags.has(choice) && (self.include_mixed || !flags.is_mixed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub modalities: Vec<String>,
    pub tasks: Vec<String>,
}

impl FilterOptions {
    pub fn collect(datasets: &[Dataset]) -> Self {
        let distinct = |field: fn(&Dataset) -> &Vec<String>| {
            datasets
                .iter()
                .flat_map(field)
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        };
        Self {
            modalities: distinct(|d| &d.modality),
            tasks: distinct(|d| &d.task),
        }
    }
}
