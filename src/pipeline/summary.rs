use std::collections::HashMap;

use serde::Serialize;

use crate::config::FilterCriteria;
use crate::domain::Dataset;
use crate::pipeline::group_by_modality;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub modality: String,
    pub datasets: usize,
    pub images: f64,
    pub organizations: usize,
    pub selected_datasets: usize,
    pub selected_images: f64,
    pub ratio: f64,
}

pub fn summarize(
    all: &[Dataset],
    selected: &[Dataset],
    criteria: &FilterCriteria,
) -> Vec<SummaryRow> {
    let selected_groups = group_by_modality(selected, criteria)
        .into_iter()
        .map(|(modality, group)| (modality, (group.names.len(), group.volume)))
        .collect::<HashMap<_, _>>();

    let mut rows = group_by_modality(all, criteria)
        .into_iter()
        .map(|(modality, group)| {
            let all_count = group.names.len();
            let (selected_datasets, selected_images) =
                selected_groups.get(modality).copied().unwrap_or((0, 0.0));
            let ratio_count = if selected_groups.contains_key(modality) {
                selected_datasets
            } else {
                all_count
            };
            let ratio = if all_count > 0 {
                (ratio_count as f64 / all_count as f64).min(1.0)
            } else {
                0.0
            };
            SummaryRow {
                modality: modality.to_string(),
                datasets: all_count,
                images: group.volume,
                organizations: group.organizations.len(),
                selected_datasets,
                selected_images,
                ratio,
            }
        })
        .collect::<Vec<_>>();

    rows.sort_by(|left, right| right.datasets.cmp(&left.datasets));
    rows
}
