use std::collections::HashSet;

use crate::config::FilterCriteria;
use crate::domain::Dataset;
use crate::pipeline::group_by_modality;

pub fn kept_modalities(datasets: &[Dataset], criteria: &FilterCriteria) -> HashSet<String> {
    let thresholds = criteria.selection;
    group_by_modality(datasets, criteria)
        .into_iter()
        .filter(|(_, group)| {
            group.names.len() as f64 >= thresholds.min_datasets_per_modality
                && group.organizations.len() as f64 >= thresholds.min_orgs_per_modality
        })
        .map(|(modality, _)| modality.to_string())
        .collect()
}

pub fn run_selection(
    datasets: &[Dataset],
    criteria: &FilterCriteria,
    force_enable: bool,
) -> Vec<Dataset> {
    if !(force_enable || criteria.selection.enable) {
        return datasets.to_vec();
    }
    let keep = kept_modalities(datasets, criteria);
    let selected = datasets
        .iter()
        .filter(|dataset| dataset.modality.iter().any(|m| keep.contains(m)))
        .cloned()
        .collect::<Vec<_>>();
    tracing::debug!(
        input = datasets.len(),
        kept_modalities = keep.len(),
        selected = selected.len(),
        "phase 3 selection"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    fn dataset(name: &str, organization: &str, modality: &[&str]) -> Dataset {
        Dataset {
            name: name.to_string(),
            organization: organization.to_string(),
            modality: modality.iter().map(|s| s.to_string()).collect(),
            ..Dataset::default()
        }
    }

    fn criteria(json: &str) -> FilterCriteria {
        ConfigLoader::from_text(json).unwrap().resolve()
    }

    #[test]
    fn disabled_selection_passes_through() {
        let data = vec![dataset("a", "x", &["CT"])];
        let config = criteria(r#"{ "selection": { "min_datasets_per_modality": 5 } }"#);
        assert_eq!(run_selection(&data, &config, false), data);
    }

    #[test]
    fn forced_selection_applies_thresholds() {
        let data = vec![
            dataset("ct-1", "x", &["CT"]),
            dataset("mr-1", "x", &["MRI"]),
            dataset("mr-2", "y", &["MRI"]),
        ];
        let config = criteria(r#"{ "selection": { "min_datasets_per_modality": 2 } }"#);
        let selected = run_selection(&data, &config, true);
        let names = selected.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["mr-1", "mr-2"]);
    }

    #[test]
    fn organization_threshold_counts_distinct_orgs() {
        let data = vec![
            dataset("a", "x", &["CT"]),
            dataset("b", "x", &["CT"]),
            dataset("c", "", &["US"]),
            dataset("d", "y", &["US"]),
        ];
        let config = criteria(r#"{ "selection": { "enable": true, "min_orgs_per_modality": 2 } }"#);
        let keep = kept_modalities(&data, &config);
        assert!(keep.contains("US"));
        assert!(!keep.contains("CT"));
    }

    #[test]
    fn duplicate_names_count_once() {
        let data = vec![dataset("a", "x", &["CT"]), dataset("a", "y", &["CT"])];
        let config = criteria(r#"{ "selection": { "min_datasets_per_modality": 2 } }"#);
        assert!(run_selection(&data, &config, true).is_empty());
    }

    #[test]
    fn multi_modality_dataset_appears_once() {
        let data = vec![dataset("a", "x", &["CT", "MRI"])];
        let selected = run_selection(&data, &FilterCriteria::default(), true);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn output_is_subset_of_input() {
        let data = vec![
            dataset("a", "x", &["CT"]),
            dataset("b", "y", &["CT", "PET"]),
            dataset("c", "z", &[]),
        ];
        let config = criteria(r#"{ "modalities": ["PET"] }"#);
        let selected = run_selection(&data, &config, true);
        assert!(selected.iter().all(|d| data.contains(d)));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "b");
    }
}
