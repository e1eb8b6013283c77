use crate::config::{FilterCriteria, parse_year};
use crate::domain::{Dataset, DimensionChoice};

pub fn run_criteria(datasets: &[Dataset], criteria: &FilterCriteria) -> Vec<Dataset> {
    let matcher = CriteriaMatcher::new(criteria);
    let kept = datasets
        .iter()
        .filter(|dataset| matcher.matches(dataset))
        .cloned()
        .collect::<Vec<_>>();
    tracing::debug!(input = datasets.len(), kept = kept.len(), "phase 1&2 criteria");
    kept
}

struct CriteriaMatcher<'a> {
    criteria: &'a FilterCriteria,
    modalities: Option<Vec<String>>,
    task_types: Option<Vec<String>>,
    licenses: Option<Vec<String>>,
    anatomy: Option<Vec<String>>,
}

impl<'a> CriteriaMatcher<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        Self {
            criteria,
            modalities: lowered_non_empty(criteria.modalities.as_deref()),
            task_types: lowered_non_empty(criteria.task_types.as_deref()),
            licenses: lowered_non_empty(criteria.license_allowlist.as_deref()),
            anatomy: lowered_non_empty(criteria.anatomy_whitelist.as_deref()),
        }
    }

    fn matches(&self, dataset: &Dataset) -> bool {
        self.dimension_ok(dataset)
            && intersects(&dataset.modality, self.modalities.as_deref())
            && intersects(&dataset.task, self.task_types.as_deref())
            && self.license_ok(dataset)
            && (self.criteria.include_unlabeled || !dataset.task.is_empty())
            && self
                .criteria
                .min_images
                .is_none_or(|min| dataset.data_volume_total >= min)
            && self.anatomy_ok(dataset)
            && self.release_year_ok(dataset)
    }

    fn dimension_ok(&self, dataset: &Dataset) -> bool {
        let Some(choice) = self.criteria.dimension else {
            return true;
        };
        let flags = dataset.dim_flags();
        match choice {
            DimensionChoice::TwoD => flags.has_2d || (self.criteria.allow_3d_as_2d && flags.has_3d),
            DimensionChoice::ThreeD => flags.has_3d,
            DimensionChoice::Video => flags.has_video,
        }
    }

    fn license_ok(&self, dataset: &Dataset) -> bool {
        let Some(licenses) = &self.licenses else {
            return true;
        };
        let license = dataset.license.to_lowercase();
        licenses.contains(&license)
    }

    fn anatomy_ok(&self, dataset: &Dataset) -> bool {
        let Some(terms) = &self.anatomy else {
            return true;
        };
        let organ = dataset.organ.to_lowercase();
        terms.iter().any(|term| organ.contains(term.as_str()))
    }

    fn release_year_ok(&self, dataset: &Dataset) -> bool {
        let Some(min) = self.criteria.release_year_min else {
            return true;
        };
        parse_year(&dataset.year).is_some_and(|year| year >= min)
    }
}

fn lowered_non_empty(values: Option<&[String]>) -> Option<Vec<String>> {
    values
        .filter(|values| !values.is_empty())
        .map(|values| values.iter().map(|value| value.to_lowercase()).collect())
}

fn intersects(tags: &[String], wanted: Option<&[String]>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    tags.iter()
        .any(|tag| wanted.contains(&tag.to_lowercase()))
}
