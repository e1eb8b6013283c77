use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::DimensionChoice;
use crate::error::CatalogError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default, deserialize_with = "lenient::dimension")]
    pub dimension: Option<DimensionChoice>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub modalities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub task_types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub license_allowlist: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub include_unlabeled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_valid_image_n_per_dataset: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub anatomy_whitelist: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub release_date_min: Option<i32>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub allow_3d_as_2d_sources: Option<bool>,
    #[serde(default, deserialize_with = "lenient::selection")]
    pub selection: Option<SelectionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub enable: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_datasets_per_modality: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_orgs_per_modality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub dimension: Option<DimensionChoice>,
    pub modalities: Option<Vec<String>>,
    pub task_types: Option<Vec<String>>,
    pub license_allowlist: Option<Vec<String>>,
    pub include_unlabeled: bool,
    pub min_images: Option<f64>,
    pub anatomy_whitelist: Option<Vec<String>>,
    pub release_year_min: Option<i32>,
    pub allow_3d_as_2d: bool,
    pub selection: SelectionCriteria,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionCriteria {
    pub enable: bool,
    pub min_datasets_per_modality: f64,
    pub min_orgs_per_modality: f64,
}

impl FilterCriteria {
    pub fn allows_modality(&self, modality: &str) -> bool {
        match &self.modalities {
            Some(allowed) => allowed.iter().any(|value| value == modality),
            None => true,
        }
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterConfig::default().resolve()
    }
}

impl FilterConfig {
    pub fn resolve(&self) -> FilterCriteria {
        let selection = self.selection.clone().unwrap_or_default();
        FilterCriteria {
            dimension: self.dimension,
            modalities: self.modalities.clone(),
            task_types: self.task_types.clone(),
            license_allowlist: self.license_allowlist.clone(),
            include_unlabeled: self.include_unlabeled != Some(false),
            min_images: self.min_valid_image_n_per_dataset,
            anatomy_whitelist: self.anatomy_whitelist.clone(),
            release_year_min: self.release_date_min,
            allow_3d_as_2d: self.allow_3d_as_2d_sources == Some(true),
            selection: SelectionCriteria {
                enable: selection.enable == Some(true),
                min_datasets_per_modality: selection.min_datasets_per_modality.unwrap_or(0.0),
                min_orgs_per_modality: selection.min_orgs_per_modality.unwrap_or(0.0),
            },
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_text(text: &str) -> Result<FilterConfig, CatalogError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| CatalogError::ConfigParse(err.to_string()))?;
        if !value.is_object() {
            return Err(CatalogError::ConfigParse(
                "top-level value must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|err| CatalogError::ConfigParse(err.to_string()))
    }

    pub fn from_path(path: &Utf8Path) -> Result<FilterConfig, CatalogError> {
        let content =
            fs::read_to_string(path).map_err(|_| CatalogError::ConfigRead(path.to_path_buf()))?;
        Self::from_text(&content)
    }
}

pub fn parse_year(raw: &str) -> Option<i32> {
    let prefix = raw.chars().take(4).collect::<String>();
    prefix.trim().parse().ok()
}

mod lenient {
    use super::*;

    fn strings_of(value: Value) -> Option<Vec<String>> {
        match value {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(text) => text,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    fn number_of(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        number.is_finite().then_some(number)
    }

    pub fn dimension<'de, D>(deserializer: D) -> Result<Option<DimensionChoice>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(|text| text.parse().ok()))
    }

    pub fn strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(strings_of(Value::deserialize(deserializer)?))
    }

    pub fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_bool())
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(number_of(&Value::deserialize(deserializer)?))
    }

    pub fn year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => parse_year(&text),
            Value::Number(number) if number.as_f64() == Some(0.0) => None,
            Value::Number(number) => parse_year(&number.to_string()),
            _ => None,
        })
    }

    pub fn selection<'de, D>(deserializer: D) -> Result<Option<SelectionConfig>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }
}
