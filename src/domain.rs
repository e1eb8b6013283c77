use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Dataset {
    pub name: String,
    pub organization: String,
    pub organ: String,
    pub license: String,
    pub link: String,
    pub year: String,
    pub dimension: Vec<String>,
    pub modality: Vec<String>,
    pub task: Vec<String>,
    pub data_volume_total: f64,
}

impl Dataset {
    pub fn dim_flags(&self) -> DimFlags {
        DimFlags::classify(&self.dimension)
    }

    pub fn organization_or_unknown(&self) -> &str {
        if self.organization.is_empty() {
            UNKNOWN_ORGANIZATION
        } else {
            &self.organization
        }
    }
}

pub const UNKNOWN_ORGANIZATION: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
pub enum DimensionChoice {
    #[serde(rename = "2d")]
    #[value(name = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    #[value(name = "3d")]
    ThreeD,
    #[serde(rename = "video")]
    #[value(name = "video")]
    Video,
}

impl DimensionChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionChoice::TwoD => "2d",
            DimensionChoice::ThreeD => "3d",
            DimensionChoice::Video => "video",
        }
    }

    pub fn chart_label(&self) -> &'static str {
        match self {
            DimensionChoice::TwoD => "2D",
            DimensionChoice::ThreeD => "3D",
            DimensionChoice::Video => "video",
        }
    }
}

impl fmt::Display for DimensionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionChoice {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "2d" => Ok(DimensionChoice::TwoD),
            "3d" => Ok(DimensionChoice::ThreeD),
            "video" => Ok(DimensionChoice::Video),
            _ => Err(CatalogError::InvalidDimension(value.to_string())),
        }
    }
}

const DIMENSION_MARKERS: [(DimensionChoice, &str); 3] = [
    (DimensionChoice::TwoD, "2d"),
    (DimensionChoice::ThreeD, "3d"),
    (DimensionChoice::Video, "video"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DimFlags {
    pub has_2d: bool,
    pub has_3d: bool,
    pub has_video: bool,
    pub count: u8,
}

impl DimFlags {
    pub fn classify<S: AsRef<str>>(tags: &[S]) -> Self {
        let lowered = tags
            .iter()
            .map(|tag| tag.as_ref().to_lowercase())
            .collect::<Vec<_>>();
        let mut flags = DimFlags::default();
        for (choice, marker) in DIMENSION_MARKERS {
            if lowered.iter().any(|tag| tag.contains(marker)) {
                match choice {
                    DimensionChoice::TwoD => flags.has_2d = true,
                    DimensionChoice::ThreeD => flags.has_3d = true,
                    DimensionChoice::Video => flags.has_video = true,
                }
                flags.count += 1;
            }
        }
        flags
    }

    pub fn has(&self, choice: DimensionChoice) -> bool {
        match choice {
            DimensionChoice::TwoD => self.has_2d,
            DimensionChoice::ThreeD => self.has_3d,
            DimensionChoice::Video => self.has_video,
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.count > 1
    }
}
