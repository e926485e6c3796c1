use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Describes one bounded numeric input control
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FeatureSpec {
    /// Field name as used by the model artifact and the API
    pub name: &'static str,
    /// Human-readable label
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
    pub help: &'static str,
}

impl FeatureSpec {
    /// Returns true when `value` is finite and inside the inclusive range
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// The four audio features, in canonical order
pub const FEATURES: [FeatureSpec; 4] = [
    FeatureSpec {
        name: "acousticness",
        label: "Acousticness",
        min: 0.0,
        max: 1.0,
        default: 0.5,
        step: 0.01,
        help: "Higher values represent more acoustic-sounding songs.",
    },
    FeatureSpec {
        name: "instrumentalness",
        label: "Instrumentalness",
        min: 0.0,
        max: 1.0,
        default: 0.05,
        step: 0.01,
        help: "Higher values indicate a greater chance of the track having no vocals.",
    },
    FeatureSpec {
        name: "loudness",
        label: "Loudness (dB)",
        min: -60.0,
        max: 0.0,
        default: -10.0,
        step: 0.1,
        help: "The overall loudness of the track in decibels.",
    },
    FeatureSpec {
        name: "energy",
        label: "Energy",
        min: 0.0,
        max: 1.0,
        default: 0.7,
        step: 0.01,
        help: "Measures intensity and activity (e.g., fast, noisy, dynamic).",
    },
];

/// Validated user preferences for one recommendation request
///
/// Fields are private so a vector can only exist once every value has been
/// checked against its [`FeatureSpec`] range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    acousticness: f64,
    instrumentalness: f64,
    loudness: f64,
    energy: f64,
}

impl FeatureVector {
    /// Creates a feature vector, rejecting out-of-range or non-finite values
    pub fn new(
        acousticness: f64,
        instrumentalness: f64,
        loudness: f64,
        energy: f64,
    ) -> AppResult<Self> {
        let values = [acousticness, instrumentalness, loudness, energy];

        for (spec, value) in FEATURES.iter().zip(values) {
            if !spec.contains(value) {
                return Err(AppError::InvalidInput(format!(
                    "{} must be between {} and {} (got {})",
                    spec.name, spec.min, spec.max, value
                )));
            }
        }

        Ok(Self {
            acousticness,
            instrumentalness,
            loudness,
            energy,
        })
    }

    pub fn acousticness(&self) -> f64 {
        self.acousticness
    }

    pub fn instrumentalness(&self) -> f64 {
        self.instrumentalness
    }

    pub fn loudness(&self) -> f64 {
        self.loudness
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Values in canonical [`FEATURES`] order
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.acousticness,
            self.instrumentalness,
            self.loudness,
            self.energy,
        ]
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            acousticness: FEATURES[0].default,
            instrumentalness: FEATURES[1].default,
            loudness: FEATURES[2].default,
            energy: FEATURES[3].default,
        }
    }
}
