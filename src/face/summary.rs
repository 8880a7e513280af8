// a feature summary arrives in one of two shapes:
//
// flat:   { "eyeDistanceRatio": 0.45, ..., "gender": "남성", "age": 30 }
// nested: { "embedding": { "eyeDistanceRatio": 0.45, ... }, "gender": "남성", "age": 30 }
//
// every field is looked up under `embedding` first and then at the top level.
// values of the wrong JSON type and empty strings count as absent.

use super::{ANGULAR_CONTOUR, MALE, ROUND_CONTOUR};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub eye_distance_ratio: Option<f64>,
    pub eye_nose_ratio: Option<f64>,
    pub nose_mouth_ratio: Option<f64>,
    pub symmetry_score: Option<f64>,
    pub contour_features: Option<String>,
    pub gender: Option<String>,
    pub age: Option<f64>,
    pub image_quality_score: Option<f64>,
}

/// Values substituted by [`normalize`] for fields that are still absent after lookup.
pub struct Defaults {
    pub eye_distance_ratio: f64,
    pub eye_nose_ratio: f64,
    pub nose_mouth_ratio: f64,
    pub symmetry_score: f64,
    pub image_quality_score: f64,
}

pub const DEFAULTS: Defaults = Defaults {
    eye_distance_ratio: 0.45,
    eye_nose_ratio: 0.35,
    nose_mouth_ratio: 0.25,
    symmetry_score: 0.8,
    image_quality_score: 70.0,
};

impl Defaults {
    pub fn contour_for(&self, gender: Option<&str>) -> &'static str {
        if gender == Some(MALE) {
            ANGULAR_CONTOUR
        } else {
            ROUND_CONTOUR
        }
    }
}

impl FeatureSummary {
    pub fn with_defaults(self, defaults: &Defaults) -> Self {
        let contour_features = self
            .contour_features
            .unwrap_or_else(|| defaults.contour_for(self.gender.as_deref()).to_string());
        Self {
            eye_distance_ratio: self.eye_distance_ratio.or(Some(defaults.eye_distance_ratio)),
            eye_nose_ratio: self.eye_nose_ratio.or(Some(defaults.eye_nose_ratio)),
            nose_mouth_ratio: self.nose_mouth_ratio.or(Some(defaults.nose_mouth_ratio)),
            symmetry_score: self.symmetry_score.or(Some(defaults.symmetry_score)),
            contour_features: Some(contour_features),
            gender: self.gender,
            age: self.age,
            image_quality_score: self
                .image_quality_score
                .or(Some(defaults.image_quality_score)),
        }
    }
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("no stored feature summary")]
    Missing,
    #[error("stored feature summary is not a JSON object")]
    NotAnObject,
    #[error("malformed stored feature summary: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeatures {
    #[serde(default, deserialize_with = "lenient_number")]
    pub eye_distance_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub eye_nose_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub nose_mouth_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub symmetry_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contour_features: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub image_quality_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeatureSummary {
    #[serde(default, deserialize_with = "lenient_features")]
    pub embedding: Option<RawFeatures>,
    #[serde(flatten)]
    pub top: RawFeatures,
}

impl RawFeatureSummary {
    /// Reads whatever can be read; anything but a JSON object yields an empty summary.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }

    /// Parses a serialized summary as stored on a customer record.
    pub fn parse(text: &str) -> Result<Self, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::Missing);
        }
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(SummaryError::NotAnObject);
        }
        Ok(Self::deserialize(&value)?)
    }

    /// Supplies gender and age given next to the summary rather than inside it.
    pub fn fill_demographics(&mut self, gender: Option<String>, age: Option<f64>) {
        if self.top.gender.is_none() {
            self.top.gender = gender.filter(|g| !g.is_empty());
        }
        if self.top.age.is_none() {
            self.top.age = age.filter(|a| a.is_finite());
        }
    }

    fn pick<T: Clone>(&self, field: impl Fn(&RawFeatures) -> &Option<T>) -> Option<T> {
        self.embedding
            .as_ref()
            .and_then(|nested| field(nested).clone())
            .or_else(|| field(&self.top).clone())
    }
}

/// Two-path lookup only; absent fields stay absent.
pub fn resolve(raw: &RawFeatureSummary) -> FeatureSummary {
    FeatureSummary {
        eye_distance_ratio: raw.pick(|f| &f.eye_distance_ratio),
        eye_nose_ratio: raw.pick(|f| &f.eye_nose_ratio),
        nose_mouth_ratio: raw.pick(|f| &f.nose_mouth_ratio),
        symmetry_score: raw.pick(|f| &f.symmetry_score),
        contour_features: raw.pick(|f| &f.contour_features),
        gender: raw.pick(|f| &f.gender),
        age: raw.pick(|f| &f.age),
        image_quality_score: raw.pick(|f| &f.image_quality_score),
    }
}

/// Two-path lookup followed by [`DEFAULTS`]. Every feature field of the result is populated.
pub fn normalize(raw: &RawFeatureSummary) -> FeatureSummary {
    resolve(raw).with_defaults(&DEFAULTS)
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite()))
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_features<'de, D>(deserializer: D) -> Result<Option<RawFeatures>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| RawFeatures::deserialize(v).ok()))
}
