//! The soil/weather sample and its field metadata.
//!
//! ## Feature order
//! The classifier sees a bare 7-element vector. Artifacts carry no column
//! names, so the order below cannot be checked at load time: it must match
//! the column order the model was trained on. Change it only together with
//! the model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of inputs the classifier takes
pub const FEATURE_COUNT: usize = 7;

/// Column order of the classifier input vector
pub const FEATURE_ORDER: [Field; FEATURE_COUNT] = [
    Field::Nitrogen,
    Field::Phosphorus,
    Field::Potassium,
    Field::Temperature,
    Field::Humidity,
    Field::Ph,
    Field::Rainfall,
];

/// One of the seven readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Nitrogen,
    Phosphorus,
    Potassium,
    Ph,
    Temperature,
    Humidity,
    Rainfall,
}

/// Inclusive validation range plus the value a fresh form starts with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl FieldBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Field {
    /// Form fields in display order
    pub const FORM_ORDER: [Field; FEATURE_COUNT] = [
        Field::Nitrogen,
        Field::Phosphorus,
        Field::Potassium,
        Field::Ph,
        Field::Temperature,
        Field::Humidity,
        Field::Rainfall,
    ];

    pub const fn bounds(self) -> FieldBounds {
        let (min, max, default) = match self {
            Field::Nitrogen => (0.0, 140.0, 50.0),
            Field::Phosphorus => (5.0, 145.0, 50.0),
            Field::Potassium => (5.0, 205.0, 50.0),
            Field::Ph => (3.0, 10.0, 6.5),
            Field::Temperature => (0.0, 50.0, 25.0),
            Field::Humidity => (10.0, 100.0, 70.0),
            Field::Rainfall => (0.0, 300.0, 100.0),
        };
        FieldBounds { min, max, default }
    }

    /// Human-readable name used in messages
    pub fn label(self) -> &'static str {
        match self {
            Field::Nitrogen => "Nitrogen",
            Field::Phosphorus => "Phosphorus",
            Field::Potassium => "Potassium",
            Field::Ph => "pH",
            Field::Temperature => "Temperature",
            Field::Humidity => "Humidity",
            Field::Rainfall => "Rainfall",
        }
    }

    /// Name of the form/JSON field
    pub fn key(self) -> &'static str {
        match self {
            Field::Nitrogen => "nitrogen",
            Field::Phosphorus => "phosphorus",
            Field::Potassium => "potassium",
            Field::Ph => "ph",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Rainfall => "rainfall",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Field::Nitrogen | Field::Phosphorus | Field::Potassium => "kg/ha",
            Field::Ph => "",
            Field::Temperature => "°C",
            Field::Humidity => "%",
            Field::Rainfall => "mm",
        }
    }

    /// Step size for the form's number input
    pub fn step(self) -> f64 {
        match self {
            Field::Nitrogen | Field::Phosphorus | Field::Potassium | Field::Rainfall => 1.0,
            Field::Ph | Field::Temperature | Field::Humidity => 0.1,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The seven readings for one recommendation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilWeatherSample {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

impl SoilWeatherSample {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Nitrogen => self.nitrogen,
            Field::Phosphorus => self.phosphorus,
            Field::Potassium => self.potassium,
            Field::Ph => self.ph,
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Rainfall => self.rainfall,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Nitrogen => &mut self.nitrogen,
            Field::Phosphorus => &mut self.phosphorus,
            Field::Potassium => &mut self.potassium,
            Field::Ph => &mut self.ph,
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Rainfall => &mut self.rainfall,
        };
        *slot = value;
    }

    /// Builder-style `set`
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, value);
        self
    }

    /// Classifier input in `FEATURE_ORDER`
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        FEATURE_ORDER.map(|field| self.get(field))
    }
}

impl Default for SoilWeatherSample {
    /// Every field at its form default
    fn default() -> Self {
        let mut sample = Self {
            nitrogen: 0.0,
            phosphorus: 0.0,
            potassium: 0.0,
            ph: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            rainfall: 0.0,
        };
        for field in FEATURE_ORDER {
            sample.set(field, field.bounds().default);
        }
        sample
    }
}

/// A submission before validation; any field may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleInput {
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
}

impl SampleInput {
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Nitrogen => self.nitrogen,
            Field::Phosphorus => self.phosphorus,
            Field::Potassium => self.potassium,
            Field::Ph => self.ph,
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Rainfall => self.rainfall,
        }
    }
}

impl From<SoilWeatherSample> for SampleInput {
    fn from(sample: SoilWeatherSample) -> Self {
        Self {
            nitrogen: Some(sample.nitrogen),
            phosphorus: Some(sample.phosphorus),
            potassium: Some(sample.potassium),
            ph: Some(sample.ph),
            temperature: Some(sample.temperature),
            humidity: Some(sample.humidity),
            rainfall: Some(sample.rainfall),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_is_pinned() {
        let sample = SoilWeatherSample {
            nitrogen: 90.0,
            phosphorus: 42.0,
            potassium: 43.0,
            ph: 6.5,
            temperature: 20.9,
            humidity: 82.0,
            rainfall: 202.9,
        };
        assert_eq!(sample.to_features(), [90.0, 42.0, 43.0, 20.9, 82.0, 6.5, 202.9]);
    }

    #[test]
    fn test_defaults_match_bounds_table() {
        let sample = SoilWeatherSample::default();
        assert_eq!(sample.nitrogen, 50.0);
        assert_eq!(sample.phosphorus, 50.0);
        assert_eq!(sample.potassium, 50.0);
        assert_eq!(sample.ph, 6.5);
        assert_eq!(sample.temperature, 25.0);
        assert_eq!(sample.humidity, 70.0);
        assert_eq!(sample.rainfall, 100.0);
    }

    #[test]
    fn test_every_field_appears_once_in_each_order() {
        for order in [FEATURE_ORDER, Field::FORM_ORDER] {
            for field in FEATURE_ORDER {
                assert_eq!(order.iter().filter(|f| **f == field).count(), 1);
            }
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let ph = Field::Ph.bounds();
        assert!(ph.contains(3.0));
        assert!(ph.contains(10.0));
        assert!(!ph.contains(10.01));
        assert!(!ph.contains(f64::NAN));
    }

    #[test]
    fn test_sample_input_json_allows_missing_fields() {
        let input: SampleInput = serde_json::from_str(r#"{"nitrogen": 90, "ph": 6.5}"#).unwrap();
        assert_eq!(input.get(Field::Nitrogen), Some(90.0));
        assert_eq!(input.get(Field::Ph), Some(6.5));
        assert_eq!(input.get(Field::Rainfall), None);
    }
}
