//! Input validation.
//!
//! Every violation is collected, not just the first, so the user can fix the
//! whole form in one go. Nothing here touches the classifier.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::sample::{Field, SampleInput, SoilWeatherSample, FEATURE_ORDER};

/// What is wrong with one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    NotANumber { raw: String },
    NotFinite,
    OutOfRange { value: f64, min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: Field,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{} is required", self.field),
            ViolationKind::NotANumber { raw } => {
                write!(f, "{} must be a number, got '{}'", self.field, raw)
            }
            ViolationKind::NotFinite => write!(f, "{} must be a finite number", self.field),
            ViolationKind::OutOfRange { value, min, max } => write!(
                f,
                "{} = {} is outside the allowed range {} to {}",
                self.field, value, min, max
            ),
        }
    }
}

/// One or more fields failed validation
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("Invalid input: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Offending fields, in classifier column order
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.violations.iter().map(|v| v.field)
    }

    pub fn mentions(&self, field: Field) -> bool {
        self.fields().any(|f| f == field)
    }

    pub fn violation_for(&self, field: Field) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

/// Check a present value against its field's bounds
pub fn check_value(field: Field, value: f64) -> Result<f64, FieldViolation> {
    if !value.is_finite() {
        return Err(FieldViolation {
            field,
            kind: ViolationKind::NotFinite,
        });
    }
    let bounds = field.bounds();
    if !bounds.contains(value) {
        return Err(FieldViolation {
            field,
            kind: ViolationKind::OutOfRange {
                value,
                min: bounds.min,
                max: bounds.max,
            },
        });
    }
    Ok(value)
}

/// Parse a text value from a form; blank counts as missing
pub fn parse_value(field: Field, raw: Option<&str>) -> Result<f64, FieldViolation> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(FieldViolation {
            field,
            kind: ViolationKind::Missing,
        });
    }
    let value: f64 = text.parse().map_err(|_| FieldViolation {
        field,
        kind: ViolationKind::NotANumber {
            raw: text.to_string(),
        },
    })?;
    check_value(field, value)
}

/// Run `check` over every field and assemble a sample, or all violations
fn collect_fields<F>(mut check: F) -> Result<SoilWeatherSample, ValidationError>
where
    F: FnMut(Field) -> Result<f64, FieldViolation>,
{
    let mut sample = SoilWeatherSample::default();
    let mut violations = Vec::new();

    for field in FEATURE_ORDER {
        match check(field) {
            Ok(value) => sample.set(field, value),
            Err(violation) => violations.push(violation),
        }
    }

    if violations.is_empty() {
        Ok(sample)
    } else {
        Err(ValidationError { violations })
    }
}

impl SoilWeatherSample {
    /// Build a sample from one check per field, collecting every violation
    ///
    /// `check` is called once for each field in `FEATURE_ORDER`; callers
    /// decoding their own input format use it with `check_value`.
    pub fn from_fields<F>(check: F) -> Result<Self, ValidationError>
    where
        F: FnMut(Field) -> Result<f64, FieldViolation>,
    {
        collect_fields(check)
    }

    /// Check every field is finite and inside its bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        collect_fields(|field| check_value(field, self.get(field))).map(|_| ())
    }

    /// Build a sample from text fields (e.g. an HTML form)
    pub fn parse_text<'a, F>(mut raw: F) -> Result<Self, ValidationError>
    where
        F: FnMut(Field) -> Option<&'a str>,
    {
        collect_fields(|field| parse_value(field, raw(field)))
    }
}

impl SampleInput {
    /// Validate into a complete sample; missing fields are errors, never defaulted
    pub fn into_sample(self) -> Result<SoilWeatherSample, ValidationError> {
        collect_fields(|field| match self.get(field) {
            Some(value) => check_value(field, value),
            None => Err(FieldViolation {
                field,
                kind: ViolationKind::Missing,
            }),
        })
    }
}

impl TryFrom<SampleInput> for SoilWeatherSample {
    type Error = ValidationError;

    fn try_from(input: SampleInput) -> Result<Self, Self::Error> {
        input.into_sample()
    }
}
