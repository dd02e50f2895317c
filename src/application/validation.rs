//! Form validation: range, membership and type checks on a raw record.

use crate::domain::{CategoricalField, EncodingTable, Field, RawInput};

/// Inclusive range accepted for a numeric field.
struct NumericRule {
    field: Field,
    min: f64,
    max: f64,
}

const NUMERIC_RULES: [NumericRule; 6] = [
    NumericRule {
        field: Field::Age,
        min: 20.0,
        max: 100.0,
    },
    NumericRule {
        field: Field::RestingBp,
        min: 80.0,
        max: 220.0,
    },
    NumericRule {
        field: Field::Cholesterol,
        min: 100.0,
        max: 700.0,
    },
    NumericRule {
        field: Field::MaxHeartRate,
        min: 60.0,
        max: 220.0,
    },
    NumericRule {
        field: Field::StDepression,
        min: -5.0,
        max: 10.0,
    },
    NumericRule {
        field: Field::Vessels,
        min: 0.0,
        max: 3.0,
    },
];

const CATEGORICAL_FIELDS: [Field; 5] = [
    Field::Sex,
    Field::ChestPain,
    Field::RestingEcg,
    Field::Slope,
    Field::Thal,
];

const FLAG_FIELDS: [Field; 2] = [Field::FastingBloodSugar, Field::ExerciseAngina];

/// Validate a raw form record against the static ranges and the loaded
/// encoding tables.
///
/// Every check runs; messages accumulate in field order (numeric ranges,
/// then categorical values, then flags).
///
/// # Errors
/// Returns every validation message when at least one check fails.
pub fn validate(raw: &RawInput, encodings: &EncodingTable) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for rule in &NUMERIC_RULES {
        let field = rule.field;
        match raw.field(field) {
            None => errors.push(missing(field)),
            Some(value) => match value.as_f64() {
                Some(x) if (rule.min..=rule.max).contains(&x) => {}
                Some(_) => errors.push(format!(
                    "{} must be between {} and {}",
                    field.label(),
                    rule.min,
                    rule.max
                )),
                None => errors.push(format!("{} must be a number", field.label())),
            },
        }
    }

    for field in CATEGORICAL_FIELDS {
        let Some(value) = raw.field(field) else {
            errors.push(missing(field));
            continue;
        };
        let known = CategoricalField::from_field(field)
            .zip(value.as_text())
            .is_some_and(|(cat, text)| encodings.field(cat).contains(text));
        if !known {
            errors.push(format!("Invalid value for {}: {}", field.key(), value));
        }
    }

    for field in FLAG_FIELDS {
        match raw.field(field) {
            None => errors.push(missing(field)),
            Some(value) if value.as_bool().is_some() => {}
            Some(_) => errors.push(format!("{} must be True or False", field.label())),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!("Validation rejected record with {} error(s)", errors.len());
        Err(errors)
    }
}

fn missing(field: Field) -> String {
    format!("Missing required field: {}", field.key())
}
