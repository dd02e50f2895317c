//! Input normalization: raw record to scaled model input.

use crate::domain::{
    CategoricalField, EncodingTable, Feature, FeatureOrder, FieldKind, NormalizedVector,
    PipelineError, RawInput, ScalingParameters, FEATURE_COUNT,
};

/// Encode, order and scale a validated record.
///
/// 1. numeric fields are copied (integers widened), categorical fields and
///    flags are replaced by their code from `encodings`;
/// 2. values are laid out in `order`;
/// 3. position `i` becomes `(x - mean[i]) / scale[i]`.
///
/// The record is expected to have passed [`super::validate`]; this function
/// does not re-check ranges.
///
/// # Errors
/// - `PipelineError::MissingField` if a form field is absent
/// - `PipelineError::FieldType` if a value has the wrong kind
/// - `PipelineError::KeyNotFound` if a categorical value has no code
pub fn normalize(
    raw: &RawInput,
    encodings: &EncodingTable,
    scaling: &ScalingParameters,
    order: &FeatureOrder,
) -> Result<NormalizedVector, PipelineError> {
    // Indexed by `Feature`, independent of the fitted column order.
    let mut encoded = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        encoded[feature.index()] = feature_value(raw, encodings, feature)?;
    }

    let mut scaled = [0.0; FEATURE_COUNT];
    for (position, feature) in order.iter().enumerate() {
        scaled[position] = scaling.apply(position, encoded[feature.index()]);
    }

    Ok(NormalizedVector::new(scaled))
}

fn feature_value(
    raw: &RawInput,
    encodings: &EncodingTable,
    feature: Feature,
) -> Result<f64, PipelineError> {
    let field = feature.source();
    let value = raw
        .field(field)
        .ok_or(PipelineError::MissingField(field.key()))?;

    let key = match field.kind() {
        FieldKind::Numeric => {
            return value.as_f64().ok_or(PipelineError::FieldType {
                field: field.key(),
                expected: "a number",
            });
        }
        FieldKind::Flag => value.as_bool().map(|b| b.to_string()).ok_or(
            PipelineError::FieldType {
                field: field.key(),
                expected: "a boolean",
            },
        )?,
        FieldKind::Categorical => value.as_text().map(str::to_string).ok_or(
            PipelineError::FieldType {
                field: field.key(),
                expected: "a string",
            },
        )?,
    };

    CategoricalField::from_field(field)
        .and_then(|cat| encodings.encode(cat, &key))
        .map(f64::from)
        .ok_or(PipelineError::KeyNotFound {
            field: field.key(),
            value: key,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClinicalRecord;

    fn example() -> RawInput {
        ClinicalRecord::example().to_raw()
    }

    #[test]
    fn test_identity_scaling_exposes_encoding() {
        let v = normalize(
            &example(),
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect("Should normalize");

        // age, trestbps, chol, thalch, oldpeak, ca
        assert_eq!(&v.as_slice()[..6], &[63.0, 145.0, 233.0, 150.0, 2.3, 0.0]);
        // sex=Male(1), fbs=true(1), exang=false(0), cp=typical angina(3),
        // restecg=lv hypertrophy(0), slope=downsloping(0), thal=fixed defect(0)
        assert_eq!(&v.as_slice()[6..], &[1.0, 1.0, 0.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scaling_follows_order_positions() {
        let mut names: Vec<&str> = Feature::ALL.iter().map(Feature::name).collect();
        names.swap(0, 12);
        let order = FeatureOrder::from_names(&names).expect("valid order");

        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        mean[0] = 1.0;
        scale[0] = 2.0;
        mean[12] = 50.0;
        scale[12] = 10.0;
        let scaling = ScalingParameters::new(&mean, &scale).expect("valid scaler");

        let v = normalize(&example(), &EncodingTable::label_encoded(), &scaling, &order)
            .expect("Should normalize");

        // Position 0 now holds thal_encoded (0), position 12 holds age (63).
        assert!((v.as_slice()[0] - (0.0 - 1.0) / 2.0).abs() < 1e-12);
        assert!((v.as_slice()[12] - (63.0 - 50.0) / 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let encodings = EncodingTable::label_encoded();
        let scaling = ScalingParameters::new(&[3.0; FEATURE_COUNT], &[0.7; FEATURE_COUNT])
            .expect("valid scaler");
        let order = FeatureOrder::default();

        let a = normalize(&example(), &encodings, &scaling, &order).expect("a");
        let b = normalize(&example(), &encodings, &scaling, &order).expect("b");
        let bits = |v: &NormalizedVector| v.iter().map(f64::to_bits).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_missing_field() {
        let mut raw = example();
        raw.remove("ca");
        let err = normalize(
            &raw,
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect_err("must fail");
        assert_eq!(err, PipelineError::MissingField("ca"));
    }

    #[test]
    fn test_unknown_categorical_value() {
        let raw = example().with("slope", "sideways");
        let err = normalize(
            &raw,
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect_err("must fail");
        assert_eq!(
            err,
            PipelineError::KeyNotFound {
                field: "slope",
                value: "sideways".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_kind() {
        let raw = example().with("exang", "no");
        let err = normalize(
            &raw,
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect_err("must fail");
        assert!(matches!(err, PipelineError::FieldType { field: "exang", .. }));
    }

    #[test]
    fn test_integer_and_real_inputs_agree() {
        let as_int = example().with("age", 63).with("ca", 0);
        let a = normalize(
            &as_int,
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect("int");
        let b = normalize(
            &example(),
            &EncodingTable::label_encoded(),
            &ScalingParameters::identity(),
            &FeatureOrder::default(),
        )
        .expect("real");
        assert_eq!(a, b);
    }
}
