//! Hand-off to an external classifier

use serde::Serialize;

use super::schema::{FeatureSchema, FeatureVector};

/// A trained model that scores aligned feature vectors.
///
/// Implementations live outside this crate; the vector is guaranteed to
/// match `schema` in length and order.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, schema: &FeatureSchema, vector: &FeatureVector) -> anyhow::Result<f64>;
}

impl<F> Classifier for F
where
    F: Fn(&FeatureSchema, &FeatureVector) -> anyhow::Result<f64> + Send + Sync,
{
    fn predict_proba(&self, schema: &FeatureSchema, vector: &FeatureVector) -> anyhow::Result<f64> {
        self(schema, vector)
    }
}

/// Risk bucket for a predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Elevated,
    High,
}

impl RiskBand {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.7 {
            RiskBand::High
        } else if probability >= 0.4 {
            RiskBand::Elevated
        } else {
            RiskBand::Low
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskBand::Low => write!(f, "low"),
            RiskBand::Elevated => write!(f, "elevated"),
            RiskBand::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_band_edges() {
        assert_eq!(RiskBand::from_probability(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.39), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.4), RiskBand::Elevated);
        assert_eq!(RiskBand::from_probability(0.7), RiskBand::High);
        assert_eq!(RiskBand::from_probability(1.0), RiskBand::High);
    }

    #[test]
    fn test_closure_classifier() {
        let schema = FeatureSchema::new(Vec::new());
        let model = |_: &FeatureSchema, v: &FeatureVector| -> anyhow::Result<f64> { Ok(v.len() as f64 / 10.0) };
        let vector: FeatureVector = vec![1.0, 2.0];
        assert_eq!(model.predict_proba(&schema, &vector).unwrap(), 0.2);
    }
}
