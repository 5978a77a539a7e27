//! Pipeline module - normalization, encoding and schema alignment

pub mod artifacts;
pub mod catalog;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod missing;
pub mod orchestrator;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod scoring;
pub mod sentinel;
pub mod target;
pub mod value;

pub use encoder::{
    CategoricalEncoder, CategoricalEncoding, EncodedRecord, EncoderState, FeatureSegment,
    UnseenCategory, DEFAULT_UNKNOWN_VALUE, UNSEEN_CODE,
};
pub use error::{NormalizationError, PipelineError};
pub use loader::*;
pub use missing::{fields_above_threshold, profile_markers, MarkerProfile};
pub use orchestrator::*;
pub use registry::{FieldRegistry, NormalizationStats};
pub use rules::{Band, Decode, FieldRule, LabelRule, RuleKind, SentinelRule, Transform};
pub use schema::{ColumnSpec, FeatureSchema, FeatureVector};
pub use scoring::{Classifier, RiskBand};
pub use target::{
    count_labels, derive_label, derive_labels, DerivedLabel, ExclusionReason, LabelCounts,
    MissingLabelReason,
};
pub use value::{
    CanonicalRecord, CanonicalValue, FieldLayout, Marker, RawCorpus, RawRecord, RawValue,
};
