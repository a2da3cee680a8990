//! # reweight-core
//!
//! **Make a biased sample speak for its population.**
//!
//! `reweight-core` measures how a small, fully-queryable sample diverges
//! from the much larger population it was drawn from, derives per-record
//! correction weights from the divergence, and computes weighted aggregates
//! that estimate population quantities.
//!
//! ## Pipeline
//!
//! Sources → Distributions → Bias tables → Record weights → Weighted statistics
//!
//! 1. Summarize each field on both sides: categorical histograms and numeric
//!    samples. The population comes from a precomputed [`SummaryStore`] when
//!    one is usable, else from a single reservoir-sampled pass over a
//!    [`RecordStream`]; the sample is one bulk [`SampleTable`] read.
//! 2. Diagnose the divergence ([`divergence`]): a two-sample KS test per
//!    numeric field, a chi-squared goodness of fit per categorical field.
//!    Diagnostic only — results never alter the weighting.
//! 3. Build bias tables ([`bias`]): per-category and per-quantile-bin
//!    ratios of population to sample proportions.
//! 4. Assign each sample record one combined, capped weight ([`weight`]).
//!    Records are never excluded; undefined factors resolve to neutral.
//! 5. Compute weighted counts, correlations, and association strengths
//!    ([`stats`]).
//!
//! Everything runs single-threaded and batch-style: each stage consumes
//! immutable inputs and produces new immutable outputs. Randomness enters
//! only through an explicit seedable RNG handle, so runs are reproducible.

pub mod bias;
pub mod distribution;
pub mod divergence;
pub mod run;
pub mod scorer;
pub mod source;
pub mod stats;
pub mod weight;

pub use bias::{
    BiasWeight, CategoricalBiasTable, DEFAULT_NBINS, DEFAULT_WEIGHT_CAP, NumericBiasTable,
};
pub use distribution::{
    CategoricalHistogram, DEFAULT_RESERVOIR_CAPACITY, NumericSample, Reservoir,
    normalize_category,
};
pub use divergence::{
    DivergenceResult, ValidationReport, chi_squared_gof, ks_two_sample, test_categorical,
    test_numeric,
};
pub use run::{RunConfig, RunMeta, RunWriter};
pub use scorer::{FeatureVector, Prediction, ScoreRequest, build_request, response_matches};
pub use source::{
    DistributionSource, FieldDistributions, FieldKind, FieldSpec, RecordStream, SampleTable,
    SummaryStore, parse_timestamp, select_source,
};
pub use stats::{
    AssociationMetric, ContingencyTable, GroupTotalRow, METRIC_CATEGORICAL_ASSOCIATION,
    METRIC_NUMERIC_CORRELATION, cramers_v, default_fractions, quantiles, weighted_correlation,
    weighted_covariance, weighted_group_totals, weighted_mean, weighted_variance,
};
pub use weight::{BiasTables, assign_weights, categorical_factor, combine_factors, numeric_factor};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
