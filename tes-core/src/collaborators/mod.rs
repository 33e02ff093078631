//! External collaborator shims.
//!
//! Each collaborator named in the metadata/version/tension/gauge surface is
//! reached only through a trait object, so handlers never depend on a
//! concrete engine. Every trait here has exactly one concrete, pure,
//! in-process implementation: there is no separate computational service to
//! call out to in this repository, but the seam is kept so a future swap-in
//! of a real production engine is a one-line change at construction time.

mod curves;
mod feature_flags;
mod gauge;
mod glossary;
mod registry;
mod tension;
mod threshold;
mod tmux;

pub use curves::{Curve, CurveDetector, DefaultCurveDetector, MaparseResult};
pub use feature_flags::{
    DefaultFeatureFlagRegistry, FeatureFlag, FeatureFlagCategory, FeatureFlagRegistry,
};
pub use gauge::{DefaultGaugeEngine, GaugeEngine, GaugeResult, Tensor};
pub use glossary::{DefaultGlossaryRegistry, GlossaryRegistry, GlossaryTerm};
pub use registry::{BookmakerEntry, DefaultRegistry, Registry};
pub use tension::{DefaultTensionEngine, EdgeRelation, TensionEngine, TensionMeta};
pub use threshold::{DefaultThresholdValidator, ThresholdResult, ThresholdValidator};
pub use tmux::{DefaultTmuxController, TmuxController, TmuxStatus};

/// Construction-time bundle of every collaborator, handed to `AppState` as
/// trait objects so a handler never names a concrete engine type.
#[derive(Clone)]
pub struct Collaborators {
    pub tension: std::sync::Arc<dyn TensionEngine>,
    pub gauge: std::sync::Arc<dyn GaugeEngine>,
    pub curves: std::sync::Arc<dyn CurveDetector>,
    pub threshold: std::sync::Arc<dyn ThresholdValidator>,
    pub registry: std::sync::Arc<dyn Registry>,
    pub glossary: std::sync::Arc<dyn GlossaryRegistry>,
    pub feature_flags: std::sync::Arc<dyn FeatureFlagRegistry>,
    pub tmux: std::sync::Arc<dyn TmuxController>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            tension: std::sync::Arc::new(DefaultTensionEngine),
            gauge: std::sync::Arc::new(DefaultGaugeEngine),
            curves: std::sync::Arc::new(DefaultCurveDetector),
            threshold: std::sync::Arc::new(DefaultThresholdValidator),
            registry: std::sync::Arc::new(DefaultRegistry::new()),
            glossary: std::sync::Arc::new(DefaultGlossaryRegistry::new()),
            feature_flags: std::sync::Arc::new(DefaultFeatureFlagRegistry::new()),
            tmux: std::sync::Arc::new(DefaultTmuxController),
        }
    }
}
