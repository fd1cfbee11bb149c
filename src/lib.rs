//! Public facade over the macro build pipeline: re-exports the pieces a
//! host build tool wires together to get conditional compilation and
//! `$$inline` evaluation for a set of variants.
//!
//! This crate stops at the library boundary. A command-line front end and a
//! long-lived watch-mode orchestrator that re-runs variants on file changes
//! are not part of this tree — a host integrates [`BuildDriver`] into its
//! own CLI or service the way it already drives its bundler.

pub use variantkit_analyzer::MacroMetadata;
pub use variantkit_analyzer::analyze;
pub use variantkit_config::Configuration;
pub use variantkit_config::VariantConfig;
pub use variantkit_config::ConfigStore;
pub use variantkit_config::Unsubscribe;
pub use variantkit_config::Value;
pub use variantkit_config::is_truthy;
pub use variantkit_driver::BuildDriver;
pub use variantkit_driver::DriverError;
pub use variantkit_driver::DriverSettings;
pub use variantkit_driver::VariantOutcome;
pub use variantkit_driver::run_variants;
pub use variantkit_eval::EvalError;
pub use variantkit_eval::evaluate;
pub use variantkit_eval::value_to_js_literal;
pub use variantkit_lifecycle::BaseContext;
pub use variantkit_lifecycle::Bundler;
pub use variantkit_lifecycle::BundlerError;
pub use variantkit_lifecycle::FakeBundler;
pub use variantkit_lifecycle::LifecyclePlugin;
pub use variantkit_lifecycle::LifecycleStage;
pub use variantkit_reporting::Issue;
pub use variantkit_reporting::IssueCollection;
pub use variantkit_reporting::Level;
pub use variantkit_snapshot::SnapshotStore;
pub use variantkit_syntax::Dialect;
pub use variantkit_transform::TransformContext;
pub use variantkit_transform::TransformError;
pub use variantkit_transform::transform;
