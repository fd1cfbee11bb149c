//! The reactive build configuration store consumed by the macro pipeline.
//!
//! Configuration values are realized as `serde_json::Value` (a
//! `{bool, number, string, null}` tagged union extended with arrays/objects
//! for deep-merge purposes), so [`ConfigStore::patch`]/[`ConfigStore::reload`]
//! can deep-merge an arbitrary partial document onto any `Configuration`-shaped
//! `T`.

mod domain;
mod equality;
mod merge;
mod store;

pub use domain::Configuration;
pub use domain::Value;
pub use domain::VariantConfig;
pub use domain::is_truthy;
pub use equality::deep_equal;
pub use equality::deep_equal_sequences;
pub use merge::MergeError;
pub use merge::deep_merge;
pub use merge::merged;
pub use store::ConfigStore;
pub use store::Unsubscribe;
