//! Lifecycle hook registry that integrates the macro pipeline with a
//! bundler's plugin system: start/end/success run around a build, resolve
//! and load participate in module resolution the way a bundler plugin would.
//!
//! Handlers never abort a build on failure. A handler that returns `Err` has
//! its error captured as a single diagnostic and execution continues with
//! the next handler, in registration order.

mod bundler;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;
use variantkit_config::Value;
use variantkit_reporting::Issue;

pub use bundler::Bundler;
pub use bundler::BundlerEndHandler;
pub use bundler::BundlerError;
pub use bundler::BundlerLoadHandler;
pub use bundler::BundlerResolveHandler;
pub use bundler::BundlerStartHandler;
pub use bundler::BuildOutcome;
pub use bundler::FakeBundler;

/// Identifies the variant a build is running for and carries whatever
/// command-line arguments launched it; shared read-only across every hook
/// invoked during that build.
#[derive(Debug, Clone)]
pub struct BaseContext {
    pub variant_name: String,
    pub argv: Vec<String>,
}

impl BaseContext {
    #[must_use]
    pub fn new(variant_name: impl Into<String>) -> Self {
        Self { variant_name: variant_name.into(), argv: Vec::new() }
    }
}

/// Mutable scratch state shared by reference across every hook in one
/// build. Reset at the start of each build; `start_time` backs the duration
/// reported to end handlers, `define_metadata` and `replacement_info` are a
/// free-form blackboard populated by earlier stages (analyzer output,
/// per-file replacement counts) for later hooks to read.
#[derive(Debug)]
pub struct LifecycleStage {
    pub start_time: Instant,
    pub define_metadata: HashMap<String, Value>,
    pub replacement_info: Vec<String>,
}

impl Default for LifecycleStage {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleStage {
    #[must_use]
    pub fn new() -> Self {
        Self { start_time: Instant::now(), define_metadata: HashMap::new(), replacement_info: Vec::new() }
    }

    /// Restarts the stage for a new build: clears the blackboard and resets
    /// the clock.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Diagnostics accumulated from one hook category's handlers.
#[derive(Debug, Default, Clone)]
pub struct HandlerOutcome {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

/// Diagnostics accumulated across a whole build phase (start, or end plus
/// the success handlers it gates).
pub type BuildResult = HandlerOutcome;

#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub path: String,
    pub importer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub path: PathBuf,
}

/// Mutable load state threaded through `load` handlers; a handler rewrites
/// `contents` and/or `loader` in place to change what downstream stages see,
/// rather than returning a delta.
#[derive(Debug, Clone)]
pub struct LoadState {
    pub contents: String,
    pub loader: String,
}

#[derive(Debug, Default, Clone)]
pub struct LoadResult {
    pub contents: String,
    pub loader: String,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

type HandlerError = Box<dyn StdError + Send + Sync>;
type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// A handler's thrown error, captured rather than propagated. Every
/// dispatch path in [`LifecyclePlugin`] converts an `Err` into one of these
/// and folds it into the phase's diagnostics instead of aborting the build.
#[derive(Debug, Error)]
#[error("lifecycle handler failed: {0}")]
pub struct LifecycleError(#[source] HandlerError);

impl LifecycleError {
    #[must_use]
    pub fn into_issue(self) -> Issue {
        Issue::error(self.to_string())
    }
}

fn captured(err: HandlerError) -> Issue {
    LifecycleError(err).into_issue()
}

pub type StartHandler = Box<dyn FnMut(&mut LifecycleStage, &BaseContext) -> HandlerResult + Send>;
pub type EndHandler = Box<dyn FnMut(&mut LifecycleStage, &BaseContext, &BuildResult) -> HandlerResult + Send>;
pub type SuccessHandler = Box<dyn FnMut(&mut LifecycleStage, &BaseContext) -> HandlerResult + Send>;
pub type ResolveHandler =
    Box<dyn FnMut(&mut LifecycleStage, &BaseContext, &ResolveArgs) -> Result<Option<Value>, HandlerError> + Send>;
pub type LoadHandler = Box<dyn FnMut(&mut LifecycleStage, &BaseContext, &LoadArgs, &mut LoadState) -> HandlerResult + Send>;

/// Registers handlers for the five hook categories and runs them in
/// registration order. All registries run sequentially even when the host
/// build drives multiple variants in parallel: one `LifecyclePlugin`
/// instance is not shared across variants.
#[derive(Default)]
pub struct LifecyclePlugin {
    start: Vec<StartHandler>,
    end: Vec<EndHandler>,
    success: Vec<SuccessHandler>,
    resolve: Vec<ResolveHandler>,
    load: Vec<LoadHandler>,
}

impl LifecyclePlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(&mut self, handler: StartHandler) {
        self.start.push(handler);
    }

    pub fn on_end(&mut self, handler: EndHandler) {
        self.end.push(handler);
    }

    pub fn on_success(&mut self, handler: SuccessHandler) {
        self.success.push(handler);
    }

    pub fn on_resolve(&mut self, handler: ResolveHandler) {
        self.resolve.push(handler);
    }

    pub fn on_load(&mut self, handler: LoadHandler) {
        self.load.push(handler);
    }

    /// Resets the stage and runs every `start` handler in order.
    pub fn run_start(&mut self, stage: &mut LifecycleStage, base: &BaseContext) -> BuildResult {
        stage.reset();
        let mut result = BuildResult::default();
        for handler in &mut self.start {
            match handler(stage, base) {
                Ok(outcome) => {
                    result.errors.extend(outcome.errors);
                    result.warnings.extend(outcome.warnings);
                }
                Err(err) => result.errors.push(captured(err)),
            }
        }
        result
    }

    /// Runs every `end` handler, then the `success` handlers only if
    /// `build_result` carries no errors — mirroring a bundler that skips
    /// post-build celebration hooks on a failed build.
    pub fn run_end(&mut self, stage: &mut LifecycleStage, base: &BaseContext, build_result: &BuildResult) -> BuildResult {
        let mut result = BuildResult::default();
        for handler in &mut self.end {
            match handler(stage, base, build_result) {
                Ok(outcome) => {
                    result.errors.extend(outcome.errors);
                    result.warnings.extend(outcome.warnings);
                }
                Err(err) => result.errors.push(captured(err)),
            }
        }

        tracing::debug!(
            variant = %base.variant_name,
            duration_ms = stage.elapsed().as_millis(),
            "build end hooks completed"
        );

        if build_result.errors.is_empty() {
            for handler in &mut self.success {
                if let Err(err) = handler(stage, base) {
                    result.errors.push(captured(err));
                }
            }
        }
        result
    }

    /// Runs every `resolve` handler and shallow-merges the object results in
    /// registration order, later keys overriding earlier ones. A handler
    /// returning a non-object value replaces whatever was merged so far.
    pub fn run_resolve(&mut self, stage: &mut LifecycleStage, base: &BaseContext, args: &ResolveArgs) -> Option<Value> {
        let mut merged: Option<Value> = None;
        for handler in &mut self.resolve {
            match handler(stage, base, args) {
                Ok(Some(value)) => merged = Some(merge_results(merged, value)),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %captured(err), "resolve handler failed"),
            }
        }
        merged
    }

    /// Runs every `load` handler over `initial_contents`, letting each one
    /// rewrite the running contents/loader in place.
    pub fn run_load(&mut self, stage: &mut LifecycleStage, base: &BaseContext, args: &LoadArgs, initial_contents: String) -> LoadResult {
        let mut state = LoadState { contents: initial_contents, loader: "default".to_string() };
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for handler in &mut self.load {
            match handler(stage, base, args, &mut state) {
                Ok(outcome) => {
                    errors.extend(outcome.errors);
                    warnings.extend(outcome.warnings);
                }
                Err(err) => errors.push(captured(err)),
            }
        }
        LoadResult { contents: state.contents, loader: state.loader, errors, warnings }
    }
}

fn merge_results(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(mut base)), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}
