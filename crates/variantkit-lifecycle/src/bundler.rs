use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;
use variantkit_reporting::Issue;

use variantkit_config::Value;

use crate::BaseContext;
use crate::LoadArgs;
use crate::LoadResult;
use crate::ResolveArgs;

/// Wraps whatever error shape the host bundler surfaces; the core treats it
/// opaquely and only ever displays it.
#[derive(Debug, Error)]
#[error("bundler error: {0}")]
pub struct BundlerError(pub String);

/// The outcome of a full build: diagnostics plus the dependency metafile
/// (every input path the bundler visited) that seeds the next variant's
/// analyzer pass.
#[derive(Debug, Default, Clone)]
pub struct BuildOutcome {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub metafile: Vec<PathBuf>,
}

pub type BundlerStartHandler = Box<dyn FnMut(&BaseContext) -> Result<(), BundlerError> + Send>;
pub type BundlerEndHandler = Box<dyn FnMut(&BaseContext, &BuildOutcome) -> Result<(), BundlerError> + Send>;
pub type BundlerResolveHandler = Box<dyn FnMut(&BaseContext, &ResolveArgs) -> Result<Option<Value>, BundlerError> + Send>;
pub type BundlerLoadHandler = Box<dyn FnMut(&BaseContext, &LoadArgs) -> Result<LoadResult, BundlerError> + Send>;

/// The plugin-host contract the macro pipeline consumes: register handlers
/// for the five hook categories, then run a build that exercises them and
/// returns a dependency metafile.
///
/// This crate ships only the trait and [`FakeBundler`]; a real
/// implementation wrapping an actual bundler is an external collaborator.
pub trait Bundler: Send {
    fn on_start(&mut self, handler: BundlerStartHandler);
    fn on_end(&mut self, handler: BundlerEndHandler);
    fn on_resolve(&mut self, filter: &str, handler: BundlerResolveHandler);
    fn on_load(&mut self, filter: &str, handler: BundlerLoadHandler);

    /// Runs a build for `variant`, invoking every registered hook in the
    /// order a real host would, and returns the aggregated outcome.
    fn build(&mut self, base: &BaseContext) -> Result<BuildOutcome, BundlerError>;
}

/// An in-memory [`Bundler`] for tests: holds a fixed file set with seeded
/// contents, invokes hooks in registration order, and reports every seeded
/// path in its metafile.
#[derive(Default)]
pub struct FakeBundler {
    files: HashMap<PathBuf, String>,
    start_handlers: Vec<BundlerStartHandler>,
    end_handlers: Vec<BundlerEndHandler>,
    resolve_handlers: Vec<BundlerResolveHandler>,
    load_handlers: Vec<BundlerLoadHandler>,
}

impl FakeBundler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_file(&mut self, path: PathBuf, contents: impl Into<String>) -> &mut Self {
        self.files.insert(path, contents.into());
        self
    }

    /// Contents currently held for `path`, reflecting any load-handler
    /// rewrites from the most recent [`Bundler::build`] call.
    #[must_use]
    pub fn contents_of(&self, path: &std::path::Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

impl Bundler for FakeBundler {
    fn on_start(&mut self, handler: BundlerStartHandler) {
        self.start_handlers.push(handler);
    }

    fn on_end(&mut self, handler: BundlerEndHandler) {
        self.end_handlers.push(handler);
    }

    fn on_resolve(&mut self, _filter: &str, handler: BundlerResolveHandler) {
        self.resolve_handlers.push(handler);
    }

    fn on_load(&mut self, _filter: &str, handler: BundlerLoadHandler) {
        self.load_handlers.push(handler);
    }

    fn build(&mut self, base: &BaseContext) -> Result<BuildOutcome, BundlerError> {
        let mut outcome = BuildOutcome { metafile: self.files.keys().cloned().collect(), ..BuildOutcome::default() };
        outcome.metafile.sort();

        for handler in &mut self.start_handlers {
            if let Err(err) = handler(base) {
                outcome.errors.push(Issue::error(err.to_string()));
            }
        }

        let paths: Vec<_> = outcome.metafile.clone();
        for path in paths {
            let args = LoadArgs { path: path.clone() };
            for handler in &mut self.load_handlers {
                match handler(base, &args) {
                    Ok(result) => {
                        self.files.insert(path.clone(), result.contents);
                        outcome.errors.extend(result.errors);
                        outcome.warnings.extend(result.warnings);
                    }
                    Err(err) => outcome.errors.push(Issue::error(err.to_string())),
                }
            }
        }

        for handler in &mut self.end_handlers {
            if let Err(err) = handler(base, &outcome) {
                outcome.errors.push(Issue::error(err.to_string()));
            }
        }

        Ok(outcome)
    }
}
