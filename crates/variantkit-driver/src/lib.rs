//! Glue that wires the analyzer and transformer into a bundler's plugin
//! hooks for one variant's build.
//!
//! Each variant gets one [`BuildDriver`]: a first, unwired call to the
//! injected [`Bundler`] discovers its dependency closure (the "scan" pass);
//! the driver then registers a `start` handler (runs the analyzer over that
//! closure) and a `load` handler (runs the transformer on each file) and
//! drives the real build.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use variantkit_analyzer::MacroMetadata;
use variantkit_analyzer::analyze;
use variantkit_config::Value;
use variantkit_lifecycle::BaseContext;
use variantkit_lifecycle::Bundler;
use variantkit_lifecycle::BundlerError;
use variantkit_lifecycle::LifecycleStage;
use variantkit_lifecycle::LoadResult;
use variantkit_reporting::Issue;
use variantkit_reporting::IssueCollection;
use variantkit_reporting::Level;
use variantkit_snapshot::SnapshotStore;
use variantkit_syntax::Dialect;
use variantkit_syntax::FileId;
use variantkit_transform::TransformContext;
use variantkit_transform::transform;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Bundler(#[from] BundlerError),
}

/// Build-time knobs that aren't per-variant defines: where to find `node`
/// for `$$inline` evaluation, and how long to let it run.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub node_binary: PathBuf,
    pub inline_eval_timeout: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self { node_binary: PathBuf::from("node"), inline_eval_timeout: Duration::from_secs(5) }
    }
}

/// Everything produced by one variant's build: diagnostics from the
/// analyzer and transformer, plus the dependency closure the scan phase
/// discovered.
#[derive(Debug, Default, Clone)]
pub struct VariantOutcome {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub scanned_paths: Vec<PathBuf>,
}

/// Drives one variant's build against an injected [`Bundler`]. Holds its
/// own [`SnapshotStore`] (so repeated loads of the same file within a build
/// are cheap) and starts every build with a fresh [`LifecycleStage`].
pub struct BuildDriver<B: Bundler> {
    base: BaseContext,
    defines: HashMap<String, Value>,
    settings: DriverSettings,
    bundler: B,
    snapshots: Arc<SnapshotStore>,
}

impl<B: Bundler> BuildDriver<B> {
    #[must_use]
    pub fn new(variant_name: impl Into<String>, defines: HashMap<String, Value>, settings: DriverSettings, bundler: B) -> Self {
        let mut base = BaseContext::new(variant_name);
        base.argv = std::env::args().skip(1).collect();
        Self { base, defines, settings, bundler, snapshots: Arc::new(SnapshotStore::new()) }
    }

    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Runs the scan pass, wires the analyzer/transformer hooks onto the
    /// bundler, then runs the real build. Consumes `self`: a driver is
    /// meant to run exactly one build for its variant.
    pub fn run_variant(mut self) -> Result<VariantOutcome, DriverError> {
        let scan = self.bundler.build(&self.base)?;
        let paths = scan.metafile;
        tracing::debug!(
            variant = %self.base.variant_name,
            files = paths.len(),
            "scan phase discovered the dependency closure"
        );

        let stage = Arc::new(Mutex::new(LifecycleStage::new()));
        let metadata_slot: Arc<Mutex<MacroMetadata>> = Arc::new(Mutex::new(MacroMetadata::default()));
        let diagnostics: Arc<Mutex<IssueCollection>> = Arc::new(Mutex::new(IssueCollection::new()));
        let defines = Arc::new(self.defines.clone());
        let node_binary = self.settings.node_binary.clone();
        let inline_eval_timeout = self.settings.inline_eval_timeout;
        let snapshots = Arc::clone(&self.snapshots);

        self.bundler.on_start(Box::new({
            let stage = Arc::clone(&stage);
            let metadata_slot = Arc::clone(&metadata_slot);
            let diagnostics = Arc::clone(&diagnostics);
            let defines = Arc::clone(&defines);
            let snapshots = Arc::clone(&snapshots);
            let paths = paths.clone();
            move |base| {
                stage.lock().expect("lifecycle stage lock poisoned").reset();
                let (metadata, issues) = analyze(&paths, &defines, &snapshots);
                tracing::info!(variant = %base.variant_name, files = paths.len(), "analyzer pass complete");
                diagnostics.lock().expect("diagnostics lock poisoned").extend(issues.iter().cloned());
                *metadata_slot.lock().expect("macro metadata lock poisoned") = metadata;
                Ok(())
            }
        }));

        self.bundler.on_load(Box::new({
            let stage = Arc::clone(&stage);
            let metadata_slot = Arc::clone(&metadata_slot);
            let diagnostics = Arc::clone(&diagnostics);
            let defines = Arc::clone(&defines);
            let snapshots = Arc::clone(&snapshots);
            move |_base, args| load_and_transform(&args.path, &stage, &metadata_slot, &diagnostics, &defines, &snapshots, &node_binary, inline_eval_timeout)
        }));

        let build = self.bundler.build(&self.base)?;

        let mut diagnostics = Arc::try_unwrap(diagnostics).map_or_else(|arc| arc.lock().expect("diagnostics lock poisoned").clone(), |m| m.into_inner().expect("diagnostics lock poisoned"));
        diagnostics.extend(build.errors.iter().cloned());
        diagnostics.extend(build.warnings.iter().cloned());

        let (errors, warnings) = diagnostics.iter().cloned().partition(|issue: &Issue| issue.level >= Level::Error);

        Ok(VariantOutcome { errors, warnings, scanned_paths: paths })
    }
}

fn load_and_transform(
    path: &Path,
    stage: &Arc<Mutex<LifecycleStage>>,
    metadata_slot: &Arc<Mutex<MacroMetadata>>,
    diagnostics: &Arc<Mutex<IssueCollection>>,
    defines: &HashMap<String, Value>,
    snapshots: &SnapshotStore,
    node_binary: &Path,
    inline_eval_timeout: Duration,
) -> Result<LoadResult, BundlerError> {
    let snapshot = snapshots.get_or_touch(path).map_err(|err| BundlerError(err.to_string()))?;
    let metadata = metadata_slot.lock().expect("macro metadata lock poisoned").clone();
    let dialect = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(Dialect::TypeScript, Dialect::from_extension);

    let ctx = TransformContext {
        file_id: FileId::from_path(path),
        path,
        dialect,
        metadata: &metadata,
        defines,
        node_binary,
        inline_eval_timeout,
    };

    let (contents, issues) = transform(&snapshot.text, &ctx).map_err(|err| BundlerError(err.to_string()))?;
    diagnostics.lock().expect("diagnostics lock poisoned").extend(issues.iter().cloned());
    stage.lock().expect("lifecycle stage lock poisoned").replacement_info.push(format!("transformed {}", path.display()));

    Ok(LoadResult { contents, loader: "js".to_string(), errors: Vec::new(), warnings: Vec::new() })
}

/// Runs every variant's build concurrently with a scoped `rayon` thread
/// pool, one [`BuildDriver`] per variant. Each driver owns its own
/// [`LifecycleStage`] and bundler instance, so no state crosses the
/// `rayon::scope` boundary between variants.
pub fn run_variants<B, F>(variants: Vec<(String, HashMap<String, Value>)>, settings: &DriverSettings, mut make_bundler: F) -> Vec<Result<VariantOutcome, DriverError>>
where
    B: Bundler,
    F: FnMut(&str) -> B,
{
    let drivers: Vec<BuildDriver<B>> =
        variants.into_iter().map(|(name, defines)| BuildDriver::new(name.clone(), defines, settings.clone(), make_bundler(&name))).collect();

    let mut results = Vec::with_capacity(drivers.len());
    results.resize_with(drivers.len(), || None);

    rayon::scope(|scope| {
        for (slot, driver) in results.iter_mut().zip(drivers) {
            scope.spawn(move |_| {
                *slot = Some(driver.run_variant());
            });
        }
    });

    results.into_iter().map(|slot| slot.expect("every scoped task fills its slot before the scope returns")).collect()
}
