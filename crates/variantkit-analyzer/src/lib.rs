//! Text-level discovery of macro sites across a build's dependency closure.
//!
//! Deliberately cheap compared to the transformer: a single global regex
//! pass per file, no AST. A fast text/line-based scan runs ahead of the
//! heavier AST-driven pass, the same way a linter's rule scan runs ahead of
//! its type-aware analysis.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use variantkit_config::Value;
use variantkit_config::is_truthy;
use variantkit_reporting::Issue;
use variantkit_reporting::IssueCollection;
use variantkit_snapshot::SnapshotStore;
use variantkit_syntax::FileId;
use variantkit_syntax::Span;
use variantkit_syntax::line_starts_with_comment;
use variantkit_syntax::offset_to_line_and_column;

/// Per-build, per-variant macro metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroMetadata {
    /// Names of declarations whose condition evaluated false; references to
    /// these names collapse to `undefined` in the transformer.
    pub disabled_macro_names: HashSet<String>,
    /// Files whose content contains at least one macro form outside
    /// comments, used to short-circuit the transformer.
    pub files_with_macros: HashSet<PathBuf>,
}

impl MacroMetadata {
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_macro_names.contains(name)
    }

    #[must_use]
    pub fn has_macros(&self, path: &Path) -> bool {
        self.files_with_macros.contains(path)
    }
}

/// Recognizes `([export] (const|let|var) NAME =)? $$(ifdef|ifndef|inline)( "NAME"`.
fn macro_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?:(?P<export>export)\s+)?(?:(?P<kind>const|let|var)\s+(?P<var>[A-Za-z_$][\w$]*)\s*=\s*)?\$\$(?P<directive>ifdef|ifndef|inline)\s*\(\s*(?:(?P<quote>['"])(?P<define>[^'"]*)(?P=quote))?"#,
        )
        .expect("macro detection regex is a compile-time constant")
    })
}

/// Scans `paths` for macro usage against `defines`, populating
/// [`MacroMetadata`] and returning accumulated naming-convention warnings.
///
/// Never fails per-file: an absent or empty file is silently skipped.
pub fn analyze(
    paths: &[PathBuf],
    defines: &HashMap<String, Value>,
    snapshots: &SnapshotStore,
) -> (MacroMetadata, IssueCollection) {
    let mut metadata = MacroMetadata::default();
    let mut issues = IssueCollection::new();

    for path in paths {
        let Ok(snapshot) = snapshots.get_or_touch(path) else {
            tracing::debug!(path = %path.display(), "analyzer: file unreadable, skipping");
            continue;
        };

        if snapshot.text.is_empty() {
            continue;
        }

        analyze_file(path, &snapshot.text, defines, &mut metadata, &mut issues);
    }

    (metadata, issues)
}

fn analyze_file(
    path: &Path,
    text: &str,
    defines: &HashMap<String, Value>,
    metadata: &mut MacroMetadata,
    issues: &mut IssueCollection,
) {
    for capture in macro_regex().captures_iter(text) {
        let whole = capture.get(0).expect("whole match always present");
        let (line, _) = offset_to_line_and_column(text, whole.start() as u32);
        let line_start = text[..whole.start()].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let line_end = text[whole.start()..].find('\n').map(|idx| whole.start() + idx).unwrap_or(text.len());
        if line_starts_with_comment(&text[line_start..line_end]) {
            continue;
        }

        metadata.files_with_macros.insert(path.to_path_buf());

        let Some(var_name) = capture.name("var") else { continue };
        let var_name = var_name.as_str();
        let directive = &capture["directive"];
        let define_name = capture.name("define").map(|m| m.as_str());

        let is_defined = define_name.is_some_and(|name| is_truthy(defines.get(name)));
        let disabled = (directive == "ifndef") == is_defined;
        if disabled {
            metadata.disabled_macro_names.insert(var_name.to_string());
        }

        if !var_name.starts_with("$$") {
            let column = (whole.start() - line_start) as u32;
            let span = Span::new(FileId::from_path(path), whole.start() as u32, whole.end() as u32);

            issues.push(
                Issue::warning(format!("Macro function '{var_name}' not start with '$$' prefix to avoid conflicts"))
                    .with_note(format!("{}:{}:{}", path.display(), line, column))
                    .at(span),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use variantkit_reporting::Level;

    fn defines(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn disables_ifdef_when_define_is_falsy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, r#"const $$log = $$ifdef("DEBUG", () => console.log);"#).unwrap();

        let snapshots = SnapshotStore::new();
        let (metadata, issues) = analyze(&[path.clone()], &defines(&[("DEBUG", json!(false))]), &snapshots);

        assert!(metadata.is_disabled("$$log"));
        assert!(metadata.has_macros(&path));
        assert!(issues.is_empty());
    }

    #[test]
    fn ifndef_disabled_when_define_truthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, r#"const $$dev = $$ifndef("PRODUCTION", () => 1);"#).unwrap();

        let snapshots = SnapshotStore::new();
        let (metadata, _) = analyze(&[path], &defines(&[("PRODUCTION", json!(true))]), &snapshots);

        assert!(metadata.is_disabled("$$dev"));
    }

    #[test]
    fn warns_on_missing_dollar_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, r#"const log = $$ifdef("DEBUG", () => 1);"#).unwrap();

        let snapshots = SnapshotStore::new();
        let (_, issues) = analyze(&[path], &defines(&[("DEBUG", json!(true))]), &snapshots);

        assert_eq!(issues.len(), 1);
        let issue = issues.iter().next().unwrap();
        assert_eq!(issue.level, Level::Warning);
        assert!(issue.message.contains("not start with '$$' prefix"));
    }

    #[test]
    fn skips_commented_out_macro_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(
            &path,
            "// const $$x = $$ifdef(\"DEBUG\", () => 1);\nconst $$y = $$ifdef(\"DEBUG\", () => 2);\n",
        )
        .unwrap();

        let snapshots = SnapshotStore::new();
        let (metadata, _) = analyze(&[path], &defines(&[("DEBUG", json!(false))]), &snapshots);

        assert!(!metadata.is_disabled("$$x"));
        assert!(metadata.is_disabled("$$y"));
    }

    #[test]
    fn analyzing_twice_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, r#"const $$log = $$ifdef("DEBUG", () => 1);"#).unwrap();

        let snapshots = SnapshotStore::new();
        let d = defines(&[("DEBUG", json!(false))]);
        let (first, _) = analyze(&[path.clone()], &d, &snapshots);
        let (second, _) = analyze(&[path], &d, &snapshots);

        assert_eq!(first, second);
    }
}
