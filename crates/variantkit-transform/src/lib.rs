//! AST-driven rewriting of `$$ifdef`/`$$ifndef`/`$$inline` macro sites.
//!
//! Walks the parsed source with an explicit stack (depth-first, children
//! pushed in reverse so they pop in source order), recognizing macro call
//! shapes at the points the grammar actually allows them to appear —
//! variable declarators, expression statements, and nested call arguments —
//! and collapsing references to already-disabled macro names everywhere
//! else. Recognized sites produce [`variantkit_syntax::Replacement`]s that
//! are spliced into the source once the walk completes.

mod inline;
mod recognize;
mod synth;

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tree_sitter::Node;
use tree_sitter::Tree;
use variantkit_analyzer::MacroMetadata;
use variantkit_config::Value;
use variantkit_config::is_truthy;
use variantkit_reporting::Issue;
use variantkit_reporting::IssueCollection;
use variantkit_syntax::Dialect;
use variantkit_syntax::FileId;
use variantkit_syntax::ParseError;
use variantkit_syntax::Replacement;
use variantkit_syntax::ReplacementError;
use variantkit_syntax::Span;
use variantkit_syntax::apply_replacements;
use variantkit_syntax::node_text;
use variantkit_syntax::parse;

use crate::inline::InlineExtraction;
use crate::inline::extract_inline_code;
use crate::recognize::MacroName;
use crate::recognize::is_binding_specifier;
use crate::recognize::parent_mentions_macro;
use crate::recognize::unwrap_macro_call;
use crate::synth::ast_define_call_expression;
use crate::synth::ast_define_variable;
use crate::synth::ast_inline_call_expression;
use crate::synth::ast_inline_variable;

use std::collections::HashMap;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("parsing {path} failed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{macro_name} expects {expected} argument(s), found {found}")]
    Arity { site: Span, macro_name: &'static str, expected: usize, found: usize },
    #[error("generated replacements overlap")]
    OverlappingReplacements(#[from] ReplacementError),
}

/// Everything the transformer needs beyond the source text itself.
pub struct TransformContext<'a> {
    pub file_id: FileId,
    pub path: &'a Path,
    pub dialect: Dialect,
    pub metadata: &'a MacroMetadata,
    pub defines: &'a HashMap<String, Value>,
    pub node_binary: &'a Path,
    pub inline_eval_timeout: Duration,
}

/// Rewrites `source` according to `ctx`, returning the transformed text and
/// any warnings/errors accumulated along the way.
///
/// Short-circuits on files with no known macro usage and no disabled macro
/// names in scope — such a file is returned byte-for-byte unchanged.
pub fn transform(source: &str, ctx: &TransformContext) -> Result<(String, IssueCollection), TransformError> {
    if !ctx.metadata.has_macros(ctx.path) && ctx.metadata.disabled_macro_names.is_empty() {
        tracing::debug!(path = %ctx.path.display(), "transform: no macro sites, skipping parse");
        return Ok((source.to_string(), IssueCollection::new()));
    }

    let tree = parse(source, ctx.dialect).map_err(|source| TransformError::Parse { path: ctx.path.to_path_buf(), source })?;

    let mut replacements = Vec::new();
    let mut issues = IssueCollection::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        let handled = try_statement_level(node, source, &tree, ctx, &mut replacements, &mut issues)?
            || try_nested_call(node, source, &tree, ctx, &mut replacements, &mut issues)?
            || try_disabled_reference(node, source, ctx, &mut replacements);

        if handled {
            continue;
        }

        let mut cursor = node.walk();
        let mut children: Vec<_> = node.children(&mut cursor).collect();
        children.reverse();
        stack.extend(children);
    }

    let rewritten = apply_replacements(source, replacements)?;
    tracing::debug!(path = %ctx.path.display(), issues = issues.len(), "transform: rewrite complete");
    Ok((rewritten, issues))
}

fn try_statement_level<'a>(
    node: Node<'a>,
    source: &str,
    tree: &Tree,
    ctx: &TransformContext,
    replacements: &mut Vec<Replacement>,
    issues: &mut IssueCollection,
) -> Result<bool, TransformError> {
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => try_variable_statement(node, source, tree, ctx, replacements, issues),
        "expression_statement" => try_expression_statement(node, source, tree, ctx, replacements, issues),
        _ => Ok(false),
    }
}

fn try_variable_statement(
    node: Node,
    source: &str,
    tree: &Tree,
    ctx: &TransformContext,
    replacements: &mut Vec<Replacement>,
    issues: &mut IssueCollection,
) -> Result<bool, TransformError> {
    let mut cursor = node.walk();
    let declarators: Vec<_> = node.named_children(&mut cursor).filter(|c| c.kind() == "variable_declarator").collect();

    let has_macro_declarator =
        declarators.iter().any(|d| d.child_by_field_name("value").is_some_and(|v| unwrap_macro_call(v, source).is_some()));
    if !has_macro_declarator {
        return Ok(false);
    }

    let has_export = node.parent().is_some_and(|p| p.kind() == "export_statement");
    let stmt_node = if has_export { node.parent().expect("checked above") } else { node };
    let var_kind = declaration_keyword(&node, source);
    let export_kw = if has_export { "export " } else { "" };

    let mut rendered = Vec::with_capacity(declarators.len());

    for declarator in &declarators {
        let var_name = declarator.child_by_field_name("name").map(|n| node_text(&n, source)).unwrap_or_default();

        let Some(value) = declarator.child_by_field_name("value") else {
            rendered.push(format!("{export_kw}{var_kind} {};", node_text(declarator, source)));
            continue;
        };
        let Some(site) = unwrap_macro_call(value, source) else {
            rendered.push(format!("{export_kw}{var_kind} {};", node_text(declarator, source)));
            continue;
        };

        let args = site.call.child_by_field_name("arguments").expect("a recognized macro call always has arguments");
        check_arity(ctx, &site, &args)?;

        match site.kind {
            MacroName::Inline => {
                let callback = args.named_child(0).expect("arity already validated");
                match resolve_inline(&callback, tree, source, ctx, issues) {
                    None => return Ok(false),
                    Some(literal) => rendered.push(ast_inline_variable(var_name, var_kind, has_export, &literal)),
                }
            }
            MacroName::Ifdef | MacroName::Ifndef => {
                let Some(define_name) = string_literal_value(&args, 0, source) else { return Ok(false) };
                let fired = condition_fired(site.kind, &define_name, ctx.defines);
                let callback = args.named_child(1).expect("arity already validated");

                let text = if let Some(outer_suffix) = &site.outer_suffix {
                    let prefix = format!("{export_kw}{var_kind} {var_name} = ");
                    ast_define_call_expression(&prefix, outer_suffix, true, fired, &callback, source)
                } else {
                    ast_define_variable(var_name, var_kind, has_export, fired, &callback, source)
                };
                rendered.push(text);
            }
        }
    }

    let text = rendered.join("\n");
    replacements.push(Replacement::new(stmt_node.start_byte() as u32, stmt_node.end_byte() as u32, text));
    Ok(true)
}

fn try_expression_statement(
    node: Node,
    source: &str,
    tree: &Tree,
    ctx: &TransformContext,
    replacements: &mut Vec<Replacement>,
    issues: &mut IssueCollection,
) -> Result<bool, TransformError> {
    let Some(expr) = node.named_child(0) else { return Ok(false) };
    let Some(site) = unwrap_macro_call(expr, source) else { return Ok(false) };

    let args = site.call.child_by_field_name("arguments").expect("a recognized macro call always has arguments");
    check_arity(ctx, &site, &args)?;

    match site.kind {
        MacroName::Inline => {
            let callback = args.named_child(0).expect("arity already validated");
            match resolve_inline(&callback, tree, source, ctx, issues) {
                None => return Ok(false),
                Some(literal) => {
                    let text = ast_inline_call_expression(&literal, true);
                    replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, text));
                }
            }
        }
        MacroName::Ifdef | MacroName::Ifndef => {
            let Some(define_name) = string_literal_value(&args, 0, source) else { return Ok(false) };
            let fired = condition_fired(site.kind, &define_name, ctx.defines);
            let callback = args.named_child(1).expect("arity already validated");
            let suffix = site.outer_suffix.as_deref().unwrap_or("()");

            let text = ast_define_call_expression("", suffix, true, fired, &callback, source);
            replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, text));
        }
    }

    Ok(true)
}

fn try_nested_call(
    node: Node,
    source: &str,
    tree: &Tree,
    ctx: &TransformContext,
    replacements: &mut Vec<Replacement>,
    issues: &mut IssueCollection,
) -> Result<bool, TransformError> {
    if node.kind() != "call_expression" {
        return Ok(false);
    }
    let Some(site) = unwrap_macro_call(node, source) else { return Ok(false) };

    let args = site.call.child_by_field_name("arguments").expect("a recognized macro call always has arguments");
    check_arity(ctx, &site, &args)?;

    match site.kind {
        MacroName::Inline => {
            let callback = args.named_child(0).expect("arity already validated");
            match resolve_inline(&callback, tree, source, ctx, issues) {
                None => return Ok(false),
                Some(literal) => {
                    let text = ast_inline_call_expression(&literal, false);
                    replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, text));
                }
            }
        }
        MacroName::Ifdef | MacroName::Ifndef => {
            let Some(define_name) = string_literal_value(&args, 0, source) else { return Ok(false) };
            let fired = condition_fired(site.kind, &define_name, ctx.defines);
            let callback = args.named_child(1).expect("arity already validated");
            let suffix = site.outer_suffix.as_deref().unwrap_or("()");

            let text = ast_define_call_expression("", suffix, false, fired, &callback, source);
            replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, text));
        }
    }

    Ok(true)
}

/// Collapses references to names in `ctx.metadata.disabled_macro_names`,
/// per the exceptions in the call-site recognition rules: a callee is
/// consumed wholesale (the whole call becomes `undefined`); a bare
/// identifier is preserved if it's a module-binding specifier or if its
/// parent is itself a macro site this pass already owns.
fn try_disabled_reference(node: Node, source: &str, ctx: &TransformContext, replacements: &mut Vec<Replacement>) -> bool {
    if ctx.metadata.disabled_macro_names.is_empty() {
        return false;
    }

    match node.kind() {
        "call_expression" => {
            let Some(callee) = node.child_by_field_name("function") else { return false };
            if callee.kind() == "identifier" && ctx.metadata.is_disabled(node_text(&callee, source)) {
                replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, "undefined"));
                return true;
            }
            false
        }
        "identifier" => {
            let name = node_text(&node, source);
            if !ctx.metadata.is_disabled(name) {
                return false;
            }
            if node.parent().is_some_and(|p| is_binding_specifier(p.kind())) {
                return false;
            }
            if parent_mentions_macro(&node, source) {
                return false;
            }
            replacements.push(Replacement::new(node.start_byte() as u32, node.end_byte() as u32, "undefined"));
            true
        }
        _ => false,
    }
}

fn resolve_inline(callback: &Node, tree: &Tree, source: &str, ctx: &TransformContext, issues: &mut IssueCollection) -> Option<String> {
    match extract_inline_code(callback, tree, source, ctx.file_id) {
        InlineExtraction::Unrecognized(warning) => {
            if let Some(warning) = warning {
                issues.push(warning);
            }
            None
        }
        InlineExtraction::Code(code) => {
            let working_dir = ctx.path.parent().unwrap_or_else(|| Path::new("."));
            match variantkit_eval::evaluate(&code, working_dir, ctx.node_binary, ctx.inline_eval_timeout) {
                Ok(value) => Some(variantkit_eval::value_to_js_literal(&value)),
                Err(err) => {
                    let span = Span::new(ctx.file_id, callback.start_byte() as u32, callback.end_byte() as u32);
                    issues.push(
                        Issue::error(format!("$$inline evaluation failed: {err}"))
                            .with_code("InlineEvaluationError")
                            .at(span),
                    );
                    None
                }
            }
        }
    }
}

fn check_arity(ctx: &TransformContext, site: &recognize::MacroCallSite<'_>, args: &Node) -> Result<(), TransformError> {
    let found = args.named_child_count();
    let expected = site.kind.expected_arity();
    if found == expected {
        return Ok(());
    }
    Err(TransformError::Arity {
        site: Span::new(ctx.file_id, site.call.start_byte() as u32, site.call.end_byte() as u32),
        macro_name: site.kind.as_str(),
        expected,
        found,
    })
}

fn declaration_keyword<'a>(node: &Node, source: &'a str) -> &'a str {
    if node.kind() == "variable_declaration" {
        return "var";
    }
    node.child(0).map(|c| node_text(&c, source)).unwrap_or("const")
}

fn string_literal_value(args: &Node, index: usize, source: &str) -> Option<String> {
    let node = args.named_child(index)?;
    if node.kind() != "string" {
        return None;
    }
    Some(node.named_child(0).map(|fragment| node_text(&fragment, source).to_string()).unwrap_or_default())
}

fn condition_fired(kind: MacroName, define_name: &str, defines: &HashMap<String, Value>) -> bool {
    let is_defined = is_truthy(defines.get(define_name));
    match kind {
        MacroName::Ifdef => is_defined,
        MacroName::Ifndef => !is_defined,
        MacroName::Inline => unreachable!("inline sites never reach condition_fired"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn ctx<'a>(path: &'a Path, metadata: &'a MacroMetadata, defines: &'a HashMap<String, Value>) -> TransformContext<'a> {
        TransformContext {
            file_id: FileId::from_path(path),
            path,
            dialect: Dialect::TypeScript,
            metadata,
            defines,
            node_binary: Path::new("node"),
            inline_eval_timeout: Duration::from_secs(5),
        }
    }

    fn defines(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn scenario_1_ifdef_disabled_variable_form() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        metadata.disabled_macro_names.insert("$$log".to_string());
        let d = defines(&[("DEBUG", serde_json::json!(false))]);

        let source = r#"const $$log = $$ifdef("DEBUG", () => console.log);"#;
        let (out, issues) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "const $$log = undefined;");
        assert!(issues.is_empty());
    }

    #[test]
    fn scenario_2_ifdef_enabled_arrow_expression_body() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = defines(&[("DEBUG", serde_json::json!(true))]);

        let source = r#"const $$debug = $$ifdef("DEBUG", () => 42);"#;
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "function $$debug() { return 42; }");
    }

    #[test]
    fn scenario_3_ifndef_enabled_exported_typed_arrow() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = defines(&[("PRODUCTION", serde_json::json!(false))]);

        let source = r#"export const $$dev = $$ifndef("PRODUCTION", (x: number): string => String(x));"#;
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "export function $$dev(x: number): string { return String(x); }");
    }

    #[test]
    fn scenario_5_disabled_reference_collapses_to_undefined() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.disabled_macro_names.insert("$$log".to_string());
        let d = HashMap::new();

        let source = "$$log();\n";
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "undefined();\n");
    }

    #[test]
    fn multi_declarator_statement_rewrites_only_the_macro_binding() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = defines(&[("DEBUG", serde_json::json!(true))]);

        let source = r#"const a = 1, $$debug = $$ifdef("DEBUG", () => 42);"#;
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "const a = 1;\nfunction $$debug() { return 42; }");
    }

    #[test]
    fn unchanged_file_short_circuits() {
        let path = PathBuf::from("/virtual/a.ts");
        let metadata = MacroMetadata::default();
        let d = HashMap::new();

        let source = "const a = 1;\nfunction f() { return a; }\n";
        let (out, issues) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, source);
        assert!(issues.is_empty());
    }

    #[test]
    fn mismatched_arity_is_fatal() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = HashMap::new();

        let source = r#"const $$x = $$ifdef("DEBUG");"#;
        let err = transform(source, &ctx(&path, &metadata, &d)).unwrap_err();

        assert!(matches!(err, TransformError::Arity { expected: 2, found: 1, .. }));
    }

    #[test]
    fn non_string_define_name_is_left_unrewritten() {
        let path = PathBuf::from("/virtual/a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = HashMap::new();

        let source = "const $$x = $$ifdef(NAME, () => 1);\n";
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, source);
    }

    fn node_on_path() -> bool {
        std::process::Command::new("node").arg("--version").output().is_ok_and(|o| o.status.success())
    }

    #[test]
    fn scenario_4_inline_evaluation() {
        if !node_on_path() {
            eprintln!("skipping: no `node` binary on PATH");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = HashMap::new();

        let source = "const PI = $$inline(() => 3.14);\n";
        let (out, issues) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert!(issues.is_empty());
        assert_eq!(out, "const PI = 3.14;\n");
    }

    #[test]
    fn scenario_6_nested_inline_call_replaces_only_the_call() {
        if !node_on_path() {
            eprintln!("skipping: no `node` binary on PATH");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        let mut metadata = MacroMetadata::default();
        metadata.files_with_macros.insert(path.clone());
        let d = HashMap::new();

        let source = "const v = wrap($$inline(() => 7));\n";
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, "const v = wrap(7);\n");
    }

    #[test]
    fn idempotent_on_macro_free_files_even_when_metadata_nonempty() {
        let path = PathBuf::from("/virtual/other.ts");
        let mut metadata = MacroMetadata::default();
        metadata.disabled_macro_names = HashSet::from(["$$unrelated".to_string()]);
        let d = HashMap::new();

        let source = "export function f(x) { return x + 1; }\n";
        let (out, _) = transform(source, &ctx(&path, &metadata, &d)).unwrap();

        assert_eq!(out, source);
    }
}
