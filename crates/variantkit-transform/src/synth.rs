use tree_sitter::Node;
use variantkit_syntax::node_text;

use crate::recognize::function_parts;

/// Synthesizes the replacement text for a variable-bound `$$ifdef`/`$$ifndef`
/// site: either a rebinding to `undefined`, or a named function (or const)
/// declaration carrying the callback's body.
pub fn ast_define_variable(var_name: &str, var_kind: &str, has_export: bool, fired: bool, callback: &Node, source: &str) -> String {
    let export_kw = if has_export { "export " } else { "" };

    if !fired {
        return format!("{export_kw}{var_kind} {var_name} = undefined;");
    }

    if let Some(parts) = function_parts(callback, source) {
        let async_kw = if parts.is_async { "async " } else { "" };
        let head = format!("{async_kw}{export_kw}function {var_name}({}){}", parts.params_text, parts.return_type_text);
        if parts.is_block {
            format!("{head} {}", parts.body_text)
        } else {
            format!("{head} {{ return {}; }}", parts.body_text)
        }
    } else {
        format!("{export_kw}const {var_name} = {};", node_text(callback, source))
    }
}

/// Synthesizes the replacement text for a conditional-IIFE site: empty when
/// the condition didn't fire (the call vanishes), otherwise an immediately
/// invoked wrapper around the callback.
pub fn ast_define_call_expression(prefix: &str, suffix: &str, terminate: bool, fired: bool, callback: &Node, source: &str) -> String {
    if !fired {
        return String::new();
    }

    let core = if function_parts(callback, source).is_some() {
        format!("{prefix}({})({suffix})", node_text(callback, source))
    } else {
        format!("{prefix}(() => {{ return {}; }})({suffix})", node_text(callback, source))
    };

    if terminate { format!("{core};") } else { core }
}

/// Synthesizes the replacement text for a variable-bound `$$inline` site.
pub fn ast_inline_variable(var_name: &str, var_kind: &str, has_export: bool, result_literal: &str) -> String {
    let export_kw = if has_export { "export " } else { "" };
    format!("{export_kw}{var_kind} {var_name} = {result_literal};")
}

/// Synthesizes the replacement text for a standalone or nested `$$inline`
/// call: the stringified result, terminated with `;` only in statement
/// position.
pub fn ast_inline_call_expression(result_literal: &str, terminate: bool) -> String {
    if terminate { format!("{result_literal};") } else { result_literal.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantkit_syntax::Dialect;
    use variantkit_syntax::parse;

    fn find_callback<'a>(tree: &'a tree_sitter::Tree, source: &str) -> Node<'a> {
        let root = tree.root_node();
        let decl = root.named_child(0).unwrap();
        let var_decl = if decl.kind() == "export_statement" { decl.child_by_field_name("declaration").unwrap() } else { decl };
        let declarator = var_decl.named_child(0).unwrap();
        let init = declarator.child_by_field_name("value").unwrap();
        init.child_by_field_name("arguments").unwrap().named_child(1).unwrap()
    }

    #[test]
    fn emits_function_for_expression_body_arrow() {
        let source = r#"const $$debug = $$ifdef("DEBUG", () => 42);"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let callback = find_callback(&tree, source);

        let out = ast_define_variable("$$debug", "const", false, true, &callback, source);
        assert_eq!(out, "function $$debug() { return 42; }");
    }

    #[test]
    fn emits_undefined_when_not_fired() {
        let source = r#"const $$log = $$ifdef("DEBUG", () => console.log);"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let callback = find_callback(&tree, source);

        let out = ast_define_variable("$$log", "const", false, false, &callback, source);
        assert_eq!(out, "const $$log = undefined;");
    }

    #[test]
    fn preserves_export_and_typed_params() {
        let source = r#"export const $$dev = $$ifndef("PRODUCTION", (x: number): string => String(x));"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let callback = find_callback(&tree, source);

        let out = ast_define_variable("$$dev", "const", true, true, &callback, source);
        assert_eq!(out, "export function $$dev(x: number): string { return String(x); }");
    }
}
