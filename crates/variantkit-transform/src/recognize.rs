use tree_sitter::Node;
use variantkit_syntax::node_text;

pub const MACRO_NAMES: [&str; 3] = ["$$ifdef", "$$ifndef", "$$inline"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroName {
    Ifdef,
    Ifndef,
    Inline,
}

impl MacroName {
    #[must_use]
    pub fn expected_arity(self) -> usize {
        match self {
            MacroName::Ifdef | MacroName::Ifndef => 2,
            MacroName::Inline => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MacroName::Ifdef => "$$ifdef",
            MacroName::Ifndef => "$$ifndef",
            MacroName::Inline => "$$inline",
        }
    }
}

#[must_use]
pub fn macro_name_of(text: &str) -> Option<MacroName> {
    match text {
        "$$ifdef" => Some(MacroName::Ifdef),
        "$$ifndef" => Some(MacroName::Ifndef),
        "$$inline" => Some(MacroName::Inline),
        _ => None,
    }
}

/// A recognized macro call, possibly unwrapped from an outer IIFE invocation
/// or a `... as T` type assertion.
pub struct MacroCallSite<'tree> {
    pub kind: MacroName,
    pub call: Node<'tree>,
    /// The text of an outer invocation's argument list, e.g. `$$ifdef(...)(1, 2)`.
    pub outer_suffix: Option<String>,
}

fn strip_as_expression(node: Node<'_>) -> Node<'_> {
    if node.kind() == "as_expression" {
        if let Some(inner) = node.named_child(0) {
            return strip_as_expression(inner);
        }
    }
    node
}

/// Unwraps `node` looking for one of the three recognized macro-call shapes
/// described for variable and expression-statement initializers: a plain
/// call, an outer-invoked IIFE (`macro(args)(outerArgs)`), or a type-asserted
/// call (`macro(args) as T`).
pub fn unwrap_macro_call<'tree>(node: Node<'tree>, source: &str) -> Option<MacroCallSite<'tree>> {
    let node = strip_as_expression(node);
    if node.kind() != "call_expression" {
        return None;
    }

    let callee = node.child_by_field_name("function")?;

    if callee.kind() == "call_expression" {
        let inner_callee = callee.child_by_field_name("function")?;
        if inner_callee.kind() != "identifier" {
            return None;
        }
        let kind = macro_name_of(node_text(&inner_callee, source))?;
        let outer_args = node.child_by_field_name("arguments")?;
        return Some(MacroCallSite { kind, call: callee, outer_suffix: Some(node_text(&outer_args, source).to_string()) });
    }

    if callee.kind() == "identifier" {
        let kind = macro_name_of(node_text(&callee, source))?;
        return Some(MacroCallSite { kind, call: node, outer_suffix: None });
    }

    None
}

/// The pieces of a function-like node (`arrow_function`, `function_expression`,
/// `generator_function`) needed to re-emit it as a named function declaration.
pub struct FunctionParts<'a> {
    pub is_async: bool,
    pub params_text: String,
    pub return_type_text: String,
    pub is_block: bool,
    pub body_text: &'a str,
}

/// Extracts [`FunctionParts`] from a function-like node, or `None` if `node`
/// is not one.
pub fn function_parts<'a>(node: &Node, source: &'a str) -> Option<FunctionParts<'a>> {
    if !matches!(node.kind(), "arrow_function" | "function_expression" | "generator_function") {
        return None;
    }

    let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);

    let params_text = if let Some(params) = node.child_by_field_name("parameters") {
        node_text(&params, source).to_string()
    } else if let Some(param) = node.child_by_field_name("parameter") {
        format!("({})", node_text(&param, source))
    } else {
        "()".to_string()
    };

    let return_type_text =
        node.child_by_field_name("return_type").map(|t| node_text(&t, source).to_string()).unwrap_or_default();

    let body = node.child_by_field_name("body")?;
    let is_block = body.kind() == "statement_block";

    Some(FunctionParts { is_async, params_text, return_type_text, is_block, body_text: node_text(&body, source) })
}

/// `true` for node kinds whose identifier children are module bindings, not
/// value references, and so are preserved even when they name a disabled
/// macro.
#[must_use]
pub fn is_binding_specifier(kind: &str) -> bool {
    matches!(kind, "import_specifier" | "export_specifier" | "namespace_import" | "namespace_export")
}

/// `true` if `node`'s parent's source text mentions one of the three macro
/// names, meaning some other pass already owns rewriting that region.
#[must_use]
pub fn parent_mentions_macro(node: &Node, source: &str) -> bool {
    node.parent().is_some_and(|parent| {
        let text = node_text(&parent, source);
        MACRO_NAMES.iter().any(|name| text.contains(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantkit_syntax::Dialect;
    use variantkit_syntax::parse;

    fn call_expression<'t>(tree: &'t tree_sitter::Tree, source: &str) -> Node<'t> {
        let root = tree.root_node();
        let stmt = root.named_child(0).unwrap();
        let decl = stmt.named_child(0).unwrap();
        decl.child_by_field_name("value").unwrap()
    }

    #[test]
    fn recognizes_plain_macro_call() {
        let source = r#"const x = $$ifdef("DEBUG", () => 1);"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let node = call_expression(&tree, source);

        let site = unwrap_macro_call(node, source).unwrap();
        assert_eq!(site.kind, MacroName::Ifdef);
        assert!(site.outer_suffix.is_none());
    }

    #[test]
    fn recognizes_outer_invoked_iife_form() {
        let source = r#"const x = $$ifdef("DEBUG", (a) => a)(1);"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let node = call_expression(&tree, source);

        let site = unwrap_macro_call(node, source).unwrap();
        assert_eq!(site.kind, MacroName::Ifdef);
        assert_eq!(site.outer_suffix.as_deref(), Some("(1)"));
    }

    #[test]
    fn recognizes_type_asserted_call() {
        let source = r#"const x = $$inline(() => 1) as number;"#;
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let node = call_expression(&tree, source);

        let site = unwrap_macro_call(node, source).unwrap();
        assert_eq!(site.kind, MacroName::Inline);
    }

    #[test]
    fn ignores_non_macro_calls() {
        let source = "const x = doSomething(1);";
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let node = call_expression(&tree, source);

        assert!(unwrap_macro_call(node, source).is_none());
    }
}
