use tree_sitter::Node;
use tree_sitter::Tree;
use variantkit_reporting::Issue;
use variantkit_syntax::FileId;
use variantkit_syntax::Span;
use variantkit_syntax::node_text;

/// The result of extracting executable code from a `$$inline` callback node.
pub enum InlineExtraction {
    /// A self-contained CommonJS snippet ready to hand to the sandbox.
    Code(String),
    /// Extraction failed (an identifier that doesn't resolve to a callable
    /// top-level binding); the site is left unrewritten. Carries a warning
    /// when one should be reported.
    Unrecognized(Option<Issue>),
}

/// Implements the three extraction cases: a function-like node is wrapped
/// and immediately invoked; a bare identifier is resolved against top-level
/// bindings in the same file; anything else is used as-is.
pub fn extract_inline_code(callback: &Node, tree: &Tree, source: &str, file_id: FileId) -> InlineExtraction {
    match callback.kind() {
        "arrow_function" | "function_expression" | "generator_function" => {
            InlineExtraction::Code(format!("module.exports = ({})();", node_text(callback, source)))
        }
        "identifier" => {
            let name = node_text(callback, source);
            match find_top_level_binding(tree, source, name) {
                Some(text) => InlineExtraction::Code(format!("module.exports = ({text})();")),
                None => {
                    let span = Span::new(file_id, callback.start_byte() as u32, callback.end_byte() as u32);
                    let issue = Issue::warning(format!("$$inline: {name} not found")).at(span);
                    InlineExtraction::Unrecognized(Some(issue))
                }
            }
        }
        _ => InlineExtraction::Code(format!("module.exports = ({});", node_text(callback, source))),
    }
}

/// Searches the file's top-level statements for a declaration binding `name`
/// to a function-like value, returning its source text if found.
fn find_top_level_binding(tree: &Tree, source: &str, name: &str) -> Option<String> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    root.children(&mut cursor).find_map(|child| binding_text_if_matches(&child, source, name))
}

fn binding_text_if_matches(node: &Node, source: &str, name: &str) -> Option<String> {
    let target =
        if node.kind() == "export_statement" { node.child_by_field_name("declaration")? } else { *node };

    match target.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = target.walk();
            for declarator in target.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let decl_name = declarator.child_by_field_name("name")?;
                if node_text(&decl_name, source) != name {
                    continue;
                }
                let value = declarator.child_by_field_name("value")?;
                if matches!(value.kind(), "arrow_function" | "function_expression" | "generator_function") {
                    return Some(node_text(&value, source).to_string());
                }
            }
            None
        }
        "function_declaration" => {
            let fn_name = target.child_by_field_name("name")?;
            if node_text(&fn_name, source) == name { Some(node_text(&target, source).to_string()) } else { None }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantkit_syntax::Dialect;
    use variantkit_syntax::parse;

    #[test]
    fn resolves_bare_identifier_to_top_level_function() {
        let source = "function helper() { return 7; }\nconst v = $$inline(helper);\n";
        let tree = parse(source, Dialect::TypeScript).unwrap();

        let found = find_top_level_binding(&tree, source, "helper");
        assert_eq!(found.as_deref(), Some("function helper() { return 7; }"));
    }

    #[test]
    fn reports_unrecognized_when_identifier_is_unresolved() {
        let source = "const v = $$inline(missing);\n";
        let tree = parse(source, Dialect::TypeScript).unwrap();
        let root = tree.root_node();
        let declarator = root.named_child(0).unwrap().named_child(0).unwrap();
        let init = declarator.child_by_field_name("value").unwrap();
        let callback = init.child_by_field_name("arguments").unwrap().named_child(0).unwrap();

        match extract_inline_code(&callback, &tree, source, FileId::zero()) {
            InlineExtraction::Unrecognized(Some(issue)) => assert!(issue.message.contains("missing")),
            _ => panic!("expected an unrecognized extraction with a warning"),
        }
    }
}
