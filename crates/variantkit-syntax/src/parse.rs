use thiserror::Error;
use tree_sitter::Node;
use tree_sitter::Parser;
use tree_sitter::Tree;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to initialize the TypeScript grammar: {0}")]
    LanguageInit(#[from] tree_sitter::LanguageError),
    #[error("the parser produced no syntax tree (source likely exceeded tree-sitter's size limits)")]
    NoTree,
}

/// Which dialect to parse with. `.tsx`/`.jsx` files need the TSX grammar so that
/// `<Foo>` is not ambiguous with a type-assertion cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

impl Dialect {
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "tsx" | "jsx" => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }
}

/// Parses `source` into a tree-sitter concrete syntax tree using the TypeScript
/// or TSX grammar. The transformer walks this tree directly, dispatching on
/// each node's `kind()` string rather than through open polymorphism.
pub fn parse(source: &str, dialect: Dialect) -> Result<Tree, ParseError> {
    let language = match dialect {
        Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    };

    let mut parser = Parser::new();
    parser.set_language(&language)?;

    parser.parse(source, None).ok_or(ParseError::NoTree)
}

/// Slices the original source text covered by `node`.
#[must_use]
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}
