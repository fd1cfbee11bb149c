//! Shared span/position types, a TypeScript AST wrapper, and text-edit
//! application used throughout the VariantKit macro pipeline.

mod file_id;
mod parse;
mod replacement;
mod span;

pub use file_id::FileId;
pub use parse::Dialect;
pub use parse::ParseError;
pub use parse::node_text;
pub use parse::parse;
pub use replacement::Replacement;
pub use replacement::ReplacementError;
pub use replacement::apply_replacements;
pub use span::Position;
pub use span::Span;
pub use span::line_starts_with_comment;
pub use span::offset_to_line_and_column;

pub use tree_sitter::Node;
pub use tree_sitter::Tree;
pub use tree_sitter::TreeCursor;
