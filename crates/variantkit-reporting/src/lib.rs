//! Issue reporting shared across the VariantKit macro pipeline.
//!
//! Every warning and error produced by the analyzer, transformer,
//! evaluator, and lifecycle plugin is an [`Issue`], collected per build into
//! an [`IssueCollection`].

use serde::Deserialize;
use serde::Serialize;
use variantkit_syntax::Replacement;
use variantkit_syntax::Span;

/// Severity of a reported issue, ordered from least to most severe.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum Level {
    Note,
    Help,
    Warning,
    Error,
}

/// A code span annotated with an optional message, attached to an issue for
/// locating it in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub message: Option<String>,
    pub span: Span,
}

impl Annotation {
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { message: None, span }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A single diagnostic produced anywhere in the pipeline.
///
/// Carries a `{ text, location, detail? }`-style payload, generalized to
/// carry zero or more annotations (the primary one is the call site) and,
/// for the transformer, the [`Replacement`] it would have applied had the
/// issue not been fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub level: Level,
    pub code: Option<String>,
    pub message: String,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub annotations: Vec<Annotation>,
    pub edit: Option<Replacement>,
}

impl Issue {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            message: message.into(),
            notes: Vec::new(),
            help: None,
            annotations: Vec::new(),
            edit: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.annotations.push(Annotation::new(span));
        self
    }

    #[must_use]
    pub fn primary_span(&self) -> Option<Span> {
        self.annotations.first().map(|a| a.span)
    }
}

/// A collection of issues accumulated over the course of a build or a single
/// file load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueCollection {
    issues: Vec<Issue>,
}

impl IssueCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn has_minimum_level(&self, level: Level) -> bool {
        self.issues.iter().any(|issue| issue.level >= level)
    }

    #[must_use]
    pub fn get_highest_level(&self) -> Option<Level> {
        self.issues.iter().map(|issue| issue.level).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Sorts by severity descending, then by primary span.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.issues.sort_by(|a, b| {
            b.level.cmp(&a.level).then_with(|| match (a.primary_span(), b.primary_span()) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        });
        self
    }
}

impl FromIterator<Issue> for IssueCollection {
    fn from_iter<T: IntoIterator<Item = Issue>>(iter: T) -> Self {
        Self { issues: iter.into_iter().collect() }
    }
}

impl IntoIterator for IssueCollection {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}
