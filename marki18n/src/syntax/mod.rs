//! Parser-neutral syntax trees
//!
//! Marking and extraction never look at a concrete parser's node types. They
//! work on [`SyntaxNode`]s, which carry a small closed set of [`NodeKind`]s
//! plus byte offsets and line numbers into the source. The tree-sitter
//! adapters in [`javascript`] and [`html`] build these trees; any other
//! parser can do the same and implement [`SyntaxTree`].

pub mod html;
pub mod javascript;
pub mod sfc;

use std::borrow::Cow;
use std::path::Path;

pub use javascript::Dialect;

/// What kind of source file a path holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// JavaScript, including JSX
    JavaScript,
    TypeScript,
    Tsx,
    /// Vue single-file component
    Vue,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "vue" => Some(Self::Vue),
            _ => None,
        }
    }

    /// Script dialect, `None` for multi-region formats
    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Self::JavaScript => Some(Dialect::JavaScript),
            Self::TypeScript => Some(Dialect::TypeScript),
            Self::Tsx => Some(Dialect::Tsx),
            Self::Vue => None,
        }
    }
}

/// Node kinds the marking and extraction engines care about.
/// Everything else is [`NodeKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Quoted string literal in expression position; span includes the quotes
    StringLiteral,
    /// Template literal; span includes the backticks, children include its slots
    Template,
    /// `${expr}` inside a template; span covers the delimiters
    TemplateSlot,
    /// `` tag`...` ``; `name` is the tag expression
    TaggedTemplate,
    /// `callee(...)`; `name` is the callee expression, children are callee then arguments
    Call,
    /// JSX or HTML element; `name` is the tag name
    Element,
    /// Text between element tags
    ElementText,
    /// Element attribute; `name` is the attribute name
    Attribute,
    /// Attribute value without escape sequences; span includes quotes when present
    AttributeValue,
    /// `{expr}` inside JSX
    ExpressionContainer,
    /// Comment; `name` is the trimmed comment body
    Comment,
    /// Identifier bound by an import, declaration or function; `name` is the identifier
    Binding,
    Other,
}

/// One node of a parser-neutral tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
    /// 1-based line of `start`
    pub line: usize,
    pub name: Option<String>,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, start: usize, end: usize, line: usize) -> Self {
        Self {
            kind,
            start,
            end,
            line,
            name: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn name_is(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn first_child_of(&self, kind: NodeKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|child| child.kind == kind)
    }
}

/// Location metadata of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

/// Returned by visitor callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

/// The capability marking and extraction need from a parsed source
pub trait SyntaxTree {
    fn source(&self) -> &str;

    fn root(&self) -> &SyntaxNode;

    fn location_of(&self, node: &SyntaxNode) -> Location {
        Location {
            start: node.start,
            end: node.end,
            line: node.line,
        }
    }

    fn text_of(&self, node: &SyntaxNode) -> &str {
        &self.source()[node.start..node.end]
    }

    /// Depth-first, pre-order walk. `callback` runs for every node whose kind
    /// satisfies `matcher` and receives the node's ancestors, root first.
    /// Returning [`Walk::SkipChildren`] prunes the node's subtree.
    fn visit<M, F>(&self, matcher: M, mut callback: F)
    where
        M: Fn(NodeKind) -> bool,
        F: FnMut(&SyntaxNode, &[&SyntaxNode]) -> Walk,
    {
        let mut ancestors = Vec::new();
        walk_node(self.root(), &mut ancestors, &matcher, &mut callback);
    }
}

fn walk_node<'t, M, F>(
    node: &'t SyntaxNode,
    ancestors: &mut Vec<&'t SyntaxNode>,
    matcher: &M,
    callback: &mut F,
) where
    M: Fn(NodeKind) -> bool,
    F: FnMut(&SyntaxNode, &[&SyntaxNode]) -> Walk,
{
    if matcher(node.kind) && callback(node, ancestors) == Walk::SkipChildren {
        return;
    }
    ancestors.push(node);
    for child in &node.children {
        walk_node(child, ancestors, matcher, callback);
    }
    ancestors.pop();
}

/// A source buffer together with its neutral tree
#[derive(Debug, Clone)]
pub struct ParsedSource<'s> {
    source: Cow<'s, str>,
    root: SyntaxNode,
}

impl<'s> ParsedSource<'s> {
    pub fn new(source: impl Into<Cow<'s, str>>, root: SyntaxNode) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }
}

impl SyntaxTree for ParsedSource<'_> {
    fn source(&self) -> &str {
        &self.source
    }

    fn root(&self) -> &SyntaxNode {
        &self.root
    }
}

/// 1-based line number of a byte offset
pub fn line_at(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedSource<'static> {
        let source = "ab";
        let root = SyntaxNode::new(NodeKind::Other, 0, 2, 1).with_children(vec![
            SyntaxNode::new(NodeKind::Template, 0, 1, 1).with_children(vec![SyntaxNode::new(
                NodeKind::StringLiteral,
                0,
                1,
                1,
            )]),
            SyntaxNode::new(NodeKind::StringLiteral, 1, 2, 1),
        ]);
        ParsedSource::new(source, root)
    }

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(
            SourceKind::from_path(Path::new("src/App.vue")),
            Some(SourceKind::Vue)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("a/b.tsx")),
            Some(SourceKind::Tsx)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("index.mjs")),
            Some(SourceKind::JavaScript)
        );
        assert_eq!(SourceKind::from_path(Path::new("README.md")), None);
        assert_eq!(SourceKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_visit_matcher_and_ancestors() {
        let tree = sample();
        let mut seen = Vec::new();
        tree.visit(
            |kind| kind == NodeKind::StringLiteral,
            |node, ancestors| {
                seen.push((node.start, ancestors.len()));
                Walk::Continue
            },
        );
        assert_eq!(seen, vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn test_visit_skip_children() {
        let tree = sample();
        let mut count = 0;
        tree.visit(
            |_| true,
            |node, _| {
                count += 1;
                if node.kind == NodeKind::Template {
                    Walk::SkipChildren
                } else {
                    Walk::Continue
                }
            },
        );
        // root, template, trailing literal
        assert_eq!(count, 3);
    }

    #[test]
    fn test_line_at() {
        let source = "a\nb\n\nc";
        assert_eq!(line_at(source, 0), 1);
        assert_eq!(line_at(source, 2), 2);
        assert_eq!(line_at(source, 5), 4);
        assert_eq!(line_at(source, 100), 4);
    }
}
