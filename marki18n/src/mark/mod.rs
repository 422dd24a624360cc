//! Marking engine
//!
//! Finds string literals, template literals, element text and attribute
//! values that contain target-script text and rewrites each one into a
//! tagged template of the configured tag:
//!
//! ```text
//! const a = '你好';            →  const a = t`你好`;
//! const b = `共${n}项`;        →  const b = t`共${n}项`;
//! <p title="标题">你好</p>     →  <p title={t`标题`}>{t`你好`}</p>
//! ```
//!
//! Marking is idempotent: tagged templates and arguments of the tag function
//! are left alone, so marking an already marked file yields `None`.

mod escape;
pub(crate) mod vue;

pub use escape::{decode_jsx_text, escape_plain, escape_string_literal};

use tracing::debug;

use crate::config::Config;
use crate::detect::TextDetector;
use crate::error::Result;
use crate::span::{apply_spans, ReplacementSpan};
use crate::syntax::{javascript, NodeKind, SourceKind, SyntaxNode, SyntaxTree, Walk};

/// Options of the marking engine
#[derive(Debug, Clone)]
pub struct MarkOptions {
    pub tag_name: String,
    pub ignore_annotation: String,
    pub ignore_attribute_names: Vec<String>,
    /// Statement inserted at the top of a changed file when the tag is unbound
    pub import_binding: Option<String>,
    pub detector: TextDetector,
}

impl Default for MarkOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            tag_name: config.tag_name,
            ignore_annotation: config.ignore_annotation,
            ignore_attribute_names: config.ignore_attribute_names,
            import_binding: None,
            detector: TextDetector::default(),
        }
    }
}

impl MarkOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            tag_name: config.tag_name.clone(),
            ignore_annotation: config.ignore_annotation.clone(),
            ignore_attribute_names: config.ignore_attribute_names.clone(),
            import_binding: config.import_binding.clone(),
            detector: TextDetector::new(&config.detect_pattern)?,
        })
    }

    /// Identifier that must be bound for the tag to resolve: `i18n` for `i18n.t`
    pub fn binding_name(&self) -> &str {
        self.tag_name
            .split('.')
            .next()
            .unwrap_or(self.tag_name.as_str())
    }

    fn is_ignored_attribute(&self, name: &str) -> bool {
        self.ignore_attribute_names.iter().any(|n| n == name)
    }
}

/// Mark one source file.
///
/// # Returns
///
/// `Ok(None)` when nothing needed marking, otherwise the rewritten source.
///
/// # Errors
///
/// [`crate::Error::Parse`] when the file cannot be parsed.
pub fn mark(source: &str, kind: SourceKind, options: &MarkOptions) -> Result<Option<String>> {
    let Some(dialect) = kind.dialect() else {
        return vue::mark_component(source, options);
    };

    let tree = javascript::parse(source, dialect)?;
    let spans = collect_spans(&tree, options);
    if spans.is_empty() {
        return Ok(None);
    }
    debug!("Marking {} fragment(s)", spans.len());

    let mut output = apply_spans(source, spans)?;
    if let Some(binding) = &options.import_binding {
        if !has_binding(&tree, options.binding_name()) {
            output = insert_binding(&output, binding);
        }
    }
    Ok(Some(output))
}

/// Collect replacement spans for every candidate in a script tree
pub fn collect_spans<T: SyntaxTree>(tree: &T, options: &MarkOptions) -> Vec<ReplacementSpan> {
    let source = tree.source();
    let tag = &options.tag_name;
    let mut spans = Vec::new();

    tree.visit(
        |_| true,
        |node, ancestors| {
            if is_ignored(source, node, ancestors, &options.ignore_annotation) {
                debug!("Skipping annotated node at line {}", node.line);
                return Walk::SkipChildren;
            }

            let is_tag_argument = ancestors
                .last()
                .is_some_and(|p| p.kind == NodeKind::Call && p.name_is(tag));

            match node.kind {
                NodeKind::TaggedTemplate => Walk::SkipChildren,
                NodeKind::Template if is_tag_argument => Walk::SkipChildren,
                NodeKind::Attribute
                    if node
                        .name
                        .as_deref()
                        .is_some_and(|n| options.is_ignored_attribute(n)) =>
                {
                    Walk::SkipChildren
                }
                NodeKind::StringLiteral => {
                    let raw = tree.text_of(node);
                    let body = strip_quotes(raw);
                    if !is_tag_argument && options.detector.matches(body) {
                        spans.push(ReplacementSpan::new(
                            node.start,
                            node.end,
                            format!("{}`{}`", tag, escape_string_literal(body)),
                        ));
                    }
                    Walk::Continue
                }
                NodeKind::Template => {
                    let has_target_text = template_literal_parts(source, node)
                        .iter()
                        .any(|part| options.detector.matches(part));
                    if has_target_text {
                        spans.push(ReplacementSpan::insert(node.start, tag.as_str()));
                        Walk::SkipChildren
                    } else {
                        Walk::Continue
                    }
                }
                NodeKind::ElementText => {
                    let (start, end) = trimmed_range(source, node.start, node.end);
                    let text = &source[start..end];
                    if options.detector.matches(text) {
                        spans.push(ReplacementSpan::new(
                            start,
                            end,
                            format!("{{{}`{}`}}", tag, escape_plain(&decode_jsx_text(text))),
                        ));
                    }
                    Walk::Continue
                }
                NodeKind::AttributeValue => {
                    let body = strip_quotes(tree.text_of(node));
                    if options.detector.matches(body) {
                        spans.push(ReplacementSpan::new(
                            node.start,
                            node.end,
                            format!("{{{}`{}`}}", tag, escape_plain(body)),
                        ));
                    }
                    Walk::Continue
                }
                _ => Walk::Continue,
            }
        },
    );
    spans
}

/// Does the tree bind `name` through an import, declarator or function declaration?
pub fn has_binding<T: SyntaxTree>(tree: &T, name: &str) -> bool {
    let mut found = false;
    tree.visit(
        |kind| kind == NodeKind::Binding,
        |node, _| {
            found |= node.name_is(name);
            Walk::Continue
        },
    );
    found
}

/// Insert `binding` as the first line of `source`, after a shebang line if any
pub fn insert_binding(source: &str, binding: &str) -> String {
    if source.starts_with("#!") {
        return match source.find('\n') {
            Some(newline) => format!(
                "{}{}\n{}",
                &source[..=newline],
                binding,
                &source[newline + 1..]
            ),
            None => format!("{}\n{}\n", source, binding),
        };
    }
    format!("{}\n{}", binding, source)
}

/// Is `node` (whose enclosing nodes were already checked) preceded by an
/// ignore comment? Whitespace-only text between the two is skipped.
pub(crate) fn is_ignored(
    source: &str,
    node: &SyntaxNode,
    ancestors: &[&SyntaxNode],
    annotation: &str,
) -> bool {
    let Some(parent) = ancestors.last() else {
        return false;
    };
    let Some(index) = parent
        .children
        .iter()
        .position(|sibling| std::ptr::eq(sibling, node))
    else {
        return false;
    };

    parent.children[..index]
        .iter()
        .rev()
        .find(|sibling| {
            !(sibling.kind == NodeKind::ElementText
                && source[sibling.start..sibling.end].trim().is_empty())
        })
        .is_some_and(|sibling| sibling.kind == NodeKind::Comment && sibling.name_is(annotation))
}

/// Literal text of a template between its slots
pub(crate) fn template_literal_parts<'s>(source: &'s str, template: &SyntaxNode) -> Vec<&'s str> {
    let mut parts = Vec::new();
    let mut cursor = template.start + 1;
    for slot in template
        .children
        .iter()
        .filter(|child| child.kind == NodeKind::TemplateSlot)
    {
        parts.push(&source[cursor..slot.start]);
        cursor = slot.end;
    }
    let end = template.end.saturating_sub(1).max(cursor);
    parts.push(&source[cursor..end]);
    parts
}

pub(crate) fn strip_quotes(raw: &str) -> &str {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close && raw.len() >= 2 => {
            &raw[1..raw.len() - 1]
        }
        _ => raw,
    }
}

/// Byte range of `source[start..end]` without surrounding whitespace
pub(crate) fn trimmed_range(source: &str, start: usize, end: usize) -> (usize, usize) {
    let text = &source[start..end];
    let leading = text.len() - text.trim_start().len();
    let trailing = text.len() - text.trim_end().len();
    if leading == text.len() {
        return (start, start);
    }
    (start + leading, end - trailing)
}
