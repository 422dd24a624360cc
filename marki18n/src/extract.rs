//! Extraction engine
//!
//! Every tagged-template invocation of the configured tag becomes one
//! [`Entry`]. The key is the template's literal text with each interpolation
//! replaced by a generated placeholder:
//!
//! ```text
//! t`你好，${user.name}，共${count}条`   →   "你好，{a}，共{b}条"   (variables a, b)
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::mark::template_literal_parts;
use crate::mark::vue::{attribute_body, is_directive};
use crate::normalize::{normalize_fragment, PlaceholderStyle};
use crate::syntax::sfc::{self, split_interpolations, Expression, RegionKind, TextPart};
use crate::syntax::{javascript, line_at, NodeKind, SourceKind, SyntaxTree, Walk};

/// One extracted fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Canonical dictionary key
    pub key: String,
    /// Source-language text; equal to `key` at extraction time
    pub text: String,
    /// Placeholder names in the order they appear in `key`
    pub variables: Vec<String>,
    /// 1-based line of the invocation
    pub line: usize,
    /// Normalized path of the file the entry came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub tag_name: String,
    pub placeholder: PlaceholderStyle,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExtractOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tag_name: config.tag_name.clone(),
            placeholder: config.placeholder.clone(),
        }
    }
}

/// Extract every tagged fragment of `source`.
///
/// `file_path` is stamped on each entry as given; callers pass a path already
/// normalized with [`crate::usage::normalize_path`].
pub fn extract(
    source: &str,
    kind: SourceKind,
    options: &ExtractOptions,
    file_path: Option<&str>,
) -> Result<Vec<Entry>> {
    let mut entries = match kind.dialect() {
        Some(dialect) => {
            let tree = javascript::parse(source, dialect)?;
            extract_tree(&tree, options)
        }
        None => extract_component(source, options)?,
    };

    if let Some(path) = file_path {
        for entry in &mut entries {
            entry.file_path = Some(path.to_string());
        }
    }
    Ok(entries)
}

/// Entries of one tree; lines are relative to the tree's source
pub fn extract_tree<T: SyntaxTree>(tree: &T, options: &ExtractOptions) -> Vec<Entry> {
    let source = tree.source();
    let mut entries = Vec::new();

    tree.visit(
        |kind| kind == NodeKind::TaggedTemplate,
        |node, _| {
            if !node.name_is(&options.tag_name) {
                return Walk::Continue;
            }
            if let Some(template) = node.first_child_of(NodeKind::Template) {
                let segments = template_literal_parts(source, template);
                let normalized = normalize_fragment(&segments, &options.placeholder);
                entries.push(Entry {
                    text: normalized.key.clone(),
                    key: normalized.key,
                    variables: normalized.variables,
                    line: tree.location_of(node).line,
                    file_path: None,
                });
            }
            // slots may hold nested invocations
            Walk::Continue
        },
    );
    entries
}

fn extract_component(source: &str, options: &ExtractOptions) -> Result<Vec<Entry>> {
    let doc = sfc::parse(source)?;
    let dialect = doc.expression_dialect();
    let mut entries = Vec::new();

    for region in &doc.regions {
        match region.kind {
            RegionKind::Script { dialect, .. } => {
                let tree = javascript::parse(region.text(source), dialect)?;
                entries.extend(extract_tree(&tree, options).into_iter().map(|mut entry| {
                    entry.line += region.line_offset;
                    entry
                }));
            }
            RegionKind::Template => {
                let mut expressions = Vec::new();
                doc.tree.visit(
                    |kind| matches!(kind, NodeKind::Attribute | NodeKind::ElementText),
                    |node, _| {
                        if !region.contains(node) {
                            return Walk::Continue;
                        }
                        match node.kind {
                            NodeKind::Attribute => {
                                let name = node.name.as_deref().unwrap_or_default();
                                if let (true, Some(value)) =
                                    (is_directive(name), node.first_child_of(NodeKind::AttributeValue))
                                {
                                    let (body, offset, _) = attribute_body(source, value);
                                    expressions.push((body, offset));
                                }
                            }
                            _ => {
                                for part in split_interpolations(&source[node.start..node.end]) {
                                    if let TextPart::Interpolation { expr, offset } = part {
                                        expressions.push((expr, node.start + offset));
                                    }
                                }
                            }
                        }
                        Walk::Continue
                    },
                );

                for (text, offset) in expressions {
                    match Expression::parse(text, offset, dialect) {
                        Ok(expression) => {
                            let first_line = line_at(source, offset);
                            entries.extend(extract_tree(&expression.tree, options).into_iter().map(
                                |mut entry| {
                                    entry.line += first_line - 1;
                                    entry
                                },
                            ));
                        }
                        Err(e) => warn!("Skipping template expression at byte {}: {}", offset, e),
                    }
                }
            }
        }
    }
    Ok(entries)
}
