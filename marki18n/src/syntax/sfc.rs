//! Vue single-file component regions
//!
//! A component is parsed once as HTML. The top-level `<template>` element's
//! content is the template region, each top-level `<script>` element's raw
//! text is a script region. Template expressions (`{{ expr }}` and directive
//! attribute values) are parsed on demand as script snippets.

use tree_sitter::{Node, Parser as TSParser};

use crate::error::{Error, Result};
use crate::syntax::javascript::{self, Dialect};
use crate::syntax::{html, line_at, ParsedSource, SyntaxNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Template,
    Script { dialect: Dialect, setup: bool },
}

/// A byte range of the component handled by one engine pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfcRegion {
    pub kind: RegionKind,
    pub start: usize,
    pub end: usize,
    /// Lines before the region starts
    pub line_offset: usize,
}

impl SfcRegion {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }

    pub fn contains(&self, node: &SyntaxNode) -> bool {
        node.start >= self.start && node.end <= self.end
    }
}

/// A parsed component: its HTML tree and its regions in source order
#[derive(Debug)]
pub struct SfcDocument<'s> {
    pub tree: ParsedSource<'s>,
    pub regions: Vec<SfcRegion>,
}

impl SfcDocument<'_> {
    pub fn template(&self) -> Option<&SfcRegion> {
        self.regions
            .iter()
            .find(|region| region.kind == RegionKind::Template)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &SfcRegion> {
        self.regions
            .iter()
            .filter(|region| matches!(region.kind, RegionKind::Script { .. }))
    }

    /// Where an import binding goes: `<script setup>` first, else the first script
    pub fn binding_target(&self) -> Option<&SfcRegion> {
        self.scripts()
            .find(|region| matches!(region.kind, RegionKind::Script { setup: true, .. }))
            .or_else(|| self.scripts().next())
    }

    /// Dialect used for template expressions
    pub fn expression_dialect(&self) -> Dialect {
        self.scripts()
            .find_map(|region| match region.kind {
                RegionKind::Script { dialect, .. } if dialect != Dialect::JavaScript => {
                    Some(Dialect::TypeScript)
                }
                _ => None,
            })
            .unwrap_or(Dialect::JavaScript)
    }
}

pub fn parse(source: &str) -> Result<SfcDocument<'_>> {
    let tree = html::parse(source)?;
    let regions = find_regions(source)?;
    Ok(SfcDocument { tree, regions })
}

fn find_regions(source: &str) -> Result<Vec<SfcRegion>> {
    let mut ts_parser = TSParser::new();
    ts_parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .map_err(|e| Error::parse("vue", format!("cannot load grammar: {}", e)))?;
    let tree = ts_parser
        .parse(source, None)
        .ok_or_else(|| Error::parse("vue", "parser returned no tree"))?;

    let region = |kind, start, end| SfcRegion {
        kind,
        start,
        end,
        line_offset: line_at(source, start) - 1,
    };

    let mut regions = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for block in root.named_children(&mut cursor) {
        match block.kind() {
            "element" if tag_name(block, source) == Some("template") => {
                let start_tag = child_of_kind(block, "start_tag");
                let end_tag = child_of_kind(block, "end_tag");
                if let (Some(open), Some(close)) = (start_tag, end_tag) {
                    regions.push(region(
                        RegionKind::Template,
                        open.end_byte(),
                        close.start_byte(),
                    ));
                }
            }
            "script_element" => {
                let Some(open) = child_of_kind(block, "start_tag") else {
                    continue;
                };
                let lang = attribute_value(open, "lang", source);
                let setup = has_attribute(open, "setup", source);
                let kind = RegionKind::Script {
                    dialect: Dialect::from_lang(lang),
                    setup,
                };
                match child_of_kind(block, "raw_text") {
                    Some(raw) => regions.push(region(kind, raw.start_byte(), raw.end_byte())),
                    // empty block
                    None => regions.push(region(kind, open.end_byte(), open.end_byte())),
                }
            }
            _ => {}
        }
    }
    Ok(regions)
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|child| child.kind() == kind)
}

fn tag_name<'s>(element: Node<'_>, source: &'s str) -> Option<&'s str> {
    let tag = child_of_kind(element, "start_tag")?;
    child_of_kind(tag, "tag_name").map(|name| &source[name.byte_range()])
}

fn attributes<'t>(tag: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = tag.walk();
    tag.named_children(&mut cursor)
        .filter(|child| child.kind() == "attribute")
        .collect()
}

fn has_attribute(tag: Node<'_>, name: &str, source: &str) -> bool {
    attributes(tag).into_iter().any(|attribute| {
        child_of_kind(attribute, "attribute_name").map(|n| &source[n.byte_range()]) == Some(name)
    })
}

fn attribute_value<'s>(tag: Node<'_>, name: &str, source: &'s str) -> Option<&'s str> {
    attributes(tag).into_iter().find_map(|attribute| {
        let attribute_name = child_of_kind(attribute, "attribute_name")?;
        if &source[attribute_name.byte_range()] != name {
            return None;
        }
        let value = child_of_kind(attribute, "quoted_attribute_value")
            .and_then(|quoted| child_of_kind(quoted, "attribute_value"))
            .or_else(|| child_of_kind(attribute, "attribute_value"))?;
        Some(&source[value.byte_range()])
    })
}

/// A template expression parsed as a script snippet
#[derive(Debug)]
pub struct Expression {
    pub tree: ParsedSource<'static>,
    /// File offset of the expression's first byte
    pub offset: usize,
    /// Bytes prepended to the expression before parsing
    lead: usize,
}

impl Expression {
    /// Parse `text`, which starts at `offset` in the file.
    ///
    /// The text is tried as a parenthesized expression first so that object
    /// literals parse as objects, then as a statement list (`@click="a(); b()"`).
    pub fn parse(text: &str, offset: usize, dialect: Dialect) -> Result<Self> {
        let wrapped = format!("({})", text);
        if let Ok(root) = javascript::build_tree(&wrapped, dialect) {
            return Ok(Self {
                tree: ParsedSource::new(wrapped, root),
                offset,
                lead: 1,
            });
        }
        let root = javascript::build_tree(text, dialect)?;
        Ok(Self {
            tree: ParsedSource::new(text.to_string(), root),
            offset,
            lead: 0,
        })
    }

    /// File offset of a snippet offset
    pub fn to_file_offset(&self, snippet_offset: usize) -> usize {
        (self.offset + snippet_offset).saturating_sub(self.lead)
    }
}

/// Literal and interpolation parts of template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPart<'s> {
    Literal(&'s str),
    /// Expression between `{{` and `}}`, with its offset relative to the text
    Interpolation { expr: &'s str, offset: usize },
}

/// Split template text at `{{ }}` interpolations. An unterminated `{{` is literal.
pub fn split_interpolations(text: &str) -> Vec<TextPart<'_>> {
    let mut parts = Vec::new();
    let mut rest_start = 0;

    while let Some(open) = text[rest_start..].find("{{") {
        let open = rest_start + open;
        let Some(close) = text[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close;
        if open > rest_start {
            parts.push(TextPart::Literal(&text[rest_start..open]));
        }
        parts.push(TextPart::Interpolation {
            expr: &text[open + 2..close],
            offset: open + 2,
        });
        rest_start = close + 2;
    }
    if rest_start < text.len() {
        parts.push(TextPart::Literal(&text[rest_start..]));
    }
    parts
}
