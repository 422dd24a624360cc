//! Marking for Vue single-file components
//!
//! Each region is marked on its own and the spans are spliced back into the
//! component at the outer level:
//!
//! ```text
//! <p title="标题">你好，{{ name }}</p>
//!   → <p :title="t`标题`">{{ t`你好，${name}` }}</p>
//! ```

use tracing::{debug, warn};

use crate::error::Result;
use crate::mark::{collect_spans, escape_plain, has_binding, is_ignored, trimmed_range, MarkOptions};
use crate::span::{apply_spans, ReplacementSpan};
use crate::syntax::javascript::{self, Dialect};
use crate::syntax::sfc::{
    self, split_interpolations, Expression, RegionKind, SfcDocument, SfcRegion, TextPart,
};
use crate::syntax::{NodeKind, SyntaxNode, SyntaxTree, Walk};

pub(super) fn mark_component(source: &str, options: &MarkOptions) -> Result<Option<String>> {
    let doc = sfc::parse(source)?;
    let target = doc.binding_target().copied();
    let mut target_has_binding = false;
    let mut spans = Vec::new();

    for region in &doc.regions {
        match region.kind {
            RegionKind::Template => spans.extend(template_spans(source, &doc, region, options)),
            RegionKind::Script { dialect, .. } => {
                let tree = javascript::parse(region.text(source), dialect)?;
                spans.extend(collect_spans(&tree, options).into_iter().map(|span| {
                    ReplacementSpan::new(
                        span.start + region.start,
                        span.end + region.start,
                        span.content,
                    )
                }));
                if Some(*region) == target {
                    target_has_binding = has_binding(&tree, options.binding_name());
                }
            }
        }
    }

    if spans.is_empty() {
        return Ok(None);
    }
    debug!("Marking {} fragment(s) in component", spans.len());

    if let Some(binding) = &options.import_binding {
        match target {
            Some(_) if target_has_binding => {}
            Some(script) => {
                let content = if script.text(source).starts_with('\n') {
                    format!("\n{}", binding)
                } else {
                    format!("\n{}\n", binding)
                };
                spans.push(ReplacementSpan::insert(script.start, content));
            }
            None => debug!("Component has no <script> block, import binding not inserted"),
        }
    }

    Ok(Some(apply_spans(source, spans)?))
}

fn template_spans(
    source: &str,
    doc: &SfcDocument<'_>,
    region: &SfcRegion,
    options: &MarkOptions,
) -> Vec<ReplacementSpan> {
    let dialect = doc.expression_dialect();
    let mut spans = Vec::new();

    doc.tree.visit(
        |_| true,
        |node, ancestors| {
            if !region.contains(node) {
                return Walk::Continue;
            }
            if is_ignored(source, node, ancestors, &options.ignore_annotation) {
                return Walk::SkipChildren;
            }
            match node.kind {
                NodeKind::Attribute => {
                    spans.extend(attribute_spans(source, node, dialect, options));
                    Walk::SkipChildren
                }
                NodeKind::ElementText => {
                    spans.extend(text_spans(source, node, dialect, options));
                    Walk::Continue
                }
                _ => Walk::Continue,
            }
        },
    );
    spans
}

/// `:x`, `v-bind:x`, `@x`, `v-on:x`, `v-if`, `#slot` and friends
pub(crate) fn is_directive(name: &str) -> bool {
    name.starts_with(':') || name.starts_with('@') || name.starts_with('#') || name.starts_with("v-")
}

/// Attribute a directive binds: `:title` → `title`, `v-bind:title` → `title`
fn bound_name(name: &str) -> &str {
    ["v-bind:", "v-on:", ":", "@", "#"]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// Value body, its file offset and the quote character to reuse
pub(crate) fn attribute_body<'s>(source: &'s str, value: &SyntaxNode) -> (&'s str, usize, char) {
    let raw = &source[value.start..value.end];
    match raw.chars().next() {
        Some(quote @ ('"' | '\'')) if raw.len() >= 2 && raw.ends_with(quote) => {
            (&raw[1..raw.len() - 1], value.start + 1, quote)
        }
        _ => (raw, value.start, '"'),
    }
}

fn attribute_spans(
    source: &str,
    attribute: &SyntaxNode,
    dialect: Dialect,
    options: &MarkOptions,
) -> Vec<ReplacementSpan> {
    let name = attribute.name.as_deref().unwrap_or_default();
    if options.is_ignored_attribute(bound_name(name)) {
        return Vec::new();
    }
    let Some(value) = attribute.first_child_of(NodeKind::AttributeValue) else {
        return Vec::new();
    };
    let (body, offset, quote) = attribute_body(source, value);

    if is_directive(name) {
        return mark_expression(body, offset, dialect, options);
    }
    if !options.detector.matches(body) {
        return Vec::new();
    }
    vec![ReplacementSpan::new(
        attribute.start,
        attribute.end,
        format!(
            ":{}={q}{}`{}`{q}",
            name,
            options.tag_name,
            escape_plain(body),
            q = quote
        ),
    )]
}

fn text_spans(
    source: &str,
    node: &SyntaxNode,
    dialect: Dialect,
    options: &MarkOptions,
) -> Vec<ReplacementSpan> {
    let (start, end) = trimmed_range(source, node.start, node.end);
    let text = &source[start..end];
    let parts = split_interpolations(text);

    let literal_has_target = parts
        .iter()
        .any(|part| matches!(part, TextPart::Literal(literal) if options.detector.matches(literal)));

    if literal_has_target {
        let mut body = String::new();
        for part in &parts {
            match part {
                TextPart::Literal(literal) => body.push_str(&escape_plain(literal)),
                TextPart::Interpolation { expr, .. } => {
                    body.push_str("${");
                    body.push_str(expr.trim());
                    body.push('}');
                }
            }
        }
        return vec![ReplacementSpan::new(
            start,
            end,
            format!("{{{{ {}`{}` }}}}", options.tag_name, body),
        )];
    }

    parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Interpolation { expr, offset } => Some((*expr, start + offset)),
            TextPart::Literal(_) => None,
        })
        .flat_map(|(expr, offset)| mark_expression(expr, offset, dialect, options))
        .collect()
}

/// Mark a template expression as a nested script region
fn mark_expression(
    text: &str,
    offset: usize,
    dialect: Dialect,
    options: &MarkOptions,
) -> Vec<ReplacementSpan> {
    match Expression::parse(text, offset, dialect) {
        Ok(expression) => collect_spans(&expression.tree, options)
            .into_iter()
            .map(|span| {
                ReplacementSpan::new(
                    expression.to_file_offset(span.start),
                    expression.to_file_offset(span.end),
                    span.content,
                )
            })
            .collect(),
        Err(e) => {
            warn!("Skipping template expression at byte {}: {}", offset, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mark::{mark, MarkOptions};
    use crate::syntax::SourceKind;

    const COMPONENT: &str = r#"<template>
  <div title="标题" :label="ok ? '是' : '否'" class="红">你好，{{ name }}</div>
  <!-- i18n-ignore -->
  <p>忽略</p>
  <span>{{ flag ? '开' : 'off' }}</span>
</template>

<script setup>
const msg = '消息'
</script>
"#;

    const MARKED: &str = r#"<template>
  <div :title="t`标题`" :label="ok ? t`是` : t`否`" class="红">{{ t`你好，${name}` }}</div>
  <!-- i18n-ignore -->
  <p>忽略</p>
  <span>{{ flag ? t`开` : 'off' }}</span>
</template>

<script setup>
import { t } from 'i18n';
const msg = t`消息`
</script>
"#;

    fn options() -> MarkOptions {
        MarkOptions {
            import_binding: Some("import { t } from 'i18n';".to_string()),
            ..MarkOptions::default()
        }
    }

    #[test]
    fn test_component_regions_are_marked() {
        let marked = mark(COMPONENT, SourceKind::Vue, &options()).unwrap();
        assert_eq!(marked.as_deref(), Some(MARKED));
    }

    #[test]
    fn test_component_idempotence() {
        assert_eq!(mark(MARKED, SourceKind::Vue, &options()).unwrap(), None);
    }

    #[test]
    fn test_single_quoted_attribute_keeps_quote() {
        let source = "<template><input placeholder='请输入'></template>";
        let marked = mark(source, SourceKind::Vue, &MarkOptions::default()).unwrap();
        assert_eq!(
            marked.as_deref(),
            Some("<template><input :placeholder='t`请输入`'></template>")
        );
    }

    #[test]
    fn test_component_without_script_gets_no_binding() {
        let source = "<template><p>你好</p></template>\n";
        let marked = mark(source, SourceKind::Vue, &options()).unwrap();
        assert_eq!(
            marked.as_deref(),
            Some("<template><p>{{ t`你好` }}</p></template>\n")
        );
    }

    #[test]
    fn test_existing_binding_in_setup() {
        let source = "<template><p>你好</p></template>\n<script setup>\nimport { t } from 'i18n';\n</script>\n";
        let marked = mark(source, SourceKind::Vue, &options()).unwrap().unwrap();
        assert_eq!(marked.matches("import { t }").count(), 1);
    }

    #[test]
    fn test_binding_goes_to_first_script_without_setup() {
        let source = "<script>\nexport default { data: () => ({ a: '甲' }) }\n</script>\n";
        let marked = mark(source, SourceKind::Vue, &options()).unwrap();
        assert_eq!(
            marked.as_deref(),
            Some("<script>\nimport { t } from 'i18n';\nexport default { data: () => ({ a: t`甲` }) }\n</script>\n")
        );
    }
}
