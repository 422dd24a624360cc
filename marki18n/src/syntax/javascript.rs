//! JavaScript, TypeScript and JSX adapter over tree-sitter
//!
//! The adapter keeps the shape of the concrete tree (every named node becomes a
//! [`SyntaxNode`]) so that sibling relations, which exclusion comments rely on,
//! survive. Only the handful of constructs marking and extraction care about
//! get a specific [`NodeKind`].

use tree_sitter::{Node, Parser as TSParser, Point};

use crate::error::{Error, Result};
use crate::syntax::{NodeKind, ParsedSource, SyntaxNode};

/// Fields whose string child is a name rather than a value
const OPAQUE_FIELDS: &[&str] = &["key", "name", "source", "property"];

/// Parents whose string children are types or module names
const OPAQUE_PARENTS: &[&str] = &["literal_type", "enum_body", "import_require_clause"];

/// Named references decoded inside JSX text
const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("trade", '\u{2122}'),
    ("middot", '\u{b7}'),
    ("times", '\u{d7}'),
    ("hellip", '\u{2026}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
    ("yen", '\u{a5}'),
    ("euro", '\u{20ac}'),
];

/// Decode one `&name;`, `&#NN;` or `&#xHH;` reference
pub(crate) fn decode_character_reference(raw: &str) -> Option<char> {
    let body = raw.strip_prefix('&')?.strip_suffix(';')?;
    match body.strip_prefix('#') {
        Some(number) => {
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
        None => NAMED_REFERENCES
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, c)| *c),
    }
}

/// Callees whose string arguments are module paths
const MODULE_LOADERS: &[&str] = &["require", "import"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// JavaScript with JSX
    JavaScript,
    TypeScript,
    Tsx,
}

impl Dialect {
    /// Dialect named by a `lang` attribute of a `<script>` block
    pub fn from_lang(lang: Option<&str>) -> Self {
        match lang.map(str::trim) {
            Some("ts") | Some("typescript") => Self::TypeScript,
            Some("tsx") => Self::Tsx,
            _ => Self::JavaScript,
        }
    }

    fn language(&self) -> tree_sitter::Language {
        match self {
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }
}

/// Parse `source` into a neutral tree.
///
/// # Errors
///
/// [`Error::Parse`] when the grammar cannot be loaded or the source has
/// syntax errors. The reason names the first error position.
pub fn parse(source: &str, dialect: Dialect) -> Result<ParsedSource<'_>> {
    let root = build_tree(source, dialect)?;
    Ok(ParsedSource::new(source, root))
}

/// Parse `source` and return only the root of its neutral tree
pub(crate) fn build_tree(source: &str, dialect: Dialect) -> Result<SyntaxNode> {
    let mut ts_parser = TSParser::new();
    ts_parser
        .set_language(&dialect.language())
        .map_err(|e| Error::parse(dialect.label(), format!("cannot load grammar: {}", e)))?;

    let tree = ts_parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(dialect.label(), "parser returned no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or_else(|| root.start_position());
        return Err(Error::parse(
            dialect.label(),
            format!("syntax error at {}:{}", at.row + 1, at.column + 1),
        ));
    }

    let converter = Converter { source };
    Ok(converter.convert(root, None, ""))
}

pub(crate) fn first_error(node: Node<'_>) -> Option<Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.has_error())
        .find_map(first_error)
}

struct Converter<'s> {
    source: &'s str,
}

impl<'s> Converter<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn leaf(&self, kind: NodeKind, node: Node<'_>) -> SyntaxNode {
        SyntaxNode::new(
            kind,
            node.start_byte(),
            node.end_byte(),
            node.start_position().row + 1,
        )
    }

    /// `field` is the field name under which `node` hangs off its parent
    fn convert(&self, node: Node<'_>, field: Option<&str>, parent_kind: &str) -> SyntaxNode {
        match node.kind() {
            "string" => {
                let opaque = field.is_some_and(|f| OPAQUE_FIELDS.contains(&f))
                    || OPAQUE_PARENTS.contains(&parent_kind);
                if opaque {
                    self.leaf(NodeKind::Other, node)
                } else {
                    self.leaf(NodeKind::StringLiteral, node)
                }
            }
            "template_string" => self.convert_template(node),
            "template_substitution" => self
                .leaf(NodeKind::TemplateSlot, node)
                .with_children(self.convert_children(node)),
            "call_expression" => self.convert_call(node),
            "jsx_element" | "jsx_self_closing_element" => self.convert_element(node),
            "jsx_text" => self.leaf(NodeKind::ElementText, node),
            "jsx_attribute" => self.convert_attribute(node),
            "jsx_expression" => self.convert_expression_container(node),
            "comment" => self
                .leaf(NodeKind::Comment, node)
                .with_name(comment_body(self.text(node))),
            "import_statement" => {
                let mut bindings = Vec::new();
                self.collect_import_bindings(node, &mut bindings);
                self.leaf(NodeKind::Other, node).with_children(bindings)
            }
            "variable_declarator" => self.convert_declarator(node),
            "function_declaration" | "generator_function_declaration" => {
                let mut children = Vec::new();
                if let Some(name) = node.child_by_field_name("name") {
                    children.push(self.binding(name));
                }
                children.extend(self.convert_children_except(node, Some("name")));
                self.leaf(NodeKind::Other, node).with_children(children)
            }
            _ => self
                .leaf(NodeKind::Other, node)
                .with_children(self.convert_children(node)),
        }
    }

    fn convert_children(&self, node: Node<'_>) -> Vec<SyntaxNode> {
        self.convert_children_except(node, None)
    }

    fn convert_children_except(&self, node: Node<'_>, skip_field: Option<&str>) -> Vec<SyntaxNode> {
        let mut children = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if child.is_named() && (skip_field.is_none() || cursor.field_name() != skip_field) {
                    children.push(self.convert(child, cursor.field_name(), node.kind()));
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        children
    }

    /// Template literal; only its substitutions become children
    fn convert_template(&self, node: Node<'_>) -> SyntaxNode {
        let mut cursor = node.walk();
        let slots = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "template_substitution")
            .map(|child| self.convert(child, None, node.kind()))
            .collect();
        self.leaf(NodeKind::Template, node).with_children(slots)
    }

    fn convert_call(&self, node: Node<'_>) -> SyntaxNode {
        let function = node.child_by_field_name("function");
        let arguments = node.child_by_field_name("arguments");
        let callee = function.map(|f| self.text(f)).unwrap_or_default();

        let mut children = Vec::new();
        if let Some(function) = function {
            children.push(self.convert(function, Some("function"), node.kind()));
        }

        match arguments {
            Some(template) if template.kind() == "template_string" => {
                children.push(self.convert_template(template));
                self.leaf(NodeKind::TaggedTemplate, node)
                    .with_name(callee)
                    .with_children(children)
            }
            Some(arguments) => {
                let is_module_load = MODULE_LOADERS.contains(&callee);
                children.extend(self.convert_children(arguments).into_iter().map(|mut arg| {
                    if is_module_load
                        && matches!(arg.kind, NodeKind::StringLiteral | NodeKind::Template)
                    {
                        arg.kind = NodeKind::Other;
                    }
                    arg
                }));
                self.leaf(NodeKind::Call, node)
                    .with_name(callee)
                    .with_children(children)
            }
            None => self
                .leaf(NodeKind::Call, node)
                .with_name(callee)
                .with_children(children),
        }
    }

    /// Element children are the opening tag's attributes followed by the body.
    ///
    /// Adjacent text and decodable character references form one
    /// [`NodeKind::ElementText`], so `你好 &amp; 世界` stays a single fragment.
    fn convert_element(&self, node: Node<'_>) -> SyntaxNode {
        let mut children = Vec::new();
        let mut name = None;
        let mut text_run: Option<SyntaxNode> = None;
        let mut cursor = node.walk();

        for child in node.named_children(&mut cursor) {
            if self.is_text_part(child) {
                match &mut text_run {
                    Some(run) => run.end = child.end_byte(),
                    None => text_run = Some(self.leaf(NodeKind::ElementText, child)),
                }
                continue;
            }
            children.extend(text_run.take());

            match child.kind() {
                "jsx_opening_element" => {
                    name = child.child_by_field_name("name").map(|n| self.text(n));
                    children.extend(self.convert_children(child).into_iter().filter(|c| {
                        matches!(c.kind, NodeKind::Attribute | NodeKind::ExpressionContainer)
                    }));
                }
                "jsx_closing_element" => {}
                "jsx_attribute" => children.push(self.convert_attribute(child)),
                _ if Some(child) == node.child_by_field_name("name") => {
                    name = Some(self.text(child));
                }
                _ => children.push(self.convert(child, None, node.kind())),
            }
        }
        children.extend(text_run.take());

        let element = self.leaf(NodeKind::Element, node).with_children(children);
        match name {
            Some(name) => element.with_name(name),
            None => element,
        }
    }

    fn is_text_part(&self, node: Node<'_>) -> bool {
        match node.kind() {
            "jsx_text" => true,
            "html_character_reference" => decode_character_reference(self.text(node)).is_some(),
            _ => false,
        }
    }

    fn convert_attribute(&self, node: Node<'_>) -> SyntaxNode {
        let mut cursor = node.walk();
        let mut named = node.named_children(&mut cursor);
        let name = named.next().map(|n| self.text(n)).unwrap_or_default();
        let children = named
            .map(|value| match value.kind() {
                "string" => self.leaf(NodeKind::AttributeValue, value),
                _ => self.convert(value, None, node.kind()),
            })
            .collect();
        self.leaf(NodeKind::Attribute, node)
            .with_name(name)
            .with_children(children)
    }

    /// `{/* comment */}` counts as a comment so it can annotate its next sibling
    fn convert_expression_container(&self, node: Node<'_>) -> SyntaxNode {
        let mut cursor = node.walk();
        let named: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        if !named.is_empty() && named.iter().all(|child| child.kind() == "comment") {
            return self
                .leaf(NodeKind::Comment, node)
                .with_name(comment_body(self.text(named[0])));
        }
        self.leaf(NodeKind::ExpressionContainer, node)
            .with_children(self.convert_children(node))
    }

    fn convert_declarator(&self, node: Node<'_>) -> SyntaxNode {
        let mut children = Vec::new();
        if let Some(pattern) = node.child_by_field_name("name") {
            self.collect_pattern_bindings(pattern, &mut children);
        }
        if let Some(value) = node.child_by_field_name("value") {
            children.push(self.convert(value, Some("value"), node.kind()));
        }
        self.leaf(NodeKind::Other, node).with_children(children)
    }

    fn binding(&self, identifier: Node<'_>) -> SyntaxNode {
        self.leaf(NodeKind::Binding, identifier)
            .with_name(self.text(identifier))
    }

    fn collect_pattern_bindings(&self, node: Node<'_>, out: &mut Vec<SyntaxNode>) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => out.push(self.binding(node)),
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.collect_pattern_bindings(left, out);
                }
            }
            "pair_pattern" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.collect_pattern_bindings(value, out);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_pattern_bindings(child, out);
                }
            }
        }
    }

    fn collect_import_bindings(&self, node: Node<'_>, out: &mut Vec<SyntaxNode>) {
        match node.kind() {
            "import_specifier" => {
                if let Some(local) = node
                    .child_by_field_name("alias")
                    .or_else(|| node.child_by_field_name("name"))
                {
                    out.push(self.binding(local));
                }
            }
            "identifier" => out.push(self.binding(node)),
            "string" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_import_bindings(child, out);
                }
            }
        }
    }
}

/// Body of a line or block comment, trimmed
pub(crate) fn comment_body(comment: &str) -> String {
    let body = if let Some(line) = comment.strip_prefix("//") {
        line
    } else if let Some(block) = comment.strip_prefix("/*") {
        block.strip_suffix("*/").unwrap_or(block)
    } else {
        comment
    };
    body.trim().trim_start_matches('*').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{SyntaxTree, Walk};

    fn collect(source: &str, dialect: Dialect, kind: NodeKind) -> Vec<(String, Option<String>)> {
        let tree = parse(source, dialect).unwrap();
        let mut found = Vec::new();
        tree.visit(
            |k| k == kind,
            |node, _| {
                found.push((tree.text_of(node).to_string(), node.name.clone()));
                Walk::Continue
            },
        );
        found
    }

    #[test]
    fn test_string_literals_in_expression_position() {
        let source = r#"const a = '你好'; foo("世界");"#;
        let strings = collect(source, Dialect::JavaScript, NodeKind::StringLiteral);
        let texts: Vec<&str> = strings.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["'你好'", "\"世界\""]);
    }

    #[test]
    fn test_strings_in_name_positions_are_opaque() {
        let source = r#"import x from '模块';
const o = { '键': 1, v: '值' };
class A { '方法'() {} }
"#;
        let strings = collect(source, Dialect::JavaScript, NodeKind::StringLiteral);
        let texts: Vec<&str> = strings.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["'值'"]);
    }

    #[test]
    fn test_module_paths_in_require_and_dynamic_import_are_opaque() {
        let source = "const a = require('./中文.js');\nconst b = import(`./页面/${name}.js`);\nfoo('值');\n";
        let strings = collect(source, Dialect::JavaScript, NodeKind::StringLiteral);
        let texts: Vec<&str> = strings.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["'值'"]);
        assert!(collect(source, Dialect::JavaScript, NodeKind::Template).is_empty());
    }

    #[test]
    fn test_typescript_literal_types_are_opaque() {
        let source = "type Mode = '开' | '关';\nconst m: Mode = '开';\n";
        let strings = collect(source, Dialect::TypeScript, NodeKind::StringLiteral);
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].0, "'开'");
    }

    #[test]
    fn test_tagged_template_and_slots() {
        let source = "const s = t`你好，${name}`;";
        let tagged = collect(source, Dialect::JavaScript, NodeKind::TaggedTemplate);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].1.as_deref(), Some("t"));

        let slots = collect(source, Dialect::JavaScript, NodeKind::TemplateSlot);
        assert_eq!(slots[0].0, "${name}");
    }

    #[test]
    fn test_call_name_and_arguments() {
        let tree = parse("i18n.t('你好', 1);", Dialect::JavaScript).unwrap();
        let mut checked = false;
        tree.visit(
            |k| k == NodeKind::Call,
            |node, _| {
                assert!(node.name_is("i18n.t"));
                assert!(node.first_child_of(NodeKind::StringLiteral).is_some());
                checked = true;
                Walk::Continue
            },
        );
        assert!(checked);
    }

    #[test]
    fn test_jsx_nodes() {
        let source = r#"const el = <div title="标题" className="box">你好 {/* i18n-ignore */}</div>;"#;
        let elements = collect(source, Dialect::JavaScript, NodeKind::Element);
        assert_eq!(elements[0].1.as_deref(), Some("div"));

        let attributes = collect(source, Dialect::JavaScript, NodeKind::Attribute);
        let names: Vec<_> = attributes.iter().filter_map(|(_, n)| n.clone()).collect();
        assert_eq!(names, vec!["title", "className"]);

        let values = collect(source, Dialect::JavaScript, NodeKind::AttributeValue);
        assert_eq!(values[0].0, "\"标题\"");

        let comments = collect(source, Dialect::JavaScript, NodeKind::Comment);
        assert_eq!(comments[0].1.as_deref(), Some("i18n-ignore"));

        let texts = collect(source, Dialect::JavaScript, NodeKind::ElementText);
        assert!(texts.iter().any(|(t, _)| t.contains("你好")));
    }

    #[test]
    fn test_jsx_text_runs_merge_across_character_references() {
        let source = "const el = <p>你好 &amp; 世界<b>粗</b>再见</p>;";
        let texts = collect(source, Dialect::JavaScript, NodeKind::ElementText);
        let texts: Vec<&str> = texts.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["你好 &amp; 世界", "粗", "再见"]);
    }

    #[test]
    fn test_decode_character_reference() {
        assert_eq!(decode_character_reference("&amp;"), Some('&'));
        assert_eq!(decode_character_reference("&#20320;"), Some('你'));
        assert_eq!(decode_character_reference("&#x597D;"), Some('好'));
        assert_eq!(decode_character_reference("&unknown;"), None);
        assert_eq!(decode_character_reference("&amp"), None);
    }

    #[test]
    fn test_bindings() {
        let source = r#"import a, { b as c, d } from 'm';
import * as ns from 'n';
const { e, f: g, h = 1 } = obj;
const [i] = arr;
function j() {}
"#;
        let bindings = collect(source, Dialect::JavaScript, NodeKind::Binding);
        let names: Vec<String> = bindings.into_iter().filter_map(|(_, n)| n).collect();
        assert_eq!(names, vec!["a", "c", "d", "ns", "e", "g", "h", "i", "j"]);
    }

    #[test]
    fn test_line_numbers() {
        let tree = parse("\n\nconst a = '你好';", Dialect::JavaScript).unwrap();
        let mut line = 0;
        tree.visit(
            |k| k == NodeKind::StringLiteral,
            |node, _| {
                line = tree.location_of(node).line;
                Walk::Continue
            },
        );
        assert_eq!(line, 3);
    }

    #[test]
    fn test_syntax_error() {
        let err = parse("const = ;", Dialect::JavaScript).unwrap_err();
        assert!(err.is_parse_local());
    }

    #[test]
    fn test_tsx_dialect() {
        let source = "const a = <span>{count as number}</span>;";
        assert!(parse(source, Dialect::Tsx).is_ok());
    }

    #[test]
    fn test_comment_body() {
        assert_eq!(comment_body("// i18n-ignore"), "i18n-ignore");
        assert_eq!(comment_body("/* i18n-ignore */"), "i18n-ignore");
        assert_eq!(comment_body("/** i18n-ignore */"), "i18n-ignore");
    }
}
