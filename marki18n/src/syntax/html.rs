//! HTML adapter over tree-sitter, used for Vue component templates

use tree_sitter::{Node, Parser as TSParser};

use crate::error::{Error, Result};
use crate::syntax::javascript::first_error;
use crate::syntax::{NodeKind, ParsedSource, SyntaxNode};

pub fn parse(source: &str) -> Result<ParsedSource<'_>> {
    let mut ts_parser = TSParser::new();
    ts_parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .map_err(|e| Error::parse("html", format!("cannot load grammar: {}", e)))?;

    let tree = ts_parser
        .parse(source, None)
        .ok_or_else(|| Error::parse("html", "parser returned no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or_else(|| root.start_position());
        return Err(Error::parse(
            "html",
            format!("syntax error at {}:{}", at.row + 1, at.column + 1),
        ));
    }

    let converter = Converter { source };
    Ok(ParsedSource::new(source, converter.convert(root)))
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

    fn convert(&self, node: Node<'_>) -> SyntaxNode {
        match node.kind() {
            "element" => self.convert_element(node),
            "attribute" => self.convert_attribute(node),
            "text" => self.leaf(NodeKind::ElementText, node),
            "comment" => {
                let body = self.text(node);
                let body = body.strip_prefix("<!--").unwrap_or(body);
                let body = body.strip_suffix("-->").unwrap_or(body);
                self.leaf(NodeKind::Comment, node).with_name(body.trim())
            }
            // raw text is handled per region
            "script_element" | "style_element" => self.leaf(NodeKind::Other, node),
            _ => {
                let mut cursor = node.walk();
                let children = node
                    .named_children(&mut cursor)
                    .map(|child| self.convert(child))
                    .collect();
                self.leaf(NodeKind::Other, node).with_children(children)
            }
        }
    }

    /// Element children are the start tag's attributes followed by the content
    fn convert_element(&self, node: Node<'_>) -> SyntaxNode {
        let mut name = None;
        let mut children = Vec::new();
        let mut cursor = node.walk();

        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "start_tag" | "self_closing_tag" => {
                    let mut tag_cursor = child.walk();
                    for part in child.named_children(&mut tag_cursor) {
                        match part.kind() {
                            "tag_name" => name = Some(self.text(part)),
                            "attribute" => children.push(self.convert_attribute(part)),
                            _ => {}
                        }
                    }
                }
                "end_tag" => {}
                _ => children.push(self.convert(child)),
            }
        }

        let element = self.leaf(NodeKind::Element, node).with_children(children);
        match name {
            Some(name) => element.with_name(name),
            None => element,
        }
    }

    fn convert_attribute(&self, node: Node<'_>) -> SyntaxNode {
        let mut name = "";
        let mut children = Vec::new();
        let mut cursor = node.walk();
        for part in node.named_children(&mut cursor) {
            match part.kind() {
                "attribute_name" => name = self.text(part),
                "attribute_value" | "quoted_attribute_value" => {
                    children.push(self.leaf(NodeKind::AttributeValue, part))
                }
                _ => {}
            }
        }
        self.leaf(NodeKind::Attribute, node)
            .with_name(name)
            .with_children(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{SyntaxTree, Walk};

    #[test]
    fn test_elements_attributes_text() {
        let source = r#"<div class="box" title='标题' :label="msg">你好</div>"#;
        let tree = parse(source).unwrap();
        let mut seen = Vec::new();
        tree.visit(
            |kind| kind != NodeKind::Other,
            |node, _| {
                seen.push((node.kind, node.name.clone(), tree.text_of(node).to_string()));
                Walk::Continue
            },
        );

        assert_eq!(seen[0].0, NodeKind::Element);
        assert_eq!(seen[0].1.as_deref(), Some("div"));
        assert!(seen.contains(&(
            NodeKind::AttributeValue,
            None,
            "'标题'".to_string()
        )));
        assert!(seen.contains(&(
            NodeKind::Attribute,
            Some(":label".to_string()),
            r#":label="msg""#.to_string()
        )));
        assert!(seen.contains(&(NodeKind::ElementText, None, "你好".to_string())));
    }

    #[test]
    fn test_comment_body() {
        let tree = parse("<!-- i18n-ignore --><p>是</p>").unwrap();
        let comment = tree.root().first_child_of(NodeKind::Comment).unwrap();
        assert!(comment.name_is("i18n-ignore"));
    }

    #[test]
    fn test_script_is_opaque() {
        let tree = parse("<script>const a = '<p>';</script>").unwrap();
        let mut elements = 0;
        tree.visit(
            |kind| kind == NodeKind::Element,
            |_, _| {
                elements += 1;
                Walk::Continue
            },
        );
        assert_eq!(elements, 0);
    }
}
