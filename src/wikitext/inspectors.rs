//! Helpers for improved debug formatting of node trees.
//!
//! The derived [`Debug`](fmt::Debug) output of the node types is faithful
//! but noisy. These formatters print the same tree with text shown as
//! string literals, optional parts omitted when absent, and top-level nodes
//! annotated with their position in the source text, which makes them
//! suitable for golden files.

use super::{
    codemap::{FileMap, Span},
    nodes::{Attribute, Node, Parameter, Tag, Wikicode},
    tokens::TextStyle,
};
use core::fmt::{self, Write as _};

/// Returns a debug inspector for a tree parsed from the given source code.
pub fn inspect<'a>(input: &'a FileMap<'a>, tree: &'a Wikicode) -> RootInspector<'a> {
    RootInspector(input, tree)
}

/// A debug formatter for the root of a tree, which annotates each top-level
/// node with its source position.
pub struct RootInspector<'a>(&'a FileMap<'a>, &'a Wikicode);

impl fmt::Debug for RootInspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut start = 0;
        for node in &self.1.nodes {
            let end = start + node.to_string().len();
            list.entry(&NodeInspector(
                Some((self.0, Span::new(start, end.min(self.0.len())))),
                node,
            ));
            start = end;
        }
        list.finish()
    }
}

/// A debug formatter for a nested [`Wikicode`].
struct CodeInspector<'a>(&'a Wikicode);

impl fmt::Debug for CodeInspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.nodes.iter().map(|node| NodeInspector(None, node)))
            .finish()
    }
}

/// A debug formatter for [`Parameter`].
struct ParameterInspector<'a>(&'a Parameter);

impl fmt::Debug for ParameterInspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.0.showkey {
            self.0.name.to_string()
        } else {
            format!("#{}", self.0.name)
        };
        f.debug_map()
            .entry(&key, &CodeInspector(&self.0.value))
            .finish()
    }
}

/// A debug formatter for [`Attribute`].
struct AttributeInspector<'a>(&'a Attribute);

impl fmt::Debug for AttributeInspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entry(
                &CodeInspector(&self.0.name),
                &self.0.value.as_ref().map(CodeInspector),
            )
            .finish()
    }
}

/// A debug formatter for [`Node`].
struct NodeInspector<'a>(Option<(&'a FileMap<'a>, Span)>, &'a Node);

impl NodeInspector<'_> {
    fn name(&self, name: &str) -> String {
        match self.0 {
            Some((input, span)) => span_name(name, input, span),
            None => name.to_string(),
        }
    }
}

impl fmt::Debug for NodeInspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Node::Text(text) => fmt::Debug::fmt(text, f),
            Node::Template(template) => f
                .debug_struct(&self.name("Template"))
                .field("name", &CodeInspector(&template.name))
                .field(
                    "params",
                    &template
                        .params
                        .iter()
                        .map(ParameterInspector)
                        .collect::<Vec<_>>(),
                )
                .finish(),
            Node::Argument(argument) => {
                let mut d = f.debug_struct(&self.name("Argument"));
                d.field("name", &CodeInspector(&argument.name));
                if let Some(default) = &argument.default {
                    d.field("default", &CodeInspector(default));
                }
                d.finish()
            }
            Node::Wikilink(link) => {
                let mut d = f.debug_struct(&self.name("Wikilink"));
                d.field("title", &CodeInspector(&link.title));
                if let Some(text) = &link.text {
                    d.field("text", &CodeInspector(text));
                }
                d.finish()
            }
            Node::ExternalLink(link) => {
                let mut d = f.debug_struct(&self.name("ExternalLink"));
                d.field("url", &CodeInspector(&link.url));
                if let Some(title) = &link.title {
                    d.field("title", &CodeInspector(title));
                }
                d.field("brackets", &link.brackets).finish()
            }
            Node::Heading(heading) => f
                .debug_struct(&self.name("Heading"))
                .field("level", &u8::from(heading.level))
                .field("title", &CodeInspector(&heading.title))
                .finish(),
            Node::Tag(tag) => self.fmt_tag(f, tag),
            Node::Comment(comment) => f
                .debug_tuple(&self.name("Comment"))
                .field(&comment.contents)
                .finish(),
            Node::HtmlEntity(entity) => f
                .debug_tuple(&self.name("HtmlEntity"))
                .field(&entity.to_string())
                .finish(),
            Node::Style(style) => f
                .debug_tuple(&self.name(match style.style {
                    TextStyle::Bold => "Bold",
                    TextStyle::Italic => "Italic",
                }))
                .field(&CodeInspector(&style.contents))
                .finish(),
        }
    }
}

impl NodeInspector<'_> {
    fn fmt_tag(&self, f: &mut fmt::Formatter<'_>, tag: &Tag) -> fmt::Result {
        let mut d = f.debug_struct(&self.name("Tag"));
        d.field("tag", &CodeInspector(&tag.tag));
        if let Some(markup) = &tag.wiki_markup {
            d.field("wiki_markup", markup);
        }
        if !tag.attributes.is_empty() {
            d.field(
                "attributes",
                &tag.attributes
                    .iter()
                    .map(AttributeInspector)
                    .collect::<Vec<_>>(),
            );
        }
        if let Some(contents) = &tag.contents {
            d.field("contents", &CodeInspector(contents));
        }
        if tag.self_closing {
            d.field("self_closing", &true);
        }
        if tag.invalid {
            d.field("invalid", &true);
        }
        d.finish()
    }
}

/// Decorates an item name with the line and column information of the object in
/// the source code.
fn span_name(name: &str, input: &FileMap<'_>, span: Span) -> String {
    let start = input.find_line_col(span.start);
    let end = input.find_line_col(span.end);
    let mut out = format!("{name} @ {start}..");
    // Writing to a `String` cannot fail.
    let _ = if start.line == end.line {
        write!(out, "{}", end.column)
    } else {
        write!(out, "{}:{}", end.line, end.column)
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::parse;

    #[test]
    fn spans() {
        let source = "a\n{{b|c}}";
        let tree = parse(source).unwrap();
        let input = FileMap::new(source);
        assert_eq!(
            format!("{:?}", inspect(&input, &tree)),
            r##"["a\n", Template @ 2:1..8 { name: ["b"], params: [{"#1": ["c"]}] }]"##
        );
    }
}
