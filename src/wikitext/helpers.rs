//! Node tree visitors.

use super::{
    nodes::{Argument, ExternalLink, HtmlEntity, Node, Tag, Template, Wikilink},
    visit::{self, Visitor},
};
use core::{convert::Infallible, fmt};

/// Extracts the readable text from a node tree.
///
/// Templates and comments produce no text. Links produce their display text,
/// entities are decoded, and the contents of invisible tags are dropped.
pub struct StripCode<W>
where
    W: fmt::Write,
{
    /// The accumulated text.
    content: W,
}

impl<W> StripCode<W>
where
    W: fmt::Write,
{
    /// Creates a new text extractor writing to `content`.
    pub fn new(content: W) -> Self {
        Self { content }
    }

    /// Returns the text content, consuming the extractor.
    pub fn finish(self) -> W {
        self.content
    }
}

impl<'tt, W> Visitor<'tt, fmt::Error> for StripCode<W>
where
    W: fmt::Write,
{
    fn visit_argument(&mut self, argument: &'tt Argument) -> fmt::Result {
        match &argument.default {
            Some(default) => self.visit_wikicode(default),
            None => Ok(()),
        }
    }

    fn visit_external_link(&mut self, link: &'tt ExternalLink) -> fmt::Result {
        match (&link.title, link.brackets) {
            (Some(title), true) => self.visit_wikicode(title),
            (None, true) => Ok(()),
            (_, false) => self.visit_wikicode(&link.url),
        }
    }

    fn visit_html_entity(&mut self, entity: &'tt HtmlEntity) -> fmt::Result {
        self.content.write_str(&entity.normalize())
    }

    fn visit_tag(&mut self, tag: &'tt Tag) -> fmt::Result {
        match &tag.contents {
            Some(contents) if tag.is_visible() => self.visit_wikicode(contents),
            _ => Ok(()),
        }
    }

    fn visit_template(&mut self, _template: &'tt Template) -> fmt::Result {
        Ok(())
    }

    fn visit_text(&mut self, text: &'tt str) -> fmt::Result {
        self.content.write_str(text)
    }

    fn visit_wikilink(&mut self, link: &'tt Wikilink) -> fmt::Result {
        self.visit_wikicode(link.text.as_ref().unwrap_or(&link.title))
    }
}

/// Collects every node in a tree which matches a predicate.
pub struct Filter<'tt, F> {
    /// The predicate.
    predicate: F,
    /// The matching nodes, in document order.
    found: Vec<&'tt Node>,
}

impl<'tt, F> Filter<'tt, F>
where
    F: FnMut(&Node) -> bool,
{
    /// Creates a new filter with the given predicate.
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            found: Vec::new(),
        }
    }

    /// Returns the matching nodes, consuming the filter.
    pub fn finish(self) -> Vec<&'tt Node> {
        self.found
    }
}

impl<'tt, F> Visitor<'tt, Infallible> for Filter<'tt, F>
where
    F: FnMut(&Node) -> bool,
{
    fn visit_node(&mut self, node: &'tt Node) -> Result<(), Infallible> {
        if (self.predicate)(node) {
            self.found.push(node);
        }
        visit::visit_node(self, node)
    }
}

#[cfg(test)]
mod tests {
    use crate::wikitext::{Node, parse};

    #[test]
    fn strip_code() {
        let code = parse(
            "{{foo|bar}}'''Hello''' [[Page|world]]&amp;\n\n\n\n[http://x link] <!-- c -->\
             <ref>note</ref>{{{a|b}}} http://y",
        )
        .unwrap();
        assert_eq!(code.strip_code(), "Hello world&\n\nlink noteb http://y");
    }

    #[test]
    fn invisible_tags() {
        let code = parse("a<gallery>b</gallery>c").unwrap();
        assert_eq!(code.strip_code(), "ac");
    }

    #[test]
    fn filter_nested() {
        let code = parse("{{a|{{b}}}} [[c|{{d}}]]").unwrap();
        let names = code
            .templates()
            .iter()
            .map(|template| template.name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a", "b", "d"]);
        assert_eq!(code.filter(|node| matches!(node, Node::Wikilink(_))).len(), 1);
    }
}
