//! Helper trait for implementing node tree visitors.

use super::nodes::{
    Argument, Attribute, Comment, ExternalLink, Heading, HtmlEntity, Node, Style, Tag, Template,
    Wikicode, Wikilink,
};

/// A trait for visiting the nodes of a node tree.
///
/// Every method has a default implementation which visits the children of
/// the node, so implementors only need to override the methods for the
/// nodes they care about. Overrides can still descend into children by
/// calling the free function of the same name.
pub trait Visitor<'tt, E> {
    /// Visits a [`Node::Argument`].
    #[inline]
    fn visit_argument(&mut self, argument: &'tt Argument) -> Result<(), E> {
        visit_argument(self, argument)
    }

    /// Visits a tag [`Attribute`].
    #[inline]
    fn visit_attribute(&mut self, attribute: &'tt Attribute) -> Result<(), E> {
        visit_attribute(self, attribute)
    }

    /// Visits a [`Node::Comment`].
    #[inline]
    fn visit_comment(&mut self, _comment: &'tt Comment) -> Result<(), E> {
        Ok(())
    }

    /// Visits a [`Node::ExternalLink`].
    #[inline]
    fn visit_external_link(&mut self, link: &'tt ExternalLink) -> Result<(), E> {
        visit_external_link(self, link)
    }

    /// Visits a [`Node::Heading`].
    #[inline]
    fn visit_heading(&mut self, heading: &'tt Heading) -> Result<(), E> {
        visit_heading(self, heading)
    }

    /// Visits a [`Node::HtmlEntity`].
    #[inline]
    fn visit_html_entity(&mut self, _entity: &'tt HtmlEntity) -> Result<(), E> {
        Ok(())
    }

    /// Visits any node.
    #[inline]
    fn visit_node(&mut self, node: &'tt Node) -> Result<(), E> {
        visit_node(self, node)
    }

    /// Visits a [`Node::Style`].
    #[inline]
    fn visit_style(&mut self, style: &'tt Style) -> Result<(), E> {
        visit_style(self, style)
    }

    /// Visits a [`Node::Tag`].
    #[inline]
    fn visit_tag(&mut self, tag: &'tt Tag) -> Result<(), E> {
        visit_tag(self, tag)
    }

    /// Visits a [`Node::Template`].
    #[inline]
    fn visit_template(&mut self, template: &'tt Template) -> Result<(), E> {
        visit_template(self, template)
    }

    /// Visits a [`Node::Text`].
    #[inline]
    fn visit_text(&mut self, _text: &'tt str) -> Result<(), E> {
        Ok(())
    }

    /// Visits a sequence of nodes.
    #[inline]
    fn visit_wikicode(&mut self, code: &'tt Wikicode) -> Result<(), E> {
        visit_wikicode(self, code)
    }

    /// Visits a [`Node::Wikilink`].
    #[inline]
    fn visit_wikilink(&mut self, link: &'tt Wikilink) -> Result<(), E> {
        visit_wikilink(self, link)
    }
}

/// Default implementation of [`Visitor::visit_argument`].
#[inline]
pub fn visit_argument<'tt, V, E>(visitor: &mut V, argument: &'tt Argument) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&argument.name)?;
    if let Some(default) = &argument.default {
        visitor.visit_wikicode(default)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_attribute`].
#[inline]
pub fn visit_attribute<'tt, V, E>(visitor: &mut V, attribute: &'tt Attribute) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&attribute.name)?;
    if let Some(value) = &attribute.value {
        visitor.visit_wikicode(value)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_external_link`].
#[inline]
pub fn visit_external_link<'tt, V, E>(visitor: &mut V, link: &'tt ExternalLink) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&link.url)?;
    if let Some(title) = &link.title {
        visitor.visit_wikicode(title)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_heading`].
#[inline]
pub fn visit_heading<'tt, V, E>(visitor: &mut V, heading: &'tt Heading) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&heading.title)
}

/// Default implementation of [`Visitor::visit_node`].
pub fn visit_node<'tt, V, E>(visitor: &mut V, node: &'tt Node) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    match node {
        Node::Text(text) => visitor.visit_text(text),
        Node::Template(template) => visitor.visit_template(template),
        Node::Argument(argument) => visitor.visit_argument(argument),
        Node::Wikilink(link) => visitor.visit_wikilink(link),
        Node::ExternalLink(link) => visitor.visit_external_link(link),
        Node::Heading(heading) => visitor.visit_heading(heading),
        Node::Tag(tag) => visitor.visit_tag(tag),
        Node::Comment(comment) => visitor.visit_comment(comment),
        Node::HtmlEntity(entity) => visitor.visit_html_entity(entity),
        Node::Style(style) => visitor.visit_style(style),
    }
}

/// Default implementation of [`Visitor::visit_style`].
#[inline]
pub fn visit_style<'tt, V, E>(visitor: &mut V, style: &'tt Style) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&style.contents)
}

/// Default implementation of [`Visitor::visit_tag`].
#[inline]
pub fn visit_tag<'tt, V, E>(visitor: &mut V, tag: &'tt Tag) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&tag.tag)?;
    for attribute in &tag.attributes {
        visitor.visit_attribute(attribute)?;
    }
    if let Some(contents) = &tag.contents {
        visitor.visit_wikicode(contents)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_template`].
#[inline]
pub fn visit_template<'tt, V, E>(visitor: &mut V, template: &'tt Template) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&template.name)?;
    for param in &template.params {
        if param.showkey {
            visitor.visit_wikicode(&param.name)?;
        }
        visitor.visit_wikicode(&param.value)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_wikicode`].
#[inline]
pub fn visit_wikicode<'tt, V, E>(visitor: &mut V, code: &'tt Wikicode) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    for node in &code.nodes {
        visitor.visit_node(node)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_wikilink`].
#[inline]
pub fn visit_wikilink<'tt, V, E>(visitor: &mut V, link: &'tt Wikilink) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_wikicode(&link.title)?;
    if let Some(text) = &link.text {
        visitor.visit_wikicode(text)?;
    }
    Ok(())
}
