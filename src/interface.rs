// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The interface between the tree builder and the document builder (sink).

use std::borrow::Cow;

use tendril::StrTendril;

use crate::tokenizer::{Doctype, Tag};

pub use self::QuirksMode::{LimitedQuirks, NoQuirks, Quirks};

/// The namespace of an element or attribute.
///
/// A closed set: the tree builder only ever distinguishes these seven.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Namespace {
    None,
    Html,
    MathMl,
    Svg,
    XLink,
    Xml,
    Xmlns,
}

/// A document's quirks mode, set by DOCTYPE handling.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum QuirksMode {
    /// Full quirks mode
    Quirks,
    /// Almost standards mode
    LimitedQuirks,
    /// Standards mode
    NoQuirks,
}

/// A tag attribute.
///
/// The namespace is almost always `Namespace::None`. The tokeniser creates
/// all attributes this way; the tree builder adjusts certain attribute
/// namespaces inside foreign content (MathML, SVG).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    pub ns: Namespace,
    pub name: StrTendril,
    pub value: StrTendril,
}

/// Types which can process the tree modifications requested by the builder.
///
/// # Reference counting
///
/// Node handles are owned by the sink. Every method that returns a handle
/// hands the caller one reference, which the caller must eventually release
/// with [`unref_node`](TreeSink::unref_node); `ref_node` acquires an
/// additional reference on a handle the caller already holds. The builder
/// keeps one reference per open-element stack frame, one per active
/// formatting list entry, and one each for the document, head and form
/// pointers; all of these are released when the builder is dropped.
pub trait TreeSink {
    /// The overall result of parsing.
    type Handle: Clone + PartialEq;

    /// Signal a parse error.
    fn parse_error(&mut self, msg: Cow<'static, str>);

    /// Create a comment node.
    fn create_comment(&mut self, text: &StrTendril) -> Self::Handle;

    /// Create a doctype node.
    fn create_doctype(&mut self, doctype: &Doctype) -> Self::Handle;

    /// Create an element for the given tag, with the tag's attributes.
    fn create_element(&mut self, tag: &Tag) -> Self::Handle;

    /// Create a text node.
    fn create_text(&mut self, text: &StrTendril) -> Self::Handle;

    /// Acquire an additional reference on a node.
    fn ref_node(&mut self, node: &Self::Handle);

    /// Release one reference on a node.
    fn unref_node(&mut self, node: &Self::Handle);

    /// Append a node as the last child of a parent. Returns the node the
    /// child effectively became: a sink may merge a text node into an
    /// adjacent text sibling and return the coalesced node instead.
    fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Self::Handle;

    /// Insert a node into a parent before a reference child. As with
    /// [`append_child`](TreeSink::append_child), the effective node is
    /// returned and text may be coalesced with the preceding sibling.
    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        ref_child: &Self::Handle,
    ) -> Self::Handle;

    /// Detach a child from a parent, returning the removed node.
    fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Self::Handle;

    /// Clone a node, and its subtree if `deep` is set.
    fn clone_node(&mut self, node: &Self::Handle, deep: bool) -> Self::Handle;

    /// Move all the children of one node onto the end of another's.
    fn reparent_children(&mut self, src: &Self::Handle, dst: &Self::Handle);

    /// Get a node's parent, or `None` if it has none. With `element_only`
    /// set, a non-element parent (such as the document) yields `None`.
    fn get_parent(&mut self, node: &Self::Handle, element_only: bool) -> Option<Self::Handle>;

    /// Does the node have any children?
    fn has_children(&self, node: &Self::Handle) -> bool;

    /// Associate a form-associatable node with a form element.
    fn form_associate(&mut self, form: &Self::Handle, node: &Self::Handle);

    /// Add each attribute to the node, unless an attribute with that name
    /// is already present.
    fn add_attributes(&mut self, node: &Self::Handle, attrs: &[Attribute]);

    /// Set the document's quirks mode.
    fn set_quirks_mode(&mut self, mode: QuirksMode);
}
