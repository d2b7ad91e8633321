// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A reference-counted DOM for exercising the tree builder, plus the
//! `|`-indented serialisation format used by the expected trees.
//!
//! The sink keeps a strict ledger of every node reference it hands out
//! (node creation, clones, effective-node returns, `ref_node`) against every
//! `unref_node`; `Stats::assert_balanced` verifies the builder released
//! everything it took.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use trellis::tendril::StrTendril;
use trellis::{Attribute, Doctype, Namespace, QuirksMode, Tag, TagKind, Token, TreeSink};

pub enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Text {
        contents: RefCell<String>,
    },
    Comment {
        contents: String,
    },
    Element {
        ns: Namespace,
        name: String,
        attrs: RefCell<Vec<Attribute>>,
    },
}

pub struct Node {
    pub data: NodeData,
    pub children: RefCell<Vec<Handle>>,
    pub parent: RefCell<Option<Weak<Node>>>,
}

impl Node {
    fn new(data: NodeData) -> Handle {
        Handle(Rc::new(Node {
            data,
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
        }))
    }

    fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }
}

/// A node handle with pointer identity.
#[derive(Clone)]
pub struct Handle(pub Rc<Node>);

impl PartialEq for Handle {
    fn eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Handle {
    type Target = Node;
    fn deref(&self) -> &Node {
        &self.0
    }
}

fn node_id(handle: &Handle) -> usize {
    Rc::as_ptr(&handle.0) as usize
}

/// Shared observation point that outlives the sink (and the builder that
/// owns it).
#[derive(Default)]
pub struct Stats {
    grants: Cell<usize>,
    releases: Cell<usize>,
    outstanding: RefCell<HashMap<usize, isize>>,
    pub errors: RefCell<Vec<String>>,
    pub quirks_mode: Cell<Option<QuirksMode>>,
    pub form_associations: Cell<usize>,
}

impl Stats {
    fn grant(&self, node: &Handle) {
        self.grants.set(self.grants.get() + 1);
        *self.outstanding.borrow_mut().entry(node_id(node)).or_insert(0) += 1;
    }

    fn release(&self, node: &Handle) {
        self.releases.set(self.releases.get() + 1);
        let mut outstanding = self.outstanding.borrow_mut();
        let count = outstanding.entry(node_id(node)).or_insert(0);
        *count -= 1;
        assert!(*count >= 0, "node released more often than referenced");
    }

    /// Every reference handed out has been released.
    pub fn assert_balanced(&self) {
        assert_eq!(
            self.grants.get(),
            self.releases.get(),
            "sink reference counts out of balance"
        );
        assert!(
            self.outstanding.borrow().values().all(|&c| c == 0),
            "some node still holds references"
        );
    }
}

pub struct RefDom {
    pub document: Handle,
    pub stats: Rc<Stats>,
}

impl RefDom {
    /// A fresh DOM. The document node carries one granted reference: the
    /// one the harness transfers to the builder via `set_document_node`.
    pub fn new() -> RefDom {
        let stats = Rc::new(Stats::default());
        let document = Node::new(NodeData::Document);
        stats.grant(&document);
        RefDom { document, stats }
    }
}

fn attach(parent: &Handle, index: usize, child: &Handle) {
    parent.children.borrow_mut().insert(index, child.clone());
    *child.parent.borrow_mut() = Some(Rc::downgrade(&parent.0));
}

// Merge a text child into an existing text sibling, if there is one just
// before the insertion point. Returns the coalesced node.
fn merge_text(prev: &Handle, child: &Handle) -> Option<Handle> {
    match (&prev.data, &child.data) {
        (NodeData::Text { contents }, NodeData::Text { contents: new }) => {
            contents.borrow_mut().push_str(&new.borrow());
            Some(prev.clone())
        }
        _ => None,
    }
}

impl TreeSink for RefDom {
    type Handle = Handle;

    fn parse_error(&mut self, msg: std::borrow::Cow<'static, str>) {
        self.stats.errors.borrow_mut().push(msg.into_owned());
    }

    fn create_comment(&mut self, text: &StrTendril) -> Handle {
        let node = Node::new(NodeData::Comment {
            contents: text.to_string(),
        });
        self.stats.grant(&node);
        node
    }

    fn create_doctype(&mut self, doctype: &Doctype) -> Handle {
        let opt = |x: &Option<StrTendril>| x.as_ref().map_or(String::new(), |t| t.to_string());
        let node = Node::new(NodeData::Doctype {
            name: opt(&doctype.name),
            public_id: opt(&doctype.public_id),
            system_id: opt(&doctype.system_id),
        });
        self.stats.grant(&node);
        node
    }

    fn create_element(&mut self, tag: &Tag) -> Handle {
        let node = Node::new(NodeData::Element {
            ns: tag.ns,
            name: tag.name.to_string(),
            attrs: RefCell::new(tag.attrs.clone()),
        });
        self.stats.grant(&node);
        node
    }

    fn create_text(&mut self, text: &StrTendril) -> Handle {
        let node = Node::new(NodeData::Text {
            contents: RefCell::new(text.to_string()),
        });
        self.stats.grant(&node);
        node
    }

    fn ref_node(&mut self, node: &Handle) {
        self.stats.grant(node);
    }

    fn unref_node(&mut self, node: &Handle) {
        self.stats.release(node);
    }

    fn append_child(&mut self, parent: &Handle, child: &Handle) -> Handle {
        let merged = {
            let children = parent.children.borrow();
            children.last().and_then(|last| merge_text(last, child))
        };
        if let Some(merged) = merged {
            self.stats.grant(&merged);
            return merged;
        }
        let index = parent.children.borrow().len();
        attach(parent, index, child);
        self.stats.grant(child);
        child.clone()
    }

    fn insert_before(&mut self, parent: &Handle, child: &Handle, ref_child: &Handle) -> Handle {
        let index = parent
            .children
            .borrow()
            .iter()
            .position(|c| c == ref_child)
            .expect("reference child not found");
        if index > 0 {
            let prev = parent.children.borrow()[index - 1].clone();
            if let Some(merged) = merge_text(&prev, child) {
                self.stats.grant(&merged);
                return merged;
            }
        }
        attach(parent, index, child);
        self.stats.grant(child);
        child.clone()
    }

    fn remove_child(&mut self, parent: &Handle, child: &Handle) -> Handle {
        let index = parent
            .children
            .borrow()
            .iter()
            .position(|c| c == child)
            .expect("child not found");
        parent.children.borrow_mut().remove(index);
        *child.parent.borrow_mut() = None;
        self.stats.grant(child);
        child.clone()
    }

    fn clone_node(&mut self, node: &Handle, deep: bool) -> Handle {
        let data = match &node.data {
            NodeData::Document => NodeData::Document,
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => NodeData::Doctype {
                name: name.clone(),
                public_id: public_id.clone(),
                system_id: system_id.clone(),
            },
            NodeData::Text { contents } => NodeData::Text {
                contents: RefCell::new(contents.borrow().clone()),
            },
            NodeData::Comment { contents } => NodeData::Comment {
                contents: contents.clone(),
            },
            NodeData::Element { ns, name, attrs } => NodeData::Element {
                ns: *ns,
                name: name.clone(),
                attrs: RefCell::new(attrs.borrow().clone()),
            },
        };
        let clone = Node::new(data);
        if deep {
            let children: Vec<Handle> = node.children.borrow().clone();
            for child in children {
                let child_clone = self.clone_node(&child, true);
                // The recursive grant is the structural reference; the DOM
                // holds it, not the builder.
                self.stats.release(&child_clone);
                let index = clone.children.borrow().len();
                attach(&clone, index, &child_clone);
            }
        }
        self.stats.grant(&clone);
        clone
    }

    fn reparent_children(&mut self, src: &Handle, dst: &Handle) {
        let moved: Vec<Handle> = src.children.borrow_mut().drain(..).collect();
        for child in moved {
            let index = dst.children.borrow().len();
            attach(dst, index, &child);
        }
    }

    fn get_parent(&mut self, node: &Handle, element_only: bool) -> Option<Handle> {
        let parent = node.parent.borrow().as_ref().and_then(Weak::upgrade)?;
        let parent = Handle(parent);
        if element_only && !parent.is_element() {
            return None;
        }
        self.stats.grant(&parent);
        Some(parent)
    }

    fn has_children(&self, node: &Handle) -> bool {
        !node.children.borrow().is_empty()
    }

    fn form_associate(&mut self, _form: &Handle, _node: &Handle) {
        self.stats
            .form_associations
            .set(self.stats.form_associations.get() + 1);
    }

    fn add_attributes(&mut self, node: &Handle, attrs: &[Attribute]) {
        let NodeData::Element { attrs: existing, .. } = &node.data else {
            panic!("add_attributes on a non-element");
        };
        let mut existing = existing.borrow_mut();
        for attr in attrs {
            if !existing.iter().any(|a| a.name == attr.name) {
                existing.push(attr.clone());
            }
        }
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.stats.quirks_mode.set(Some(mode));
    }
}

fn ns_prefix(ns: Namespace) -> &'static str {
    match ns {
        Namespace::Svg => "svg ",
        Namespace::MathMl => "math ",
        Namespace::XLink => "xlink ",
        Namespace::Xml => "xml ",
        Namespace::Xmlns => "xmlns ",
        _ => "",
    }
}

fn serialize_node(buf: &mut String, indent: usize, handle: &Handle) {
    buf.push('|');
    buf.push_str(&" ".repeat(indent));

    match &handle.data {
        NodeData::Document => panic!("should not reach Document"),

        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            buf.push_str("<!DOCTYPE ");
            buf.push_str(name);
            if !public_id.is_empty() || !system_id.is_empty() {
                buf.push_str(&format!(" \"{public_id}\" \"{system_id}\""));
            }
            buf.push_str(">\n");
        }

        NodeData::Text { contents } => {
            buf.push('"');
            buf.push_str(&contents.borrow());
            buf.push_str("\"\n");
        }

        NodeData::Comment { contents } => {
            buf.push_str("<!-- ");
            buf.push_str(contents);
            buf.push_str(" -->\n");
        }

        NodeData::Element { ns, name, attrs } => {
            buf.push('<');
            buf.push_str(ns_prefix(*ns));
            buf.push_str(name);
            buf.push_str(">\n");

            let mut attrs = attrs.borrow().clone();
            attrs.sort_by(|x, y| x.name.cmp(&y.name));
            for attr in attrs {
                buf.push('|');
                buf.push_str(&" ".repeat(indent + 2));
                buf.push_str(&format!(
                    "{}{}=\"{}\"\n",
                    ns_prefix(attr.ns),
                    attr.name,
                    attr.value
                ));
            }
        }
    }

    for child in handle.children.borrow().iter() {
        serialize_node(buf, indent + 2, child);
    }
}

/// Serialise the document's children in the `|`-indented format.
pub fn serialize(document: &Handle) -> String {
    let mut buf = String::new();
    for child in document.children.borrow().iter() {
        serialize_node(&mut buf, 1, child);
    }
    buf
}

// Token constructors for driving the builder without a tokeniser.

pub fn start(name: &str) -> Token {
    start_attrs(name, &[])
}

pub fn start_attrs(name: &str, attrs: &[(&str, &str)]) -> Token {
    Token::Tag(Tag {
        kind: TagKind::StartTag,
        ns: Namespace::Html,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: attrs
            .iter()
            .map(|&(n, v)| Attribute {
                ns: Namespace::None,
                name: StrTendril::from_slice(n),
                value: StrTendril::from_slice(v),
            })
            .collect(),
    })
}

pub fn start_self_closing(name: &str) -> Token {
    let Token::Tag(mut tag) = start(name) else {
        unreachable!()
    };
    tag.self_closing = true;
    Token::Tag(tag)
}

pub fn end(name: &str) -> Token {
    Token::Tag(Tag {
        kind: TagKind::EndTag,
        ns: Namespace::Html,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: vec![],
    })
}

pub fn text(contents: &str) -> Token {
    Token::Characters(StrTendril::from_slice(contents))
}

pub fn comment(contents: &str) -> Token {
    Token::Comment(StrTendril::from_slice(contents))
}

pub fn doctype(name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Token {
    Token::Doctype(Doctype {
        name: Some(StrTendril::from_slice(name)),
        public_id: public_id.map(StrTendril::from_slice),
        system_id: system_id.map(StrTendril::from_slice),
        force_quirks: false,
    })
}
