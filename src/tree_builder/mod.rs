// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tree builder.

use std::borrow::Cow::{self, Borrowed};
use std::fmt;

use log::{debug, log_enabled, Level};
use tendril::StrTendril;

use crate::interface::{Attribute, Namespace, QuirksMode, TreeSink};
use crate::tokenizer::{self, RawKind, StartTag, Tag, TokenSink, TokenSinkResult};

use self::element_types::{
    is_formatting_element, is_scoping_element, is_special_element, type_from_name,
    ElementType as Ty,
};
use self::foreign::{
    adjust_foreign_attributes, adjust_mathml_attributes, adjust_svg_attributes,
    adjust_svg_tag_name,
};
use self::formatting::{ActiveFormattingList, ListEntry};
use self::stack::{ElementStack, StackEntry};
use self::types::*;

mod data;
mod element_types;
mod foreign;
mod formatting;
mod rules;
mod stack;
mod types;

/// Tree builder options, with an impl for Default.
#[derive(Copy, Clone)]
pub struct TreeBuilderOpts {
    /// Report all parse errors defined by the parsing algorithm, at some
    /// performance penalty? Default: false
    pub exact_errors: bool,

    /// Is scripting enabled?
    ///
    /// This decides how `<noscript>` parses: with scripting on, its contents
    /// collect as raw text; with scripting off, they parse as markup.
    pub scripting_enabled: bool,

    /// Is this document being parsed from the `srcdoc` attribute of an
    /// `<iframe>` element? This affects DOCTYPE quirks-mode inference.
    pub iframe_srcdoc: bool,

    /// Should we drop the DOCTYPE (if any) from the tree?
    pub drop_doctype: bool,

    /// Initial quirks mode. Default: NoQuirks
    pub quirks_mode: QuirksMode,
}

impl Default for TreeBuilderOpts {
    fn default() -> TreeBuilderOpts {
        TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: true,
            iframe_srcdoc: false,
            drop_doctype: false,
            quirks_mode: QuirksMode::NoQuirks,
        }
    }
}

enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}

/// The HTML tree builder.
///
/// Feeds on tokens through its [`TokenSink`] impl and issues tree mutations
/// to the sink. Tokens delivered before [`set_document_node`] has been
/// called are discarded. Dropping the builder releases every node reference
/// it still holds (document, head and form pointers, open elements, active
/// formatting entries, and any pending text-collection element).
///
/// [`set_document_node`]: TreeBuilder::set_document_node
pub struct TreeBuilder<Handle, Sink>
where
    Handle: Clone + PartialEq,
    Sink: TreeSink<Handle = Handle>,
{
    /// Options controlling the behavior of the tree builder.
    opts: TreeBuilderOpts,

    /// Consumer of tree modifications.
    pub sink: Sink,

    /// Insertion mode.
    mode: InsertionMode,

    /// The document node. Owns one sink reference.
    doc_handle: Option<Handle>,

    /// Stack of open elements, most recently added at the top.
    stack: ElementStack<Handle>,

    /// List of active formatting elements.
    formatting: ActiveFormattingList<Handle>,

    /// Head element pointer. Owns one sink reference.
    head_elem: Option<Handle>,

    /// Form element pointer. Owns one sink reference.
    form_elem: Option<Handle>,

    /// Character collection for generic (R)CDATA and script data.
    collect: Option<CollectState<Handle>>,

    /// Frameset-ok flag.
    frameset_ok: bool,

    /// Ignore a following U+000A LINE FEED?
    ignore_lf: bool,

    /// Is foster parenting enabled?
    foster_parenting: bool,

    /// Quirks mode as set by DOCTYPE handling.
    quirks_mode: QuirksMode,
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone + PartialEq,
    Sink: TreeSink<Handle = Handle>,
{
    /// Create a new tree builder which sends tree modifications to a
    /// particular `TreeSink`. The tree builder is also a `TokenSink`.
    pub fn new(sink: Sink, opts: TreeBuilderOpts) -> TreeBuilder<Handle, Sink> {
        TreeBuilder {
            opts,
            sink,
            mode: InsertionMode::Initial,
            doc_handle: None,
            stack: ElementStack::new(),
            formatting: ActiveFormattingList::new(),
            head_elem: None,
            form_elem: None,
            collect: None,
            frameset_ok: true,
            ignore_lf: false,
            foster_parenting: false,
            quirks_mode: opts.quirks_mode,
        }
    }

    /// Supply the document node everything else hangs off. Ownership of one
    /// sink reference transfers to the builder. Until this is called, the
    /// builder discards every token it receives.
    pub fn set_document_node(&mut self, doc: Handle) {
        if let Some(old) = self.doc_handle.replace(doc) {
            self.sink.unref_node(&old);
        }
    }

    fn debug_step(&self, mode: InsertionMode, token: &Token) {
        if log_enabled!(Level::Debug) {
            debug!("processing {token:?} in insertion mode {mode:?}");
        }
    }

    fn process_to_completion(&mut self, mut token: Token) -> TokenSinkResult {
        loop {
            let should_have_acked_self_closing = matches!(
                token,
                Token::Tag(Tag {
                    self_closing: true,
                    kind: StartTag,
                    ..
                })
            );
            let mode = self.mode;
            match self.step(mode, token) {
                ProcessResult::Done => {
                    if should_have_acked_self_closing {
                        self.sink
                            .parse_error(Borrowed("Unacknowledged self-closing tag"));
                    }
                    return TokenSinkResult::Continue;
                }
                ProcessResult::DoneAckSelfClosing => return TokenSinkResult::Continue,
                ProcessResult::Reprocess(m, t) => {
                    self.mode = m;
                    token = t;
                }
                ProcessResult::ToPlaintext => return TokenSinkResult::Plaintext,
                ProcessResult::ToRawData(k) => return TokenSinkResult::RawData(k),
            }
        }
    }

    //§ parse-state
    fn unexpected<T: fmt::Debug>(&mut self, _thing: &T) -> ProcessResult {
        let msg = if self.opts.exact_errors {
            Cow::from(format!(
                "Unexpected token {:?} in insertion mode {:?}",
                _thing, self.mode
            ))
        } else {
            Borrowed("Unexpected token")
        };
        self.sink.parse_error(msg);
        ProcessResult::Done
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
        self.sink.set_quirks_mode(mode);
    }

    fn current_handle(&self) -> Handle {
        self.stack.current().node.clone()
    }

    fn doc_handle(&self) -> Handle {
        self.doc_handle.clone().expect("no document node")
    }

    /// The second frame, when it is a body element.
    fn body_handle(&self) -> Option<Handle> {
        if self.stack.len() >= 2 && self.stack.get(1).ty == Ty::Body {
            Some(self.stack.get(1).node.clone())
        } else {
            None
        }
    }

    fn in_scope(&self, ty: Ty) -> bool {
        self.stack.element_in_scope(ty, false) != 0
    }

    fn in_table_scope(&self, ty: Ty) -> bool {
        self.stack.element_in_scope(ty, true) != 0
    }

    //§ stack-maintenance
    /// Pop the current node, detaching any formatting-list references to its
    /// slot. The caller takes over the popped frame's node reference.
    fn pop(&mut self) -> StackEntry<Handle> {
        let slot = self.stack.current_index();
        let entry = self.stack.pop();
        // HTML and TABLE elements never enter the formatting list, so their
        // slots cannot be referenced from it.
        if is_formatting_element(entry.ty)
            || (is_scoping_element(entry.ty) && entry.ty != Ty::Html && entry.ty != Ty::Table)
        {
            self.formatting.clear_stack_index(slot);
        }
        entry
    }

    fn pop_and_unref(&mut self) -> Ty {
        let entry = self.pop();
        self.sink.unref_node(&entry.node);
        entry.ty
    }

    /// Pop frames until one of the given type has been popped. The caller
    /// guarantees such a frame exists.
    fn pop_until(&mut self, ty: Ty) {
        while self.pop_and_unref() != ty {}
    }

    /// Pop until a frame of the given type is popped; signal an error if
    /// anything else had to be popped on the way.
    fn expect_to_close(&mut self, ty: Ty) {
        let mut popped = 0usize;
        loop {
            popped += 1;
            if self.pop_and_unref() == ty {
                break;
            }
        }
        if popped != 1 {
            let msg = if self.opts.exact_errors {
                Cow::from(format!("Unexpected open element while closing {ty:?}"))
            } else {
                Borrowed("Unexpected open element")
            };
            self.sink.parse_error(msg);
        }
    }

    fn clear_stack_back_to(&mut self, context: fn(Ty) -> bool) {
        while !context(self.stack.current_type()) {
            self.pop_and_unref();
        }
    }

    /// Remove a mid-stack frame, renumbering formatting-list references.
    /// The caller takes over the frame's node reference.
    fn remove_stack_entry(&mut self, index: usize) -> StackEntry<Handle> {
        let entry = self.stack.remove(index);
        self.formatting.stack_removed(index);
        entry
    }

    /// Insert a frame mid-stack, renumbering formatting-list references.
    /// The stack takes over one node reference from the caller.
    fn insert_stack_entry(&mut self, index: usize, ns: Namespace, ty: Ty, node: Handle) {
        self.stack.insert(index, ns, ty, node);
        self.formatting.stack_inserted(index);
    }

    //§ creating-and-inserting-nodes
    /// Where the next node goes. Foster parenting redirects insertions that
    /// would land inside table internals to just before the innermost table.
    fn insertion_point_for(&mut self, target: usize) -> InsertionPoint<Handle> {
        let ty = self.stack.get(target).ty;
        if self.foster_parenting
            && matches!(ty, Ty::Table | Ty::Tbody | Ty::Tfoot | Ty::Thead | Ty::Tr)
        {
            let table_idx = self.stack.current_table();
            if table_idx != 0 {
                let table = self.stack.get(table_idx).node.clone();
                if let Some(parent) = self.sink.get_parent(&table, true) {
                    return InsertionPoint::BeforeSibling {
                        parent,
                        sibling: table,
                    };
                }
                // Parentless table: insert into the element below it.
                let below = self.stack.get(table_idx - 1).node.clone();
                return InsertionPoint::LastChild(below);
            }
        }
        InsertionPoint::LastChild(self.stack.get(target).node.clone())
    }

    fn appropriate_insertion_point(&mut self) -> InsertionPoint<Handle> {
        self.insertion_point_for(self.stack.current_index())
    }

    /// Perform the insertion. Returns the effective node (owning one sink
    /// reference), and releases the `get_parent` reference a foster target
    /// carries.
    fn insert_at(&mut self, point: InsertionPoint<Handle>, child: &Handle) -> Handle {
        match point {
            InsertionPoint::LastChild(parent) => self.sink.append_child(&parent, child),
            InsertionPoint::BeforeSibling { parent, sibling } => {
                let effective = self.sink.insert_before(&parent, child, &sibling);
                self.sink.unref_node(&parent);
                effective
            }
        }
    }

    fn form_associate_if_needed(&mut self, ty: Ty, node: &Handle, attrs: &[Attribute]) {
        if !matches!(
            ty,
            Ty::Button | Ty::Fieldset | Ty::Input | Ty::Object | Ty::Select | Ty::Textarea | Ty::Img
        ) {
            return;
        }
        let Some(form) = self.form_elem.clone() else {
            return;
        };
        // A listed element naming its own form keeps that association.
        if ty != Ty::Img && attrs.iter().any(|a| &*a.name == "form") {
            return;
        }
        self.sink.form_associate(&form, node);
    }

    /// Create an element for the tag, insert it, and push it. The stack owns
    /// the node reference; the returned handle is a plain copy.
    fn insert_element(&mut self, tag: &Tag) -> Handle {
        let ty = type_from_name(&tag.name);
        let node = self.sink.create_element(tag);
        self.form_associate_if_needed(ty, &node, &tag.attrs);
        let point = self.appropriate_insertion_point();
        let appended = self.insert_at(point, &node);
        self.sink.unref_node(&appended);
        self.stack.push(tag.ns, ty, node.clone());
        node
    }

    /// As `insert_element`, but for void elements: nothing is pushed and the
    /// builder keeps no reference.
    fn insert_element_no_push(&mut self, tag: &Tag) {
        let ty = type_from_name(&tag.name);
        let node = self.sink.create_element(tag);
        self.form_associate_if_needed(ty, &node, &tag.attrs);
        let point = self.appropriate_insertion_point();
        let appended = self.insert_at(point, &node);
        self.sink.unref_node(&appended);
        self.sink.unref_node(&node);
    }

    fn insert_phantom(&mut self, name: &str) -> Handle {
        let tag = Tag {
            kind: StartTag,
            ns: Namespace::Html,
            name: StrTendril::from_slice(name),
            self_closing: false,
            attrs: vec![],
        };
        self.insert_element(&tag)
    }

    fn create_root(&mut self, attrs: Vec<Attribute>) {
        let tag = Tag {
            kind: StartTag,
            ns: Namespace::Html,
            name: StrTendril::from_slice("html"),
            self_closing: false,
            attrs,
        };
        let node = self.sink.create_element(&tag);
        let doc = self.doc_handle();
        let appended = self.sink.append_child(&doc, &node);
        self.sink.unref_node(&appended);
        self.stack.push(Namespace::Html, Ty::Html, node);
    }

    /// Append text at the appropriate place. Coalescing with an existing
    /// trailing text node is the sink's business: it reports the effective
    /// node and the builder releases both references it briefly holds.
    fn append_text(&mut self, text: &StrTendril) {
        let node = self.sink.create_text(text);
        let point = self.appropriate_insertion_point();
        let appended = self.insert_at(point, &node);
        self.sink.unref_node(&appended);
        self.sink.unref_node(&node);
    }

    fn append_comment_to(&mut self, parent: Handle, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(&text);
        let appended = self.sink.append_child(&parent, &comment);
        self.sink.unref_node(&appended);
        self.sink.unref_node(&comment);
        ProcessResult::Done
    }

    fn append_comment(&mut self, text: StrTendril) -> ProcessResult {
        let parent = self.current_handle();
        self.append_comment_to(parent, text)
    }

    fn append_comment_to_doc(&mut self, text: StrTendril) -> ProcessResult {
        let parent = self.doc_handle();
        self.append_comment_to(parent, text)
    }

    fn append_comment_to_html(&mut self, text: StrTendril) -> ProcessResult {
        let parent = self.stack.get(0).node.clone();
        self.append_comment_to(parent, text)
    }

    /// Scan a character run for its leading ASCII whitespace. All-whitespace
    /// runs are consumed (and appended when `insert` is set); otherwise the
    /// prefix is split off and the non-whitespace remainder comes back for
    /// reprocessing.
    fn split_whitespace_run(&mut self, text: StrTendril, insert: bool) -> Option<StrTendril> {
        let pos = text
            .as_bytes()
            .iter()
            .position(|&b| !matches!(b, b'\t' | b'\n' | 0x0c | b' '));
        match pos {
            None => {
                if insert && !text.is_empty() {
                    self.append_text(&text);
                }
                None
            }
            Some(0) => Some(text),
            Some(c) => {
                if insert {
                    let ws = text.subtendril(0, c as u32);
                    self.append_text(&ws);
                }
                Some(text.subtendril(c as u32, text.len32() - c as u32))
            }
        }
    }

    //§ parsing-elements-that-contain-only-text
    /// Insert the element and start collecting its character data. The
    /// element is not pushed: the collection sub-state holds it until the
    /// matching end tag (or EOF) attaches the gathered text.
    fn collect_characters(
        &mut self,
        tag: &Tag,
        next_mode: InsertionMode,
        raw: RawKind,
    ) -> ProcessResult {
        let ty = type_from_name(&tag.name);
        let node = self.sink.create_element(tag);
        self.form_associate_if_needed(ty, &node, &tag.attrs);
        let point = self.appropriate_insertion_point();
        let appended = self.insert_at(point, &node);
        self.sink.unref_node(&appended);
        self.collect = Some(CollectState {
            mode: self.mode,
            ty,
            node,
            text: StrTendril::new(),
            depth: 1,
        });
        self.mode = next_mode;
        ProcessResult::ToRawData(raw)
    }

    fn parse_generic_rcdata(&mut self, tag: &Tag, rcdata: bool) -> ProcessResult {
        let raw = if rcdata { RawKind::Rcdata } else { RawKind::Cdata };
        self.collect_characters(tag, InsertionMode::GenericRcdata, raw)
    }

    fn parse_script(&mut self, tag: &Tag) -> ProcessResult {
        self.collect_characters(
            tag,
            InsertionMode::ScriptCollectCharacters,
            RawKind::ScriptData,
        )
    }

    fn collect_text(&mut self, text: &StrTendril) {
        self.collect
            .as_mut()
            .expect("no pending collection")
            .text
            .push_tendril(text);
    }

    fn collect_type(&self) -> Ty {
        self.collect.as_ref().expect("no pending collection").ty
    }

    fn collect_nest(&mut self) {
        self.collect.as_mut().expect("no pending collection").depth += 1;
    }

    fn collect_unnest(&mut self) -> u32 {
        let collect = self.collect.as_mut().expect("no pending collection");
        collect.depth -= 1;
        collect.depth
    }

    /// Attach the collected text to the pending element, release it, and
    /// restore the saved insertion mode.
    fn finish_collection(&mut self) {
        let collect = self.collect.take().expect("no pending collection");
        if !collect.text.is_empty() {
            let text = self.sink.create_text(&collect.text);
            let appended = self.sink.append_child(&collect.node, &text);
            self.sink.unref_node(&appended);
            self.sink.unref_node(&text);
        }
        self.sink.unref_node(&collect.node);
        self.mode = collect.mode;
    }
    //§ END

    //§ closing-elements-that-have-implied-end-tags
    fn close_implied_end_tags(&mut self, except: Option<Ty>) {
        loop {
            let ty = self.stack.current_type();
            if !matches!(
                ty,
                Ty::Dd | Ty::Dt | Ty::Li | Ty::Option | Ty::Optgroup | Ty::P | Ty::Rp | Ty::Rt
            ) {
                break;
            }
            if except == Some(ty) {
                break;
            }
            self.pop_and_unref();
        }
    }

    fn close_p_element(&mut self) {
        self.close_implied_end_tags(Some(Ty::P));
        if self.stack.current_type() != Ty::P {
            self.sink
                .parse_error(Borrowed("Unexpected open element while closing <p>"));
        }
        self.pop_until(Ty::P);
    }

    fn close_p_if_in_scope(&mut self) {
        if self.in_scope(Ty::P) {
            self.close_p_element();
        }
    }

    fn close_the_cell(&mut self) {
        self.close_implied_end_tags(None);
        let mut popped = 0usize;
        loop {
            popped += 1;
            if matches!(self.pop_and_unref(), Ty::Td | Ty::Th) {
                break;
            }
        }
        if popped != 1 {
            self.sink
                .parse_error(Borrowed("expected to close <td> or <th> with cell"));
        }
        self.clear_active_formatting_to_marker();
    }
    //§ END

    // https://html.spec.whatwg.org/multipage/#reset-the-insertion-mode-appropriately
    fn reset_insertion_mode(&self) -> InsertionMode {
        for i in (1..self.stack.len()).rev() {
            match self.stack.get(i).ty {
                Ty::Td | Ty::Th => return InsertionMode::InCell,
                Ty::Tr => return InsertionMode::InRow,
                Ty::Tbody | Ty::Tfoot | Ty::Thead => return InsertionMode::InTableBody,
                Ty::Caption => return InsertionMode::InCaption,
                Ty::Table => return InsertionMode::InTable,
                Ty::Body => return InsertionMode::InBody,
                // Select, colgroup, head, frameset and html trigger
                // fragment-case behaviour; document parsing keeps walking.
                _ => {}
            }
        }
        self.mode
    }

    //§ the-list-of-active-formatting-elements
    /// Record a formatting element just pushed onto the stack. The list
    /// takes its own reference.
    fn add_formatting_entry(&mut self, ty: Ty, node: &Handle) {
        let slot = self.stack.current_index();
        self.sink.ref_node(node);
        self.formatting.push(ListEntry {
            ns: Namespace::Html,
            ty,
            node: node.clone(),
            stack_index: slot,
        });
    }

    /// Record a marker for the scoping element currently on top of the
    /// stack (cell, caption, button or embedding element).
    fn insert_marker_for_current(&mut self) {
        let (ns, ty, node) = {
            let e = self.stack.current();
            (e.ns, e.ty, e.node.clone())
        };
        let slot = self.stack.current_index();
        self.sink.ref_node(&node);
        self.formatting.push(ListEntry {
            ns,
            ty,
            node,
            stack_index: slot,
        });
    }

    /// <https://html.spec.whatwg.org/#reconstruct-the-active-formatting-elements>
    fn reconstruct_active_formatting_list(&mut self) {
        let Some(last) = self.formatting.last() else {
            return;
        };
        if last.is_marker() || last.stack_index != 0 {
            return;
        }

        // Rewind to the earliest detached entry after the last marker or
        // still-open element.
        let mut i = self.formatting.len() - 1;
        while i > 0 {
            let prev = self.formatting.get(i - 1);
            if prev.is_marker() || prev.stack_index != 0 {
                break;
            }
            i -= 1;
        }

        // Clone each detached element back onto the tree and the stack,
        // rewriting its list entry to the clone.
        while i < self.formatting.len() {
            let (ns, ty, node) = {
                let e = self.formatting.get(i);
                (e.ns, e.ty, e.node.clone())
            };
            let clone = self.sink.clone_node(&node, false);
            let parent = self.current_handle();
            let appended = self.sink.append_child(&parent, &clone);
            let slot = self.stack.push(ns, ty, appended);
            let old = self.formatting.replace(
                i,
                ListEntry {
                    ns,
                    ty,
                    node: clone,
                    stack_index: slot,
                },
            );
            self.sink.unref_node(&old.node);
            i += 1;
        }
    }

    /// Pop list entries up to and including the most recent marker,
    /// releasing each.
    fn clear_active_formatting_to_marker(&mut self) {
        while let Some(entry) = self.formatting.pop() {
            let done = entry.is_marker();
            self.sink.unref_node(&entry.node);
            if done {
                break;
            }
        }
    }
    //§ END

    fn remove_from_parent(&mut self, node: &Handle) {
        if let Some(parent) = self.sink.get_parent(node, false) {
            let removed = self.sink.remove_child(&parent, node);
            self.sink.unref_node(&removed);
            self.sink.unref_node(&parent);
        }
    }

    /// The adoption agency algorithm.
    /// <https://html.spec.whatwg.org/multipage/#adoption-agency-algorithm>
    fn adoption_agency(&mut self, subject: Ty) {
        // Step 1-3: a matching current node with no list entry just pops.
        if self.stack.current_type() == subject {
            let node = self.current_handle();
            if self.formatting.position_by_node(&node).is_none() {
                self.pop_and_unref();
                return;
            }
        }

        for _ in 0..8 {
            // Step 5: the most recent matching entry after the last marker.
            let Some(fmt_idx) = self.formatting.last_entry_of_type_to_marker(subject) else {
                self.any_other_end_tag_in_body(subject);
                return;
            };
            let (fmt_node, fmt_stack_idx) = {
                let e = self.formatting.get(fmt_idx);
                (e.node.clone(), e.stack_index)
            };

            // Step 6: listed but not open.
            if fmt_stack_idx == 0 {
                self.sink
                    .parse_error(Borrowed("Formatting element not open"));
                let old = self.formatting.remove(fmt_idx);
                self.sink.unref_node(&old.node);
                return;
            }

            // Step 7.
            if !self.stack.index_in_scope(fmt_stack_idx) {
                self.sink
                    .parse_error(Borrowed("Formatting element not in scope"));
                return;
            }

            // Step 8.
            if self.stack.current_index() != fmt_stack_idx {
                self.sink
                    .parse_error(Borrowed("Formatting element not current node"));
            }

            // Step 9: the topmost special element above the formatting
            // element on the stack.
            let mut furthest = None;
            for i in (fmt_stack_idx + 1)..self.stack.len() {
                let ty = self.stack.get(i).ty;
                if is_special_element(ty) || is_scoping_element(ty) {
                    furthest = Some(i);
                    break;
                }
            }

            // Step 10: no furthest block; pop through the formatting element.
            let Some(furthest_idx) = furthest else {
                while self.stack.current_index() >= fmt_stack_idx {
                    self.pop_and_unref();
                }
                if let Some(idx) = self.formatting.position_by_node(&fmt_node) {
                    let old = self.formatting.remove(idx);
                    self.sink.unref_node(&old.node);
                }
                return;
            };

            let furthest_block = self.stack.get(furthest_idx).node.clone();

            // Step 11.
            let common_ancestor_idx = fmt_stack_idx - 1;

            // Step 12.
            let mut bookmark = Bookmark::Replace(fmt_node.clone());

            // Step 13: walk from the furthest block down to the formatting
            // element, cloning every intervening listed element.
            let mut node_index = furthest_idx;
            let mut last_node = furthest_block.clone();
            let mut inner = 0u32;
            loop {
                inner += 1;
                node_index -= 1;
                let (node_ns, node_ty, mut node) = {
                    let e = self.stack.get(node_index);
                    (e.ns, e.ty, e.node.clone())
                };

                // Step 13.4.
                if node == fmt_node {
                    break;
                }

                // Step 13.5: visited too often; drop it entirely.
                if inner > 3 {
                    if let Some(p) = self.formatting.position_by_node(&node) {
                        let old = self.formatting.remove(p);
                        self.sink.unref_node(&old.node);
                    }
                    let removed = self.remove_stack_entry(node_index);
                    self.sink.unref_node(&removed.node);
                    continue;
                }

                // Step 13.6: not in the list; drop from the stack.
                let Some(node_fmt_idx) = self.formatting.position_by_node(&node) else {
                    let removed = self.remove_stack_entry(node_index);
                    self.sink.unref_node(&removed.node);
                    continue;
                };

                // Step 13.7: replace the element with a clone on both the
                // stack and the list.
                let clone = self.sink.clone_node(&node, false);
                self.sink.ref_node(&clone);
                let old_node = self.stack.replace_node_at(node_index, clone.clone());
                self.sink.unref_node(&old_node);
                let old_entry = self.formatting.replace(
                    node_fmt_idx,
                    ListEntry {
                        ns: node_ns,
                        ty: node_ty,
                        node: clone.clone(),
                        stack_index: node_index,
                    },
                );
                self.sink.unref_node(&old_entry.node);
                node = clone;

                // Step 13.8.
                if last_node == furthest_block {
                    bookmark = Bookmark::InsertAfter(node.clone());
                }

                // Step 13.9.
                self.remove_from_parent(&last_node);
                let appended = self.sink.append_child(&node, &last_node);
                self.sink.unref_node(&appended);

                // Step 13.10.
                last_node = node;
            }

            // Step 14: hang the assembled chain off the common ancestor
            // (fostered if the ancestor is a table part).
            self.remove_from_parent(&last_node);
            let point = self.insertion_point_for(common_ancestor_idx);
            let appended = self.insert_at(point, &last_node);
            self.sink.unref_node(&appended);

            // Step 15: a fresh copy of the formatting element.
            let new_element = self.sink.clone_node(&fmt_node, false);

            // Step 16.
            self.sink.reparent_children(&furthest_block, &new_element);

            // Step 17.
            let appended = self.sink.append_child(&furthest_block, &new_element);

            // Step 19: the formatting element leaves the stack; the new
            // element goes in just above the furthest block. (The stack is
            // fixed before the list so the new entry gets a settled index.)
            if let Some(pos) = self.stack.position_of(&fmt_node) {
                let removed = self.remove_stack_entry(pos);
                self.sink.unref_node(&removed.node);
            }
            let fb_pos = self
                .stack
                .position_of(&furthest_block)
                .expect("furthest block missing from stack");
            let new_stack_idx = fb_pos + 1;
            self.insert_stack_entry(new_stack_idx, Namespace::Html, subject, appended);

            // Step 18: the new element replaces the old entry at the
            // bookmark.
            let new_entry = ListEntry {
                ns: Namespace::Html,
                ty: subject,
                node: new_element,
                stack_index: new_stack_idx,
            };
            match bookmark {
                Bookmark::Replace(old) => {
                    let idx = self
                        .formatting
                        .position_by_node(&old)
                        .expect("bookmark not in formatting list");
                    let old_entry = self.formatting.replace(idx, new_entry);
                    self.sink.unref_node(&old_entry.node);
                }
                Bookmark::InsertAfter(prev) => {
                    let idx = self
                        .formatting
                        .position_by_node(&prev)
                        .expect("bookmark not in formatting list")
                        + 1;
                    self.formatting.insert(idx, new_entry);
                    let old_idx = self
                        .formatting
                        .position_by_node(&fmt_node)
                        .expect("formatting element missing from list");
                    let old_entry = self.formatting.remove(old_idx);
                    self.sink.unref_node(&old_entry.node);
                }
            }
            // Step 20: loop.
        }
    }

    /// The "any other end tag" rules of the in-body mode.
    fn any_other_end_tag_in_body(&mut self, ty: Ty) -> ProcessResult {
        // Look back for a matching open element.
        let mut match_idx = None;
        for i in (1..self.stack.len()).rev() {
            let fty = self.stack.get(i).ty;
            if fty == ty {
                match_idx = Some(i);
                break;
            }
            if is_special_element(fty) || is_scoping_element(fty) {
                self.sink
                    .parse_error(Borrowed("Found special tag while closing generic tag"));
                return ProcessResult::Done;
            }
        }

        let Some(match_idx) = match_idx else {
            return self.unexpected(&ty);
        };

        self.close_implied_end_tags(Some(ty));
        if self.stack.current_index() != match_idx {
            self.unexpected(&ty);
        }
        loop {
            let idx = self.stack.current_index();
            self.pop_and_unref();
            if idx == match_idx {
                break;
            }
        }
        ProcessResult::Done
    }

    /// Signal an error for any element still open when the body ends.
    fn check_body_end(&mut self) {
        for i in 0..self.stack.len() {
            let ty = self.stack.get(i).ty;
            if !matches!(
                ty,
                Ty::Dd
                    | Ty::Dt
                    | Ty::Li
                    | Ty::Optgroup
                    | Ty::Option
                    | Ty::P
                    | Ty::Rp
                    | Ty::Rt
                    | Ty::Tbody
                    | Ty::Td
                    | Ty::Tfoot
                    | Ty::Th
                    | Ty::Thead
                    | Ty::Tr
                    | Ty::Body
                    | Ty::Html
            ) {
                let msg = if self.opts.exact_errors {
                    Cow::from(format!("Unexpected open tag {ty:?} at end of body"))
                } else {
                    Borrowed("Unexpected open tag at end of body")
                };
                self.sink.parse_error(msg);
                return;
            }
        }
    }

    // Check <input> tags for type=hidden.
    fn is_type_hidden(&self, tag: &Tag) -> bool {
        tag.attrs
            .iter()
            .find(|a| &*a.name == "type")
            .is_some_and(|a| a.value.eq_ignore_ascii_case("hidden"))
    }

    /// Process a token via the in-body rules with foster parenting enabled.
    fn foster_in_body(&mut self, token: Token) -> ProcessResult {
        self.foster_parenting = true;
        let result = self.step(InsertionMode::InBody, token);
        self.foster_parenting = false;
        result
    }

    //§ tree-construction
    fn enter_foreign(&mut self, mut tag: Tag, ns: Namespace) -> ProcessResult {
        match ns {
            Namespace::MathMl => adjust_mathml_attributes(&mut tag),
            Namespace::Svg => adjust_svg_attributes(&mut tag),
            _ => (),
        }
        adjust_foreign_attributes(&mut tag);
        tag.ns = ns;

        if tag.self_closing {
            self.insert_element_no_push(&tag);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element(&tag);
            self.mode = InsertionMode::InForeignContent;
            ProcessResult::Done
        }
    }

    fn foreign_start_tag(&mut self, mut tag: Tag) -> ProcessResult {
        let current_ns = self.stack.current_ns();
        match current_ns {
            Namespace::MathMl => adjust_mathml_attributes(&mut tag),
            Namespace::Svg => {
                adjust_svg_tag_name(&mut tag);
                adjust_svg_attributes(&mut tag);
            }
            _ => (),
        }
        adjust_foreign_attributes(&mut tag);
        tag.ns = current_ns;

        if tag.self_closing {
            self.insert_element_no_push(&tag);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element(&tag);
            ProcessResult::Done
        }
    }

    /// Pop every foreign frame and pick the insertion mode back up from the
    /// remaining HTML stack.
    fn exit_foreign_content(&mut self) {
        while self.stack.current_ns() != Namespace::Html {
            self.pop_and_unref();
        }
        self.mode = self.reset_insertion_mode();
    }
    //§ END
}

impl<Handle, Sink> TokenSink for TreeBuilder<Handle, Sink>
where
    Handle: Clone + PartialEq,
    Sink: TreeSink<Handle = Handle>,
{
    fn process_token(&mut self, token: tokenizer::Token) -> TokenSinkResult {
        // Do nothing until a document node has been supplied.
        if self.doc_handle.is_none() {
            return TokenSinkResult::Continue;
        }

        let ignore_lf = std::mem::take(&mut self.ignore_lf);

        // Handle DOCTYPE up front; convert everything else to the local
        // `Token` type.
        let token = match token {
            tokenizer::Token::Doctype(dt) => {
                if self.mode == InsertionMode::Initial {
                    let (err, quirk) = data::doctype_error_and_quirks(&dt, self.opts.iframe_srcdoc);
                    if err {
                        self.sink.parse_error(if self.opts.exact_errors {
                            Cow::from(format!("Bad DOCTYPE: {dt:?}"))
                        } else {
                            Borrowed("Bad DOCTYPE")
                        });
                    }
                    if !self.opts.drop_doctype {
                        let node = self.sink.create_doctype(&dt);
                        let doc = self.doc_handle();
                        let appended = self.sink.append_child(&doc, &node);
                        self.sink.unref_node(&appended);
                        self.sink.unref_node(&node);
                    }
                    self.set_quirks_mode(quirk);
                    self.mode = InsertionMode::BeforeHtml;
                } else {
                    self.sink.parse_error(if self.opts.exact_errors {
                        Cow::from(format!("DOCTYPE in insertion mode {:?}", self.mode))
                    } else {
                        Borrowed("DOCTYPE in body")
                    });
                }
                return TokenSinkResult::Continue;
            }

            tokenizer::Token::Tag(tag) => Token::Tag(tag),
            tokenizer::Token::Comment(text) => Token::Comment(text),
            tokenizer::Token::Eof => Token::Eof,

            tokenizer::Token::Characters(mut text) => {
                if ignore_lf && text.starts_with('\n') {
                    text.pop_front(1);
                }
                if text.is_empty() {
                    return TokenSinkResult::Continue;
                }
                Token::Characters(text)
            }
        };

        self.process_to_completion(token)
    }
}

impl<Handle, Sink> Drop for TreeBuilder<Handle, Sink>
where
    Handle: Clone + PartialEq,
    Sink: TreeSink<Handle = Handle>,
{
    fn drop(&mut self) {
        if let Some(head) = self.head_elem.take() {
            self.sink.unref_node(&head);
        }
        if let Some(form) = self.form_elem.take() {
            self.sink.unref_node(&form);
        }
        if let Some(collect) = self.collect.take() {
            self.sink.unref_node(&collect.node);
        }
        while let Some(entry) = self.stack.pop_any() {
            self.sink.unref_node(&entry.node);
        }
        while let Some(entry) = self.formatting.pop() {
            self.sink.unref_node(&entry.node);
        }
        if let Some(doc) = self.doc_handle.take() {
            self.sink.unref_node(&doc);
        }
    }
}
