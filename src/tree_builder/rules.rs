// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// The tree builder rules, as a single, enormous nested match expression.

use std::borrow::Cow::Borrowed;

use tendril::StrTendril;

use crate::interface::{Namespace, QuirksMode, TreeSink};
use crate::tokenizer::{EndTag, StartTag, Tag};
use crate::tree_builder::element_types::{
    is_scoping_element, is_special_element, type_from_name, ElementType as Ty,
};
use crate::tree_builder::foreign::is_breakout_tag;
use crate::tree_builder::types::InsertionMode::{self, *};
use crate::tree_builder::types::ProcessResult::{
    self, Done, DoneAckSelfClosing, Reprocess, ToPlaintext,
};
use crate::tree_builder::types::Token;
use crate::tree_builder::TreeBuilder;

fn any_not_whitespace(text: &StrTendril) -> bool {
    text.as_bytes()
        .iter()
        .any(|&b| !matches!(b, b'\t' | b'\n' | 0x0c | b' '))
}

fn is_heading(ty: Ty) -> bool {
    matches!(ty, Ty::H1 | Ty::H2 | Ty::H3 | Ty::H4 | Ty::H5 | Ty::H6)
}

fn table_context(ty: Ty) -> bool {
    matches!(ty, Ty::Table | Ty::Html)
}

fn table_body_context(ty: Ty) -> bool {
    matches!(ty, Ty::Tbody | Ty::Tfoot | Ty::Thead | Ty::Html)
}

fn table_row_context(ty: Ty) -> bool {
    matches!(ty, Ty::Tr | Ty::Html)
}

static HEADINGS: [Ty; 6] = [Ty::H1, Ty::H2, Ty::H3, Ty::H4, Ty::H5, Ty::H6];

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone + PartialEq,
    Sink: TreeSink<Handle = Handle>,
{
    /// Process an HTML content token in the given insertion mode.
    pub(crate) fn step(&mut self, mode: InsertionMode, token: Token) -> ProcessResult {
        self.debug_step(mode, &token);

        match mode {
            //§ the-initial-insertion-mode
            Initial => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, false) {
                    None => Done,
                    Some(rest) => {
                        if !self.opts.iframe_srcdoc {
                            self.unexpected(&rest);
                            self.set_quirks_mode(QuirksMode::Quirks);
                        }
                        Reprocess(BeforeHtml, Token::Characters(rest))
                    }
                },
                Token::Comment(text) => self.append_comment_to_doc(text),
                token => {
                    if !self.opts.iframe_srcdoc {
                        self.unexpected(&token);
                        self.set_quirks_mode(QuirksMode::Quirks);
                    }
                    Reprocess(BeforeHtml, token)
                }
            },

            //§ the-before-html-insertion-mode
            BeforeHtml => match token {
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Characters(text) => match self.split_whitespace_run(text, false) {
                    None => Done,
                    Some(rest) => {
                        self.create_root(vec![]);
                        Reprocess(BeforeHead, Token::Characters(rest))
                    }
                },
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => {
                            self.create_root(tag.attrs);
                            self.mode = BeforeHead;
                            Done
                        }
                        (EndTag, Ty::Head | Ty::Body | Ty::Html | Ty::Br) | (StartTag, _) => {
                            self.create_root(vec![]);
                            Reprocess(BeforeHead, Token::Tag(tag))
                        }
                        (EndTag, _) => self.unexpected(&tag),
                    }
                }
                Token::Eof => {
                    self.create_root(vec![]);
                    Reprocess(BeforeHead, Token::Eof)
                }
            },

            //§ the-before-head-insertion-mode
            BeforeHead => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, false) {
                    None => Done,
                    Some(rest) => self.before_head_anything_else(Token::Characters(rest)),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Head) => {
                            let head = self.insert_element(&tag);
                            self.sink.ref_node(&head);
                            self.head_elem = Some(head);
                            self.mode = InHead;
                            Done
                        }
                        (EndTag, Ty::Head | Ty::Body | Ty::Html | Ty::Br) | (StartTag, _) => {
                            self.before_head_anything_else(Token::Tag(tag))
                        }
                        (EndTag, _) => self.unexpected(&tag),
                    }
                }
                Token::Eof => self.before_head_anything_else(Token::Eof),
            },

            //§ parsing-main-inhead
            InHead => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.in_head_anything_else(Token::Characters(rest)),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (
                            StartTag,
                            Ty::Base | Ty::Basefont | Ty::Bgsound | Ty::Link | Ty::Meta,
                        ) => {
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Title) => self.parse_generic_rcdata(&tag, true),
                        (StartTag, Ty::Noframes | Ty::Style) => {
                            self.parse_generic_rcdata(&tag, false)
                        }
                        (StartTag, Ty::Noscript) => {
                            if self.opts.scripting_enabled {
                                self.parse_generic_rcdata(&tag, false)
                            } else {
                                self.insert_element(&tag);
                                self.mode = InHeadNoscript;
                                Done
                            }
                        }
                        (StartTag, Ty::Script) => self.parse_script(&tag),
                        (EndTag, Ty::Head) => {
                            self.pop_and_unref();
                            self.mode = AfterHead;
                            Done
                        }
                        (EndTag, Ty::Body | Ty::Html | Ty::Br) | (StartTag, _) => {
                            if tag.kind == StartTag && ty == Ty::Head {
                                self.unexpected(&tag)
                            } else {
                                self.in_head_anything_else(Token::Tag(tag))
                            }
                        }
                        (EndTag, _) => self.unexpected(&tag),
                    }
                }
                Token::Eof => self.in_head_anything_else(Token::Eof),
            },

            //§ parsing-main-inheadnoscript
            InHeadNoscript => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.in_head_noscript_anything_else(Token::Characters(rest)),
                },
                Token::Comment(_) => self.step(InHead, token),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (EndTag, Ty::Noscript) => {
                            self.pop_and_unref();
                            self.mode = InHead;
                            Done
                        }
                        (
                            StartTag,
                            Ty::Basefont | Ty::Bgsound | Ty::Link | Ty::Meta | Ty::Noframes
                            | Ty::Style,
                        ) => self.step(InHead, Token::Tag(tag)),
                        (EndTag, Ty::Br) => {
                            self.in_head_noscript_anything_else(Token::Tag(tag))
                        }
                        (StartTag, Ty::Head | Ty::Noscript) | (EndTag, _) => {
                            self.unexpected(&tag)
                        }
                        (StartTag, _) => self.in_head_noscript_anything_else(Token::Tag(tag)),
                    }
                }
                Token::Eof => self.in_head_noscript_anything_else(Token::Eof),
            },

            //§ the-after-head-insertion-mode
            AfterHead => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.after_head_anything_else(Token::Characters(rest)),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Body) => {
                            self.insert_element(&tag);
                            self.frameset_ok = false;
                            self.mode = InBody;
                            Done
                        }
                        (StartTag, Ty::Frameset) => {
                            self.insert_element(&tag);
                            self.mode = InFrameset;
                            Done
                        }
                        (
                            StartTag,
                            Ty::Base | Ty::Basefont | Ty::Bgsound | Ty::Link | Ty::Meta
                            | Ty::Noframes | Ty::Script | Ty::Style | Ty::Title,
                        ) => {
                            self.unexpected(&tag);
                            // Re-open the head for the stray head-content
                            // tag, and take it off the stack again after.
                            let head = self.head_elem.clone().expect("no head element");
                            self.sink.ref_node(&head);
                            self.stack.push(Namespace::Html, Ty::Head, head.clone());
                            let result = self.step(InHead, Token::Tag(tag));
                            if let Some(pos) = self.stack.position_of(&head) {
                                let entry = self.remove_stack_entry(pos);
                                self.sink.unref_node(&entry.node);
                            }
                            result
                        }
                        (EndTag, Ty::Body | Ty::Html | Ty::Br) | (StartTag, _) => {
                            if tag.kind == StartTag && ty == Ty::Head {
                                self.unexpected(&tag)
                            } else {
                                self.after_head_anything_else(Token::Tag(tag))
                            }
                        }
                        (EndTag, _) => self.unexpected(&tag),
                    }
                }
                Token::Eof => self.after_head_anything_else(Token::Eof),
            },

            //§ parsing-main-inbody
            InBody => match token {
                Token::Characters(text) => {
                    self.reconstruct_active_formatting_list();
                    if any_not_whitespace(&text) {
                        self.frameset_ok = false;
                    }
                    self.append_text(&text);
                    Done
                }
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => {
                    self.check_body_end();
                    Done
                }
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => {
                            self.unexpected(&tag);
                            let top = self.stack.get(0).node.clone();
                            self.sink.add_attributes(&top, &tag.attrs);
                            Done
                        }
                        (
                            StartTag,
                            Ty::Base | Ty::Basefont | Ty::Bgsound | Ty::Link | Ty::Meta
                            | Ty::Noframes | Ty::Script | Ty::Style | Ty::Title,
                        ) => self.step(InHead, Token::Tag(tag)),
                        (StartTag, Ty::Body) => {
                            self.unexpected(&tag);
                            if let Some(body) = self.body_handle() {
                                self.frameset_ok = false;
                                self.sink.add_attributes(&body, &tag.attrs);
                            }
                            Done
                        }
                        (StartTag, Ty::Frameset) => {
                            self.unexpected(&tag);
                            if !self.frameset_ok {
                                return Done;
                            }
                            let Some(body) = self.body_handle() else {
                                return Done;
                            };
                            self.remove_from_parent(&body);
                            while self.stack.len() > 1 {
                                self.pop_and_unref();
                            }
                            self.insert_element(&tag);
                            self.mode = InFrameset;
                            Done
                        }
                        (EndTag, Ty::Body) => {
                            if self.in_scope(Ty::Body) {
                                self.check_body_end();
                                self.mode = AfterBody;
                            } else {
                                self.sink
                                    .parse_error(Borrowed("</body> with no <body> in scope"));
                            }
                            Done
                        }
                        (EndTag, Ty::Html) => {
                            if self.in_scope(Ty::Body) {
                                self.check_body_end();
                                Reprocess(AfterBody, Token::Tag(tag))
                            } else {
                                self.sink
                                    .parse_error(Borrowed("</html> with no <body> in scope"));
                                Done
                            }
                        }
                        (
                            StartTag,
                            Ty::Address | Ty::Blockquote | Ty::Center | Ty::Dir | Ty::Div
                            | Ty::Dl | Ty::Fieldset | Ty::Menu | Ty::Ol | Ty::P | Ty::Ul,
                        ) => {
                            self.close_p_if_in_scope();
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::Pre | Ty::Listing) => {
                            self.close_p_if_in_scope();
                            self.insert_element(&tag);
                            self.ignore_lf = true;
                            self.frameset_ok = false;
                            Done
                        }
                        (StartTag, Ty::Form) => {
                            if self.form_elem.is_some() {
                                self.sink.parse_error(Borrowed("nested forms"));
                            } else {
                                self.close_p_if_in_scope();
                                let node = self.insert_element(&tag);
                                self.sink.ref_node(&node);
                                self.form_elem = Some(node);
                            }
                            Done
                        }
                        (StartTag, Ty::Li | Ty::Dd | Ty::Dt) => {
                            self.frameset_ok = false;
                            let list = ty == Ty::Li;
                            let mut to_close = None;
                            for i in (1..self.stack.len()).rev() {
                                let fty = self.stack.get(i).ty;
                                let can_close = if list {
                                    fty == Ty::Li
                                } else {
                                    matches!(fty, Ty::Dd | Ty::Dt)
                                };
                                if can_close {
                                    to_close = Some(fty);
                                    break;
                                }
                                if (is_special_element(fty) || is_scoping_element(fty))
                                    && !matches!(fty, Ty::Address | Ty::Div | Ty::P)
                                {
                                    break;
                                }
                            }
                            if let Some(close_ty) = to_close {
                                self.close_implied_end_tags(Some(close_ty));
                                self.expect_to_close(close_ty);
                            }
                            self.close_p_if_in_scope();
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::Plaintext) => {
                            self.close_p_if_in_scope();
                            self.insert_element(&tag);
                            ToPlaintext
                        }
                        (StartTag, Ty::H1 | Ty::H2 | Ty::H3 | Ty::H4 | Ty::H5 | Ty::H6) => {
                            self.close_p_if_in_scope();
                            if is_heading(self.stack.current_type()) {
                                self.sink.parse_error(Borrowed("nested heading tags"));
                                self.pop_and_unref();
                            }
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::A) => {
                            if let Some(idx) = self.formatting.last_entry_of_type_to_marker(Ty::A)
                            {
                                let node = self.formatting.get(idx).node.clone();
                                self.unexpected(&tag);
                                self.adoption_agency(Ty::A);
                                if let Some(i) = self.formatting.position_by_node(&node) {
                                    let old = self.formatting.remove(i);
                                    self.sink.unref_node(&old.node);
                                }
                                if let Some(i) = self.stack.position_of(&node) {
                                    let entry = self.remove_stack_entry(i);
                                    self.sink.unref_node(&entry.node);
                                }
                            }
                            self.reconstruct_active_formatting_list();
                            let node = self.insert_element(&tag);
                            self.add_formatting_entry(Ty::A, &node);
                            Done
                        }
                        (
                            StartTag,
                            Ty::B | Ty::Big | Ty::Em | Ty::Font | Ty::I | Ty::S | Ty::Small
                            | Ty::Strike | Ty::Strong | Ty::Tt | Ty::U,
                        ) => {
                            self.reconstruct_active_formatting_list();
                            let node = self.insert_element(&tag);
                            self.add_formatting_entry(ty, &node);
                            Done
                        }
                        (StartTag, Ty::Nobr) => {
                            self.reconstruct_active_formatting_list();
                            if self.in_scope(Ty::Nobr) {
                                self.sink.parse_error(Borrowed("Nested <nobr>"));
                                self.adoption_agency(Ty::Nobr);
                                self.reconstruct_active_formatting_list();
                            }
                            let node = self.insert_element(&tag);
                            self.add_formatting_entry(Ty::Nobr, &node);
                            Done
                        }
                        (
                            EndTag,
                            Ty::A | Ty::B | Ty::Big | Ty::Em | Ty::Font | Ty::I | Ty::Nobr
                            | Ty::S | Ty::Small | Ty::Strike | Ty::Strong | Ty::Tt | Ty::U,
                        ) => {
                            self.adoption_agency(ty);
                            Done
                        }
                        (StartTag, Ty::Applet | Ty::Marquee | Ty::Object) => {
                            self.reconstruct_active_formatting_list();
                            self.insert_element(&tag);
                            self.insert_marker_for_current();
                            self.frameset_ok = false;
                            Done
                        }
                        (EndTag, Ty::Applet | Ty::Marquee | Ty::Object) => {
                            if !self.in_scope(ty) {
                                self.unexpected(&tag)
                            } else {
                                self.close_implied_end_tags(None);
                                self.expect_to_close(ty);
                                self.clear_active_formatting_to_marker();
                                Done
                            }
                        }
                        (StartTag, Ty::Button) => {
                            if self.in_scope(Ty::Button) {
                                self.sink.parse_error(Borrowed("nested buttons"));
                                self.close_implied_end_tags(None);
                                self.expect_to_close(Ty::Button);
                                self.clear_active_formatting_to_marker();
                            }
                            self.reconstruct_active_formatting_list();
                            self.insert_element(&tag);
                            self.insert_marker_for_current();
                            self.frameset_ok = false;
                            Done
                        }
                        (EndTag, Ty::Button) => {
                            if self.in_scope(Ty::Button) {
                                self.close_implied_end_tags(None);
                                self.expect_to_close(Ty::Button);
                                self.clear_active_formatting_to_marker();
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (StartTag, Ty::Table) => {
                            if self.quirks_mode != QuirksMode::Quirks {
                                self.close_p_if_in_scope();
                            }
                            self.insert_element(&tag);
                            self.frameset_ok = false;
                            self.mode = InTable;
                            Done
                        }
                        (EndTag, Ty::Br) => {
                            self.unexpected(&tag);
                            let start = Tag {
                                kind: StartTag,
                                attrs: vec![],
                                ..tag
                            };
                            self.step(InBody, Token::Tag(start))
                        }
                        (StartTag, Ty::Area | Ty::Br | Ty::Embed | Ty::Img | Ty::Wbr) => {
                            self.reconstruct_active_formatting_list();
                            self.insert_element_no_push(&tag);
                            self.frameset_ok = false;
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Input) => {
                            let keep_frameset_ok = self.is_type_hidden(&tag);
                            self.reconstruct_active_formatting_list();
                            self.insert_element_no_push(&tag);
                            if !keep_frameset_ok {
                                self.frameset_ok = false;
                            }
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Param | Ty::Spacer) => {
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Hr) => {
                            self.close_p_if_in_scope();
                            self.insert_element_no_push(&tag);
                            self.frameset_ok = false;
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Image) => {
                            // <image> is a parse error; try it again as <img>.
                            self.unexpected(&tag);
                            let mut tag = tag;
                            tag.name = StrTendril::from_slice("img");
                            self.step(InBody, Token::Tag(tag))
                        }
                        (StartTag, Ty::Textarea) => {
                            self.ignore_lf = true;
                            self.frameset_ok = false;
                            self.parse_generic_rcdata(&tag, true)
                        }
                        (StartTag, Ty::Iframe) => {
                            self.frameset_ok = false;
                            self.parse_generic_rcdata(&tag, false)
                        }
                        (StartTag, Ty::Noembed) => self.parse_generic_rcdata(&tag, false),
                        (StartTag, Ty::Noscript) if self.opts.scripting_enabled => {
                            self.parse_generic_rcdata(&tag, false)
                        }
                        (StartTag, Ty::Select) => {
                            self.reconstruct_active_formatting_list();
                            self.insert_element(&tag);
                            self.frameset_ok = false;
                            // NB: mode == InBody but possibly self.mode !=
                            // mode, if we're processing "as in the rules for
                            // in body".
                            self.mode = match self.mode {
                                InTable | InCaption | InTableBody | InRow | InCell => {
                                    InSelectInTable
                                }
                                _ => InSelect,
                            };
                            Done
                        }
                        (StartTag, Ty::Optgroup | Ty::Option) => {
                            if self.stack.current_type() == Ty::Option {
                                self.pop_and_unref();
                            }
                            self.reconstruct_active_formatting_list();
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::Rp | Ty::Rt) => {
                            if self.in_scope(Ty::Ruby) {
                                self.close_implied_end_tags(None);
                                if self.stack.current_type() != Ty::Ruby {
                                    self.unexpected(&tag);
                                }
                            }
                            self.insert_element(&tag);
                            Done
                        }
                        (
                            StartTag,
                            Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Frame | Ty::Head
                            | Ty::Tbody | Ty::Td | Ty::Tfoot | Ty::Th | Ty::Thead | Ty::Tr,
                        ) => self.unexpected(&tag),
                        (StartTag, Ty::Unknown) if tag.name.eq_ignore_ascii_case("math") => {
                            self.enter_foreign(tag, Namespace::MathMl)
                        }
                        (StartTag, Ty::Unknown) if tag.name.eq_ignore_ascii_case("svg") => {
                            self.enter_foreign(tag, Namespace::Svg)
                        }
                        (StartTag, _) => {
                            self.reconstruct_active_formatting_list();
                            self.insert_element(&tag);
                            Done
                        }
                        (EndTag, Ty::P) => {
                            if !self.in_scope(Ty::P) {
                                self.sink.parse_error(Borrowed("No <p> tag to close"));
                                self.insert_phantom("p");
                            }
                            self.close_p_element();
                            Done
                        }
                        (EndTag, Ty::Li | Ty::Dd | Ty::Dt) => {
                            if self.in_scope(ty) {
                                self.close_implied_end_tags(Some(ty));
                                self.expect_to_close(ty);
                            } else {
                                self.sink.parse_error(Borrowed("No matching tag to close"));
                            }
                            Done
                        }
                        (
                            EndTag,
                            Ty::Address | Ty::Blockquote | Ty::Center | Ty::Dir | Ty::Div
                            | Ty::Dl | Ty::Fieldset | Ty::Listing | Ty::Menu | Ty::Ol | Ty::Pre
                            | Ty::Ul,
                        ) => {
                            if !self.in_scope(ty) {
                                self.unexpected(&tag)
                            } else {
                                self.close_implied_end_tags(None);
                                self.expect_to_close(ty);
                                Done
                            }
                        }
                        (EndTag, Ty::Form) => {
                            match self.form_elem.take() {
                                None => {
                                    self.sink.parse_error(Borrowed(
                                        "Null form element pointer on </form>",
                                    ));
                                }
                                Some(node) => {
                                    if !self.in_scope(Ty::Form) {
                                        self.sink.parse_error(Borrowed(
                                            "Form element not in scope on </form>",
                                        ));
                                    } else {
                                        self.close_implied_end_tags(None);
                                        if self.current_handle() != node {
                                            self.sink.parse_error(Borrowed(
                                                "Bad open element on </form>",
                                            ));
                                        }
                                        if let Some(i) = self.stack.position_of(&node) {
                                            let entry = self.remove_stack_entry(i);
                                            self.sink.unref_node(&entry.node);
                                        }
                                    }
                                    self.sink.unref_node(&node);
                                }
                            }
                            Done
                        }
                        (EndTag, Ty::H1 | Ty::H2 | Ty::H3 | Ty::H4 | Ty::H5 | Ty::H6) => {
                            if HEADINGS.iter().any(|&h| self.in_scope(h)) {
                                self.close_implied_end_tags(None);
                                if self.stack.current_type() != ty {
                                    self.sink
                                        .parse_error(Borrowed("Closing wrong heading tag"));
                                }
                                while !is_heading(self.pop_and_unref()) {}
                            } else {
                                self.sink.parse_error(Borrowed("No heading tag to close"));
                            }
                            Done
                        }
                        (EndTag, _) => self.any_other_end_tag_in_body(ty),
                    }
                }
            },

            //§ parsing-main-intable
            InTable => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => {
                        self.sink
                            .parse_error(Borrowed("Unexpected characters in table"));
                        self.foster_in_body(Token::Characters(rest))
                    }
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Caption) => {
                            self.clear_stack_back_to(table_context);
                            self.insert_element(&tag);
                            self.insert_marker_for_current();
                            self.mode = InCaption;
                            Done
                        }
                        (StartTag, Ty::Colgroup) => {
                            self.clear_stack_back_to(table_context);
                            self.insert_element(&tag);
                            self.mode = InColumnGroup;
                            Done
                        }
                        (StartTag, Ty::Col) => {
                            self.clear_stack_back_to(table_context);
                            self.insert_phantom("colgroup");
                            Reprocess(InColumnGroup, Token::Tag(tag))
                        }
                        (StartTag, Ty::Tbody | Ty::Tfoot | Ty::Thead) => {
                            self.clear_stack_back_to(table_context);
                            self.insert_element(&tag);
                            self.mode = InTableBody;
                            Done
                        }
                        (StartTag, Ty::Td | Ty::Th | Ty::Tr) => {
                            self.clear_stack_back_to(table_context);
                            self.insert_phantom("tbody");
                            Reprocess(InTableBody, Token::Tag(tag))
                        }
                        (StartTag, Ty::Table) => {
                            self.unexpected(&tag);
                            if self.in_table_scope(Ty::Table) {
                                self.pop_until(Ty::Table);
                                Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                            } else {
                                Done
                            }
                        }
                        (EndTag, Ty::Table) => {
                            if self.in_table_scope(Ty::Table) {
                                self.pop_until(Ty::Table);
                                self.mode = self.reset_insertion_mode();
                                Done
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (
                            EndTag,
                            Ty::Body | Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Html
                            | Ty::Tbody | Ty::Td | Ty::Tfoot | Ty::Th | Ty::Thead | Ty::Tr,
                        ) => self.unexpected(&tag),
                        (StartTag, Ty::Style | Ty::Script) => self.step(InHead, Token::Tag(tag)),
                        (StartTag, Ty::Input) if self.is_type_hidden(&tag) => {
                            self.unexpected(&tag);
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Form) => {
                            self.unexpected(&tag);
                            if self.form_elem.is_none() {
                                // Inserted but never on the stack; the form
                                // pointer keeps the creation reference.
                                let node = self.sink.create_element(&tag);
                                let point = self.appropriate_insertion_point();
                                let appended = self.insert_at(point, &node);
                                self.sink.unref_node(&appended);
                                self.form_elem = Some(node);
                            }
                            Done
                        }
                        (_, _) => {
                            self.unexpected(&tag);
                            self.foster_in_body(Token::Tag(tag))
                        }
                    }
                }
                Token::Eof => self.step(InBody, token),
            },

            //§ parsing-main-incaption
            InCaption => match token {
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (
                            StartTag,
                            Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Tbody | Ty::Td
                            | Ty::Tfoot | Ty::Th | Ty::Thead | Ty::Tr,
                        )
                        | (EndTag, Ty::Table | Ty::Caption) => {
                            if self.in_table_scope(Ty::Caption) {
                                self.close_implied_end_tags(None);
                                self.expect_to_close(Ty::Caption);
                                self.clear_active_formatting_to_marker();
                                if tag.kind == EndTag && ty == Ty::Caption {
                                    self.mode = InTable;
                                    Done
                                } else {
                                    Reprocess(InTable, Token::Tag(tag))
                                }
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (
                            EndTag,
                            Ty::Body | Ty::Col | Ty::Colgroup | Ty::Html | Ty::Tbody | Ty::Td
                            | Ty::Tfoot | Ty::Th | Ty::Thead | Ty::Tr,
                        ) => self.unexpected(&tag),
                        _ => self.step(InBody, Token::Tag(tag)),
                    }
                }
                token => self.step(InBody, token),
            },

            //§ parsing-main-incolgroup
            InColumnGroup => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.in_column_group_anything_else(Token::Characters(rest)),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Col) => {
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (EndTag, Ty::Colgroup) => {
                            if self.stack.current_type() == Ty::Colgroup {
                                self.pop_and_unref();
                                self.mode = InTable;
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (EndTag, Ty::Col) => self.unexpected(&tag),
                        _ => self.in_column_group_anything_else(Token::Tag(tag)),
                    }
                }
                Token::Eof => self.step(InBody, token),
            },

            //§ parsing-main-intbody
            InTableBody => match token {
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Tr) => {
                            self.clear_stack_back_to(table_body_context);
                            self.insert_element(&tag);
                            self.mode = InRow;
                            Done
                        }
                        (StartTag, Ty::Th | Ty::Td) => {
                            self.unexpected(&tag);
                            self.clear_stack_back_to(table_body_context);
                            self.insert_phantom("tr");
                            Reprocess(InRow, Token::Tag(tag))
                        }
                        (EndTag, Ty::Tbody | Ty::Tfoot | Ty::Thead) => {
                            if self.in_table_scope(ty) {
                                self.clear_stack_back_to(table_body_context);
                                self.pop_and_unref();
                                self.mode = InTable;
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (
                            StartTag,
                            Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Tbody | Ty::Tfoot
                            | Ty::Thead,
                        )
                        | (EndTag, Ty::Table) => {
                            if self.in_table_scope(Ty::Tbody)
                                || self.in_table_scope(Ty::Tfoot)
                                || self.in_table_scope(Ty::Thead)
                            {
                                self.clear_stack_back_to(table_body_context);
                                self.pop_and_unref();
                                Reprocess(InTable, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (
                            EndTag,
                            Ty::Body | Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Html | Ty::Td
                            | Ty::Th | Ty::Tr,
                        ) => self.unexpected(&tag),
                        _ => self.step(InTable, Token::Tag(tag)),
                    }
                }
                token => self.step(InTable, token),
            },

            //§ parsing-main-intr
            InRow => match token {
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Th | Ty::Td) => {
                            self.clear_stack_back_to(table_row_context);
                            self.insert_element(&tag);
                            self.mode = InCell;
                            self.insert_marker_for_current();
                            Done
                        }
                        (EndTag, Ty::Tr) => {
                            if self.in_table_scope(Ty::Tr) {
                                self.clear_stack_back_to(table_row_context);
                                self.pop_and_unref();
                                self.mode = InTableBody;
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (
                            StartTag,
                            Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Tbody | Ty::Tfoot
                            | Ty::Thead | Ty::Tr,
                        )
                        | (EndTag, Ty::Table) => {
                            if self.in_table_scope(Ty::Tr) {
                                self.clear_stack_back_to(table_row_context);
                                self.pop_and_unref();
                                Reprocess(InTableBody, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (EndTag, Ty::Tbody | Ty::Tfoot | Ty::Thead) => {
                            if self.in_table_scope(ty) {
                                if self.in_table_scope(Ty::Tr) {
                                    self.clear_stack_back_to(table_row_context);
                                    self.pop_and_unref();
                                    Reprocess(InTableBody, Token::Tag(tag))
                                } else {
                                    Done
                                }
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (
                            EndTag,
                            Ty::Body | Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Html | Ty::Td
                            | Ty::Th,
                        ) => self.unexpected(&tag),
                        _ => self.step(InTable, Token::Tag(tag)),
                    }
                }
                token => self.step(InTable, token),
            },

            //§ parsing-main-intd
            InCell => match token {
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (EndTag, Ty::Td | Ty::Th) => {
                            if self.in_table_scope(ty) {
                                self.close_implied_end_tags(None);
                                self.expect_to_close(ty);
                                self.clear_active_formatting_to_marker();
                                self.mode = InRow;
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (
                            StartTag,
                            Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Tbody | Ty::Td
                            | Ty::Tfoot | Ty::Th | Ty::Thead | Ty::Tr,
                        ) => {
                            if self.in_table_scope(Ty::Td) || self.in_table_scope(Ty::Th) {
                                self.close_the_cell();
                                Reprocess(InRow, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        (EndTag, Ty::Body | Ty::Caption | Ty::Col | Ty::Colgroup | Ty::Html) => {
                            self.unexpected(&tag)
                        }
                        (EndTag, Ty::Table | Ty::Tbody | Ty::Tfoot | Ty::Thead | Ty::Tr) => {
                            if self.in_table_scope(ty) {
                                self.close_the_cell();
                                Reprocess(InRow, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        }
                        _ => self.step(InBody, Token::Tag(tag)),
                    }
                }
                token => self.step(InBody, token),
            },

            //§ parsing-main-inselect
            InSelect => match token {
                Token::Characters(text) => {
                    self.append_text(&text);
                    Done
                }
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Option) => {
                            if self.stack.current_type() == Ty::Option {
                                self.pop_and_unref();
                            }
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::Optgroup) => {
                            if self.stack.current_type() == Ty::Option {
                                self.pop_and_unref();
                            }
                            if self.stack.current_type() == Ty::Optgroup {
                                self.pop_and_unref();
                            }
                            self.insert_element(&tag);
                            Done
                        }
                        (StartTag, Ty::Hr) => {
                            if self.stack.current_type() == Ty::Option {
                                self.pop_and_unref();
                            }
                            if self.stack.current_type() == Ty::Optgroup {
                                self.pop_and_unref();
                            }
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (EndTag, Ty::Optgroup) => {
                            if self.stack.current_type() == Ty::Option
                                && self.stack.prev_type() == Ty::Optgroup
                            {
                                self.pop_and_unref();
                            }
                            if self.stack.current_type() == Ty::Optgroup {
                                self.pop_and_unref();
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (EndTag, Ty::Option) => {
                            if self.stack.current_type() == Ty::Option {
                                self.pop_and_unref();
                            } else {
                                self.unexpected(&tag);
                            }
                            Done
                        }
                        (StartTag, Ty::Select) | (EndTag, Ty::Select) => {
                            let in_scope = self.in_scope(Ty::Select);
                            if !in_scope || tag.kind == StartTag {
                                self.unexpected(&tag);
                            }
                            if in_scope {
                                self.pop_until(Ty::Select);
                                self.mode = self.reset_insertion_mode();
                            }
                            Done
                        }
                        (StartTag, Ty::Input | Ty::Textarea) => {
                            self.unexpected(&tag);
                            if self.in_scope(Ty::Select) {
                                self.pop_until(Ty::Select);
                                Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                            } else {
                                Done
                            }
                        }
                        (StartTag, Ty::Script) => self.step(InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                }
                Token::Eof => self.step(InBody, token),
            },

            //§ parsing-main-inselectintable
            InSelectInTable => match token {
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (
                            StartTag,
                            Ty::Caption | Ty::Table | Ty::Tbody | Ty::Tfoot | Ty::Thead
                            | Ty::Tr | Ty::Td | Ty::Th,
                        ) => {
                            self.unexpected(&tag);
                            self.pop_until(Ty::Select);
                            Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                        }
                        (
                            EndTag,
                            Ty::Caption | Ty::Table | Ty::Tbody | Ty::Tfoot | Ty::Thead
                            | Ty::Tr | Ty::Td | Ty::Th,
                        ) => {
                            self.unexpected(&tag);
                            if self.in_table_scope(ty) {
                                self.pop_until(Ty::Select);
                                Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                            } else {
                                Done
                            }
                        }
                        _ => self.step(InSelect, Token::Tag(tag)),
                    }
                }
                token => self.step(InSelect, token),
            },

            //§ parsing-main-inforeign
            InForeignContent => match token {
                Token::Characters(text) => {
                    if any_not_whitespace(&text) {
                        self.frameset_ok = false;
                    }
                    self.append_text(&text);
                    Done
                }
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => match tag.kind {
                    StartTag => {
                        if is_breakout_tag(&tag) {
                            self.unexpected(&tag);
                            self.exit_foreign_content();
                            Reprocess(self.mode, Token::Tag(tag))
                        } else {
                            self.foreign_start_tag(tag)
                        }
                    }
                    EndTag => {
                        let ty = type_from_name(&tag.name);
                        if ty != Ty::Unknown {
                            // An HTML end tag closes the foreign island.
                            self.unexpected(&tag);
                            self.exit_foreign_content();
                            Reprocess(self.mode, Token::Tag(tag))
                        } else {
                            if self.stack.current_ns() != Namespace::Html {
                                self.pop_and_unref();
                            }
                            if self.stack.current_ns() == Namespace::Html {
                                self.mode = self.reset_insertion_mode();
                            }
                            Done
                        }
                    }
                },
                Token::Eof => {
                    self.exit_foreign_content();
                    Reprocess(self.mode, Token::Eof)
                }
            },

            //§ parsing-main-afterbody
            AfterBody => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => {
                        self.unexpected(&rest);
                        Reprocess(InBody, Token::Characters(rest))
                    }
                },
                Token::Comment(text) => self.append_comment_to_html(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (EndTag, Ty::Html) => {
                            self.mode = AfterAfterBody;
                            Done
                        }
                        _ => {
                            self.unexpected(&tag);
                            Reprocess(InBody, Token::Tag(tag))
                        }
                    }
                }
                Token::Eof => Done,
            },

            //§ parsing-main-inframeset
            InFrameset => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.unexpected(&rest),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Frameset) => {
                            self.insert_element(&tag);
                            Done
                        }
                        (EndTag, Ty::Frameset) => {
                            if self.stack.len() == 1 {
                                self.unexpected(&tag);
                            } else {
                                self.pop_and_unref();
                                if self.stack.current_type() != Ty::Frameset {
                                    self.mode = AfterFrameset;
                                }
                            }
                            Done
                        }
                        (StartTag, Ty::Frame) => {
                            self.insert_element_no_push(&tag);
                            DoneAckSelfClosing
                        }
                        (StartTag, Ty::Noframes) => self.step(InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                }
                Token::Eof => {
                    if self.stack.len() != 1 {
                        self.unexpected(&token);
                    }
                    Done
                }
            },

            //§ parsing-main-afterframeset
            AfterFrameset => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.unexpected(&rest),
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (EndTag, Ty::Html) => {
                            self.mode = AfterAfterFrameset;
                            Done
                        }
                        (StartTag, Ty::Noframes) => self.step(InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                }
                Token::Eof => Done,
            },

            //§ the-after-after-body-insertion-mode
            AfterAfterBody => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => {
                        self.unexpected(&rest);
                        Reprocess(InBody, Token::Characters(rest))
                    }
                },
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        _ => {
                            self.unexpected(&tag);
                            Reprocess(InBody, Token::Tag(tag))
                        }
                    }
                }
                Token::Eof => Done,
            },

            //§ the-after-after-frameset-insertion-mode
            AfterAfterFrameset => match token {
                Token::Characters(text) => match self.split_whitespace_run(text, true) {
                    None => Done,
                    Some(rest) => self.unexpected(&rest),
                },
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Html) => self.step(InBody, Token::Tag(tag)),
                        (StartTag, Ty::Noframes) => self.step(InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                }
                Token::Eof => Done,
            },

            //§ parsing-generic-rcdata
            GenericRcdata => match token {
                Token::Characters(text) => {
                    self.collect_text(&text);
                    Done
                }
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match tag.kind {
                        EndTag => {
                            if self.collect_type() != ty {
                                self.unexpected(&tag);
                            }
                            self.finish_collection();
                            Done
                        }
                        // The tokeniser does not emit start tags inside
                        // (R)CDATA.
                        StartTag => self.unexpected(&tag),
                    }
                }
                Token::Comment(_) => self.unexpected(&token),
                Token::Eof => {
                    self.unexpected(&token);
                    self.finish_collection();
                    Reprocess(self.mode, Token::Eof)
                }
            },

            //§ script-collect-characters
            ScriptCollectCharacters => match token {
                Token::Characters(text) => {
                    self.collect_text(&text);
                    Done
                }
                Token::Tag(tag) => {
                    let ty = type_from_name(&tag.name);
                    match (tag.kind, ty) {
                        (StartTag, Ty::Script) => {
                            self.collect_nest();
                            Done
                        }
                        (EndTag, Ty::Script) => {
                            if self.collect_unnest() == 0 {
                                self.finish_collection();
                            }
                            Done
                        }
                        _ => {
                            self.unexpected(&tag);
                            self.finish_collection();
                            Reprocess(self.mode, Token::Tag(tag))
                        }
                    }
                }
                Token::Comment(_) => self.unexpected(&token),
                Token::Eof => {
                    self.unexpected(&token);
                    self.finish_collection();
                    Reprocess(self.mode, Token::Eof)
                }
            },
        }
    }

    fn before_head_anything_else(&mut self, token: Token) -> ProcessResult {
        let head = self.insert_phantom("head");
        self.sink.ref_node(&head);
        self.head_elem = Some(head);
        Reprocess(InHead, token)
    }

    fn in_head_anything_else(&mut self, token: Token) -> ProcessResult {
        self.pop_and_unref();
        Reprocess(AfterHead, token)
    }

    fn in_head_noscript_anything_else(&mut self, token: Token) -> ProcessResult {
        self.unexpected(&token);
        self.pop_and_unref();
        Reprocess(InHead, token)
    }

    fn after_head_anything_else(&mut self, token: Token) -> ProcessResult {
        self.insert_phantom("body");
        Reprocess(InBody, token)
    }

    fn in_column_group_anything_else(&mut self, token: Token) -> ProcessResult {
        if self.stack.current_type() == Ty::Colgroup {
            self.pop_and_unref();
            Reprocess(InTable, token)
        } else {
            self.unexpected(&token)
        }
    }
}
