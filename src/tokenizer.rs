// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The interface to the upstream tokeniser.
//!
//! This crate does not tokenise. A tokeniser delivers [`Token`]s to a
//! [`TokenSink`] (the tree builder implements one) and reconfigures its
//! content model according to the returned [`TokenSinkResult`]. Token
//! payloads are owned tendrils: the tokeniser materialises text before
//! delivery, so nothing here aliases the raw input buffer.

use tendril::StrTendril;

use crate::interface::{Attribute, Namespace};

pub use self::TagKind::{EndTag, StartTag};

/// A `DOCTYPE` token.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

/// A tag token.
///
/// The tokeniser always delivers tags in `Namespace::Html`; the tree builder
/// rewrites `ns` (and attribute namespaces) when inserting foreign content.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub ns: Namespace,
    pub name: StrTendril,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

#[derive(PartialEq, Eq, Debug)]
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Comment(StrTendril),
    Characters(StrTendril),
    Eof,
}

/// The non-PCDATA content models the builder can switch the tokeniser into.
/// CDATA is the raw-text model used for `<style>`, `<iframe>` and friends.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum RawKind {
    Rcdata,
    Cdata,
    ScriptData,
}

/// Instructions returned to the tokeniser after each token. `Continue`
/// leaves the content model at PCDATA.
#[derive(PartialEq, Eq, Debug)]
#[must_use]
pub enum TokenSinkResult {
    Continue,
    RawData(RawKind),
    Plaintext,
}

/// Types which can receive tokens from the tokeniser.
pub trait TokenSink {
    /// Process a token.
    fn process_token(&mut self, token: Token) -> TokenSinkResult;

    /// Signal that tokenisation reached the end of the input. Note that an
    /// explicit [`Token::Eof`] still drives the end-of-file handling of the
    /// tree construction stage; this is only a detach notification.
    fn end(&mut self) {}
}
