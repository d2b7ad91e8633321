// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An HTML5 tree construction engine.
//!
//! This crate implements the tree-construction half of an HTML5 parser: it
//! consumes the token stream produced by a tokeniser and drives a pluggable
//! document builder (a [`TreeSink`]) through the insertion-mode state machine
//! of the HTML parsing algorithm, including the error-recovery machinery
//! (foster parenting, the adoption agency, implied end tags).
//!
//! Tokenisation is out of scope: a tokeniser feeds tokens into the
//! [`TreeBuilder`] through its [`TokenSink`] implementation, and receives
//! content-model reconfiguration requests (RCDATA, CDATA, PLAINTEXT, script
//! data) in the returned [`TokenSinkResult`].
//!
//! The concrete DOM is equally out of scope. Node handles are opaque to the
//! builder and reference-counted through the sink's `ref_node`/`unref_node`
//! calls; the builder only routes them.

pub use tendril;
pub use tendril::StrTendril;

pub mod interface;
pub mod tokenizer;
pub mod tree_builder;

pub use crate::interface::{Attribute, Namespace, QuirksMode, TreeSink};
pub use crate::tokenizer::{Doctype, RawKind, Tag, TagKind, Token, TokenSink, TokenSinkResult};
pub use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};
