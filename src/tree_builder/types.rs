// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types used within the tree builder code. Not exported to users.

use tendril::StrTendril;

use crate::tokenizer::{RawKind, Tag};
use crate::tree_builder::element_types::ElementType;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    InTable,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InForeignContent,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
    GenericRcdata,
    ScriptCollectCharacters,
}

/// A subset of `tokenizer::Token`. DOCTYPE tokens are handled at the
/// beginning of `process_token` and never reach a mode handler.
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) enum Token {
    Tag(Tag),
    Comment(StrTendril),
    Characters(StrTendril),
    Eof,
}

/// What a mode handler asks the dispatcher to do next.
pub(crate) enum ProcessResult {
    Done,
    DoneAckSelfClosing,
    Reprocess(InsertionMode, Token),
    ToPlaintext,
    ToRawData(RawKind),
}

/// Where the next node goes: under a parent, or (foster parenting) into a
/// table's parent just before the table. `BeforeSibling.parent` carries one
/// sink reference, released once the insertion is made.
pub(crate) enum InsertionPoint<Handle> {
    LastChild(Handle),
    BeforeSibling { parent: Handle, sibling: Handle },
}

/// Character collection for generic (R)CDATA and script data: the pending
/// element, the text gathered so far, and the mode to restore afterwards.
pub(crate) struct CollectState<Handle> {
    pub mode: InsertionMode,
    pub ty: ElementType,
    pub node: Handle,
    pub text: StrTendril,
    /// Script collection tolerates nested script tags; generic (R)CDATA
    /// never sees nesting and leaves this at 1.
    pub depth: u32,
}
