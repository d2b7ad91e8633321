// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Element classification.
//!
//! Element names the builder cares about map to a closed enumeration. The
//! declaration order is load-bearing: the four classification predicates are
//! range tests over the derived ordering, so each category occupies one
//! contiguous block. Names outside the enumeration classify as `Unknown`,
//! which sits in the phrasing block.

/// The element types the tree builder distinguishes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ElementType {
    // Special elements: Address through Wbr.
    Address,
    Area,
    Base,
    Basefont,
    Bgsound,
    Blockquote,
    Body,
    Br,
    Center,
    Col,
    Colgroup,
    Dd,
    Dir,
    Div,
    Dl,
    Dt,
    Embed,
    Fieldset,
    Form,
    Frame,
    Frameset,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Head,
    Hr,
    Iframe,
    Image,
    Img,
    Input,
    Isindex,
    Li,
    Link,
    Listing,
    Menu,
    Meta,
    Noembed,
    Noframes,
    Noscript,
    Ol,
    Optgroup,
    Option,
    P,
    Param,
    Plaintext,
    Pre,
    Script,
    Select,
    Spacer,
    Style,
    Tbody,
    Textarea,
    Tfoot,
    Thead,
    Title,
    Tr,
    Ul,
    Wbr,
    // Scoping elements: Applet through Th.
    Applet,
    Button,
    Caption,
    Html,
    Marquee,
    Object,
    Table,
    Td,
    Th,
    // Formatting elements: A through U.
    A,
    B,
    Big,
    Em,
    Font,
    I,
    Nobr,
    S,
    Small,
    Strike,
    Strong,
    Tt,
    U,
    // Phrasing elements: everything above U.
    Rp,
    Rt,
    Ruby,
    Unknown,
}

static NAME_TYPE_MAP: &[(&str, ElementType)] = &[
    ("address", ElementType::Address),
    ("area", ElementType::Area),
    ("base", ElementType::Base),
    ("basefont", ElementType::Basefont),
    ("bgsound", ElementType::Bgsound),
    ("blockquote", ElementType::Blockquote),
    ("body", ElementType::Body),
    ("br", ElementType::Br),
    ("center", ElementType::Center),
    ("col", ElementType::Col),
    ("colgroup", ElementType::Colgroup),
    ("dd", ElementType::Dd),
    ("dir", ElementType::Dir),
    ("div", ElementType::Div),
    ("dl", ElementType::Dl),
    ("dt", ElementType::Dt),
    ("embed", ElementType::Embed),
    ("fieldset", ElementType::Fieldset),
    ("form", ElementType::Form),
    ("frame", ElementType::Frame),
    ("frameset", ElementType::Frameset),
    ("h1", ElementType::H1),
    ("h2", ElementType::H2),
    ("h3", ElementType::H3),
    ("h4", ElementType::H4),
    ("h5", ElementType::H5),
    ("h6", ElementType::H6),
    ("head", ElementType::Head),
    ("hr", ElementType::Hr),
    ("iframe", ElementType::Iframe),
    ("image", ElementType::Image),
    ("img", ElementType::Img),
    ("input", ElementType::Input),
    ("isindex", ElementType::Isindex),
    ("li", ElementType::Li),
    ("link", ElementType::Link),
    ("listing", ElementType::Listing),
    ("menu", ElementType::Menu),
    ("meta", ElementType::Meta),
    ("noembed", ElementType::Noembed),
    ("noframes", ElementType::Noframes),
    ("noscript", ElementType::Noscript),
    ("ol", ElementType::Ol),
    ("optgroup", ElementType::Optgroup),
    ("option", ElementType::Option),
    ("p", ElementType::P),
    ("param", ElementType::Param),
    ("plaintext", ElementType::Plaintext),
    ("pre", ElementType::Pre),
    ("script", ElementType::Script),
    ("select", ElementType::Select),
    ("spacer", ElementType::Spacer),
    ("style", ElementType::Style),
    ("tbody", ElementType::Tbody),
    ("textarea", ElementType::Textarea),
    ("tfoot", ElementType::Tfoot),
    ("thead", ElementType::Thead),
    ("title", ElementType::Title),
    ("tr", ElementType::Tr),
    ("ul", ElementType::Ul),
    ("wbr", ElementType::Wbr),
    ("applet", ElementType::Applet),
    ("button", ElementType::Button),
    ("caption", ElementType::Caption),
    ("html", ElementType::Html),
    ("marquee", ElementType::Marquee),
    ("object", ElementType::Object),
    ("table", ElementType::Table),
    ("td", ElementType::Td),
    ("th", ElementType::Th),
    ("a", ElementType::A),
    ("b", ElementType::B),
    ("big", ElementType::Big),
    ("em", ElementType::Em),
    ("font", ElementType::Font),
    ("i", ElementType::I),
    ("nobr", ElementType::Nobr),
    ("s", ElementType::S),
    ("small", ElementType::Small),
    ("strike", ElementType::Strike),
    ("strong", ElementType::Strong),
    ("tt", ElementType::Tt),
    ("u", ElementType::U),
    ("rp", ElementType::Rp),
    ("rt", ElementType::Rt),
    ("ruby", ElementType::Ruby),
];

/// Convert an element name into an element type. Comparison is
/// ASCII case-insensitive.
pub fn type_from_name(name: &str) -> ElementType {
    for &(n, ty) in NAME_TYPE_MAP {
        if name.eq_ignore_ascii_case(n) {
            return ty;
        }
    }
    ElementType::Unknown
}

/// Is this a special element?
#[inline]
pub fn is_special_element(ty: ElementType) -> bool {
    ty <= ElementType::Wbr
}

/// Is this a scoping element?
#[inline]
pub fn is_scoping_element(ty: ElementType) -> bool {
    ty >= ElementType::Applet && ty <= ElementType::Th
}

/// Is this a formatting element?
#[inline]
pub fn is_formatting_element(ty: ElementType) -> bool {
    ty >= ElementType::A && ty <= ElementType::U
}

/// Is this a phrasing element?
#[inline]
pub fn is_phrasing_element(ty: ElementType) -> bool {
    ty > ElementType::U
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_name() {
        assert_eq!(type_from_name("p"), ElementType::P);
        assert_eq!(type_from_name("TABLE"), ElementType::Table);
        assert_eq!(type_from_name("tExTaReA"), ElementType::Textarea);
        assert_eq!(type_from_name("marquee"), ElementType::Marquee);
        assert_eq!(type_from_name("bogus"), ElementType::Unknown);
        assert_eq!(type_from_name(""), ElementType::Unknown);
    }

    #[test]
    fn predicate_ranges_are_disjoint() {
        for &(_, ty) in NAME_TYPE_MAP {
            let classes = [
                is_special_element(ty),
                is_scoping_element(ty),
                is_formatting_element(ty),
                is_phrasing_element(ty),
            ];
            assert_eq!(
                classes.iter().filter(|&&c| c).count(),
                1,
                "{ty:?} must be in exactly one class"
            );
        }
    }

    #[test]
    fn category_membership() {
        assert!(is_special_element(ElementType::Address));
        assert!(is_special_element(ElementType::Wbr));
        assert!(is_special_element(ElementType::P));
        assert!(is_scoping_element(ElementType::Html));
        assert!(is_scoping_element(ElementType::Table));
        assert!(is_scoping_element(ElementType::Td));
        assert!(is_formatting_element(ElementType::A));
        assert!(is_formatting_element(ElementType::U));
        assert!(is_formatting_element(ElementType::Tt));
        assert!(is_phrasing_element(ElementType::Rt));
        assert!(is_phrasing_element(ElementType::Unknown));
        assert!(!is_special_element(ElementType::Applet));
        assert!(!is_scoping_element(ElementType::A));
    }
}
