// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Foreign-content (MathML and SVG) tag and attribute adjustment.

use tendril::StrTendril;

use crate::interface::Namespace;
use crate::tokenizer::Tag;

// HTML-only start tags that break out of foreign content.
static BREAKOUT: &[&str] = &[
    "b",
    "big",
    "blockquote",
    "body",
    "br",
    "center",
    "code",
    "dd",
    "div",
    "dl",
    "dt",
    "em",
    "embed",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "hr",
    "i",
    "img",
    "li",
    "listing",
    "menu",
    "meta",
    "nobr",
    "ol",
    "p",
    "pre",
    "ruby",
    "s",
    "small",
    "span",
    "strong",
    "strike",
    "sub",
    "sup",
    "table",
    "tt",
    "u",
    "ul",
    "var",
];

/// Does this start tag force a return to HTML content?
/// `<font>` only breaks out when it carries a color, face or size attribute.
pub(crate) fn is_breakout_tag(tag: &Tag) -> bool {
    let name: &str = &tag.name;
    if BREAKOUT.iter().any(|&b| b == name) {
        return true;
    }
    name == "font"
        && tag
            .attrs
            .iter()
            .any(|a| matches!(&*a.name, "color" | "face" | "size"))
}

fn svg_tag_case(name: &str) -> Option<&'static str> {
    Some(match name {
        "altglyph" => "altGlyph",
        "altglyphdef" => "altGlyphDef",
        "altglyphitem" => "altGlyphItem",
        "animatecolor" => "animateColor",
        "animatemotion" => "animateMotion",
        "animatetransform" => "animateTransform",
        "clippath" => "clipPath",
        "feblend" => "feBlend",
        "fecolormatrix" => "feColorMatrix",
        "fecomponenttransfer" => "feComponentTransfer",
        "fecomposite" => "feComposite",
        "feconvolvematrix" => "feConvolveMatrix",
        "fediffuselighting" => "feDiffuseLighting",
        "fedisplacementmap" => "feDisplacementMap",
        "fedistantlight" => "feDistantLight",
        "fedropshadow" => "feDropShadow",
        "feflood" => "feFlood",
        "fefunca" => "feFuncA",
        "fefuncb" => "feFuncB",
        "fefuncg" => "feFuncG",
        "fefuncr" => "feFuncR",
        "fegaussianblur" => "feGaussianBlur",
        "feimage" => "feImage",
        "femerge" => "feMerge",
        "femergenode" => "feMergeNode",
        "femorphology" => "feMorphology",
        "feoffset" => "feOffset",
        "fepointlight" => "fePointLight",
        "fespecularlighting" => "feSpecularLighting",
        "fespotlight" => "feSpotLight",
        "fetile" => "feTile",
        "feturbulence" => "feTurbulence",
        "foreignobject" => "foreignObject",
        "glyphref" => "glyphRef",
        "lineargradient" => "linearGradient",
        "radialgradient" => "radialGradient",
        "textpath" => "textPath",
        _ => return None,
    })
}

fn svg_attr_case(name: &str) -> Option<&'static str> {
    Some(match name {
        "attributename" => "attributeName",
        "attributetype" => "attributeType",
        "basefrequency" => "baseFrequency",
        "baseprofile" => "baseProfile",
        "calcmode" => "calcMode",
        "clippathunits" => "clipPathUnits",
        "diffuseconstant" => "diffuseConstant",
        "edgemode" => "edgeMode",
        "filterunits" => "filterUnits",
        "glyphref" => "glyphRef",
        "gradienttransform" => "gradientTransform",
        "gradientunits" => "gradientUnits",
        "kernelmatrix" => "kernelMatrix",
        "kernelunitlength" => "kernelUnitLength",
        "keypoints" => "keyPoints",
        "keysplines" => "keySplines",
        "keytimes" => "keyTimes",
        "lengthadjust" => "lengthAdjust",
        "limitingconeangle" => "limitingConeAngle",
        "markerheight" => "markerHeight",
        "markerunits" => "markerUnits",
        "markerwidth" => "markerWidth",
        "maskcontentunits" => "maskContentUnits",
        "maskunits" => "maskUnits",
        "numoctaves" => "numOctaves",
        "pathlength" => "pathLength",
        "patterncontentunits" => "patternContentUnits",
        "patterntransform" => "patternTransform",
        "patternunits" => "patternUnits",
        "pointsatx" => "pointsAtX",
        "pointsaty" => "pointsAtY",
        "pointsatz" => "pointsAtZ",
        "preservealpha" => "preserveAlpha",
        "preserveaspectratio" => "preserveAspectRatio",
        "primitiveunits" => "primitiveUnits",
        "refx" => "refX",
        "refy" => "refY",
        "repeatcount" => "repeatCount",
        "repeatdur" => "repeatDur",
        "requiredextensions" => "requiredExtensions",
        "requiredfeatures" => "requiredFeatures",
        "specularconstant" => "specularConstant",
        "specularexponent" => "specularExponent",
        "spreadmethod" => "spreadMethod",
        "startoffset" => "startOffset",
        "stddeviation" => "stdDeviation",
        "stitchtiles" => "stitchTiles",
        "surfacescale" => "surfaceScale",
        "systemlanguage" => "systemLanguage",
        "tablevalues" => "tableValues",
        "targetx" => "targetX",
        "targety" => "targetY",
        "textlength" => "textLength",
        "viewbox" => "viewBox",
        "viewtarget" => "viewTarget",
        "xchannelselector" => "xChannelSelector",
        "ychannelselector" => "yChannelSelector",
        "zoomandpan" => "zoomAndPan",
        _ => return None,
    })
}

/// Fix up the case of mixed-case SVG element names.
pub(crate) fn adjust_svg_tag_name(tag: &mut Tag) {
    if let Some(fixed) = svg_tag_case(&tag.name) {
        tag.name = StrTendril::from_slice(fixed);
    }
}

/// Fix up the case of mixed-case SVG attribute names.
pub(crate) fn adjust_svg_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        if let Some(fixed) = svg_attr_case(&attr.name) {
            attr.name = StrTendril::from_slice(fixed);
        }
    }
}

/// MathML has a single mixed-case attribute.
pub(crate) fn adjust_mathml_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        if &*attr.name == "definitionurl" {
            attr.name = StrTendril::from_slice("definitionURL");
        }
    }
}

/// Move `xlink:`, `xml:` and `xmlns`-family attributes into their proper
/// namespaces, stripping the recognised prefix from the name.
pub(crate) fn adjust_foreign_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        let name: &str = &attr.name;
        if let Some(suffix) = name.strip_prefix("xlink:") {
            if matches!(
                suffix,
                "actuate" | "arcrole" | "href" | "role" | "show" | "title" | "type"
            ) {
                attr.ns = Namespace::XLink;
                attr.name = StrTendril::from_slice(suffix);
            }
        } else if let Some(suffix) = name.strip_prefix("xml:") {
            if matches!(suffix, "base" | "lang" | "space") {
                attr.ns = Namespace::Xml;
                attr.name = StrTendril::from_slice(suffix);
            }
        } else if name == "xmlns" {
            attr.ns = Namespace::Xmlns;
        } else if name == "xmlns:xlink" {
            attr.ns = Namespace::Xmlns;
            attr.name = StrTendril::from_slice("xlink");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TagKind;

    fn tag_with_attrs(name: &str, attrs: &[(&str, &str)]) -> Tag {
        Tag {
            kind: TagKind::StartTag,
            ns: Namespace::Html,
            name: name.into(),
            self_closing: false,
            attrs: attrs
                .iter()
                .map(|&(n, v)| crate::interface::Attribute {
                    ns: Namespace::None,
                    name: n.into(),
                    value: v.into(),
                })
                .collect(),
        }
    }

    #[test]
    fn svg_case_fixups() {
        let mut tag = tag_with_attrs("foreignobject", &[("viewbox", "0 0 1 1")]);
        adjust_svg_tag_name(&mut tag);
        adjust_svg_attributes(&mut tag);
        assert_eq!(&*tag.name, "foreignObject");
        assert_eq!(&*tag.attrs[0].name, "viewBox");
    }

    #[test]
    fn xlink_href_is_renamespaced() {
        let mut tag = tag_with_attrs("a", &[("xlink:href", "#x"), ("xlink:bogus", "y")]);
        adjust_foreign_attributes(&mut tag);
        assert_eq!(tag.attrs[0].ns, Namespace::XLink);
        assert_eq!(&*tag.attrs[0].name, "href");
        // Unrecognised suffixes keep their name and namespace.
        assert_eq!(tag.attrs[1].ns, Namespace::None);
        assert_eq!(&*tag.attrs[1].name, "xlink:bogus");
    }

    #[test]
    fn xmlns_family() {
        let mut tag = tag_with_attrs("svg", &[("xmlns", "u"), ("xmlns:xlink", "v")]);
        adjust_foreign_attributes(&mut tag);
        assert_eq!(tag.attrs[0].ns, Namespace::Xmlns);
        assert_eq!(&*tag.attrs[0].name, "xmlns");
        assert_eq!(tag.attrs[1].ns, Namespace::Xmlns);
        assert_eq!(&*tag.attrs[1].name, "xlink");
    }

    #[test]
    fn font_breaks_out_only_with_html_attributes() {
        assert!(!is_breakout_tag(&tag_with_attrs("font", &[])));
        assert!(is_breakout_tag(&tag_with_attrs("font", &[("size", "3")])));
        assert!(is_breakout_tag(&tag_with_attrs("div", &[])));
        assert!(!is_breakout_tag(&tag_with_attrs("circle", &[])));
    }

    #[test]
    fn mathml_definitionurl() {
        let mut tag = tag_with_attrs("math", &[("definitionurl", "u")]);
        adjust_mathml_attributes(&mut tag);
        assert_eq!(&*tag.attrs[0].name, "definitionURL");
    }
}
