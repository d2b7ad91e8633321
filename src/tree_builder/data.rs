// Copyright 2026 The trellis Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! DOCTYPE classification: which doctypes are errors, and which quirks mode
//! they select.

use tendril::StrTendril;

use crate::interface::QuirksMode;
use crate::tokenizer::Doctype;

// Public identifiers that select full quirks mode when matched exactly.
static QUIRKY_PUBLIC_MATCHES: &[&str] = &[
    "-//w3o//dtd w3 html strict 3.0//en//",
    "-/w3c/dtd html 4.0 transitional/en",
    "html",
];

// Public identifier prefixes that select full quirks mode.
static QUIRKY_PUBLIC_PREFIXES: &[&str] = &[
    "+//silmaril//dtd html pro v0r11 19970101//",
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

// With no system identifier, these public identifier prefixes are quirky
// too; with one, they select limited quirks instead.
static HTML401_PUBLIC_PREFIXES: &[&str] = &[
    "-//w3c//dtd html 4.01 frameset//",
    "-//w3c//dtd html 4.01 transitional//",
];

static QUIRKY_SYSTEM_MATCHES: &[&str] =
    &["http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"];

static LIMITED_QUIRKY_PUBLIC_PREFIXES: &[&str] = &[
    "-//w3c//dtd xhtml 1.0 frameset//",
    "-//w3c//dtd xhtml 1.0 transitional//",
];

fn to_ascii_lower_opt(opt: &Option<StrTendril>) -> Option<String> {
    opt.as_ref().map(|s| s.to_ascii_lowercase())
}

fn contains(haystack: &[&str], needle: &str) -> bool {
    haystack.iter().any(|&s| s == needle)
}

fn starts_with_any(haystack: &[&str], needle: &str) -> bool {
    haystack.iter().any(|&s| needle.starts_with(s))
}

/// Determine whether a DOCTYPE is a parse error, and which quirks mode it
/// puts the document in. Identifier comparison is ASCII case-insensitive;
/// an empty system identifier is present, not missing.
pub(crate) fn doctype_error_and_quirks(
    doctype: &Doctype,
    iframe_srcdoc: bool,
) -> (bool, QuirksMode) {
    let name = to_ascii_lower_opt(&doctype.name);
    let public = to_ascii_lower_opt(&doctype.public_id);
    let system = to_ascii_lower_opt(&doctype.system_id);

    let err = match (name.as_deref(), public.as_deref(), system.as_deref()) {
        (Some("html"), None, None) | (Some("html"), None, Some("about:legacy-compat")) => false,
        _ => true,
    };

    let quirk = match (name.as_deref(), public.as_deref(), system.as_deref()) {
        _ if iframe_srcdoc => QuirksMode::NoQuirks,
        _ if doctype.force_quirks => QuirksMode::Quirks,
        (n, _, _) if n != Some("html") => QuirksMode::Quirks,
        (_, Some(p), _) if contains(QUIRKY_PUBLIC_MATCHES, p) => QuirksMode::Quirks,
        (_, _, Some(s)) if contains(QUIRKY_SYSTEM_MATCHES, s) => QuirksMode::Quirks,
        (_, Some(p), _) if starts_with_any(QUIRKY_PUBLIC_PREFIXES, p) => QuirksMode::Quirks,
        (_, Some(p), None) if starts_with_any(HTML401_PUBLIC_PREFIXES, p) => QuirksMode::Quirks,
        (_, Some(p), Some(_)) if starts_with_any(HTML401_PUBLIC_PREFIXES, p) => {
            QuirksMode::LimitedQuirks
        }
        (_, Some(p), _) if starts_with_any(LIMITED_QUIRKY_PUBLIC_PREFIXES, p) => {
            QuirksMode::LimitedQuirks
        }
        _ => QuirksMode::NoQuirks,
    };

    (err, quirk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctype(name: &str, public: Option<&str>, system: Option<&str>) -> Doctype {
        Doctype {
            name: Some(name.into()),
            public_id: public.map(|s| s.into()),
            system_id: system.map(|s| s.into()),
            force_quirks: false,
        }
    }

    #[test]
    fn modern_doctype_is_clean() {
        let (err, quirk) = doctype_error_and_quirks(&doctype("html", None, None), false);
        assert!(!err);
        assert_eq!(quirk, QuirksMode::NoQuirks);
    }

    #[test]
    fn legacy_compat_is_not_an_error() {
        let (err, quirk) =
            doctype_error_and_quirks(&doctype("HTML", None, Some("about:legacy-compat")), false);
        assert!(!err);
        assert_eq!(quirk, QuirksMode::NoQuirks);
    }

    #[test]
    fn html32_is_quirky() {
        let dt = doctype("html", Some("-//W3C//DTD HTML 3.2 Final//EN"), None);
        let (err, quirk) = doctype_error_and_quirks(&dt, false);
        assert!(err);
        assert_eq!(quirk, QuirksMode::Quirks);
    }

    #[test]
    fn html401_transitional_depends_on_system_id() {
        let public = Some("-//W3C//DTD HTML 4.01 Transitional//EN");
        let without = doctype("html", public, None);
        let with = doctype(
            "html",
            public,
            Some("http://www.w3.org/TR/html4/loose.dtd"),
        );
        assert_eq!(
            doctype_error_and_quirks(&without, false).1,
            QuirksMode::Quirks
        );
        assert_eq!(
            doctype_error_and_quirks(&with, false).1,
            QuirksMode::LimitedQuirks
        );
    }

    #[test]
    fn force_quirks_flag_wins() {
        let mut dt = doctype("html", None, None);
        dt.force_quirks = true;
        assert_eq!(doctype_error_and_quirks(&dt, false).1, QuirksMode::Quirks);
    }

    #[test]
    fn missing_name_is_quirky() {
        let dt = Doctype::default();
        let (err, quirk) = doctype_error_and_quirks(&dt, false);
        assert!(err);
        assert_eq!(quirk, QuirksMode::Quirks);
    }
}
