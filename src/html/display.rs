//! Display rewrites using lol_html for streaming HTML processing
//!
//! Before a document is handed to a renderer its links are made safe:
//! absolute links open in a new browsing context without leaking the
//! opener, and relative links (which would resolve against the
//! application, not the document) are disarmed by stashing their `href`.
//! The codec reverses both rewrites on parse.

use lol_html::{element, rewrite_str, RewriteStrSettings};

use super::codec::CodecError;

/// Attribute holding the original `href` of a disarmed relative link
pub const STASHED_HREF_ATTRIBUTE: &str = "data-href";
/// `target` added to absolute links
pub const ABSOLUTE_LINK_TARGET: &str = "_blank";
/// `rel` added to absolute links
pub const ABSOLUTE_LINK_REL: &str = "noopener noreferrer";

/// Does `href` point outside the document (has a scheme)
pub fn is_absolute_link(href: &str) -> bool {
    let href = href.trim();
    match href.find(':') {
        Some(idx) => {
            let scheme = &href[..idx];
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => href.starts_with("//"),
    }
}

/// Rewrite links for safe display
pub fn prepare_for_display(html: &str) -> Result<String, CodecError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                if let Some(href) = el.get_attribute("href") {
                    if is_absolute_link(&href) {
                        el.set_attribute("target", ABSOLUTE_LINK_TARGET)?;
                        el.set_attribute("rel", ABSOLUTE_LINK_REL)?;
                    } else {
                        el.remove_attribute("href");
                        el.set_attribute(STASHED_HREF_ATTRIBUTE, &href)?;
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| CodecError::Rewrite(e.to_string()))
}
