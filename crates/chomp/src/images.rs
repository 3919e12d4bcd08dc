//! Image resolution
//!
//! With images disabled every `<img>` is dropped. Otherwise sources are made
//! absolute against the document's base URL, and images whose source cannot
//! be resolved are dropped rather than emitted as broken references.

use crate::config::Config;
use crate::dom::{Document, ElementData};
use tracing::debug;
use url::Url;

/// Image source, falling back to `data-src` for lazy-loaded images
pub fn image_source(el: &ElementData) -> Option<&str> {
    ["src", "data-src"]
        .iter()
        .filter_map(|name| el.attr(name))
        .map(str::trim)
        .find(|src| !src.is_empty())
}

/// Resolve a source against an optional base URL
///
/// Absolute sources are returned unchanged. Relative and root-relative
/// sources need a base; without one the result is `None`.
pub fn resolve_url(base: Option<&Url>, src: &str) -> Option<String> {
    match Url::parse(src) {
        Ok(_) => Some(src.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base?.join(src).ok().map(String::from)
        }
        Err(_) => None,
    }
}

/// Strip or resolve every image in the document
pub fn resolve_images(document: &Document, config: &Config) -> Document {
    let images: Vec<_> = document
        .descendants(document.root())
        .filter(|&id| document.tag(id) == Some("img"))
        .collect();
    if images.is_empty() {
        return document.clone();
    }

    let mut out = document.clone();
    let mut keep = vec![true; document.len()];
    let mut removed = 0;

    for id in images {
        let resolved = if config.retain_images {
            document
                .element(id)
                .and_then(image_source)
                .and_then(|src| resolve_url(document.base_url(), src))
        } else {
            None
        };

        match resolved {
            Some(src) => out.set_attr(id, "src", src),
            None => {
                keep[id.index()] = false;
                removed += 1;
            }
        }
    }

    debug!(
        retain_images = config.retain_images,
        removed, "Image resolution finished"
    );

    out.prune(&keep)
}
