//! Outbound link handling
//!
//! Links that leave the page's origin go through a confirmation dialog
//! first. A dialog that fails to answer counts as a yes so that a broken
//! dialog never blocks navigation.

use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid link target {0:?}")]
    Invalid(String),

    #[error("refusing to open {0} link")]
    UnsupportedScheme(String),
}

/// What to do with an activated link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    Open(Url),
    Confirm(Url),
}

#[derive(Debug, Clone, Default)]
pub struct LinkGuard {
    origin: Option<Url>,
}

impl LinkGuard {
    /// `page_origin` is the URL the widget is embedded in, if known
    pub fn new(page_origin: Option<&str>) -> Self {
        let origin = page_origin.and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(origin = raw, error = %e, "ignoring invalid page origin");
                None
            }
        });
        Self { origin }
    }

    pub fn classify(&self, href: &str) -> Result<LinkDecision, LinkError> {
        let url = match (&self.origin, Url::parse(href)) {
            (_, Ok(url)) => url,
            (Some(base), Err(url::ParseError::RelativeUrlWithoutBase)) => base
                .join(href)
                .map_err(|_| LinkError::Invalid(href.to_string()))?,
            _ => return Err(LinkError::Invalid(href.to_string())),
        };

        match url.scheme() {
            "http" | "https" => {}
            "mailto" => return Ok(LinkDecision::Open(url)),
            other => return Err(LinkError::UnsupportedScheme(other.to_string())),
        }

        let same_origin = self
            .origin
            .as_ref()
            .is_some_and(|origin| origin.origin() == url.origin());

        if same_origin {
            Ok(LinkDecision::Open(url))
        } else {
            debug!(%url, "external link needs confirmation");
            Ok(LinkDecision::Confirm(url))
        }
    }

    /// Decide from the dialog's answer whether to open the link
    pub fn resolve_confirmation(&self, url: Url, answer: Result<bool, String>) -> Option<Url> {
        match answer {
            Ok(true) => Some(url),
            Ok(false) => {
                debug!(%url, "external link declined");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "link confirmation failed, opening anyway");
                Some(url)
            }
        }
    }
}
