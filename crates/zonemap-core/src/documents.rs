//! Linked document and image URLs.

use crate::config::{DEFAULT_DOCUMENT_URL_TEMPLATE, ZoneMapConfig};
use crate::Result;
use url::Url;

const ID_PLACEHOLDER: &str = "{id}";

/// Builds viewer URLs for linked document ids from a single `{id}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLinker {
    template: String,
}

impl Default for DocumentLinker {
    fn default() -> Self {
        Self {
            template: DEFAULT_DOCUMENT_URL_TEMPLATE.to_string(),
        }
    }
}

impl DocumentLinker {
    pub fn from_config(config: &ZoneMapConfig) -> Result<Self> {
        let path = "documents.urlTemplate";
        let template = config
            .get_str(path)
            .ok_or_else(|| config.invalid(path, "expected a string"))?;
        if !template.contains(ID_PLACEHOLDER) {
            return Err(config.invalid(path, "template must contain `{id}`"));
        }
        let probe = template.replace(ID_PLACEHOLDER, "x");
        if Url::parse(&probe).is_err() {
            return Err(config.invalid(path, "template is not an absolute URL"));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Viewer URL for a linked document cell. The cell may hold a bare id or a pasted Drive URL.
    pub fn document_url(&self, cell: &str) -> Option<String> {
        let id = document_id(cell)?;
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        Some(self.template.replace(ID_PLACEHOLDER, &encoded))
    }

    /// Image cells holding an absolute http(s) URL are used as-is; anything else is treated as a
    /// document id.
    pub fn image_url(&self, cell: &str) -> Option<String> {
        let cell = cell.trim();
        if let Ok(url) = Url::parse(cell) {
            if matches!(url.scheme(), "http" | "https") && !is_drive_url(&url) {
                return Some(url.to_string());
            }
        }
        self.document_url(cell)
    }
}

/// Extracts a document id from a cell: `.../d/<id>/...` and `?id=<id>` URLs yield the id, other
/// values are taken as the id itself. Empty cells yield `None`.
pub fn document_id(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let url = match Url::parse(cell) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return Some(cell.to_string()),
    };
    if let Some(id) = url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
    {
        return Some(id);
    }
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "d" {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
    }
    None
}

fn is_drive_url(url: &Url) -> bool {
    matches!(url.host_str(), Some("drive.google.com" | "docs.google.com"))
}
