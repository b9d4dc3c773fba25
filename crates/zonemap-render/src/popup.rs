//! Popup markup for a zone.

use htmlize::{escape_attribute, escape_text};
use std::fmt::Write as _;
use zonemap_core::{DocumentLinker, ZoneStatus};

const NO_DOCUMENT: &str = "Sin documento asociado.";
const NO_DATA: &str = "Datos no disponibles o sin sincronizar.";

/// Builds the popup for a polygon. Every interpolated value is escaped; the link and image
/// URLs come from [`DocumentLinker`].
pub fn popup_html(
    zone_id: Option<&str>,
    status: Option<&ZoneStatus>,
    documents: &DocumentLinker,
) -> String {
    let mut html = String::new();
    let heading = zone_id.map(str::trim).unwrap_or_default();
    let _ = write!(html, "<h4>Zona: {}</h4>", escape_text(heading));

    let Some(status) = status else {
        html.push_str(NO_DATA);
        return html;
    };

    let _ = write!(html, "<b>Estado:</b> {}<br>", escape_text(status.state.as_str()));
    match status
        .linked_document_id
        .as_deref()
        .and_then(|cell| Some((cell, documents.document_url(cell)?)))
    {
        Some((cell, url)) => {
            let _ = write!(
                html,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">Ver Documento (PDF ID: {})</a>",
                escape_attribute(url.as_str()),
                escape_text(cell)
            );
        }
        None => html.push_str(NO_DOCUMENT),
    }

    if let Some(src) = status.image_url.as_deref().and_then(|c| documents.image_url(c)) {
        let _ = write!(
            html,
            "<br><img src=\"{}\" alt=\"Zona {}\" style=\"max-width:100%\">",
            escape_attribute(src.as_str()),
            escape_attribute(heading)
        );
    }
    if let Some(description) = status.description.as_deref() {
        let _ = write!(html, "<p>{}</p>", escape_text(description));
    }
    html
}
