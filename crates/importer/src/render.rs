//! Plain-text rendering of import status and preview tables.

use nexus_core::import::preview::EMPTY_SENTINEL;
use nexus_core::import::{PreviewStore, StatusIcon, StatusView};

fn glyph(icon: StatusIcon) -> &'static str {
    match icon {
        StatusIcon::Upload => "[ ]",
        StatusIcon::Spinner => "[~]",
        StatusIcon::Check => "[ok]",
        StatusIcon::Cross => "[x]",
        StatusIcon::Alert => "[!]",
    }
}

/// One status block: the message, then the summary panel when present.
pub fn render_status(view: &StatusView) -> String {
    let mut out = format!("{} {}", glyph(view.icon), view.message);
    if let Some(summary) = &view.summary {
        out.push_str(&format!(
            "\n    {} import: {} saved, {} failed, {} elapsed",
            summary.kind_label, summary.success_count, summary.failure_count, summary.elapsed
        ));
    }
    out
}

/// The first `limit` preview rows as an aligned table.
pub fn render_preview(store: &PreviewStore, limit: usize) -> String {
    let columns = store.columns();
    if columns.is_empty() {
        return String::new();
    }

    let header: Vec<String> = columns.iter().map(|c| PreviewStore::label(c)).collect();
    let body: Vec<Vec<String>> = store
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    PreviewStore::display_value(row.get(c))
                        .unwrap_or_else(|| EMPTY_SENTINEL.to_string())
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(&header)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(body.iter().map(|r| line(r)));
    let hidden = store.rows().len().saturating_sub(limit);
    if hidden > 0 {
        lines.push(format!("... and {hidden} more"));
    }
    lines.join("\n")
}
