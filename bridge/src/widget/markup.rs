//! Public search widget markup
//!
//! Content may carry `[immich_search]` or `[immich_search placeholder="…"]`
//! markers; each one becomes a search box wired to the bridge by
//! `static/widget.js`.

use maud::{html, Markup};
use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const DEFAULT_PLACEHOLDER: &str = "Search images...";

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[immich_search(?:\s+placeholder\s*=\s*"([^"]*)")?\s*\]"#)
        .expect("Invalid widget marker regex")
});

/// Everything a rendered widget needs to talk to the bridge
#[derive(Debug, Clone)]
pub struct WidgetContext<'a> {
    /// Base URL the widget posts its actions to
    pub endpoint: &'a str,
    pub nonce: &'a str,
    pub debounce_ms: u64,
    pub min_query_chars: usize,
}

/// One search box
pub fn widget_fragment(ctx: &WidgetContext<'_>, placeholder: &str) -> Markup {
    html! {
        div class="immich-search-container"
            data-endpoint=(ctx.endpoint)
            data-nonce=(ctx.nonce)
            data-debounce=(ctx.debounce_ms)
            data-min-chars=(ctx.min_query_chars) {
            form class="immich-search-form" {
                input type="search" class="immich-search-input" placeholder=(placeholder) autocomplete="off";
                button type="submit" class="immich-search-button" { "Search" }
            }
            div class="immich-search-results" aria-live="polite" {}
        }
    }
}

/// Stylesheet and script every page with a widget needs, once
pub fn widget_assets(endpoint: &str) -> Markup {
    html! {
        link rel="stylesheet" href={ (endpoint) "/static/widget.css" };
        script src={ (endpoint) "/static/widget.js" } defer {}
    }
}

/// Replace every marker in `content`; assets are appended when at least
/// one marker was found.
pub fn expand_placeholders(content: &str, ctx: &WidgetContext<'_>) -> String {
    if !MARKER.is_match(content) {
        return content.to_string();
    }

    let mut expanded = MARKER
        .replace_all(content, |caps: &Captures<'_>| {
            let placeholder = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_PLACEHOLDER);
            widget_fragment(ctx, placeholder).into_string()
        })
        .into_owned();
    expanded.push_str(&widget_assets(ctx.endpoint).into_string());
    expanded
}

/// Full standalone page with one widget, for `GET /widget`
pub fn widget_page(ctx: &WidgetContext<'_>, placeholder: &str) -> Markup {
    html! {
        (maud::DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Image search" }
                (widget_assets(ctx.endpoint))
            }
            body {
                (widget_fragment(ctx, placeholder))
                noscript { p { "Image search needs JavaScript." } }
            }
        }
    }
}
