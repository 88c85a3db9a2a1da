//! Admin page templates

use maud::{html, Markup, DOCTYPE};

use crate::widget::WidgetContext;

/// Outcome banner shown above the settings form
pub enum Notice {
    Saved,
    Failed(String),
}

fn page_layout(title: &str, endpoint: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - Immich Bridge" }
                link rel="stylesheet" href={ (endpoint) "/static/widget.css" };
            }
            body class="immich-admin" {
                nav class="immich-admin-nav" {
                    a href="/admin" { "Editor" }
                    " | "
                    a href="/admin/settings" { "Settings" }
                }
                main { (body) }
            }
        }
    }
}

/// Immich connection settings form
pub fn settings_page(
    endpoint: &str,
    server_url: &str,
    masked_key: &str,
    notice: Option<Notice>,
) -> Markup {
    page_layout(
        "Immich Settings",
        endpoint,
        html! {
            h1 { "Immich Settings" }
            @match notice {
                Some(Notice::Saved) => {
                    div class="immich-notice immich-notice-success" { "Settings saved." }
                }
                Some(Notice::Failed(msg)) => {
                    div class="immich-notice immich-notice-error" { (msg) }
                }
                None => {}
            }
            form method="post" action="/admin/settings" class="immich-settings-form" {
                p {
                    label for="server_url" { "Immich Server URL" }
                    br;
                    input type="url" id="server_url" name="server_url" value=(server_url)
                        placeholder="https://photos.example.com" size="50";
                }
                p {
                    label for="api_key" { "API Key" }
                    br;
                    input type="password" id="api_key" name="api_key" value=""
                        placeholder=(masked_key) autocomplete="off" size="50";
                    @if !masked_key.is_empty() {
                        br;
                        small { "Leave blank to keep the current key." }
                    }
                }
                button type="submit" { "Save Settings" }
            }
        },
    )
}

/// Editor with the image-picker overlay
pub fn editor_page(ctx: &WidgetContext<'_>, configured: bool) -> Markup {
    page_layout(
        "Editor",
        ctx.endpoint,
        html! {
            h1 { "Editor" }
            @if !configured {
                div class="immich-notice immich-notice-error" {
                    "Immich is not configured yet. "
                    a href="/admin/settings" { "Open settings" }
                }
            }
            div class="immich-editor-toolbar" {
                button type="button" id="immich-media-button" class="immich-media-button" {
                    "Add Immich Image"
                }
            }
            textarea id="immich-editor" class="immich-editor" rows="18" cols="80" {}

            div id="immich-modal" class="immich-modal" hidden
                data-endpoint=(ctx.endpoint)
                data-nonce=(ctx.nonce)
                data-debounce=(ctx.debounce_ms)
                data-min-chars=(ctx.min_query_chars) {
                div class="immich-modal-content" role="dialog" aria-modal="true" {
                    button type="button" class="immich-modal-close" aria-label="Close" { "\u{00d7}" }
                    h2 { "Search Immich Images" }
                    form class="immich-search-form" {
                        input type="search" id="immich-admin-search" class="immich-search-input"
                            placeholder="Search images..." autocomplete="off";
                    }
                    div id="immich-admin-results" class="immich-search-results" aria-live="polite" {}
                }
            }
            script src={ (ctx.endpoint) "/static/widget.js" } defer {}
        },
    )
}
