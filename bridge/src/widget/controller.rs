//! Search box state machine
//!
//! ```text
//! Idle ──input──▶ Debouncing ──timer──▶ Searching ──▶ Rendered | Errored
//!                     ▲  │input resets the timer            │select
//!                     └──┘                               Importing
//! ```
//!
//! The controller never performs I/O. Every event returns the list of
//! [`Effect`]s the host must carry out (start a timer, send a request,
//! update the view), which keeps the logic testable without a browser or
//! a network.

use std::time::Duration;

use crate::immich::SearchResult;
use crate::import::ImportedAsset;

pub const NO_RESULTS_MESSAGE: &str = "No images found matching your search.";

/// Tunables for one search box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Quiet period after the last keystroke before a search is sent
    pub debounce: Duration,
    /// Shorter queries show the hint instead of searching
    pub min_query_chars: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_query_chars: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Searching,
    Rendered,
    Errored,
    Importing,
}

/// What the results area shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Query too short
    Hint(usize),
    /// Request in flight
    Searching,
    Results(Vec<SearchResult>),
    NoResults,
    Error(String),
}

impl View {
    /// Plain-text message for non-grid views
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Hint(min) => Some(format!(
                "Please enter at least {min} characters to search"
            )),
            Self::Searching => Some("Searching...".to_string()),
            Self::NoResults => Some(NO_RESULTS_MESSAGE.to_string()),
            Self::Error(msg) => Some(format!("Error: {msg}")),
            Self::Results(_) => None,
        }
    }
}

/// Inputs to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The search field's text changed
    Input(String),
    /// The search form was submitted (search now, skip the debounce)
    Submit,
    /// A debounce timer scheduled with this generation elapsed
    TimerFired(u64),
    SearchCompleted(Result<Vec<SearchResult>, String>),
    /// A rendered result was clicked
    Select(String),
    ImportCompleted(Result<ImportedAsset, String>),
    OpenOverlay,
    CloseOverlay,
    Escape,
}

/// Work the host must carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ScheduleSearch { delay: Duration, generation: u64 },
    IssueSearch { query: String },
    Render(View),
    MarkSelected(String),
    ShowImporting(String),
    ClearImporting,
    IssueImport { image_id: String },
    InsertMarkup(String),
    OpenOverlay,
    FocusInput,
    CloseOverlay,
    Alert(String),
}

/// State for one search box
#[derive(Debug, Clone)]
pub struct SearchController {
    options: ControllerOptions,
    phase: Phase,
    query: String,
    /// Bumped on every keystroke; only the latest timer may search
    generation: u64,
    results: Vec<SearchResult>,
    importing: Option<String>,
    overlay_open: bool,
}

impl SearchController {
    pub fn new(options: ControllerOptions) -> Self {
        Self {
            options,
            phase: Phase::Idle,
            query: String::new(),
            generation: 0,
            results: Vec::new(),
            importing: None,
            overlay_open: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.importing.is_some() {
            Phase::Importing
        } else {
            self.phase
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn overlay_open(&self) -> bool {
        self.overlay_open
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Input(text) => {
                self.query = text;
                self.generation += 1;
                self.phase = Phase::Debouncing;
                vec![Effect::ScheduleSearch {
                    delay: self.options.debounce,
                    generation: self.generation,
                }]
            }
            Event::Submit => {
                // Outstanding timers become stale
                self.generation += 1;
                self.start_search()
            }
            Event::TimerFired(generation) if generation == self.generation => self.start_search(),
            Event::TimerFired(_) => Vec::new(),
            Event::SearchCompleted(result) => self.finish_search(result),
            Event::Select(id) => self.select(id),
            Event::ImportCompleted(result) => self.finish_import(result),
            Event::OpenOverlay => {
                self.overlay_open = true;
                vec![Effect::OpenOverlay, Effect::FocusInput]
            }
            Event::CloseOverlay | Event::Escape => {
                if self.overlay_open {
                    self.overlay_open = false;
                    vec![Effect::CloseOverlay]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn start_search(&mut self) -> Vec<Effect> {
        let query = self.query.trim();
        if query.chars().count() < self.options.min_query_chars {
            self.phase = Phase::Idle;
            return vec![Effect::Render(View::Hint(self.options.min_query_chars))];
        }

        self.phase = Phase::Searching;
        vec![
            Effect::Render(View::Searching),
            Effect::IssueSearch {
                query: query.to_string(),
            },
        ]
    }

    /// Responses render in arrival order; a late answer to an older query
    /// simply replaces the view.
    fn finish_search(&mut self, result: Result<Vec<SearchResult>, String>) -> Vec<Effect> {
        let settle = self.phase == Phase::Searching;
        let view = match result {
            Ok(items) if items.is_empty() => {
                self.results.clear();
                if settle {
                    self.phase = Phase::Rendered;
                }
                View::NoResults
            }
            Ok(items) => {
                self.results = items.clone();
                if settle {
                    self.phase = Phase::Rendered;
                }
                View::Results(items)
            }
            Err(message) => {
                self.results.clear();
                if settle {
                    self.phase = Phase::Errored;
                }
                View::Error(message)
            }
        };
        vec![Effect::Render(view)]
    }

    fn select(&mut self, id: String) -> Vec<Effect> {
        if self.importing.is_some() || !self.results.iter().any(|r| r.id == id) {
            return Vec::new();
        }
        self.importing = Some(id.clone());
        vec![
            Effect::MarkSelected(id.clone()),
            Effect::ShowImporting(id.clone()),
            Effect::IssueImport { image_id: id },
        ]
    }

    fn finish_import(&mut self, result: Result<ImportedAsset, String>) -> Vec<Effect> {
        if self.importing.take().is_none() {
            return Vec::new();
        }

        let mut effects = vec![Effect::ClearImporting];
        match result {
            Ok(asset) => {
                effects.push(Effect::InsertMarkup(asset.html));
                if self.overlay_open {
                    self.overlay_open = false;
                    effects.push(Effect::CloseOverlay);
                }
            }
            Err(message) => effects.push(Effect::Alert(format!("Error: {message}"))),
        }
        effects
    }
}
