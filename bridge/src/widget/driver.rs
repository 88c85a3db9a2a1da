//! Async driver for [`SearchController`]
//!
//! Runs the state machine on tokio: debounce timers are `sleep` tasks,
//! searches and imports go through a [`BridgeApi`], and view updates go to
//! an [`EditorHost`]. Completed work comes back as events on an internal
//! channel, so the controller itself stays single-threaded.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::controller::{ControllerOptions, Effect, Event, SearchController, View};
use crate::immich::SearchResult;
use crate::import::ImportedAsset;

/// The two network actions the controller needs
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String>;

    async fn import(&self, image_id: &str) -> Result<ImportedAsset, String>;
}

/// The page (or terminal) the controller draws into
pub trait EditorHost: Send {
    fn render(&mut self, view: &View);

    /// Put the imported markup into the active editor
    fn insert_markup(&mut self, html: &str);

    fn alert(&mut self, message: &str);

    fn mark_selected(&mut self, _id: &str) {}

    fn show_importing(&mut self, _id: &str) {}

    fn clear_importing(&mut self) {}

    fn open_overlay(&mut self) {}

    fn focus_input(&mut self) {}

    fn close_overlay(&mut self) {}
}

/// Owns a controller plus its host and runs it to completion
pub struct ControllerDriver<A, H> {
    controller: SearchController,
    api: Arc<A>,
    host: H,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    /// Spawned timers/requests whose completion event hasn't arrived yet
    pending: usize,
}

impl<A, H> ControllerDriver<A, H>
where
    A: BridgeApi + 'static,
    H: EditorHost,
{
    pub fn new(options: ControllerOptions, api: Arc<A>, host: H) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller: SearchController::new(options),
            api,
            host,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn controller(&self) -> &SearchController {
        &self.controller
    }

    /// Process UI events until `ui` closes and all outstanding work has
    /// finished, then hand the host back.
    pub async fn run(mut self, mut ui: mpsc::Receiver<Event>) -> H {
        let mut ui_open = true;

        loop {
            if !ui_open && self.pending == 0 {
                break;
            }

            tokio::select! {
                event = ui.recv(), if ui_open => match event {
                    Some(event) => self.dispatch(event),
                    None => ui_open = false,
                },
                Some(event) = self.rx.recv() => {
                    self.pending = self.pending.saturating_sub(1);
                    self.dispatch(event);
                }
            }
        }

        self.host
    }

    /// Feed one event through the controller and carry out its effects
    pub fn dispatch(&mut self, event: Event) {
        tracing::debug!(?event, "controller event");
        for effect in self.controller.handle(event) {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleSearch { delay, generation } => {
                let tx = self.tx.clone();
                self.pending += 1;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::TimerFired(generation));
                });
            }
            Effect::IssueSearch { query } => {
                let tx = self.tx.clone();
                let api = Arc::clone(&self.api);
                self.pending += 1;
                tokio::spawn(async move {
                    let result = api.search(&query).await;
                    let _ = tx.send(Event::SearchCompleted(result));
                });
            }
            Effect::IssueImport { image_id } => {
                let tx = self.tx.clone();
                let api = Arc::clone(&self.api);
                self.pending += 1;
                tokio::spawn(async move {
                    let result = api.import(&image_id).await;
                    let _ = tx.send(Event::ImportCompleted(result));
                });
            }
            Effect::Render(view) => self.host.render(&view),
            Effect::MarkSelected(id) => self.host.mark_selected(&id),
            Effect::ShowImporting(id) => self.host.show_importing(&id),
            Effect::ClearImporting => self.host.clear_importing(),
            Effect::InsertMarkup(html) => self.host.insert_markup(&html),
            Effect::OpenOverlay => self.host.open_overlay(),
            Effect::FocusInput => self.host.focus_input(),
            Effect::CloseOverlay => self.host.close_overlay(),
            Effect::Alert(message) => self.host.alert(&message),
        }
    }
}
