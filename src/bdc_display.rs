// Display state and the render pipeline that replaces it on every snapshot
use crate::bdc_countdown::{Countdown, CountdownScheduler};
use crate::bdc_models::{Entry, Snapshot, SystemHealth};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

// ============================================================================
// Display State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Nothing has been fetched successfully yet
    Loading,
    /// The last snapshot had no destinations
    NoData,
}

/// One visible bus card
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub entry: Entry,
    /// Locally decremented copy of the server minutes
    pub countdown: Countdown,
}

impl Card {
    pub fn new(entry: Entry) -> Self {
        let countdown = Countdown::start(entry.estimated_minutes);
        Card { entry, countdown }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub cards: Vec<Card>,
    pub placeholder: Option<Placeholder>,
    pub health: Option<SystemHealth>,
    pub data_source: Option<String>,
    pub last_updated: Option<String>,
    pub visible: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        DisplayState {
            cards: Vec::new(),
            placeholder: Some(Placeholder::Loading),
            health: None,
            data_source: None,
            last_updated: None,
            visible: true,
        }
    }
}

/// The single shared display state plus a change signal for frontends
#[derive(Debug, Default)]
pub struct DisplayBoard {
    state: Mutex<DisplayState>,
    changed: Notify,
}

impl DisplayBoard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy of the current state for rendering
    pub fn view(&self) -> DisplayState {
        self.lock().clone()
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&DisplayState) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the state and wake whoever is waiting on `changed`
    pub fn update<R>(&self, f: impl FnOnce(&mut DisplayState) -> R) -> R {
        let result = f(&mut self.lock());
        self.changed.notify_one();
        result
    }

    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Render Pipeline
// ============================================================================

pub struct RenderPipeline {
    board: Arc<DisplayBoard>,
    scheduler: CountdownScheduler,
}

impl RenderPipeline {
    pub fn new(board: Arc<DisplayBoard>) -> Self {
        RenderPipeline {
            board,
            scheduler: CountdownScheduler::new(),
        }
    }

    #[cfg(test)]
    pub fn board(&self) -> &Arc<DisplayBoard> {
        &self.board
    }

    /// Replace every card with the snapshot's entries.
    ///
    /// Prior timers are cancelled before anything else happens; new ones are
    /// only started while the display is visible.
    pub fn render(&mut self, snapshot: Snapshot) {
        self.scheduler.stop_all();

        let Snapshot {
            entries,
            system_status,
            ..
        } = snapshot;

        let start_timers = self.board.update(|state| {
            state.cards.clear();

            // A payload without a status leaves the indicator as it was
            if let Some(status) = system_status {
                state.health = Some(status.health);
                state.data_source = status.data_source;
            }

            if entries.is_empty() {
                state.placeholder = Some(Placeholder::NoData);
                return false;
            }

            state.placeholder = None;
            state.cards = entries.into_iter().map(Card::new).collect();
            state.visible
        });

        if start_timers {
            self.scheduler.start_countdowns(&self.board);
        }
    }

    /// A failed fetch only changes the status indicator
    pub fn report_unreachable(&mut self) {
        self.board.update(|state| state.health = Some(SystemHealth::Unreachable));
    }

    pub fn show_last_updated(&mut self, text: String) {
        self.board.update(|state| state.last_updated = Some(text));
    }

    /// Returns whether visibility actually changed. Hiding pauses every countdown.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.board.update(|state| {
            let changed = state.visible != visible;
            state.visible = visible;
            changed
        });

        if changed && !visible {
            self.scheduler.stop_all();
        }
        changed
    }

    pub fn running_countdowns(&self) -> usize {
        self.scheduler.running()
    }

    pub fn stop_countdowns(&mut self) {
        self.scheduler.stop_all();
    }
}
