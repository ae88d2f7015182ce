// Per-card countdown timers
use crate::bdc_display::DisplayBoard;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One countdown tick; independent of the refresh interval
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(60);

/// Cards at or below this many minutes render as urgent
pub const URGENT_THRESHOLD: u32 = 5;

// ============================================================================
// Countdown State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Minutes were not a valid number; no timer, placeholder text
    Static,
    /// Minutes remaining, always >= 1
    Counting(u32),
    /// Terminal
    Departed,
}

impl Countdown {
    pub fn start(minutes: Option<u32>) -> Self {
        match minutes {
            None => Countdown::Static,
            Some(0) => Countdown::Departed,
            Some(n) => Countdown::Counting(n),
        }
    }

    /// Advance by one tick
    pub fn tick(self) -> Self {
        match self {
            Countdown::Counting(n) if n <= 1 => Countdown::Departed,
            Countdown::Counting(n) => Countdown::Counting(n - 1),
            other => other,
        }
    }

    pub fn needs_timer(&self) -> bool {
        matches!(self, Countdown::Counting(_))
    }

    pub fn remaining(&self) -> Option<u32> {
        match self {
            Countdown::Counting(n) => Some(*n),
            Countdown::Departed => Some(0),
            Countdown::Static => None,
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, Countdown::Counting(n) if *n <= URGENT_THRESHOLD)
    }

    pub fn is_departed(&self) -> bool {
        *self == Countdown::Departed
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Owns the timers of the current render generation.
///
/// Every timer holds a child of the generation token, so cancelling the
/// generation stops all of them at once. A timer that reaches `Departed`
/// cancels only its own child.
pub struct CountdownScheduler {
    generation: CancellationToken,
    timers: Vec<CancellationToken>,
}

impl Default for CountdownScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownScheduler {
    pub fn new() -> Self {
        CountdownScheduler {
            generation: CancellationToken::new(),
            timers: Vec::new(),
        }
    }

    /// Start one timer per counting card on the board.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start_countdowns(&mut self, board: &Arc<DisplayBoard>) {
        let counting: Vec<usize> = board.inspect(|state| {
            state
                .cards
                .iter()
                .enumerate()
                .filter(|(_, card)| card.countdown.needs_timer())
                .map(|(index, _)| index)
                .collect()
        });

        for index in counting {
            let timer = self.generation.child_token();
            self.timers.push(timer.clone());
            Self::spawn_timer(Arc::clone(board), index, timer);
        }

        log::debug!("Started {} countdown timer(s)", self.timers.len());
    }

    /// Cancel every timer of the current generation. Displayed text is left as is.
    pub fn stop_all(&mut self) {
        self.generation.cancel();
        self.generation = CancellationToken::new();
        self.timers.clear();
    }

    /// Number of timers that can still tick
    pub fn running(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_cancelled()).count()
    }

    fn spawn_timer(board: Arc<DisplayBoard>, index: usize, timer: CancellationToken) {
        tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    () = timer.cancelled() => break,

                    _ = ticks.tick() => {
                        if !Self::apply_tick(&board, index, &timer) {
                            timer.cancel();
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Returns whether the timer should keep running
    fn apply_tick(board: &DisplayBoard, index: usize, timer: &CancellationToken) -> bool {
        board.update(|state| {
            // A stale generation must never touch the current cards
            if timer.is_cancelled() {
                return false;
            }

            match state.cards.get_mut(index) {
                Some(card) => {
                    card.countdown = card.countdown.tick();
                    log::debug!(
                        "Countdown for {} ({}): {:?}",
                        card.entry.destination,
                        card.entry.bus_number,
                        card.countdown
                    );
                    card.countdown.needs_timer()
                }
                None => false,
            }
        })
    }
}
