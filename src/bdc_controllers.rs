// Controllers for the bus departure countdown display
use crate::bdc_config::Config;
use crate::bdc_display::{DisplayBoard, RenderPipeline};
use crate::bdc_models::{BDCModels, DisplayZone, HttpSource, SnapshotSource};
use crate::bdc_views::BDCViews;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Visibility changes reported by a frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Hidden,
    Visible,
}

// ============================================================================
// Snapshot Fetcher
// ============================================================================

pub struct SnapshotFetcher<S> {
    source: S,
    zone: DisplayZone,
}

impl<S: SnapshotSource> SnapshotFetcher<S> {
    pub fn new(source: S, zone: DisplayZone) -> Self {
        SnapshotFetcher { source, zone }
    }

    /// Fetch once and render the result. Returns whether the fetch succeeded.
    pub async fn refresh(&self, pipeline: &mut RenderPipeline) -> bool {
        match self.source.fetch().await {
            Ok(snapshot) => {
                let updated = BDCModels::format_update_time(snapshot.update_time.as_deref(), self.zone);
                log::info!(
                    "Snapshot refreshed: {} destination(s), updated {}",
                    snapshot.entries.len(),
                    updated
                );
                pipeline.render(snapshot);
                pipeline.show_last_updated(updated);
                true
            }
            Err(e) => {
                // Stale cards stay up; the next scheduled fetch is the retry
                log::warn!("Error fetching bus data: {}", e);
                pipeline.report_unreachable();
                false
            }
        }
    }
}

// ============================================================================
// Display Loop
// ============================================================================

/// Drive fetches until `shutdown` is cancelled.
///
/// Fetches at start-up, on every `refresh_interval` and on every hidden to
/// visible transition. Hiding pauses countdowns but never the interval.
pub async fn drive<S: SnapshotSource>(
    fetcher: SnapshotFetcher<S>,
    mut pipeline: RenderPipeline,
    mut events: UnboundedReceiver<ViewEvent>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut refresh = time::interval(refresh_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            Some(event) = events.recv() => match event {
                ViewEvent::Hidden => {
                    if pipeline.set_visible(false) {
                        log::info!("Display hidden, countdowns paused");
                    }
                }
                ViewEvent::Visible => {
                    if pipeline.set_visible(true) {
                        log::info!("Display visible again, refreshing");
                        fetcher.refresh(&mut pipeline).await;
                    }
                }
            },

            _ = refresh.tick() => {
                fetcher.refresh(&mut pipeline).await;
                log::debug!("{} countdown(s) running", pipeline.running_countdowns());
            }
        }
    }

    pipeline.stop_countdowns();
}

// ============================================================================
// Terminal Frontend
// ============================================================================

pub struct BDCControllers;

impl BDCControllers {
    /// Run the terminal display on a single-threaded runtime
    pub fn run(config: &Config) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let source = HttpSource::new(config.api_url.clone())?;
        let fetcher = SnapshotFetcher::new(source, config.zone());
        let board = DisplayBoard::new();
        let pipeline = RenderPipeline::new(Arc::clone(&board));
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        Self::spawn_command_reader(tx, shutdown.clone());

        let locale = config.locale;
        let interval = config.refresh_interval();

        runtime.block_on(async move {
            let redraw_board = Arc::clone(&board);
            let redraw_stop = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    Self::redraw(&BDCViews::render_terminal(&redraw_board.view(), locale));
                    tokio::select! {
                        () = redraw_stop.cancelled() => break,
                        () = redraw_board.changed() => {}
                    }
                }
            });

            drive(fetcher, pipeline, rx, interval, shutdown).await;
        });

        println!("\n👋 Goodbye!");
        Ok(())
    }

    /// Read single-letter commands from stdin on a plain thread
    fn spawn_command_reader(events: UnboundedSender<ViewEvent>, shutdown: CancellationToken) {
        thread::spawn(move || {
            if Self::read_commands(io::stdin().lock(), &events) {
                shutdown.cancel();
            } else {
                log::info!("Input closed, display keeps running");
            }
        });
    }

    /// Forward commands until `q`. Returns whether quit was requested; closed
    /// or unreadable input only stops reading.
    fn read_commands<R: BufRead>(input: R, events: &UnboundedSender<ViewEvent>) -> bool {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Error reading input: {}", e);
                    return false;
                }
            };

            let event = match Self::parse_command(&line) {
                Some(Command::Hide) => ViewEvent::Hidden,
                Some(Command::Show) => ViewEvent::Visible,
                Some(Command::Quit) => return true,
                None => continue,
            };

            if events.send(event).is_err() {
                return false;
            }
        }
        false
    }

    fn parse_command(line: &str) -> Option<Command> {
        match line.trim().to_ascii_lowercase().as_str() {
            "h" | "hide" => Some(Command::Hide),
            "s" | "show" => Some(Command::Show),
            "q" | "quit" => Some(Command::Quit),
            _ => None,
        }
    }

    /// Clear screen and draw a frame
    fn redraw(frame: &str) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\x1B[2J\x1B[1;1H{}", frame);
        let _ = stdout.flush();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Hide,
    Show,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdc_countdown::{COUNTDOWN_TICK, Countdown};
    use crate::bdc_display::Placeholder;
    use crate::bdc_models::{BDCError, Result, Snapshot, SystemHealth};
    use crate::bdc_views::Locale;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Scripted = fn() -> Result<Snapshot>;

    /// Replays scripted responses; the last one repeats forever
    struct ScriptedSource {
        responses: Mutex<VecDeque<Scripted>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: &[Scripted]) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = ScriptedSource {
                responses: Mutex::new(responses.iter().copied().collect()),
                calls: Arc::clone(&calls),
            };
            (source, calls)
        }
    }

    impl SnapshotSource for ScriptedSource {
        async fn fetch(&self) -> Result<Snapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                *responses.front().unwrap()
            };
            next()
        }
    }

    fn reference() -> Result<Snapshot> {
        Snapshot::from_json(
            &json!({
                "destinations": [{
                    "destination": "Station A",
                    "bus_number": "12",
                    "estimated_departure_minutes": 3,
                    "delay_status": "DELAYED"
                }],
                "update_time": "2024-01-01T10:00:00Z",
                "system_status": { "health": "OK" }
            })
            .to_string(),
        )
    }

    fn empty() -> Result<Snapshot> {
        Snapshot::from_json(r#"{"destinations": [], "update_time": "2024-01-01 09:30:00"}"#)
    }

    fn unreachable() -> Result<Snapshot> {
        Err(BDCError::NetworkError("connection refused".to_string()))
    }

    fn tokyo() -> DisplayZone {
        DisplayZone::Named(chrono_tz::Asia::Tokyo)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reference_snapshot_renders_one_urgent_card() {
        let (source, _) = ScriptedSource::new(&[reference]);
        let fetcher = SnapshotFetcher::new(source, tokyo());
        let mut pipeline = RenderPipeline::new(DisplayBoard::new());

        assert!(fetcher.refresh(&mut pipeline).await);

        let state = pipeline.board().view();
        assert_eq!(state.cards.len(), 1);
        let card = &state.cards[0];
        assert_eq!(BDCViews::countdown_text(Locale::En, card.countdown), "3 minutes");
        assert!(card.countdown.is_urgent());
        assert_eq!(BDCViews::delay_label(Locale::En, card.entry.delay_status), "delayed");
        assert_eq!(BDCViews::health_label(Locale::En, state.health.unwrap()), "normal");
        assert_eq!(state.last_updated.as_deref(), Some("19:00"));
        assert_eq!(pipeline.running_countdowns(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_shows_placeholder() {
        let (source, _) = ScriptedSource::new(&[empty]);
        let fetcher = SnapshotFetcher::new(source, tokyo());
        let mut pipeline = RenderPipeline::new(DisplayBoard::new());

        assert!(fetcher.refresh(&mut pipeline).await);

        let state = pipeline.board().view();
        assert_eq!(state.placeholder, Some(Placeholder::NoData));
        assert_eq!(state.last_updated.as_deref(), Some("09:30"));
        assert_eq!(pipeline.running_countdowns(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_cards() {
        let (source, _) = ScriptedSource::new(&[reference, unreachable]);
        let fetcher = SnapshotFetcher::new(source, tokyo());
        let mut pipeline = RenderPipeline::new(DisplayBoard::new());

        fetcher.refresh(&mut pipeline).await;
        let before = pipeline.board().view();

        assert!(!fetcher.refresh(&mut pipeline).await);

        let after = pipeline.board().view();
        assert_eq!(after.cards, before.cards);
        assert_eq!(after.last_updated, before.last_updated);
        assert_eq!(after.health, Some(SystemHealth::Unreachable));
        assert_eq!(
            BDCViews::health_label(Locale::En, SystemHealth::Unreachable),
            "error - unable to fetch data"
        );
        assert_eq!(pipeline.running_countdowns(), 1);

        // The surviving countdown keeps running
        time::sleep(COUNTDOWN_TICK + Duration::from_millis(5)).await;
        settle().await;
        assert_eq!(pipeline.board().view().cards[0].countdown, Countdown::Counting(2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_failure_keeps_loading_placeholder() {
        let (source, _) = ScriptedSource::new(&[unreachable]);
        let fetcher = SnapshotFetcher::new(source, tokyo());
        let mut pipeline = RenderPipeline::new(DisplayBoard::new());

        fetcher.refresh(&mut pipeline).await;

        let state = pipeline.board().view();
        assert_eq!(state.placeholder, Some(Placeholder::Loading));
        assert_eq!(state.health, Some(SystemHealth::Unreachable));
        assert!(state.last_updated.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drive_fetches_on_startup_interval_and_visibility() {
        let (source, calls) = ScriptedSource::new(&[reference]);
        let fetcher = SnapshotFetcher::new(source, tokyo());
        let board = DisplayBoard::new();
        let pipeline = RenderPipeline::new(Arc::clone(&board));
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = drive(
            fetcher,
            pipeline,
            rx,
            Duration::from_secs(60),
            shutdown.clone(),
        );

        let script = async {
            settle().await;
            assert_eq!(calls.load(Ordering::SeqCst), 1);

            // Hiding fetches nothing and the interval keeps going
            tx.send(ViewEvent::Hidden).unwrap();
            settle().await;
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(!board.view().visible);

            time::sleep(Duration::from_secs(61)).await;
            settle().await;
            assert_eq!(calls.load(Ordering::SeqCst), 2);

            // Hidden renders do not animate
            time::sleep(Duration::from_secs(50)).await;
            settle().await;
            assert_eq!(board.view().cards[0].countdown, Countdown::Counting(3));

            tx.send(ViewEvent::Visible).unwrap();
            settle().await;
            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert!(board.view().visible);

            // Repeated visibility is not a transition
            tx.send(ViewEvent::Visible).unwrap();
            settle().await;
            assert_eq!(calls.load(Ordering::SeqCst), 3);

            shutdown.cancel();
        };

        tokio::join!(driver, script);
    }

    #[test]
    fn commands() {
        assert_eq!(BDCControllers::parse_command("h"), Some(Command::Hide));
        assert_eq!(BDCControllers::parse_command(" Show \n"), Some(Command::Show));
        assert_eq!(BDCControllers::parse_command("Q"), Some(Command::Quit));
        assert_eq!(BDCControllers::parse_command("refresh"), None);
    }

    #[test]
    fn closed_input_does_not_quit() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(!BDCControllers::read_commands(io::Cursor::new(""), &tx));
        assert!(!BDCControllers::read_commands(io::Cursor::new("h\nnoise\ns\n"), &tx));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Hidden));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Visible));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn quit_command_stops_reading() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(BDCControllers::read_commands(io::Cursor::new("h\nq\ns\n"), &tx));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Hidden));
        assert!(rx.try_recv().is_err());
    }
}
