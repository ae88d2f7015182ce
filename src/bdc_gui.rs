// GUI implementation for the bus departure countdown display using egui/eframe
use crate::bdc_config::Config;
use crate::bdc_controllers::{SnapshotFetcher, ViewEvent, drive};
use crate::bdc_display::{Card, DisplayBoard, DisplayState, RenderPipeline};
use crate::bdc_models::HttpSource;
use crate::bdc_views::{BDCViews, CountdownStyle, Emphasis, Locale, STOP_PLACEHOLDER, TIME_PLACEHOLDER};
use anyhow::anyhow;
use eframe::egui;
use egui::{Color32, RichText, Ui};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Application State
// ============================================================================

pub struct BDCApp {
    board: Arc<DisplayBoard>,
    events: UnboundedSender<ViewEvent>,
    locale: Locale,
    visible: bool,
}

impl BDCApp {
    fn new(board: Arc<DisplayBoard>, events: UnboundedSender<ViewEvent>, locale: Locale) -> Self {
        BDCApp {
            board,
            events,
            locale,
            visible: true,
        }
    }

    /// Minimizing the window counts as hiding the display
    fn track_visibility(&mut self, ctx: &egui::Context) {
        let minimized = ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        let visible = !minimized;

        if visible != self.visible {
            self.visible = visible;
            let event = if visible { ViewEvent::Visible } else { ViewEvent::Hidden };
            if self.events.send(event).is_err() {
                log::warn!("Display loop has stopped; visibility change dropped");
            }
        }
    }
}

/// Open the window; fetching runs on a background runtime until it closes
pub fn run_gui(config: &Config) -> anyhow::Result<()> {
    let board = DisplayBoard::new();
    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let source = HttpSource::new(config.api_url.clone())?;
    let fetcher = SnapshotFetcher::new(source, config.zone());
    let pipeline = RenderPipeline::new(Arc::clone(&board));
    let interval = config.refresh_interval();
    let loop_stop = shutdown.clone();

    let worker = thread::spawn(move || -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(drive(fetcher, pipeline, rx, interval, loop_stop));
        Ok(())
    });

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Bus Departures")
            .with_inner_size([520.0, 720.0])
            .with_min_inner_size([360.0, 400.0]),
        ..Default::default()
    };

    let app = BDCApp::new(board, tx, config.locale);
    let result = eframe::run_native(
        "Bus Departures",
        native_options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    shutdown.cancel();
    worker
        .join()
        .map_err(|_| anyhow!("display loop panicked"))??;

    result.map_err(|e| anyhow!("window error: {}", e))
}

impl eframe::App for BDCApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.track_visibility(ctx);

        // Countdowns change once a minute, the board may change at any time
        ctx.request_repaint_after(Duration::from_secs(1));

        let state = self.board.view();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.show_header(ui, &state);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(placeholder) = state.placeholder {
                ui.centered_and_justified(|ui| {
                    ui.label(BDCViews::placeholder_label(self.locale, placeholder));
                });
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for card in &state.cards {
                    self.show_card(ui, card);
                }
            });
        });
    }
}

// ============================================================================
// View Implementations
// ============================================================================

impl BDCApp {
    fn show_header(&self, ui: &mut Ui, state: &DisplayState) {
        ui.horizontal(|ui| {
            ui.heading("🚌 Bus Departures");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let updated = state.last_updated.as_deref().unwrap_or(TIME_PLACEHOLDER);
                ui.label(format!("{}: {}", BDCViews::last_updated_label(self.locale), updated));
            });
        });

        if let Some(health) = state.health {
            ui.horizontal(|ui| {
                ui.label(format!("{}:", BDCViews::status_label(self.locale)));
                ui.colored_label(
                    emphasis_color(BDCViews::health_emphasis(health)),
                    BDCViews::health_label(self.locale, health),
                );
                if let Some(source) = &state.data_source {
                    ui.label(format!("({})", source));
                }
            });
        }
    }

    fn show_card(&self, ui: &mut Ui, card: &Card) {
        let entry = &card.entry;

        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.strong(RichText::new(&entry.destination).size(18.0));
                        ui.label(RichText::new(&entry.bus_number).monospace());
                        if entry.is_next_bus {
                            ui.colored_label(
                                Color32::from_rgb(0, 120, 215),
                                format!("★ {}", BDCViews::next_bus_label(self.locale)),
                            );
                        }
                    });

                    let departure = entry.scheduled_departure_time.as_deref().unwrap_or(TIME_PLACEHOLDER);
                    let arrival = entry.scheduled_arrival_time.as_deref().unwrap_or(TIME_PLACEHOLDER);
                    let stop = entry.stop_number.as_deref().unwrap_or(STOP_PLACEHOLDER);
                    let mut times = format!("🚏 {}   {}", stop, departure);
                    if let Some(predicted) = &entry.predicted_departure_time {
                        times.push_str(&format!(" ({})", predicted));
                    }
                    times.push_str(&format!(" → {}", arrival));
                    if let Some(predicted) = &entry.predicted_arrival_time {
                        times.push_str(&format!(" ({})", predicted));
                    }
                    ui.label(times);

                    ui.label(format!("● {}", BDCViews::delay_label(self.locale, entry.delay_status)));
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let text = BDCViews::countdown_text(self.locale, card.countdown);
                    let mut countdown = RichText::new(text).size(22.0).strong();
                    match BDCViews::countdown_style(card.countdown) {
                        CountdownStyle::Normal => {}
                        CountdownStyle::Urgent => countdown = countdown.color(Color32::RED),
                        CountdownStyle::Departed => countdown = countdown.color(Color32::GRAY),
                    }
                    ui.label(countdown);
                });
            });
        });
        ui.add_space(5.0);
    }
}

fn emphasis_color(emphasis: Emphasis) -> Color32 {
    match emphasis {
        Emphasis::Neutral => Color32::from_rgb(0, 160, 0),
        Emphasis::Warning => Color32::from_rgb(255, 165, 0),
        Emphasis::Alarm => Color32::RED,
    }
}
