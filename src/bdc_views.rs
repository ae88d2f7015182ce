// Views for the bus departure countdown display
use crate::bdc_countdown::Countdown;
use crate::bdc_display::{Card, DisplayState, Placeholder};
use crate::bdc_models::{DelayStatus, SystemHealth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Locale {
    En,
    Ja,
}

/// Visual weight of the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Neutral,
    Warning,
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStyle {
    Normal,
    Urgent,
    Departed,
}

struct Labels {
    on_time: &'static str,
    delayed: &'static str,
    early: &'static str,
    unknown: &'static str,
    health_ok: &'static str,
    health_degraded: &'static str,
    health_error: &'static str,
    unreachable: &'static str,
    departed: &'static str,
    no_data: &'static str,
    loading: &'static str,
    next_bus: &'static str,
    last_updated: &'static str,
    status: &'static str,
    paused: &'static str,
}

const EN: Labels = Labels {
    on_time: "on schedule",
    delayed: "delayed",
    early: "early",
    unknown: "unknown",
    health_ok: "normal",
    health_degraded: "degraded",
    health_error: "failure",
    unreachable: "error - unable to fetch data",
    departed: "departed",
    no_data: "no bus data",
    loading: "loading data...",
    next_bus: "next bus",
    last_updated: "Last updated",
    status: "System status",
    paused: "paused",
};

const JA: Labels = Labels {
    on_time: "定刻通り",
    delayed: "遅延",
    early: "早発",
    unknown: "不明",
    health_ok: "正常",
    health_degraded: "低下",
    health_error: "障害",
    unreachable: "エラー - データを取得できません",
    departed: "発車済み",
    no_data: "バス情報がありません",
    loading: "データを読み込み中...",
    next_bus: "次のバス",
    last_updated: "最終更新",
    status: "システム状態",
    paused: "一時停止中",
};

pub const TIME_PLACEHOLDER: &str = "--:--";
pub const STOP_PLACEHOLDER: &str = "-";

pub struct BDCViews;

impl BDCViews {
    fn labels(locale: Locale) -> &'static Labels {
        match locale {
            Locale::En => &EN,
            Locale::Ja => &JA,
        }
    }

    pub fn delay_label(locale: Locale, status: DelayStatus) -> &'static str {
        let labels = Self::labels(locale);
        match status {
            DelayStatus::OnTime => labels.on_time,
            DelayStatus::Delayed => labels.delayed,
            DelayStatus::Early => labels.early,
            DelayStatus::Unknown => labels.unknown,
        }
    }

    pub fn health_label(locale: Locale, health: SystemHealth) -> &'static str {
        let labels = Self::labels(locale);
        match health {
            SystemHealth::Ok => labels.health_ok,
            SystemHealth::Degraded => labels.health_degraded,
            SystemHealth::Error => labels.health_error,
            SystemHealth::Unreachable => labels.unreachable,
        }
    }

    pub fn health_emphasis(health: SystemHealth) -> Emphasis {
        match health {
            SystemHealth::Ok => Emphasis::Neutral,
            SystemHealth::Degraded => Emphasis::Warning,
            SystemHealth::Error | SystemHealth::Unreachable => Emphasis::Alarm,
        }
    }

    pub fn placeholder_label(locale: Locale, placeholder: Placeholder) -> &'static str {
        let labels = Self::labels(locale);
        match placeholder {
            Placeholder::Loading => labels.loading,
            Placeholder::NoData => labels.no_data,
        }
    }

    pub fn next_bus_label(locale: Locale) -> &'static str {
        Self::labels(locale).next_bus
    }

    pub fn last_updated_label(locale: Locale) -> &'static str {
        Self::labels(locale).last_updated
    }

    pub fn status_label(locale: Locale) -> &'static str {
        Self::labels(locale).status
    }

    pub fn paused_label(locale: Locale) -> &'static str {
        Self::labels(locale).paused
    }

    pub fn format_minutes(locale: Locale, minutes: Option<u32>) -> String {
        match (locale, minutes) {
            (Locale::En, None) => "-- min".to_string(),
            (Locale::En, Some(1)) => "1 minute".to_string(),
            (Locale::En, Some(n)) => format!("{} minutes", n),
            (Locale::Ja, None) => "--分".to_string(),
            (Locale::Ja, Some(n)) => format!("{}分", n),
        }
    }

    pub fn countdown_text(locale: Locale, countdown: Countdown) -> String {
        match countdown {
            Countdown::Departed => Self::labels(locale).departed.to_string(),
            other => Self::format_minutes(locale, other.remaining()),
        }
    }

    pub fn countdown_style(countdown: Countdown) -> CountdownStyle {
        if countdown.is_departed() {
            CountdownStyle::Departed
        } else if countdown.is_urgent() {
            CountdownStyle::Urgent
        } else {
            CountdownStyle::Normal
        }
    }

    // ========================================================================
    // Terminal Rendering
    // ========================================================================

    /// Full terminal frame for the current state
    pub fn render_terminal(state: &DisplayState, locale: Locale) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}\n", "═".repeat(60)));
        out.push_str("  🚌 BUS DEPARTURES\n");
        out.push_str(&format!("{}\n", "═".repeat(60)));

        let updated = state.last_updated.as_deref().unwrap_or(TIME_PLACEHOLDER);
        out.push_str(&format!("  🕐 {}: {}\n", Self::last_updated_label(locale), updated));

        if let Some(health) = state.health {
            let label = Self::health_label(locale, health);
            out.push_str(&format!(
                "  📡 {}: {}\n",
                Self::status_label(locale),
                Self::paint(label, Self::emphasis_ansi(Self::health_emphasis(health)))
            ));
        }

        if !state.visible {
            out.push_str(&format!("  ⏸  {}\n", Self::paused_label(locale)));
        }

        out.push_str(&format!("{}\n", "─".repeat(60)));

        if let Some(placeholder) = state.placeholder {
            out.push_str(&format!("\n  {}\n\n", Self::placeholder_label(locale, placeholder)));
        } else {
            for (i, card) in state.cards.iter().enumerate() {
                if i > 0 {
                    out.push_str(&format!("{}\n", "  ┄".repeat(20)));
                }
                out.push_str(&Self::render_card(card, locale));
            }
        }

        out.push_str(&format!("{}\n", "═".repeat(60)));
        out.push_str("  [h] hide  [s] show  [q] quit\n");
        out
    }

    fn render_card(card: &Card, locale: Locale) -> String {
        let entry = &card.entry;
        let countdown = Self::countdown_text(locale, card.countdown);
        let style = match Self::countdown_style(card.countdown) {
            CountdownStyle::Normal => None,
            CountdownStyle::Urgent => Some("31"),
            CountdownStyle::Departed => Some("90"),
        };

        let mut out = format!("  🎯 {}  [{}]", entry.destination, entry.bus_number);
        if entry.is_next_bus {
            out.push_str(&format!("  ★ {}", Self::next_bus_label(locale)));
        }
        out.push('\n');

        out.push_str(&format!(
            "     ⏱️  {}\n",
            match style {
                Some(code) => Self::paint(&countdown, code),
                None => countdown,
            }
        ));

        let departure = entry.scheduled_departure_time.as_deref().unwrap_or(TIME_PLACEHOLDER);
        let arrival = entry.scheduled_arrival_time.as_deref().unwrap_or(TIME_PLACEHOLDER);
        let stop = entry.stop_number.as_deref().unwrap_or(STOP_PLACEHOLDER);
        out.push_str(&format!("     🚏 {}  {}", stop, departure));
        if let Some(predicted) = &entry.predicted_departure_time {
            out.push_str(&format!(" ({})", predicted));
        }
        out.push_str(&format!(" → {}", arrival));
        if let Some(predicted) = &entry.predicted_arrival_time {
            out.push_str(&format!(" ({})", predicted));
        }
        out.push('\n');

        out.push_str(&format!(
            "     ● {}\n",
            Self::delay_label(locale, entry.delay_status)
        ));
        out
    }

    fn emphasis_ansi(emphasis: Emphasis) -> &'static str {
        match emphasis {
            Emphasis::Neutral => "32",
            Emphasis::Warning => "33",
            Emphasis::Alarm => "31",
        }
    }

    fn paint(text: &str, code: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}
