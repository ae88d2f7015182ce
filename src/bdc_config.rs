// Command-line and environment configuration
use crate::bdc_models::DisplayZone;
use crate::bdc_views::Locale;
use chrono_tz::Tz;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api/bus-info";

#[derive(Debug, Clone, Parser)]
#[command(name = "bdc", version, about = "Live bus departure countdown display")]
pub struct Config {
    /// Bus info endpoint returning the departure snapshot
    #[arg(long, env = "BDC_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Seconds between snapshot refreshes
    #[arg(
        long,
        env = "BDC_REFRESH_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_secs: u64,

    /// Language of the display labels
    #[arg(long, env = "BDC_LOCALE", value_enum, default_value_t = Locale::En)]
    pub locale: Locale,

    /// IANA zone for the "last updated" time (defaults to the local zone)
    #[arg(long, env = "BDC_TIMEZONE", value_parser = parse_zone)]
    pub timezone: Option<Tz>,

    /// Open a desktop window instead of the terminal display
    #[arg(long, env = "BDC_GUI")]
    pub gui: bool,
}

fn parse_zone(raw: &str) -> Result<Tz, String> {
    raw.parse::<Tz>().map_err(|e| e.to_string())
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn zone(&self) -> DisplayZone {
        match self.timezone {
            Some(tz) => DisplayZone::Named(tz),
            None => DisplayZone::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["bdc"]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.zone(), DisplayZone::Local);
        assert!(!config.gui);
    }

    #[test]
    fn explicit_flags() {
        let config = Config::try_parse_from([
            "bdc",
            "--api-url",
            "http://bus.local/api/bus-info",
            "--refresh-secs",
            "15",
            "--locale",
            "ja",
            "--timezone",
            "Asia/Tokyo",
            "--gui",
        ])
        .unwrap();

        assert_eq!(config.api_url, "http://bus.local/api/bus-info");
        assert_eq!(config.refresh_interval(), Duration::from_secs(15));
        assert_eq!(config.locale, Locale::Ja);
        assert_eq!(config.zone(), DisplayZone::Named(chrono_tz::Asia::Tokyo));
        assert!(config.gui);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::try_parse_from(["bdc", "--refresh-secs", "0"]).is_err());
        assert!(Config::try_parse_from(["bdc", "--timezone", "Mars/Olympus"]).is_err());
        assert!(Config::try_parse_from(["bdc", "--locale", "fr"]).is_err());
    }
}
