//! Default configuration file generation.
//!
//! The generated file documents every setting inline, with comments aligned
//! in one column by [`ConfigBuilder`].

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::calc::method::{CalculationMethod, LatitudeAdjustment, MidnightMode, School};
use crate::common::constants::*;
use crate::prayer::Prayer;

/// Placeholder location written to a new config: the Kaaba, Makkah.
const PLACEHOLDER_LOCATION: (f64, f64, &str) = (21.4225, 39.8262, "Asia/Riyadh");

/// Create a default config file at `path`.
///
/// The location is a placeholder the user is expected to edit.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let (lat, lon, timezone) = PLACEHOLDER_LOCATION;
    log_indented!("Using a placeholder location (Makkah)");
    log_indented!("Edit latitude, longitude and timezone to match your location");

    fs::write(path, default_config_content(lat, lon, timezone))
        .context("Failed to write default config file")?;
    Ok(())
}

/// Text of a default config for the given location.
pub fn default_config_content(lat: f64, lon: f64, timezone: &str) -> String {
    let methods: Vec<&str> = CalculationMethod::ALL.iter().map(|m| m.key()).collect();

    let mut builder = ConfigBuilder::new()
        .add_section("Location")
        .add_setting(
            "latitude",
            &format!("{lat:.6}"),
            &format!("Geographic latitude ({MINIMUM_LATITUDE} to {MAXIMUM_LATITUDE})"),
        )
        .add_setting(
            "longitude",
            &format!("{lon:.6}"),
            &format!("Geographic longitude ({MINIMUM_LONGITUDE} to {MAXIMUM_LONGITUDE})"),
        )
        .add_setting(
            "timezone",
            &format!("\"{timezone}\""),
            "IANA timezone that defines the calendar day",
        )
        .add_section("Calculation")
        .add_setting(
            "method",
            &format!("\"{}\"", CalculationMethod::default().key()),
            &format!("One of: {}", methods.join(", ")),
        )
        .add_setting(
            "school",
            &format!("\"{}\"", enum_key(School::default())),
            "Asr shadow length: \"shafi\" (1x) or \"hanafi\" (2x)",
        )
        .add_setting(
            "midnight_mode",
            &format!("\"{}\"", enum_key(MidnightMode::default())),
            "\"standard\" (sunset to sunrise) or \"jafari\" (sunset to Fajr)",
        )
        .add_setting(
            "latitude_adjustment",
            &format!("\"{}\"", enum_key(LatitudeAdjustment::default())),
            "\"middle_of_the_night\", \"one_seventh\" or \"angle_based\"",
        )
        .add_commented_setting(
            "fajr_angle",
            "18.0",
            &format!(
                "Override the method's Fajr angle ({MINIMUM_TWILIGHT_ANGLE}-{MAXIMUM_TWILIGHT_ANGLE} degrees)"
            ),
        )
        .add_commented_setting(
            "maghrib_angle",
            "\"0 min\"",
            "Override Maghrib: degrees, or \"N min\" after sunset",
        )
        .add_commented_setting(
            "isha_angle",
            "17.0",
            "Override Isha: degrees, or \"N min\" after Maghrib",
        )
        .add_section("Refresh")
        .add_setting(
            "source",
            "\"local\"",
            "\"local\" (offline) or \"remote\" (Aladhan API, needs the remote feature)",
        )
        .add_commented_setting("api_url", &format!("\"{DEFAULT_API_URL}\""), "Remote API endpoint")
        .add_setting(
            "calculator_timeout",
            &DEFAULT_CALCULATOR_TIMEOUT_SECS.to_string(),
            &format!(
                "Seconds before a calculation is abandoned ({MINIMUM_CALCULATOR_TIMEOUT_SECS}-{MAXIMUM_CALCULATOR_TIMEOUT_SECS})"
            ),
        )
        .add_setting(
            "retry_base",
            &DEFAULT_RETRY_BASE_SECS.to_string(),
            "First retry delay in seconds after a failed refresh",
        )
        .add_setting(
            "retry_max",
            &DEFAULT_RETRY_MAX_SECS.to_string(),
            "Longest retry delay in seconds",
        )
        .add_table("offsets", "Minutes added to each time (negative for earlier)");

    for prayer in Prayer::ALL {
        builder = builder.add_setting(&prayer.as_str().to_lowercase(), "0", prayer.as_str());
    }

    builder.build()
}

/// Serialized key of a unit enum variant.
fn enum_key<T: serde::Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Builder for configuration files with properly aligned comments.
///
/// This builder maintains proper comment alignment by calculating the maximum
/// width of all setting lines and applying consistent padding, so changing a
/// default in constants.rs never breaks the file's layout.
struct ConfigBuilder {
    entries: Vec<EntryType>,
}

#[derive(Clone)]
enum EntryType {
    /// `#[Title]` comment heading.
    Section(String),
    /// `[name]` TOML table header with a trailing comment.
    Table { line: String, comment: String },
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(EntryType::Section(format!("#[{title}]")));
        self
    }

    fn add_table(mut self, name: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Table {
            line: format!("[{name}]"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// Setting written commented out, documenting an optional key.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Setting {
            line: format!("# {key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        // One space between the longest setting and its comment
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                EntryType::Setting { line, .. } | EntryType::Table { line, .. } => {
                    Some(line.len())
                }
                EntryType::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_heading = true;

        for entry in self.entries {
            match entry {
                EntryType::Section(heading) => {
                    if !first_heading {
                        result.push(String::new());
                    }
                    result.push(heading);
                    first_heading = false;
                }
                EntryType::Table { line, comment } => {
                    if !first_heading {
                        result.push(String::new());
                    }
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                    first_heading = false;
                }
                EntryType::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.push(String::new());
        result.join("\n")
    }
}
