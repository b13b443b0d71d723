// src/data_input/shaper_echo.rs

//! Backup and restore of the controller's active shaper settings.
//!
//! The controller answers a bare `M593` with one echo line per axis, e.g.
//! `echo:  M593 X F40.00 D0.10`. Those values are captured before a test
//! (which disables shaping with `M593 F0`) and re-sent afterwards.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis_names::TestAxis;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShaperSetting {
    pub frequency_hz: f64,
    pub damping_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedShaperSettings {
    pub x: Option<ShaperSetting>,
    pub y: Option<ShaperSetting>,
}

impl SavedShaperSettings {
    pub fn get(&self, axis: TestAxis) -> Option<ShaperSetting> {
        match axis {
            TestAxis::X => self.x,
            TestAxis::Y => self.y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }

    /// Commands that put the saved settings back, X first.
    pub fn restore_commands(&self) -> Vec<String> {
        TestAxis::ALL
            .iter()
            .filter_map(|&axis| {
                self.get(axis).map(|s| {
                    format!("M593 {} F{:.2} D{}", axis, s.frequency_hz, s.damping_ratio)
                })
            })
            .collect()
    }
}

/// Collects `M593 <AXIS> F.. D..` echo lines. Later lines for the same axis win;
/// anything else is ignored.
pub fn parse_shaper_echo<'a, I>(lines: I) -> SavedShaperSettings
where
    I: IntoIterator<Item = &'a str>,
{
    let mut saved = SavedShaperSettings::default();
    for line in lines {
        if let Some((axis, setting)) = parse_echo_line(line) {
            debug!(%axis, frequency_hz = setting.frequency_hz, damping = setting.damping_ratio, "Captured shaper echo");
            match axis {
                TestAxis::X => saved.x = Some(setting),
                TestAxis::Y => saved.y = Some(setting),
            }
        }
    }
    saved
}

fn parse_echo_line(line: &str) -> Option<(TestAxis, ShaperSetting)> {
    let start = line.find("M593")?;
    let mut tokens = line[start + 4..].split_whitespace();
    let axis: TestAxis = tokens.next()?.parse().ok()?;
    let frequency_hz = tokens.next()?.strip_prefix('F')?.parse::<f64>().ok()?;
    let damping_ratio = tokens.next()?.strip_prefix('D')?.parse::<f64>().ok()?;
    if !(frequency_hz.is_finite() && damping_ratio.is_finite()) {
        return None;
    }
    Some((axis, ShaperSetting { frequency_hz, damping_ratio }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_axes() {
        let lines = [
            "echo:; Input Shaping:",
            "echo:  M593 X F40.00 D0.10",
            "echo:  M593 Y F38.50 D0.15",
            "ok",
        ];
        let saved = parse_shaper_echo(lines);
        assert_eq!(saved.x, Some(ShaperSetting { frequency_hz: 40.0, damping_ratio: 0.1 }));
        assert_eq!(saved.y, Some(ShaperSetting { frequency_hz: 38.5, damping_ratio: 0.15 }));
    }

    #[test]
    fn test_ignores_disable_and_garbage() {
        let saved = parse_shaper_echo(["M593 F0", "M593 Z F10 D0.1", "M593 X Fabc D0.1"]);
        assert!(saved.is_empty());
    }

    #[test]
    fn test_restore_commands() {
        let saved = SavedShaperSettings {
            x: Some(ShaperSetting { frequency_hz: 40.0, damping_ratio: 0.1 }),
            y: None,
        };
        assert_eq!(saved.restore_commands(), vec!["M593 X F40.00 D0.1".to_string()]);
    }
}

// src/data_input/shaper_echo.rs
