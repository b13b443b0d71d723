// src/font_config.rs

// Font setup for plot rendering.
// plotters is built with the ab_glyph text backend, which only knows fonts
// registered at runtime, so a system TTF is registered once under
// FONT_FAMILY before the first chart is drawn.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};
use tracing::{debug, warn};

use crate::constants::{FONT_SIZE_AXIS_LABEL, FONT_SIZE_CHART_TITLE, FONT_SIZE_LEGEND, FONT_SIZE_MESSAGE};

/// Family name every plot uses.
pub const FONT_FAMILY: &str = "sans-serif";

/// Environment variable that overrides the font search.
pub const FONT_PATH_ENV: &str = "SHAPER_TUNER_FONT";

const SYSTEM_FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

// Tuple representations for use with plotters' IntoFont trait
pub const FONT_TUPLE_CHART_TITLE: (&str, i32) = (FONT_FAMILY, FONT_SIZE_CHART_TITLE);
pub const FONT_TUPLE_AXIS_LABEL: (&str, i32) = (FONT_FAMILY, FONT_SIZE_AXIS_LABEL);
pub const FONT_TUPLE_LEGEND: (&str, i32) = (FONT_FAMILY, FONT_SIZE_LEGEND);
pub const FONT_TUPLE_MESSAGE: (&str, i32) = (FONT_FAMILY, FONT_SIZE_MESSAGE);

static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

fn find_system_font_bytes() -> Option<&'static [u8]> {
    let override_path = std::env::var(FONT_PATH_ENV).ok();
    let candidates = override_path
        .iter()
        .map(String::as_str)
        .chain(SYSTEM_FONT_CANDIDATES.iter().copied());
    for p in candidates {
        if Path::new(p).exists() {
            if let Ok(bytes) = fs::read(p) {
                debug!(path = p, "Using system font for plots");
                // Leaked once; the text backend needs 'static bytes.
                let leaked: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                return Some(leaked);
            }
        }
    }
    None
}

/// Registers the plot font on first use. Returns `false` when no usable font exists,
/// in which case charts cannot be rendered.
pub fn ensure_font_registered() -> bool {
    *FONT_REGISTERED.get_or_init(|| match find_system_font_bytes() {
        Some(bytes) => match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => true,
            Err(_) => {
                warn!("System font could not be parsed; plots disabled");
                false
            }
        },
        None => {
            warn!("No system font found; plots disabled (set {FONT_PATH_ENV} to a .ttf file)");
            false
        }
    })
}
