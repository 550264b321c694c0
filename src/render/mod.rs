//! PNG chart rendering with `plotters`.
//!
//! Text is drawn with a bundled DejaVu Sans, so output does not depend on
//! the fonts installed on the host.
//!
//! Each renderer owns its bitmap backend for the duration of one call and
//! flushes it with `present()`; the surface is released when it goes out of
//! scope, on success or error.

pub mod distribution;
pub mod signal;

use std::ops::Range;
use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};

use crate::error::{AnalysisError, Result};

/// Family every chart draws its text with.
pub const FONT_FAMILY: &str = "sans-serif";

static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Register the bundled font under [`FONT_FAMILY`] once per process.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(AnalysisError::Render("bundled font could not be loaded".into()))
    }
}

fn render_err(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

/// Y range covering the finite values of `values` with a 10% margin.
/// Falls back to `-1..1` when there is nothing finite to show.
pub fn padded_range(values: &[f64]) -> Range<f64> {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return -1.0..1.0;
    }
    if max == min {
        return (min - 1.0)..(max + 1.0);
    }
    let margin = (max - min) * 0.1;
    (min - margin)..(max + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_font_registers() {
        ensure_font().unwrap();
        ensure_font().unwrap();
    }

    #[test]
    fn range_adds_margin() {
        let r = padded_range(&[0.0, 10.0, 5.0]);
        assert!((r.start + 1.0).abs() < 1e-12);
        assert!((r.end - 11.0).abs() < 1e-12);
    }

    #[test]
    fn range_of_constant_signal_is_widened() {
        assert_eq!(padded_range(&[3.0, 3.0]), 2.0..4.0);
    }

    #[test]
    fn range_ignores_non_finite_values() {
        assert_eq!(padded_range(&[]), -1.0..1.0);
        assert_eq!(padded_range(&[f64::NAN]), -1.0..1.0);
        let r = padded_range(&[f64::NAN, 1.0, 2.0, f64::INFINITY]);
        assert!(r.start < 1.0 && r.end > 2.0 && r.end.is_finite());
    }
}
