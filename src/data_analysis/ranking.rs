// src/data_analysis/ranking.rs

use std::cmp::Ordering;

use serde::Serialize;
use tracing::info;

use crate::axis_names::TestAxis;
use crate::data_analysis::shaper_evaluation::{EvaluationResult, ShaperTable};

/// The chosen shaper and the command that applies it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecommendation {
    pub best: EvaluationResult,
    pub axis: TestAxis,
    pub damping_ratio: f64,
    pub command: String,
}

/// `M593 <AXIS> F<freq> D<damping>`, both to two decimals.
pub fn format_command(axis: TestAxis, freq_hz: f64, damping_ratio: f64) -> String {
    format!("M593 {axis} F{freq_hz:.2} D{damping_ratio:.2}")
}

/// Index into `table` of the preferred shaper.
///
/// Candidates whose residual is within `epsilon` (relative) of the lowest
/// residual compete on achievable acceleration; remaining ties go to the
/// shaper with fewer impulses. Outside the band, lower residual always wins.
pub fn select_best(table: &ShaperTable, epsilon: f64) -> usize {
    let min_residual = table
        .iter()
        .map(|r| r.residual_vibration)
        .fold(f64::INFINITY, f64::min);
    let threshold = min_residual * (1.0 + epsilon.max(0.0));

    let mut best: Option<usize> = None;
    for (i, candidate) in table.iter().enumerate() {
        if candidate.residual_vibration > threshold {
            continue;
        }
        best = match best {
            Some(b) if prefer(&table[b], candidate) != Ordering::Less => Some(b),
            _ => Some(i),
        };
    }
    // Every residual is finite, so the global minimum is always in the band.
    best.unwrap_or(0)
}

/// `Greater` when `a` is preferred over `b`.
fn prefer(a: &EvaluationResult, b: &EvaluationResult) -> Ordering {
    a.achievable_accel
        .total_cmp(&b.achievable_accel)
        .then_with(|| {
            b.shaper_type
                .impulse_count()
                .cmp(&a.shaper_type.impulse_count())
        })
        .then_with(|| b.residual_vibration.total_cmp(&a.residual_vibration))
}

/// Picks the recommendation from a full evaluation table.
pub fn rank(
    table: &ShaperTable,
    axis: TestAxis,
    damping_ratio: f64,
    epsilon: f64,
) -> RankedRecommendation {
    let best = table[select_best(table, epsilon)];
    let command = format_command(axis, best.center_freq_hz, damping_ratio);
    info!(
        shaper = %best.shaper_type,
        center_freq_hz = best.center_freq_hz,
        accel = best.achievable_accel,
        %command,
        "Recommended shaper"
    );
    RankedRecommendation {
        best,
        axis,
        damping_ratio,
        command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::shaper_bank::ShaperType;
    use crate::data_analysis::shaper_evaluation::achievable_accel;

    fn table(residuals: [f64; 5]) -> ShaperTable {
        let mut i = 0;
        ShaperType::ALL.map(|shaper_type| {
            let r = EvaluationResult {
                shaper_type,
                center_freq_hz: 50.0,
                residual_vibration: residuals[i],
                achievable_accel: achievable_accel(shaper_type, 1000.0, 8000.0),
            };
            i += 1;
            r
        })
    }

    #[test]
    fn test_within_epsilon_prefers_higher_accel() {
        // EI is the minimum, MZV is 4% worse but faster.
        let t = table([2.0, 1.04, 1.0, 1.5, 1.5]);
        assert_eq!(t[select_best(&t, 0.05)].shaper_type, ShaperType::Mzv);
    }

    #[test]
    fn test_outside_epsilon_prefers_lower_residual() {
        // MZV is 20% worse: out of band despite the higher acceleration.
        let t = table([2.0, 1.2, 1.0, 1.5, 1.5]);
        assert_eq!(t[select_best(&t, 0.05)].shaper_type, ShaperType::Ei);
    }

    #[test]
    fn test_equal_accel_prefers_fewer_impulses() {
        let mut t = table([1.0, 1.0, 1.0, 1.0, 1.0]);
        for r in t.iter_mut() {
            r.achievable_accel = 1000.0;
        }
        t[0].residual_vibration = 5.0;
        assert_eq!(t[select_best(&t, 0.1)].shaper_type, ShaperType::Mzv);
    }

    #[test]
    fn test_zero_epsilon_is_pure_minimum() {
        let t = table([1.0001, 1.00005, 1.0, 1.2, 1.3]);
        assert_eq!(t[select_best(&t, 0.0)].shaper_type, ShaperType::Ei);
    }

    #[test]
    fn test_command_format() {
        assert_eq!(format_command(TestAxis::X, 50.0, 0.05), "M593 X F50.00 D0.05");
        assert_eq!(format_command(TestAxis::Y, 37.256, 0.1), "M593 Y F37.26 D0.10");
    }

    #[test]
    fn test_rank_builds_command_from_best() {
        let mut t = table([3.0, 2.0, 1.0, 1.05, 1.02]);
        t[2].center_freq_hz = 48.5;
        let rec = rank(&t, TestAxis::X, 0.05, 0.10);
        assert_eq!(rec.best.shaper_type, ShaperType::Ei);
        assert_eq!(rec.command, "M593 X F48.50 D0.05");
    }
}
