#![forbid(unsafe_code)]

//! Stagger offsets: cascading start times for a list of reveal steps.
//!
//! The page sections this engine serves reveal their children on ladders
//! like 200/400/600 ms. [`stagger_offsets`] produces such a ladder from a
//! base delay, a spacing, and a distribution mode, so sections declare
//! *how many* steps they have instead of spelling out each constant.
//!
//! # Invariants
//!
//! 1. `stagger_offsets(0, ..)` returns an empty vec.
//! 2. The first offset is always `base`.
//! 3. Offsets are monotonically non-decreasing for every mode.
//! 4. For `Linear`, `offset[i] = base + i * spacing` exactly.
//! 5. For eased modes the span `(count - 1) * spacing` is distributed
//!    along the curve, so the last offset is still `base + span`.

use std::time::Duration;

use super::Easing;

/// How to distribute offsets across items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaggerMode {
    /// Equal spacing.
    #[default]
    Linear,
    /// Spacing follows an easing curve over the whole span.
    Eased(Easing),
}

/// Compute start offsets for `count` items.
#[must_use]
pub fn stagger_offsets(
    count: usize,
    base: Duration,
    spacing: Duration,
    mode: StaggerMode,
) -> Vec<Duration> {
    match count {
        0 => return Vec::new(),
        1 => return vec![base],
        _ => {}
    }

    let easing = match mode {
        // Integer arithmetic keeps linear ladders exact.
        StaggerMode::Linear => {
            return (0..count)
                .map(|i| base.saturating_add(spacing.saturating_mul(i as u32)))
                .collect();
        }
        StaggerMode::Eased(easing) => easing,
    };

    let span_nanos = spacing.as_nanos() as f64 * (count - 1) as f64;
    (0..count)
        .map(|i| {
            let t = i as f32 / (count - 1) as f32;
            let nanos = (span_nanos * f64::from(easing.apply(t))).round() as u64;
            base.saturating_add(Duration::from_nanos(nanos))
        })
        .collect()
}
