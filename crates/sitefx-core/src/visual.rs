#![forbid(unsafe_code)]

//! A ready-made visual state descriptor.
//!
//! The sequencer treats step targets as opaque, so any type works. This is
//! the descriptor the site's sections actually use: opacity plus a
//! translate offset and a scale, which maps onto a CSS `transform`.

/// Opacity, offset, and scale of a revealed element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VisualState {
    pub opacity: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl VisualState {
    /// Fully shown at rest.
    pub const SHOWN: Self = Self {
        opacity: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    /// Transparent, at rest.
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        ..Self::SHOWN
    };

    /// Hidden and shifted down by `px`, ready to rise into place.
    #[must_use]
    pub fn below(px: f32) -> Self {
        Self {
            translate_y: px,
            ..Self::HIDDEN
        }
    }

    /// Hidden and shifted sideways by `px` (negative is left).
    #[must_use]
    pub fn beside(px: f32) -> Self {
        Self {
            translate_x: px,
            ..Self::HIDDEN
        }
    }

    /// Linear interpolation towards `to`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            opacity: mix(self.opacity, to.opacity),
            translate_x: mix(self.translate_x, to.translate_x),
            translate_y: mix(self.translate_y, to.translate_y),
            scale: mix(self.scale, to.scale),
        }
    }

    /// The state as a CSS declaration block.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "opacity: {}; transform: translate({}px, {}px) scale({});",
            self.opacity, self.translate_x, self.translate_y, self.scale
        )
    }
}

impl Default for VisualState {
    fn default() -> Self {
        Self::SHOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(VisualState::HIDDEN.opacity, 0.0);
        assert_eq!(VisualState::below(30.0).translate_y, 30.0);
        assert_eq!(VisualState::beside(-30.0).translate_x, -30.0);
        assert_eq!(VisualState::default(), VisualState::SHOWN);
    }

    #[test]
    fn lerp_midpoint() {
        let mid = VisualState::below(40.0).lerp(&VisualState::SHOWN, 0.5);
        assert_eq!(mid.opacity, 0.5);
        assert_eq!(mid.translate_y, 20.0);
    }

    #[test]
    fn css_output() {
        assert_eq!(
            VisualState::SHOWN.to_css(),
            "opacity: 1; transform: translate(0px, 0px) scale(1);"
        );
    }
}
