use std::any::Any;
use std::sync::Arc;

use super::{AttrFamily, AttrKind, Attribute, SetupMod};
use crate::deferred::Deferred;
use crate::object::Owner;
use crate::scene::Op;

/// Render-state tint applied while a highlight is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightTint {
    /// RGBA colour.
    pub colour: [u8; 4],
    /// Fade level, 0 to 15.
    pub level: u8,
}

/// Fading selection highlight.
#[derive(Debug, Clone)]
pub struct Highlight {
    colour: [u8; 4],
    duration: f64,
    remaining: f64,
}

impl Highlight {
    /// Fade length in seconds.
    pub const DEFAULT_DURATION: f64 = 2.0;

    /// An inactive highlight.
    #[must_use]
    pub fn new(colour: [u8; 4]) -> Self {
        Self {
            colour,
            duration: Self::DEFAULT_DURATION,
            remaining: 0.0,
        }
    }

    /// Restarts the fade.
    pub fn start(&mut self) {
        self.remaining = self.duration;
    }

    /// Whether the tint is still visible.
    #[must_use]
    pub fn active(&self) -> bool {
        self.remaining > 0.0
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn level(&self) -> u8 {
        ((self.remaining / self.duration) * 15.0).ceil().clamp(0.0, 15.0) as u8
    }
}

impl Default for Highlight {
    fn default() -> Self {
        Self::new([64, 255, 64, 128])
    }
}

impl Attribute for Highlight {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn ctick(&mut self, _owner: &Owner<'_>, dt: f64) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    fn setup_mod(&self) -> Option<&dyn SetupMod> {
        Some(self)
    }
}

impl AttrKind for Highlight {
    const FAMILY: AttrFamily = AttrFamily::HIGHLIGHT;
}

impl SetupMod for Highlight {
    fn gob_state(&self) -> Deferred<Option<Op>> {
        if !self.active() {
            return Ok(None);
        }
        Ok(Some(Arc::new(HighlightTint {
            colour: self.colour,
            level: self.level(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_levels_step_down() {
        let mut h = Highlight::default();
        assert!(h.gob_state().unwrap().is_none());
        h.start();
        assert_eq!(h.level(), 15);
        h.remaining = h.duration / 2.0;
        assert_eq!(h.level(), 8);
        h.remaining = 0.0;
        assert!(!h.active());
    }
}
