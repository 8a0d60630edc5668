use std::any::Any;

use hearth_shared::POSITION_RESOLUTION;

use super::{AttrFamily, AttrKind, Attribute};
use crate::object::Owner;

/// Floating text label over an object.
///
/// The text is rendered lazily on the first simulation tick where labels
/// are enabled and dropped again on dispose.
#[derive(Debug, Default)]
pub struct InfoLabel {
    text: Option<String>,
    renders: u32,
}

impl InfoLabel {
    /// A label with nothing rendered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Number of times the text was rendered.
    #[must_use]
    pub fn renders(&self) -> u32 {
        self.renders
    }

    /// Drops the rendered text so the next tick renders it again.
    pub fn invalidate(&mut self) {
        self.text = None;
    }
}

impl Attribute for InfoLabel {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn ctick(&mut self, owner: &Owner<'_>, _dt: f64) {
        if self.text.is_none() && owner.glob.display().show_info_labels {
            let at = owner.position.floor(POSITION_RESOLUTION);
            self.text = Some(format!("{} @ {},{}", owner.id, at.x, at.y));
            self.renders += 1;
        }
    }

    fn dispose(&mut self) {
        self.text = None;
    }
}

impl AttrKind for InfoLabel {
    const FAMILY: AttrFamily = AttrFamily::INFO;
}
