use std::any::Any;

use hearth_shared::Coord3f;

use super::{AttrFamily, AttrKind, Attribute};

/// Constant offset added to the object's render position.
#[derive(Debug, Clone, Copy)]
pub struct DrawOffset(pub Coord3f);

impl Attribute for DrawOffset {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl AttrKind for DrawOffset {
    const FAMILY: AttrFamily = AttrFamily::DRAW_OFFSET;
}
