use std::any::Any;
use std::sync::Arc;

use hearth_shared::{Message, ResRef};

use super::{AttrFamily, AttrKind, Attribute, Drawable};
use crate::error::GobResult;
use crate::object::Owner;
use crate::resource::Resource;
use crate::scene::{Frame, NodeKey, SlotRef};

/// Visual body built from a resource.
///
/// Attaching resolves the resource, so installing one whose resource is
/// still loading defers.
#[derive(Debug)]
pub struct ResDrawable {
    res: ResRef,
    payload: Message,
    resolved: Option<Arc<Resource>>,
    age: f64,
    frames: u64,
}

impl ResDrawable {
    /// A body for `res` with its creation payload.
    #[must_use]
    pub fn new(res: ResRef, payload: Message) -> Self {
        Self {
            res,
            payload,
            resolved: None,
            age: 0.0,
            frames: 0,
        }
    }

    /// Creation payload.
    #[must_use]
    pub fn payload(&self) -> &Message {
        &self.payload
    }

    /// Seconds of simulation since install.
    #[must_use]
    pub fn age(&self) -> f64 {
        self.age
    }

    /// Frames prepared.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Attribute for ResDrawable {
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
        self.age += dt;
    }

    fn gtick(&mut self, frame: &mut Frame) {
        self.frames += 1;
        frame.prepared += 1;
    }

    fn is_node(&self) -> bool {
        true
    }

    fn populate(&mut self, slot: &SlotRef, owner: &Owner<'_>) -> GobResult<()> {
        let res = owner.glob.resources().resolve(self.res)?;
        slot.add_child(NodeKey::fresh("mesh"))?;
        self.resolved = Some(res);
        Ok(())
    }

    fn as_drawable(&self) -> Option<&dyn Drawable> {
        Some(self)
    }

    fn dispose(&mut self) {
        self.resolved = None;
    }
}

impl AttrKind for ResDrawable {
    const FAMILY: AttrFamily = AttrFamily::DRAWABLE;
}

impl Drawable for ResDrawable {
    fn resource_ref(&self) -> ResRef {
        self.res
    }

    fn resource(&self) -> Option<&Arc<Resource>> {
        self.resolved.as_ref()
    }
}
