//! # Resources
//!
//! A resource is named, loaded asynchronously, and may publish factories:
//! one that derives a resource-backed attribute from a payload, one that
//! builds an overlay sprite. A factory comes either as a shared object or
//! as a plain constructor function; [`AttrFactory`] and [`SpriteFactory`]
//! unify both.

pub mod mock;

use std::fmt;
use std::sync::Arc;

use hearth_shared::{Coord2d, Message, ResRef};

use crate::deferred::Deferred;
use crate::error::{GobError, GobResult};
use crate::object::Owner;
use crate::overlay::Sprite;
use crate::resattr::ResAttr;

/// Builds resource-backed attributes.
pub trait MakeResAttr: Send + Sync {
    /// Derives an attribute from `payload`.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if something it needs is not ready.
    fn make(&self, owner: &Owner<'_>, payload: &Message) -> GobResult<Box<dyn ResAttr>>;
}

/// Builds overlay sprites.
pub trait MakeSprite: Send + Sync {
    /// Creates a sprite from its creation payload.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if something it needs is not ready.
    fn make(&self, owner: &Owner<'_>, res: &Resource, payload: &Message) -> GobResult<Box<dyn Sprite>>;
}

/// Plain constructor form of [`MakeResAttr`].
pub type ResAttrCtor = fn(&Owner<'_>, &Message) -> GobResult<Box<dyn ResAttr>>;

/// Plain constructor form of [`MakeSprite`].
pub type SpriteCtor = fn(&Owner<'_>, &Resource, &Message) -> GobResult<Box<dyn Sprite>>;

/// Either way of publishing a resource-backed attribute factory.
#[derive(Clone)]
pub enum AttrFactory {
    /// A factory object.
    Factory(Arc<dyn MakeResAttr>),
    /// A constructor function.
    Constructor(ResAttrCtor),
}

impl AttrFactory {
    /// Runs the factory.
    ///
    /// # Errors
    ///
    /// Whatever the factory returns.
    pub fn make(&self, owner: &Owner<'_>, payload: &Message) -> GobResult<Box<dyn ResAttr>> {
        match self {
            Self::Factory(f) => f.make(owner, payload),
            Self::Constructor(ctor) => ctor(owner, payload),
        }
    }
}

/// Either way of publishing a sprite factory.
#[derive(Clone)]
pub enum SpriteFactory {
    /// A factory object.
    Factory(Arc<dyn MakeSprite>),
    /// A constructor function.
    Constructor(SpriteCtor),
}

impl SpriteFactory {
    /// Runs the factory.
    ///
    /// # Errors
    ///
    /// Whatever the factory returns.
    pub fn make(&self, owner: &Owner<'_>, res: &Resource, payload: &Message) -> GobResult<Box<dyn Sprite>> {
        match self {
            Self::Factory(f) => f.make(owner, res, payload),
            Self::Constructor(ctor) => ctor(owner, res, payload),
        }
    }
}

/// A loaded resource.
#[derive(Clone)]
pub struct Resource {
    name: String,
    attr: Option<AttrFactory>,
    sprite: Option<SpriteFactory>,
    bounds: Option<(Coord2d, Coord2d)>,
}

impl Resource {
    /// A resource publishing nothing.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr: None,
            sprite: None,
            bounds: None,
        }
    }

    /// Publishes an attribute factory.
    #[must_use]
    pub fn with_attr(mut self, factory: AttrFactory) -> Self {
        self.attr = Some(factory);
        self
    }

    /// Publishes a sprite factory.
    #[must_use]
    pub fn with_sprite(mut self, factory: SpriteFactory) -> Self {
        self.sprite = Some(factory);
        self
    }

    /// Sets the ground-plane collision box.
    #[must_use]
    pub fn with_bounds(mut self, min: Coord2d, max: Coord2d) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Resource name, e.g. `gfx/fx/floatimg`.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collision box, if the resource has one.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<(Coord2d, Coord2d)> {
        self.bounds
    }

    /// The attribute factory.
    ///
    /// # Errors
    ///
    /// [`GobError::NoFactory`] if none is published.
    pub fn attr_factory(&self) -> GobResult<&AttrFactory> {
        self.attr.as_ref().ok_or_else(|| GobError::NoFactory {
            resource: self.name.clone(),
            kind: "attribute",
        })
    }

    /// The sprite factory.
    ///
    /// # Errors
    ///
    /// [`GobError::NoFactory`] if none is published.
    pub fn sprite_factory(&self) -> GobResult<&SpriteFactory> {
        self.sprite.as_ref().ok_or_else(|| GobError::NoFactory {
            resource: self.name.clone(),
            kind: "sprite",
        })
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("attr", &self.attr.is_some())
            .field("sprite", &self.sprite.is_some())
            .finish_non_exhaustive()
    }
}

/// Where resources come from.
pub trait ResourceSource: Send + Sync {
    /// Looks up a resource, which may still be loading.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] until the resource is available.
    fn resolve(&self, res: ResRef) -> Deferred<Arc<Resource>>;
}
