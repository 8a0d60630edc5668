//! # Resource-Backed Attributes
//!
//! The server attaches attributes to objects by naming a resource plus a
//! payload. The resource's factory turns the payload into an attribute of
//! some family. Each family is bound to a single resource for the object's
//! lifetime; a second resource claiming the same family is a consistency
//! violation.
//!
//! Updates whose resource is still loading stay queued as pending loads and
//! are replayed every tick until they construct.

use std::any::Any;
use std::fmt;

use hearth_shared::{Message, ResRef};

use crate::error::{GobError, GobResult};
use crate::object::Owner;

/// Family of a resource-backed attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResAttrFamily(&'static str);

impl ResAttrFamily {
    /// Declares a family.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Family name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for ResAttrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An attribute derived from a resource plus payload.
pub trait ResAttr: Any + Send {
    /// Family this attribute occupies.
    fn family(&self) -> ResAttrFamily;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Tries to absorb a new payload in place.
    ///
    /// Returning `false` makes the cache rebuild the attribute instead.
    fn update(&mut self, _payload: &Message) -> bool {
        false
    }

    /// Releases held resources. Called exactly once.
    fn dispose(&mut self) {}
}

/// Statically known resource-backed attribute kind.
pub trait ResAttrKind: ResAttr + Sized {
    /// The family every instance occupies.
    const FAMILY: ResAttrFamily;
}

/// One family's binding.
pub struct Cell {
    family: ResAttrFamily,
    resid: Option<ResRef>,
    last: Option<Message>,
    attr: Option<Box<dyn ResAttr>>,
}

impl Cell {
    /// Resource bound to this family.
    #[must_use]
    pub fn resource(&self) -> Option<ResRef> {
        self.resid
    }

    /// Payload last applied.
    #[must_use]
    pub fn last_payload(&self) -> Option<&Message> {
        self.last.as_ref()
    }

    /// The derived attribute.
    #[must_use]
    pub fn attr(&self) -> Option<&dyn ResAttr> {
        self.attr.as_deref()
    }

    fn set(&mut self, attr: Box<dyn ResAttr>) {
        if let Some(mut old) = self.attr.replace(attr) {
            old.dispose();
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("family", &self.family)
            .field("resid", &self.resid)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Load {
    resid: ResRef,
    payload: Message,
}

/// Resource-backed attributes of one object.
#[derive(Debug, Default)]
pub struct ResAttrCache {
    cells: Vec<Cell>,
    pending: Vec<Load>,
}

impl ResAttrCache {
    /// Applies `payload` for `resid`.
    ///
    /// Identical payloads are ignored and in-place updates are preferred.
    /// Otherwise the update is queued and replayed at once.
    ///
    /// # Errors
    ///
    /// [`GobError::ConflictingResource`] if the derived family is already
    /// bound to another resource. Missing data never errors; the update
    /// stays pending.
    pub fn set(&mut self, resid: ResRef, payload: Message, owner: &Owner<'_>) -> GobResult<()> {
        if let Some(cell) = self.cells.iter_mut().find(|c| c.resid == Some(resid)) {
            if cell.last.as_ref() == Some(&payload) {
                return Ok(());
            }
            if let Some(attr) = cell.attr.as_mut() {
                if attr.update(&payload) {
                    cell.last = Some(payload);
                    return Ok(());
                }
            }
        }
        self.pending.retain(|l| l.resid != resid);
        self.pending.push(Load { resid, payload });
        self.replay(owner).map(|_| ())
    }

    /// Unbinds `resid`, disposing its attribute and dropping any pending
    /// update for it.
    pub fn remove(&mut self, resid: ResRef) {
        if let Some(idx) = self.cells.iter().position(|c| c.resid == Some(resid)) {
            let mut cell = self.cells.remove(idx);
            if let Some(mut attr) = cell.attr.take() {
                attr.dispose();
            }
        }
        self.pending.retain(|l| l.resid != resid);
    }

    /// Retries every pending update in arrival order. Returns how many
    /// constructed.
    ///
    /// # Errors
    ///
    /// [`GobError::ConflictingResource`], or a factory failure other than
    /// missing data. The offending update is dropped; the existing binding
    /// stays intact.
    pub fn replay(&mut self, owner: &Owner<'_>) -> GobResult<usize> {
        let mut built = 0;
        let mut i = 0;
        while i < self.pending.len() {
            let load = &self.pending[i];
            let mut attr = match construct(load, owner) {
                Ok(a) => a,
                Err(e) if e.is_loading() => {
                    tracing::trace!(object = %owner.id, res = %load.resid, reason = %e, "resource attribute pending");
                    i += 1;
                    continue;
                }
                Err(e) => {
                    self.pending.remove(i);
                    return Err(e);
                }
            };
            let load = self.pending.remove(i);
            let family = attr.family();
            let cell = self.cell_mut(family);
            match cell.resid {
                Some(current) if current != load.resid => {
                    attr.dispose();
                    return Err(GobError::ConflictingResource {
                        family: family.name(),
                        current,
                        incoming: load.resid,
                    });
                }
                _ => cell.resid = Some(load.resid),
            }
            cell.last = Some(load.payload);
            cell.set(attr);
            built += 1;
        }
        Ok(built)
    }

    fn cell_mut(&mut self, family: ResAttrFamily) -> &mut Cell {
        let idx = match self.cells.iter().position(|c| c.family == family) {
            Some(idx) => idx,
            None => {
                self.cells.push(Cell {
                    family,
                    resid: None,
                    last: None,
                    attr: None,
                });
                self.cells.len() - 1
            }
        };
        &mut self.cells[idx]
    }

    /// Binding for `family`.
    #[must_use]
    pub fn cell(&self, family: ResAttrFamily) -> Option<&Cell> {
        self.cells.iter().find(|c| c.family == family)
    }

    /// Typed access.
    #[must_use]
    pub fn get<T: ResAttrKind>(&self) -> Option<&T> {
        self.cell(T::FAMILY)?.attr.as_ref()?.as_any().downcast_ref::<T>()
    }

    /// Number of updates still waiting on data.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether `resid` has a queued update.
    #[must_use]
    pub fn is_pending(&self, resid: ResRef) -> bool {
        self.pending.iter().any(|l| l.resid == resid)
    }

    /// Disposes every attribute and forgets all bindings. Returns how many
    /// were disposed.
    pub(crate) fn dispose_all(&mut self) -> usize {
        self.pending.clear();
        let mut n = 0;
        for mut cell in self.cells.drain(..) {
            if let Some(mut attr) = cell.attr.take() {
                attr.dispose();
                n += 1;
            }
        }
        n
    }
}

fn construct(load: &Load, owner: &Owner<'_>) -> GobResult<Box<dyn ResAttr>> {
    let res = owner.glob.resources().resolve(load.resid)?;
    res.attr_factory()?.make(owner, &load.payload)
}
