//! # Inbound Object Events
//!
//! Server updates, already decoded, as they arrive at the frame driver.
//!
//! ## Event Flow:
//! ```text
//! 1. Session decoder: wire message -> ObjectEvent
//! 2. EventChannel: decoder thread -> frame thread
//! 3. TickDriver: applies events at the start of the simulation tick
//! 4. Still loading? The event waits for its data, then retries
//! ```

use std::fmt;
use std::sync::Arc;

use hearth_core::{AttrFamily, Attribute};
use hearth_shared::{Coord2d, Message, ObjectId, ResRef};

/// Builds a fresh attribute each time an install is attempted.
///
/// Installs that hit missing data are retried later, and a failed install
/// consumes its attribute, so the event carries a constructor instead.
pub type AttrMaker = Arc<dyn Fn() -> Box<dyn Attribute> + Send + Sync>;

// ============================================================================
// OBJECT EVENTS (Session -> Frame driver)
// ============================================================================

/// One decoded update about one object.
#[derive(Clone)]
pub enum ObjectEvent {
    /// The object came into view.
    Create {
        /// Object id.
        id: ObjectId,
        /// Initial position.
        position: Coord2d,
    },
    /// The object moved.
    Move {
        /// Object id.
        id: ObjectId,
        /// New position.
        position: Coord2d,
        /// New facing.
        angle: f64,
    },
    /// Install or replace the attribute of `family`.
    SetAttr {
        /// Object id.
        id: ObjectId,
        /// Family the built attribute belongs to.
        family: AttrFamily,
        /// Attribute constructor.
        make: AttrMaker,
    },
    /// Remove the attribute of `family`.
    DelAttr {
        /// Object id.
        id: ObjectId,
        /// Family to remove.
        family: AttrFamily,
    },
    /// Bind resource data to the object.
    SetResAttr {
        /// Object id.
        id: ObjectId,
        /// Resource whose factory builds the attribute.
        res: ResRef,
        /// Payload for the factory.
        payload: Message,
    },
    /// Unbind resource data.
    DelResAttr {
        /// Object id.
        id: ObjectId,
        /// Resource to unbind.
        res: ResRef,
    },
    /// Add a server overlay.
    AddOverlay {
        /// Object id.
        id: ObjectId,
        /// Server overlay id.
        overlay: i32,
        /// Overlay resource.
        res: ResRef,
        /// Creation payload.
        payload: Message,
        /// Survives sprite completion.
        persistent: bool,
    },
    /// Remove a server overlay.
    RemoveOverlay {
        /// Object id.
        id: ObjectId,
        /// Server overlay id.
        overlay: i32,
    },
    /// The object left view.
    Remove {
        /// Object id.
        id: ObjectId,
    },
}

impl ObjectEvent {
    /// Object the event is about.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Create { id, .. }
            | Self::Move { id, .. }
            | Self::SetAttr { id, .. }
            | Self::DelAttr { id, .. }
            | Self::SetResAttr { id, .. }
            | Self::DelResAttr { id, .. }
            | Self::AddOverlay { id, .. }
            | Self::RemoveOverlay { id, .. }
            | Self::Remove { id } => *id,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Move { .. } => "move",
            Self::SetAttr { .. } => "set-attr",
            Self::DelAttr { .. } => "del-attr",
            Self::SetResAttr { .. } => "set-res-attr",
            Self::DelResAttr { .. } => "del-res-attr",
            Self::AddOverlay { .. } => "add-overlay",
            Self::RemoveOverlay { .. } => "remove-overlay",
            Self::Remove { .. } => "remove",
        }
    }

    /// Install event for an attribute built by `make`.
    #[must_use]
    pub fn set_attr<A, F>(id: ObjectId, make: F) -> Self
    where
        A: hearth_core::AttrKind + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::SetAttr {
            id,
            family: A::FAMILY,
            make: Arc::new(move || Box::new(make()) as Box<dyn Attribute>),
        }
    }
}

impl fmt::Debug for ObjectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetAttr { id, family, .. } => f
                .debug_struct("SetAttr")
                .field("id", id)
                .field("family", family)
                .finish_non_exhaustive(),
            Self::AddOverlay {
                id,
                overlay,
                res,
                persistent,
                ..
            } => f
                .debug_struct("AddOverlay")
                .field("id", id)
                .field("overlay", overlay)
                .field("res", res)
                .field("persistent", persistent)
                .finish_non_exhaustive(),
            other => write!(f, "{}({})", other.kind(), other.id()),
        }
    }
}

// ============================================================================
// EVENT CHANNELS
// ============================================================================

/// Channel carrying events from the session decoder to the frame driver.
pub struct EventChannel<T> {
    sender: crossbeam_channel::Sender<T>,
    receiver: crossbeam_channel::Receiver<T>,
}

impl<T> EventChannel<T> {
    /// Creates a new bounded event channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a new unbounded event channel.
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Sends an event, blocking while a bounded channel is full.
    ///
    /// # Errors
    ///
    /// Returns the event if every receiver is gone.
    pub fn send(&self, event: T) -> Result<(), crossbeam_channel::SendError<T>> {
        self.sender.send(event)
    }

    /// Tries to send an event (returns immediately).
    ///
    /// # Errors
    ///
    /// Returns the event if the channel is full or disconnected.
    pub fn try_send(&self, event: T) -> Result<(), crossbeam_channel::TrySendError<T>> {
        self.sender.try_send(event)
    }

    /// Tries to receive an event (non-blocking).
    ///
    /// # Errors
    ///
    /// Empty or disconnected.
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Gets a clone of the sender for another thread.
    #[must_use]
    pub fn sender(&self) -> crossbeam_channel::Sender<T> {
        self.sender.clone()
    }

    /// Gets a clone of the receiver for another thread.
    #[must_use]
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.receiver.clone()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new(1024)
    }
}
