//! Identifiers and payloads exchanged with the remote simulation.
//!
//! Inbound wire decoding happens elsewhere; by the time data reaches the
//! object core it is already split into these types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Coord;

/// Identity of a game object.
///
/// Negative ids mark virtual objects that were synthesized locally and are
/// not confirmed by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ObjectId(pub i64);

impl ObjectId {
    /// Whether this id belongs to a locally synthesized object.
    #[inline]
    #[must_use]
    pub const fn is_virtual(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to a remote resource by its session-local id.
///
/// Two references are the same resource exactly when their ids match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ResRef(pub u32);

impl fmt::Display for ResRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res:{}", self.0)
    }
}

/// Opaque payload attached to a resource reference.
///
/// Cheap to clone; compared by content.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Message(Arc<[u8]>);

impl Message {
    /// Wraps raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Empty payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Starts reading from the beginning.
    #[must_use]
    pub fn reader(&self) -> MessageReader<'_> {
        MessageReader { data: &self.0, pos: 0 }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Message {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Message {
    fn from(v: &[u8]) -> Self {
        Self::new(v)
    }
}

/// Errors raised while reading a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Fewer bytes left than the field needs.
    #[error("payload truncated: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Read position.
        offset: usize,
        /// Bytes the field needed.
        needed: usize,
    },
}

/// Little-endian cursor over a [`Message`].
pub struct MessageReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl MessageReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], MessageError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(MessageError::Truncated { offset: self.pos, needed: N })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Truncated`] at end of payload.
    pub fn uint8(&mut self) -> Result<u8, MessageError> {
        Ok(self.take::<1>()?[0])
    }

    /// Reads an unsigned 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Truncated`] at end of payload.
    pub fn uint16(&mut self) -> Result<u16, MessageError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    /// Reads a signed 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Truncated`] at end of payload.
    pub fn int32(&mut self) -> Result<i32, MessageError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// What part of an object a click landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickKind {
    /// The object body itself.
    Body,
    /// One of the object's overlays.
    Overlay(i32),
}

/// Arguments describing a click on an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickArgs {
    /// What was clicked.
    pub kind: ClickKind,
    /// Clicked object.
    pub object: ObjectId,
    /// Object position quantized to the position resolution.
    pub position: Coord,
    /// Mesh part id, -1 when no specific part was hit.
    pub mesh: i32,
}

/// Fire-and-forget messages sent back to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundMessage {
    /// A click on a world object.
    Click {
        /// Screen coordinate of the click.
        screen: Coord,
        /// Local click coordinate within the clicked widget.
        local: Coord,
        /// Mouse button.
        button: u8,
        /// Modifier key flags.
        modflags: u8,
        /// What was clicked.
        args: ClickArgs,
    },
}
