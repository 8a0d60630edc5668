//! Floating damage numbers accumulated per colour.

use std::collections::BTreeMap;

use hearth_shared::{Message, MessageError};

/// Damage totals shown over an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageInfo {
    totals: BTreeMap<u16, i64>,
}

impl DamageInfo {
    /// Adds `value` to the running total for `colour`.
    pub fn update(&mut self, colour: u16, value: i32) {
        *self.totals.entry(colour).or_default() += i64::from(value);
    }

    /// Running total for `colour`.
    #[must_use]
    pub fn total(&self, colour: u16) -> i64 {
        self.totals.get(&colour).copied().unwrap_or(0)
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Reads `(colour, value)` from a damage overlay payload: `int32` value,
/// one flag byte, `uint16` colour.
pub(crate) fn parse_damage(payload: &Message) -> Result<(u16, i32), MessageError> {
    let mut r = payload.reader();
    let value = r.int32()?;
    let _flags = r.uint8()?;
    let colour = r.uint16()?;
    Ok((colour, value))
}
