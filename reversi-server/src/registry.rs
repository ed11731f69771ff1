//! Two-slot participant registry.

use std::fmt;

use reversi_core::Side;

use crate::error::RegistryError;

/// Opaque identity of one transport connection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Maps up to two connections to a side. Slot 0 plays Black, slot 1 White.
#[derive(Debug, Default, Clone)]
pub struct ConnectionRegistry {
    slots: [Option<ConnId>; 2],
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn slot_index(side: Side) -> usize {
        match side {
            Side::Black => 0,
            Side::White => 1,
        }
    }

    /// Assign `conn` the first free side, Black before White.
    ///
    /// Registering a connection twice returns the side it already holds.
    pub fn register(&mut self, conn: ConnId) -> Result<Side, RegistryError> {
        if let Some(side) = self.side_of(conn) {
            return Ok(side);
        }
        let side = Side::all()
            .find(|&side| self.slots[Self::slot_index(side)].is_none())
            .ok_or(RegistryError::RoomFull)?;
        self.slots[Self::slot_index(side)] = Some(conn);
        Ok(side)
    }

    /// Free the slot held by `conn`, returning the side it played.
    pub fn release(&mut self, conn: ConnId) -> Option<Side> {
        let side = self.side_of(conn)?;
        self.slots[Self::slot_index(side)] = None;
        Some(side)
    }

    pub fn side_of(&self, conn: ConnId) -> Option<Side> {
        Side::all().find(|&side| self.slots[Self::slot_index(side)] == Some(conn))
    }

    /// Connection holding `side`, if any.
    pub fn holder(&self, side: Side) -> Option<ConnId> {
        self.slots[Self::slot_index(side)]
    }

    /// Registered connections in slot order.
    pub fn connections(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.connections().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}
