use derive_more::{Display, IsVariant};

use crate::Position;

/// Opaque tile identity, unique within a board for the tile's lifetime.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("#{_0}")]
pub struct TileId(u64);

impl TileId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// The colour or category of a tile, in `0..tile_types`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TileType(u8);

impl TileType {
    /// Creates a tile type from its index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the type index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// The special kind carried by a tile.
///
/// Ordinary tiles carry [`SpecialKind::None`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, IsVariant)]
pub enum SpecialKind {
    /// An ordinary tile.
    #[default]
    #[display("none")]
    None,
    /// Clears a square block around itself.
    #[display("bomb")]
    Bomb,
    /// Clears every tile of the type it is swapped with.
    #[display("color-bomb")]
    ColorBomb,
    /// Clears its whole row.
    #[display("row-clear")]
    RowClear,
    /// Clears its whole column.
    #[display("col-clear")]
    ColClear,
}

impl SpecialKind {
    /// Returns `true` for every kind except [`SpecialKind::None`].
    #[must_use]
    pub const fn is_special(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns `true` for the row- and column-clearing kinds.
    #[must_use]
    pub const fn is_line_clear(self) -> bool {
        matches!(self, Self::RowClear | Self::ColClear)
    }
}

/// A single game piece on the board.
///
/// A tile's [`position`](Tile::position) always equals the slot it occupies;
/// [`Board`](crate::Board) keeps the two in sync on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    id: TileId,
    tile_type: TileType,
    position: Position,
    special: SpecialKind,
}

impl Tile {
    pub(crate) fn new(id: TileId, tile_type: TileType, position: Position) -> Self {
        Self {
            id,
            tile_type,
            position,
            special: SpecialKind::None,
        }
    }

    /// Returns the tile's identity.
    #[must_use]
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Returns the tile's type.
    #[must_use]
    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }

    /// Returns the grid position the tile currently occupies.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the special kind of the tile.
    #[must_use]
    pub fn special(&self) -> SpecialKind {
        self.special
    }

    /// Returns `true` if the tile has been promoted to a special kind.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.special.is_special()
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn set_tile_type(&mut self, tile_type: TileType) {
        self.tile_type = tile_type;
    }

    pub(crate) fn set_special(&mut self, special: SpecialKind) {
        self.special = special;
    }
}
