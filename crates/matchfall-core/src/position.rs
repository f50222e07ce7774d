use std::fmt;

/// A cell coordinate on the board.
///
/// `x` is the column index (growing to the right) and `y` is the row index
/// (growing downward, so the bottom row has the largest `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Column index.
    pub x: usize,
    /// Row index.
    pub y: usize,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if either
    /// coordinate would become negative.
    ///
    /// The upper bound is not checked; use [`Board::contains`](crate::Board::contains)
    /// for that.
    ///
    /// # Examples
    ///
    /// ```
    /// use matchfall_core::Position;
    ///
    /// assert_eq!(Position::new(1, 1).offset(-1, 1), Some(Position::new(0, 2)));
    /// assert_eq!(Position::new(0, 1).offset(-1, 0), None);
    /// ```
    #[must_use]
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Returns `true` if `other` is an orthogonal neighbour of `self`
    /// (Manhattan distance exactly 1).
    ///
    /// # Examples
    ///
    /// ```
    /// use matchfall_core::Position;
    ///
    /// let p = Position::new(3, 3);
    /// assert!(p.is_adjacent(Position::new(3, 4)));
    /// assert!(!p.is_adjacent(Position::new(4, 4)));
    /// assert!(!p.is_adjacent(p));
    /// ```
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
