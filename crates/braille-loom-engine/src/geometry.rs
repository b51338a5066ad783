use serde::{Deserialize, Serialize};

/// Physical page geometry in braille cells.
///
/// Passed explicitly into the layout builder so that unit tests can run with
/// arbitrary page shapes instead of reading ambient embosser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Usable cells per line (horizontal capacity).
    pub cells_per_line: usize,
    /// Usable lines per page (vertical capacity).
    pub lines_per_page: usize,
}

impl PageGeometry {
    pub fn new(cells_per_line: usize, lines_per_page: usize) -> Self {
        Self {
            cells_per_line,
            lines_per_page,
        }
    }

    /// US letter interpoint, the most common embosser format.
    pub fn letter() -> Self {
        Self::new(40, 25)
    }

    /// A4 interpoint.
    pub fn a4() -> Self {
        Self::new(32, 27)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::letter()
    }
}
