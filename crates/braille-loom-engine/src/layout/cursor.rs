use crate::error::LayoutError;

/// Rendering cursor in page-relative braille cells.
///
/// `hpos` starts unset: the first line of a page has no horizontal position
/// until a move or an append establishes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub hpos: Option<usize>,
    pub vpos: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self { hpos: None, vpos: 0 }
    }

    /// Check that a move to `target_v` is legal.
    ///
    /// Vertical position is non-decreasing across a layout; only table mode
    /// may revisit earlier rows (column-by-column cell layout).
    pub fn validate_move(&self, target_v: usize, table_mode: bool) -> Result<(), LayoutError> {
        if target_v < self.vpos && !table_mode {
            return Err(LayoutError::BackwardMove {
                from: self.vpos,
                to: target_v,
            });
        }
        Ok(())
    }

    /// Reset to the top of a fresh page.
    pub fn reset(&mut self) {
        self.hpos = None;
        self.vpos = 0;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_move_is_legal() {
        let cursor = Cursor { hpos: Some(3), vpos: 2 };
        assert!(cursor.validate_move(2, false).is_ok());
        assert!(cursor.validate_move(7, false).is_ok());
    }

    #[test]
    fn test_backward_move_outside_table_mode_is_a_violation() {
        let cursor = Cursor { hpos: Some(0), vpos: 5 };
        assert_eq!(
            cursor.validate_move(3, false),
            Err(LayoutError::BackwardMove { from: 5, to: 3 })
        );
    }

    #[test]
    fn test_backward_move_in_table_mode_is_legal() {
        let cursor = Cursor { hpos: Some(0), vpos: 5 };
        assert!(cursor.validate_move(3, true).is_ok());
    }
}
