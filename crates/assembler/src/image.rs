//! Memory image for the command segment.
//!
//! Each cell either holds a fully encoded word or a deferred label reference
//! waiting for pass 2. The stored source line of an unresolved cell exists
//! only for diagnostics when resolution fails.

use decet_core::{Word, MEMORY_WORDS};

/// One command-segment memory cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// A fully encoded machine word.
    Resolved(Word),
    /// A label reference to be patched during pass 2.
    Unresolved {
        /// The referenced label name.
        label: String,
        /// Source line of the reference, for diagnostics.
        source_line: usize,
    },
}

/// The address of a store that fell outside target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOverflow {
    /// The offending address.
    pub address: u16,
}

impl std::fmt::Display for ImageOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "address {} exceeds the {MEMORY_WORDS}-word memory",
            self.address
        )
    }
}

impl std::error::Error for ImageOverflow {}

/// The addressable memory image, indexed by absolute address.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    cells: Vec<Option<Cell>>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    /// Creates an empty image covering all of target memory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![None; MEMORY_WORDS],
        }
    }

    /// Stores a cell at an absolute address.
    ///
    /// # Errors
    ///
    /// Returns [`ImageOverflow`] when the address lies outside target memory.
    pub fn store(&mut self, address: u16, cell: Cell) -> Result<(), ImageOverflow> {
        let slot = self
            .cells
            .get_mut(usize::from(address))
            .ok_or(ImageOverflow { address })?;
        *slot = Some(cell);
        Ok(())
    }

    /// Returns the cell at an absolute address, if any was stored.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<&Cell> {
        self.cells.get(usize::from(address)).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use decet_core::{Are, Word};

    use super::{Cell, MemoryImage};

    #[test]
    fn store_and_get_roundtrip() {
        let mut image = MemoryImage::new();
        let word = Word::operand(5, Are::Absolute).unwrap();
        image.store(100, Cell::Resolved(word)).unwrap();
        assert_eq!(image.get(100), Some(&Cell::Resolved(word)));
        assert_eq!(image.get(101), None);
    }

    #[test]
    fn unresolved_cells_carry_label_and_line() {
        let mut image = MemoryImage::new();
        image
            .store(
                101,
                Cell::Unresolved {
                    label: "LOOP".to_string(),
                    source_line: 7,
                },
            )
            .unwrap();
        match image.get(101) {
            Some(Cell::Unresolved { label, source_line }) => {
                assert_eq!(label, "LOOP");
                assert_eq!(*source_line, 7);
            }
            other => panic!("unexpected cell: {other:?}"),
        }
    }

    #[test]
    fn store_outside_memory_is_rejected() {
        let mut image = MemoryImage::new();
        let word = Word::register_pair(0, 0);
        assert!(image.store(255, Cell::Resolved(word)).is_ok());
        let err = image.store(256, Cell::Resolved(word)).unwrap_err();
        assert_eq!(err.address, 256);
    }
}
