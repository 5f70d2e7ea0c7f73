//! Interrupt wiring shared between chips.

use std::cell::Cell;
use std::rc::Rc;

/// One-bit non-maskable interrupt line.
///
/// The PPU raises the line when VBLANK starts with NMI generation enabled;
/// the CPU samples and clears it before fetching the next opcode. Both sides
/// hold a clone of the same cell, so no borrow of one chip is needed to
/// signal the other.
#[derive(Debug, Clone, Default)]
pub struct NmiLine(Rc<Cell<bool>>);

impl NmiLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the line.
    pub fn raise(&self) {
        self.0.set(true);
    }

    /// Sample the line, clearing it.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    /// Peek without clearing.
    pub fn is_raised(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_line() {
        let nmi = NmiLine::new();
        assert!(!nmi.take());

        nmi.raise();
        assert!(nmi.is_raised());
        assert!(nmi.take());
        assert!(!nmi.is_raised());
        assert!(!nmi.take());
    }

    #[test]
    fn clones_share_state() {
        let nmi = NmiLine::new();
        let other = nmi.clone();
        other.raise();
        assert!(nmi.take());
        assert!(!other.is_raised());
    }
}
