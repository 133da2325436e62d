//! Handler seam: per-kind instruction semantics supplied by the host.
//!
//! The table is plain data owned by the caller and passed into
//! [`crate::step_one`]; nothing in the core holds a process-wide table.

use std::fmt;

use crate::{DecodedInstruction, Fault, InstructionKind, Machine};

/// Semantic handler for one instruction kind.
///
/// A handler runs only when the instruction's condition passed. It owns
/// every architectural side effect of the instruction and may redirect the
/// program counter; when it leaves PC untouched the step loop advances it by
/// four. Errors are returned to the caller of the step unchanged.
pub type Handler = for<'m, 'a> fn(&'m mut Machine<'a>, &DecodedInstruction) -> Result<(), Fault>;

/// Fixed table mapping every [`InstructionKind`] to an optional [`Handler`].
#[derive(Clone)]
pub struct HandlerTable {
    handlers: [Option<Handler>; InstructionKind::COUNT],
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerTable {
    /// Creates a table with no handlers installed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: [None; InstructionKind::COUNT],
        }
    }

    /// Installs `handler` for `kind`, returning the one it replaced.
    pub fn register(&mut self, kind: InstructionKind, handler: Handler) -> Option<Handler> {
        self.handlers[kind.index()].replace(handler)
    }

    /// Builder-style variant of [`HandlerTable::register`].
    #[must_use]
    pub fn with(mut self, kind: InstructionKind, handler: Handler) -> Self {
        self.register(kind, handler);
        self
    }

    /// Removes and returns the handler for `kind`.
    pub fn unregister(&mut self, kind: InstructionKind) -> Option<Handler> {
        self.handlers[kind.index()].take()
    }

    /// Looks up the handler for `kind`.
    #[must_use]
    pub const fn lookup(&self, kind: InstructionKind) -> Option<Handler> {
        self.handlers[kind.index()]
    }

    /// Number of kinds with a handler installed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns true when no handler is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.iter().all(Option::is_none)
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed = InstructionKind::ALL
            .iter()
            .filter(|kind| self.lookup(**kind).is_some());
        f.debug_set().entries(installed).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerTable;
    use crate::{DecodedInstruction, Fault, InstructionKind, Machine, Register};

    #[allow(clippy::unnecessary_wraps)]
    fn nop(_machine: &mut Machine<'_>, _decoded: &DecodedInstruction) -> Result<(), Fault> {
        Ok(())
    }

    #[allow(clippy::unnecessary_wraps)]
    fn zero_r0(machine: &mut Machine<'_>, _decoded: &DecodedInstruction) -> Result<(), Fault> {
        machine.set_reg(Register::R0, 0);
        Ok(())
    }

    #[test]
    fn empty_table_has_no_handlers() {
        let table = HandlerTable::default();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        for kind in InstructionKind::ALL {
            assert!(table.lookup(*kind).is_none());
        }
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let mut table = HandlerTable::new();
        assert!(table.register(InstructionKind::Nop, nop).is_none());
        assert!(table.register(InstructionKind::Nop, zero_r0).is_some());
        assert_eq!(table.len(), 1);

        assert!(table.unregister(InstructionKind::Nop).is_some());
        assert!(table.unregister(InstructionKind::Nop).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn looked_up_handler_runs_against_machine() {
        let table = HandlerTable::new().with(InstructionKind::Mov, zero_r0);
        let mut stack = [0_u8; 16];
        let mut machine = Machine::new(&mut stack).expect("stack maps");
        machine.set_reg(Register::R0, 7);

        let handler = table.lookup(InstructionKind::Mov).expect("installed");
        let decoded = DecodedInstruction::new(InstructionKind::Mov, crate::Condition::Al);
        handler(&mut machine, &decoded).expect("handler succeeds");

        assert_eq!(machine.reg(Register::R0), 0);
        assert_eq!(format!("{table:?}"), "{Mov}");
    }
}
