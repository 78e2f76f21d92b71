//! The stable textual IR dump (spec §6 "Textual IR dump").

use crate::program::IrProgram;
use std::fmt::Write;

/// Renders a program the way spec §6 shows it: one `bbN:` section per
/// block, one instruction per line, in block-id order.
pub fn dump_program(program: &IrProgram) -> String {
    let mut out = String::new();
    for block in program.blocks_in_order() {
        writeln!(out, "{}:", block.id).unwrap();
        for inst in &block.instructions {
            writeln!(out, "{inst}").unwrap();
        }
    }
    out
}
