//! Lowers SL source text into a verified IR program (spec §6 "an
//! IRGen pass must deliver an `IRProgram` satisfying all invariants of
//! §3").

pub mod builder;
pub mod env;
pub mod lower;

use probsl_diagnostics::IrGenError;
use probsl_ir::IrProgram;
use probsl_source_map::{FileId, SourceMap};

/// The result of a successful compile: the IR program plus the source
/// map it was compiled against, needed later to render any runtime
/// diagnostics against the same file.
pub struct CompiledProgram {
    pub program: IrProgram,
    pub source_map: SourceMap,
    pub file_id: FileId,
}

/// Parses and lowers one SL source file. Fails fast on the first
/// error found (parse or type-check), matching the minimal-compiler
/// shape this debugger's front end needs (spec §1 scopes IRGen as
/// ambient plumbing, not a core subsystem).
pub fn generate(file_name: &str, source: &str) -> Result<CompiledProgram, IrGenError> {
    log::debug!("generating IR for {file_name} ({} bytes)", source.len());
    let mut source_map = SourceMap::new();
    let file_id = source_map.add_file(file_name.to_string(), source.to_string());

    let ast = probsl_parser::parse(source).map_err(|err| {
        let error = IrGenError::ParseFailure {
            message: err.message,
            span: source_map
                .span_from_offsets(file_id, err.span.start, err.span.end)
                .expect("file just registered"),
        };
        log::error!("{file_name}: {error}");
        error
    })?;

    let mut builder = builder::Builder::new(&source_map, file_id);
    lower::lower_program(&mut builder, &ast).map_err(|error| {
        log::error!("{file_name}: {error}");
        error
    })?;
    let program = builder.finish();
    log::debug!("lowered {file_name} to {} block(s)", program.blocks_in_order().len());

    Ok(CompiledProgram {
        program,
        source_map,
        file_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use probsl_ir::{InstructionClass, ProgramPosition};

    fn compile(source: &str) -> CompiledProgram {
        generate("test.sl", source).expect("valid program should lower")
    }

    #[test]
    fn lowers_a_var_decl_to_a_single_assign_and_return() {
        let compiled = compile("int x = 42;");
        let dump = compiled.program.textual_dump();
        assert_eq!(dump, "bb0:\n%0 = int 42\nreturn\n");
    }

    #[test]
    fn rejects_use_before_declaration() {
        let err = generate("test.sl", "int x = y;").unwrap_err();
        assert!(matches!(err, IrGenError::UseBeforeDeclaration { name, .. } if name == "y"));
    }

    #[test]
    fn rejects_type_mismatch_on_declaration() {
        let err = generate("test.sl", "int x = true;").unwrap_err();
        assert!(matches!(err, IrGenError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_duplicate_declaration_in_same_scope() {
        let err = generate("test.sl", "int x = 1; int x = 2;").unwrap_err();
        assert!(matches!(err, IrGenError::DuplicateDeclaration { name, .. } if name == "x"));
    }

    #[test]
    fn allows_shadowing_in_sibling_branches_with_disambiguated_names() {
        let compiled = compile("if true { int x = 1; } else { int x = 2; }");
        let debug_info = compiled.program.debug_info();

        // Both declarations are classified `Simple` and, since they are
        // in distinct branches rather than the same scope, both get
        // display names rather than erroring: the second declares
        // `x#2`.
        let names: Vec<String> = compiled
            .program
            .blocks_in_order()
            .iter()
            .enumerate()
            .flat_map(|(block_index, block)| {
                (0..block.instructions.len()).filter_map(move |i| {
                    debug_info
                        .variables_at(ProgramPosition::new(
                            probsl_ir::BlockId::new(block_index as u32),
                            i,
                        ))
                        .map(|vars| vars.keys().cloned().collect::<Vec<_>>())
                })
            })
            .flatten()
            .collect();

        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"x#2".to_string()));
    }

    #[test]
    fn rejects_discrete_table_not_summing_to_one() {
        let err = generate("test.sl", "int x = discrete({1: 0.2, 2: 0.2});").unwrap_err();
        assert!(matches!(
            err,
            IrGenError::DiscreteProbabilitiesNotSummingToOne { .. }
        ));
    }

    #[test]
    fn while_loop_inserts_a_header_phi_for_the_loop_carried_variable() {
        let compiled = compile("int x = 0; while x < 3 { x = x + 1; }");
        let header = compiled
            .program
            .blocks_in_order()
            .into_iter()
            .find(|b| b.phi_prefix_len() > 0)
            .expect("loop header has a phi prefix");
        assert!(matches!(
            header.instructions[0],
            probsl_ir::Instruction::Phi { .. }
        ));
    }

    #[test]
    fn return_position_carries_end_of_file_debug_info() {
        let compiled = compile("int x = 1;");
        let return_block = compiled.program.return_block();
        let block = compiled.program.block(return_block).unwrap();
        let return_index = block.instructions.len() - 1;
        let position = ProgramPosition::new(return_block, return_index);
        assert_eq!(
            compiled.program.debug_info().class_at(position),
            Some(InstructionClass::Return)
        );
    }
}
