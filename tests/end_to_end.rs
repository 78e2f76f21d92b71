//! End-to-end scenarios S1-S7 (spec §8): SL source text through
//! IRGen and the debugger controller to observable sample values.

use probsl_ir::IrValue;
use probsl_runtime::executor::RunLimits;
use probsl_runtime::outline::Outline;
use probsl_runtime::DebuggerController;
use std::rc::Rc;

fn controller(source: &str, samples: usize, seed: u64) -> DebuggerController {
    let compiled = probsl_irgen::generate("test.sl", source).expect("valid program should lower");
    DebuggerController::new(Rc::new(compiled.program), samples, seed, RunLimits::default())
}

/// S1: `int x = 42`, N=1 -> after `run`, single sample `x = 42`.
#[test]
fn s1_single_declaration() {
    let mut dbg = controller("int x = 42;", 1, 0);
    dbg.run_until_end().unwrap();
    let samples = dbg.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0][&"x".to_string()], IrValue::Int(42));
}

/// S2: `int x = 42; x = x - 1; int y = x + 11`, N=1 -> `x = 41`, `y = 52`.
#[test]
fn s2_arithmetic_chain() {
    let mut dbg = controller("int x = 42; x = x - 1; int y = x + 11;", 1, 0);
    dbg.run_until_end().unwrap();
    let samples = dbg.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0][&"x".to_string()], IrValue::Int(41));
    assert_eq!(samples[0][&"y".to_string()], IrValue::Int(52));
}

/// S2's step scenario: stepping over each of the three statements in
/// turn should visit each source line's bindings in order.
#[test]
fn s2_step_over_visits_each_line_in_order() {
    let mut dbg = controller("int x = 42; x = x - 1; int y = x + 11;", 1, 0);

    dbg.step_over().unwrap();
    let after_line1 = dbg.samples();
    assert_eq!(after_line1[0][&"x".to_string()], IrValue::Int(42));
    assert!(!after_line1[0].contains_key("y"));

    dbg.step_over().unwrap();
    let after_line2 = dbg.samples();
    assert_eq!(after_line2[0][&"x".to_string()], IrValue::Int(41));

    dbg.step_over().unwrap();
    let after_line3 = dbg.samples();
    assert_eq!(after_line3[0][&"x".to_string()], IrValue::Int(41));
    assert_eq!(after_line3[0][&"y".to_string()], IrValue::Int(52));
}

/// S3: `int x = discrete({1: 0.5, 2: 0.5})`, N=10000 -> mean of x in
/// [1.3, 1.7].
#[test]
fn s3_discrete_mean_within_tolerance() {
    let mut dbg = controller("int x = discrete({1: 0.5, 2: 0.5});", 10_000, 42);
    dbg.run_until_end().unwrap();
    let samples = dbg.samples();
    assert_eq!(samples.len(), 10_000);
    let sum: i64 = samples
        .iter()
        .map(|s| s[&"x".to_string()].as_int().unwrap())
        .sum();
    let mean = sum as f64 / samples.len() as f64;
    assert!((1.3..=1.7).contains(&mean), "mean {mean} out of range");
}

/// S4: branching on a discrete draw, N=10000 -> mean of y in [14, 16].
#[test]
fn s4_branch_on_discrete_draw() {
    let source = "int x = discrete({1: 0.5, 2: 0.5}); int y = 10; if x == 2 { y = 20; }";
    let mut dbg = controller(source, 10_000, 7);
    dbg.run_until_end().unwrap();
    let samples = dbg.samples();
    assert_eq!(samples.len(), 10_000);
    let sum: i64 = samples
        .iter()
        .map(|s| s[&"y".to_string()].as_int().unwrap())
        .sum();
    let mean = sum as f64 / samples.len() as f64;
    assert!((14.0..=16.0).contains(&mean), "mean {mean} out of range");
}

/// S5: `int x = 1; observe(x == 2)`, N=1 -> `run` yields 0 samples.
#[test]
fn s5_observe_rejects_everything() {
    let mut dbg = controller("int x = 1; observe(x == 2);", 1, 0);
    dbg.run_until_end().unwrap();
    assert_eq!(dbg.samples().len(), 0);
}

/// S6: `int x = 3; while 1 < x { x = x - 1; }`, N=1 -> outline has a
/// loop with exactly 2 iterations; final `x = 1`.
#[test]
fn s6_loop_outline_has_two_iterations() {
    let compiled = probsl_irgen::generate("test.sl", "int x = 3; while 1 < x { x = x - 1; }")
        .expect("valid program should lower");
    let program = Rc::new(compiled.program);
    let mut executor = probsl_runtime::Executor::new(program.clone(), 0, RunLimits::default());
    let start = probsl_ir::ProgramPosition::new(program.start_block(), 0);
    let state = probsl_runtime::ExecutionState::initial(start, 1);
    let outline = probsl_runtime::generate_outline(&mut executor, state);

    let iterations = outline
        .iter()
        .find_map(|node| match node {
            Outline::Loop { iterations, .. } => Some(iterations),
            _ => None,
        })
        .expect("outline has a loop node");
    assert_eq!(iterations.len(), 2);

    let mut dbg = controller("int x = 3; while 1 < x { x = x - 1; }", 1, 0);
    dbg.run_until_end().unwrap();
    assert_eq!(dbg.samples()[0][&"x".to_string()], IrValue::Int(1));
}

/// S7: `int x = 1; { int x = 2; }`, N=1 -> two source variables, `x =
/// 1` and `x#2 = 2`. The inner block's `x#2` only lives in debug info
/// while its scope is open (it is restored out of view once the block
/// closes), so this checks the raw sample bindings by IR variable id
/// rather than through the scope-aware `variables_at` names used to
/// discover them, confirming shadowing produced two distinct SSA
/// variables with the right values.
#[test]
fn s7_shadowed_inner_declaration_gets_disambiguated_name() {
    let compiled = probsl_irgen::generate("test.sl", "int x = 1; { int x = 2; }")
        .expect("valid program should lower");
    let debug_info = compiled.program.debug_info();

    let mut var_x = None;
    let mut var_x2 = None;
    for (block_index, block) in compiled.program.blocks_in_order().iter().enumerate() {
        for i in 0..block.instructions.len() {
            let position =
                probsl_ir::ProgramPosition::new(probsl_ir::BlockId::new(block_index as u32), i);
            if let Some(vars) = debug_info.variables_at(position) {
                if let Some(v) = vars.get("x") {
                    var_x = Some(*v);
                }
                if let Some(v) = vars.get("x#2") {
                    var_x2 = Some(*v);
                }
            }
        }
    }
    let var_x = var_x.expect("`x` appears in debug info");
    let var_x2 = var_x2.expect("`x#2` appears in debug info");

    let mut dbg = DebuggerController::new(Rc::new(compiled.program), 1, 0, RunLimits::default());
    dbg.run_until_end().unwrap();
    let sample = &dbg.current_state().samples()[0];
    assert_eq!(sample[&var_x], IrValue::Int(1));
    assert_eq!(sample[&var_x2], IrValue::Int(2));
}

/// Determinism given a seed (§8 universal invariant 7): two runs with
/// identical program, sample count, and seed produce identical sample
/// multisets.
#[test]
fn determinism_given_a_seed() {
    let source = "int x = discrete({1: 0.3, 2: 0.7}); int y = 10; if x == 2 { y = 20; }";
    let mut a = controller(source, 200, 99);
    let mut b = controller(source, 200, 99);
    a.run_until_end().unwrap();
    b.run_until_end().unwrap();

    let xs_a: Vec<i64> = a.samples().iter().map(|s| s[&"x".to_string()].as_int().unwrap()).collect();
    let xs_b: Vec<i64> = b.samples().iter().map(|s| s[&"x".to_string()].as_int().unwrap()).collect();
    assert_eq!(xs_a, xs_b);
}
