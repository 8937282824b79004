//! Conditionals, loops and the return protocol

use pretty_assertions::assert_eq;
use rls_ir::{verify_module, Instruction, RuntimeValue};
use rls_script::types::{INT, VOID};
use rls_script::{Cond, Loop, Operand, Opr, Program, ScriptError, Signature, Signedness};

fn run(program: &mut Program, name: &str, args: Vec<i64>) -> i64 {
    let args = args.into_iter().map(RuntimeValue::Int).collect();
    program
        .run_function(name, args)
        .expect("function should run")
        .as_int()
        .expect("integer result")
}

fn unary() -> Signature {
    Signature::new(vec![INT], INT)
}

#[test]
fn test_factorial_loop() {
    let mut program = Program::new("math");
    program
        .function("factorial", unary(), |g| {
            let n = g.args()?[0].clone();
            let acc = g.alloca(&INT)?;
            g.store(1, acc.clone())?;
            g.lp(Loop::new()
                .var(1)
                .compare(|g, vars| Ok(g.opr(Opr::Sle, vars[0].clone(), n.clone())?.into()))
                .body(|g, vars| {
                    let current = g.load(acc.clone())?;
                    let next = g.mul(current, vars[0].clone())?;
                    g.store(next, acc.clone())
                })
                .increment(|g, ptrs| {
                    g.inc(ptrs[0].clone())?;
                    Ok(())
                }))?;
            let result = g.load(acc)?;
            g.ret(result)
        })
        .expect("build factorial");

    program.verify().expect("factorial verifies");
    assert_eq!(run(&mut program, "factorial", vec![6]), 720);
    assert_eq!(run(&mut program, "factorial", vec![0]), 1);
    assert!(program.diagnostics().is_empty());
}

#[test]
fn test_recursive_factorial() {
    let mut program = Program::new("math");
    program
        .function("factorial", unary(), |g| {
            let n = g.args()?[0].clone();
            let done = g.opr(Opr::Sle, n.clone(), 1)?;
            g.cret(done, 1, None)?;
            let smaller = g.sub(n.clone(), 1)?;
            let rest = g.call("factorial", vec![smaller.into()])?;
            let v = g.mul(n, rest)?;
            g.ret(v)
        })
        .expect("build factorial");

    program.verify().expect("factorial verifies");
    assert_eq!(run(&mut program, "factorial", vec![6]), 720);
}

#[test]
fn test_cond_takes_exactly_one_arm() {
    let mut program = Program::new("choice");
    program
        .function("pick", unary(), |g| {
            let n = g.args()?[0].clone();
            let positive = g.opr(Opr::Sgt, n, 0)?;
            g.cond(positive, Cond::new(|g| g.ret(10)).otherwise(|g| g.ret(20)))?;
            Ok(())
        })
        .expect("build pick");

    program.verify().expect("pick verifies");
    assert_eq!(run(&mut program, "pick", vec![5]), 10);
    assert_eq!(run(&mut program, "pick", vec![-5]), 20);
    assert!(program.diagnostics().is_empty());
}

#[test]
fn test_cond_without_else_falls_through() {
    let mut program = Program::new("choice");
    program
        .function("clamp", unary(), |g| {
            let n = g.args()?[0].clone();
            let slot = g.alloca(&INT)?;
            g.store(n.clone(), slot.clone())?;
            let negative = g.opr(Opr::Slt, n, 0)?;
            g.cond(
                negative,
                Cond::new(|g| {
                    g.store(0, slot.clone())?;
                    Ok(())
                }),
            )?;
            let v = g.load(slot)?;
            g.ret(v)
        })
        .expect("build clamp");

    program.verify().expect("clamp verifies");
    assert_eq!(run(&mut program, "clamp", vec![-4]), 0);
    assert_eq!(run(&mut program, "clamp", vec![4]), 4);
}

#[test]
fn test_cond_with_prebuilt_block() {
    let mut program = Program::new("choice");
    program
        .function("prebuilt", unary(), |g| {
            let n = g.args()?[0].clone();
            let odd = g.rem(n, 2, Signedness::Signed)?;
            let is_odd = g.opr(Opr::Ne, odd, 0)?;
            let then = g.block("odd", |g| g.ret(1))?;
            g.cond(is_odd, Cond::with_block(then))?;
            g.ret(0)
        })
        .expect("build prebuilt");

    assert_eq!(run(&mut program, "prebuilt", vec![7]), 1);
    assert_eq!(run(&mut program, "prebuilt", vec![8]), 0);
}

#[test]
fn test_while_loop_sums() {
    let mut program = Program::new("loops");
    program
        .function("sum", unary(), |g| {
            let n = g.args()?[0].clone();
            let total = g.alloca(&INT)?;
            g.store(0, total.clone())?;
            g.lp(Loop::new()
                .var(n)
                .compare(|g, vars| Ok(g.opr(Opr::Sgt, vars[0].clone(), 0)?.into()))
                .body(|g, vars| {
                    let current = g.load(total.clone())?;
                    let next = g.add(current, vars[0].clone())?;
                    g.store(next, total.clone())
                })
                .increment(|g, ptrs| {
                    g.dec(ptrs[0].clone())?;
                    Ok(())
                }))?;
            let v = g.load(total)?;
            g.ret(v)
        })
        .expect("build sum");

    assert_eq!(run(&mut program, "sum", vec![10]), 55);
    assert_eq!(run(&mut program, "sum", vec![0]), 0);
}

#[test]
fn test_loop_breaks_out() {
    let mut program = Program::new("loops");
    program
        .function("until_five", Signature::new(vec![], INT), |g| {
            let ptrs = g.lp(Loop::new()
                .var(0)
                .body(|g, vars| {
                    let done = g.opr(Opr::Sge, vars[0].clone(), 5)?;
                    g.cond(
                        done,
                        Cond::new(|g| {
                            let exit = g
                                .break_block()
                                .ok_or_else(|| ScriptError::argument("not in a loop"))?;
                            g.br(exit)
                        }),
                    )
                })
                .increment(|g, ptrs| {
                    g.inc(ptrs[0].clone())?;
                    Ok(())
                }))?;
            let v = g.load(ptrs[0].clone())?;
            g.ret(v)
        })
        .expect("build until_five");

    program.verify().expect("until_five verifies");
    assert_eq!(run(&mut program, "until_five", vec![]), 5);
}

#[test]
fn test_loop_needs_a_part() {
    let mut program = Program::new("loops");
    let result = program.function("empty", Signature::new(vec![], INT), |g| {
        g.lp(Loop::new().var(0))?;
        g.ret(0)
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
}

#[test]
fn test_returns_share_one_block() {
    let mut program = Program::new("returns");
    program
        .function("sign", unary(), |g| {
            let n = g.args()?[0].clone();
            let negative = g.opr(Opr::Slt, n.clone(), 0)?;
            g.cret(negative, -1, None)?;
            let zero = g.opr(Opr::Eq, n, 0)?;
            g.cret(zero, 0, None)?;
            g.ret(1)
        })
        .expect("build sign");

    let function = program.module().function("sign").expect("sign exists");
    let returns = function.blocks.iter().filter(|b| b.name == "return").count();
    assert_eq!(returns, 1);
    assert_eq!(function.blocks.last().map(|b| b.name.as_str()), Some("return"));

    assert_eq!(run(&mut program, "sign", vec![-8]), -1);
    assert_eq!(run(&mut program, "sign", vec![0]), 0);
    assert_eq!(run(&mut program, "sign", vec![8]), 1);
}

#[test]
fn test_direct_and_prepared_returns() {
    let mut program = Program::new("returns");
    program
        .function("direct", Signature::new(vec![], INT), |g| {
            g.sret(7)?;
            g.ret(8)
        })
        .expect("build direct");
    program
        .function("prepared", Signature::new(vec![], INT), |g| {
            g.pret(9)?;
            let exit = g.return_block()?;
            g.br(exit)
        })
        .expect("build prepared");
    program
        .function("twice", Signature::new(vec![], INT), |g| {
            g.ret(1)?;
            g.ret(2)
        })
        .expect("build twice");

    assert_eq!(run(&mut program, "direct", vec![]), 7);
    assert_eq!(run(&mut program, "prepared", vec![]), 9);
    assert_eq!(run(&mut program, "twice", vec![]), 1);
}

#[test]
fn test_sret_requires_a_value() {
    let mut program = Program::new("returns");
    let result =
        program.function("nothing", Signature::new(vec![], INT), |g| g.sret(Operand::Null));
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
}

#[test]
fn test_void_functions() {
    let mut program = Program::new("void");
    program
        .function("noop", Signature::new(vec![INT], VOID), |g| {
            let n = g.args()?[0].clone();
            let negative = g.opr(Opr::Slt, n, 0)?;
            g.cret(negative, (), None)?;
            g.ret(())
        })
        .expect("build noop");
    program
        .function("caller", Signature::new(vec![], INT), |g| {
            let result = g.call("noop", vec![3.into()])?;
            assert!(result.is_null());
            g.ret(4)
        })
        .expect("build caller");

    verify_module(program.module()).expect("void functions verify");
    assert_eq!(run(&mut program, "caller", vec![]), 4);
}

#[test]
fn test_missing_return_is_reported() {
    let mut program = Program::new("warnings");
    program
        .function("forgetful", Signature::new(vec![INT], INT), |g| {
            let n = g.args()?[0].clone();
            g.add(n, 1)?;
            Ok(())
        })
        .expect("missing returns only warn");

    let diagnostics = program.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "forgetful has no return at the end of the function!"
    );
    assert_eq!(diagnostics[0].symbol.as_deref(), Some("forgetful"));
}

#[test]
fn test_emitting_after_termination_fails() {
    let mut program = Program::new("terminated");
    let result = program.function("late", Signature::new(vec![], INT), |g| {
        g.ret(1)?;
        g.add(1, 2)?;
        Ok(())
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
}

#[test]
fn test_failed_build_can_be_retried() {
    let mut program = Program::new("retry");
    let result = program.function("flaky", Signature::new(vec![], INT), |g| {
        g.add(1, 2)?;
        Err(ScriptError::argument("abandoned"))
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
    let function = program.module().function("flaky").expect("flaky stays declared");
    assert!(function.is_declaration());

    program.build("flaky", |g| g.ret(5)).expect("rebuild flaky");
    program.verify().expect("flaky verifies");
    assert_eq!(run(&mut program, "flaky", vec![]), 5);
}

#[test]
fn test_counting_loop_without_body() {
    let mut program = Program::new("loops");
    program
        .function("count", Signature::new(vec![], INT), |g| {
            let ptrs = g.lp(Loop::new()
                .var(0)
                .compare(|g, vars| Ok(g.opr(Opr::Slt, vars[0].clone(), 10)?.into()))
                .increment(|g, ptrs| {
                    g.inc(ptrs[0].clone())?;
                    Ok(())
                }))?;
            let v = g.load(ptrs[0].clone())?;
            g.ret(v)
        })
        .expect("build count");

    let function = program.module().function("count").expect("count exists");
    let names: Vec<&str> = function.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["entry", "loop", "body", "increment", "break", "return"]);

    program.verify().expect("count verifies");
    assert_eq!(run(&mut program, "count", vec![]), 10);
}

#[test]
fn test_literal_conditions() {
    let mut program = Program::new("choice");
    for (name, flag) in [("always", true), ("never", false)] {
        program
            .function(name, Signature::new(vec![], INT), |g| {
                g.cond(flag, Cond::new(|g| g.ret(1)).otherwise(|g| g.ret(2)))?;
                Ok(())
            })
            .expect("build literal cond");
    }

    program.verify().expect("literal conds verify");
    assert_eq!(run(&mut program, "always", vec![]), 1);
    assert_eq!(run(&mut program, "never", vec![]), 2);
}

#[test]
fn test_explicit_exit_finishes_the_parent() {
    let mut program = Program::new("exits");
    program
        .function("classify", unary(), |g| {
            let n = g.args()?[0].clone();
            let done = g.block("done", |g| g.ret(7))?;
            let negative = g.opr(Opr::Slt, n, 0)?;
            g.cond(
                negative,
                Cond::new(|_| Ok(())).otherwise(|g| g.ret(1)).exit(done.start),
            )?;
            assert!(g.finished());
            Ok(())
        })
        .expect("build classify");
    program
        .function("spin", Signature::new(vec![], INT), |g| {
            let done = g.block("done", |g| g.ret(3))?;
            g.lp(Loop::new()
                .var(0)
                .compare(|g, vars| Ok(g.opr(Opr::Slt, vars[0].clone(), 3)?.into()))
                .increment(|g, ptrs| {
                    g.inc(ptrs[0].clone())?;
                    Ok(())
                })
                .exit(done.start))?;
            assert!(g.finished());
            Ok(())
        })
        .expect("build spin");

    program.verify().expect("explicit exits verify");
    assert!(program.diagnostics().is_empty());
    assert_eq!(run(&mut program, "classify", vec![-1]), 7);
    assert_eq!(run(&mut program, "classify", vec![1]), 1);
    assert_eq!(run(&mut program, "spin", vec![]), 3);
}

#[test]
fn test_cond_with_prebuilt_else_block() {
    let mut program = Program::new("choice");
    program
        .function("floor", unary(), |g| {
            let n = g.args()?[0].clone();
            let negative = g.block("negative", |g| g.ret(-1))?;
            let positive = g.opr(Opr::Sge, n.clone(), 0)?;
            g.cond(positive, Cond::new(|_| Ok(())).otherwise_block(negative))?;
            g.ret(n)
        })
        .expect("build floor");

    program.verify().expect("floor verifies");
    assert_eq!(run(&mut program, "floor", vec![5]), 5);
    assert_eq!(run(&mut program, "floor", vec![-3]), -1);
}

#[test]
fn test_unreachable_closes_a_dead_exit() {
    let mut program = Program::new("dead");
    program
        .function("either", unary(), |g| {
            let n = g.args()?[0].clone();
            let zero = g.opr(Opr::Eq, n, 0)?;
            g.cond(zero, Cond::new(|g| g.ret(1)).otherwise(|g| g.ret(2)))?;
            g.unreachable()?;
            assert!(g.finished());
            Ok(())
        })
        .expect("build either");

    let function = program.module().function("either").expect("either exists");
    let unreachable = function
        .blocks
        .iter()
        .filter(|b| matches!(b.terminator(), Some(Instruction::Unreachable)))
        .count();
    assert_eq!(unreachable, 1);

    program.verify().expect("either verifies");
    assert!(program.diagnostics().is_empty());
    assert_eq!(run(&mut program, "either", vec![0]), 1);
    assert_eq!(run(&mut program, "either", vec![9]), 2);
}

#[test]
fn test_repeated_ret_emits_one_terminator() {
    let mut program = Program::new("returns");
    program
        .function("twice", Signature::new(vec![], INT), |g| {
            g.ret(1)?;
            g.ret(2)
        })
        .expect("build twice");

    let function = program.module().function("twice").expect("twice exists");
    let entry = &function.blocks[0];
    let terminators = entry.instructions.iter().filter(|i| i.is_terminator()).count();
    assert_eq!(terminators, 1);
    assert_eq!(entry.instructions.last().map(Instruction::is_terminator), Some(true));
}
