//! Arithmetic, cast and memory operations executed on the reference
//! interpreter

use pretty_assertions::assert_eq;
use rls_ir::{IrType, RuntimeValue, Value};
use rls_script::types::{INT, SHORT};
use rls_script::{GepIndex, Opr, Program, ScriptError, Signature, Signedness, StructDef};

fn run(program: &mut Program, name: &str, args: Vec<i64>) -> i64 {
    let args = args.into_iter().map(RuntimeValue::Int).collect();
    program
        .run_function(name, args)
        .expect("function should run")
        .as_int()
        .expect("integer result")
}

fn nullary() -> Signature {
    Signature::new(vec![], INT)
}

#[test]
fn test_shift_overflow_wraps() {
    let mut program = Program::new("shifts");
    program
        .function("high_bit", nullary(), |g| {
            let v = g.shl(1, 31)?;
            g.ret(v)
        })
        .expect("build high_bit");
    program
        .function("shifted_out", nullary(), |g| {
            let v = g.shl(65536, 31)?;
            g.ret(v)
        })
        .expect("build shifted_out");

    assert_eq!(run(&mut program, "high_bit", vec![]), -2147483648);
    assert_eq!(run(&mut program, "shifted_out", vec![]), 0);
}

#[test]
fn test_shift_reads_float_literals_as_integers() {
    let mut program = Program::new("shifts");
    program
        .function("quadruple", nullary(), |g| {
            let v = g.shl(1.5, 2)?;
            g.ret(v)
        })
        .expect("build quadruple");

    assert_eq!(run(&mut program, "quadruple", vec![]), 4);
}

#[test]
fn test_truncation_is_exact() {
    let mut program = Program::new("widths");
    program
        .function("fits", nullary(), |g| {
            let small = g.trunc(345, &SHORT)?;
            let v = g.sext(small, &INT)?;
            g.ret(v)
        })
        .expect("build fits");
    program
        .function("overflows", nullary(), |g| {
            let small = g.trunc(65536, &SHORT)?;
            let v = g.sext(small, &INT)?;
            g.ret(v)
        })
        .expect("build overflows");

    assert_eq!(run(&mut program, "fits", vec![]), 345);
    assert_eq!(run(&mut program, "overflows", vec![]), 0);
}

#[test]
fn test_extensions() {
    let mut program = Program::new("extensions");
    program
        .function("sign", nullary(), |g| {
            let v = g.sext(true, &INT)?;
            g.ret(v)
        })
        .expect("build sign");
    program
        .function("zero", nullary(), |g| {
            let v = g.zext(Value::int(IrType::I8, -1), &INT)?;
            g.ret(v)
        })
        .expect("build zero");

    assert_eq!(run(&mut program, "sign", vec![]), -1);
    assert_eq!(run(&mut program, "zero", vec![]), 255);
}

#[test]
fn test_non_numeric_strings_count_as_zero() {
    let mut program = Program::new("strings");
    program
        .function("sum", nullary(), |g| {
            let v = g.add("non", "numbers")?;
            g.ret(v)
        })
        .expect("build sum");
    assert_eq!(run(&mut program, "sum", vec![]), 0);
}

#[test]
fn test_division_by_constant_zero_emits_nothing() {
    let mut program = Program::new("division");
    let result = program.function("broken", Signature::new(vec![INT], INT), |g| {
        let n = g.args()?[0].clone();
        g.div(n, 0, Signedness::Signed)?;
        g.ret(0)
    });
    assert_eq!(result, Err(ScriptError::DivisionByZero));

    let result = program.function("broken_rem", Signature::new(vec![INT], INT), |g| {
        let n = g.args()?[0].clone();
        g.rem(n, 0, Signedness::Unsigned)?;
        g.ret(0)
    });
    assert_eq!(result, Err(ScriptError::DivisionByZero));

    let dump = program.dump();
    assert!(!dump.contains("sdiv"), "{dump}");
    assert!(!dump.contains("urem"), "{dump}");
}

#[test]
fn test_signed_and_unsigned_division() {
    let mut program = Program::new("division");
    program
        .function("signed", Signature::new(vec![INT, INT], INT), |g| {
            let args = g.args()?;
            let v = g.div(args[0].clone(), args[1].clone(), Signedness::Signed)?;
            g.ret(v)
        })
        .expect("build signed");
    program
        .function("unsigned", Signature::new(vec![INT, INT], INT), |g| {
            let args = g.args()?;
            let v = g.rem(args[0].clone(), args[1].clone(), Signedness::Unsigned)?;
            g.ret(v)
        })
        .expect("build unsigned");

    assert_eq!(run(&mut program, "signed", vec![-7, 2]), -3);
    assert_eq!(run(&mut program, "unsigned", vec![-1, 10]), 5);
}

#[test]
fn test_insert_and_extract() {
    let mut program = Program::new("aggregates");
    program
        .function("replace", nullary(), |g| {
            let array = g.insert(vec![1, 2, 3], 27, 1)?;
            let v = g.extract(array, 1)?;
            g.ret(v)
        })
        .expect("build replace");
    assert_eq!(run(&mut program, "replace", vec![]), 27);
}

#[test]
fn test_shuffle_picks_lanes() {
    let mut program = Program::new("vectors");
    program
        .function("lanes", nullary(), |g| {
            let shuffled = g.shuffle(vec![1, 2, 3], vec![4, 5, 6], vec![5, 2, 3, 1, 4, 0])?;
            let a = g.extract(shuffled.clone(), 1)?;
            let b = g.extract(shuffled, 4)?;
            let v = g.add(a, b)?;
            g.ret(v)
        })
        .expect("build lanes");
    assert_eq!(run(&mut program, "lanes", vec![]), 8);
}

#[test]
fn test_operators_and_select() {
    let mut program = Program::new("operators");
    program
        .function("max", Signature::new(vec![INT, INT], INT), |g| {
            let args = g.args()?;
            let greater = g.opr("sgt".parse::<Opr>()?, args[0].clone(), args[1].clone())?;
            let v = g.select(greater, args[0].clone(), args[1].clone())?;
            g.ret(v)
        })
        .expect("build max");
    program
        .function("bits", Signature::new(vec![INT], INT), |g| {
            let n = g.args()?[0].clone();
            let inverted = g.invert(n)?;
            let masked = g.opr(Opr::And, inverted, 0xff)?;
            let v = g.neg(masked)?;
            g.ret(v)
        })
        .expect("build bits");

    assert_eq!(run(&mut program, "max", vec![3, 9]), 9);
    assert_eq!(run(&mut program, "max", vec![-3, -9]), -3);
    assert_eq!(run(&mut program, "bits", vec![0]), -255);
    assert!(matches!(
        "spaceship".parse::<Opr>(),
        Err(ScriptError::ArgumentError { .. })
    ));
}

#[test]
fn test_float_operators_reject_signed_predicates() {
    let mut program = Program::new("floats");
    let result = program.function("compare", nullary(), |g| {
        let v = g.opr(Opr::Slt, 1.5, 2.5)?;
        g.ret(v)
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
}

#[test]
fn test_counters_through_pointers() {
    let mut program = Program::new("counters");
    program
        .function("count", nullary(), |g| {
            let slot = g.alloca(&INT)?;
            g.store(40, slot.clone())?;
            g.inc(slot.clone())?;
            g.inc_by(slot.clone(), 3)?;
            g.dec(slot.clone())?;
            let v = g.load(slot)?;
            g.ret(v)
        })
        .expect("build count");
    assert_eq!(run(&mut program, "count", vec![]), 43);
}

#[test]
fn test_struct_fields_by_name() {
    let mut program = Program::new("structs");
    let point = program
        .define_struct(StructDef::named("point").field("x", INT).field("y", INT))
        .expect("define point");
    program
        .function("field", nullary(), |g| {
            let p = g.alloca(&point)?;
            g.sep(p.clone(), vec![GepIndex::from(0), "x".into()], 5)?;
            g.sep(p.clone(), vec![GepIndex::from(0), "y".into()], 7)?;
            let x = g.gev(p.clone(), vec![GepIndex::from(0), "x".into()])?;
            let y = g.gev(p, vec![GepIndex::from(0), "y".into()])?;
            let v = g.mul(x, y)?;
            g.ret(v)
        })
        .expect("build field");
    assert_eq!(run(&mut program, "field", vec![]), 35);
}

#[test]
fn test_pointer_operations_require_pointers() {
    let mut program = Program::new("pointers");
    let result = program.function("bad", nullary(), |g| {
        g.load(5)?;
        g.ret(0)
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));

    let result = program.function("bad_field", nullary(), |g| {
        let slot = g.alloca(&INT)?;
        g.gep(slot, vec!["x".into()])?;
        g.ret(0)
    });
    assert!(matches!(result, Err(ScriptError::ArgumentError { .. })));
}
