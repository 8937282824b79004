//! Unit tests for the IR crate

use super::*;
use pretty_assertions::assert_eq;
use rls_common::BlockId;

fn binary_module(op: BinaryOp, ty: IrType) -> Module {
    let mut module = Module::new("test");
    let mut function = Function::new("f", ty.clone(), vec![ty.clone(), ty], false);
    let params = function.param_values();
    let entry = function.add_block("entry");
    let mut builder = IrBuilder::at_end(&mut function, entry);
    let result = builder
        .build_binary(op, params[0].clone(), params[1].clone())
        .unwrap();
    builder.build_return(Some(result)).unwrap();
    module.add_function(function);
    module
}

fn int_binary(op: BinaryOp, ty: IrType, a: i64, b: i64) -> RuntimeValue {
    run_binary(op, ty, RuntimeValue::Int(a), RuntimeValue::Int(b)).unwrap()
}

fn run_binary(
    op: BinaryOp,
    ty: IrType,
    a: RuntimeValue,
    b: RuntimeValue,
) -> Result<RuntimeValue, ExecError> {
    let module = binary_module(op, ty);
    let mut interp = Interpreter::new(&module)?;
    interp.run("f", vec![a, b])
}

#[test]
fn test_ir_values() {
    assert_eq!(Value::temp(5, IrType::I32).to_string(), "%5");
    assert_eq!(Value::int(IrType::I32, 42).to_string(), "42");
    assert_eq!(Value::bool(true).to_string(), "true");
    assert_eq!(
        Value::Constant(Constant::GlobalAddr {
            name: "main".to_string(),
            ty: IrType::I8.pointer()
        })
        .to_string(),
        "@main"
    );
}

#[test]
fn test_int_constants_are_normalized() {
    assert_eq!(Constant::int(IrType::I16, 65536).as_int(), Some(0));
    assert_eq!(Constant::int(IrType::I16, 125536).as_int(), Some(-5536));
    assert_eq!(Constant::int(IrType::I8, 255).as_int(), Some(-1));
    assert_eq!(Constant::int(IrType::I1, 3).as_int(), Some(1));
    assert!(Constant::zero(&IrType::F64).is_zero());
    assert!(Constant::zero(&IrType::I8.pointer()).is_zero());
}

#[test]
fn test_kind_accepts() {
    assert!(Kind::Numeric.accepts(IrType::F64.kind()));
    assert!(Kind::Numeric.accepts(IrType::I8.kind()));
    assert!(Kind::Decimal.accepts(IrType::F32.kind()));
    assert!(!Kind::Integer.accepts(IrType::F32.kind()));
    assert!(!Kind::Pointer.accepts(IrType::I64.kind()));
}

#[test]
fn test_type_display() {
    assert_eq!(IrType::I8.pointer().pointer().to_string(), "i8**");
    assert_eq!(IrType::array_of(IrType::I32, 4).to_string(), "[4 x i32]");
    assert_eq!(IrType::vector_of(IrType::F32, 2).to_string(), "<2 x float>");
    assert_eq!(
        IrType::function(IrType::I32, vec![IrType::I8.pointer()], true).to_string(),
        "i32 (i8*, ...)"
    );
}

#[test]
fn test_basic_block() {
    let mut block = BasicBlock::new(BlockId(0), "entry");
    assert!(block.is_empty());
    assert!(!block.has_terminator());

    block.add_instruction(Instruction::Comment("test".to_string()));
    assert!(!block.is_empty());
    assert!(!block.has_terminator());

    block.add_instruction(Instruction::Return(Some(Value::int(IrType::I32, 0))));
    assert!(block.has_terminator());
    assert_eq!(block.to_string(), "bb0:  ; entry\n  ; test\n  ret i32 0\n");
}

#[test]
fn test_function_block_layout() {
    let mut function = Function::new("layout", IrType::Void, vec![], false);
    let a = function.add_block("a");
    let b = function.add_block("b");
    let c = function.add_block("c");

    function.move_block_after(a, c).unwrap();
    let order: Vec<BlockId> = function.blocks.iter().map(|bb| bb.id).collect();
    assert_eq!(order, vec![b, c, a]);

    function.move_block_before(a, b).unwrap();
    let order: Vec<BlockId> = function.blocks.iter().map(|bb| bb.id).collect();
    assert_eq!(order, vec![a, b, c]);

    assert!(function.move_block_after(a, BlockId(99)).is_err());
    assert_eq!(function.blocks.len(), 3);

    assert!(function.remove_block(b).is_some());
    assert_eq!(function.entry_block(), Some(a));
    assert_eq!(function.last_block(), Some(c));
}

#[test]
fn test_parameters_take_first_temps() {
    let mut function = Function::new("f", IrType::I32, vec![IrType::I32, IrType::F64], false);
    assert_eq!(function.param(1), Some(Value::temp(1, IrType::F64)));
    assert_eq!(function.new_temp(), 2);
}

#[test]
fn test_builder_type_checks() {
    let mut function = Function::new("f", IrType::I32, vec![IrType::I32, IrType::F32], false);
    let params = function.param_values();
    let entry = function.add_block("entry");
    let mut builder = IrBuilder::at_end(&mut function, entry);

    assert!(builder
        .build_binary(BinaryOp::Add, params[0].clone(), params[1].clone())
        .is_err());
    assert!(builder
        .build_binary(BinaryOp::FAdd, params[0].clone(), params[0].clone())
        .is_err());
    assert!(builder.build_load(params[0].clone()).is_err());
    assert!(builder.build_return(None).is_err());

    let slot = builder.build_alloca(IrType::I32, None).unwrap();
    assert_eq!(slot.ty(), &IrType::I32.pointer());
    assert!(builder.build_store(params[1].clone(), slot.clone()).is_err());
    builder.build_store(params[0].clone(), slot.clone()).unwrap();

    builder.build_return(Some(params[0].clone())).unwrap();
    assert!(matches!(
        builder.build_load(slot),
        Err(IrError::BlockTerminated { .. })
    ));
}

#[test]
fn test_gep_result_types() {
    let pair = IrType::Struct {
        name: None,
        fields: vec![IrType::I8, IrType::array_of(IrType::F64, 3)],
        packed: false,
    };
    let ptr = Value::temp(0, pair.pointer());
    let indices = vec![
        Value::int(IrType::I32, 0),
        Value::int(IrType::I32, 1),
        Value::int(IrType::I32, 2),
    ];
    assert_eq!(IrBuilder::gep_type(ptr.ty(), &indices).unwrap(), IrType::F64);

    let bad = vec![Value::int(IrType::I32, 0), Value::int(IrType::I32, 5)];
    assert!(IrBuilder::gep_type(ptr.ty(), &bad).is_err());
}

#[test]
fn test_verify_rejects_unterminated_blocks() {
    let mut module = Module::new("verify");
    let mut function = Function::new("f", IrType::Void, vec![], false);
    let entry = function.add_block("entry");
    function
        .block_mut(entry)
        .unwrap()
        .add_instruction(Instruction::Comment("no terminator".to_string()));
    module.add_function(function);

    assert!(matches!(
        verify_module(&module),
        Err(IrError::Verification { .. })
    ));

    module.functions[0]
        .block_mut(entry)
        .unwrap()
        .add_instruction(Instruction::Return(None));
    assert!(verify_module(&module).is_ok());
}

#[test]
fn test_link_replaces_declarations_and_detects_conflicts() {
    let mut a = binary_module(BinaryOp::Add, IrType::I32);
    a.functions[0].name = "add".to_string();
    let mut user = Module::new("user");
    user.add_function(Function::new("add", IrType::I32, vec![IrType::I32, IrType::I32], false));

    user.link(&a).unwrap();
    assert!(!user.function("add").unwrap().is_declaration());

    assert!(matches!(
        user.link(&a),
        Err(IrError::LinkConflict { symbol }) if symbol == "add"
    ));
}

#[test]
fn test_interned_strings_are_shared() {
    let mut module = Module::new("strings");
    let first = module.intern_string("hello");
    let second = module.intern_string("hello");
    let third = module.intern_string("world");

    assert_eq!(first, second);
    assert_ne!(first, third);
    assert_eq!(module.globals.len(), 2);
    assert_eq!(first.ty(), &IrType::array_of(IrType::I8, 6).pointer());
}

#[test]
fn test_interpret_shift_overflow() {
    let shl = |a, b| int_binary(BinaryOp::Shl, IrType::I32, a, b);
    assert_eq!(shl(1, 31), RuntimeValue::Int(-2147483648));
    assert_eq!(shl(65536, 31), RuntimeValue::Int(0));

    let lshr = int_binary(BinaryOp::LShr, IrType::I32, -1, 1);
    assert_eq!(lshr, RuntimeValue::Int(2147483647));
    let ashr = int_binary(BinaryOp::AShr, IrType::I32, -8, 1);
    assert_eq!(ashr, RuntimeValue::Int(-4));
}

#[test]
fn test_interpret_wrapping_and_division() {
    let add = int_binary(BinaryOp::Add, IrType::I8, 127, 1);
    assert_eq!(add, RuntimeValue::Int(-128));

    let udiv = int_binary(BinaryOp::UDiv, IrType::I8, -2, 2);
    assert_eq!(udiv, RuntimeValue::Int(127));

    assert!(matches!(
        run_binary(BinaryOp::SDiv, IrType::I32, RuntimeValue::Int(1), RuntimeValue::Int(0)),
        Err(ExecError::DivisionByZero { .. })
    ));

    let third = (RuntimeValue::Float(1.0), RuntimeValue::Float(3.0));
    let fdiv = run_binary(BinaryOp::FDiv, IrType::F32, third.0, third.1).unwrap();
    assert_eq!(fdiv, RuntimeValue::Float((1.0f32 / 3.0f32) as f64));
}

#[test]
fn test_interpret_casts() {
    let mut module = Module::new("casts");
    let mut function = Function::new("f", IrType::I32, vec![IrType::I32], false);
    let params = function.param_values();
    let entry = function.add_block("entry");
    let mut builder = IrBuilder::at_end(&mut function, entry);
    let short = builder.build_cast(CastOp::Trunc, params[0].clone(), IrType::I16).unwrap();
    let wide = builder.build_cast(CastOp::SExt, short, IrType::I32).unwrap();
    builder.build_return(Some(wide)).unwrap();
    module.add_function(function);

    let mut interp = Interpreter::new(&module).unwrap();
    assert_eq!(interp.run("f", vec![RuntimeValue::Int(345)]).unwrap(), RuntimeValue::Int(345));
    assert_eq!(interp.run("f", vec![RuntimeValue::Int(65536)]).unwrap(), RuntimeValue::Int(0));
    assert_eq!(interp.run("f", vec![RuntimeValue::Int(125536)]).unwrap(), RuntimeValue::Int(-5536));
}

#[test]
fn test_interpret_unordered_compare() {
    let mut module = Module::new("fcmp");
    let mut function = Function::new("f", IrType::I1, vec![IrType::F64, IrType::F64], false);
    let params = function.param_values();
    let entry = function.add_block("entry");
    let mut builder = IrBuilder::at_end(&mut function, entry);
    let cmp = builder
        .build_fcmp(FloatPredicate::Ueq, params[0].clone(), params[1].clone())
        .unwrap();
    builder.build_return(Some(cmp)).unwrap();
    module.add_function(function);

    let mut interp = Interpreter::new(&module).unwrap();
    let nan = RuntimeValue::Float(f64::NAN);
    assert_eq!(interp.run("f", vec![nan, RuntimeValue::Float(1.0)]).unwrap(), RuntimeValue::Int(1));
    assert_eq!(
        interp.run("f", vec![RuntimeValue::Float(2.0), RuntimeValue::Float(1.0)]).unwrap(),
        RuntimeValue::Int(0)
    );
    assert!(!FloatPredicate::Oeq.evaluate(f64::NAN, f64::NAN));
}

#[test]
fn test_interpret_puts_through_string_global() {
    let mut module = Module::new("hello");
    let text = module.intern_string("hi there");
    module.add_function(Function::new("puts", IrType::I32, vec![IrType::I8.pointer()], false));
    let puts = module.function("puts").unwrap().address();

    let mut main = Function::new("main", IrType::Void, vec![], false);
    let entry = main.add_block("entry");
    let mut builder = IrBuilder::at_end(&mut main, entry);
    let ptr = Value::Constant(Constant::BitCast {
        value: Box::new(text),
        ty: IrType::I8.pointer(),
    });
    builder.build_call(Value::Constant(puts), vec![ptr]).unwrap();
    builder.build_return(None).unwrap();
    module.add_function(main);

    let mut interp = Interpreter::new(&module).unwrap();
    assert_eq!(interp.run("main", vec![]).unwrap(), RuntimeValue::Void);
    assert_eq!(interp.output(), "hi there\n");
}

#[test]
fn test_interpret_step_limit() {
    let mut module = Module::new("spin");
    let mut function = Function::new("spin", IrType::Void, vec![], false);
    let entry = function.add_block("entry");
    IrBuilder::at_end(&mut function, entry).build_branch(entry).unwrap();
    module.add_function(function);

    let config = ExecConfig {
        step_limit: 100,
        ..ExecConfig::default()
    };
    let mut interp = Interpreter::with_config(&module, config).unwrap();
    assert_eq!(
        interp.run("spin", vec![]),
        Err(ExecError::StepLimit { limit: 100 })
    );
}

#[test]
fn test_module_serializes_to_json() {
    let module = binary_module(BinaryOp::Mul, IrType::I64);
    let json = serde_json::to_string(&module).unwrap();
    let back: Module = serde_json::from_str(&json).unwrap();
    assert_eq!(back, module);
}

#[test]
fn test_clear_body_restarts_numbering() {
    let mut function = Function::new("reset", IrType::I32, vec![IrType::I32], false);
    function.add_block("entry");
    function.add_block("next");
    function.new_temp();
    assert_eq!(function.temp_count(), 2);

    function.clear_body();
    assert!(function.is_declaration());
    assert_eq!(function.temp_count(), 1);
    assert_eq!(function.add_block("entry"), BlockId(0));
}
