//! Libraries, macros, call dispatch, programs and sessions

use pretty_assertions::assert_eq;
use rls_ir::{Linkage, RuntimeValue};
use rls_script::types::{void_ptr, INT};
use rls_script::{
    Library, Lookup, Operand, Program, ScriptError, Session, Signature, Symbol, Visibility,
};

fn doubler(library: &mut Library) {
    library
        .function("double", Signature::new(vec![INT], INT), |g| {
            let n = g.args()?[0].clone();
            let v = g.mul(n, 2)?;
            g.ret(v)
        })
        .expect("build double");
}

#[test]
fn test_symbols_are_prefixed_with_the_address() {
    let mut library = Library::new("util");
    doubler(&mut library);
    assert!(library.module().function("util.double").is_some());
    assert_eq!(library.functions(Lookup::PublicOnly), vec!["double".to_string()]);
}

#[test]
fn test_macros_expand_inline() {
    let mut program = Program::new("macros");
    program.macro_def("square", 1, |g, args| {
        let v = g.mul(args[0].clone(), args[0].clone())?;
        Ok(v.into())
    });
    program
        .function("area", Signature::new(vec![INT], INT), |g| {
            let side = g.args()?[0].clone();
            let v = g.call("square", vec![side.into()])?;
            g.ret(v)
        })
        .expect("build area");

    assert!(program.module().function("square").is_none());
    let result = program
        .run_function("area", vec![RuntimeValue::Int(7)])
        .expect("area runs");
    assert_eq!(result.as_int(), Some(49));
}

#[test]
fn test_macro_arity_is_enforced() {
    let mut program = Program::new("macros");
    program.macro_def("square", 1, |g, args| Ok(g.mul(args[0].clone(), args[0].clone())?.into()));
    let result = program.function("bad", Signature::new(vec![], INT), |g| {
        let v = g.call("square", vec![2.into(), 3.into()])?;
        g.ret(v)
    });
    assert_eq!(
        result,
        Err(ScriptError::ArgumentCountMismatch {
            name: "square".to_string(),
            expected: 1,
            given: 2,
        })
    );
}

#[test]
fn test_macros_shadow_functions() {
    let mut program = Program::new("shadow");
    doubler(&mut program);
    program.macro_def("double", 1, |_, _| Ok(Operand::Int(-1)));
    assert!(matches!(program.resolve("double", Lookup::PublicOnly), Some(Symbol::Macro(_))));
}

#[test]
fn test_unresolved_calls() {
    let mut program = Program::new("calls");
    let result = program.function("lost", Signature::new(vec![], INT), |g| {
        g.call("nowhere", vec![])?;
        g.ret(0)
    });
    assert_eq!(
        result,
        Err(ScriptError::UnresolvedCallable {
            name: "nowhere".to_string()
        })
    );
}

#[test]
fn test_indirect_calls() {
    let mut program = Program::new("calls");
    doubler(&mut program);
    program
        .function("indirect", Signature::new(vec![], INT), |g| {
            let target = g
                .library()
                .lookup_function("double", Lookup::IncludePrivate)
                .cloned()
                .ok_or_else(|| ScriptError::unresolved("double"))?;
            let v = g.call(target.address(), vec![21.into()])?;
            g.ret(v)
        })
        .expect("build indirect");

    let result = program.run_function("indirect", vec![]).expect("indirect runs");
    assert_eq!(result.as_int(), Some(42));
}

#[test]
fn test_globals() {
    let mut program = Program::new("globals");
    program.global("counter", 41).expect("define counter");
    program
        .function("bump", Signature::new(vec![], INT), |g| {
            let counter = g.global("counter")?;
            g.inc(counter.clone())?;
            let v = g.load(counter)?;
            g.ret(v)
        })
        .expect("build bump");

    let result = program.run_function("bump", vec![]).expect("bump runs");
    assert_eq!(result.as_int(), Some(42));
}

#[test]
fn test_visibility() {
    let mut library = Library::new("util");
    library
        .with_visibility(Visibility::Private, |lib| {
            doubler(lib);
            Ok(())
        })
        .expect("private section");
    assert_eq!(library.visibility(), Visibility::Public);
    assert!(library.functions(Lookup::PublicOnly).is_empty());
    assert_eq!(library.functions(Lookup::IncludePrivate), vec!["double".to_string()]);
    let linkage = library.module().function("util.double").map(|f| f.linkage);
    assert_eq!(linkage, Some(Linkage::Private));

    library
        .change_visibility(&["double"], Visibility::Public)
        .expect("make double public");
    assert_eq!(library.functions(Lookup::PublicOnly), vec!["double".to_string()]);
    let linkage = library.module().function("util.double").map(|f| f.linkage);
    assert_eq!(linkage, Some(Linkage::External));

    assert!(matches!(
        library.change_visibility(&["missing"], Visibility::Private),
        Err(ScriptError::ArgumentError { .. })
    ));
}

#[test]
fn test_program_prints_through_host_functions() {
    let mut program = Program::new("hello");
    program
        .extern_fn("puts", Signature::new(vec![void_ptr()], INT))
        .expect("declare puts");
    program
        .main(|g| {
            g.call("puts", vec!["hello, world".into()])?;
            g.ret(0)
        })
        .expect("build main");

    program.verify().expect("hello verifies");
    assert_eq!(program.run().expect("main runs"), 0);
    assert_eq!(program.output(), "hello, world\n");
}

#[test]
fn test_program_without_main() {
    let mut program = Program::new("empty");
    assert!(matches!(program.run(), Err(ScriptError::ArgumentError { .. })));
}

#[test]
fn test_import_links_libraries() {
    let mut util = Library::new("util");
    doubler(&mut util);

    let mut program = Program::new("app");
    program.import(&util).expect("import util");
    program
        .main(|g| {
            let v = g.call("double", vec![21.into()])?;
            g.ret(v)
        })
        .expect("build main");

    assert_eq!(program.run().expect("main runs"), 42);
}

#[test]
fn test_conflicting_imports_fail_to_link() {
    let mut first = Library::new("dup");
    doubler(&mut first);
    let mut second = Library::new("dup");
    doubler(&mut second);

    let mut program = Program::new("app");
    program.import(&first).expect("first import");
    let result = program.import(&second);
    assert!(matches!(result, Err(ScriptError::LinkFailure { .. })));
    assert!(!program.diagnostics().is_empty());
}

#[test]
fn test_session_import() {
    let mut session = Session::new();
    let root = session.root();
    let util = session.library(root, "util").expect("util library");
    doubler(session.library_mut(util).expect("util is a library"));

    let app = session.program(root, "app").expect("app program");
    session.import(app, "util").expect("import util");
    let program = session.program_mut(app).expect("app is a program");
    program
        .main(|g| {
            let v = g.call("double", vec![5.into()])?;
            g.ret(v)
        })
        .expect("build main");

    assert!(program.module().function("rls.util.double").is_some());
    assert_eq!(program.run().expect("main runs"), 10);
}
