//! Built-in sample programs
//!
//! Each sample builds a complete program with the generation engine so the
//! driver has something to dump, verify and run.

use rls_script::types::{void_ptr, INT};
use rls_script::{
    Cond, Library, Loop, Lookup, Opr, Program, Result, ScriptError, Session, Signature,
};

pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> Result<Program>,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "hello",
        description: "print a greeting through puts",
        build: hello,
    },
    Sample {
        name: "factorial",
        description: "iterative and recursive factorial of 6",
        build: factorial,
    },
    Sample {
        name: "countdown",
        description: "loop from 5 down to 1, stopping early on 2",
        build: countdown,
    },
    Sample {
        name: "pointer",
        description: "call a library function through its address",
        build: pointer,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|sample| sample.name == name)
}

fn printf(program: &mut Program) -> Result<()> {
    program.extern_fn("printf", Signature::new(vec![void_ptr()], INT).varargs())?;
    Ok(())
}

fn hello() -> Result<Program> {
    let mut program = Program::new("hello");
    program.extern_fn("puts", Signature::new(vec![void_ptr()], INT))?;
    program.main(|g| {
        g.call("puts", vec!["Hello, world!".into()])?;
        g.ret(0)
    })?;
    Ok(program)
}

fn factorial() -> Result<Program> {
    let mut program = Program::new("factorial");
    printf(&mut program)?;

    program.function("loop_factorial", Signature::new(vec![INT], INT), |g| {
        let n = g.args()?[0].clone();
        let acc = g.alloca(&INT)?;
        g.store(1, acc.clone())?;
        g.lp(Loop::new()
            .var(2)
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
    })?;

    program.function("factorial", Signature::new(vec![INT], INT), |g| {
        let n = g.args()?[0].clone();
        let done = g.opr(Opr::Sle, n.clone(), 1)?;
        g.cret(done, 1, None)?;
        let smaller = g.sub(n.clone(), 1)?;
        let rest = g.call("factorial", vec![smaller.into()])?;
        let v = g.mul(n, rest)?;
        g.ret(v)
    })?;

    program.main(|g| {
        let iterative = g.call("loop_factorial", vec![6.into()])?;
        let recursive = g.call("factorial", vec![6.into()])?;
        g.call("printf", vec!["%d %d\n".into(), iterative, recursive])?;
        g.ret(0)
    })?;
    Ok(program)
}

fn countdown() -> Result<Program> {
    let mut program = Program::new("countdown");
    printf(&mut program)?;
    program.main(|g| {
        g.lp(Loop::new()
            .var(5)
            .compare(|g, vars| Ok(g.opr(Opr::Sgt, vars[0].clone(), 0)?.into()))
            .body(|g, vars| {
                let n = vars[0].clone();
                g.call("printf", vec!["%d\n".into(), n.clone().into()])?;
                let stop = g.opr(Opr::Eq, n, 2)?;
                g.cond(
                    stop,
                    Cond::new(|g| {
                        let exit = g
                            .break_block()
                            .ok_or_else(|| ScriptError::argument("break outside of a loop"))?;
                        g.br(exit)
                    }),
                )
            })
            .increment(|g, ptrs| {
                g.dec(ptrs[0].clone())?;
                Ok(())
            }))?;
        g.ret(0)
    })?;
    Ok(program)
}

/// A library built inside a session, imported into the program and called
/// through a function pointer
fn pointer() -> Result<Program> {
    let mut session = Session::new();
    let root = session.root();
    let math = session.namespace(root, "math")?;
    let ops = session.library(math, "ops")?;
    let library: &mut Library = session
        .library_mut(ops)
        .ok_or_else(|| ScriptError::argument("ops is not a library"))?;
    library.function("triple", Signature::new(vec![INT], INT), |g| {
        let n = g.args()?[0].clone();
        let v = g.mul(n, 3)?;
        g.ret(v)
    })?;

    let app = session.program(math, "pointer")?;
    session.import(app, "ops")?;
    let program = session
        .program_mut(app)
        .ok_or_else(|| ScriptError::argument("pointer is not a program"))?;
    printf(program)?;
    program.main(|g| {
        let triple = g
            .library()
            .lookup_function("triple", Lookup::IncludePrivate)
            .cloned()
            .ok_or_else(|| ScriptError::unresolved("triple"))?;
        let v = g.call(triple.address(), vec![14.into()])?;
        g.call("printf", vec!["%d\n".into(), v])?;
        g.ret(0)
    })?;
    Ok(program.clone())
}
