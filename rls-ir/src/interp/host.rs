//! Host implementations of C library functions
//!
//! External declarations are resolved against this table. Output is captured
//! in the interpreter's buffer instead of being written to stdout.

use std::collections::HashMap;

use super::value::RuntimeValue;
use super::{ExecError, Interpreter};

/// Signature of a host function
pub type HostFn = fn(&mut Interpreter<'_>, &[RuntimeValue]) -> Result<RuntimeValue, ExecError>;

pub fn default_host_functions() -> HashMap<String, HostFn> {
    let mut table: HashMap<String, HostFn> = HashMap::new();
    table.insert("puts".to_string(), host_puts);
    table.insert("putchar".to_string(), host_putchar);
    table.insert("printf".to_string(), host_printf);
    table.insert("abs".to_string(), host_abs);
    table
}

fn pointer_arg<'a>(
    name: &str,
    args: &'a [RuntimeValue],
    index: usize,
) -> Result<&'a super::Pointer, ExecError> {
    args.get(index)
        .and_then(RuntimeValue::as_pointer)
        .ok_or_else(|| ExecError::TypeError {
            message: format!("{name}: argument {index} must be a pointer"),
        })
}

fn int_arg(name: &str, args: &[RuntimeValue], index: usize) -> Result<i64, ExecError> {
    args.get(index)
        .and_then(RuntimeValue::as_int)
        .ok_or_else(|| ExecError::TypeError {
            message: format!("{name}: argument {index} must be an integer"),
        })
}

fn host_puts(
    interp: &mut Interpreter<'_>,
    args: &[RuntimeValue],
) -> Result<RuntimeValue, ExecError> {
    let text = interp.memory().read_c_string(pointer_arg("puts", args, 0)?)?;
    interp.write_output(&text);
    interp.write_output("\n");
    Ok(RuntimeValue::Int(0))
}

fn host_putchar(
    interp: &mut Interpreter<'_>,
    args: &[RuntimeValue],
) -> Result<RuntimeValue, ExecError> {
    let c = int_arg("putchar", args, 0)?;
    interp.write_output(&char::from(c as u8).to_string());
    Ok(RuntimeValue::Int(c))
}

fn host_abs(
    _interp: &mut Interpreter<'_>,
    args: &[RuntimeValue],
) -> Result<RuntimeValue, ExecError> {
    Ok(RuntimeValue::Int(int_arg("abs", args, 0)?.wrapping_abs()))
}

fn host_printf(
    interp: &mut Interpreter<'_>,
    args: &[RuntimeValue],
) -> Result<RuntimeValue, ExecError> {
    let format = interp.memory().read_c_string(pointer_arg("printf", args, 0)?)?;
    let text = format_c(interp, &format, &args[1..])?;
    interp.write_output(&text);
    Ok(RuntimeValue::Int(text.len() as i64))
}

/// Minimal printf formatting: %d %i %u %c %s %f %x %% with optional `l` modifiers
fn format_c(
    interp: &Interpreter<'_>,
    format: &str,
    args: &[RuntimeValue],
) -> Result<String, ExecError> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = format.chars();
    let missing = || ExecError::TypeError {
        message: "printf: too few arguments for format".to_string(),
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut conversion = chars.next();
        while conversion == Some('l') {
            conversion = chars.next();
        }
        match conversion {
            Some('%') => out.push('%'),
            Some('d') | Some('i') => {
                let v = args.next().and_then(RuntimeValue::as_int).ok_or_else(missing)?;
                out.push_str(&v.to_string());
            }
            Some('u') => {
                let v = args.next().and_then(RuntimeValue::as_int).ok_or_else(missing)?;
                out.push_str(&(v as u64).to_string());
            }
            Some('x') => {
                let v = args.next().and_then(RuntimeValue::as_int).ok_or_else(missing)?;
                out.push_str(&format!("{v:x}"));
            }
            Some('c') => {
                let v = args.next().and_then(RuntimeValue::as_int).ok_or_else(missing)?;
                out.push(char::from(v as u8));
            }
            Some('f') => {
                let v = args.next().and_then(RuntimeValue::as_float).ok_or_else(missing)?;
                out.push_str(&format!("{v:.6}"));
            }
            Some('s') => {
                let ptr = args.next().and_then(RuntimeValue::as_pointer).ok_or_else(missing)?;
                out.push_str(&interp.memory().read_c_string(ptr)?);
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(out)
}
