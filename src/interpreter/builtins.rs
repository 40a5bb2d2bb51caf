use crate::value::{Builtin, Value};
use std::io::{self, Write};

pub fn call_builtin(builtin: Builtin, args: &[Value], out: &mut dyn Write) -> io::Result<Value> {
    match builtin {
        Builtin::Print => builtin_print(args, out),
    }
}

/// Writes the arguments separated by single spaces, then a newline.
pub fn builtin_print(args: &[Value], out: &mut dyn Write) -> io::Result<Value> {
    let line: Vec<String> = args.iter().map(Value::to_string).collect();
    writeln!(out, "{}", line.join(" "))?;
    out.flush()?;
    Ok(Value::None)
}
