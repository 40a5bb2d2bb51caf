use crate::ast::{BinaryOp, Block, Expr, ExprKind, FunctionDef, Stmt};
use crate::diagnostic::Span;
use crate::keywords::KeywordTable;
use crate::lexer::Lexer;
use crate::value::{compare_int_float, Value};
use super::builtins;
use super::control_flow::ControlFlow;
use super::environment::Environment;
use super::error::RuntimeError;
use super::parser::TokenParser;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// Directory searched for `import "name"` when none is configured.
pub const DEFAULT_LIB_DIR: &str = "libs";

/// Longest string, in bytes, that `*` repetition may build.
pub const MAX_REPEAT_BYTES: usize = 1 << 30;

/// File extension of importable libraries.
pub const LIBRARY_EXTENSION: &str = "k2";

/// Tree-walking evaluator.
///
/// One interpreter is one session: variables, function definitions and
/// imported libraries accumulate across `run` calls.
pub struct Interpreter {
    env: Environment,
    functions: HashMap<Rc<str>, Rc<FunctionDef>>,
    lexer: Lexer,
    lib_dir: PathBuf,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_keywords(KeywordTable::default())
    }

    pub fn with_keywords(keywords: KeywordTable) -> Self {
        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            lexer: Lexer::new(keywords),
            lib_dir: PathBuf::from(DEFAULT_LIB_DIR),
            output: Box::new(io::stdout()),
        }
    }

    pub fn with_lib_dir(mut self, lib_dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = lib_dir.into();
        self
    }

    /// Redirects `print` output.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn keywords(&self) -> &KeywordTable {
        self.lexer.keywords()
    }

    /// Current binding of `name`, if any.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.env.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Runs a program and returns the value of its last statement, or the
    /// value of a top-level `return`.
    pub fn run(&mut self, program: &Block) -> Result<Value, RuntimeError> {
        Ok(self.exec_block(program)?.into_value())
    }

    /// Lexes, parses and runs `source` in this interpreter's session.
    pub fn run_source(&mut self, source: &str) -> Result<Value, crate::Error> {
        let tokens = self.lexer.tokenize(source)?;
        let program = TokenParser::new(tokens).parse()?;
        Ok(self.run(&program)?)
    }

    fn exec_block(&mut self, block: &Block) -> Result<ControlFlow, RuntimeError> {
        let mut last = Value::None;
        for stmt in &block.statements {
            match self.exec_stmt(stmt)? {
                ControlFlow::Value(value) => last = value,
                flow @ ControlFlow::Return(_) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Value(last))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => Ok(ControlFlow::Value(self.evaluate(expr)?)),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.exec_block(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(ControlFlow::Value(Value::None))
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let flow @ ControlFlow::Return(_) = self.exec_block(body)? {
                        return Ok(flow);
                    }
                }
                Ok(ControlFlow::Value(Value::None))
            }
            Stmt::Function(def) => {
                tracing::trace!(function = %def.name, params = def.params.len(), "defining function");
                self.functions.insert(Rc::clone(&def.name), Rc::clone(def));
                Ok(ControlFlow::Value(Value::None))
            }
            Stmt::Return(expr) => Ok(ControlFlow::Return(self.evaluate(expr)?)),
            Stmt::Import { name, span } => {
                self.import_library(name, *span)?;
                Ok(ControlFlow::Value(Value::None))
            }
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Int(*n)),
            ExprKind::String(raw) => Ok(Value::string(strip_quotes(raw))),
            ExprKind::Variable(name) => Ok(self.env.get(name).unwrap_or(Value::None)),
            ExprKind::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_binary_op(&left, *op, &right, expr.span)
            }
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.set(Rc::clone(name), value.clone());
                Ok(value)
            }
            ExprKind::Call { name, args } => self.call_function(name, args, expr.span),
        }
    }

    fn evaluate_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    fn call_function(&mut self, name: &Rc<str>, args: &[Expr], span: Span) -> Result<Value, RuntimeError> {
        if let Some(Value::Builtin(builtin)) = self.env.get(name) {
            let values = self.evaluate_args(args)?;
            return builtins::call_builtin(builtin, &values, &mut *self.output)
                .map_err(|source| RuntimeError::Output { source, span });
        }

        let Some(def) = self.functions.get(name).cloned() else {
            return Err(RuntimeError::undefined_function_at(name.to_string(), span));
        };

        let values = self.evaluate_args(args)?;
        tracing::trace!(function = %name, args = values.len(), "calling function");

        // Callee sees a copy of the caller's variables plus its parameters.
        let mut frame = self.env.snapshot();
        for (param, value) in def.params.iter().zip(values) {
            frame.insert(Rc::clone(param), value);
        }

        let caller = self.env.replace_frame(frame);
        let result = self.exec_block(&def.body);
        self.env.replace_frame(caller);

        match result? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Value(_) => Ok(Value::None),
        }
    }

    fn import_library(&mut self, name: &str, span: Span) -> Result<(), RuntimeError> {
        let path = self.lib_dir.join(format!("{}.{}", name, LIBRARY_EXTENSION));
        tracing::debug!(library = name, path = %path.display(), "importing library");

        let source = std::fs::read_to_string(&path).map_err(|source| RuntimeError::Io {
            path: path.clone(),
            source,
            span,
        })?;

        self.run_source(&source).map_err(|error| RuntimeError::Library {
            name: name.to_string(),
            source: Box::new(error),
            span,
        })?;
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_quotes(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(raw)
}

fn ordering_holds(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::LessEq => ordering != Ordering::Greater,
        BinaryOp::GreaterEq => ordering != Ordering::Less,
        _ => false,
    }
}

fn repeat(text: &str, count: i64, op: BinaryOp, span: Span) -> Result<Value, RuntimeError> {
    let count = usize::try_from(count).unwrap_or(0);
    let bytes = match text.len().checked_mul(count) {
        Some(bytes) if bytes <= MAX_REPEAT_BYTES => bytes,
        _ => return Err(RuntimeError::overflow_at(op, span)),
    };

    let mut repeated = String::new();
    repeated
        .try_reserve_exact(bytes)
        .map_err(|_| RuntimeError::overflow_at(op, span))?;
    for _ in 0..count {
        repeated.push_str(text);
    }
    Ok(Value::string(repeated))
}

fn eval_binary_op(left: &Value, op: BinaryOp, right: &Value, span: Span) -> Result<Value, RuntimeError> {
    let int_result = |result: Option<i64>| result.map(Value::Int).ok_or_else(|| RuntimeError::overflow_at(op, span));

    match (left, op, right) {
        (_, BinaryOp::Eq, _) => Ok(Value::Bool(left == right)),
        (_, BinaryOp::NotEq, _) => Ok(Value::Bool(left != right)),

        (Value::Int(a), BinaryOp::Add, Value::Int(b)) => int_result(a.checked_add(*b)),
        (Value::Int(a), BinaryOp::Sub, Value::Int(b)) => int_result(a.checked_sub(*b)),
        (Value::Int(a), BinaryOp::Mul, Value::Int(b)) => int_result(a.checked_mul(*b)),

        (Value::String(a), BinaryOp::Add, Value::String(b)) => {
            let mut combined = String::with_capacity(a.len() + b.len());
            combined.push_str(a);
            combined.push_str(b);
            Ok(Value::string(combined))
        }
        (Value::String(text), BinaryOp::Mul, Value::Int(count))
        | (Value::Int(count), BinaryOp::Mul, Value::String(text)) => repeat(text, *count, op, span),

        (Value::Int(a), BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq, Value::Int(b)) => {
            Ok(Value::Bool(ordering_holds(op, a.cmp(b))))
        }
        (Value::String(a), BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq, Value::String(b)) => {
            Ok(Value::Bool(ordering_holds(op, a.cmp(b))))
        }
        (Value::Int(a), BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq, Value::Float(b)) => {
            Ok(Value::Bool(compare_int_float(*a, *b).is_some_and(|o| ordering_holds(op, o))))
        }
        (Value::Float(a), BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq, Value::Int(b)) => {
            Ok(Value::Bool(compare_int_float(*b, *a).is_some_and(|o| ordering_holds(op, o.reverse()))))
        }

        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div if b == 0.0 => Err(RuntimeError::division_by_zero_at(span)),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                _ => Ok(Value::Bool(a.partial_cmp(&b).is_some_and(|o| ordering_holds(op, o)))),
            },
            _ => Err(RuntimeError::type_error_at(
                format!(
                    "cannot apply `{}` to {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                ),
                span,
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Cloneable in-memory sink so tests can read back what `print` wrote.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn run(source: &str) -> Value {
        Interpreter::new()
            .with_output(Box::new(io::sink()))
            .run_source(source)
            .unwrap()
    }

    fn run_err(source: &str) -> crate::Error {
        Interpreter::new()
            .with_output(Box::new(io::sink()))
            .run_source(source)
            .unwrap_err()
    }

    fn run_printed(source: &str) -> String {
        let buffer = SharedBuffer::default();
        Interpreter::new()
            .with_output(Box::new(buffer.clone()))
            .run_source(source)
            .unwrap();
        buffer.contents()
    }

    #[test]
    fn test_literals() {
        assert_eq!(run("12"), Value::Int(12));
        assert_eq!(run(r#""hello""#), Value::string("hello"));
        assert_eq!(run(r#""""#), Value::string(""));
        assert_eq!(run(""), Value::None);
    }

    #[test]
    fn test_flat_precedence() {
        assert_eq!(run("2 + 3 * 4"), Value::Int(20));
        assert_eq!(run("2 + 3 * 4 == 20"), Value::Bool(true));
        assert_eq!(run("10 - 2 - 3"), Value::Int(5));
    }

    #[test]
    fn test_division_is_float() {
        assert_eq!(run("6 / 3"), Value::Float(2.0));
        assert_eq!(run("7 / 2"), Value::Float(3.5));
        assert!(matches!(
            run_err("1 / 0"),
            crate::Error::Runtime(RuntimeError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_int_overflow() {
        assert!(matches!(
            run_err("9223372036854775807 + 1"),
            crate::Error::Runtime(RuntimeError::Overflow { op: BinaryOp::Add, .. })
        ));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(run("1 / 2 + 1"), Value::Float(1.5));
        assert_eq!(run("1 / 2 < 1"), Value::Bool(true));
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(run(r#""ab" + "cd""#), Value::string("abcd"));
        assert_eq!(run(r#""ab" * 3"#), Value::string("ababab"));
        assert_eq!(run(r#"2 * "x""#), Value::string("xx"));
        assert_eq!(run(r#"z = 0 - 1 "x" * z"#), Value::string(""));
        assert_eq!(run(r#""a" < "b""#), Value::Bool(true));
        assert_eq!(run(r#""a" == "a""#), Value::Bool(true));
    }

    #[test]
    fn test_mixed_equality_is_defined() {
        assert_eq!(run(r#"1 == "1""#), Value::Bool(false));
        assert_eq!(run(r#"1 != "1""#), Value::Bool(true));
        assert_eq!(run("x == y"), Value::Bool(true));
        assert_eq!(run("4 / 2 == 2"), Value::Bool(true));
    }

    #[test]
    fn test_type_errors() {
        for source in [r#"1 + "a""#, r#""a" - "b""#, r#"1 < "a""#, "x + 1"] {
            let err = run_err(source);
            assert!(
                matches!(err, crate::Error::Runtime(RuntimeError::TypeError { .. })),
                "{} gave {:?}",
                source,
                err
            );
        }
        assert_eq!(
            run_err(r#"1 + "a""#).to_string(),
            "Type error: cannot apply `+` to int and string"
        );
    }

    #[test]
    fn test_assignment_yields_value() {
        assert_eq!(run("x = 5"), Value::Int(5));
        assert_eq!(run("x = 5 x"), Value::Int(5));
        assert_eq!(run("a = b = 3 a + b"), Value::Int(6));
    }

    #[test]
    fn test_undefined_variable_is_none() {
        assert_eq!(run("missing"), Value::None);
    }

    #[test]
    fn test_undefined_function_is_fatal() {
        let err = run_err("nope(1)");
        assert!(matches!(
            err,
            crate::Error::Runtime(RuntimeError::UndefinedFunction { ref name, .. }) if name == "nope"
        ));
        assert_eq!(err.to_string(), "Undefined function: nope");
    }

    #[test]
    fn test_if_and_while() {
        assert_eq!(run("if (1) then 10 else then 20 end"), Value::Int(10));
        assert_eq!(run("if (0) then 10 else then 20 end"), Value::Int(20));
        assert_eq!(run("if (0) then 10 end"), Value::None);
        assert_eq!(run("i = 0 while (i < 5) then i = i + 1 end i"), Value::Int(5));
        assert_eq!(run("n = 0 while (0) then n = 1 end n"), Value::Int(0));
        assert_eq!(run("while (0) then 1 end"), Value::None);
    }

    #[test]
    fn test_function_return_and_scope_restore() {
        let source = "n = 100\nfn inc(n) then return n + 1 end\ninc(5)";
        assert_eq!(run(source), Value::Int(6));
        assert_eq!(run(&format!("{}\nn", source)), Value::Int(100));
    }

    #[test]
    fn test_callee_sees_caller_variables() {
        assert_eq!(run("fn peek() then return secret end secret = 7 peek()"), Value::Int(7));
    }

    #[test]
    fn test_callee_assignments_do_not_leak() {
        assert_eq!(run("fn f() then leaked = 1 end f() leaked"), Value::None);
        assert_eq!(run("x = 1 fn f() then x = 2 end f() x"), Value::Int(1));
    }

    #[test]
    fn test_falling_off_body_yields_none() {
        assert_eq!(run("fn f() then 42 end f()"), Value::None);
    }

    #[test]
    fn test_return_from_nested_loop() {
        let source = "fn first_over(limit) then
            i = 0
            while (1) then
                i = i + 1
                if (i > limit) then return i end
            end
        end
        first_over(3)";
        assert_eq!(run(source), Value::Int(4));
    }

    #[test]
    fn test_recursion() {
        let source = "fn fact(n) then
            if (n < 2) then return 1 end
            return n * fact(n - 1)
        end
        fact(10)";
        assert_eq!(run(source), Value::Int(3628800));
    }

    #[test]
    fn test_argument_arity_mismatch() {
        assert_eq!(run("fn f(a) then return a end f(1, 2, 3)"), Value::Int(1));
        assert_eq!(run("fn f(a b) then return b end f(1)"), Value::None);
    }

    #[test]
    fn test_frame_restored_after_error() {
        let mut interpreter = Interpreter::new().with_output(Box::new(io::sink()));
        interpreter.run_source("x = 1 fn bad() then x = 2 return 1 / 0 end").unwrap();
        assert!(interpreter.run_source("bad()").is_err());
        assert_eq!(interpreter.get_variable("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_redefinition_overwrites() {
        assert_eq!(run("fn f() then return 1 end fn f() then return 2 end f()"), Value::Int(2));
    }

    #[test]
    fn test_top_level_return_stops_program() {
        let buffer_output = run_printed("print(1) return 5 print(2)");
        assert_eq!(buffer_output, "1\n");
        assert_eq!(run("return 5 6"), Value::Int(5));
    }

    #[test]
    fn test_print() {
        assert_eq!(run_printed(r#"print("a" 1 7 / 2)"#), "a 1 3.5\n");
        assert_eq!(run_printed("print()"), "\n");
        assert_eq!(run_printed("print(print(1))"), "1\nnone\n");
    }

    #[test]
    fn test_builtin_is_a_value() {
        assert_eq!(run_printed("p = print p(9)"), "9\n");
        assert!(matches!(
            run_err("print = 1 print(2)"),
            crate::Error::Runtime(RuntimeError::UndefinedFunction { .. })
        ));
    }

    #[test]
    fn test_session_persists_between_runs() {
        let mut interpreter = Interpreter::new().with_output(Box::new(io::sink()));
        interpreter.run_source("fn sq(x) then return x * x end y = 3").unwrap();
        assert_eq!(interpreter.run_source("sq(y)").unwrap(), Value::Int(9));
        assert!(interpreter.has_function("sq"));
    }

    #[test]
    fn test_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let err = Interpreter::new()
            .with_lib_dir(dir.path())
            .run_source(r#"import "ghost""#)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Runtime(RuntimeError::Io { .. })));
    }

    #[test]
    fn test_import_merges_definitions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("math.k2"),
            "fn double(x) then return x * 2 end\nunit = 1\nreturn 0\nafter = 1",
        )
        .unwrap();

        let mut interpreter = Interpreter::new()
            .with_lib_dir(dir.path())
            .with_output(Box::new(io::sink()));
        let value = interpreter
            .run_source("import \"math\"\ndouble(21) + unit")
            .unwrap();
        assert_eq!(value, Value::Int(43));
        assert_eq!(interpreter.get_variable("after"), None);
    }
}
