use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Host-provided callables, bound by name in the root environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Print];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Builtin(Builtin),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Int(int), Value::Float(float)) | (Value::Float(float), Value::Int(int)) => {
                compare_int_float(*int, *float) == Some(Ordering::Equal)
            }
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Builtin(left), Value::Builtin(right)) => left == right,
            _ => false,
        }
    }
}

/// Orders an integer against a float without rounding the integer first.
/// `None` when the float is NaN.
pub fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, exactly representable
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal if float > whole => Some(Ordering::Less),
        Ordering::Equal if float < whole => Some(Ordering::Greater),
        ordering => Some(ordering),
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Builtin(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Builtin(_) => "builtin",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}
