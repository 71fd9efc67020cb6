use std::fmt;

/// The closed set of value types an expression can produce.
///
/// Kept deliberately small: this crate only needs enough of a type system to drive comparison,
/// arithmetic and aggregate typing in the planning layer above it. A full catalog-backed type
/// system lives upstream, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date32,
    Interval,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Int64 => write!(f, "INT64"),
            Self::Float64 => write!(f, "FLOAT64"),
            Self::Utf8 => write!(f, "VARCHAR"),
            Self::Date32 => write!(f, "DATE"),
            Self::Interval => write!(f, "INTERVAL"),
        }
    }
}

/// A single scalar value, paired 1:1 with a [`DataType`] variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Days since the epoch.
    Date32(i32),
    /// `(months, days, micros)`, matching the interval decomposition used by most SQL dialects.
    Interval(i32, i32, i64),
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Utf8(s) => s.hash(state),
            Value::Date32(d) => d.hash(state),
            Value::Interval(months, days, micros) => {
                months.hash(state);
                days.hash(state);
                micros.hash(state);
            }
        }
    }
}

impl Value {
    pub fn datatype(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Boolean(_) => DataType::Boolean,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Utf8(_) => DataType::Utf8,
            Value::Date32(_) => DataType::Date32,
            Value::Interval(..) => DataType::Interval,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(s) => write!(f, "'{s}'"),
            Value::Date32(days) => write!(f, "DATE+{days}"),
            Value::Interval(months, days, micros) => {
                write!(f, "INTERVAL({months}mo {days}d {micros}us)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub value: Value,
    pub datatype: DataType,
}

impl LiteralExpr {
    pub fn new(value: Value) -> Self {
        let datatype = value.datatype();
        LiteralExpr { value, datatype }
    }
}

impl std::hash::Hash for LiteralExpr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for LiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
