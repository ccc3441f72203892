//! Scalar cell values.

use std::fmt;

/// A single cell of a loaded table
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Whether the cell holds nothing (empty or an empty string)
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Integer equivalent of a numeric value without a fractional part
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                // Reject floats outside the i64 range instead of saturating
                if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Infer a typed value from raw text
    ///
    /// Integers first, then finite floats, then `true`/`false`. Empty text is
    /// [`Value::Empty`]; anything else stays a string.
    pub fn infer(text: &str) -> Self {
        if text.is_empty() {
            return Value::Empty;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        match text {
            "true" | "TRUE" | "True" => Value::Bool(true),
            "false" | "FALSE" | "False" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                // Format floats nicely (remove unnecessary decimals)
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{x:.0}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::from("hello").to_string(), "hello");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.75).to_string(), "2.75");
        assert_eq!(Value::Float(10.0).to_string(), "10");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_infer() {
        assert_eq!(Value::infer(""), Value::Empty);
        assert_eq!(Value::infer("7"), Value::Int(7));
        assert_eq!(Value::infer("-2.5"), Value::Float(-2.5));
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("NaN"), Value::from("NaN"));
        assert_eq!(Value::infer("123 Widget"), Value::from("123 Widget"));
    }

    #[test]
    fn test_integral() {
        assert_eq!(Value::Float(3.0).as_integral(), Some(3));
        assert_eq!(Value::Float(3.5).as_integral(), None);
        assert_eq!(Value::Int(-4).as_integral(), Some(-4));
        assert_eq!(Value::Float(1e300).as_integral(), None);
        assert_eq!(Value::from("3").as_integral(), None);
        assert!(Value::from("").is_blank());
    }
}
