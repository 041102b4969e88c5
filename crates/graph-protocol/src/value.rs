//! Result values and tabular datasets.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Named statement parameters.
pub type ParameterMap = HashMap<String, Value>;

/// A single value in a result set or parameter map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Check for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the integer payload.
    pub fn as_int(&self) -> Result<i64, ProtocolError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(ProtocolError::TypeMismatch {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    /// Get the string payload.
    pub fn as_str(&self) -> Result<&str, ProtocolError> {
        match self {
            Self::String(v) => Ok(v),
            other => Err(ProtocolError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

/// One row of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a row from its values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get the values of the row.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get a value by column index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of values in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tabular query result: column names and rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataSet {
    column_names: Vec<String>,
    rows: Vec<Row>,
}

impl DataSet {
    /// Create an empty dataset with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column_names: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Its width must match the column count.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), ProtocolError> {
        if values.len() != self.column_names.len() {
            return Err(ProtocolError::RowWidth {
                expected: self.column_names.len(),
                actual: values.len(),
            });
        }
        self.rows.push(Row::new(values));
        Ok(())
    }

    /// Get the column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Compare two datasets, ignoring the order of rows.
    ///
    /// Column order still matters. Duplicate rows must appear the same number
    /// of times on both sides.
    #[must_use]
    pub fn eq_ignore_row_order(&self, other: &Self) -> bool {
        if self.column_names != other.column_names || self.rows.len() != other.rows.len() {
            return false;
        }
        let mut matched = vec![false; other.rows.len()];
        self.rows.iter().all(|row| {
            let hit = other
                .rows
                .iter()
                .enumerate()
                .find(|(i, candidate)| !matched[*i] && *candidate == row)
                .map(|(i, _)| i);
            match hit {
                Some(i) => {
                    matched[i] = true;
                    true
                }
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yield_one() -> DataSet {
        let mut data = DataSet::new(["1"]);
        data.push_row(vec![Value::Int(1)]).unwrap();
        data
    }

    #[test]
    fn test_push_row_width_checked() {
        let mut data = DataSet::new(["a", "b"]);
        assert!(data.push_row(vec![Value::Int(1)]).is_err());
        assert!(data.push_row(vec![Value::Int(1), Value::Null]).is_ok());
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_eq_ignore_row_order() {
        let mut a = DataSet::new(["n"]);
        a.push_row(vec![1.into()]).unwrap();
        a.push_row(vec![2.into()]).unwrap();
        let mut b = DataSet::new(["n"]);
        b.push_row(vec![2.into()]).unwrap();
        b.push_row(vec![1.into()]).unwrap();
        assert!(a.eq_ignore_row_order(&b));
        assert_ne!(a, b);

        let mut c = DataSet::new(["n"]);
        c.push_row(vec![1.into()]).unwrap();
        c.push_row(vec![1.into()]).unwrap();
        assert!(!a.eq_ignore_row_order(&c));
    }

    #[test]
    fn test_dataset_json_shape() {
        let json = serde_json::to_value(yield_one()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "column_names": ["1"], "rows": [[1]] })
        );
        let back: DataSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, yield_one());
    }

    #[test]
    fn test_untagged_value_decoding() {
        let v: Value = serde_json::from_str(r#"[null, true, 3, 1.5, "x", {"k": 1}]"#).unwrap();
        let Value::List(items) = v else {
            panic!("expected list");
        };
        assert!(items[0].is_null());
        assert_eq!(items[1], Value::Bool(true));
        assert_eq!(items[2].as_int().unwrap(), 3);
        assert_eq!(items[3], Value::Float(1.5));
        assert_eq!(items[4].as_str().unwrap(), "x");
        assert!(matches!(items[5], Value::Map(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = Value::Bool(true).as_int().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TypeMismatch {
                expected: "int",
                found: "bool"
            }
        );
    }
}
