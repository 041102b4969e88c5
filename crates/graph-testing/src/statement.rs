//! The tiny statement language understood by the mock service.
//!
//! | statement                  | result                                   |
//! |----------------------------|------------------------------------------|
//! | `YIELD <expr> [AS <name>]` | one row, one column                      |
//! | `EXPLAIN <anything>`       | plan description, no data                |
//! | `SLEEP <ms>`               | empty success after the delay            |
//! | empty                      | `StatementEmpty`                         |
//! | anything else              | `SyntaxError`                            |
//!
//! `<expr>` is an integer, float, `true`/`false`/`null`, a quoted string or a
//! `$name` parameter reference.

use std::time::Duration;

use graph_protocol::{DataSet, ErrorCode, ExecutionResponse, ParameterMap, PlanDescription, Value};

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    /// Blank input.
    Empty,
    /// `YIELD expr [AS alias]`.
    Yield {
        /// Expression text.
        expr: &'a str,
        /// Column name; defaults to the expression text.
        alias: Option<&'a str>,
    },
    /// `EXPLAIN ...`.
    Explain(&'a str),
    /// `SLEEP ms`.
    Sleep(Duration),
    /// Anything else.
    Unknown(&'a str),
}

impl<'a> Statement<'a> {
    /// Parse statement text.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim().trim_end_matches(';').trim_end();
        if text.is_empty() {
            return Self::Empty;
        }
        let (keyword, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(k, r)| (k, r.trim()));

        match keyword.to_ascii_uppercase().as_str() {
            "YIELD" if !rest.is_empty() => {
                let split = rest.find(" AS ").or_else(|| rest.find(" as "));
                match split {
                    Some(at) => Self::Yield {
                        expr: rest[..at].trim(),
                        alias: Some(rest[at + 4..].trim()),
                    },
                    None => Self::Yield {
                        expr: rest,
                        alias: None,
                    },
                }
            }
            "EXPLAIN" if !rest.is_empty() => Self::Explain(rest),
            "SLEEP" => rest
                .parse()
                .map(|ms| Self::Sleep(Duration::from_millis(ms)))
                .unwrap_or(Self::Unknown(text)),
            _ => Self::Unknown(text),
        }
    }
}

/// Evaluate a `YIELD` expression.
pub fn evaluate(expr: &str, params: &ParameterMap) -> Result<Value, (ErrorCode, String)> {
    if let Some(name) = expr.strip_prefix('$') {
        return params.get(name).cloned().ok_or_else(|| {
            (
                ErrorCode::SemanticError,
                format!("parameter `{name}` is not defined"),
            )
        });
    }
    if let Ok(v) = expr.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = expr.parse::<f64>() {
        return Ok(Value::Float(v));
    }
    match expr.to_ascii_lowercase().as_str() {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    let quoted = expr.len() >= 2
        && ((expr.starts_with('"') && expr.ends_with('"'))
            || (expr.starts_with('\'') && expr.ends_with('\'')));
    if quoted {
        return Ok(Value::String(expr[1..expr.len() - 1].to_string()));
    }
    Err((
        ErrorCode::SyntaxError,
        format!("unsupported expression `{expr}`"),
    ))
}

/// Run a statement that needs no waiting. `SLEEP` is handled by the caller.
pub fn run(statement: &Statement<'_>, params: &ParameterMap, latency_us: i64) -> ExecutionResponse {
    match statement {
        Statement::Empty => ExecutionResponse::error(ErrorCode::StatementEmpty, "statement is empty"),
        Statement::Yield { expr, alias } => {
            let value = match evaluate(expr, params) {
                Ok(value) => value,
                Err((code, msg)) => return ExecutionResponse::error(code, msg),
            };
            let mut data = DataSet::new([alias.unwrap_or(expr)]);
            match data.push_row(vec![value]) {
                Ok(()) => ExecutionResponse::succeeded(latency_us, Some(data), None),
                Err(e) => ExecutionResponse::error(ErrorCode::ExecutionError, e.to_string()),
            }
        }
        Statement::Explain(inner) => ExecutionResponse::succeeded(
            latency_us,
            None,
            Some(PlanDescription {
                format: "row".to_string(),
                description: format!("Start -> Project({inner})"),
            }),
        ),
        Statement::Sleep(_) => ExecutionResponse::succeeded(latency_us, None, None),
        Statement::Unknown(text) => {
            ExecutionResponse::error(ErrorCode::SyntaxError, format!("syntax error near `{text}`"))
        }
    }
}
