use serde_json::{Number, Value};

use super::QueryError;
use crate::core::{ResultSet, Row};

const ERROR_PREFIXES: [&str; 3] = ["ORA-", "SP2-", "TNS-"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Quoted(String),
    Bare(String),
}

impl Field {
    fn name(&self) -> String {
        match self {
            Field::Quoted(s) | Field::Bare(s) => s.trim().to_ascii_uppercase(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Field::Quoted(s) => Value::String(s),
            Field::Bare(s) => bare_value(s.trim()),
        }
    }
}

fn bare_value(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(s.to_string())
}

/// Finds the first client or server error line (`ORA-`, `SP2-`, `TNS-`) in the output.
///
/// Lines that continue a quoted multi-line value are data, not client messages, and
/// are skipped.
pub fn find_error(output: &str) -> Option<QueryError> {
    let mut in_quotes = false;
    for line in output.lines() {
        let continues_value = in_quotes;
        if line.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
        if continues_value {
            continue;
        }
        let line = line.trim();
        if !ERROR_PREFIXES.iter().any(|p| line.starts_with(p)) {
            continue;
        }
        let (code, message) = match line.split_once(':') {
            Some((code, message)) => (code.trim(), message.trim()),
            None => (line.split_whitespace().next().unwrap_or(line), line),
        };
        return Some(QueryError::database(code, message));
    }
    None
}

/// Parses `SET MARKUP CSV ON QUOTE ON` output: a header row, then data rows.
///
/// Quoted fields are strings, unquoted numerics are numbers, and empty unquoted fields
/// are null. No output at all is an empty result.
pub fn parse_output(output: &str) -> Result<ResultSet, QueryError> {
    let mut records = records(output)?.into_iter();
    let Some(header) = records.next() else {
        return Ok(ResultSet::empty());
    };
    let columns: Vec<String> = header.iter().map(Field::name).collect();
    if columns.iter().any(String::is_empty) {
        return Err(QueryError::Output(format!(
            "empty column name in header: {columns:?}"
        )));
    }

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        if record.len() != columns.len() {
            return Err(QueryError::Output(format!(
                "row {} has {} fields, expected {}",
                idx + 1,
                record.len(),
                columns.len()
            )));
        }
        rows.push(Row::new(
            columns
                .iter()
                .zip(record)
                .map(|(c, f)| (c.as_str(), f.into_value())),
        ));
    }
    Ok(ResultSet::new(columns, rows))
}

fn records(text: &str) -> Result<Vec<Vec<Field>>, QueryError> {
    let mut out = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                quoted = true;
                in_quotes = true;
            }
            ',' => record.push(take_field(&mut field, &mut quoted)),
            '\r' => {}
            '\n' => {
                record.push(take_field(&mut field, &mut quoted));
                out.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(QueryError::Output("unterminated quoted field".to_string()));
    }
    if quoted || !field.is_empty() || !record.is_empty() {
        record.push(take_field(&mut field, &mut quoted));
        out.push(record);
    }

    out.retain(|r| !matches!(r.as_slice(), [Field::Bare(s)] if s.trim().is_empty()));
    Ok(out)
}

fn take_field(field: &mut String, quoted: &mut bool) -> Field {
    let text = std::mem::take(field);
    if std::mem::take(quoted) {
        Field::Quoted(text)
    } else {
        Field::Bare(text)
    }
}
