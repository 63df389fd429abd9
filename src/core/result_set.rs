use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::QueryName;

/// One catalog row. Column names are upper case; values are JSON scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new<K, I>(columns: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self(
            columns
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_ascii_uppercase(), scalar(v)))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(&column.to_ascii_uppercase())
    }

    /// Text rendering of a column; `None` for absent or null.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(true) => Some("YES".to_string()),
            Value::Bool(false) => Some("NO".to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn scalar(v: Value) -> Value {
    match v {
        Value::Array(_) | Value::Object(_) => Value::String(v.to_string()),
        other => other,
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Row::new(raw))
    }
}

/// Rows returned by one diagnostic query, with the column order used for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .collect();
        if columns.is_empty() {
            if let Some(first) = rows.first() {
                columns = first.columns().map(str::to_string).collect();
            }
        }
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResultSet {
    Table {
        #[serde(default)]
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    Rows(Vec<Row>),
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawResultSet::deserialize(deserializer)? {
            RawResultSet::Table { columns, rows } => ResultSet::new(columns, rows),
            RawResultSet::Rows(rows) => ResultSet::new(vec![], rows),
        })
    }
}

/// Named result sets handed to the analyzer. A missing key means the query never
/// ran; an empty set means it ran and matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSetCollection(BTreeMap<QueryName, ResultSet>);

impl ResultSetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: QueryName, rows: ResultSet) {
        self.0.insert(name, rows);
    }

    pub fn get(&self, name: QueryName) -> Option<&ResultSet> {
        self.0.get(&name)
    }

    /// The set for `name` when it ran and returned at least one row.
    pub fn non_empty(&self, name: QueryName) -> Option<&ResultSet> {
        self.get(name).filter(|rs| !rs.is_empty())
    }

    pub fn contains(&self, name: QueryName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryName, &ResultSet)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QueryName, ResultSet)> for ResultSetCollection {
    fn from_iter<T: IntoIterator<Item = (QueryName, ResultSet)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ResultSetCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ResultSet>::deserialize(deserializer)?;
        let mut out = ResultSetCollection::new();
        for (key, rows) in raw {
            match key.parse::<QueryName>() {
                Ok(name) => out.insert(name, rows),
                Err(_) => tracing::warn!(query = %key, "ignoring unknown query name in results"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_normalizes_column_case_and_reads_text() {
        let row = Row::new([
            ("log_mode", json!("ARCHIVELOG")),
            ("Con_Id", json!(3)),
            ("remarks", Value::Null),
            ("flag", json!(true)),
        ]);
        assert_eq!(row.text("LOG_MODE").as_deref(), Some("ARCHIVELOG"));
        assert_eq!(row.text("log_mode").as_deref(), Some("ARCHIVELOG"));
        assert_eq!(row.text("CON_ID").as_deref(), Some("3"));
        assert_eq!(row.text("REMARKS"), None);
        assert_eq!(row.text("MISSING"), None);
        assert_eq!(row.text("FLAG").as_deref(), Some("YES"));
    }

    #[test]
    fn nested_values_are_flattened_to_text() {
        let row = Row::new([("X", json!({"a": 1}))]);
        assert_eq!(row.text("X").as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn collection_accepts_bare_row_arrays_and_tables() {
        let v = json!({
            "database_info": [{"log_mode": "ARCHIVELOG", "cdb": "YES"}],
            "users_check": {"columns": ["username", "account_status"], "rows": []},
            "not_a_query": []
        });
        let results: ResultSetCollection = serde_json::from_value(v).expect("parse");
        assert_eq!(results.len(), 2);
        let db = results.get(QueryName::DatabaseInfo).expect("database_info");
        assert_eq!(db.columns, vec!["CDB".to_string(), "LOG_MODE".to_string()]);
        let users = results.get(QueryName::UsersCheck).expect("users_check");
        assert!(users.is_empty());
        assert_eq!(users.columns, vec!["USERNAME", "ACCOUNT_STATUS"]);
        assert!(results.non_empty(QueryName::UsersCheck).is_none());
    }

    #[test]
    fn collection_survives_a_save_and_reload() {
        let mut results = ResultSetCollection::new();
        results.insert(
            QueryName::XstreamOutbound,
            ResultSet::new(
                vec!["SERVER_NAME".into(), "STATUS".into()],
                vec![Row::new([("SERVER_NAME", json!("XOUT")), ("STATUS", json!("ENABLED"))])],
            ),
        );
        let text = serde_json::to_string(&results).expect("serialize");
        let back: ResultSetCollection = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, results);
    }
}
