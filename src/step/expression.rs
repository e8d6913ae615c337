use crate::error::ExpressionError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A named runtime value that expressions can reference as `{{name}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    pub name: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub description: String,
}

/// Returns every distinct `{{name}}` token embedded in an expression, in order of appearance.
pub fn datasource_tokens(expression: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = expression;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() {
            tokens.push(name);
        }
        rest = &after[end + 2..];
    }
    tokens.into_iter().unique().collect()
}

/// Wraps a datasource name into its substitution token.
pub fn token_for(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Normalizes the right-hand side of a set-membership condition to JSON array text.
///
/// Accepts either a JSON array of strings or a comma-separated list.
pub fn normalize_list(input: &str) -> Result<String, ExpressionError> {
    let trimmed = input.trim();
    let items: Vec<String> = if trimmed.starts_with('[') {
        let parsed: Vec<serde_json::Value> = serde_json::from_str(trimmed)
            .map_err(|e| ExpressionError::InvalidList(format!("{}: {}", trimmed, e)))?;
        parsed
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(ExpressionError::NonStringItem(other.to_string())),
            })
            .collect::<Result<_, _>>()?
    } else {
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };
    serde_json::to_string(&items).map_err(|e| ExpressionError::InvalidList(e.to_string()))
}

/// Checks that `input` is already a JSON array of strings.
pub fn parse_list(input: &str) -> Result<Vec<String>, ExpressionError> {
    let parsed: serde_json::Value = serde_json::from_str(input.trim())
        .map_err(|e| ExpressionError::InvalidList(format!("{}: {}", input, e)))?;
    match parsed {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(ExpressionError::NonStringItem(other.to_string())),
            })
            .collect(),
        other => Err(ExpressionError::InvalidList(format!(
            "expected a JSON array, found {}",
            other
        ))),
    }
}

/// Read-only view over the datasources available at one execution point.
#[derive(Debug, Clone, Default)]
pub struct DatasourceCatalog {
    datasources: Vec<Datasource>,
}

impl DatasourceCatalog {
    pub fn new(datasources: Vec<Datasource>) -> Self {
        let datasources = datasources
            .into_iter()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .dedup_by(|a, b| a.name == b.name)
            .collect();
        Self { datasources }
    }

    pub fn datasources(&self) -> &[Datasource] {
        &self.datasources
    }

    pub fn get(&self, name: &str) -> Option<&Datasource> {
        self.datasources.iter().find(|d| d.name == name)
    }

    /// Autocompletion candidates: case-insensitive prefix matches, sorted by name.
    pub fn complete(&self, prefix: &str) -> Vec<&Datasource> {
        let prefix = prefix.trim_start_matches("{{").trim().to_lowercase();
        self.datasources
            .iter()
            .filter(|d| d.name.to_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Tokens in `expression` that name no known datasource.
    pub fn unknown_references<'e>(&self, expression: &'e str) -> Vec<&'e str> {
        datasource_tokens(expression)
            .into_iter()
            .filter(|name| self.get(name).is_none())
            .collect()
    }
}
