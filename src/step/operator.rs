use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied between a step's left and right expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "neq")]
    NotEqual,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lt")]
    SmallerThan,
    #[serde(rename = "lte")]
    SmallerThanOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains")]
    NotContains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "in_contain")]
    InContain,
    #[serde(rename = "not_in_contain")]
    NotInContain,
    #[serde(rename = "in_starts_with")]
    InStartsWith,
    #[serde(rename = "not_in_starts_with")]
    NotInStartsWith,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::SmallerThan,
        Operator::SmallerThanOrEqual,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::InContain,
        Operator::NotInContain,
        Operator::InStartsWith,
        Operator::NotInStartsWith,
    ];

    /// The wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "eq",
            Operator::NotEqual => "neq",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqual => "gte",
            Operator::SmallerThan => "lt",
            Operator::SmallerThanOrEqual => "lte",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::InContain => "in_contain",
            Operator::NotInContain => "not_in_contain",
            Operator::InStartsWith => "in_starts_with",
            Operator::NotInStartsWith => "not_in_starts_with",
        }
    }

    /// Short symbol used when rendering a condition as a label.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::SmallerThan => "<",
            Operator::SmallerThanOrEqual => "<=",
            other => other.as_str(),
        }
    }

    /// Set-membership operators take a JSON array of strings as their right expression.
    pub fn is_set_membership(&self) -> bool {
        matches!(
            self,
            Operator::In
                | Operator::NotIn
                | Operator::InContain
                | Operator::NotInContain
                | Operator::InStartsWith
                | Operator::NotInStartsWith
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
