use serde::{Deserialize, Serialize};

/// A constant value recovered from a call argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Str(String),
    Bool(bool),
    /// Numeric literal, kept as written.
    Number(String),
    None,
}

/// Outcome of resolving one argument role.
///
/// `Absent` and `Unresolved` are deliberately distinct: an omitted revision
/// and a revision computed at runtime are classified differently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "literal", rename_all = "snake_case")]
pub enum Resolved {
    Absent,
    Unresolved,
    Literal(Literal),
}

impl Resolved {
    pub fn str(value: &str) -> Self {
        Resolved::Literal(Literal::Str(value.to_string()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::Literal(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Only a literal `True` counts; anything else is conservatively false.
    pub fn is_true(&self) -> bool {
        matches!(self, Resolved::Literal(Literal::Bool(true)))
    }
}

/// One recognised invocation of a catalog API with its arguments resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub path: String,
    /// 1-based line of the call expression.
    pub line: usize,
    /// Qualified name of the matched catalog entry.
    pub api: String,
    pub identifier: Resolved,
    pub revision: Resolved,
    /// `(flag name, value)` for every trust flag of the entry, in catalog order.
    pub trust_flags: Vec<(String, Resolved)>,
}
