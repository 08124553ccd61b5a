//! Query plan types produced by the parser.

use crate::alias::IDENTITY_FIELD;
use crate::value::Value;
use std::fmt;

/// A fully parsed and validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub select: Vec<SelectItem>,
    pub from: FromPath,
    pub filter: Option<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// True when the select list is the single `COUNT(*)` aggregate.
    pub fn is_count(&self) -> bool {
        matches!(self.select.as_slice(), [SelectItem::CountAll])
    }
}

/// Functions allowed in the select list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectFunction {
    ToDate,
    PrettyJson,
}

impl SelectFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("toDate") {
            Some(SelectFunction::ToDate)
        } else if name.eq_ignore_ascii_case("prettyJson") {
            Some(SelectFunction::PrettyJson)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectFunction::ToDate => "toDate",
            SelectFunction::PrettyJson => "prettyJson",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Field(String),
    Function {
        function: SelectFunction,
        argument: String,
    },
    CountAll,
    Wildcard,
}

impl SelectItem {
    /// Column label in result rows. The identity sentinel is shown under the
    /// user-facing name `id`.
    pub fn label(&self) -> String {
        match self {
            SelectItem::Field(name) => display_field(name).to_string(),
            SelectItem::Function { function, argument } => {
                format!("{}({})", function.name(), display_field(argument))
            }
            SelectItem::CountAll => "COUNT(*)".to_string(),
            SelectItem::Wildcard => "*".to_string(),
        }
    }
}

fn display_field(name: &str) -> &str {
    if name == IDENTITY_FIELD {
        "id"
    } else {
        name
    }
}

/// Target of the FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromPath {
    /// Slash-delimited collection path, e.g. `users` or `users/u1/orders`.
    Collection(String),
    /// Every collection with this name, regardless of parent path.
    CollectionGroup(String),
}

impl fmt::Display for FromPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromPath::Collection(path) => f.write_str(path),
            FromPath::CollectionGroup(name) => write!(f, "GROUP {}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => f.write_str("ASC"),
            Direction::Descending => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Comparison operators accepted in WHERE conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
}

impl Operator {
    /// Parse an operator token. Word operators are case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "=" => Operator::Eq,
            "!=" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::LtEq,
            ">" => Operator::Gt,
            ">=" => Operator::GtEq,
            _ => match token.to_uppercase().as_str() {
                "IN" => Operator::In,
                "NOT IN" => Operator::NotIn,
                "ARRAY_CONTAINS" => Operator::ArrayContains,
                "ARRAY_CONTAINS_ANY" => Operator::ArrayContainsAny,
                _ => return None,
            },
        };
        Some(op)
    }

    /// Operators whose operand is a list literal.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::ArrayContainsAny
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::ArrayContains => "ARRAY_CONTAINS",
            Operator::ArrayContainsAny => "ARRAY_CONTAINS_ANY",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("AND") {
            Some(Connective::And)
        } else if token.eq_ignore_ascii_case("OR") {
            Some(Connective::Or)
        } else {
            None
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => f.write_str("AND"),
            Connective::Or => f.write_str("OR"),
        }
    }
}

/// Boolean filter tree. Conditions are always leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition {
        field: String,
        operator: Operator,
        value: Value,
    },
    Logical {
        operator: Connective,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
}

impl Predicate {
    pub fn condition(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Predicate::Condition {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn logical(operator: Connective, left: Predicate, right: Predicate) -> Self {
        Predicate::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Condition {
                field,
                operator,
                value,
            } => write!(f, "{} {} {}", field, operator, value),
            Predicate::Logical {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
        }
    }
}
