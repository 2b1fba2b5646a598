//! Filter predicates in the catalog service's nested-array form.
//!
//! A filter is a recursive predicate tree over attribute, operator, and
//! literal value, combined with `and` / `or`. The core passes filters through
//! to the service uninterpreted; attribute names and their semantics belong
//! to the caller.
//!
//! Wire shape (JSON):
//! - comparison: `["votecount", ">", 10]`
//! - conjunction: `["and", ["votecount", ">", 10], ["votecount", "<", 100]]`

use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;

/// Comparison operator accepted by the catalog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter expression tree.
///
/// Constructed exhaustively through [`Filter::cmp`], [`Filter::and`] and
/// [`Filter::or`]; the constructors normalize degenerate one-child
/// combinators so the serialized form always matches what the service
/// accepts (combinators carry at least two operands).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Cmp {
        attr: String,
        op: Op,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Single attribute comparison.
    pub fn cmp(attr: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Filter::Cmp {
            attr: attr.into(),
            op,
            value: value.into(),
        }
    }

    /// Conjunction. A single-element input collapses to that element.
    pub fn and(mut parts: Vec<Filter>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::And(parts)
        }
    }

    /// Disjunction. A single-element input collapses to that element.
    pub fn or(mut parts: Vec<Filter>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::Or(parts)
        }
    }

    /// Half-open range restriction `attr >= lower AND attr < upper`, with the
    /// upper comparison omitted when the range is unbounded above.
    pub fn range(attr: &str, lower: Value, upper: Option<Value>) -> Self {
        let mut parts = vec![Filter::cmp(attr, Op::Ge, lower)];
        if let Some(upper) = upper {
            parts.push(Filter::cmp(attr, Op::Lt, upper));
        }
        Filter::and(parts)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::Cmp { attr, op, value } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(attr)?;
                seq.serialize_element(op.as_str())?;
                seq.serialize_element(value)?;
                seq.end()
            }
            Filter::And(parts) => serialize_combinator(serializer, "and", parts),
            Filter::Or(parts) => serialize_combinator(serializer, "or", parts),
        }
    }
}

fn serialize_combinator<S: Serializer>(
    serializer: S,
    tag: &str,
    parts: &[Filter],
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(parts.len() + 1))?;
    seq.serialize_element(tag)?;
    for part in parts {
        seq.serialize_element(part)?;
    }
    seq.end()
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<filter>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
