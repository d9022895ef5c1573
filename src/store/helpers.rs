use std::cmp::Ordering;

use regex::Regex;

use crate::{
    error::QueryError,
    expr::{ComparatorOp, Value},
    predicate::Truth,
    query::{Direction, NullOrdering},
};

pub struct Helpers;

impl Helpers {
    /// Sort comparator. Without an explicit null ordering nulls sort lowest:
    /// first when ascending, last when descending.
    pub fn cmp_for_sort(a: &Value, b: &Value, direction: Direction, nulls: NullOrdering) -> Ordering {
        let ascending = direction == Direction::Asc;
        let nulls_first = match nulls {
            NullOrdering::First => true,
            NullOrdering::Last => false,
            NullOrdering::Default => ascending,
        };
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => if nulls_first { Ordering::Less } else { Ordering::Greater },
            (false, true) => if nulls_first { Ordering::Greater } else { Ordering::Less },
            (false, false) => {
                // mixed types keep a stable total order by type tag
                let ord = a.sql_cmp(b).unwrap_or_else(|| Self::type_rank(a).cmp(&Self::type_rank(b)));
                if ascending { ord } else { ord.reverse() }
            }
        }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) => 4,
        }
    }

    /// Three-valued comparison. Nulls and incomparable values are `Unknown`.
    pub fn cmp3(l: &Value, op: ComparatorOp, r: &Value) -> Truth {
        let Some(ord) = l.sql_cmp(r) else {
            return Truth::Unknown;
        };
        Truth::from_bool(match op {
            ComparatorOp::Eq => ord.is_eq(),
            ComparatorOp::NotEq => ord.is_ne(),
            ComparatorOp::Lt => ord.is_lt(),
            ComparatorOp::LtEq => ord.is_le(),
            ComparatorOp::Gt => ord.is_gt(),
            ComparatorOp::GtEq => ord.is_ge(),
        })
    }

    /// `[NOT] IN` over already evaluated candidates.
    pub fn in3(v: &Value, candidates: impl IntoIterator<Item = Value>, negated: bool) -> Truth {
        let t = if v.is_null() {
            Truth::Unknown
        } else {
            let mut has_null = false;
            let mut found = false;
            for c in candidates {
                match Self::cmp3(v, ComparatorOp::Eq, &c) {
                    Truth::True => {
                        found = true;
                        break;
                    }
                    Truth::Unknown => has_null = true,
                    Truth::False => {}
                }
            }
            if found { Truth::True } else if has_null { Truth::Unknown } else { Truth::False }
        };
        if negated { t.not() } else { t }
    }

    /// Translates a LIKE pattern: `%` any run, `_` one char, `escape` makes
    /// the next char literal. Matching is case-sensitive.
    pub fn like_regex(pattern: &str, escape: char) -> Result<Regex, QueryError> {
        let mut re = String::from("(?s)^");
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                c if c == escape => match chars.next() {
                    Some(next) => re.push_str(&regex::escape(&next.to_string())),
                    None => return QueryError::Storage(format!("LIKE pattern {pattern:?} ends with its escape character")).err(),
                },
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                c => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        re.push('$');
        Regex::new(&re).map_err(|e| QueryError::Storage(format!("bad LIKE pattern {pattern:?}: {e}")))
    }
}
