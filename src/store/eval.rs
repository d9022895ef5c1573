use std::collections::HashSet;

use crate::{
    error::QueryError,
    expr::{ArithmeticOp, CaseTest, ComparatorOp, Expr, Value, LIKE_ESCAPE},
    metadata::ValueType,
    predicate::{Predicate, Truth},
    store::{accumulator_for, Helpers, PlanExecutor, Scope},
};

/// What an expression sees while it is evaluated: the current row, the
/// group it stands for (grouped queries only), and the enclosing query's
/// frame for correlated subqueries.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub row: &'a Scope,
    pub group: Option<&'a [Scope]>,
    pub outer: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    pub fn new(row: &'a Scope) -> Self {
        Self { row, group: None, outer: None }
    }

    pub fn nested(row: &'a Scope, outer: Option<&'a Frame<'a>>) -> Self {
        Self { row, group: None, outer }
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        match self.row.get(key) {
            Some(v) => Some(v),
            None => self.outer.and_then(|o| o.lookup(key)),
        }
    }
}

impl PlanExecutor<'_> {
    pub fn eval(&self, expr: &Expr, frame: &Frame<'_>) -> Result<Value, QueryError> {
        match expr {
            Expr::Literal(v) | Expr::Constant(v) => Ok(v.clone()),
            Expr::Column(c) => frame
                .lookup(&c.key())
                .cloned()
                .ok_or_else(|| QueryError::Storage(format!("column {c} is not in scope"))),
            Expr::Binary { left, op, right } => {
                let l = self.eval(left, frame)?;
                let r = self.eval(right, frame)?;
                Self::arithmetic(&l, *op, &r)
            }
            Expr::Concat { left, right } => {
                let l = self.eval(left, frame)?;
                let r = self.eval(right, frame)?;
                Self::function("concat", &[l, r])
            }
            Expr::Function { name, args, .. } => {
                let args = args.iter().map(|a| self.eval(a, frame)).collect::<Result<Vec<_>, _>>()?;
                Self::function(name, &args)
            }
            Expr::Cast { expr, ty } => Self::cast(self.eval(expr, frame)?, *ty),
            Expr::Aggregate { func, arg, distinct } => {
                let group = frame.group.ok_or_else(|| {
                    QueryError::Storage(format!("aggregate {expr} evaluated outside a group"))
                })?;
                let mut acc = accumulator_for(*func);
                let mut seen = HashSet::new();
                for row in group {
                    let inner = Frame::nested(row, frame.outer);
                    let v = match arg {
                        Some(a) => self.eval(a, &inner)?,
                        None => Value::Bool(true),
                    };
                    if *distinct && !v.is_null() && !seen.insert(v.clone()) {
                        continue;
                    }
                    acc.update(&v)?;
                }
                Ok(acc.finalize())
            }
            Expr::Case(case) => {
                let subject = case.subject.as_ref().map(|s| self.eval(s, frame)).transpose()?;
                for branch in &case.branches {
                    let hit = match &branch.test {
                        CaseTest::Value(e) => {
                            let v = self.eval(e, frame)?;
                            subject.as_ref().is_some_and(|s| Helpers::cmp3(s, ComparatorOp::Eq, &v).is_true())
                        }
                        CaseTest::Predicate(p) => self.eval_predicate3(p, frame)?.is_true(),
                    };
                    if hit {
                        return self.eval(&branch.then, frame);
                    }
                }
                match &case.otherwise {
                    Some(e) => self.eval(e, frame),
                    None => Ok(Value::Null),
                }
            }
            Expr::SubQuery(plan) => {
                let rows = self.select(plan, Some(frame))?;
                match rows.as_slice() {
                    [] => Ok(Value::Null),
                    [row] => Ok(row.first().cloned().unwrap_or(Value::Null)),
                    many => QueryError::Storage(format!("scalar subquery returned {} rows", many.len())).err(),
                }
            }
        }
    }

    pub fn eval_predicate3(&self, predicate: &Predicate, frame: &Frame<'_>) -> Result<Truth, QueryError> {
        Ok(match predicate {
            Predicate::And(v) => {
                let mut acc = Truth::True;
                for p in v {
                    acc = acc.and(self.eval_predicate3(p, frame)?);
                }
                acc
            }
            Predicate::Or(v) => {
                let mut acc = Truth::False;
                for p in v {
                    acc = acc.or(self.eval_predicate3(p, frame)?);
                }
                acc
            }
            Predicate::Not(p) => self.eval_predicate3(p, frame)?.not(),
            Predicate::Compare { left, op, right } => {
                let l = self.eval(left, frame)?;
                let r = self.eval(right, frame)?;
                Helpers::cmp3(&l, *op, &r)
            }
            Predicate::IsNull { expr, negated } => {
                let t = Truth::from_bool(self.eval(expr, frame)?.is_null());
                if *negated { t.not() } else { t }
            }
            Predicate::InList { expr, list, negated } => {
                let v = self.eval(expr, frame)?;
                let candidates = list.iter().map(|e| self.eval(e, frame)).collect::<Result<Vec<_>, _>>()?;
                Helpers::in3(&v, candidates, *negated)
            }
            Predicate::InSubQuery { expr, plan, negated } => {
                let v = self.eval(expr, frame)?;
                let rows = self.select(plan, Some(frame))?;
                Helpers::in3(&v, rows.into_iter().filter_map(|r| r.into_iter().next()), *negated)
            }
            Predicate::Like { expr, pattern, negated } => {
                let v = self.eval(expr, frame)?;
                let p = self.eval(pattern, frame)?;
                let t = match (v, p) {
                    (Value::Text(s), Value::Text(pat)) => {
                        Truth::from_bool(Helpers::like_regex(&pat, LIKE_ESCAPE)?.is_match(&s))
                    }
                    _ => Truth::Unknown,
                };
                if *negated { t.not() } else { t }
            }
        })
    }

    fn arithmetic(l: &Value, op: ArithmeticOp, r: &Value) -> Result<Value, QueryError> {
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }
        if let (Value::Int(a), Value::Int(b)) = (l, r) {
            let out = match op {
                ArithmeticOp::Add => a.checked_add(*b),
                ArithmeticOp::Sub => a.checked_sub(*b),
                ArithmeticOp::Mul => a.checked_mul(*b),
                ArithmeticOp::Div if *b == 0 => return QueryError::Storage("division by zero".into()).err(),
                ArithmeticOp::Div => a.checked_div(*b),
            };
            return out
                .map(Value::Int)
                .ok_or_else(|| QueryError::Storage(format!("integer overflow in {l} {op} {r}")));
        }
        let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
            return QueryError::Storage(format!("non numeric operands {l} {op} {r}")).err();
        };
        Ok(Value::float(match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            ArithmeticOp::Div if b == 0.0 => return QueryError::Storage("division by zero".into()).err(),
            ArithmeticOp::Div => a / b,
        }))
    }

    fn function(name: &str, args: &[Value]) -> Result<Value, QueryError> {
        let lname = name.to_ascii_lowercase();
        if lname == "coalesce" {
            return Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null));
        }
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        Ok(match (lname.as_str(), args) {
            ("lower", [Value::Text(s)]) => Value::Text(s.to_lowercase()),
            ("upper", [Value::Text(s)]) => Value::Text(s.to_uppercase()),
            ("trim", [Value::Text(s)]) => Value::Text(s.trim().to_string()),
            ("length", [Value::Text(s)]) => Value::Int(s.chars().count() as i64),
            ("replace", [Value::Text(s), Value::Text(from), Value::Text(to)]) => {
                if from.is_empty() { Value::Text(s.clone()) } else { Value::Text(s.replace(from.as_str(), to)) }
            }
            ("concat", [Value::Text(a), Value::Text(b)]) => Value::Text(format!("{a}{b}")),
            _ => {
                return QueryError::Storage(format!(
                    "function {name} is not available in the in-memory store for {} argument(s)", args.len()
                )).err();
            }
        })
    }

    fn cast(v: Value, ty: ValueType) -> Result<Value, QueryError> {
        Ok(match (v, ty) {
            (Value::Null, _) => Value::Null,
            (Value::Text(s), ValueType::Text) => Value::Text(s),
            (Value::Date(d), ValueType::Text) => Value::Text(d.format("%Y-%m-%d").to_string()),
            (Value::Int(i), ValueType::Text) => Value::Text(i.to_string()),
            (Value::Float(f), ValueType::Text) => Value::Text(f.to_string()),
            (Value::Bool(b), ValueType::Text) => Value::Text(b.to_string()),
            (Value::Float(f), ValueType::Int) => Value::Int(f.trunc() as i64),
            (Value::Int(i), ValueType::Float) => Value::float(i as f64),
            (Value::Text(s), ValueType::Int) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| QueryError::Storage(format!("cannot cast '{s}' to Int")))?,
            (v, ty) if v.value_type() == ty => v,
            (v, ty) => Value::from_json(&v.to_json(), ty)
                .ok_or_else(|| QueryError::Storage(format!("cannot cast {v} to {ty}")))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        expr::ColumnRef,
        store::Table,
    };

    fn row(pairs: &[(&str, Value)]) -> Scope {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn col(key: &str, ty: ValueType) -> Expr {
        let (alias, column) = key.split_once('.').unwrap();
        Expr::Column(ColumnRef::new(alias, column, ty))
    }

    fn with_exec<R>(f: impl FnOnce(&PlanExecutor<'_>) -> R) -> R {
        let tables: HashMap<String, Table> = HashMap::new();
        f(&PlanExecutor::new(&tables))
    }

    #[test]
    fn arithmetic_and_functions() {
        let r = row(&[("m.age", Value::Int(10)), ("m.username", Value::from(" Kim "))]);
        with_exec(|ex| {
            let f = Frame::new(&r);
            let age = col("m.age", ValueType::Int);
            let name = col("m.username", ValueType::Text);
            assert_eq!(ex.eval(&age.add(1).unwrap(), &f).unwrap(), Value::Int(11));
            assert_eq!(ex.eval(&age.div(4).unwrap(), &f).unwrap(), Value::Int(2));
            assert_eq!(ex.eval(&age.div(4.0).unwrap(), &f).unwrap(), Value::float(2.5));
            assert_eq!(ex.eval(&name.trim().unwrap().upper().unwrap(), &f).unwrap(), Value::from("KIM"));
            assert_eq!(ex.eval(&name.trim().unwrap().length().unwrap(), &f).unwrap(), Value::Int(3));
            assert_eq!(
                ex.eval(&name.trim().unwrap().concat("_").unwrap().concat(age.string_value()).unwrap(), &f).unwrap(),
                Value::from("Kim_10")
            );
            assert!(ex.eval(&age.div(0).unwrap(), &f).is_err());
        });
    }

    #[test]
    fn nulls_propagate_except_coalesce() {
        let r = row(&[("m.username", Value::Null), ("m.age", Value::Null)]);
        with_exec(|ex| {
            let f = Frame::new(&r);
            let name = col("m.username", ValueType::Text);
            let age = col("m.age", ValueType::Int);
            assert_eq!(ex.eval(&name.lower().unwrap(), &f).unwrap(), Value::Null);
            assert_eq!(ex.eval(&age.add(1).unwrap(), &f).unwrap(), Value::Null);
            assert_eq!(ex.eval(&name.coalesce("anon").unwrap(), &f).unwrap(), Value::from("anon"));
        });
    }

    #[test]
    fn three_valued_predicates() {
        let r = row(&[("m.age", Value::Null), ("m.username", Value::from("member1"))]);
        with_exec(|ex| {
            let f = Frame::new(&r);
            let age = col("m.age", ValueType::Int);
            let name = col("m.username", ValueType::Text);
            let unknown = age.gt(1).unwrap();
            assert_eq!(ex.eval_predicate3(&unknown, &f).unwrap(), Truth::Unknown);
            assert_eq!(ex.eval_predicate3(&unknown.clone().not(), &f).unwrap(), Truth::Unknown);
            let or = unknown.clone().or(name.eq("member1").unwrap());
            assert_eq!(ex.eval_predicate3(&or, &f).unwrap(), Truth::True);
            let and = unknown.and(name.eq("member1").unwrap());
            assert_eq!(ex.eval_predicate3(&and, &f).unwrap(), Truth::Unknown);
            assert_eq!(ex.eval_predicate3(&age.is_null(), &f).unwrap(), Truth::True);
            assert_eq!(ex.eval_predicate3(&name.starts_with("member").unwrap(), &f).unwrap(), Truth::True);
            assert_eq!(ex.eval_predicate3(&name.contains("%").unwrap(), &f).unwrap(), Truth::False);
        });
    }

    #[test]
    fn case_expressions() {
        let r = row(&[("m.age", Value::Int(20))]);
        with_exec(|ex| {
            let f = Frame::new(&r);
            let age = col("m.age", ValueType::Int);
            let simple = age.when(10).unwrap().then("ten").unwrap()
                .when(20).unwrap().then("twenty").unwrap()
                .otherwise("other").unwrap();
            assert_eq!(ex.eval(&simple, &f).unwrap(), Value::from("twenty"));
            let searched = Expr::case()
                .when(age.between(0, 10).unwrap()).then(1).unwrap()
                .otherwise(0).unwrap();
            assert_eq!(ex.eval(&searched, &f).unwrap(), Value::Int(0));
        });
    }

    #[test]
    fn correlated_lookup_falls_back_to_outer_frame() {
        let outer_row = row(&[("m.age", Value::Int(30))]);
        let inner_row = row(&[("s.age", Value::Int(10))]);
        with_exec(|ex| {
            let outer = Frame::new(&outer_row);
            let inner = Frame::nested(&inner_row, Some(&outer));
            let p = col("s.age", ValueType::Int).lt(col("m.age", ValueType::Int)).unwrap();
            assert_eq!(ex.eval_predicate3(&p, &inner).unwrap(), Truth::True);
            assert!(ex.eval(&col("x.y", ValueType::Int), &inner).is_err());
        });
    }

    #[test]
    fn aggregates_need_a_group() {
        let r = row(&[("m.age", Value::Int(1))]);
        let group = vec![row(&[("m.age", Value::Int(1))]), row(&[("m.age", Value::Int(1))]), row(&[("m.age", Value::Int(3))])];
        with_exec(|ex| {
            let age = col("m.age", ValueType::Int);
            assert!(ex.eval(&age.sum().unwrap(), &Frame::new(&r)).is_err());
            let f = Frame { row: &r, group: Some(&group), outer: None };
            assert_eq!(ex.eval(&age.sum().unwrap(), &f).unwrap(), Value::Int(5));
            assert_eq!(ex.eval(&age.count_distinct(), &f).unwrap(), Value::Int(2));
            assert_eq!(ex.eval(&Expr::count_all(), &f).unwrap(), Value::Int(3));
        });
    }
}
