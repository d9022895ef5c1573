use std::{fmt, sync::Arc};

use chrono::NaiveDate;

use crate::{
    error::QueryError,
    expr::{AggregateFunc, ArithmeticOp, CaseBuilder, CaseExpr, ColumnRef, ComparatorOp, SimpleCaseWhen, Value},
    metadata::ValueType,
    predicate::Predicate,
    query::{Direction, NullOrdering, OrderSpec, QueryPlan, SelectItem},
};

/// Escape character used for every generated LIKE pattern.
pub const LIKE_ESCAPE: char = '!';

/// A typed expression node.
///
/// Nodes are immutable and built bottom-up through the methods below, each of
/// which checks operand types before producing a new node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Binary { left: Box<Expr>, op: ArithmeticOp, right: Box<Expr> },
    Concat { left: Box<Expr>, right: Box<Expr> },
    Function { name: String, args: Vec<Expr>, ty: ValueType },
    Cast { expr: Box<Expr>, ty: ValueType },
    /// `arg == None` is `count(*)`.
    Aggregate { func: AggregateFunc, arg: Option<Box<Expr>>, distinct: bool },
    Case(Box<CaseExpr>),
    SubQuery(Arc<QueryPlan>),
    /// Select-only value, never sent to the database.
    Constant(Value),
}

impl Expr {
    pub fn lit(v: impl Into<Value>) -> Expr {
        Expr::Literal(v.into())
    }

    pub fn constant(v: impl Into<Value>) -> Expr {
        Expr::Constant(v.into())
    }

    /// User-declared scalar function, rendered as `name(args...)`.
    pub fn function(name: &str, ty: ValueType, args: Vec<Expr>) -> Expr {
        Expr::Function { name: name.to_string(), args, ty }
    }

    pub fn aggregate(func: AggregateFunc, arg: Option<Expr>, distinct: bool) -> Expr {
        Expr::Aggregate { func, arg: arg.map(Box::new), distinct }
    }

    /// `count(*)`
    pub fn count_all() -> Expr {
        Expr::aggregate(AggregateFunc::Count, None, false)
    }

    /// Scalar subquery. The plan must project exactly one non-entity column.
    pub fn subquery(plan: QueryPlan) -> Result<Expr, QueryError> {
        plan.scalar_type()?;
        Ok(Expr::SubQuery(Arc::new(plan)))
    }

    /// Searched case: `case when p then r ... else r end`.
    pub fn case() -> CaseBuilder {
        CaseBuilder::new()
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Column(c) => c.ty,
            Expr::Literal(v) | Expr::Constant(v) => v.value_type(),
            Expr::Binary { left, right, .. } => ValueType::promote(left.value_type(), right.value_type()),
            Expr::Concat { .. } => ValueType::Text,
            Expr::Function { ty, .. } | Expr::Cast { ty, .. } => *ty,
            Expr::Aggregate { func, arg, .. } => match func {
                AggregateFunc::Count => ValueType::Int,
                AggregateFunc::Avg => ValueType::Float,
                AggregateFunc::Sum | AggregateFunc::Max | AggregateFunc::Min => {
                    arg.as_ref().map(|a| a.value_type()).unwrap_or(ValueType::Null)
                }
            },
            Expr::Case(case) => case.ty,
            Expr::SubQuery(plan) => plan.scalar_type().unwrap_or(ValueType::Null),
        }
    }

    /// True when an aggregate appears in this expression outside of any subquery.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Binary { left, right, .. } | Expr::Concat { left, right } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::Function { args, .. } => args.iter().any(Expr::contains_aggregate),
            Expr::Cast { expr, .. } => expr.contains_aggregate(),
            Expr::Case(case) => case.contains_aggregate(),
            Expr::Column(_) | Expr::Literal(_) | Expr::Constant(_) | Expr::SubQuery(_) => false,
        }
    }

    fn require(&self, context: &str, expected: &str, ok: impl Fn(ValueType) -> bool) -> Result<ValueType, QueryError> {
        let ty = self.value_type();
        if ty == ValueType::Null || ok(ty) {
            Ok(ty)
        } else {
            Err(QueryError::type_mismatch(context, expected, ty))
        }
    }

    fn compare(&self, op: ComparatorOp, rhs: Expr) -> Result<Predicate, QueryError> {
        let context = op.method();
        if op.is_ordering() {
            self.require(context, "numeric, text or date", ValueType::is_orderable)?;
            rhs.require(context, "numeric, text or date", ValueType::is_orderable)?;
        }
        let (l, r) = (self.value_type(), rhs.value_type());
        if !ValueType::compatible(l, r) {
            return Err(QueryError::type_mismatch(context, &l.to_string(), r));
        }
        Ok(Predicate::Compare { left: self.clone(), op, right: rhs })
    }

    pub fn eq(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::Eq, rhs.into())
    }

    pub fn ne(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::NotEq, rhs.into())
    }

    pub fn gt(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::Gt, rhs.into())
    }

    pub fn goe(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::GtEq, rhs.into())
    }

    pub fn lt(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::Lt, rhs.into())
    }

    pub fn loe(&self, rhs: impl Into<Expr>) -> Result<Predicate, QueryError> {
        self.compare(ComparatorOp::LtEq, rhs.into())
    }

    /// `self >= lo AND self <= hi`
    pub fn between(&self, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Result<Predicate, QueryError> {
        Ok(self.goe(lo)?.and(self.loe(hi)?))
    }

    fn membership(&self, values: Vec<Expr>, negated: bool) -> Result<Predicate, QueryError> {
        if values.is_empty() {
            return QueryError::IncompleteQuery("in list needs at least one value".into()).err();
        }
        let ty = self.value_type();
        for v in &values {
            if !ValueType::compatible(ty, v.value_type()) {
                return Err(QueryError::type_mismatch("in", &ty.to_string(), v.value_type()));
            }
        }
        Ok(Predicate::InList { expr: self.clone(), list: values, negated })
    }

    pub fn in_list<V: Into<Expr>>(&self, values: impl IntoIterator<Item = V>) -> Result<Predicate, QueryError> {
        self.membership(values.into_iter().map(Into::into).collect(), false)
    }

    pub fn not_in_list<V: Into<Expr>>(&self, values: impl IntoIterator<Item = V>) -> Result<Predicate, QueryError> {
        self.membership(values.into_iter().map(Into::into).collect(), true)
    }

    fn sub_membership(&self, plan: QueryPlan, negated: bool) -> Result<Predicate, QueryError> {
        let (ty, sub) = (self.value_type(), plan.scalar_type()?);
        if !ValueType::compatible(ty, sub) {
            return Err(QueryError::type_mismatch("in", &ty.to_string(), sub));
        }
        Ok(Predicate::InSubQuery { expr: self.clone(), plan: Arc::new(plan), negated })
    }

    pub fn in_subquery(&self, plan: QueryPlan) -> Result<Predicate, QueryError> {
        self.sub_membership(plan, false)
    }

    pub fn not_in_subquery(&self, plan: QueryPlan) -> Result<Predicate, QueryError> {
        self.sub_membership(plan, true)
    }

    fn matching(&self, context: &str, pattern: String, negated: bool) -> Result<Predicate, QueryError> {
        self.require(context, "text", |t| t == ValueType::Text)?;
        Ok(Predicate::Like { expr: self.clone(), pattern: Expr::lit(pattern), negated })
    }

    /// Raw LIKE pattern; `!` escapes `%` and `_`.
    pub fn like(&self, pattern: &str) -> Result<Predicate, QueryError> {
        self.matching("like", pattern.to_string(), false)
    }

    pub fn not_like(&self, pattern: &str) -> Result<Predicate, QueryError> {
        self.matching("not_like", pattern.to_string(), true)
    }

    pub fn starts_with(&self, prefix: &str) -> Result<Predicate, QueryError> {
        self.matching("starts_with", format!("{}%", escape_like(prefix)), false)
    }

    pub fn ends_with(&self, suffix: &str) -> Result<Predicate, QueryError> {
        self.matching("ends_with", format!("%{}", escape_like(suffix)), false)
    }

    pub fn contains(&self, infix: &str) -> Result<Predicate, QueryError> {
        self.matching("contains", format!("%{}%", escape_like(infix)), false)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull { expr: self.clone(), negated: false }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull { expr: self.clone(), negated: true }
    }

    fn arithmetic(&self, op: ArithmeticOp, rhs: Expr) -> Result<Expr, QueryError> {
        self.require(op.method(), "numeric", ValueType::is_numeric)?;
        rhs.require(op.method(), "numeric", ValueType::is_numeric)?;
        Ok(Expr::Binary { left: Box::new(self.clone()), op, right: Box::new(rhs) })
    }

    pub fn add(&self, rhs: impl Into<Expr>) -> Result<Expr, QueryError> {
        self.arithmetic(ArithmeticOp::Add, rhs.into())
    }

    pub fn sub(&self, rhs: impl Into<Expr>) -> Result<Expr, QueryError> {
        self.arithmetic(ArithmeticOp::Sub, rhs.into())
    }

    pub fn mul(&self, rhs: impl Into<Expr>) -> Result<Expr, QueryError> {
        self.arithmetic(ArithmeticOp::Mul, rhs.into())
    }

    pub fn div(&self, rhs: impl Into<Expr>) -> Result<Expr, QueryError> {
        self.arithmetic(ArithmeticOp::Div, rhs.into())
    }

    pub fn concat(&self, rhs: impl Into<Expr>) -> Result<Expr, QueryError> {
        let rhs = rhs.into();
        self.require("concat", "text", |t| t == ValueType::Text)?;
        rhs.require("concat", "text", |t| t == ValueType::Text)?;
        Ok(Expr::Concat { left: Box::new(self.clone()), right: Box::new(rhs) })
    }

    /// Any value as text, compiled as a cast.
    pub fn string_value(&self) -> Expr {
        Expr::Cast { expr: Box::new(self.clone()), ty: ValueType::Text }
    }

    fn text_function(&self, name: &str, ty: ValueType, extra: Vec<Expr>) -> Result<Expr, QueryError> {
        self.require(name, "text", |t| t == ValueType::Text)?;
        let mut args = vec![self.clone()];
        for e in extra {
            e.require(name, "text", |t| t == ValueType::Text)?;
            args.push(e);
        }
        Ok(Expr::function(name, ty, args))
    }

    pub fn lower(&self) -> Result<Expr, QueryError> {
        self.text_function("lower", ValueType::Text, vec![])
    }

    pub fn upper(&self) -> Result<Expr, QueryError> {
        self.text_function("upper", ValueType::Text, vec![])
    }

    pub fn trim(&self) -> Result<Expr, QueryError> {
        self.text_function("trim", ValueType::Text, vec![])
    }

    pub fn length(&self) -> Result<Expr, QueryError> {
        self.text_function("length", ValueType::Int, vec![])
    }

    pub fn replace(&self, from: impl Into<Expr>, to: impl Into<Expr>) -> Result<Expr, QueryError> {
        self.text_function("replace", ValueType::Text, vec![from.into(), to.into()])
    }

    pub fn coalesce(&self, fallback: impl Into<Expr>) -> Result<Expr, QueryError> {
        let fallback = fallback.into();
        let (l, r) = (self.value_type(), fallback.value_type());
        if !ValueType::compatible(l, r) {
            return Err(QueryError::type_mismatch("coalesce", &l.to_string(), r));
        }
        Ok(Expr::function("coalesce", ValueType::promote(l, r), vec![self.clone(), fallback]))
    }

    pub fn count(&self) -> Expr {
        Expr::aggregate(AggregateFunc::Count, Some(self.clone()), false)
    }

    pub fn count_distinct(&self) -> Expr {
        Expr::aggregate(AggregateFunc::Count, Some(self.clone()), true)
    }

    pub fn sum(&self) -> Result<Expr, QueryError> {
        self.require("sum", "numeric", ValueType::is_numeric)?;
        Ok(Expr::aggregate(AggregateFunc::Sum, Some(self.clone()), false))
    }

    pub fn avg(&self) -> Result<Expr, QueryError> {
        self.require("avg", "numeric", ValueType::is_numeric)?;
        Ok(Expr::aggregate(AggregateFunc::Avg, Some(self.clone()), false))
    }

    pub fn max(&self) -> Result<Expr, QueryError> {
        self.require("max", "numeric, text or date", ValueType::is_orderable)?;
        Ok(Expr::aggregate(AggregateFunc::Max, Some(self.clone()), false))
    }

    pub fn min(&self) -> Result<Expr, QueryError> {
        self.require("min", "numeric, text or date", ValueType::is_orderable)?;
        Ok(Expr::aggregate(AggregateFunc::Min, Some(self.clone()), false))
    }

    /// Simple case over this expression: `case self when v then r ... end`.
    pub fn when(&self, value: impl Into<Expr>) -> Result<SimpleCaseWhen, QueryError> {
        SimpleCaseWhen::start(self.clone(), value.into())
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::new(self.clone(), Direction::Asc, NullOrdering::Default)
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::new(self.clone(), Direction::Desc, NullOrdering::Default)
    }

    /// Select item with an explicit label; the name DTO binding looks up.
    pub fn alias(&self, name: &str) -> SelectItem {
        SelectItem::Expr { expr: self.clone(), alias: Some(name.to_string()) }
    }
}

/// Escapes `!`, `%` and `_` so the text matches literally under `ESCAPE '!'`.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Literal(v) | Expr::Constant(v) => write!(f, "{v}"),
            Expr::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::Concat { left, right } => write!(f, "concat({left}, {right})"),
            Expr::Function { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Cast { expr, ty } => write!(f, "cast({expr} as {ty})"),
            Expr::Aggregate { func, arg, distinct } => match arg {
                None => write!(f, "{func}(*)"),
                Some(a) if *distinct => write!(f, "{func}(distinct {a})"),
                Some(a) => write!(f, "{func}({a})"),
            },
            Expr::Case(case) => write!(f, "{case}"),
            Expr::SubQuery(_) => write!(f, "(subquery)"),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self { Expr::Literal(v) }
}
impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self { e.clone() }
}
impl From<ColumnRef> for Expr {
    fn from(c: ColumnRef) -> Self { Expr::Column(c) }
}
impl From<bool> for Expr {
    fn from(v: bool) -> Self { Expr::lit(v) }
}
impl From<i32> for Expr {
    fn from(v: i32) -> Self { Expr::lit(v) }
}
impl From<i64> for Expr {
    fn from(v: i64) -> Self { Expr::lit(v) }
}
impl From<f64> for Expr {
    fn from(v: f64) -> Self { Expr::lit(v) }
}
impl From<&str> for Expr {
    fn from(v: &str) -> Self { Expr::lit(v) }
}
impl From<String> for Expr {
    fn from(v: String) -> Self { Expr::lit(v) }
}
impl From<NaiveDate> for Expr {
    fn from(v: NaiveDate) -> Self { Expr::lit(v) }
}
