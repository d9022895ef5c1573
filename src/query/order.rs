use crate::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Placement of nulls. `Default` leaves it to the backend; the in-memory
/// store sorts nulls lowest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullOrdering {
    #[default]
    Default,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Expr,
    pub direction: Direction,
    pub nulls: NullOrdering,
}

impl OrderSpec {
    pub fn new(expr: Expr, direction: Direction, nulls: NullOrdering) -> Self {
        Self { expr, direction, nulls }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrdering::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrdering::Last;
        self
    }

    pub fn is_ascending(&self) -> bool {
        self.direction == Direction::Asc
    }
}
