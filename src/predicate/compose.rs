use crate::predicate::Predicate;

/// Conjunction of the present predicates, in input order.
///
/// All absent gives `None`; a single present predicate is returned as is.
pub fn compose_all<I>(preds: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Option<Predicate>>,
{
    let mut present: Vec<Predicate> = preds.into_iter().flatten().collect();
    match present.len() {
        0 => None,
        1 => present.pop(),
        _ => Some(Predicate::And(present)),
    }
}

/// Accumulates optional conditions one call at a time.
#[derive(Debug, Clone, Default)]
pub struct BooleanBuilder {
    current: Option<Predicate>,
}

impl BooleanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(initial: Predicate) -> Self {
        Self { current: Some(initial) }
    }

    pub fn and(&mut self, pred: Predicate) -> &mut Self {
        self.current = Some(match self.current.take() {
            Some(cur) => cur.and(pred),
            None => pred,
        });
        self
    }

    pub fn or(&mut self, pred: Predicate) -> &mut Self {
        self.current = Some(match self.current.take() {
            Some(cur) => cur.or(pred),
            None => pred,
        });
        self
    }

    /// Skips `None`.
    pub fn and_opt(&mut self, pred: Option<Predicate>) -> &mut Self {
        if let Some(p) = pred {
            self.and(p);
        }
        self
    }

    pub fn or_opt(&mut self, pred: Option<Predicate>) -> &mut Self {
        if let Some(p) = pred {
            self.or(p);
        }
        self
    }

    pub fn has_value(&self) -> bool {
        self.current.is_some()
    }

    pub fn value(&self) -> Option<Predicate> {
        self.current.clone()
    }

    pub fn into_predicate(self) -> Option<Predicate> {
        self.current
    }
}
