use std::fmt::Display;

use uuid::Uuid;

use crate::{config::IdType, expr::Value};

#[derive(Debug, Clone, PartialEq)]
pub enum IdValue {
    Uuid(String),
    Int(i64),
}

impl IdValue {
    pub fn into_value(self) -> Value {
        match self {
            IdValue::Uuid(s) => Value::Text(s),
            IdValue::Int(i) => Value::Int(i),
        }
    }
}

impl Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Uuid(uuid) => f.write_str(uuid),
            IdValue::Int(id) => write!(f, "{id}"),
        }
    }
}

/// Hands out ids for rows inserted without one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdManager {
    pub id_type: IdType,
    pub current: Option<IdValue>,
}

impl IdManager {
    pub fn new(id_type: IdType) -> Self {
        Self {
            id_type,
            current: None,
        }
    }

    /// Keeps the integer sequence ahead of an explicitly supplied id.
    pub fn observe(&mut self, id: &Value) {
        if let (IdType::Int, Value::Int(i)) = (self.id_type, id) {
            let ahead = match &self.current {
                Some(IdValue::Int(cur)) => i > cur,
                _ => true,
            };
            if ahead {
                self.current = Some(IdValue::Int(*i));
            }
        }
    }
}

impl Iterator for IdManager {
    type Item = IdValue;
    fn next(&mut self) -> Option<Self::Item> {
        let item = match &self.current {
            Some(IdValue::Int(id)) => IdValue::Int(id.checked_add(1)?),
            Some(IdValue::Uuid(_)) => IdValue::Uuid(Uuid::new_v4().to_string()),
            None => match self.id_type {
                IdType::Int => IdValue::Int(1),
                IdType::Uuid => IdValue::Uuid(Uuid::new_v4().to_string()),
                IdType::None => return None,
            },
        };

        self.current = Some(item.clone());
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_sequence_starts_at_one_and_skips_observed_ids() {
        let mut ids = IdManager::new(IdType::Int);
        assert_eq!(ids.next(), Some(IdValue::Int(1)));
        ids.observe(&Value::Int(10));
        assert_eq!(ids.next(), Some(IdValue::Int(11)));
        ids.observe(&Value::Int(3));
        assert_eq!(ids.next(), Some(IdValue::Int(12)));
    }

    #[test]
    fn uuid_sequence_generates_distinct_ids() {
        let mut ids = IdManager::new(IdType::Uuid);
        let a = ids.next().unwrap();
        let b = ids.next().unwrap();
        assert_ne!(a, b);
        assert!(matches!(a, IdValue::Uuid(ref s) if Uuid::parse_str(s).is_ok()));
    }

    #[test]
    fn none_never_generates() {
        let mut ids = IdManager::new(IdType::None);
        assert_eq!(ids.next(), None);
        ids.observe(&Value::Int(7));
        assert_eq!(ids.next(), None);
    }
}
