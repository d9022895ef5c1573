use chrono::NaiveDate;

use crate::{
    error::QueryError,
    expr::Value,
    mapper::{Element, EntityRecord, FromValue, RowLayout, Slot, Tuple},
};

/// Conversion of one tuple element.
pub trait FromElement: Sized {
    /// Whether a slot of this shape can ever produce `Self`.
    fn check_slot(slot: &Slot) -> Result<(), QueryError>;

    fn from_element(element: Element) -> Result<Self, QueryError>;
}

/// Whole-row conversion, checked against the layout before execution.
pub trait FromTuple: Sized {
    fn check(layout: &RowLayout) -> Result<(), QueryError>;

    fn from_tuple(tuple: Tuple) -> Result<Self, QueryError>;
}

fn slot_mismatch<T>(slot: &Slot, target: &str) -> Result<T, QueryError> {
    let found = match slot.value_type() {
        Some(ty) => ty.to_string(),
        None => "entity".to_string(),
    };
    QueryError::ProjectionMismatch(format!("{} ({found}) cannot be read as {target}", slot.label())).err()
}

macro_rules! value_element {
    ($($t:ty),+ $(,)?) => {$(
        impl FromElement for $t {
            fn check_slot(slot: &Slot) -> Result<(), QueryError> {
                match slot.value_type() {
                    Some(ty) if ty == crate::metadata::ValueType::Null || <$t as FromValue>::accepts(ty) => Ok(()),
                    _ => slot_mismatch(slot, stringify!($t)),
                }
            }

            fn from_element(element: Element) -> Result<Self, QueryError> {
                match element {
                    Element::Value(v) => <$t as FromValue>::from_value(&v),
                    Element::Entity(_) => QueryError::ProjectionMismatch(
                        format!("entity cannot be read as {}", stringify!($t))
                    ).err(),
                }
            }
        }
    )+};
}

value_element!(
    Value, String, i64, i32, f64, bool, NaiveDate,
    Option<String>, Option<i64>, Option<i32>, Option<f64>, Option<bool>, Option<NaiveDate>,
);

impl FromElement for Option<EntityRecord> {
    fn check_slot(slot: &Slot) -> Result<(), QueryError> {
        match slot {
            Slot::Entity { .. } => Ok(()),
            other => slot_mismatch(other, "EntityRecord"),
        }
    }

    fn from_element(element: Element) -> Result<Self, QueryError> {
        match element {
            Element::Entity(record) => Ok(record),
            Element::Value(v) => QueryError::ProjectionMismatch(format!("{v} is not an entity")).err(),
        }
    }
}

/// Absent (left-joined) entities are an error here; read `Option<EntityRecord>` instead.
impl FromElement for EntityRecord {
    fn check_slot(slot: &Slot) -> Result<(), QueryError> {
        <Option<EntityRecord>>::check_slot(slot)
    }

    fn from_element(element: Element) -> Result<Self, QueryError> {
        <Option<EntityRecord>>::from_element(element)?
            .ok_or_else(|| QueryError::ProjectionMismatch("entity is absent".into()))
    }
}

fn arity(layout: &RowLayout, expected: usize) -> Result<(), QueryError> {
    if layout.slots.len() == expected {
        Ok(())
    } else {
        QueryError::ProjectionMismatch(format!(
            "query projects {} items, result type expects {expected}", layout.slots.len()
        )).err()
    }
}

macro_rules! single_element {
    ($($t:ty),+ $(,)?) => {$(
        impl FromTuple for $t {
            fn check(layout: &RowLayout) -> Result<(), QueryError> {
                arity(layout, 1)?;
                <$t as FromElement>::check_slot(&layout.slots[0])
            }

            fn from_tuple(tuple: Tuple) -> Result<Self, QueryError> {
                tuple.get_as(0)
            }
        }
    )+};
}

single_element!(
    Value, String, i64, i32, f64, bool, NaiveDate,
    Option<String>, Option<i64>, Option<i32>, Option<f64>, Option<bool>, Option<NaiveDate>,
    EntityRecord, Option<EntityRecord>,
);

macro_rules! tuple_impl {
    ($n:expr; $($name:ident : $idx:tt),+) => {
        impl<$($name: FromElement),+> FromTuple for ($($name,)+) {
            fn check(layout: &RowLayout) -> Result<(), QueryError> {
                arity(layout, $n)?;
                $( $name::check_slot(&layout.slots[$idx])?; )+
                Ok(())
            }

            fn from_tuple(tuple: Tuple) -> Result<Self, QueryError> {
                Ok(($( tuple.get_as::<$name>($idx)?, )+))
            }
        }
    };
}

tuple_impl!(2; A: 0, B: 1);
tuple_impl!(3; A: 0, B: 1, C: 2);
tuple_impl!(4; A: 0, B: 1, C: 2, D: 3);

impl FromTuple for Tuple {
    fn check(_: &RowLayout) -> Result<(), QueryError> {
        Ok(())
    }

    fn from_tuple(tuple: Tuple) -> Result<Self, QueryError> {
        Ok(tuple)
    }
}
