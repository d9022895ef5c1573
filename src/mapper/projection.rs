use std::fmt;

use crate::{
    error::QueryError,
    mapper::{Element, FromElement, RowLayout, Slot, Tuple},
    query::QueryPlan,
};

/// Maps result tuples of one specific query shape into `Output`.
pub trait Projection {
    type Output;

    /// Layout the projection was validated against.
    fn layout(&self) -> &RowLayout;

    fn map(&self, tuple: Tuple) -> Result<Self::Output, QueryError>;
}

type Setter<T> = Box<dyn Fn(&mut T, Element) -> Result<(), QueryError> + Send + Sync>;

/// A named, typed DTO field and how to assign it.
pub struct Field<T> {
    name: String,
    check: fn(&Slot) -> Result<(), QueryError>,
    set: Setter<T>,
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// `field("username", |d: &mut MemberDto, v: String| d.username = v)`
pub fn field<T, V>(name: &str, set: fn(&mut T, V)) -> Field<T>
where
    T: 'static,
    V: FromElement + 'static,
{
    Field {
        name: name.to_string(),
        check: V::check_slot,
        set: Box::new(move |target, element| {
            set(target, V::from_element(element)?);
            Ok(())
        }),
    }
}

/// Default-constructs `T`, then assigns fields in declared order.
/// The i-th field receives the i-th select item.
#[derive(Debug)]
pub struct FieldOrder<T> {
    layout: RowLayout,
    fields: Vec<Field<T>>,
}

impl<T: Default> FieldOrder<T> {
    pub fn bind(plan: &QueryPlan, fields: Vec<Field<T>>) -> Result<Self, QueryError> {
        let layout = RowLayout::of(plan);
        if layout.slots.len() != fields.len() {
            return QueryError::ProjectionMismatch(format!(
                "query projects {} items, {} fields declared", layout.slots.len(), fields.len()
            )).err();
        }
        for (slot, field) in layout.slots.iter().zip(&fields) {
            (field.check)(slot).map_err(|e| QueryError::ProjectionMismatch(format!("field {}: {e}", field.name)))?;
        }
        Ok(Self { layout, fields })
    }
}

impl<T: Default> Projection for FieldOrder<T> {
    type Output = T;

    fn layout(&self) -> &RowLayout {
        &self.layout
    }

    fn map(&self, tuple: Tuple) -> Result<T, QueryError> {
        let mut out = T::default();
        for (field, element) in self.fields.iter().zip(tuple.into_elements()) {
            (field.set)(&mut out, element)?;
        }
        Ok(out)
    }
}

/// Default-constructs `T`, then assigns each select item to the field whose
/// name matches the item's alias or column name.
#[derive(Debug)]
pub struct NamedFields<T> {
    layout: RowLayout,
    fields: Vec<Field<T>>,
    /// Field index per slot, built once at bind time.
    assignments: Vec<usize>,
}

impl<T: Default> NamedFields<T> {
    pub fn bind(plan: &QueryPlan, fields: Vec<Field<T>>) -> Result<Self, QueryError> {
        let layout = RowLayout::of(plan);
        let mut assignments = Vec::with_capacity(layout.slots.len());
        for slot in &layout.slots {
            let index = fields.iter().position(|f| f.name == slot.field()).ok_or_else(|| {
                QueryError::ProjectionMismatch(format!("no field named {}", slot.field()))
            })?;
            (fields[index].check)(slot)
                .map_err(|e| QueryError::ProjectionMismatch(format!("field {}: {e}", slot.field())))?;
            assignments.push(index);
        }
        Ok(Self { layout, fields, assignments })
    }
}

impl<T: Default> Projection for NamedFields<T> {
    type Output = T;

    fn layout(&self) -> &RowLayout {
        &self.layout
    }

    fn map(&self, tuple: Tuple) -> Result<T, QueryError> {
        let mut out = T::default();
        for (&index, element) in self.assignments.iter().zip(tuple.into_elements()) {
            (self.fields[index].set)(&mut out, element)?;
        }
        Ok(out)
    }
}

/// A function of 1 to 4 arguments usable as a DTO constructor.
pub trait ConstructorFn<Args, T>: Send + Sync + 'static {
    fn check(slots: &[Slot]) -> Result<(), QueryError>;

    fn call(&self, elements: Vec<Element>) -> Result<T, QueryError>;
}

fn missing_argument() -> QueryError {
    QueryError::ProjectionMismatch("constructor argument missing from row".into())
}

macro_rules! constructor_fn {
    ($n:expr; $($arg:ident),+) => {
        impl<F, T, $($arg),+> ConstructorFn<($($arg,)+), T> for F
        where
            F: Fn($($arg),+) -> T + Send + Sync + 'static,
            $($arg: FromElement),+
        {
            fn check(slots: &[Slot]) -> Result<(), QueryError> {
                if slots.len() != $n {
                    return QueryError::ProjectionMismatch(format!(
                        "query projects {} items, constructor takes {}", slots.len(), $n
                    )).err();
                }
                let mut slots = slots.iter();
                $( $arg::check_slot(slots.next().ok_or_else(missing_argument)?)?; )+
                Ok(())
            }

            fn call(&self, elements: Vec<Element>) -> Result<T, QueryError> {
                let mut elements = elements.into_iter();
                Ok((self)($( $arg::from_element(elements.next().ok_or_else(missing_argument)?)? ),+))
            }
        }
    };
}

constructor_fn!(1; A);
constructor_fn!(2; A, B);
constructor_fn!(3; A, B, C);
constructor_fn!(4; A, B, C, D);

type Build<T> = Box<dyn Fn(Vec<Element>) -> Result<T, QueryError> + Send + Sync>;

/// Calls a constructor with the select items as positional arguments.
pub struct Constructor<T> {
    layout: RowLayout,
    build: Build<T>,
}

impl<T: 'static> Constructor<T> {
    pub fn bind<Args, F>(plan: &QueryPlan, ctor: F) -> Result<Self, QueryError>
    where
        F: ConstructorFn<Args, T>,
    {
        let layout = RowLayout::of(plan);
        F::check(&layout.slots)?;
        Ok(Self { layout, build: Box::new(move |elements| ctor.call(elements)) })
    }
}

impl<T> Projection for Constructor<T> {
    type Output = T;

    fn layout(&self) -> &RowLayout {
        &self.layout
    }

    fn map(&self, tuple: Tuple) -> Result<T, QueryError> {
        (self.build)(tuple.into_elements())
    }
}
