use crate::{expr::Expr, metadata::{EntityPath, ValueType}};

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// Every column of the entity, hydrated as an entity record.
    Entity(EntityPath),
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    pub fn label(&self) -> String {
        match self {
            SelectItem::Entity(path) => path.alias().to_string(),
            SelectItem::Expr { alias: Some(a), .. } => a.clone(),
            SelectItem::Expr { expr, alias: None } => expr.to_string(),
        }
    }

    /// Name used for by-name DTO binding: the alias, else the bare column name.
    pub fn field_name(&self) -> String {
        match self {
            SelectItem::Expr { alias: Some(a), .. } => a.clone(),
            SelectItem::Expr { expr: Expr::Column(c), alias: None } => c.column.clone(),
            other => other.label(),
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        match self {
            SelectItem::Expr { expr, .. } => Some(expr),
            SelectItem::Entity(_) => None,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.expr().map(Expr::value_type)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, SelectItem::Expr { expr: Expr::Constant(_), .. })
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }
}

impl From<&Expr> for SelectItem {
    fn from(expr: &Expr) -> Self {
        SelectItem::Expr { expr: expr.clone(), alias: None }
    }
}

impl From<&EntityPath> for SelectItem {
    fn from(path: &EntityPath) -> Self {
        SelectItem::Entity(path.clone())
    }
}

impl From<EntityPath> for SelectItem {
    fn from(path: EntityPath) -> Self {
        SelectItem::Entity(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ColumnRef;

    #[test]
    fn field_name_prefers_alias_then_column() {
        let age = Expr::Column(ColumnRef::new("m", "age", ValueType::Int));
        assert_eq!(SelectItem::from(&age).field_name(), "age");
        assert_eq!(SelectItem::from(&age).label(), "m.age");
        assert_eq!(age.alias("years").field_name(), "years");
        assert_eq!(SelectItem::from(age.max().unwrap()).field_name(), "max(m.age)");
    }
}
