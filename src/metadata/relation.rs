use serde::{Deserialize, Serialize};

/// A declared many-to-one link from an owning entity to a target entity.
///
/// - `column`: the foreign-key column on the owner (e.g. `team_id`).
/// - `target`: the name of the referenced entity (e.g. `Team`).
/// - `target_column`: the referenced column; `None` means the target's id.
///
/// Joins over a relation infer `owner.column = target.target_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub column: String,
    pub target: String,
    #[serde(default)]
    pub target_column: Option<String>,
}

impl Relation {
    pub fn new(column: &str, target: &str) -> Self {
        Self { column: column.to_string(), target: target.to_string(), target_column: None }
    }
}
