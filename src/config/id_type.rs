use serde::{Deserialize, Serialize};

/// Strategy used by the in-memory store to generate ids for inserted rows.
///
/// - `Int`: incrementing integers, starting after the highest loaded id.
/// - `Uuid`: UUID v4 strings.
/// - `None`: no generation; inserted rows must carry their id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum IdType {
    /// Sequential integer ids (default, like an identity column).
    #[default]
    Int,
    /// UUID string ids.
    Uuid,
    /// Caller-provided ids.
    None,
}
