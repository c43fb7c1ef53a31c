use std::fmt;

use crate::arrays::datatype::DataType;
use crate::descriptor::ids::SlotId;

/// Reference to a slot.
///
/// Two column expressions refer to the same value iff their slot ids match,
/// the label is only used for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpr {
    pub slot: SlotId,
    pub datatype: DataType,
    /// Qualified name as written by the user, e.g. `t.a`.
    pub label: String,
}

impl ColumnExpr {
    pub fn new(slot: SlotId, datatype: DataType, label: impl Into<String>) -> Self {
        ColumnExpr {
            slot,
            datatype,
            label: label.into(),
        }
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
