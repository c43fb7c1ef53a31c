use sema_error::Result;
use serde::{Deserialize, Serialize};

use crate::arrays::datatype::DataType;
use crate::descriptor::table::DescriptorTable;
use crate::expr::Expression;

/// Per-column statistics.
///
/// All values are optional; an absent value means the statistic is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub avg_serialized_size: Option<f64>,
    pub max_size: Option<u64>,
    pub num_distinct_values: Option<u64>,
    pub num_nulls: Option<u64>,
}

impl ColumnStats {
    /// Initial stats for a column of the given type.
    ///
    /// Fixed-length types know their serialized size up front.
    pub fn for_type(datatype: &DataType) -> Self {
        let size = if datatype.is_fixed_length() {
            datatype.slot_size().ok()
        } else {
            None
        };

        ColumnStats {
            avg_serialized_size: size.map(|s| s as f64),
            max_size: size.map(|s| s as u64),
            num_distinct_values: None,
            num_nulls: None,
        }
    }

    /// Stats for the output of an expression.
    ///
    /// Column references carry over the stats of the referenced slot,
    /// everything else gets the defaults for its type.
    pub fn from_expr(expr: &Expression, desc_tbl: &DescriptorTable) -> Result<Self> {
        match expr {
            Expression::Column(col) => desc_tbl.get_slot(col.slot)?.stats(),
            other => Ok(Self::for_type(&other.datatype()?)),
        }
    }

    pub fn has_avg_serialized_size(&self) -> bool {
        self.avg_serialized_size.is_some()
    }
}
