use serde::{Deserialize, Serialize};

use super::ids::{SlotId, TupleId};
use crate::arrays::datatype::DataType;
use crate::catalog::CatalogTableId;

/// Serializable form of a descriptor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorTableExport {
    pub tuples: Vec<TupleDescriptorExport>,
    pub slots: Vec<SlotDescriptorExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleDescriptorExport {
    pub id: TupleId,
    pub byte_size: usize,
    pub num_null_bytes: usize,
    pub table_id: Option<CatalogTableId>,
}

/// Serialized slot. Unmaterialized slots have a byte offset and slot index
/// of -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDescriptorExport {
    pub id: SlotId,
    pub parent: TupleId,
    pub datatype: DataType,
    pub column_pos: Option<usize>,
    pub item_tuple: Option<TupleId>,
    pub byte_size: usize,
    pub byte_offset: i64,
    pub null_indicator_byte: usize,
    pub null_indicator_bit: i8,
    pub slot_idx: i64,
    pub is_materialized: bool,
}
