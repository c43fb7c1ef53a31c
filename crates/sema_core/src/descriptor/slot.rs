use std::fmt;

use sema_error::{DbError, Result};

use super::ids::{SlotId, TupleId};
use crate::arrays::datatype::DataType;
use crate::catalog::Column;
use crate::catalog::stats::ColumnStats;

/// Location of a slot's null bit inside the tuple's null bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullIndicator {
    pub byte: usize,
    /// Bit within `byte`, -1 if the slot can't be null.
    pub bit: i8,
}

impl NullIndicator {
    pub const NOT_NULLABLE: NullIndicator = NullIndicator { byte: 0, bit: -1 };

    pub const fn is_nullable(&self) -> bool {
        self.bit >= 0
    }
}

/// Physical placement of a materialized slot, assigned by the parent tuple's
/// layout computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub byte_size: usize,
    pub byte_offset: usize,
    pub null_indicator: NullIndicator,
    /// Position of the slot in layout order.
    pub slot_idx: usize,
}

/// One field of a tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    id: SlotId,
    parent: TupleId,
    datatype: Option<DataType>,
    /// Backing catalog column, if any.
    column: Option<Column>,
    label: Option<String>,
    materialized: bool,
    nullable: bool,
    /// Tuple describing the items of a collection-typed slot.
    item_tuple: Option<TupleId>,
    stats: Option<ColumnStats>,
    layout: Option<SlotLayout>,
}

impl SlotDescriptor {
    pub(crate) fn new(id: SlotId, parent: TupleId) -> Self {
        SlotDescriptor {
            id,
            parent,
            datatype: None,
            column: None,
            label: None,
            materialized: false,
            nullable: true,
            item_tuple: None,
            stats: None,
            layout: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn parent(&self) -> TupleId {
        self.parent
    }

    pub fn datatype(&self) -> Result<&DataType> {
        self.datatype
            .as_ref()
            .ok_or_else(|| DbError::internal(format!("Slot {} has no type", self.id)))
    }

    pub fn has_datatype(&self) -> bool {
        self.datatype.is_some()
    }

    pub fn set_datatype(&mut self, datatype: DataType) {
        self.datatype = Some(datatype);
    }

    pub fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    /// Back this slot by a catalog column, also taking its type.
    pub fn set_column(&mut self, column: Column) {
        self.datatype = Some(column.datatype.clone());
        self.column = Some(column);
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    pub fn set_materialized(&mut self, materialized: bool) {
        self.materialized = materialized;
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    pub fn item_tuple(&self) -> Option<TupleId> {
        self.item_tuple
    }

    pub fn set_item_tuple(&mut self, tuple: TupleId) {
        self.item_tuple = Some(tuple);
    }

    /// Stats for this slot.
    ///
    /// Explicitly set stats win, then the backing column's stats, then the
    /// defaults for the slot's type.
    pub fn stats(&self) -> Result<ColumnStats> {
        if let Some(stats) = &self.stats {
            return Ok(stats.clone());
        }
        if let Some(col) = &self.column {
            return Ok(col.stats.clone());
        }
        Ok(ColumnStats::for_type(self.datatype()?))
    }

    pub fn set_stats(&mut self, stats: ColumnStats) {
        self.stats = Some(stats);
    }

    /// Layout of this slot, errors if the parent tuple's layout hasn't been
    /// computed or this slot wasn't materialized at the time.
    pub fn layout(&self) -> Result<&SlotLayout> {
        self.layout.as_ref().ok_or_else(|| {
            DbError::internal(format!("Slot {} has no memory layout", self.id))
        })
    }

    pub(crate) fn set_layout(&mut self, layout: SlotLayout) {
        self.layout = Some(layout);
    }
}

impl fmt::Display for SlotDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotDescriptor{{id={}, parent={}", self.id, self.parent)?;
        match &self.datatype {
            Some(typ) => write!(f, ", type={typ}")?,
            None => write!(f, ", type=<unset>")?,
        }
        if let Some(col) = &self.column {
            write!(f, ", col={}", col.name)?;
        }
        if let Some(label) = &self.label {
            write!(f, ", label={label}")?;
        }
        write!(
            f,
            ", materialized={}, nullable={}",
            self.materialized, self.nullable
        )?;
        if let Some(layout) = &self.layout {
            write!(
                f,
                ", byte_size={}, byte_offset={}, null_indicator_byte={}, null_indicator_bit={}, slot_idx={}",
                layout.byte_size,
                layout.byte_offset,
                layout.null_indicator.byte,
                layout.null_indicator.bit,
                layout.slot_idx
            )?;
        }
        if let Some(item) = self.item_tuple {
            write!(f, ", item_tuple={item}")?;
        }
        write!(f, "}}")
    }
}
