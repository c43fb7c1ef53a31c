use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sema_error::{DbError, Result};
use tracing::trace;

use super::ids::TupleId;
use super::slot::{NullIndicator, SlotDescriptor, SlotLayout};
use crate::arrays::datatype::DataType;
use crate::catalog::{CatalogTable, CatalogTableId, Column};

/// Output schema of an analyzed inline view.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineViewSchema {
    pub alias: String,
    /// Catalog view this inline view was expanded from, if any.
    pub view: Option<Arc<CatalogTable>>,
    pub columns: Vec<(String, DataType)>,
}

/// Schema of the items of an unnested collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    /// Dotted path of the collection, e.g. `t.int_array`.
    pub path: String,
    pub columns: Vec<(String, DataType)>,
}

/// Where the rows described by a tuple come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleSource {
    Table(Arc<CatalogTable>),
    InlineView(InlineViewSchema),
    Collection(CollectionSchema),
}

/// A column exposed by a tuple source.
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn<'a> {
    pub name: &'a str,
    pub datatype: &'a DataType,
    pub position: usize,
    /// Present for columns read from a catalog table.
    pub catalog_column: Option<&'a Column>,
}

impl TupleSource {
    pub fn num_columns(&self) -> usize {
        match self {
            Self::Table(table) => table.columns.len(),
            Self::InlineView(view) => view.columns.len(),
            Self::Collection(coll) => coll.columns.len(),
        }
    }

    pub fn column(&self, idx: usize) -> Option<SourceColumn<'_>> {
        match self {
            Self::Table(table) => table.columns.get(idx).map(|c| SourceColumn {
                name: &c.name,
                datatype: &c.datatype,
                position: c.position,
                catalog_column: Some(c),
            }),
            Self::InlineView(InlineViewSchema { columns, .. })
            | Self::Collection(CollectionSchema { columns, .. }) => {
                columns.get(idx).map(|(name, datatype)| SourceColumn {
                    name,
                    datatype,
                    position: idx,
                    catalog_column: None,
                })
            }
        }
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = SourceColumn<'_>> {
        (0..self.num_columns()).filter_map(|idx| self.column(idx))
    }

    pub fn find_column(&self, name: &str) -> Option<SourceColumn<'_>> {
        self.iter_columns().find(|c| c.name == name)
    }

    /// Id of the physical table backing this source.
    pub fn table_id(&self) -> Option<CatalogTableId> {
        match self {
            Self::Table(table) => Some(table.id),
            _ => None,
        }
    }
}

/// Physical description of a row of one table reference.
///
/// Slots may be added until the memory layout is computed. Afterwards the
/// descriptor is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDescriptor {
    id: TupleId,
    debug_name: String,
    slots: Vec<SlotDescriptor>,
    source: Option<TupleSource>,
    alias: Option<String>,
    has_explicit_alias: bool,
    materialized: bool,
    has_mem_layout: bool,
    byte_size: usize,
    num_null_bytes: usize,
    avg_serialized_size: f64,
}

impl TupleDescriptor {
    pub(crate) fn new(id: TupleId, debug_name: impl Into<String>) -> Self {
        TupleDescriptor {
            id,
            debug_name: debug_name.into(),
            slots: Vec::new(),
            source: None,
            alias: None,
            has_explicit_alias: false,
            materialized: true,
            has_mem_layout: false,
            byte_size: 0,
            num_null_bytes: 0,
            avg_serialized_size: 0.0,
        }
    }

    pub fn id(&self) -> TupleId {
        self.id
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [SlotDescriptor] {
        &mut self.slots
    }

    pub(crate) fn add_slot(&mut self, slot: SlotDescriptor) -> Result<usize> {
        if self.has_mem_layout {
            return Err(DbError::internal(format!(
                "Cannot add slot to tuple {} after its memory layout was computed",
                self.id
            )));
        }
        self.slots.push(slot);
        Ok(self.slots.len() - 1)
    }

    pub fn source(&self) -> Option<&TupleSource> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: TupleSource) {
        self.source = Some(source);
    }

    /// Catalog table backing this tuple, if it's a base table tuple.
    pub fn table(&self) -> Option<&Arc<CatalogTable>> {
        match &self.source {
            Some(TupleSource::Table(table)) => Some(table),
            _ => None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn has_explicit_alias(&self) -> bool {
        self.has_explicit_alias
    }

    pub fn set_alias(&mut self, alias: impl Into<String>, explicit: bool) {
        self.alias = Some(alias.into());
        self.has_explicit_alias = explicit;
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    pub fn set_materialized(&mut self, materialized: bool) {
        self.materialized = materialized;
    }

    pub fn has_mem_layout(&self) -> bool {
        self.has_mem_layout
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn num_null_bytes(&self) -> usize {
        self.num_null_bytes
    }

    pub fn avg_serialized_size(&self) -> f64 {
        self.avg_serialized_size
    }

    pub fn materialized_slots(&self) -> impl Iterator<Item = &SlotDescriptor> {
        self.slots.iter().filter(|s| s.is_materialized())
    }

    /// Mark every slot as materialized.
    pub fn materialize_slots(&mut self) {
        for slot in &mut self.slots {
            slot.set_materialized(true);
        }
    }

    /// Check if both tuples have the same number of slots with pairwise equal
    /// types.
    pub fn is_compatible(&self, other: &TupleDescriptor) -> bool {
        if self.slots.len() != other.slots.len() {
            return false;
        }
        self.slots
            .iter()
            .zip(&other.slots)
            .all(|(a, b)| a.datatype().ok() == b.datatype().ok())
    }

    /// Assign byte offsets, null indicators and slot indices to all
    /// materialized slots.
    ///
    /// Slots are packed by ascending slot size so that padding is only
    /// needed at size class boundaries. Null bytes are placed at the start
    /// of the tuple. Computing the layout more than once is a no-op.
    pub fn compute_mem_layout(&mut self) -> Result<()> {
        if self.has_mem_layout {
            return Ok(());
        }

        // Slot positions grouped by slot size, declaration order preserved
        // within a group.
        let mut by_size: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut num_nullable: usize = 0;
        let mut avg_serialized_size = 0.0;

        for (pos, slot) in self.slots.iter().enumerate() {
            if !slot.is_materialized() {
                continue;
            }
            let size = slot.datatype()?.slot_size()?;
            let stats = slot.stats()?;
            avg_serialized_size += stats.avg_serialized_size.unwrap_or(size as f64);

            by_size.entry(size).or_default().push(pos);
            if slot.is_nullable() {
                num_nullable += 1;
            }
        }

        let num_null_bytes = num_nullable.div_ceil(8);
        let mut offset = num_null_bytes;
        let mut null_byte = 0;
        let mut null_bit: i8 = 0;
        let mut slot_idx = 0;

        for (size, positions) in by_size {
            if size > 1 {
                offset = offset.next_multiple_of(size.min(8));
            }

            for pos in positions {
                let slot = &mut self.slots[pos];
                let null_indicator = if slot.is_nullable() {
                    let indicator = NullIndicator {
                        byte: null_byte,
                        bit: null_bit,
                    };
                    null_bit = (null_bit + 1) % 8;
                    if null_bit == 0 {
                        null_byte += 1;
                    }
                    indicator
                } else {
                    NullIndicator::NOT_NULLABLE
                };

                slot.set_layout(SlotLayout {
                    byte_size: size,
                    byte_offset: offset,
                    null_indicator,
                    slot_idx,
                });

                offset += size;
                slot_idx += 1;
            }
        }

        self.byte_size = offset;
        self.num_null_bytes = num_null_bytes;
        self.avg_serialized_size = avg_serialized_size;
        self.has_mem_layout = true;

        trace!(tuple = %self.id, byte_size = self.byte_size, num_null_bytes, "computed tuple memory layout");

        Ok(())
    }
}

impl fmt::Display for TupleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleDescriptor{{id={}, name={}", self.id, self.debug_name)?;
        match &self.source {
            Some(TupleSource::Table(table)) => write!(f, ", tbl={}", table.full_name())?,
            Some(TupleSource::InlineView(view)) => write!(f, ", inline_view={}", view.alias)?,
            Some(TupleSource::Collection(coll)) => write!(f, ", collection={}", coll.path)?,
            None => write!(f, ", tbl=null")?,
        }
        write!(
            f,
            ", byte_size={}, materialized={}, slots=[",
            self.byte_size, self.materialized
        )?;
        for (idx, slot) in self.slots.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{slot}")?;
        }
        write!(f, "]}}")
    }
}
