use std::collections::HashMap;

use sema_error::{DbError, Result};
use tracing::debug;

use super::export::{DescriptorTableExport, SlotDescriptorExport, TupleDescriptorExport};
use super::ids::{IdGenerator, SlotId, TupleId};
use super::slot::{NullIndicator, SlotDescriptor};
use super::tuple::TupleDescriptor;

/// Owns every tuple and slot descriptor created during one analysis session.
#[derive(Debug, Default)]
pub struct DescriptorTable {
    tuples: Vec<TupleDescriptor>,
    /// Slot id -> (owning tuple, position within the tuple).
    slot_locations: HashMap<SlotId, (TupleId, usize)>,
    slot_ids: IdGenerator,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_tuple_descriptor(&mut self, debug_name: impl Into<String>) -> TupleId {
        let id = TupleId(self.tuples.len());
        self.tuples.push(TupleDescriptor::new(id, debug_name));
        id
    }

    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }

    pub fn get_tuple(&self, id: TupleId) -> Result<&TupleDescriptor> {
        self.tuples
            .get(id.0)
            .ok_or_else(|| DbError::internal(format!("Missing tuple descriptor {id}")))
    }

    pub fn get_tuple_mut(&mut self, id: TupleId) -> Result<&mut TupleDescriptor> {
        self.tuples
            .get_mut(id.0)
            .ok_or_else(|| DbError::internal(format!("Missing tuple descriptor {id}")))
    }

    pub fn iter_tuples(&self) -> impl Iterator<Item = &TupleDescriptor> {
        self.tuples.iter()
    }

    /// Append a new slot to a tuple.
    ///
    /// Errors if the tuple's layout was already computed.
    pub fn add_slot(&mut self, tuple: TupleId) -> Result<SlotId> {
        let id = SlotId(self.slot_ids.count());
        let desc = self.get_tuple_mut(tuple)?;
        let pos = desc.add_slot(SlotDescriptor::new(id, tuple))?;
        self.slot_ids.next_id();
        self.slot_locations.insert(id, (tuple, pos));
        Ok(id)
    }

    pub fn get_slot(&self, id: SlotId) -> Result<&SlotDescriptor> {
        let (tuple, pos) = self.slot_location(id)?;
        self.get_tuple(tuple)?
            .slots()
            .get(pos)
            .ok_or_else(|| DbError::internal(format!("Missing slot descriptor {id}")))
    }

    pub fn get_slot_mut(&mut self, id: SlotId) -> Result<&mut SlotDescriptor> {
        let (tuple, pos) = self.slot_location(id)?;
        self.get_tuple_mut(tuple)?
            .slots_mut()
            .get_mut(pos)
            .ok_or_else(|| DbError::internal(format!("Missing slot descriptor {id}")))
    }

    fn slot_location(&self, id: SlotId) -> Result<(TupleId, usize)> {
        self.slot_locations
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::internal(format!("Missing slot descriptor {id}")))
    }

    pub fn mark_slots_materialized(&mut self, ids: impl IntoIterator<Item = SlotId>) -> Result<()> {
        for id in ids {
            self.get_slot_mut(id)?.set_materialized(true);
        }
        Ok(())
    }

    /// Compute the memory layout of every materialized tuple.
    pub fn compute_mem_layouts(&mut self) -> Result<()> {
        for tuple in &mut self.tuples {
            if tuple.is_materialized() {
                tuple.compute_mem_layout()?;
            }
        }
        debug!(num_tuples = self.tuples.len(), "computed memory layouts");
        Ok(())
    }

    /// Produce the frozen descriptor tree handed to execution.
    ///
    /// Only materialized tuples are exported, each of which must have had its
    /// layout computed.
    pub fn export(&self) -> Result<DescriptorTableExport> {
        let mut tuples = Vec::new();
        let mut slots = Vec::new();

        for tuple in self.tuples.iter().filter(|t| t.is_materialized()) {
            if !tuple.has_mem_layout() {
                return Err(DbError::internal(format!(
                    "Tuple {} exported before computing its memory layout",
                    tuple.id()
                )));
            }

            tuples.push(TupleDescriptorExport {
                id: tuple.id(),
                byte_size: tuple.byte_size(),
                num_null_bytes: tuple.num_null_bytes(),
                table_id: tuple.source().and_then(|s| s.table_id()),
            });

            for slot in tuple.slots() {
                let layout = if slot.is_materialized() {
                    Some(*slot.layout()?)
                } else {
                    None
                };
                let null_indicator = layout
                    .map(|l| l.null_indicator)
                    .unwrap_or(NullIndicator::NOT_NULLABLE);

                slots.push(SlotDescriptorExport {
                    id: slot.id(),
                    parent: slot.parent(),
                    datatype: slot.datatype()?.clone(),
                    column_pos: slot.column().map(|c| c.position),
                    item_tuple: slot.item_tuple(),
                    byte_size: layout.map(|l| l.byte_size).unwrap_or(0),
                    byte_offset: layout.map(|l| l.byte_offset as i64).unwrap_or(-1),
                    null_indicator_byte: null_indicator.byte,
                    null_indicator_bit: null_indicator.bit,
                    slot_idx: layout.map(|l| l.slot_idx as i64).unwrap_or(-1),
                    is_materialized: slot.is_materialized(),
                });
            }
        }

        Ok(DescriptorTableExport { tuples, slots })
    }
}
