use std::sync::Arc;

use sema_error::Result;
use tracing::debug;

use super::TableRefInfo;
use crate::arrays::datatype::DataType;
use crate::ast::RawTableRef;
use crate::catalog::CatalogTable;
use crate::descriptor::ids::{SlotId, TupleId};
use crate::descriptor::tuple::{CollectionSchema, TupleSource};
use crate::logical::binder::analyzer::{Analyzer, ScopeRef};

/// Where the unnested collection is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionRoot {
    /// A collection column of rows produced by another table ref, e.g.
    /// `t.int_array` where `t` is an alias in scope.
    Relative { tuple: TupleId, column: String },
    /// A collection column read directly from a catalog table.
    Table {
        table: Arc<CatalogTable>,
        column: String,
    },
}

/// Reference to the items of a list or map column.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionTableRef {
    pub info: TableRefInfo,
    pub root: CollectionRoot,
    /// Type of the collection column.
    pub datatype: DataType,
    /// Slot on the parent tuple holding the collection. Only set for relative
    /// refs after analysis.
    parent_slot: Option<SlotId>,
    correlated: bool,
}

impl CollectionTableRef {
    pub fn new(raw: RawTableRef, root: CollectionRoot, datatype: DataType) -> Self {
        CollectionTableRef {
            info: TableRefInfo::new(raw),
            root,
            datatype,
            parent_slot: None,
            correlated: false,
        }
    }

    /// Dotted path as written, lowercased.
    pub fn path(&self) -> String {
        self.info.raw.path.join(".").to_lowercase()
    }

    /// The explicit alias, else the last path element.
    pub fn aliases(&self) -> Vec<String> {
        match self.info.explicit_alias() {
            Some(alias) => vec![alias],
            None => vec![self.implicit_alias()],
        }
    }

    fn implicit_alias(&self) -> String {
        self.info
            .raw
            .path
            .last()
            .map(|p| p.to_lowercase())
            .unwrap_or_default()
    }

    pub fn is_relative(&self) -> bool {
        matches!(self.root, CollectionRoot::Relative { .. })
    }

    /// Set during analysis if the parent tuple belongs to an enclosing query
    /// block. A correlated collection is unnested once per row of that block.
    pub fn is_correlated(&self) -> bool {
        self.correlated
    }

    pub fn parent_slot(&self) -> Option<SlotId> {
        self.parent_slot
    }

    pub(crate) fn analyze(&mut self, analyzer: &mut Analyzer, scope: ScopeRef) -> Result<()> {
        let path = self.path();
        let columns = self.datatype.collection_columns()?;
        let explicit = self.info.explicit_alias();

        let desc_tbl = analyzer.desc_tbl_mut();
        let desc = desc_tbl.create_tuple_descriptor(format!("collection {path}"));
        let tuple = desc_tbl.get_tuple_mut(desc)?;
        tuple.set_source(TupleSource::Collection(CollectionSchema {
            path: path.clone(),
            columns,
        }));
        match explicit {
            Some(alias) => tuple.set_alias(alias, true),
            None => tuple.set_alias(self.implicit_alias(), false),
        }

        analyzer.register_table_ref(scope, desc, &self.aliases())?;
        self.info.set_analyzed_desc(desc, scope);

        if let CollectionRoot::Relative { tuple: root, column } = &self.root {
            let slot = analyzer.register_collection_slot(*root, column, desc)?;
            self.parent_slot = Some(slot);
            self.correlated = analyzer.find_scope_for_tuple(*root) != Some(scope);
            debug!(%path, %slot, correlated = self.correlated, "registered relative collection");
        }

        Ok(())
    }

    pub(crate) fn reset_collection(&mut self) {
        self.parent_slot = None;
        self.correlated = false;
    }
}
