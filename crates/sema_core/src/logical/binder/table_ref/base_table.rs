use std::sync::Arc;

use sema_error::Result;

use super::TableRefInfo;
use crate::ast::RawTableRef;
use crate::catalog::CatalogTable;
use crate::descriptor::tuple::TupleSource;
use crate::logical::binder::analyzer::{Analyzer, ScopeRef};

/// Reference to a catalog table with physical storage.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseTableRef {
    pub info: TableRefInfo,
    pub table: Arc<CatalogTable>,
}

impl BaseTableRef {
    pub fn new(raw: RawTableRef, table: Arc<CatalogTable>) -> Self {
        BaseTableRef {
            info: TableRefInfo::new(raw),
            table,
        }
    }

    /// The explicit alias, or both the qualified and unqualified table name.
    pub fn aliases(&self) -> Vec<String> {
        match self.info.explicit_alias() {
            Some(alias) => vec![alias],
            None => vec![self.table.full_name(), self.table.name.clone()],
        }
    }

    pub(crate) fn analyze(&mut self, analyzer: &mut Analyzer, scope: ScopeRef) -> Result<()> {
        let explicit = self.info.explicit_alias();
        let desc_tbl = analyzer.desc_tbl_mut();
        let desc = desc_tbl.create_tuple_descriptor(format!("basetbl {}", self.table.full_name()));
        let tuple = desc_tbl.get_tuple_mut(desc)?;
        tuple.set_source(TupleSource::Table(self.table.clone()));
        match &explicit {
            Some(alias) => tuple.set_alias(alias, true),
            None => tuple.set_alias(&self.table.name, false),
        }

        analyzer.register_table_ref(scope, desc, &self.aliases())?;
        self.info.set_analyzed_desc(desc, scope);

        Ok(())
    }
}
