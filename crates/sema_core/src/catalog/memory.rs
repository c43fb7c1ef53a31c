use std::sync::Arc;

use indexmap::IndexMap;
use sema_error::{DbError, Result};

use super::stats::ColumnStats;
use super::{Catalog, CatalogTable, CatalogTableId, Column, TableKind, ViewDefinition};
use crate::arrays::datatype::DataType;
use crate::ast::QueryStmt;

/// In-memory catalog keyed by (database, table).
#[derive(Debug)]
pub struct MemoryCatalog {
    default_database: String,
    tables: IndexMap<(String, String), Arc<CatalogTable>>,
    next_id: u32,
}

impl MemoryCatalog {
    pub fn new(default_database: impl Into<String>) -> Self {
        MemoryCatalog {
            default_database: default_database.into(),
            tables: IndexMap::new(),
            next_id: 0,
        }
    }

    pub fn create_table<'a>(
        &mut self,
        database: &str,
        name: &str,
        columns: impl IntoIterator<Item = (&'a str, DataType)>,
    ) -> Result<Arc<CatalogTable>> {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(pos, (name, datatype))| Column::new(name.to_lowercase(), datatype, pos))
            .collect();
        self.insert(database, name, columns, TableKind::Base)
    }

    pub fn create_view(
        &mut self,
        database: &str,
        name: &str,
        query: QueryStmt,
    ) -> Result<Arc<CatalogTable>> {
        self.insert(
            database,
            name,
            Vec::new(),
            TableKind::View(ViewDefinition {
                query,
                local: false,
            }),
        )
    }

    /// Replace the stats of a column.
    pub fn set_column_stats(
        &mut self,
        database: &str,
        table: &str,
        column: &str,
        stats: ColumnStats,
    ) -> Result<()> {
        let key = (database.to_lowercase(), table.to_lowercase());
        let ent = self
            .tables
            .get_mut(&key)
            .ok_or_else(|| DbError::missing(format!("Missing table '{database}.{table}'")))?;

        let table_mut = Arc::make_mut(ent);
        let col = table_mut
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| DbError::missing(format!("Missing column '{column}'")))?;
        col.stats = stats;

        Ok(())
    }

    fn insert(
        &mut self,
        database: &str,
        name: &str,
        columns: Vec<Column>,
        kind: TableKind,
    ) -> Result<Arc<CatalogTable>> {
        let key = (database.to_lowercase(), name.to_lowercase());
        if self.tables.contains_key(&key) {
            return Err(DbError::new(format!(
                "Table already exists: {database}.{name}"
            )));
        }

        let id = CatalogTableId(self.next_id);
        self.next_id += 1;

        let table = Arc::new(CatalogTable {
            id,
            database: key.0.clone(),
            name: key.1.clone(),
            columns,
            kind,
        });
        self.tables.insert(key, table.clone());

        Ok(table)
    }
}

impl Catalog for MemoryCatalog {
    fn default_database(&self) -> &str {
        &self.default_database
    }

    fn get_table(&self, database: &str, name: &str) -> Result<Option<Arc<CatalogTable>>> {
        let key = (database.to_lowercase(), name.to_lowercase());
        Ok(self.tables.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get() {
        let mut catalog = MemoryCatalog::new("default");
        catalog
            .create_table("default", "T1", [("A", DataType::Int32)])
            .unwrap();

        let table = catalog.get_table("default", "t1").unwrap().unwrap();
        assert_eq!("t1", table.name);
        assert_eq!("a", table.columns[0].name);
        assert!(catalog.get_table("other", "t1").unwrap().is_none());
    }

    #[test]
    fn duplicate_table() {
        let mut catalog = MemoryCatalog::new("default");
        catalog.create_table("default", "t1", []).unwrap();
        assert!(catalog.create_table("default", "t1", []).is_err());
    }

    #[test]
    fn stats_update() {
        let mut catalog = MemoryCatalog::new("default");
        catalog
            .create_table("default", "t1", [("s", DataType::Utf8)])
            .unwrap();
        catalog
            .set_column_stats(
                "default",
                "t1",
                "s",
                ColumnStats {
                    avg_serialized_size: Some(12.5),
                    ..Default::default()
                },
            )
            .unwrap();

        let table = catalog.get_table("default", "t1").unwrap().unwrap();
        assert_eq!(Some(12.5), table.columns[0].stats.avg_serialized_size);
    }
}
