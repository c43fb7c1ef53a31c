pub mod auth;
pub mod memory;
pub mod stats;

use std::fmt::{self, Debug};
use std::sync::Arc;

use sema_error::Result;
use serde::{Deserialize, Serialize};
use stats::ColumnStats;

use crate::arrays::datatype::DataType;
use crate::ast::QueryStmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogTableId(pub u32);

/// A possibly database-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    pub database: Option<String>,
    pub table: String,
}

impl TableName {
    pub fn new(database: Option<&str>, table: &str) -> Self {
        TableName {
            database: database.map(|s| s.to_string()),
            table: table.to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{db}.{}", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    /// Position of the column in its table.
    pub position: usize,
    pub stats: ColumnStats,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType, position: usize) -> Self {
        let stats = ColumnStats::for_type(&datatype);
        Column {
            name: name.into(),
            datatype,
            position,
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableKind {
    /// A table with physical storage.
    Base,
    /// A view stored in the catalog.
    View(ViewDefinition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    pub query: QueryStmt,
    /// Local views are defined by a WITH clause and exist only for the
    /// statement.
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTable {
    pub id: CatalogTableId,
    pub database: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub kind: TableKind,
}

impl CatalogTable {
    pub fn table_name(&self) -> TableName {
        TableName::new(Some(&self.database), &self.name)
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View(_))
    }
}

/// Source of table and view metadata.
pub trait Catalog: Debug + Sync + Send {
    fn default_database(&self) -> &str;

    /// Look up a table or view. Returns `Ok(None)` if it doesn't exist.
    fn get_table(&self, database: &str, name: &str) -> Result<Option<Arc<CatalogTable>>>;
}
