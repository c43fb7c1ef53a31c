use std::sync::Arc;

use sema_error::{DbError, Result, not_implemented};
use tracing::debug;

use super::analyzer::{Analyzer, ScopeRef};
use super::table_ref::TableRef;
use super::table_ref::base_table::BaseTableRef;
use super::table_ref::collection::{CollectionRoot, CollectionTableRef};
use super::table_ref::inline_view::InlineViewRef;
use crate::ast::RawTableRef;
use crate::catalog::{CatalogTable, TableKind, TableName};
use crate::descriptor::ids::TupleId;

/// Resolve a FROM clause entry into a table ref variant.
///
/// Paths are tried in order as
/// - a collection column of a ref visible in `scope` (`alias.column`),
/// - a view from an enclosing WITH clause,
/// - `database.table[.column]` in the catalog,
/// - `table[.column]` in the default database.
///
/// Tables that can't be found are recorded on the analyzer before the error
/// is returned.
pub fn resolve_table_ref(
    analyzer: &mut Analyzer,
    scope: ScopeRef,
    raw: &RawTableRef,
) -> Result<TableRef> {
    if let Some(subquery) = &raw.subquery {
        if raw.alias.is_none() {
            return Err(DbError::new(format!(
                "Inline view requires an alias: {}",
                raw.table_sql()
            )));
        }
        return Ok(TableRef::InlineView(InlineViewRef::new(
            raw.clone(),
            subquery.as_ref().clone(),
            None,
        )));
    }

    let path: Vec<String> = raw.path.iter().map(|p| p.to_lowercase()).collect();
    let path_str = path.join(".");

    match path.as_slice() {
        [] => Err(DbError::internal("Table reference with an empty path")),
        [name] => {
            if let Some(view) = analyzer.find_local_view(scope, name)? {
                return resolve_catalog_table(analyzer, scope, raw, view, &[]);
            }
            let database = analyzer.default_database().to_string();
            let table = analyzer.catalog().get_table(&database, name)?;
            match table {
                Some(table) => resolve_catalog_table(analyzer, scope, raw, table, &[]),
                None => Err(missing_table(analyzer, &database, name, &path_str)),
            }
        }
        [first, rest @ ..] => {
            if let Some((_, tuple)) = analyzer.lookup_alias(scope, first)? {
                return resolve_relative_collection(analyzer, raw, tuple, rest, &path_str);
            }

            let qualified = analyzer.catalog().get_table(first, &rest[0])?;
            if let Some(table) = qualified {
                return resolve_catalog_table(analyzer, scope, raw, table, &rest[1..]);
            }

            let database = analyzer.default_database().to_string();
            let table = analyzer.catalog().get_table(&database, first)?;
            match table {
                Some(table) => resolve_catalog_table(analyzer, scope, raw, table, rest),
                None => Err(missing_table(analyzer, first, &rest[0], &path_str)),
            }
        }
    }
}

fn missing_table(analyzer: &mut Analyzer, database: &str, table: &str, path: &str) -> DbError {
    let name = TableName::new(Some(database), table);
    debug!(%name, "recording missing table");
    analyzer.add_missing_table(name);
    DbError::missing(format!("Could not resolve table reference: '{path}'"))
}

fn resolve_relative_collection(
    analyzer: &mut Analyzer,
    raw: &RawTableRef,
    tuple: TupleId,
    columns: &[String],
    path: &str,
) -> Result<TableRef> {
    let [column] = columns else {
        not_implemented!("Nested field paths in table references: '{path}'");
    };

    let desc = analyzer.desc_tbl().get_tuple(tuple)?;
    let datatype = desc
        .source()
        .and_then(|source| source.find_column(column))
        .map(|col| col.datatype.clone())
        .ok_or_else(|| DbError::missing(format!("Could not resolve table reference: '{path}'")))?;

    if !datatype.is_collection() {
        return Err(DbError::new(format!(
            "Illegal table reference to non-collection type: '{path}'"
        ))
        .with_field("type", datatype));
    }

    Ok(TableRef::Collection(CollectionTableRef::new(
        raw.clone(),
        CollectionRoot::Relative {
            tuple,
            column: column.clone(),
        },
        datatype,
    )))
}

/// Build a ref for a catalog table or view, with `columns` naming a
/// collection column if the path continues past the table name.
fn resolve_catalog_table(
    analyzer: &mut Analyzer,
    scope: ScopeRef,
    raw: &RawTableRef,
    table: Arc<CatalogTable>,
    columns: &[String],
) -> Result<TableRef> {
    let is_local_view = matches!(&table.kind, TableKind::View(def) if def.local);
    if !is_local_view {
        analyzer.check_table_access(scope, &table)?;
    }

    match (columns, &table.kind) {
        ([], TableKind::Base) => Ok(TableRef::BaseTable(BaseTableRef::new(
            raw.clone(),
            table.clone(),
        ))),
        ([], TableKind::View(def)) => {
            let query = def.query.clone();
            Ok(TableRef::View(InlineViewRef::new(
                raw.clone(),
                query,
                Some(table.clone()),
            )))
        }
        ([column], TableKind::Base) => {
            let path = raw.path.join(".");
            let col = table.get_column(column).ok_or_else(|| {
                DbError::missing(format!("Could not resolve table reference: '{path}'"))
            })?;
            if !col.datatype.is_collection() {
                return Err(DbError::new(format!(
                    "Illegal table reference to non-collection type: '{path}'"
                ))
                .with_field("type", col.datatype.clone()));
            }
            let datatype = col.datatype.clone();
            Ok(TableRef::Collection(CollectionTableRef::new(
                raw.clone(),
                CollectionRoot::Table {
                    table: table.clone(),
                    column: column.clone(),
                },
                datatype,
            )))
        }
        _ => not_implemented!("Table reference path: '{}'", raw.path.join(".")),
    }
}
