use std::fmt;

use sema_error::{DbError, ErrorKind, Result};
use tracing::{debug, warn};

use super::analyzer::{Analyzer, ScopeRef};
use super::resolve::resolve_table_ref;
use super::table_ref::TableRef;
use super::table_ref::inline_view::InlineViewRef;
use crate::ast::RawTableRef;
use crate::descriptor::ids::TupleId;

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Unresolved(RawTableRef),
    Resolved(TableRef),
}

impl FromItem {
    pub fn raw(&self) -> &RawTableRef {
        match self {
            Self::Unresolved(raw) => raw,
            Self::Resolved(table_ref) => table_ref.raw(),
        }
    }
}

/// The table refs of a FROM clause, resolved and analyzed left to right.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromClause {
    items: Vec<FromItem>,
    analyzed: bool,
}

impl FromClause {
    pub fn new(refs: impl IntoIterator<Item = RawTableRef>) -> Self {
        FromClause {
            items: refs.into_iter().map(FromItem::Unresolved).collect(),
            analyzed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn items(&self) -> &[FromItem] {
        &self.items
    }

    /// Resolved table refs, in FROM clause order.
    pub fn table_refs(&self) -> impl Iterator<Item = &TableRef> {
        self.items.iter().filter_map(|item| match item {
            FromItem::Resolved(table_ref) => Some(table_ref),
            FromItem::Unresolved(_) => None,
        })
    }

    /// Inline views and views, in FROM clause order.
    pub fn inline_views(&self) -> impl Iterator<Item = &InlineViewRef> {
        self.table_refs().filter_map(|table_ref| match table_ref {
            TableRef::View(view) | TableRef::InlineView(view) => Some(view),
            _ => None,
        })
    }

    /// Resolve and analyze every ref.
    ///
    /// Once a table failed to resolve, errors from later refs are logged and
    /// dropped since they're most likely caused by the missing table. All
    /// missing tables are reported together in a single error after the
    /// pass. Internal errors are always returned.
    pub fn analyze(&mut self, analyzer: &mut Analyzer, scope: ScopeRef) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        let mut left_tuple_ids: Vec<TupleId> = Vec::new();
        for idx in 0..self.items.len() {
            match self.analyze_item(analyzer, scope, idx, &left_tuple_ids) {
                Ok(tuple_ids) => left_tuple_ids.extend(tuple_ids),
                Err(e) if !e.is_kind(ErrorKind::Internal) && analyzer.has_missing_tables() => {
                    let table_ref = self.items[idx].raw().table_sql();
                    warn!(error = %e, %table_ref, "ignoring table ref error after missing table");
                }
                Err(e) => return Err(e),
            }
        }

        if analyzer.has_missing_tables() {
            let tables: Vec<_> = analyzer.missing_tables().map(|t| t.to_string()).collect();
            return Err(
                DbError::missing("Found missing tables. Aborting analysis.")
                    .with_field("tables", tables.join(", ")),
            );
        }

        for item in &mut self.items {
            if let FromItem::Resolved(TableRef::View(view) | TableRef::InlineView(view)) = item {
                if analyzer.is_outer_joined(view.info.desc()?) {
                    debug!(view = %view.info.raw.table_sql(), "making inline view output nullable");
                    view.make_output_nullable(analyzer)?;
                }
            }
        }

        self.analyzed = true;
        Ok(())
    }

    fn analyze_item(
        &mut self,
        analyzer: &mut Analyzer,
        scope: ScopeRef,
        idx: usize,
        left_tuple_ids: &[TupleId],
    ) -> Result<Vec<TupleId>> {
        if let FromItem::Unresolved(raw) = &self.items[idx] {
            let table_ref = resolve_table_ref(analyzer, scope, raw)?;
            self.items[idx] = FromItem::Resolved(table_ref);
        }

        let FromItem::Resolved(table_ref) = &mut self.items[idx] else {
            return Err(DbError::internal("FROM clause item not resolved"));
        };
        table_ref.analyze(analyzer, scope, left_tuple_ids)?;
        table_ref.all_tuple_ids()
    }

    /// Tuples materialized by all refs.
    pub fn materialized_tuple_ids(&self) -> Result<Vec<TupleId>> {
        let mut ids = Vec::new();
        for table_ref in self.table_refs() {
            ids.extend(table_ref.materialized_tuple_ids()?);
        }
        Ok(ids)
    }

    /// A copy of this clause as written, to be resolved and analyzed again.
    pub fn clone_unanalyzed(&self) -> Self {
        FromClause {
            items: self
                .items
                .iter()
                .map(|item| FromItem::Unresolved(item.raw().clone()))
                .collect(),
            analyzed: false,
        }
    }

    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, item) in self.items.iter().enumerate() {
            let raw = item.raw();
            if idx == 0 {
                write!(f, "FROM {}", raw.table_sql())?;
                continue;
            }
            match raw.join_op {
                Some(op) => write!(f, " {op} {}", raw.table_sql())?,
                None => write!(f, ", {}", raw.table_sql())?,
            }
            if let Some(on) = &raw.on_clause {
                write!(f, " ON {on}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{JoinOperator, RawExpr};
    use crate::expr::comparison_expr::ComparisonOperator;

    #[test]
    fn render_joins() {
        let on = RawExpr::Comparison {
            op: ComparisonOperator::Eq,
            left: Box::new(RawExpr::column(&["a", "x"])),
            right: Box::new(RawExpr::column(&["b", "x"])),
        };
        let from = FromClause::new([
            RawTableRef::table(&["t1"]).with_alias("a"),
            RawTableRef::table(&["t2"])
                .with_alias("b")
                .with_join(JoinOperator::LeftOuter, Some(on)),
            RawTableRef::table(&["db", "t3"]),
        ]);
        assert_eq!(
            "FROM t1 a LEFT OUTER JOIN t2 b ON a.x = b.x, db.t3",
            from.to_sql()
        );
    }

    #[test]
    fn clone_unanalyzed_keeps_refs() {
        let from = FromClause::new([RawTableRef::table(&["t1"])]);
        let cloned = from.clone_unanalyzed();
        assert_eq!(from, cloned);
        assert!(!cloned.is_analyzed());
    }
}
