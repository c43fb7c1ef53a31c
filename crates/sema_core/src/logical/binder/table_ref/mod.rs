pub mod base_table;
pub mod collection;
pub mod inline_view;

use base_table::BaseTableRef;
use collection::CollectionTableRef;
use inline_view::InlineViewRef;
use sema_error::{DbError, Result};
use tracing::trace;

use super::analyzer::{Analyzer, ScopeRef};
use super::expr_binder::ExprBinder;
use crate::ast::{JoinOperator, RawTableRef};
use crate::descriptor::ids::TupleId;
use crate::expr::Expression;

/// Analysis results of a table ref.
///
/// Everything that has to be recomputed when a ref is analyzed again lives
/// here so that `reset` only needs to replace this struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRefState {
    pub analyzed: bool,
    /// Tuple registered for this ref's rows.
    pub desc: Option<TupleId>,
    /// Scope this ref was registered in.
    pub scope: Option<ScopeRef>,
    /// Tuples of all refs to the left of this one in the FROM clause.
    pub left_tuple_ids: Vec<TupleId>,
    /// Bound ON clause.
    pub on_clause: Option<Expression>,
}

/// Fields shared by all table ref variants.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRefInfo {
    /// The ref as written.
    pub raw: RawTableRef,
    pub state: TableRefState,
}

impl TableRefInfo {
    pub fn new(raw: RawTableRef) -> Self {
        TableRefInfo {
            raw,
            state: TableRefState::default(),
        }
    }

    pub fn explicit_alias(&self) -> Option<String> {
        self.raw.alias.as_ref().map(|alias| alias.to_lowercase())
    }

    pub fn join_op(&self) -> Option<JoinOperator> {
        self.raw.join_op
    }

    pub fn desc(&self) -> Result<TupleId> {
        self.state.desc.ok_or_else(|| {
            DbError::internal(format!(
                "Table ref '{}' has not been analyzed",
                self.raw.table_sql()
            ))
        })
    }

    pub(crate) fn set_analyzed_desc(&mut self, desc: TupleId, scope: ScopeRef) {
        self.state.desc = Some(desc);
        self.state.scope = Some(scope);
    }
}

/// A resolved entry of a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A table with physical storage.
    BaseTable(BaseTableRef),
    /// A view from the catalog or a WITH clause.
    View(InlineViewRef),
    /// A subquery in the FROM clause.
    InlineView(InlineViewRef),
    /// An unnested collection column.
    Collection(CollectionTableRef),
}

impl TableRef {
    pub fn info(&self) -> &TableRefInfo {
        match self {
            Self::BaseTable(r) => &r.info,
            Self::View(r) | Self::InlineView(r) => &r.info,
            Self::Collection(r) => &r.info,
        }
    }

    fn info_mut(&mut self) -> &mut TableRefInfo {
        match self {
            Self::BaseTable(r) => &mut r.info,
            Self::View(r) | Self::InlineView(r) => &mut r.info,
            Self::Collection(r) => &mut r.info,
        }
    }

    pub fn raw(&self) -> &RawTableRef {
        &self.info().raw
    }

    pub fn is_analyzed(&self) -> bool {
        self.info().state.analyzed
    }

    /// Tuple registered for this ref. Errors if the ref wasn't analyzed.
    pub fn desc(&self) -> Result<TupleId> {
        self.info().desc()
    }

    /// Analyze this ref in `scope` and then its join with the refs to its
    /// left. Analyzing an analyzed ref is a no-op.
    pub fn analyze(
        &mut self,
        analyzer: &mut Analyzer,
        scope: ScopeRef,
        left_tuple_ids: &[TupleId],
    ) -> Result<()> {
        if self.is_analyzed() {
            return Ok(());
        }

        match self {
            Self::BaseTable(r) => r.analyze(analyzer, scope)?,
            Self::View(r) | Self::InlineView(r) => r.analyze(analyzer, scope)?,
            Self::Collection(r) => r.analyze(analyzer, scope)?,
        }

        self.info_mut().state.left_tuple_ids = left_tuple_ids.to_vec();
        self.analyze_join(analyzer, scope)?;
        self.info_mut().state.analyzed = true;

        trace!(table_ref = %self.to_sql(), "analyzed table ref");

        Ok(())
    }

    fn analyze_join(&mut self, analyzer: &mut Analyzer, scope: ScopeRef) -> Result<()> {
        let is_first = self.info().state.left_tuple_ids.is_empty();
        let join_op = match self.info().join_op() {
            Some(op) => op,
            None if is_first => {
                if self.raw().on_clause.is_some() {
                    return Err(DbError::new(format!(
                        "ON clause not allowed on the first table reference: {}",
                        self.to_sql()
                    )));
                }
                return Ok(());
            }
            None => JoinOperator::Cross,
        };

        match (&self.raw().on_clause, join_op) {
            (Some(_), JoinOperator::Cross) => {
                return Err(DbError::new(format!(
                    "{join_op} cannot have an ON clause: {}",
                    self.to_sql()
                )));
            }
            (None, op) if op.is_outer_join() => {
                return Err(DbError::new(format!(
                    "{op} requires an ON clause: {}",
                    self.to_sql()
                )));
            }
            _ => (),
        }

        if let Some(raw_on) = self.raw().on_clause.clone() {
            let on = ExprBinder::new(scope).bind(analyzer, &raw_on)?;
            let datatype = on.datatype()?;
            if !datatype.is_boolean() && !datatype.is_null() {
                return Err(DbError::new(format!(
                    "ON clause '{raw_on}' requires return type 'BOOLEAN'. Actual type is '{datatype}'."
                )));
            }
            analyzer.register_conjunct(on.clone());
            self.info_mut().state.on_clause = Some(on);
        }

        let this_ids = self.all_tuple_ids()?;
        let left_ids = self.info().state.left_tuple_ids.clone();
        match join_op {
            JoinOperator::LeftOuter => analyzer.register_outer_joined(this_ids),
            JoinOperator::RightOuter => analyzer.register_outer_joined(left_ids),
            JoinOperator::FullOuter => {
                analyzer.register_outer_joined(left_ids);
                analyzer.register_outer_joined(this_ids);
            }
            JoinOperator::Inner | JoinOperator::Cross => (),
        }

        Ok(())
    }

    /// Tuples whose rows are produced by this ref.
    pub fn materialized_tuple_ids(&self) -> Result<Vec<TupleId>> {
        match self {
            Self::BaseTable(r) => Ok(vec![r.info.desc()?]),
            Self::View(r) | Self::InlineView(r) => r.materialized_tuple_ids(),
            Self::Collection(r) => Ok(vec![r.info.desc()?]),
        }
    }

    /// This ref's own tuple followed by any materialized tuples that differ
    /// from it.
    pub fn all_tuple_ids(&self) -> Result<Vec<TupleId>> {
        let mut ids = vec![self.desc()?];
        for id in self.materialized_tuple_ids()? {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Whether this ref unnests a collection of a row produced by another
    /// ref.
    pub fn is_relative(&self) -> bool {
        match self {
            Self::Collection(r) => r.is_relative(),
            _ => false,
        }
    }

    /// Whether this ref depends on a row of an enclosing query block.
    pub fn is_correlated(&self) -> bool {
        match self {
            Self::Collection(r) => r.is_correlated(),
            _ => false,
        }
    }

    /// Aliases this ref is registered under.
    pub fn aliases(&self) -> Vec<String> {
        match self {
            Self::BaseTable(r) => r.aliases(),
            Self::View(r) | Self::InlineView(r) => r.aliases(),
            Self::Collection(r) => r.aliases(),
        }
    }

    /// Bound ON clause, if any.
    pub fn on_clause(&self) -> Option<&Expression> {
        self.info().state.on_clause.as_ref()
    }

    /// Render this ref without its join.
    pub fn to_sql(&self) -> String {
        self.raw().table_sql()
    }

    /// Drop all analysis results so the ref can be analyzed again.
    pub fn reset(&mut self) {
        self.info_mut().state = TableRefState::default();
        match self {
            Self::View(r) | Self::InlineView(r) => r.reset_view(),
            Self::Collection(r) => r.reset_collection(),
            Self::BaseTable(_) => (),
        }
    }

    /// A copy of this ref with all analysis results dropped.
    pub fn clone_unanalyzed(&self) -> Self {
        let mut table_ref = self.clone();
        table_ref.reset();
        table_ref
    }
}
