use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use sema_error::{DbError, Result};
use tracing::{debug, trace};

use super::bind_query::{AnalyzedQuery, QueryAnalyzer};
use crate::ast::QueryStmt;
use crate::catalog::auth::{AllowAll, Authorizer};
use crate::catalog::{Catalog, CatalogTable, CatalogTableId, TableKind, TableName, ViewDefinition};
use crate::config::session::AnalyzerConfig;
use crate::descriptor::ids::{SlotId, TupleId};
use crate::descriptor::table::DescriptorTable;
use crate::eval::{ConstEvaluator, ExprEvaluator};
use crate::expr::Expression;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::comparison_expr::{ComparisonExpr, ComparisonOperator};

/// Ids handed to views defined in WITH clauses. Kept apart from catalog ids.
const LOCAL_VIEW_ID_START: u32 = 1 << 31;

/// Reference to an analysis scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeRef {
    pub scope_idx: usize,
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.scope_idx)
    }
}

/// A column referenced from a scope nested below the scope that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelatedColumn {
    /// Scope owning the referenced tuple.
    pub outer: ScopeRef,
    pub tuple: TupleId,
    pub slot: SlotId,
}

#[derive(Debug)]
struct AnalysisScope {
    /// None for the root scope.
    parent: Option<ScopeRef>,
    /// Registered aliases, each naming one tuple.
    aliases: IndexMap<String, TupleId>,
    /// Tuples registered in this scope, in FROM clause order.
    tuples: Vec<TupleId>,
    correlated_columns: Vec<CorrelatedColumn>,
    /// Views defined by a WITH clause at this level.
    local_views: HashMap<String, Arc<CatalogTable>>,
    enable_privilege_checks: bool,
    /// Replaces the authorizer's error message when set.
    auth_error_message: Option<String>,
    use_hive_column_labels: bool,
    has_limit_offset: bool,
}

impl AnalysisScope {
    fn new(parent: Option<ScopeRef>, inherit_from: Option<&AnalysisScope>, config: &AnalyzerConfig) -> Self {
        let (enable_privilege_checks, auth_error_message, use_hive_column_labels) = match inherit_from {
            Some(parent) => (
                parent.enable_privilege_checks,
                parent.auth_error_message.clone(),
                parent.use_hive_column_labels,
            ),
            None => (
                config.enable_privilege_checks,
                config.auth_error_message.clone(),
                config.use_hive_column_labels,
            ),
        };

        AnalysisScope {
            parent,
            aliases: IndexMap::new(),
            tuples: Vec::new(),
            correlated_columns: Vec::new(),
            local_views: HashMap::new(),
            enable_privilege_checks,
            auth_error_message,
            use_hive_column_labels,
            has_limit_offset: false,
        }
    }
}

/// Union-find over slots connected by auxiliary equality predicates.
#[derive(Debug, Default)]
struct SlotEquivalences {
    parents: HashMap<SlotId, SlotId>,
}

impl SlotEquivalences {
    fn find(&self, mut slot: SlotId) -> SlotId {
        while let Some(&parent) = self.parents.get(&slot) {
            if parent == slot {
                break;
            }
            slot = parent;
        }
        slot
    }

    fn union(&mut self, a: SlotId, b: SlotId) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parents.insert(root_a, root_b);
        }
    }
}

/// State for analyzing one statement.
///
/// Holds the scope tree, the descriptor table and all collaborators. Scopes
/// are created per query block and chained to their parent so that inner
/// blocks can resolve correlated references.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    catalog: Arc<dyn Catalog>,
    authorizer: Arc<dyn Authorizer>,
    evaluator: Arc<dyn ConstEvaluator>,
    desc_tbl: DescriptorTable,
    scopes: Vec<AnalysisScope>,
    /// Tables that failed to resolve, in discovery order.
    missing_tables: IndexSet<TableName>,
    /// Tuples on the nullable side of an outer join.
    outer_joined_tuples: IndexSet<TupleId>,
    /// Memoized slots per (tuple, column name).
    column_slots: HashMap<(TupleId, String), SlotId>,
    /// Bound ON clause predicates.
    conjuncts: Vec<Expression>,
    aux_predicates: Vec<Expression>,
    value_transfers: SlotEquivalences,
    next_local_view_id: u32,
}

impl Analyzer {
    /// Create an analyzer that permits all table access and evaluates
    /// constants with the builtin evaluator.
    pub fn new(config: AnalyzerConfig, catalog: Arc<dyn Catalog>) -> Self {
        let root = AnalysisScope::new(None, None, &config);
        Analyzer {
            config,
            catalog,
            authorizer: Arc::new(AllowAll),
            evaluator: Arc::new(ExprEvaluator),
            desc_tbl: DescriptorTable::new(),
            scopes: vec![root],
            missing_tables: IndexSet::new(),
            outer_joined_tuples: IndexSet::new(),
            column_slots: HashMap::new(),
            conjuncts: Vec::new(),
            aux_predicates: Vec::new(),
            value_transfers: SlotEquivalences::default(),
            next_local_view_id: LOCAL_VIEW_ID_START,
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ConstEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn authorizer(&self) -> &Arc<dyn Authorizer> {
        &self.authorizer
    }

    pub fn evaluator(&self) -> Arc<dyn ConstEvaluator> {
        self.evaluator.clone()
    }

    pub fn desc_tbl(&self) -> &DescriptorTable {
        &self.desc_tbl
    }

    pub fn desc_tbl_mut(&mut self) -> &mut DescriptorTable {
        &mut self.desc_tbl
    }

    /// Database used for unqualified table names.
    pub fn default_database(&self) -> &str {
        &self.config.default_database
    }

    /// Analyze a complete statement in the root scope.
    ///
    /// Slots referenced by the result and ON clauses are materialized and
    /// memory layouts are computed for every materialized tuple.
    pub fn analyze_statement(&mut self, stmt: &QueryStmt) -> Result<AnalyzedQuery> {
        let root = self.root_scope();
        let analyzed = QueryAnalyzer::new(root).analyze(self, stmt)?;

        let referenced: Vec<SlotId> = analyzed
            .base_tbl_result_exprs
            .iter()
            .chain(&self.conjuncts)
            .flat_map(|expr| expr.collect_column_refs())
            .map(|col| col.slot)
            .collect();
        self.desc_tbl.mark_slots_materialized(referenced)?;
        self.compute_mem_layouts()?;

        Ok(analyzed)
    }

    pub fn root_scope(&self) -> ScopeRef {
        ScopeRef { scope_idx: 0 }
    }

    /// Create a scope nested in `parent`. The new scope inherits the parent's
    /// privilege and labeling settings.
    pub fn new_child_scope(&mut self, parent: ScopeRef) -> Result<ScopeRef> {
        let child = {
            let parent_scope = self.get_scope(parent)?;
            AnalysisScope::new(Some(parent), Some(parent_scope), &self.config)
        };
        let idx = self.scopes.len();
        self.scopes.push(child);
        Ok(ScopeRef { scope_idx: idx })
    }

    pub fn parent_scope(&self, scope: ScopeRef) -> Result<Option<ScopeRef>> {
        Ok(self.get_scope(scope)?.parent)
    }

    fn get_scope(&self, scope: ScopeRef) -> Result<&AnalysisScope> {
        self.scopes
            .get(scope.scope_idx)
            .ok_or_else(|| DbError::internal(format!("Missing analysis scope {scope}")))
    }

    fn get_scope_mut(&mut self, scope: ScopeRef) -> Result<&mut AnalysisScope> {
        self.scopes
            .get_mut(scope.scope_idx)
            .ok_or_else(|| DbError::internal(format!("Missing analysis scope {scope}")))
    }

    pub fn set_enable_privilege_checks(&mut self, scope: ScopeRef, enabled: bool) -> Result<()> {
        self.get_scope_mut(scope)?.enable_privilege_checks = enabled;
        Ok(())
    }

    pub fn privilege_checks_enabled(&self, scope: ScopeRef) -> Result<bool> {
        Ok(self.get_scope(scope)?.enable_privilege_checks)
    }

    pub fn set_auth_error_message(&mut self, scope: ScopeRef, msg: impl Into<String>) -> Result<()> {
        self.get_scope_mut(scope)?.auth_error_message = Some(msg.into());
        Ok(())
    }

    pub fn auth_error_message(&self, scope: ScopeRef) -> Result<Option<&str>> {
        Ok(self.get_scope(scope)?.auth_error_message.as_deref())
    }

    pub fn set_use_hive_column_labels(&mut self, scope: ScopeRef, enabled: bool) -> Result<()> {
        self.get_scope_mut(scope)?.use_hive_column_labels = enabled;
        Ok(())
    }

    pub fn use_hive_column_labels(&self, scope: ScopeRef) -> Result<bool> {
        Ok(self.get_scope(scope)?.use_hive_column_labels)
    }

    pub fn set_has_limit_offset(&mut self, scope: ScopeRef, has_limit_offset: bool) -> Result<()> {
        self.get_scope_mut(scope)?.has_limit_offset = has_limit_offset;
        Ok(())
    }

    pub fn has_limit_offset(&self, scope: ScopeRef) -> Result<bool> {
        Ok(self.get_scope(scope)?.has_limit_offset)
    }

    /// Check that `user` may read `table`, honoring the scope's privilege
    /// settings.
    pub fn check_table_access(&self, scope: ScopeRef, table: &CatalogTable) -> Result<()> {
        let scope = self.get_scope(scope)?;
        if !scope.enable_privilege_checks {
            return Ok(());
        }
        match self.authorizer.check_table_access(&self.config.user, table) {
            Ok(()) => Ok(()),
            Err(e) => match &scope.auth_error_message {
                Some(msg) => Err(DbError::new(msg.clone()).with_source(Box::new(e))),
                None => Err(e),
            },
        }
    }

    /// Register a view defined in a WITH clause.
    pub fn register_local_view(&mut self, scope: ScopeRef, name: &str, query: QueryStmt) -> Result<()> {
        let name = name.to_lowercase();
        let id = CatalogTableId(self.next_local_view_id);
        let scope = self.get_scope_mut(scope)?;
        if scope.local_views.contains_key(&name) {
            return Err(DbError::new(format!(
                "Duplicate table alias: '{name}'"
            )));
        }

        let view = CatalogTable {
            id,
            database: String::new(),
            name: name.clone(),
            columns: Vec::new(),
            kind: TableKind::View(ViewDefinition { query, local: true }),
        };
        scope.local_views.insert(name, Arc::new(view));
        self.next_local_view_id += 1;

        Ok(())
    }

    /// Find a WITH clause view visible from `scope`.
    pub fn find_local_view(&self, scope: ScopeRef, name: &str) -> Result<Option<Arc<CatalogTable>>> {
        let mut current = Some(scope);
        while let Some(scope_ref) = current {
            let scope = self.get_scope(scope_ref)?;
            if let Some(view) = scope.local_views.get(name) {
                return Ok(Some(view.clone()));
            }
            current = scope.parent;
        }
        Ok(None)
    }

    /// Register a tuple under the given aliases.
    ///
    /// Errors if any alias is already registered in the scope.
    pub fn register_table_ref(&mut self, scope: ScopeRef, tuple: TupleId, aliases: &[String]) -> Result<()> {
        let scope_data = self.get_scope_mut(scope)?;
        for alias in aliases {
            if scope_data.aliases.contains_key(alias) {
                return Err(DbError::new(format!("Duplicate table alias: '{alias}'")));
            }
        }
        for alias in aliases {
            scope_data.aliases.insert(alias.clone(), tuple);
        }
        scope_data.tuples.push(tuple);
        trace!(%scope, %tuple, ?aliases, "registered table ref");
        Ok(())
    }

    /// Find the tuple registered under `alias` in `scope` or any of its
    /// ancestors.
    pub fn lookup_alias(&self, scope: ScopeRef, alias: &str) -> Result<Option<(ScopeRef, TupleId)>> {
        let mut current = Some(scope);
        while let Some(scope_ref) = current {
            let scope = self.get_scope(scope_ref)?;
            if let Some(&tuple) = scope.aliases.get(alias) {
                return Ok(Some((scope_ref, tuple)));
            }
            current = scope.parent;
        }
        Ok(None)
    }

    pub fn tuples_in_scope(&self, scope: ScopeRef) -> Result<&[TupleId]> {
        Ok(&self.get_scope(scope)?.tuples)
    }

    /// Scope the tuple was registered in.
    pub fn find_scope_for_tuple(&self, tuple: TupleId) -> Option<ScopeRef> {
        self.scopes
            .iter()
            .position(|scope| scope.tuples.contains(&tuple))
            .map(|scope_idx| ScopeRef { scope_idx })
    }

    /// Get or create the slot for a column of a tuple.
    pub fn register_column_ref(&mut self, tuple: TupleId, column: &str) -> Result<SlotId> {
        let key = (tuple, column.to_string());
        if let Some(slot) = self.column_slots.get(&key) {
            return Ok(*slot);
        }

        let (catalog_column, datatype) = {
            let desc = self.desc_tbl.get_tuple(tuple)?;
            let source = desc.source().ok_or_else(|| {
                DbError::internal(format!("Tuple {tuple} has no source to resolve '{column}'"))
            })?;
            let col = source.find_column(column).ok_or_else(|| {
                DbError::missing(format!(
                    "Could not resolve column/field reference: '{column}'"
                ))
            })?;
            (col.catalog_column.cloned(), col.datatype.clone())
        };

        let slot_id = self.desc_tbl.add_slot(tuple)?;
        let slot = self.desc_tbl.get_slot_mut(slot_id)?;
        match catalog_column {
            Some(col) => slot.set_column(col),
            None => slot.set_datatype(datatype),
        }
        slot.set_label(column);

        self.column_slots.insert(key, slot_id);
        Ok(slot_id)
    }

    /// Create a materialized slot on `parent` holding the collection that is
    /// unnested into `item_tuple`.
    ///
    /// Every unnesting gets its own slot, even if the same collection column
    /// is unnested more than once.
    pub fn register_collection_slot(
        &mut self,
        parent: TupleId,
        column: &str,
        item_tuple: TupleId,
    ) -> Result<SlotId> {
        let (catalog_column, datatype) = {
            let desc = self.desc_tbl.get_tuple(parent)?;
            let col = desc
                .source()
                .and_then(|source| source.find_column(column))
                .ok_or_else(|| {
                    DbError::internal(format!("Tuple {parent} has no collection column '{column}'"))
                })?;
            (col.catalog_column.cloned(), col.datatype.clone())
        };
        if !datatype.is_collection() {
            return Err(DbError::internal(format!(
                "Column '{column}' of tuple {parent} is not a collection"
            )));
        }

        let slot_id = self.desc_tbl.add_slot(parent)?;
        let slot = self.desc_tbl.get_slot_mut(slot_id)?;
        match catalog_column {
            Some(col) => slot.set_column(col),
            None => slot.set_datatype(datatype),
        }
        slot.set_label(column);
        slot.set_item_tuple(item_tuple);
        slot.set_materialized(true);

        trace!(%parent, %slot_id, %item_tuple, "registered collection slot");
        Ok(slot_id)
    }

    /// Resolve a possibly qualified column reference.
    ///
    /// The current scope is searched first, then each ancestor. Columns found
    /// in an ancestor are recorded as correlated in `scope`.
    pub fn resolve_column(&mut self, scope: ScopeRef, path: &[String]) -> Result<ColumnExpr> {
        let path: Vec<String> = path.iter().map(|p| p.to_lowercase()).collect();
        let label = path.join(".");
        let not_found = || {
            DbError::missing(format!(
                "Could not resolve column/field reference: '{label}'"
            ))
        };

        let (qualifier, column) = match path.as_slice() {
            [col] => (None, col.clone()),
            [alias, col] => (Some(alias.clone()), col.clone()),
            [db, table, col] => (Some(format!("{db}.{table}")), col.clone()),
            _ => return Err(not_found()),
        };

        let mut current = Some(scope);
        while let Some(scope_ref) = current {
            let scope_data = self.get_scope(scope_ref)?;
            let mut found: Option<TupleId> = None;

            match &qualifier {
                Some(alias) => {
                    if let Some(&tuple) = scope_data.aliases.get(alias) {
                        if !self.tuple_has_column(tuple, &column)? {
                            return Err(not_found());
                        }
                        found = Some(tuple);
                    }
                }
                None => {
                    for &tuple in &scope_data.tuples {
                        if !self.tuple_has_column(tuple, &column)? {
                            continue;
                        }
                        if found.is_some() {
                            return Err(DbError::new(format!(
                                "Column/field reference is ambiguous: '{label}'"
                            )));
                        }
                        found = Some(tuple);
                    }
                }
            }

            if let Some(tuple) = found {
                let slot = self.register_column_ref(tuple, &column)?;
                if scope_ref != scope {
                    debug!(%scope, outer = %scope_ref, %slot, "correlated column reference");
                    self.get_scope_mut(scope)?
                        .correlated_columns
                        .push(CorrelatedColumn {
                            outer: scope_ref,
                            tuple,
                            slot,
                        });
                }
                let datatype = self.desc_tbl.get_slot(slot)?.datatype()?.clone();
                return Ok(ColumnExpr::new(slot, datatype, label));
            }

            current = scope_data.parent;
        }

        Err(not_found())
    }

    fn tuple_has_column(&self, tuple: TupleId, column: &str) -> Result<bool> {
        let desc = self.desc_tbl.get_tuple(tuple)?;
        Ok(desc
            .source()
            .is_some_and(|source| source.find_column(column).is_some()))
    }

    pub fn correlated_columns(&self, scope: ScopeRef) -> Result<&[CorrelatedColumn]> {
        Ok(&self.get_scope(scope)?.correlated_columns)
    }

    /// Register `lhs = rhs` as an auxiliary predicate. If both sides are
    /// column references the slots are recorded as carrying the same value.
    pub fn create_aux_equiv_predicate(&mut self, lhs: Expression, rhs: Expression) -> Result<()> {
        if let (Expression::Column(l), Expression::Column(r)) = (&lhs, &rhs) {
            self.value_transfers.union(l.slot, r.slot);
        }
        let pred = ComparisonExpr::try_new(ComparisonOperator::Eq, lhs, rhs)?;
        trace!(%pred, "created auxiliary predicate");
        self.aux_predicates.push(pred.into());
        Ok(())
    }

    pub fn aux_predicates(&self) -> &[Expression] {
        &self.aux_predicates
    }

    /// Check if two slots are known to carry the same value.
    pub fn has_value_transfer(&self, a: SlotId, b: SlotId) -> bool {
        a == b || self.value_transfers.find(a) == self.value_transfers.find(b)
    }

    /// Mark tuples as being on the nullable side of an outer join.
    pub fn register_outer_joined(&mut self, tuples: impl IntoIterator<Item = TupleId>) {
        for tuple in tuples {
            trace!(%tuple, "registered outer joined tuple");
            self.outer_joined_tuples.insert(tuple);
        }
    }

    pub fn is_outer_joined(&self, tuple: TupleId) -> bool {
        self.outer_joined_tuples.contains(&tuple)
    }

    pub fn register_conjunct(&mut self, expr: Expression) {
        self.conjuncts.push(expr);
    }

    pub fn conjuncts(&self) -> &[Expression] {
        &self.conjuncts
    }

    pub fn add_missing_table(&mut self, table: TableName) {
        self.missing_tables.insert(table);
    }

    pub fn has_missing_tables(&self) -> bool {
        !self.missing_tables.is_empty()
    }

    pub fn missing_tables(&self) -> impl Iterator<Item = &TableName> {
        self.missing_tables.iter()
    }

    pub fn compute_mem_layouts(&mut self) -> Result<()> {
        self.desc_tbl.compute_mem_layouts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::catalog::memory::MemoryCatalog;
    use crate::descriptor::tuple::TupleSource;
    use crate::expr::lit;

    fn analyzer_with_table() -> (Analyzer, TupleId) {
        let mut catalog = MemoryCatalog::new("default");
        let table = catalog
            .create_table("default", "t", [("a", DataType::Int32), ("b", DataType::Utf8)])
            .unwrap();
        let mut analyzer = Analyzer::new(AnalyzerConfig::default(), Arc::new(catalog));

        let tuple = analyzer.desc_tbl_mut().create_tuple_descriptor("t");
        analyzer
            .desc_tbl_mut()
            .get_tuple_mut(tuple)
            .unwrap()
            .set_source(TupleSource::Table(table));
        let root = analyzer.root_scope();
        analyzer
            .register_table_ref(root, tuple, &["default.t".to_string(), "t".to_string()])
            .unwrap();

        (analyzer, tuple)
    }

    #[test]
    fn column_slots_memoized() {
        let (mut analyzer, tuple) = analyzer_with_table();
        let s1 = analyzer.register_column_ref(tuple, "a").unwrap();
        let s2 = analyzer.register_column_ref(tuple, "a").unwrap();
        let s3 = analyzer.register_column_ref(tuple, "b").unwrap();
        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_eq!(2, analyzer.desc_tbl().get_tuple(tuple).unwrap().slots().len());
    }

    #[test]
    fn duplicate_alias() {
        let (mut analyzer, _) = analyzer_with_table();
        let other = analyzer.desc_tbl_mut().create_tuple_descriptor("other");
        let root = analyzer.root_scope();
        let err = analyzer
            .register_table_ref(root, other, &["t".to_string()])
            .unwrap_err();
        assert_eq!("Duplicate table alias: 't'", err.get_msg());
    }

    #[test]
    fn correlated_resolution() {
        let (mut analyzer, tuple) = analyzer_with_table();
        let root = analyzer.root_scope();
        let child = analyzer.new_child_scope(root).unwrap();

        let col = analyzer
            .resolve_column(child, &["t".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!("t.a", col.label);

        let correlated = analyzer.correlated_columns(child).unwrap();
        assert_eq!(1, correlated.len());
        assert_eq!(root, correlated[0].outer);
        assert_eq!(tuple, correlated[0].tuple);
        assert_eq!(Some(root), analyzer.find_scope_for_tuple(tuple));
    }

    #[test]
    fn unresolved_column() {
        let (mut analyzer, _) = analyzer_with_table();
        let root = analyzer.root_scope();
        let err = analyzer
            .resolve_column(root, &["nope".to_string()])
            .unwrap_err();
        assert!(err.is_kind(sema_error::ErrorKind::MissingObject));
    }

    #[test]
    fn value_transfer_is_transitive() {
        let (mut analyzer, tuple) = analyzer_with_table();
        let a = analyzer.register_column_ref(tuple, "a").unwrap();
        let other = analyzer.desc_tbl_mut().create_tuple_descriptor("x");
        let b = analyzer.desc_tbl_mut().add_slot(other).unwrap();
        let c = analyzer.desc_tbl_mut().add_slot(other).unwrap();

        let col = |s: SlotId| -> Expression { crate::expr::column(s, DataType::Int32, "c").into() };
        analyzer.create_aux_equiv_predicate(col(a), col(b)).unwrap();
        analyzer.create_aux_equiv_predicate(col(b), col(c)).unwrap();

        assert!(analyzer.has_value_transfer(a, c));
        assert_eq!(2, analyzer.aux_predicates().len());

        // Non-column sides only add the predicate.
        analyzer.create_aux_equiv_predicate(col(a), lit(3).into()).unwrap();
        assert_eq!(3, analyzer.aux_predicates().len());
    }

    #[test]
    fn child_scope_inherits_settings() {
        let (mut analyzer, _) = analyzer_with_table();
        let root = analyzer.root_scope();
        analyzer.set_use_hive_column_labels(root, true).unwrap();
        let child = analyzer.new_child_scope(root).unwrap();
        assert!(analyzer.use_hive_column_labels(child).unwrap());
        assert!(analyzer.privilege_checks_enabled(child).unwrap());
    }
}
