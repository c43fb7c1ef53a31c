//! Unresolved statement trees as produced by the parser.

use std::fmt;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;
use crate::logical::analytic_window::{BoundaryType, WindowType};

#[derive(Debug, Clone, PartialEq)]
pub enum RawExpr {
    /// Possibly qualified column reference, e.g. `t.a`.
    Column(Vec<String>),
    Literal(ScalarValue),
    Arith {
        op: ArithOperator,
        left: Box<RawExpr>,
        right: Box<RawExpr>,
    },
    Comparison {
        op: ComparisonOperator,
        left: Box<RawExpr>,
        right: Box<RawExpr>,
    },
    Conjunction {
        op: ConjunctionOperator,
        exprs: Vec<RawExpr>,
    },
    Case {
        cases: Vec<(RawExpr, RawExpr)>,
        else_expr: Option<Box<RawExpr>>,
    },
    IsNull {
        expr: Box<RawExpr>,
        negated: bool,
    },
    Cast {
        expr: Box<RawExpr>,
        to: DataType,
    },
    Function {
        name: String,
        args: Vec<RawExpr>,
        over: Option<RawWindowSpec>,
    },
}

impl RawExpr {
    pub fn column(path: &[&str]) -> Self {
        RawExpr::Column(path.iter().map(|s| s.to_string()).collect())
    }

    pub fn lit(v: impl Into<ScalarValue>) -> Self {
        RawExpr::Literal(v.into())
    }

    pub fn function(name: &str, args: Vec<RawExpr>) -> Self {
        RawExpr::Function {
            name: name.to_string(),
            args,
            over: None,
        }
    }
}

impl fmt::Display for RawExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(path) => write!(f, "{}", path.join(".")),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Arith { op, left, right } => write!(f, "{left} {op} {right}"),
            Self::Comparison { op, left, right } => write!(f, "{left} {op} {right}"),
            Self::Conjunction { op, exprs } => {
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "({expr})")?;
                }
                Ok(())
            }
            Self::Case { cases, else_expr } => {
                write!(f, "CASE ")?;
                for (when, then) in cases {
                    write!(f, "WHEN {when} THEN {then} ")?;
                }
                if let Some(else_expr) = else_expr {
                    write!(f, "ELSE {else_expr} ")?;
                }
                write!(f, "END")
            }
            Self::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{expr} IS NOT NULL")
                } else {
                    write!(f, "{expr} IS NULL")
                }
            }
            Self::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Self::Function { name, args, over } => {
                write!(f, "{name}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")?;
                if let Some(over) = over {
                    write!(f, " OVER ({over})")?;
                }
                Ok(())
            }
        }
    }
}

/// The OVER clause of an analytic function call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawWindowSpec {
    pub partition_by: Vec<RawExpr>,
    pub order_by: Vec<RawOrderBy>,
    pub window: Option<RawWindow>,
}

impl fmt::Display for RawWindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let exprs: Vec<_> = self.partition_by.iter().map(|e| e.to_string()).collect();
            parts.push(format!("PARTITION BY {}", exprs.join(", ")));
        }
        if !self.order_by.is_empty() {
            let exprs: Vec<_> = self.order_by.iter().map(|e| e.to_string()).collect();
            parts.push(format!("ORDER BY {}", exprs.join(", ")));
        }
        if let Some(window) = &self.window {
            parts.push(window.to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawOrderBy {
    pub expr: RawExpr,
    pub desc: bool,
}

impl fmt::Display for RawOrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc {
            write!(f, "{} DESC", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWindow {
    pub window_type: WindowType,
    pub left: RawBoundary,
    pub right: Option<RawBoundary>,
}

impl fmt::Display for RawWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            Some(right) => write!(f, "{} BETWEEN {} AND {right}", self.window_type, self.left),
            None => write!(f, "{} {}", self.window_type, self.left),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBoundary {
    pub boundary_type: BoundaryType,
    pub offset: Option<Box<RawExpr>>,
}

impl RawBoundary {
    pub fn new(boundary_type: BoundaryType) -> Self {
        RawBoundary {
            boundary_type,
            offset: None,
        }
    }

    pub fn with_offset(boundary_type: BoundaryType, offset: RawExpr) -> Self {
        RawBoundary {
            boundary_type,
            offset: Some(Box::new(offset)),
        }
    }
}

impl fmt::Display for RawBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.offset {
            Some(offset) => write!(f, "{offset} {}", self.boundary_type),
            None => write!(f, "{}", self.boundary_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinOperator {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinOperator {
    pub const fn is_outer_join(&self) -> bool {
        matches!(self, Self::LeftOuter | Self::RightOuter | Self::FullOuter)
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER JOIN"),
            Self::LeftOuter => write!(f, "LEFT OUTER JOIN"),
            Self::RightOuter => write!(f, "RIGHT OUTER JOIN"),
            Self::FullOuter => write!(f, "FULL OUTER JOIN"),
            Self::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// An entry in a FROM clause before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTableRef {
    /// Dotted path, empty for subqueries.
    pub path: Vec<String>,
    pub alias: Option<String>,
    /// How this ref is joined to the refs to its left. None for the first ref
    /// and for comma joins.
    pub join_op: Option<JoinOperator>,
    pub on_clause: Option<RawExpr>,
    pub subquery: Option<Box<QueryStmt>>,
}

impl RawTableRef {
    pub fn table(path: &[&str]) -> Self {
        RawTableRef {
            path: path.iter().map(|s| s.to_string()).collect(),
            alias: None,
            join_op: None,
            on_clause: None,
            subquery: None,
        }
    }

    pub fn subquery(query: QueryStmt, alias: &str) -> Self {
        RawTableRef {
            path: Vec::new(),
            alias: Some(alias.to_string()),
            join_op: None,
            on_clause: None,
            subquery: Some(Box::new(query)),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_join(mut self, op: JoinOperator, on_clause: Option<RawExpr>) -> Self {
        self.join_op = Some(op);
        self.on_clause = on_clause;
        self
    }

    /// Render the ref without any join prefix.
    pub fn table_sql(&self) -> String {
        let mut sql = match &self.subquery {
            Some(query) => format!("({query})"),
            None => self.path.join("."),
        };
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr { expr: RawExpr, alias: Option<String> },
    /// `*`
    Wildcard,
    /// `alias.*`
    QualifiedWildcard(String),
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{expr} AS {alias}"),
            Self::Expr { expr, alias: None } => write!(f, "{expr}"),
            Self::Wildcard => write!(f, "*"),
            Self::QualifiedWildcard(alias) => write!(f, "{alias}.*"),
        }
    }
}

/// A view defined in a WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    pub name: String,
    pub query: QueryStmt,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    pub with: Vec<CommonTableExpr>,
    pub select_list: Vec<SelectItem>,
    pub from: Vec<RawTableRef>,
    pub limit: Option<RawExpr>,
    pub offset: Option<RawExpr>,
}

impl SelectStmt {
    pub fn new(select_list: Vec<SelectItem>, from: Vec<RawTableRef>) -> Self {
        SelectStmt {
            with: Vec::new(),
            select_list,
            from,
            limit: None,
            offset: None,
        }
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            write!(f, "WITH ")?;
            for (idx, cte) in self.with.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} AS ({})", cte.name, cte.query)?;
            }
            write!(f, " ")?;
        }

        write!(f, "SELECT ")?;
        for (idx, item) in self.select_list.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }

        for (idx, table_ref) in self.from.iter().enumerate() {
            if idx == 0 {
                write!(f, " FROM {}", table_ref.table_sql())?;
                continue;
            }
            match table_ref.join_op {
                Some(op) => write!(f, " {op} {}", table_ref.table_sql())?,
                None => write!(f, ", {}", table_ref.table_sql())?,
            }
            if let Some(on) = &table_ref.on_clause {
                write!(f, " ON {on}")?;
            }
        }

        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryStmt {
    Select(Box<SelectStmt>),
    Union {
        all: bool,
        left: Box<QueryStmt>,
        right: Box<QueryStmt>,
    },
}

impl QueryStmt {
    pub fn select(stmt: SelectStmt) -> Self {
        QueryStmt::Select(Box::new(stmt))
    }

    pub fn union(all: bool, left: QueryStmt, right: QueryStmt) -> Self {
        QueryStmt::Union {
            all,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl fmt::Display for QueryStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Union { all, left, right } => {
                let op = if *all { "UNION ALL" } else { "UNION" };
                write!(f, "{left} {op} {right}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_to_sql() {
        let stmt = SelectStmt::new(
            vec![SelectItem::Expr {
                expr: RawExpr::column(&["a"]),
                alias: Some("x".to_string()),
            }],
            vec![
                RawTableRef::table(&["t1"]),
                RawTableRef::table(&["t2"]).with_alias("b").with_join(
                    JoinOperator::LeftOuter,
                    Some(RawExpr::Comparison {
                        op: ComparisonOperator::Eq,
                        left: Box::new(RawExpr::column(&["t1", "a"])),
                        right: Box::new(RawExpr::column(&["b", "a"])),
                    }),
                ),
            ],
        );

        assert_eq!(
            "SELECT a AS x FROM t1 LEFT OUTER JOIN t2 b ON t1.a = b.a",
            QueryStmt::select(stmt).to_string()
        );
    }

    #[test]
    fn window_spec_to_sql() {
        let spec = RawWindowSpec {
            partition_by: vec![RawExpr::column(&["a"])],
            order_by: vec![RawOrderBy {
                expr: RawExpr::column(&["b"]),
                desc: true,
            }],
            window: Some(RawWindow {
                window_type: WindowType::Rows,
                left: RawBoundary::with_offset(BoundaryType::Preceding, RawExpr::lit(2)),
                right: Some(RawBoundary::new(BoundaryType::CurrentRow)),
            }),
        };
        assert_eq!(
            "PARTITION BY a ORDER BY b DESC ROWS BETWEEN 2 PRECEDING AND CURRENT ROW",
            spec.to_string()
        );
    }
}
