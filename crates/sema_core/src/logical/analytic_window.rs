use std::fmt;

use sema_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use crate::eval::ConstEvaluator;
use crate::expr::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowType {
    Rows,
    Range,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "ROWS"),
            Self::Range => write!(f, "RANGE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryType {
    UnboundedPreceding,
    UnboundedFollowing,
    CurrentRow,
    Preceding,
    Following,
}

impl BoundaryType {
    pub const fn is_absolute_pos(&self) -> bool {
        matches!(self, Self::UnboundedPreceding | Self::UnboundedFollowing)
    }

    pub const fn is_offset(&self) -> bool {
        matches!(self, Self::Preceding | Self::Following)
    }

    pub const fn is_preceding(&self) -> bool {
        matches!(self, Self::UnboundedPreceding | Self::Preceding)
    }

    pub const fn is_following(&self) -> bool {
        matches!(self, Self::UnboundedFollowing | Self::Following)
    }

    /// The boundary type to use when the sort order is reversed.
    pub const fn converse(&self) -> Self {
        match self {
            Self::UnboundedPreceding => Self::UnboundedFollowing,
            Self::UnboundedFollowing => Self::UnboundedPreceding,
            Self::Preceding => Self::Following,
            Self::Following => Self::Preceding,
            Self::CurrentRow => Self::CurrentRow,
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            Self::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
            Self::CurrentRow => write!(f, "CURRENT ROW"),
            Self::Preceding => write!(f, "PRECEDING"),
            Self::Following => write!(f, "FOLLOWING"),
        }
    }
}

/// One end of a window.
///
/// Offset boundaries carry their offset expression, all others have none.
#[derive(Debug, Clone)]
pub struct Boundary {
    boundary_type: BoundaryType,
    expr: Option<Expression>,
    /// Evaluated offset, set during analysis. Integral for ROWS windows.
    offset_value: Option<f64>,
}

impl Boundary {
    pub fn try_new(boundary_type: BoundaryType, expr: Option<Expression>) -> Result<Self> {
        if boundary_type.is_offset() != expr.is_some() {
            return Err(DbError::internal(format!(
                "Boundary {boundary_type} requires an offset expression iff it's an offset boundary"
            )));
        }
        Ok(Boundary {
            boundary_type,
            expr,
            offset_value: None,
        })
    }

    pub fn unbounded_preceding() -> Self {
        Self::absolute(BoundaryType::UnboundedPreceding)
    }

    pub fn unbounded_following() -> Self {
        Self::absolute(BoundaryType::UnboundedFollowing)
    }

    pub fn current_row() -> Self {
        Self::absolute(BoundaryType::CurrentRow)
    }

    pub fn preceding(expr: impl Into<Expression>) -> Self {
        Self::offset(BoundaryType::Preceding, expr.into())
    }

    pub fn following(expr: impl Into<Expression>) -> Self {
        Self::offset(BoundaryType::Following, expr.into())
    }

    fn absolute(boundary_type: BoundaryType) -> Self {
        Boundary {
            boundary_type,
            expr: None,
            offset_value: None,
        }
    }

    fn offset(boundary_type: BoundaryType, expr: Expression) -> Self {
        Boundary {
            boundary_type,
            expr: Some(expr),
            offset_value: None,
        }
    }

    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    pub fn expr(&self) -> Option<&Expression> {
        self.expr.as_ref()
    }

    pub fn offset_value(&self) -> Option<f64> {
        self.offset_value
    }

    pub fn to_sql(&self) -> String {
        match &self.expr {
            Some(expr) => format!("{expr} {}", self.boundary_type),
            None => self.boundary_type.to_string(),
        }
    }

    /// Same offset, mirrored direction.
    pub fn converse(&self) -> Self {
        Boundary {
            boundary_type: self.boundary_type.converse(),
            expr: self.expr.clone(),
            offset_value: self.offset_value,
        }
    }

    fn to_exec_boundary(&self, window_type: WindowType) -> Result<ExecBoundary> {
        let boundary_type = match self.boundary_type {
            BoundaryType::CurrentRow => ExecBoundaryType::CurrentRow,
            BoundaryType::Preceding => ExecBoundaryType::Preceding,
            BoundaryType::Following => ExecBoundaryType::Following,
            other => {
                return Err(DbError::internal(format!(
                    "Absolute boundary {other} has no execution form"
                )));
            }
        };

        let rows_offset = if self.boundary_type.is_offset() && window_type == WindowType::Rows {
            let value = self.offset_value.ok_or_else(|| {
                DbError::internal(format!("Boundary '{}' was not analyzed", self.to_sql()))
            })?;
            Some(value as i64)
        } else {
            None
        };

        Ok(ExecBoundary {
            boundary_type,
            rows_offset,
        })
    }
}

/// Boundaries are equal if their type and offset expression are, the
/// evaluated offset is not compared.
impl PartialEq for Boundary {
    fn eq(&self, other: &Self) -> bool {
        self.boundary_type == other.boundary_type && self.expr == other.expr
    }
}

/// The frame clause of an analytic function call, e.g.
/// `ROWS BETWEEN 2 PRECEDING AND CURRENT ROW`.
#[derive(Debug, Clone)]
pub struct AnalyticWindow {
    window_type: WindowType,
    left: Boundary,
    /// May be None until analyzed.
    right: Option<Boundary>,
    /// Rendering of the clause as written, cached when analysis fills in an
    /// implied upper bound.
    sql: Option<String>,
}

impl AnalyticWindow {
    pub fn new(window_type: WindowType, left: Boundary, right: Option<Boundary>) -> Self {
        AnalyticWindow {
            window_type,
            left,
            right,
            sql: None,
        }
    }

    /// Window used for an analytic function with an ORDER BY but no window
    /// clause.
    pub fn default_window() -> Self {
        AnalyticWindow::new(
            WindowType::Range,
            Boundary::unbounded_preceding(),
            Some(Boundary::current_row()),
        )
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn left(&self) -> &Boundary {
        &self.left
    }

    pub fn right(&self) -> Option<&Boundary> {
        self.right.as_ref()
    }

    /// Window to use when evaluating in the reverse sort order.
    ///
    /// A missing upper bound is treated as the implied CURRENT ROW.
    pub fn reverse(&self) -> Self {
        let new_right = self.left.converse();
        let new_left = match &self.right {
            Some(right) => right.converse(),
            None => Boundary::current_row(),
        };
        AnalyticWindow::new(self.window_type, new_left, Some(new_right))
    }

    pub fn to_sql(&self) -> String {
        if let Some(sql) = &self.sql {
            return sql.clone();
        }
        match &self.right {
            None => format!("{} {}", self.window_type, self.left.to_sql()),
            Some(right) => format!(
                "{} BETWEEN {} AND {}",
                self.window_type,
                self.left.to_sql(),
                right.to_sql()
            ),
        }
    }

    /// Validate the window, evaluate offsets, and fill in a missing upper
    /// bound.
    pub fn analyze(&mut self, evaluator: &dyn ConstEvaluator) -> Result<()> {
        let left_type = self.left.boundary_type;
        if left_type == BoundaryType::UnboundedFollowing {
            return Err(DbError::new(format!(
                "{left_type} is only allowed for upper bound of BETWEEN"
            )));
        }
        if let Some(right) = &self.right {
            if right.boundary_type == BoundaryType::UnboundedPreceding {
                return Err(DbError::new(format!(
                    "{} is only allowed for lower bound of BETWEEN",
                    right.boundary_type
                )));
            }
        }

        if self.window_type == WindowType::Range {
            let right_type = self.right.as_ref().map(|r| r.boundary_type);
            let right_is_offset = right_type.is_some_and(|t| t.is_offset());
            let both_current = left_type == BoundaryType::CurrentRow
                && matches!(right_type, None | Some(BoundaryType::CurrentRow));
            if left_type.is_offset() || right_is_offset || both_current {
                return Err(DbError::new(
                    "RANGE is only supported with both the lower and upper bounds UNBOUNDED or one UNBOUNDED and the other CURRENT ROW.",
                ));
            }
        }

        if self.right.is_none() && left_type == BoundaryType::Following {
            return Err(DbError::new(format!(
                "{left_type} requires a BETWEEN clause"
            )));
        }

        if left_type.is_offset() {
            let value = self.check_offset_expr(&self.left, evaluator)?;
            self.left.offset_value = Some(value);
        }

        let Some(right) = &self.right else {
            // Cache the clause as written before filling in the implied bound.
            self.sql = Some(self.to_sql());
            self.right = Some(Boundary::current_row());
            return Ok(());
        };
        let right_type = right.boundary_type;

        if right_type.is_offset() {
            let value = self.check_offset_expr(right, evaluator)?;
            if let Some(right) = &mut self.right {
                right.offset_value = Some(value);
            }
        }

        if left_type == BoundaryType::Following && !right_type.is_following() {
            return Err(DbError::new(format!(
                "A lower window bound of {} requires that the upper bound also be {}",
                BoundaryType::Following,
                BoundaryType::Following
            )));
        }
        if right_type == BoundaryType::Preceding && !left_type.is_preceding() {
            return Err(DbError::new(format!(
                "An upper window bound of {} requires that the lower bound also be {}",
                BoundaryType::Preceding,
                BoundaryType::Preceding
            )));
        }

        // Offsets of the same kind must be in ascending order.
        if left_type.is_offset() && left_type == right_type {
            let lower = self.left.offset_value;
            let upper = self.right.as_ref().and_then(|r| r.offset_value);
            if let (Some(lower), Some(upper)) = (lower, upper) {
                if lower > upper {
                    return Err(DbError::new(format!(
                        "Offset boundaries are in the wrong order: {}",
                        self.to_sql()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check the offset expression of a PRECEDING/FOLLOWING boundary,
    /// returning its value.
    fn check_offset_expr(&self, boundary: &Boundary, evaluator: &dyn ConstEvaluator) -> Result<f64> {
        let expr = boundary.expr.as_ref().ok_or_else(|| {
            DbError::internal(format!(
                "Offset boundary '{}' is missing its expression",
                boundary.to_sql()
            ))
        })?;
        let datatype = expr.datatype()?;

        let mut value = None;
        if expr.is_constant() && datatype.is_numeric() {
            let v = evaluator.eval_constant_numeric(expr).map_err(|e| {
                DbError::new(format!(
                    "Couldn't evaluate PRECEDING/FOLLOWING expression: {}",
                    e.get_msg()
                ))
                .with_source(Box::new(e))
            })?;
            value = Some(v);
        }
        let is_positive = value.is_none_or(|v| v > 0.0);

        match self.window_type {
            WindowType::Rows => match value {
                Some(v) if is_positive && datatype.is_integer() => Ok(v.trunc()),
                _ => Err(DbError::new(format!(
                    "For ROWS window, the value of a PRECEDING/FOLLOWING offset must be a constant positive integer: {}",
                    boundary.to_sql()
                ))),
            },
            WindowType::Range => match value {
                Some(v) if is_positive => Ok(v),
                _ => Err(DbError::new(format!(
                    "For RANGE window, the value of a PRECEDING/FOLLOWING offset must be a constant positive number: {}",
                    boundary.to_sql()
                ))),
            },
        }
    }

    /// Execution form of an analyzed window. Unbounded ends are omitted.
    pub fn to_exec_frame(&self) -> Result<ExecWindowFrame> {
        let right = self.right.as_ref().ok_or_else(|| {
            DbError::internal(format!("Window '{}' was not analyzed", self.to_sql()))
        })?;

        let start = match self.left.boundary_type {
            BoundaryType::UnboundedPreceding => None,
            _ => Some(self.left.to_exec_boundary(self.window_type)?),
        };
        let end = match right.boundary_type {
            BoundaryType::UnboundedFollowing => None,
            _ => Some(right.to_exec_boundary(self.window_type)?),
        };

        Ok(ExecWindowFrame {
            window_type: self.window_type,
            start,
            end,
        })
    }
}

/// Windows are equal if their types and boundaries are. The cached rendering
/// is not compared.
impl PartialEq for AnalyticWindow {
    fn eq(&self, other: &Self) -> bool {
        self.window_type == other.window_type
            && self.left == other.left
            && self.right == other.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecBoundaryType {
    CurrentRow,
    Preceding,
    Following,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecBoundary {
    pub boundary_type: ExecBoundaryType,
    /// Row offset, only set for offset boundaries of ROWS windows.
    pub rows_offset: Option<i64>,
}

/// Window frame handed to execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecWindowFrame {
    pub window_type: WindowType,
    /// None if unbounded preceding.
    pub start: Option<ExecBoundary>,
    /// None if unbounded following.
    pub end: Option<ExecBoundary>,
}
