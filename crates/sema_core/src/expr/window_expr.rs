use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::logical::analytic_window::AnalyticWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowFunction {
    RowNumber,
    Rank,
    DenseRank,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    FirstValue,
    LastValue,
    Lag,
    Lead,
}

impl WindowFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "row_number" => Self::RowNumber,
            "rank" => Self::Rank,
            "dense_rank" => Self::DenseRank,
            "count" => Self::Count,
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "first_value" => Self::FirstValue,
            "last_value" => Self::LastValue,
            "lag" => Self::Lag,
            "lead" => Self::Lead,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RowNumber => "row_number",
            Self::Rank => "rank",
            Self::DenseRank => "dense_rank",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::FirstValue => "first_value",
            Self::LastValue => "last_value",
            Self::Lag => "lag",
            Self::Lead => "lead",
        }
    }

    /// Ranking and offset functions compute their own frame and don't accept
    /// a window clause.
    pub fn allows_window_clause(&self) -> bool {
        !matches!(
            self,
            Self::RowNumber | Self::Rank | Self::DenseRank | Self::Lag | Self::Lead
        )
    }

    pub fn return_type(&self, inputs: &[DataType]) -> Result<DataType> {
        let arity_err = || {
            DbError::new(format!(
                "Invalid number of arguments for analytic function '{}': {}",
                self.name(),
                inputs.len()
            ))
        };

        match self {
            Self::RowNumber | Self::Rank | Self::DenseRank => {
                if !inputs.is_empty() {
                    return Err(arity_err());
                }
                Ok(DataType::Int64)
            }
            Self::Count => match inputs.len() {
                0 | 1 => Ok(DataType::Int64),
                _ => Err(arity_err()),
            },
            Self::Sum => match inputs {
                [t] if t.is_integer() => Ok(DataType::Int64),
                [t] if t.is_numeric() || t.is_null() => Ok(DataType::Float64),
                [t] => Err(DbError::new(format!(
                    "Analytic function 'sum' requires a numeric argument, got {t}"
                ))),
                _ => Err(arity_err()),
            },
            Self::Avg => match inputs {
                [t] if t.is_numeric() || t.is_null() => Ok(DataType::Float64),
                [t] => Err(DbError::new(format!(
                    "Analytic function 'avg' requires a numeric argument, got {t}"
                ))),
                _ => Err(arity_err()),
            },
            Self::Min | Self::Max | Self::FirstValue | Self::LastValue => match inputs {
                [t] => Ok(t.clone()),
                _ => Err(arity_err()),
            },
            Self::Lag | Self::Lead => match inputs {
                [t] | [t, _] | [t, _, _] => Ok(t.clone()),
                _ => Err(arity_err()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expression,
    pub desc: bool,
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc {
            write!(f, "{} DESC", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

/// An analytic function call with its OVER clause.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowExpr {
    pub function: WindowFunction,
    pub inputs: Vec<Expression>,
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<OrderByExpr>,
    /// Analyzed window, None for functions that don't take one.
    pub window: Option<Box<AnalyticWindow>>,
    pub return_type: DataType,
}

impl fmt::Display for WindowExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        for (idx, input) in self.inputs.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{input}")?;
        }
        write!(f, ") OVER (")?;

        let mut need_space = false;
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY ")?;
            for (idx, expr) in self.partition_by.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{expr}")?;
            }
            need_space = true;
        }
        if !self.order_by.is_empty() {
            if need_space {
                write!(f, " ")?;
            }
            write!(f, "ORDER BY ")?;
            for (idx, expr) in self.order_by.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{expr}")?;
            }
            need_space = true;
        }
        if let Some(window) = &self.window {
            if need_space {
                write!(f, " ")?;
            }
            write!(f, "{}", window.to_sql())?;
        }
        write!(f, ")")
    }
}
