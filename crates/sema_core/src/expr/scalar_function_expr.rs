use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;

/// Builtin scalar functions known to the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    /// `if(cond, then, else)`
    If,
    Coalesce,
    NullIf,
    /// `ifnull(a, b)`, also spelled `isnull` and `nvl`.
    IfNull,
    Concat,
    Upper,
    Lower,
    Length,
    Abs,
}

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "if" => Self::If,
            "coalesce" => Self::Coalesce,
            "nullif" => Self::NullIf,
            "ifnull" | "isnull" | "nvl" => Self::IfNull,
            "concat" => Self::Concat,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "length" => Self::Length,
            "abs" => Self::Abs,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Coalesce => "coalesce",
            Self::NullIf => "nullif",
            Self::IfNull => "ifnull",
            Self::Concat => "concat",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Length => "length",
            Self::Abs => "abs",
        }
    }

    /// Check argument types and compute the return type.
    pub fn return_type(&self, inputs: &[DataType]) -> Result<DataType> {
        let arity_err = |expected: &str| {
            DbError::new(format!(
                "Function '{}' expects {expected} arguments, got {}",
                self.name(),
                inputs.len()
            ))
        };

        match self {
            Self::If => {
                let [cond, then, els] = inputs else {
                    return Err(arity_err("3"));
                };
                if !cond.is_boolean() && !cond.is_null() {
                    return Err(DbError::new(format!(
                        "First argument of 'if' must be BOOLEAN, got {cond}"
                    )));
                }
                common_type(self, &[then.clone(), els.clone()])
            }
            Self::Coalesce => {
                if inputs.is_empty() {
                    return Err(arity_err("at least 1"));
                }
                common_type(self, inputs)
            }
            Self::NullIf | Self::IfNull => {
                if inputs.len() != 2 {
                    return Err(arity_err("2"));
                }
                common_type(self, inputs)
            }
            Self::Concat => {
                if inputs.is_empty() {
                    return Err(arity_err("at least 1"));
                }
                Ok(DataType::Utf8)
            }
            Self::Upper | Self::Lower => match inputs {
                [_] => Ok(DataType::Utf8),
                _ => Err(arity_err("1")),
            },
            Self::Length => match inputs {
                [_] => Ok(DataType::Int32),
                _ => Err(arity_err("1")),
            },
            Self::Abs => match inputs {
                [t] if t.is_numeric() || t.is_null() => Ok(t.clone()),
                [t] => Err(DbError::new(format!(
                    "Function 'abs' requires a numeric argument, got {t}"
                ))),
                _ => Err(arity_err("1")),
            },
        }
    }
}

fn common_type(function: &ScalarFunction, inputs: &[DataType]) -> Result<DataType> {
    let mut datatype = DataType::Null;
    for input in inputs {
        datatype = datatype.common_numeric_type(input).ok_or_else(|| {
            DbError::new(format!(
                "No common type for arguments of '{}': {datatype} and {input}",
                function.name()
            ))
        })?;
    }
    Ok(datatype)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunctionExpr {
    pub function: ScalarFunction,
    pub inputs: Vec<Expression>,
    pub return_type: DataType,
}

impl ScalarFunctionExpr {
    pub fn try_new(function: ScalarFunction, inputs: Vec<Expression>) -> Result<Self> {
        let input_types = inputs
            .iter()
            .map(|input| input.datatype())
            .collect::<Result<Vec<_>>>()?;
        let return_type = function.return_type(&input_types)?;

        Ok(ScalarFunctionExpr {
            function,
            inputs,
            return_type,
        })
    }
}

impl fmt::Display for ScalarFunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        for (idx, input) in self.inputs.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{input}")?;
        }
        write!(f, ")")
    }
}
