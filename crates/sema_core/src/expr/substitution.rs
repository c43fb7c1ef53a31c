use std::fmt;

use super::Expression;

/// Ordered list of (lhs, rhs) expression pairs.
///
/// Substituting an expression through the map replaces every subexpression
/// matching some lhs with the corresponding rhs. Column references match by
/// slot id only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprSubstitutionMap {
    lhs: Vec<Expression>,
    rhs: Vec<Expression>,
}

impl ExprSubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, lhs: Expression, rhs: Expression) {
        self.lhs.push(lhs);
        self.rhs.push(rhs);
    }

    /// Get the rhs for an expression.
    pub fn get(&self, expr: &Expression) -> Option<&Expression> {
        let idx = self.lhs.iter().position(|lhs| lhs_matches(lhs, expr))?;
        self.rhs.get(idx)
    }

    pub fn contains_lhs(&self, expr: &Expression) -> bool {
        self.get(expr).is_some()
    }

    pub fn lhs(&self) -> &[Expression] {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Expression] {
        &self.rhs
    }

    /// Mutable access to the rhs expressions. The lhs can't change.
    pub fn rhs_mut(&mut self) -> &mut [Expression] {
        &mut self.rhs
    }

    pub fn len(&self) -> usize {
        self.lhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lhs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Expression, &Expression)> {
        self.lhs.iter().zip(&self.rhs)
    }

    /// Append all pairs from `other`.
    pub fn extend(&mut self, other: &ExprSubstitutionMap) {
        for (lhs, rhs) in other.iter() {
            self.put(lhs.clone(), rhs.clone());
        }
    }

    pub fn clear(&mut self) {
        self.lhs.clear();
        self.rhs.clear();
    }
}

fn lhs_matches(lhs: &Expression, expr: &Expression) -> bool {
    match (lhs, expr) {
        (Expression::Column(a), Expression::Column(b)) => a.slot == b.slot,
        (a, b) => a == b,
    }
}

impl fmt::Display for ExprSubstitutionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "smap(")?;
        for (idx, (lhs, rhs)) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{lhs}:{rhs}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::descriptor::ids::SlotId;
    use crate::expr::{column, lit};

    #[test]
    fn column_lookup_ignores_label() {
        let mut smap = ExprSubstitutionMap::new();
        smap.put(column(SlotId(1), DataType::Int32, "v.x").into(), lit(5).into());

        let five: Expression = lit(5).into();
        let other_label: Expression = column(SlotId(1), DataType::Int32, "x").into();
        assert_eq!(Some(&five), smap.get(&other_label));

        let other_slot: Expression = column(SlotId(2), DataType::Int32, "v.x").into();
        assert!(smap.get(&other_slot).is_none());
    }

    #[test]
    fn display() {
        let mut smap = ExprSubstitutionMap::new();
        smap.put(column(SlotId(1), DataType::Int32, "v.x").into(), lit(5).into());
        assert_eq!("smap(v.x:5)", smap.to_string());
    }
}
