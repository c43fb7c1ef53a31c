use std::fmt;

use crate::descriptor::ids::TupleId;

/// True iff all of the given tuples are null in the current row.
///
/// Used to make the output of a view on the nullable side of an outer join
/// NULL when the join produced no match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleIsNullExpr {
    pub tuple_ids: Vec<TupleId>,
}

impl fmt::Display for TupleIsNullExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleIsNull(")?;
        for (idx, id) in self.tuple_ids.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, ")")
    }
}
