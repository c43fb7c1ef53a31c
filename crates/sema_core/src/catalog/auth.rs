use std::fmt::Debug;

use sema_error::Result;

use super::CatalogTable;

/// Checks whether a user may read from a table or view.
pub trait Authorizer: Debug + Sync + Send {
    fn check_table_access(&self, user: &str, table: &CatalogTable) -> Result<()>;
}

/// Authorizer that permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn check_table_access(&self, _user: &str, _table: &CatalogTable) -> Result<()> {
        Ok(())
    }
}
