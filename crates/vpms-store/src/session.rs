//! Session and transaction traits
//!
//! The lookup engine runs entirely inside a caller-supplied [`Session`]; it
//! never begins or commits work itself. [`Transactional`] is the seam used by
//! callers that need one.

use crate::error::StoreError;
use crate::statement::{Row, Statement};

/// Executes statements against storage
pub trait Session {
    /// Run a read statement, returning at most `max_rows` rows
    ///
    /// # Errors
    /// Backend failures or statements the session cannot execute.
    fn query(&mut self, statement: &Statement, max_rows: Option<usize>) -> Result<Vec<Row>, StoreError>;

    /// Run a mutating statement, returning the number of affected rows
    ///
    /// # Errors
    /// Backend failures, constraint violations, or unsupported statements.
    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError>;

    /// True if `statement` yields at least one row
    ///
    /// # Errors
    /// Propagates [`Session::query`] errors.
    fn exists(&mut self, statement: &Statement) -> Result<bool, StoreError> {
        Ok(!self.query(statement, Some(1))?.is_empty())
    }
}

impl<S: Session + ?Sized> Session for &mut S {
    fn query(&mut self, statement: &Statement, max_rows: Option<usize>) -> Result<Vec<Row>, StoreError> {
        (**self).query(statement, max_rows)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        (**self).execute(statement)
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn query(&mut self, statement: &Statement, max_rows: Option<usize>) -> Result<Vec<Row>, StoreError> {
        (**self).query(statement, max_rows)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        (**self).execute(statement)
    }
}

/// Session whose effects become visible only on commit
pub trait Transaction: Session {
    /// Publish all changes
    ///
    /// # Errors
    /// Backend failures.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all changes
    ///
    /// # Errors
    /// Backend failures.
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Source of transactions
pub trait Transactional: Send + Sync {
    /// Begin a transaction
    ///
    /// # Errors
    /// Backend failures.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError>;
}
