//! Validates the debug SQL surface: `ExecuteReadOnlyQuery` must reject
//! anything but a single `SELECT` — multiple statements, a comment hiding a
//! second statement, and non-SELECT verbs are all rejected after real
//! statement parsing (not string matching).

use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::StoreError;

pub fn validate_read_only_query(sql: &str) -> Result<(), StoreError> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| StoreError::ValidationRejected(e.to_string()))?;

    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [] => Err(StoreError::ValidationRejected("empty query".into())),
        [_] => Err(StoreError::ValidationRejected("only SELECT statements are allowed".into())),
        _ => Err(StoreError::ValidationRejected("only a single statement is allowed".into())),
    }
}

#[cfg(test)]
#[path = "sql_guard_tests.rs"]
mod tests;
