//! Statement sinks handed to patch units.
//!
//! Units never touch a `rusqlite::Connection` directly. They push statements
//! into an [`Executor`], which either runs them ([`LiveExecutor`]) or records
//! them for a dry run ([`PretendExecutor`]).

use rusqlite::Connection;

/// Something a unit can issue statements against.
pub trait Executor {
    /// Run (or capture) one SQL statement.
    fn execute(&mut self, statement: &str) -> rusqlite::Result<()>;

    /// `true` when statements are only being recorded.
    fn is_pretend(&self) -> bool {
        false
    }
}

/// Executes statements on a live connection (or an open transaction, which
/// derefs to one).
#[derive(Debug)]
pub struct LiveExecutor<'c> {
    conn: &'c Connection,
    executed: usize,
}

impl<'c> LiveExecutor<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn, executed: 0 }
    }

    /// Number of statements run so far.
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl Executor for LiveExecutor<'_> {
    fn execute(&mut self, statement: &str) -> rusqlite::Result<()> {
        tracing::debug!(statement, "executing");
        self.conn.execute_batch(statement)?;
        self.executed += 1;
        Ok(())
    }
}

/// Records statements instead of running them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PretendExecutor {
    statements: Vec<String>,
}

impl PretendExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }
}

impl Executor for PretendExecutor {
    fn execute(&mut self, statement: &str) -> rusqlite::Result<()> {
        self.statements.push(statement.trim().to_string());
        Ok(())
    }

    fn is_pretend(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_executor_runs_statements() {
        let conn = Connection::open_in_memory().unwrap();
        let mut exec = LiveExecutor::new(&conn);
        exec.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)").unwrap();
        exec.execute("INSERT INTO users (id) VALUES (1)").unwrap();
        assert_eq!(exec.executed(), 2);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn live_executor_surfaces_sql_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let mut exec = LiveExecutor::new(&conn);
        assert!(exec.execute("INSERT INTO missing VALUES (1)").is_err());
        assert_eq!(exec.executed(), 0);
    }

    #[test]
    fn pretend_executor_records_without_running() {
        let mut exec = PretendExecutor::new();
        exec.execute("  CREATE TABLE users (id INTEGER)  ").unwrap();
        exec.execute("not even valid sql").unwrap();
        assert!(exec.is_pretend());
        assert_eq!(
            exec.into_statements(),
            vec!["CREATE TABLE users (id INTEGER)", "not even valid sql"]
        );
    }
}
