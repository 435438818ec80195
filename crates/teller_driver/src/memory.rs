//! In-memory relational engine for testing and ephemeral use.

use crate::connection::{Connection, ConnectionId, Driver, IsolationLevel};
use crate::error::{codes, DriverError, DriverResult};
use crate::sql::{self, Statement};
use crate::value::{Row, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Width of the `member_id` column, `VARCHAR(255)`-style.
const MEMBER_ID_WIDTH: usize = 255;

/// An in-memory driver over a single `member` table.
///
/// This driver stores all data in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral setups that don't need persistence
///
/// It speaks the same contract a real backend would: statements are
/// parameterized text, failures carry H2-flavored vendor codes, and each
/// connection stages its writes while autocommit is off.
///
/// # Thread Safety
///
/// The driver and its table state are thread-safe; every connection it
/// opens shares the one table.
///
/// # Example
///
/// ```rust
/// use teller_driver::{Connection, Driver, MemoryDriver, Value};
///
/// let driver = MemoryDriver::new();
/// let mut conn = driver.connect().unwrap();
/// conn.execute(
///     "insert into member(member_id, money) values(?, ?)",
///     &[Value::from("memberA"), Value::from(500_i64)],
/// )
/// .unwrap();
/// assert_eq!(driver.snapshot(), vec![("memberA".to_owned(), 500)]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDriver {
    state: Arc<TableState>,
    next_connection_id: AtomicU64,
}

#[derive(Debug, Default)]
struct TableState {
    /// member_id -> money. BTreeMap keeps snapshots deterministic.
    rows: RwLock<BTreeMap<String, i64>>,
    closed: AtomicBool,
}

impl MemoryDriver {
    /// Creates an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver whose table is pre-populated.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = (String, i64)>) -> Self {
        let driver = Self::new();
        driver.state.rows.write().extend(rows);
        driver
    }

    /// Returns all committed rows, ordered by member id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        self.state
            .rows
            .read()
            .iter()
            .map(|(id, money)| (id.clone(), *money))
            .collect()
    }

    /// Number of committed rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.state.rows.read().len()
    }

    /// Marks the engine closed; every subsequent operation on any of its
    /// connections fails with the database-is-closed vendor code.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

impl Driver for MemoryDriver {
    fn connect(&self) -> DriverResult<Box<dyn Connection>> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(closed_error());
        }
        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::SeqCst));
        Ok(Box::new(MemoryConnection {
            id,
            state: Arc::clone(&self.state),
            auto_commit: true,
            isolation: None,
            staged: HashMap::new(),
        }))
    }
}

/// Lets a shared driver back a pool while the caller keeps a handle for
/// inspection (`snapshot`, `close`).
impl Driver for Arc<MemoryDriver> {
    fn connect(&self) -> DriverResult<Box<dyn Connection>> {
        MemoryDriver::connect(self)
    }
}

/// One connection into a [`MemoryDriver`].
///
/// While autocommit is off, writes stage in a per-connection overlay
/// (`Some(money)` = insert/update, `None` = delete); reads merge the
/// overlay over the committed table so a transaction sees its own writes.
#[derive(Debug)]
struct MemoryConnection {
    id: ConnectionId,
    state: Arc<TableState>,
    auto_commit: bool,
    isolation: Option<IsolationLevel>,
    staged: HashMap<String, Option<i64>>,
}

fn closed_error() -> DriverError {
    DriverError::new(codes::DATABASE_IS_CLOSED, "database is closed")
}

fn duplicate_key(member_id: &str) -> DriverError {
    DriverError::new(
        codes::DUPLICATE_KEY_1,
        format!("unique index or primary key violation: member_id = {member_id}"),
    )
}

impl MemoryConnection {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(closed_error());
        }
        Ok(())
    }

    fn check_table(&self, table: &str) -> DriverResult<()> {
        if table == "member" {
            Ok(())
        } else {
            Err(DriverError::new(
                codes::TABLE_OR_VIEW_NOT_FOUND_1,
                format!("table not found: {table}"),
            ))
        }
    }

    fn check_key_column(&self, column: &str) -> DriverResult<()> {
        if column == "member_id" {
            Ok(())
        } else {
            Err(DriverError::new(
                codes::COLUMN_NOT_FOUND_1,
                format!("column not found: {column}"),
            ))
        }
    }

    fn param_count(params: &[Value], expected: usize) -> DriverResult<()> {
        if params.len() == expected {
            Ok(())
        } else {
            Err(DriverError::new(
                codes::PARAMETER_NOT_SET_1,
                format!("expected {expected} parameters, {} bound", params.len()),
            ))
        }
    }

    fn text_param(params: &[Value], index: usize) -> DriverResult<&str> {
        params[index].as_text().ok_or_else(|| {
            DriverError::new(
                codes::DATA_CONVERSION_ERROR_1,
                format!(
                    "parameter {} cannot convert {} to text",
                    index + 1,
                    params[index].type_name()
                ),
            )
        })
    }

    fn int_param(params: &[Value], index: usize) -> DriverResult<i64> {
        params[index].as_int().ok_or_else(|| {
            DriverError::new(
                codes::DATA_CONVERSION_ERROR_1,
                format!(
                    "parameter {} cannot convert {} to integer",
                    index + 1,
                    params[index].type_name()
                ),
            )
        })
    }

    /// Looks a key up through the staged overlay, then the committed table.
    fn lookup(&self, member_id: &str) -> Option<i64> {
        if let Some(staged) = self.staged.get(member_id) {
            return *staged;
        }
        self.state.rows.read().get(member_id).copied()
    }

    fn insert(&mut self, member_id: &str, money: i64) -> DriverResult<u64> {
        if member_id.len() > MEMBER_ID_WIDTH {
            return Err(DriverError::new(
                codes::VALUE_TOO_LONG_2,
                format!("value too long for column member_id ({})", member_id.len()),
            ));
        }
        if self.auto_commit {
            let mut rows = self.state.rows.write();
            if rows.contains_key(member_id) {
                return Err(duplicate_key(member_id));
            }
            rows.insert(member_id.to_owned(), money);
        } else {
            if self.lookup(member_id).is_some() {
                return Err(duplicate_key(member_id));
            }
            self.staged.insert(member_id.to_owned(), Some(money));
        }
        Ok(1)
    }

    fn update(&mut self, member_id: &str, money: i64) -> DriverResult<u64> {
        if self.auto_commit {
            let mut rows = self.state.rows.write();
            match rows.get_mut(member_id) {
                Some(slot) => {
                    *slot = money;
                    Ok(1)
                }
                None => Ok(0),
            }
        } else if self.lookup(member_id).is_some() {
            self.staged.insert(member_id.to_owned(), Some(money));
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn delete(&mut self, member_id: &str) -> DriverResult<u64> {
        if self.auto_commit {
            let removed = self.state.rows.write().remove(member_id).is_some();
            Ok(u64::from(removed))
        } else if self.lookup(member_id).is_some() {
            self.staged.insert(member_id.to_owned(), None);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn apply_staged(&mut self) {
        let mut rows = self.state.rows.write();
        for (member_id, staged) in self.staged.drain() {
            match staged {
                Some(money) => {
                    rows.insert(member_id, money);
                }
                None => {
                    rows.remove(&member_id);
                }
            }
        }
    }
}

impl Connection for MemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn execute(&mut self, statement: &str, params: &[Value]) -> DriverResult<u64> {
        self.ensure_open()?;
        match sql::parse(statement)? {
            Statement::Insert { table, columns } => {
                self.check_table(&table)?;
                if columns != ["member_id", "money"] {
                    return Err(DriverError::new(
                        codes::COLUMN_NOT_FOUND_1,
                        format!("insert columns must be (member_id, money), got {columns:?}"),
                    ));
                }
                Self::param_count(params, 2)?;
                let member_id = Self::text_param(params, 0)?.to_owned();
                let money = Self::int_param(params, 1)?;
                self.insert(&member_id, money)
            }
            Statement::Update {
                table,
                set_column,
                key_column,
            } => {
                self.check_table(&table)?;
                self.check_key_column(&key_column)?;
                if set_column != "money" {
                    return Err(DriverError::new(
                        codes::COLUMN_NOT_FOUND_1,
                        format!("column not found: {set_column}"),
                    ));
                }
                Self::param_count(params, 2)?;
                let money = Self::int_param(params, 0)?;
                let member_id = Self::text_param(params, 1)?.to_owned();
                self.update(&member_id, money)
            }
            Statement::Delete { table, key_column } => {
                self.check_table(&table)?;
                self.check_key_column(&key_column)?;
                Self::param_count(params, 1)?;
                let member_id = Self::text_param(params, 0)?.to_owned();
                self.delete(&member_id)
            }
            Statement::Select { .. } => Err(DriverError::new(
                codes::METHOD_NOT_ALLOWED_FOR_QUERY,
                "query statement issued through the update entry point",
            )),
        }
    }

    fn query(&mut self, statement: &str, params: &[Value]) -> DriverResult<Vec<Row>> {
        self.ensure_open()?;
        match sql::parse(statement)? {
            Statement::Select { table, key_column } => {
                self.check_table(&table)?;
                self.check_key_column(&key_column)?;
                Self::param_count(params, 1)?;
                let member_id = Self::text_param(params, 0)?;
                Ok(self
                    .lookup(member_id)
                    .map(|money| {
                        Row::new(vec![
                            ("member_id".to_owned(), Value::from(member_id)),
                            ("money".to_owned(), Value::from(money)),
                        ])
                    })
                    .into_iter()
                    .collect())
            }
            _ => Err(DriverError::new(
                codes::METHOD_NOT_ALLOWED_FOR_QUERY,
                "update statement issued through the query entry point",
            )),
        }
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> DriverResult<()> {
        self.ensure_open()?;
        // Re-enabling autocommit mid-transaction commits the staged writes,
        // matching the usual driver contract.
        if auto_commit && !self.auto_commit && !self.staged.is_empty() {
            self.apply_staged();
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn set_isolation(&mut self, level: IsolationLevel) -> DriverResult<()> {
        self.ensure_open()?;
        // Accepted and recorded; the engine runs every transaction the same way.
        self.isolation = Some(level);
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.apply_staged();
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.staged.clear();
        Ok(())
    }
}
