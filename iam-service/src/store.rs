//! Persistence collaborator
//!
//! The façade never talks to a storage engine directly. It goes through a
//! [`Store`], which hands out one [`Repository`] per row type and executes
//! atomic batches. Filters are the equality maps the resolver derives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iam_org::{Account, LoginAttempt, Organization, Project, RoleAssignment};
use iam_rbac::QueryFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 500;

/// Storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No row matched
    #[error("{table}: row not found")]
    NotFound {
        /// Table searched
        table: &'static str,
    },

    /// Primary or unique key already taken
    #[error("{table}: {key} already exists")]
    Conflict {
        /// Table written
        table: &'static str,
        /// Offending key column
        key: String,
    },

    /// Backend failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether the row simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A row the store can hold.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table name, used in errors and logs.
    const TABLE: &'static str;

    /// Primary key.
    fn id(&self) -> &str;

    /// Column value as text, for equality filters.
    fn field(&self, column: &str) -> Option<String>;

    /// Creation time; listings order and paginate on it.
    fn created_at(&self) -> DateTime<Utc>;

    /// Unique columns besides the primary key.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Whether the row satisfies every predicate of `filter`.
    fn matches(&self, filter: &QueryFilter) -> bool {
        filter.matches(|column| self.field(column))
    }
}

impl Record for Account {
    const TABLE: &'static str = "accounts";

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "email" => Some(self.email.clone()),
            "verified" => Some(self.verified.to_string()),
            "disabled" => Some(self.disabled.to_string()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.clone())]
    }
}

impl Record for RoleAssignment {
    const TABLE: &'static str = "roles";

    fn id(&self) -> &str {
        &self.account_id
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" | "account_id" => Some(self.account_id.clone()),
            "org_id" => self.org_id.clone(),
            "project_id" => self.project_id.clone(),
            "level" => Some(self.level.as_str().to_string()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Organization {
    const TABLE: &'static str = "orgs";

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "owner_id" => Some(self.owner_id.clone()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

impl Record for Project {
    const TABLE: &'static str = "projects";

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "org_id" => Some(self.org_id.clone()),
            "owner_id" => Some(self.owner_id.clone()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

impl Record for LoginAttempt {
    const TABLE: &'static str = "login_attempts";

    fn id(&self) -> &str {
        &self.ip_address
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" | "ip_address" => Some(self.ip_address.clone()),
            "email" => Some(self.email.clone()),
            _ => None,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Listing direction on creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

/// Position after the last row of a page.
///
/// Rows are ordered by creation time, ties broken by id, so the cursor
/// carries both. Rows created in the same microsecond are never skipped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Creation timestamp in microseconds
    pub created_at: i64,
    /// Row id
    pub id: String,
}

/// Forward-only page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum rows to return
    pub limit: usize,
    /// Resume after this row position
    pub cursor: Option<Cursor>,
    /// Direction
    pub order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            cursor: None,
            order: SortOrder::Asc,
        }
    }
}

impl PageRequest {
    /// First page of `limit` rows, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn first(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            ..Default::default()
        }
    }

    /// Same request, resumed after `cursor`.
    pub fn after(self, cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
            ..self
        }
    }
}

/// One page of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows in order
    pub items: Vec<T>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Empty last page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Map the rows, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Cursor value of a row.
pub fn cursor_of<T: Record>(row: &T) -> Cursor {
    Cursor {
        created_at: row.created_at().timestamp_micros(),
        id: row.id().to_string(),
    }
}

/// Read-modify-write step applied under the store's row lock.
pub type Modify<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Access to one table.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// The first row matching `filter`.
    async fn get(&self, filter: &QueryFilter) -> StoreResult<T>;

    /// Rows matching `filter`, one page at a time.
    async fn list(&self, filter: &QueryFilter, page: &PageRequest) -> StoreResult<Page<T>>;

    /// Insert a new row; `Conflict` on a taken key.
    async fn insert(&self, row: T) -> StoreResult<()>;

    /// Replace an existing row; `NotFound` when absent.
    async fn update(&self, row: T) -> StoreResult<()>;

    /// Insert or replace.
    async fn upsert(&self, row: T) -> StoreResult<()>;

    /// Atomically load the row `id` (or `init` when absent), apply `modify`
    /// and write it back. Returns the stored row.
    async fn upsert_with(&self, id: &str, init: T, modify: Modify<T>) -> StoreResult<T>;

    /// Delete by primary key; `NotFound` when absent.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Row by primary key.
    async fn get_by_id(&self, id: &str) -> StoreResult<T> {
        self.get(&QueryFilter::single("id", id)).await
    }

    /// Like [`get`](Self::get), mapping `NotFound` to `None`.
    async fn find(&self, filter: &QueryFilter) -> StoreResult<Option<T>> {
        match self.get(filter).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Table a batch mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Accounts,
    Roles,
    Orgs,
    Projects,
    LoginAttempts,
}

/// A row of any table.
#[derive(Debug, Clone)]
pub enum Row {
    Account(Account),
    Role(RoleAssignment),
    Org(Organization),
    Project(Project),
    LoginAttempt(LoginAttempt),
}

/// One statement of an atomic batch.
#[derive(Debug, Clone)]
pub enum Mutation {
    Insert(Row),
    Update(Row),
    Upsert(Row),
    Delete {
        table: Table,
        id: String,
        /// Succeed when the row is already gone
        if_exists: bool,
    },
}

impl Mutation {
    /// Delete a row that must exist.
    pub fn delete(table: Table, id: impl Into<String>) -> Self {
        Mutation::Delete {
            table,
            id: id.into(),
            if_exists: false,
        }
    }

    /// Delete a row if present.
    pub fn delete_if_exists(table: Table, id: impl Into<String>) -> Self {
        Mutation::Delete {
            table,
            id: id.into(),
            if_exists: true,
        }
    }
}

/// The persistence collaborator.
#[async_trait]
pub trait Store: Send + Sync {
    fn accounts(&self) -> &dyn Repository<Account>;

    fn roles(&self) -> &dyn Repository<RoleAssignment>;

    fn orgs(&self) -> &dyn Repository<Organization>;

    fn projects(&self) -> &dyn Repository<Project>;

    fn login_attempts(&self) -> &dyn Repository<LoginAttempt>;

    /// Apply every mutation or none of them.
    async fn bulk_exec(&self, mutations: Vec<Mutation>) -> StoreResult<()>;
}
