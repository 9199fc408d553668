//! In-process store
//!
//! All tables live behind one lock so a batch can be applied to a scratch
//! copy and swapped in whole. Suitable for tests and single-node use.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use iam_org::{Account, LoginAttempt, Organization, Project, RoleAssignment};
use iam_rbac::QueryFilter;
use tokio::sync::RwLock;

use crate::store::{
    cursor_of, Modify, Mutation, Page, PageRequest, Record, Repository, Row, SortOrder, Store,
    StoreError, StoreResult, Table,
};

type Rows<T> = BTreeMap<String, T>;

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: Rows<Account>,
    roles: Rows<RoleAssignment>,
    orgs: Rows<Organization>,
    projects: Rows<Project>,
    login_attempts: Rows<LoginAttempt>,
}

fn check_unique<T: Record>(rows: &Rows<T>, row: &T) -> StoreResult<()> {
    for (column, value) in row.unique_keys() {
        let taken = rows
            .values()
            .any(|other| other.id() != row.id() && other.field(column).as_deref() == Some(value.as_str()));
        if taken {
            return Err(StoreError::Conflict {
                table: T::TABLE,
                key: column.to_string(),
            });
        }
    }
    Ok(())
}

fn insert_row<T: Record>(rows: &mut Rows<T>, row: T) -> StoreResult<()> {
    if rows.contains_key(row.id()) {
        return Err(StoreError::Conflict {
            table: T::TABLE,
            key: "id".to_string(),
        });
    }
    check_unique(rows, &row)?;
    rows.insert(row.id().to_string(), row);
    Ok(())
}

fn update_row<T: Record>(rows: &mut Rows<T>, row: T) -> StoreResult<()> {
    if !rows.contains_key(row.id()) {
        return Err(StoreError::NotFound { table: T::TABLE });
    }
    check_unique(rows, &row)?;
    rows.insert(row.id().to_string(), row);
    Ok(())
}

fn upsert_row<T: Record>(rows: &mut Rows<T>, row: T) -> StoreResult<()> {
    check_unique(rows, &row)?;
    rows.insert(row.id().to_string(), row);
    Ok(())
}

fn delete_row<T: Record>(rows: &mut Rows<T>, id: &str, if_exists: bool) -> StoreResult<()> {
    match rows.remove(id) {
        Some(_) => Ok(()),
        None if if_exists => Ok(()),
        None => Err(StoreError::NotFound { table: T::TABLE }),
    }
}

fn list_rows<T: Record>(rows: &Rows<T>, filter: &QueryFilter, page: &PageRequest) -> Page<T> {
    let mut matched: Vec<&T> = rows
        .values()
        .filter(|row| row.matches(filter))
        .filter(|row| match (&page.cursor, page.order) {
            (None, _) => true,
            (Some(cursor), SortOrder::Asc) => cursor_of(*row) > *cursor,
            (Some(cursor), SortOrder::Desc) => cursor_of(*row) < *cursor,
        })
        .collect();

    matched.sort_by_cached_key(|row| cursor_of(*row));
    if page.order == SortOrder::Desc {
        matched.reverse();
    }

    let limit = page.limit.max(1);
    let has_more = matched.len() > limit;
    let items: Vec<T> = matched.into_iter().take(limit).cloned().collect();
    let next_cursor = if has_more { items.last().map(cursor_of) } else { None };

    Page { items, next_cursor }
}

type Select<T> = fn(&Tables) -> &Rows<T>;
type SelectMut<T> = fn(&mut Tables) -> &mut Rows<T>;

/// One table of a [`MemoryStore`].
pub struct MemoryTable<T> {
    tables: Arc<RwLock<Tables>>,
    select: Select<T>,
    select_mut: SelectMut<T>,
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryTable<T> {
    async fn get(&self, filter: &QueryFilter) -> StoreResult<T> {
        let tables = self.tables.read().await;
        (self.select)(&tables)
            .values()
            .filter(|row| row.matches(filter))
            .min_by_key(|row| cursor_of(*row))
            .cloned()
            .ok_or(StoreError::NotFound { table: T::TABLE })
    }

    async fn list(&self, filter: &QueryFilter, page: &PageRequest) -> StoreResult<Page<T>> {
        let tables = self.tables.read().await;
        Ok(list_rows((self.select)(&tables), filter, page))
    }

    async fn insert(&self, row: T) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        insert_row((self.select_mut)(&mut tables), row)
    }

    async fn update(&self, row: T) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        update_row((self.select_mut)(&mut tables), row)
    }

    async fn upsert(&self, row: T) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        upsert_row((self.select_mut)(&mut tables), row)
    }

    async fn upsert_with(&self, id: &str, init: T, modify: Modify<T>) -> StoreResult<T> {
        let mut tables = self.tables.write().await;
        let rows = (self.select_mut)(&mut tables);
        let mut row = rows.get(id).cloned().unwrap_or(init);
        modify(&mut row);
        upsert_row(rows, row.clone())?;
        Ok(row)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        delete_row((self.select_mut)(&mut tables), id, false)
    }
}

/// In-memory [`Store`].
///
/// # Example
///
/// ```rust
/// use iam_org::Organization;
/// use iam_service::{MemoryStore, Store};
///
/// # async fn example() {
/// let store = MemoryStore::new();
/// store.orgs().insert(Organization::new("Acme", "owner")).await.unwrap();
/// # }
/// ```
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    accounts: MemoryTable<Account>,
    roles: MemoryTable<RoleAssignment>,
    orgs: MemoryTable<Organization>,
    projects: MemoryTable<Project>,
    login_attempts: MemoryTable<LoginAttempt>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        let tables = Arc::new(RwLock::new(Tables::default()));

        Self {
            accounts: MemoryTable {
                tables: tables.clone(),
                select: |t| &t.accounts,
                select_mut: |t| &mut t.accounts,
            },
            roles: MemoryTable {
                tables: tables.clone(),
                select: |t| &t.roles,
                select_mut: |t| &mut t.roles,
            },
            orgs: MemoryTable {
                tables: tables.clone(),
                select: |t| &t.orgs,
                select_mut: |t| &mut t.orgs,
            },
            projects: MemoryTable {
                tables: tables.clone(),
                select: |t| &t.projects,
                select_mut: |t| &mut t.projects,
            },
            login_attempts: MemoryTable {
                tables: tables.clone(),
                select: |t| &t.login_attempts,
                select_mut: |t| &mut t.login_attempts,
            },
            tables,
        }
    }
}

fn apply(tables: &mut Tables, mutation: Mutation) -> StoreResult<()> {
    match mutation {
        Mutation::Insert(row) => match row {
            Row::Account(r) => insert_row(&mut tables.accounts, r),
            Row::Role(r) => insert_row(&mut tables.roles, r),
            Row::Org(r) => insert_row(&mut tables.orgs, r),
            Row::Project(r) => insert_row(&mut tables.projects, r),
            Row::LoginAttempt(r) => insert_row(&mut tables.login_attempts, r),
        },
        Mutation::Update(row) => match row {
            Row::Account(r) => update_row(&mut tables.accounts, r),
            Row::Role(r) => update_row(&mut tables.roles, r),
            Row::Org(r) => update_row(&mut tables.orgs, r),
            Row::Project(r) => update_row(&mut tables.projects, r),
            Row::LoginAttempt(r) => update_row(&mut tables.login_attempts, r),
        },
        Mutation::Upsert(row) => match row {
            Row::Account(r) => upsert_row(&mut tables.accounts, r),
            Row::Role(r) => upsert_row(&mut tables.roles, r),
            Row::Org(r) => upsert_row(&mut tables.orgs, r),
            Row::Project(r) => upsert_row(&mut tables.projects, r),
            Row::LoginAttempt(r) => upsert_row(&mut tables.login_attempts, r),
        },
        Mutation::Delete { table, id, if_exists } => match table {
            Table::Accounts => delete_row(&mut tables.accounts, &id, if_exists),
            Table::Roles => delete_row(&mut tables.roles, &id, if_exists),
            Table::Orgs => delete_row(&mut tables.orgs, &id, if_exists),
            Table::Projects => delete_row(&mut tables.projects, &id, if_exists),
            Table::LoginAttempts => delete_row(&mut tables.login_attempts, &id, if_exists),
        },
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn accounts(&self) -> &dyn Repository<Account> {
        &self.accounts
    }

    fn roles(&self) -> &dyn Repository<RoleAssignment> {
        &self.roles
    }

    fn orgs(&self) -> &dyn Repository<Organization> {
        &self.orgs
    }

    fn projects(&self) -> &dyn Repository<Project> {
        &self.projects
    }

    fn login_attempts(&self) -> &dyn Repository<LoginAttempt> {
        &self.login_attempts
    }

    async fn bulk_exec(&self, mutations: Vec<Mutation>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let mut scratch = tables.clone();
        for mutation in mutations {
            apply(&mut scratch, mutation)?;
        }
        *tables = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn org_at(name: &str, offset_secs: i64) -> Organization {
        let mut org = Organization::new(name, "owner");
        org.created_at = Utc::now() + Duration::seconds(offset_secs);
        org
    }

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let store = MemoryStore::new();
        let org = Organization::new("Acme", "owner");
        store.orgs().insert(org.clone()).await.unwrap();

        let mut loaded = store.orgs().get_by_id(&org.id).await.unwrap();
        assert_eq!(loaded, org);

        loaded.name = "Acme Corp".to_string();
        store.orgs().update(loaded).await.unwrap();
        let found = store.orgs().get(&QueryFilter::single("name", "Acme Corp")).await.unwrap();
        assert_eq!(found.id, org.id);

        store.orgs().delete(&org.id).await.unwrap();
        assert_eq!(
            store.orgs().get_by_id(&org.id).await,
            Err(StoreError::NotFound { table: "orgs" })
        );
        assert!(store.orgs().delete(&org.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unique_keys() {
        let store = MemoryStore::new();
        store.accounts().insert(Account::new("a@x.com", "h")).await.unwrap();

        let result = store.accounts().insert(Account::new("a@x.com", "h")).await;
        assert!(matches!(result, Err(StoreError::Conflict { key, .. }) if key == "email"));
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = MemoryStore::new();
        let result = store.orgs().update(Organization::new("Ghost", "owner")).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_pages_forward() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.orgs().insert(org_at(&format!("org-{i}"), i)).await.unwrap();
        }

        let first = store
            .orgs()
            .list(&QueryFilter::new(), &PageRequest::first(2))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].name, "org-0");
        let cursor = first.next_cursor.unwrap();

        let second = store
            .orgs()
            .list(&QueryFilter::new(), &PageRequest::first(2).after(cursor))
            .await
            .unwrap();
        assert_eq!(second.items[0].name, "org-2");

        let last = store
            .orgs()
            .list(&QueryFilter::new(), &PageRequest::first(2).after(second.next_cursor.unwrap()))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_cursor, None);
    }

    #[tokio::test]
    async fn test_pages_through_rows_sharing_a_timestamp() {
        let store = MemoryStore::new();
        let created_at = Utc::now();
        for i in 0..7 {
            let mut org = Organization::new(format!("org-{i}"), "owner");
            org.created_at = created_at;
            store.orgs().insert(org).await.unwrap();
        }

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let mut seen = Vec::new();
            let mut page = PageRequest {
                order,
                ..PageRequest::first(3)
            };
            loop {
                let batch = store.orgs().list(&QueryFilter::new(), &page).await.unwrap();
                seen.extend(batch.items.into_iter().map(|o| o.id));
                match batch.next_cursor {
                    Some(cursor) => page = page.after(cursor),
                    None => break,
                }
            }

            let mut unique = seen.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(seen.len(), 7, "{order:?}");
            assert_eq!(unique.len(), 7, "{order:?}");
        }
    }

    #[tokio::test]
    async fn test_list_descending() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.orgs().insert(org_at(&format!("org-{i}"), i)).await.unwrap();
        }

        let page = PageRequest {
            order: SortOrder::Desc,
            ..PageRequest::first(10)
        };
        let names: Vec<_> = store
            .orgs()
            .list(&QueryFilter::new(), &page)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, ["org-2", "org-1", "org-0"]);
    }

    #[tokio::test]
    async fn test_bulk_exec_is_all_or_nothing() {
        let store = MemoryStore::new();
        let org = Organization::new("Acme", "owner");
        let project = Project::new(org.id.clone(), "Docs", "owner");
        store.orgs().insert(org.clone()).await.unwrap();
        store.projects().insert(project.clone()).await.unwrap();

        let result = store
            .bulk_exec(vec![
                Mutation::delete(Table::Projects, project.id.clone()),
                Mutation::delete(Table::Orgs, "missing"),
            ])
            .await;
        assert!(result.is_err());
        assert!(store.projects().get_by_id(&project.id).await.is_ok());

        store
            .bulk_exec(vec![
                Mutation::delete(Table::Projects, project.id.clone()),
                Mutation::delete(Table::Orgs, org.id.clone()),
                Mutation::delete_if_exists(Table::Roles, "nobody"),
            ])
            .await
            .unwrap();
        assert!(store.projects().get_by_id(&project.id).await.is_err());
        assert!(store.orgs().get_by_id(&org.id).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_with_creates_then_modifies() {
        let store = MemoryStore::new();
        let init = LoginAttempt::new("10.0.0.1", "a@x.com");

        let row = store
            .login_attempts()
            .upsert_with("10.0.0.1", init.clone(), Box::new(|r| r.total_attempts += 1))
            .await
            .unwrap();
        assert_eq!(row.total_attempts, 1);

        let row = store
            .login_attempts()
            .upsert_with("10.0.0.1", init, Box::new(|r| r.total_attempts += 1))
            .await
            .unwrap();
        assert_eq!(row.total_attempts, 2);
    }
}
