//! SQLite storage backend for pager-store.

use super::{CursorStore, ItemCache, PageMerge, PagingStore};
use crate::error::StorageError;
use crate::live::NameFilter;
use async_trait::async_trait;
use pager_types::{Item, ItemId, PageCursor, PageNumber};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// SQLite-backed item cache and cursor store.
///
/// Uses WAL mode for concurrent reads/writes. Clones share the pool and the
/// version counter.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    /// Open (or create) the cache database at `path`.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(StorageError::InvalidPath {
                    path: path.to_path_buf(),
                });
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;

        debug!(path = %path.display(), "opened cache database");
        Self::with_pool(pool).await
    }

    /// Create an in-memory store (for testing and `--mock` runs).
    ///
    /// The single connection is never recycled, since dropping it would
    /// drop the database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::from)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let (changes, _) = watch::channel(0);
        let store = Self {
            pool,
            changes: Arc::new(changes),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Close the pool. Later operations fail with [`StorageError::Closed`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS remote_keys (
                item_id INTEGER PRIMARY KEY
                    REFERENCES items(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
                prev_key INTEGER,
                next_key INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_name ON items(name)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn upsert_items(conn: &mut SqliteConnection, items: &[Item]) -> Result<(), StorageError> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO items (id, name)
                VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
                "#,
            )
            .bind(item.id.value())
            .bind(&item.name)
            .execute(&mut *conn)
            .await
            .map_err(StorageError::from)?;
        }
        Ok(())
    }

    async fn upsert_cursors(
        conn: &mut SqliteConnection,
        cursors: &[PageCursor],
    ) -> Result<(), StorageError> {
        for cursor in cursors {
            sqlx::query(
                r#"
                INSERT INTO remote_keys (item_id, prev_key, next_key)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(item_id) DO UPDATE
                    SET prev_key = excluded.prev_key, next_key = excluded.next_key
                "#,
            )
            .bind(cursor.item_id.value())
            .bind(cursor.prev.map(|p| i64::from(p.value())))
            .bind(cursor.next.map(|p| i64::from(p.value())))
            .execute(&mut *conn)
            .await
            .map_err(StorageError::from)?;
        }
        Ok(())
    }

    async fn delete_all(conn: &mut SqliteConnection) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM remote_keys")
            .execute(&mut *conn)
            .await
            .map_err(StorageError::from)?;
        sqlx::query("DELETE FROM items")
            .execute(&mut *conn)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn to_i64(value: usize) -> i64 {
        i64::try_from(value).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl CursorStore for SqliteStore {
    async fn put_cursors(&self, cursors: &[PageCursor]) -> Result<(), StorageError> {
        if cursors.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        Self::upsert_cursors(&mut *tx, cursors).await?;
        tx.commit().await.map_err(StorageError::from)?;

        self.invalidate();
        Ok(())
    }

    async fn get_cursor(&self, item_id: ItemId) -> Result<Option<PageCursor>, StorageError> {
        let row = sqlx::query_as::<_, CursorRow>(
            r#"
            SELECT item_id, prev_key, next_key
            FROM remote_keys
            WHERE item_id = ?1
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        row.map(PageCursor::try_from).transpose()
    }

    async fn clear_cursors(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM remote_keys")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        self.invalidate();
        Ok(())
    }

    async fn cursor_count(&self) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM remote_keys")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(count as usize)
    }
}

#[async_trait]
impl ItemCache for SqliteStore {
    async fn put_items(&self, items: &[Item]) -> Result<(), StorageError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        Self::upsert_items(&mut *tx, items).await?;
        tx.commit().await.map_err(StorageError::from)?;

        self.invalidate();
        Ok(())
    }

    async fn clear_items(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM items")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        self.invalidate();
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        let row = sqlx::query_as::<_, ItemRow>("SELECT id, name FROM items WHERE id = ?1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(Item::from))
    }

    async fn count_items(&self, filter: &NameFilter) -> Result<usize, StorageError> {
        let count: i64 = match filter {
            NameFilter::All => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
                    .fetch_one(&self.pool)
                    .await
            }
            NameFilter::Pattern(pattern) => {
                sqlx::query_scalar::<_, i64>(
                    r"SELECT COUNT(*) FROM items WHERE name LIKE ?1 ESCAPE '\'",
                )
                .bind(pattern)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(StorageError::from)?;

        Ok(count as usize)
    }

    async fn load_items(
        &self,
        filter: &NameFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Item>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = match filter {
            NameFilter::All => {
                sqlx::query_as::<_, ItemRow>(
                    r#"
                    SELECT id, name FROM items
                    ORDER BY name ASC, id ASC
                    LIMIT ?1 OFFSET ?2
                    "#,
                )
                .bind(Self::to_i64(limit))
                .bind(Self::to_i64(offset))
                .fetch_all(&self.pool)
                .await
            }
            NameFilter::Pattern(pattern) => {
                sqlx::query_as::<_, ItemRow>(
                    r#"
                    SELECT id, name FROM items
                    WHERE name LIKE ?1 ESCAPE '\'
                    ORDER BY name ASC, id ASC
                    LIMIT ?2 OFFSET ?3
                    "#,
                )
                .bind(pattern)
                .bind(Self::to_i64(limit))
                .bind(Self::to_i64(offset))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn invalidate(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

#[async_trait]
impl PagingStore for SqliteStore {
    async fn merge_page(&self, merge: PageMerge) -> Result<(), StorageError> {
        if merge.is_noop() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        if merge.clear_first {
            Self::delete_all(&mut *tx).await?;
        }
        Self::upsert_cursors(&mut *tx, &merge.cursors).await?;
        Self::upsert_items(&mut *tx, &merge.items).await?;
        tx.commit().await.map_err(StorageError::from)?;

        debug!(
            cleared = merge.clear_first,
            items = merge.items.len(),
            "merged page"
        );
        self.invalidate();
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        Self::delete_all(&mut *tx).await?;
        tx.commit().await.map_err(StorageError::from)?;

        self.invalidate();
        Ok(())
    }
}

/// Internal row type for item queries.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item::new(row.id, row.name)
    }
}

/// Internal row type for cursor queries.
#[derive(sqlx::FromRow)]
struct CursorRow {
    item_id: i64,
    prev_key: Option<i64>,
    next_key: Option<i64>,
}

fn page_from_column(value: Option<i64>) -> Result<Option<PageNumber>, StorageError> {
    value
        .map(|v| {
            u32::try_from(v)
                .map(PageNumber::new)
                .map_err(|_| StorageError::InvalidRow(format!("page key out of range: {v}")))
        })
        .transpose()
}

impl TryFrom<CursorRow> for PageCursor {
    type Error = StorageError;

    fn try_from(row: CursorRow) -> Result<Self, Self::Error> {
        Ok(PageCursor::new(
            ItemId::new(row.item_id),
            page_from_column(row.prev_key)?,
            page_from_column(row.next_key)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CacheStats;

    fn page(n: u32) -> Option<PageNumber> {
        Some(PageNumber::new(n))
    }

    fn merge_for(items: &[Item], prev: Option<PageNumber>, next: Option<PageNumber>) -> PageMerge {
        PageMerge {
            clear_first: false,
            cursors: items
                .iter()
                .map(|i| PageCursor::new(i.id, prev, next))
                .collect(),
            items: items.to_vec(),
        }
    }

    async fn all_names(store: &SqliteStore) -> Vec<String> {
        store
            .load_items(&NameFilter::All, 0, 1000)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect()
    }

    // ===== Item cache =====

    #[tokio::test]
    async fn query_all_sorts_by_name_regardless_of_insertion_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put_items(&[
                Item::new(3, "cherry"),
                Item::new(1, "banana"),
                Item::new(2, "apple"),
            ])
            .await
            .unwrap();

        let live = store.query_all();
        assert_eq!(live.count().await.unwrap(), 3);
        let names: Vec<_> = live
            .load(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["apple", "banana", "cherry"]);
    }

    #[tokio::test]
    async fn equal_names_are_ordered_by_id() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put_items(&[Item::new(9, "same"), Item::new(4, "same")])
            .await
            .unwrap();

        let items = store.load_items(&NameFilter::All, 0, 10).await.unwrap();
        assert_eq!(items, vec![Item::new(4, "same"), Item::new(9, "same")]);
    }

    #[tokio::test]
    async fn put_items_upserts_by_id() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put_items(&[Item::new(1, "old")]).await.unwrap();
        store.put_items(&[Item::new(1, "new")]).await.unwrap();

        assert_eq!(
            store.get_item(ItemId::new(1)).await.unwrap(),
            Some(Item::new(1, "new"))
        );
        assert_eq!(store.count_items(&NameFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_item_missing_is_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get_item(ItemId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_items_respects_offset_and_limit() {
        let store = SqliteStore::in_memory().await.unwrap();
        let items: Vec<_> = (1..=10)
            .map(|i| Item::new(i, format!("item-{:02}", i)))
            .collect();
        store.put_items(&items).await.unwrap();

        let window = store.load_items(&NameFilter::All, 3, 4).await.unwrap();
        assert_eq!(window, items[3..7].to_vec());

        let tail = store.load_items(&NameFilter::All, 8, 10).await.unwrap();
        assert_eq!(tail.len(), 2);

        assert!(store.load_items(&NameFilter::All, 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pattern_filter_escapes_wildcards() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put_items(&[Item::new(1, "50% off"), Item::new(2, "500 units")])
            .await
            .unwrap();

        let percent = NameFilter::Pattern(r"%50\%%".into());
        assert_eq!(store.count_items(&percent).await.unwrap(), 1);

        let loose = NameFilter::Pattern("%50%".into());
        assert_eq!(store.count_items(&loose).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_items_cascades_to_cursors() {
        let store = SqliteStore::in_memory().await.unwrap();
        let items = vec![Item::new(1, "a"), Item::new(2, "b")];
        store.merge_page(merge_for(&items, None, page(2))).await.unwrap();
        assert_eq!(store.cursor_count().await.unwrap(), 2);

        store.clear_items().await.unwrap();

        assert_eq!(store.count_items(&NameFilter::All).await.unwrap(), 0);
        assert_eq!(store.cursor_count().await.unwrap(), 0);
    }

    // ===== Cursor store =====

    #[tokio::test]
    async fn cursors_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put_items(&[Item::new(7, "x")]).await.unwrap();

        let cursor = PageCursor::new(ItemId::new(7), page(2), page(4));
        store.put_cursors(&[cursor]).await.unwrap();

        assert_eq!(store.get_cursor(ItemId::new(7)).await.unwrap(), Some(cursor));
        assert!(store.get_cursor(ItemId::new(8)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_cursors_replaces_existing() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put_items(&[Item::new(1, "x")]).await.unwrap();
        store
            .put_cursors(&[PageCursor::new(ItemId::new(1), None, page(2))])
            .await
            .unwrap();
        store
            .put_cursors(&[PageCursor::new(ItemId::new(1), page(4), None)])
            .await
            .unwrap();

        let cursor = store.get_cursor(ItemId::new(1)).await.unwrap().unwrap();
        assert_eq!(cursor.prev, page(4));
        assert_eq!(cursor.next, None);
        assert_eq!(store.cursor_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cursor_for_unknown_item_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        let result = store
            .put_cursors(&[PageCursor::new(ItemId::new(99), None, None)])
            .await;

        assert!(matches!(result, Err(StorageError::Database(_))));
        assert_eq!(store.cursor_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_cursors_keeps_items() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .merge_page(merge_for(&[Item::new(1, "a")], None, page(2)))
            .await
            .unwrap();

        store.clear_cursors().await.unwrap();

        assert_eq!(store.cursor_count().await.unwrap(), 0);
        assert_eq!(store.count_items(&NameFilter::All).await.unwrap(), 1);
    }

    // ===== Merge =====

    #[tokio::test]
    async fn first_page_writes_items_and_cursors() {
        let store = SqliteStore::in_memory().await.unwrap();
        let items = vec![Item::new(1, "a"), Item::new(2, "b")];
        store.merge_page(merge_for(&items, None, page(2))).await.unwrap();

        assert_eq!(all_names(&store).await, vec!["a", "b"]);
        for id in [1, 2] {
            let cursor = store.get_cursor(ItemId::new(id)).await.unwrap().unwrap();
            assert_eq!(cursor.prev, None);
            assert_eq!(cursor.next, page(2));
        }
    }

    #[tokio::test]
    async fn merging_same_page_twice_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let items = vec![Item::new(1, "a"), Item::new(2, "b")];
        let merge = merge_for(&items, None, page(2));

        store.merge_page(merge.clone()).await.unwrap();
        let first = store.stats().await.unwrap();
        store.merge_page(merge).await.unwrap();

        assert_eq!(store.stats().await.unwrap(), first);
        assert_eq!(first.items, 2);
        assert_eq!(first.cursors, 2);
    }

    #[tokio::test]
    async fn clear_first_replaces_previous_contents() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .merge_page(merge_for(
                &[Item::new(1, "old-1"), Item::new(2, "old-2")],
                None,
                page(2),
            ))
            .await
            .unwrap();

        let mut refresh = merge_for(&[Item::new(10, "fresh")], None, page(2));
        refresh.clear_first = true;
        store.merge_page(refresh).await.unwrap();

        assert_eq!(all_names(&store).await, vec!["fresh"]);
        assert!(store.get_cursor(ItemId::new(1)).await.unwrap().is_none());
        assert_eq!(store.cursor_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_first_with_empty_page_still_clears() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .merge_page(merge_for(&[Item::new(1, "a")], None, page(2)))
            .await
            .unwrap();

        store
            .merge_page(PageMerge {
                clear_first: true,
                ..PageMerge::default()
            })
            .await
            .unwrap();

        assert_eq!(store.stats().await.unwrap(), CacheStats::default());
    }

    #[tokio::test]
    async fn noop_merge_publishes_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();
        let changes = store.subscribe();

        store.merge_page(PageMerge::default()).await.unwrap();

        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn failed_merge_rolls_back() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .merge_page(merge_for(&[Item::new(1, "kept")], None, page(2)))
            .await
            .unwrap();
        let changes = store.subscribe();

        // Cursor 99 has no item row, so the deferred foreign key fails at commit.
        let broken = PageMerge {
            clear_first: true,
            cursors: vec![
                PageCursor::new(ItemId::new(2), None, page(2)),
                PageCursor::new(ItemId::new(99), None, page(2)),
            ],
            items: vec![Item::new(2, "new")],
        };
        let result = store.merge_page(broken).await;

        assert!(matches!(result, Err(StorageError::Database(_))));
        assert_eq!(all_names(&store).await, vec!["kept"]);
        assert!(store.get_cursor(ItemId::new(1)).await.unwrap().is_some());
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn clear_all_empties_both_tables() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .merge_page(merge_for(&[Item::new(1, "a")], None, page(2)))
            .await
            .unwrap();

        store.clear_all().await.unwrap();

        assert_eq!(store.stats().await.unwrap(), CacheStats::default());
    }

    // ===== Lifecycle =====

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store
                .merge_page(merge_for(&[Item::new(1, "durable")], None, page(2)))
                .await
                .unwrap();
            store.close().await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        assert_eq!(all_names(&store).await, vec!["durable"]);
        let cursor = store.get_cursor(ItemId::new(1)).await.unwrap().unwrap();
        assert_eq!(cursor.next, page(2));
    }

    #[tokio::test]
    async fn missing_parent_directory_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cache.db");

        let result = SqliteStore::new(&path).await;
        assert!(matches!(result, Err(StorageError::InvalidPath { .. })));
    }

    #[tokio::test]
    async fn closed_store_reports_closed() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.close().await;

        let result = store.count_items(&NameFilter::All).await;
        assert!(matches!(result, Err(StorageError::Closed)));
    }
}
