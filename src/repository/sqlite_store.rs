// ==========================================
// 表格数据交换引擎 - SQLite 对象存储
// ==========================================
// 职责: PersistentObjectStore 的 rusqlite 实现
// 存储: exchange_object 表（id / type_name / data JSON）
// 工作单元: 修改先暂存在内存，commit 时在单个事务中落库
// 读取缓存: 按类型缓存已落库对象快照，等值查找走按字段懒建的索引
//   - 本连接 commit 后清空
//   - PRAGMA data_version 变化（其他连接已提交）时清空
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::value::{FieldValue, Record, RecordId};
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::{Cell, RefCell};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum PendingChange {
    Upsert(Record),
    Delete { type_name: String },
}

// ==========================================
// CommittedSnapshot - 单个类型已落库对象
// ==========================================
#[derive(Debug, Default)]
struct CommittedSnapshot {
    records: Vec<Record>,                                    // 按写入顺序
    positions: HashMap<RecordId, usize>,
    indexes: HashMap<String, HashMap<String, Vec<usize>>>, // 字段 -> 标识文本 -> 位置（升序）
}

impl CommittedSnapshot {
    fn new(records: Vec<Record>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id, pos))
            .collect();
        Self {
            records,
            positions,
            indexes: HashMap::new(),
        }
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.positions.contains_key(id)
    }

    /// 字段值（规范化文本）等于 key 的记录位置
    fn positions_of(&mut self, field: &str, key: &str) -> Vec<usize> {
        let records = &self.records;
        let index = self.indexes.entry(field.to_string()).or_insert_with(|| {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (pos, record) in records.iter().enumerate() {
                if let Some(value) = record.get(field).identity_key() {
                    index.entry(value).or_default().push(pos);
                }
            }
            index
        });
        index.get(key).cloned().unwrap_or_default()
    }
}

// ==========================================
// SqliteObjectStore
// ==========================================
pub struct SqliteObjectStore {
    conn: Arc<Mutex<Connection>>,
    pending: IndexMap<RecordId, PendingChange>,
    snapshots: RefCell<HashMap<String, CommittedSnapshot>>,
    snapshot_version: Cell<Option<i64>>,
}

impl SqliteObjectStore {
    /// 打开数据库并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            pending: IndexMap::new(),
            snapshots: RefCell::new(HashMap::new()),
            snapshot_version: Cell::new(None),
        })
    }

    /// 从已有连接创建（会再次应用 PRAGMA 并建表，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self {
            conn,
            pending: IndexMap::new(),
            snapshots: RefCell::new(HashMap::new()),
            snapshot_version: Cell::new(None),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 读取已落库的某类型对象（按写入顺序）
    fn load_committed(&self, type_name: &str) -> StoreResult<Vec<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT data FROM exchange_object WHERE type_name = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![type_name], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let record: Record = serde_json::from_str(&row?)?;
            records.push(record);
        }
        Ok(records)
    }

    /// 其他连接每次提交都会使其变化
    fn data_version(&self) -> StoreResult<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }

    /// 在某类型的已落库快照上执行 f（必要时先加载）
    fn with_snapshot<T>(
        &self,
        type_name: &str,
        f: impl FnOnce(&mut CommittedSnapshot) -> T,
    ) -> StoreResult<T> {
        let version = self.data_version()?;
        let mut snapshots = self.snapshots.borrow_mut();
        if self.snapshot_version.get() != Some(version) {
            snapshots.clear();
            self.snapshot_version.set(Some(version));
        }

        let snapshot = match snapshots.entry(type_name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let records = self.load_committed(type_name)?;
                debug!(type_name = %type_name, records = records.len(), "加载已落库快照");
                entry.insert(CommittedSnapshot::new(records))
            }
        };
        Ok(f(snapshot))
    }

    /// 已落库记录叠加暂存修改后的当前状态（None = 已暂存删除）
    fn current<'r>(&'r self, record: &'r Record) -> Option<&'r Record> {
        match self.pending.get(&record.id) {
            Some(PendingChange::Delete { .. }) => None,
            Some(PendingChange::Upsert(staged)) => Some(staged),
            None => Some(record),
        }
    }

    /// 尚未落库的新对象（按暂存顺序）
    fn staged_new<'r>(
        &'r self,
        type_name: &'r str,
        snapshot: &'r CommittedSnapshot,
    ) -> impl Iterator<Item = &'r Record> + 'r {
        self.pending.values().filter_map(move |change| match change {
            PendingChange::Upsert(staged)
                if staged.type_name == type_name && !snapshot.contains(&staged.id) =>
            {
                Some(staged)
            }
            _ => None,
        })
    }

    fn load_committed_by_id(&self, id: RecordId) -> StoreResult<Option<Record>> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM exchange_object WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl PersistentObjectStore for SqliteObjectStore {
    fn create_object(&mut self, type_name: &str) -> StoreResult<Record> {
        let record = Record::new(type_name);
        self.pending
            .insert(record.id, PendingChange::Upsert(record.clone()));
        Ok(record)
    }

    fn find_object(
        &self,
        type_name: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Option<Record>> {
        let criteria = Criteria::equals(field, value.clone());
        let Some(key) = value.identity_key() else {
            return Ok(self.get_objects(type_name, &criteria)?.into_iter().next());
        };

        self.with_snapshot(type_name, |snapshot| {
            // 已落库: 索引命中且未被暂存改掉的，以及暂存中改成该值的，取最靠前者
            let mut first = snapshot
                .positions_of(field, &key)
                .into_iter()
                .find(|&pos| {
                    self.current(&snapshot.records[pos])
                        .is_some_and(|r| criteria.matches(r))
                });
            for (id, change) in &self.pending {
                if let (PendingChange::Upsert(staged), Some(&pos)) = (change, snapshot.positions.get(id)) {
                    if first.map_or(true, |f| pos < f) && criteria.matches(staged) {
                        first = Some(pos);
                    }
                }
            }

            match first {
                Some(pos) => self.current(&snapshot.records[pos]).cloned(),
                None => self
                    .staged_new(type_name, snapshot)
                    .find(|r| criteria.matches(r))
                    .cloned(),
            }
        })
    }

    fn get_objects(&self, type_name: &str, criteria: &Criteria) -> StoreResult<Vec<Record>> {
        self.with_snapshot(type_name, |snapshot| {
            let mut merged: Vec<Record> = snapshot
                .records
                .iter()
                .filter_map(|record| self.current(record))
                .filter(|r| criteria.matches(r))
                .cloned()
                .collect();
            merged.extend(
                self.staged_new(type_name, snapshot)
                    .filter(|r| criteria.matches(r))
                    .cloned(),
            );
            merged
        })
    }

    fn get_object(&self, id: RecordId) -> StoreResult<Option<Record>> {
        match self.pending.get(&id) {
            Some(PendingChange::Upsert(staged)) => Ok(Some(staged.clone())),
            Some(PendingChange::Delete { .. }) => Ok(None),
            None => self.load_committed_by_id(id),
        }
    }

    fn save_object(&mut self, record: Record) -> StoreResult<()> {
        if let Some(existing) = self.get_object(record.id)? {
            if existing.type_name != record.type_name {
                return Err(StoreError::TypeMismatch {
                    expected: existing.type_name,
                    actual: record.type_name,
                });
            }
        }
        self.pending.insert(record.id, PendingChange::Upsert(record));
        Ok(())
    }

    fn delete_object(&mut self, id: RecordId) -> StoreResult<()> {
        let existing = self.get_object(id)?.ok_or_else(|| StoreError::NotFound {
            type_name: "Unknown".to_string(),
            id: id.to_string(),
        })?;

        self.pending.insert(
            id,
            PendingChange::Delete {
                type_name: existing.type_name,
            },
        );
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for (id, change) in &self.pending {
            match change {
                PendingChange::Upsert(record) => {
                    let data = serde_json::to_string(record)?;
                    tx.execute(
                        r#"
                        INSERT INTO exchange_object (id, type_name, data, updated_at)
                        VALUES (?1, ?2, ?3, datetime('now'))
                        ON CONFLICT(id) DO UPDATE SET data = ?3, updated_at = datetime('now')
                        "#,
                        params![id.to_string(), record.type_name, data],
                    )?;
                }
                PendingChange::Delete { type_name } => {
                    debug!(id = %id, type_name = %type_name, "删除对象");
                    tx.execute(
                        "DELETE FROM exchange_object WHERE id = ?1",
                        params![id.to_string()],
                    )?;
                }
            }
            count += 1;
        }

        tx.commit()
            .map_err(|e| StoreError::DatabaseTransactionError(e.to_string()))?;
        drop(conn);

        self.pending.clear();
        self.snapshots.borrow_mut().clear();
        info!(changes = count, "SQLite 对象存储提交完成");
        Ok(count)
    }

    fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "丢弃未提交修改");
        }
        self.pending.clear();
    }

    fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }
}
