// ==========================================
// 表格数据交换引擎 - 内存对象存储
// ==========================================
// 职责: PersistentObjectStore 的内存实现（工作单元 = 工作副本 + 已提交快照）
// 用途: 单元测试、无数据库场景的预览导入
// ==========================================

use crate::domain::value::{Record, RecordId};
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use indexmap::IndexMap;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    committed: IndexMap<RecordId, Record>,
    working: IndexMap<RecordId, Record>,
    pending_ops: usize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已提交状态预置对象
    pub fn seed(&mut self, record: Record) {
        self.committed.insert(record.id, record.clone());
        self.working.insert(record.id, record);
    }

    /// 已提交的某类型对象（不含暂存修改）
    pub fn committed_objects(&self, type_name: &str) -> Vec<Record> {
        self.committed
            .values()
            .filter(|r| r.type_name == type_name)
            .cloned()
            .collect()
    }
}

impl PersistentObjectStore for InMemoryObjectStore {
    fn create_object(&mut self, type_name: &str) -> StoreResult<Record> {
        let record = Record::new(type_name);
        self.working.insert(record.id, record.clone());
        self.pending_ops += 1;
        Ok(record)
    }

    fn get_objects(&self, type_name: &str, criteria: &Criteria) -> StoreResult<Vec<Record>> {
        Ok(self
            .working
            .values()
            .filter(|r| r.type_name == type_name && criteria.matches(r))
            .cloned()
            .collect())
    }

    fn get_object(&self, id: RecordId) -> StoreResult<Option<Record>> {
        Ok(self.working.get(&id).cloned())
    }

    fn save_object(&mut self, record: Record) -> StoreResult<()> {
        if let Some(existing) = self.working.get(&record.id) {
            if existing.type_name != record.type_name {
                return Err(StoreError::TypeMismatch {
                    expected: existing.type_name.clone(),
                    actual: record.type_name,
                });
            }
        }
        self.working.insert(record.id, record);
        self.pending_ops += 1;
        Ok(())
    }

    fn delete_object(&mut self, id: RecordId) -> StoreResult<()> {
        match self.working.shift_remove(&id) {
            Some(_) => {
                self.pending_ops += 1;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                type_name: "Unknown".to_string(),
                id: id.to_string(),
            }),
        }
    }

    fn commit(&mut self) -> StoreResult<usize> {
        let changes = self.pending_ops;
        self.committed = self.working.clone();
        self.pending_ops = 0;
        debug!(changes = changes, objects = self.committed.len(), "内存存储提交完成");
        Ok(changes)
    }

    fn rollback(&mut self) {
        self.working = self.committed.clone();
        self.pending_ops = 0;
    }

    fn has_pending_changes(&self) -> bool {
        self.pending_ops > 0
    }
}
