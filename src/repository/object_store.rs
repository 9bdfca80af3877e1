// ==========================================
// 表格数据交换引擎 - 对象存储 Trait
// ==========================================
// 职责: 定义导入/导出依赖的持久化协作接口（不包含实现）
// 红线: 存储层不含导入规则，只做对象 CRUD 与工作单元提交
// ==========================================

use crate::domain::value::{FieldValue, Record, RecordId};
use crate::repository::error::StoreResult;

// ==========================================
// Criteria - 查询条件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    All,
    Equals { field: String, value: FieldValue },
    And(Vec<Criteria>),
}

impl Criteria {
    pub fn equals(field: impl Into<String>, value: FieldValue) -> Self {
        Criteria::Equals {
            field: field.into(),
            value,
        }
    }

    /// 判断记录是否满足条件
    ///
    /// 字段比较使用规范化文本，"E100" 与 " E100 " 视为相等
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Criteria::All => true,
            Criteria::Equals { field, value } => {
                let actual = record.get(field);
                match (actual.identity_key(), value.identity_key()) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => true,
                    _ => false,
                }
            }
            Criteria::And(parts) => parts.iter().all(|c| c.matches(record)),
        }
    }
}

// ==========================================
// PersistentObjectStore Trait
// ==========================================
// 用途: 导入协调器与导出器的外部协作者
// 实现者: InMemoryObjectStore, SqliteObjectStore
//
// 工作单元语义:
// - create/save/delete 只暂存，读取操作可见暂存状态
// - commit 一次性落库，rollback 丢弃全部暂存修改
pub trait PersistentObjectStore {
    /// 创建指定类型的新对象（已暂存，尚未提交）
    fn create_object(&mut self, type_name: &str) -> StoreResult<Record>;

    /// 按单字段等值查找第一个匹配对象
    fn find_object(
        &self,
        type_name: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Option<Record>> {
        let criteria = Criteria::equals(field, value.clone());
        Ok(self.get_objects(type_name, &criteria)?.into_iter().next())
    }

    /// 按条件查询对象（保持插入顺序）
    fn get_objects(&self, type_name: &str, criteria: &Criteria) -> StoreResult<Vec<Record>>;

    /// 按标识读取对象
    fn get_object(&self, id: RecordId) -> StoreResult<Option<Record>>;

    /// 暂存对象的修改
    fn save_object(&mut self, record: Record) -> StoreResult<()>;

    /// 暂存删除
    fn delete_object(&mut self, id: RecordId) -> StoreResult<()>;

    /// 提交工作单元
    ///
    /// # 返回
    /// - Ok(usize): 落库的变更数
    fn commit(&mut self) -> StoreResult<usize>;

    /// 丢弃未提交的修改
    fn rollback(&mut self);

    fn has_pending_changes(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_equals_normalizes_text() {
        let record = Record::new("Employee").with("code", FieldValue::Text(" E100 ".to_string()));

        assert!(Criteria::equals("code", FieldValue::Text("E100".to_string())).matches(&record));
        assert!(!Criteria::equals("code", FieldValue::Text("E101".to_string())).matches(&record));
    }

    #[test]
    fn test_criteria_and() {
        let record = Record::new("DictionaryItem")
            .with("category", FieldValue::Text("部门".to_string()))
            .with("value", FieldValue::Text("研发部".to_string()));

        let criteria = Criteria::And(vec![
            Criteria::equals("category", FieldValue::Text("部门".to_string())),
            Criteria::equals("value", FieldValue::Text("研发部".to_string())),
        ]);
        assert!(criteria.matches(&record));

        let other = Criteria::And(vec![
            Criteria::equals("category", FieldValue::Text("职级".to_string())),
            Criteria::equals("value", FieldValue::Text("研发部".to_string())),
        ]);
        assert!(!other.matches(&record));
    }

    #[test]
    fn test_criteria_null_matches_missing_field() {
        let record = Record::new("Employee");
        assert!(Criteria::equals("code", FieldValue::Null).matches(&record));
    }
}
