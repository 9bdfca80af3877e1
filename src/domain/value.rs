// ==========================================
// 表格数据交换引擎 - 记录与字段值模型
// ==========================================
// 职责: 存储层对象（Record）与强类型字段值（FieldValue）
// 用途: 导入写入、导出读取、对象存储序列化
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ==========================================
// RecordId - 对象标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// FieldValue - 字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// 枚举字面量（声明名称）
    Enum(String),
    Reference(RecordId),
    Collection(Vec<RecordId>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Enum(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> &[RecordId] {
        match self {
            FieldValue::Collection(ids) => ids.as_slice(),
            _ => &[],
        }
    }

    /// 标识匹配用的规范化文本
    ///
    /// 数值与日期按导入时的默认格式输出，文本去除首尾空白
    pub fn identity_key(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) | FieldValue::Enum(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            FieldValue::Integer(v) => Some(v.to_string()),
            FieldValue::Decimal(v) => Some(v.to_string()),
            FieldValue::Boolean(v) => Some(v.to_string()),
            FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            FieldValue::Reference(id) => Some(id.to_string()),
            FieldValue::Collection(_) => None,
        }
    }
}

// ==========================================
// Record - 存储对象
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub type_name: String,
    pub values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            type_name: type_name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, property: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.values.get(property).unwrap_or(&NULL)
    }

    pub fn set(&mut self, property: impl Into<String>, value: FieldValue) {
        self.values.insert(property.into(), value);
    }

    /// 向集合字段追加子对象（已存在则忽略）
    pub fn append_child(&mut self, property: &str, child: RecordId) {
        let entry = self
            .values
            .entry(property.to_string())
            .or_insert_with(|| FieldValue::Collection(Vec::new()));

        match entry {
            FieldValue::Collection(ids) => {
                if !ids.contains(&child) {
                    ids.push(child);
                }
            }
            other => *other = FieldValue::Collection(vec![child]),
        }
    }

    pub fn with(mut self, property: impl Into<String>, value: FieldValue) -> Self {
        self.set(property, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_trims_text() {
        assert_eq!(
            FieldValue::Text("  E100 ".to_string()).identity_key(),
            Some("E100".to_string())
        );
        assert_eq!(FieldValue::Text("   ".to_string()).identity_key(), None);
        assert_eq!(FieldValue::Null.identity_key(), None);
        assert_eq!(FieldValue::Integer(42).identity_key(), Some("42".to_string()));
    }

    #[test]
    fn test_append_child_deduplicates() {
        let mut parent = Record::new("Employee");
        let child = RecordId::new();

        parent.append_child("skills", child);
        parent.append_child("skills", child);

        assert_eq!(parent.get("skills").as_collection(), &[child]);
    }

    #[test]
    fn test_record_serde_round_value() {
        let record = Record::new("Employee")
            .with("code", FieldValue::Text("E100".to_string()))
            .with(
                "hired",
                FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            );

        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
