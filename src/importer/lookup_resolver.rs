// ==========================================
// 表格数据交换引擎 - 引用/字典值解析
// ==========================================
// 职责: 将单元格文本解析为存储中的引用对象，必要时自动创建
// 缓存: (目标类型, 类别, 值) -> RecordId，仅在一次导入调用内有效
//       每次导入新建 LookupResolver，调用结束即丢弃
// ==========================================

use crate::domain::value::{FieldValue, RecordId};
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use crate::schema::field_config::FieldConfiguration;
use crate::schema::registry::TypeRegistry;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(RecordId),
    Created(RecordId),
    /// 未找到且不允许自动创建（警告，字段留空）
    Missing(String),
    /// 配置或存储错误（行错误）
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    target: String,
    category: Option<String>,
    value: String,
}

pub struct LookupResolver<'a> {
    registry: &'a TypeRegistry,
    cache: HashMap<LookupKey, RecordId>,
    created: usize,
}

impl<'a> LookupResolver<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// 本次调用自动创建的引用对象数
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// 解析引用字段的原始文本
    ///
    /// # 参数
    /// - store: 对象存储（查找/自动创建）
    /// - field: 引用字段配置
    /// - raw: 单元格文本（已去空白）
    pub fn resolve<S>(&mut self, store: &mut S, field: &FieldConfiguration, raw: &str) -> LookupOutcome
    where
        S: PersistentObjectStore + ?Sized,
    {
        let Some(target) = field.reference_target() else {
            return LookupOutcome::Failed(format!("{} 不是引用字段", field.property));
        };

        let Some(match_field) = self.match_field(field, target) else {
            return LookupOutcome::Failed(format!(
                "{} 未配置匹配字段，且类型 {} 没有标识字段",
                field.property, target
            ));
        };

        let options = field.reference.as_ref();
        let category_field = options.and_then(|o| o.category_field.clone());
        let category = options.and_then(|o| o.category.clone());
        let auto_create = options.map(|o| o.auto_create).unwrap_or(false);

        let key = LookupKey {
            target: target.to_string(),
            category: category.clone(),
            value: raw.to_string(),
        };
        if let Some(id) = self.cache.get(&key) {
            return LookupOutcome::Found(*id);
        }

        let mut criteria = vec![Criteria::equals(
            match_field.clone(),
            FieldValue::Text(raw.to_string()),
        )];
        if let (Some(cf), Some(c)) = (&category_field, &category) {
            criteria.push(Criteria::equals(cf.clone(), FieldValue::Text(c.clone())));
        }

        let existing = match store.get_objects(target, &Criteria::And(criteria)) {
            Ok(found) => found.into_iter().next(),
            Err(e) => return LookupOutcome::Failed(format!("查找 {} 失败: {}", target, e)),
        };

        if let Some(record) = existing {
            self.cache.insert(key, record.id);
            return LookupOutcome::Found(record.id);
        }

        if !auto_create {
            return LookupOutcome::Missing(format!(
                "{} 中不存在 {} = {}",
                target, match_field, raw
            ));
        }

        let mut record = match store.create_object(target) {
            Ok(record) => record,
            Err(e) => return LookupOutcome::Failed(format!("自动创建 {} 失败: {}", target, e)),
        };
        record.set(match_field.clone(), FieldValue::Text(raw.to_string()));
        if let (Some(cf), Some(c)) = (category_field, category) {
            record.set(cf, FieldValue::Text(c));
        }

        let id = record.id;
        if let Err(e) = store.save_object(record) {
            return LookupOutcome::Failed(format!("自动创建 {} 失败: {}", target, e));
        }

        debug!(target = %target, value = %raw, "自动创建引用对象");
        self.created += 1;
        self.cache.insert(key, id);
        LookupOutcome::Created(id)
    }

    fn match_field(&self, field: &FieldConfiguration, target: &str) -> Option<String> {
        if let Some(options) = &field.reference {
            if !options.match_field.trim().is_empty() {
                return Some(options.match_field.clone());
            }
        }
        self.registry
            .get(target)
            .ok()
            .and_then(|config| config.identity_field.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ValueKind;
    use crate::repository::memory_store::InMemoryObjectStore;
    use crate::schema::field_config::ReferenceOptions;

    fn department_field(auto_create: bool) -> FieldConfiguration {
        let options = ReferenceOptions::match_on("value").category("category", "部门");
        let options = if auto_create {
            options.auto_create()
        } else {
            options
        };
        FieldConfiguration::new("department", ValueKind::Reference("DictionaryItem".to_string()))
            .lookup(options)
    }

    #[test]
    fn test_auto_create_is_cached_within_call() {
        let registry = TypeRegistry::new();
        let mut store = InMemoryObjectStore::new();
        let mut resolver = LookupResolver::new(&registry);
        let field = department_field(true);

        let first = resolver.resolve(&mut store, &field, "研发部");
        let second = resolver.resolve(&mut store, &field, "研发部");

        let LookupOutcome::Created(id) = first else {
            panic!("expected created, got {:?}", first);
        };
        assert_eq!(second, LookupOutcome::Found(id));
        assert_eq!(resolver.created_count(), 1);

        let items = store.get_objects("DictionaryItem", &Criteria::All).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("category"), &FieldValue::Text("部门".to_string()));
    }

    #[test]
    fn test_missing_without_auto_create() {
        let registry = TypeRegistry::new();
        let mut store = InMemoryObjectStore::new();
        let mut resolver = LookupResolver::new(&registry);

        let outcome = resolver.resolve(&mut store, &department_field(false), "市场部");
        assert!(matches!(outcome, LookupOutcome::Missing(_)));
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_existing_item_in_other_category_is_not_matched() {
        let registry = TypeRegistry::new();
        let mut store = InMemoryObjectStore::new();
        store.seed(
            crate::domain::value::Record::new("DictionaryItem")
                .with("category", FieldValue::Text("职级".to_string()))
                .with("value", FieldValue::Text("研发部".to_string())),
        );

        let mut resolver = LookupResolver::new(&registry);
        let outcome = resolver.resolve(&mut store, &department_field(false), "研发部");
        assert!(matches!(outcome, LookupOutcome::Missing(_)));
    }
}
