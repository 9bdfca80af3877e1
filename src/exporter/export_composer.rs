// ==========================================
// 表格数据交换引擎 - 导出编排
// ==========================================
// 职责: 记录集合 -> 表格文档（主表 + 多表模式的明细表）
// 主表: 启用且未隐藏的字段，按 effective_order 排列
//       集合字段按 Summary（摘要拼接）/ Count（数量）输出
// 明细表: 每个 MultiSheet 集合字段一张，首列为 "所属<主表标识列>"，
//         其后是明细类型的导出字段（不含指回主表的回指字段）
// ==========================================

use crate::domain::types::CollectionExportMode;
use crate::domain::value::{FieldValue, Record, RecordId};
use crate::error::ExchangeResult;
use crate::importer::detail_importer::{detail_sheet_name, RELATION_COLUMN_PREFIX};
use crate::importer::value_converter::ValueConverter;
use crate::repository::object_store::PersistentObjectStore;
use crate::schema::field_config::FieldConfiguration;
use crate::schema::registry::TypeRegistry;
use crate::schema::type_config::TypeConfiguration;
use tracing::{debug, warn};

// ==========================================
// 表格文档模型
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TabularSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabularDocument {
    pub sheets: Vec<TabularSheet>, // 第一个为主表
}

impl TabularDocument {
    pub fn main_sheet(&self) -> Option<&TabularSheet> {
        self.sheets.first()
    }

    pub fn sheet(&self, name: &str) -> Option<&TabularSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

// ==========================================
// ExportComposer
// ==========================================
pub struct ExportComposer<'a, S: PersistentObjectStore + ?Sized> {
    registry: &'a TypeRegistry,
    converter: ValueConverter<'a>,
    store: &'a S,
}

impl<'a, S: PersistentObjectStore + ?Sized> ExportComposer<'a, S> {
    pub fn new(registry: &'a TypeRegistry, converter: ValueConverter<'a>, store: &'a S) -> Self {
        Self {
            registry,
            converter,
            store,
        }
    }

    /// 生成表格文档
    ///
    /// # 参数
    /// - config: 主表类型配置
    /// - records: 待导出的主表记录（保持顺序）
    /// - sheet_name: 主表名覆盖（None 取类型配置）
    pub fn compose(
        &self,
        config: &TypeConfiguration,
        records: &[Record],
        sheet_name: Option<&str>,
    ) -> ExchangeResult<TabularDocument> {
        let fields: Vec<&FieldConfiguration> = config.main_sheet_fields().collect();

        let mut main = TabularSheet {
            name: sheet_name.unwrap_or(&config.sheet_name).to_string(),
            headers: fields.iter().map(|f| f.column().to_string()).collect(),
            rows: Vec::with_capacity(records.len()),
        };
        for record in records {
            let mut row = Vec::with_capacity(fields.len());
            for field in &fields {
                row.push(self.cell_text(record, field)?);
            }
            main.rows.push(row);
        }

        let mut sheets = vec![main];
        for field in config.multi_sheet_collections().filter(|f| f.export_enabled) {
            if let Some(detail) = self.compose_detail(config, field, records)? {
                sheets.push(detail);
            }
        }

        debug!(
            type_name = %config.type_name,
            records = records.len(),
            sheets = sheets.len(),
            "导出文档编排完成"
        );
        Ok(TabularDocument { sheets })
    }

    fn compose_detail(
        &self,
        parent: &TypeConfiguration,
        field: &FieldConfiguration,
        records: &[Record],
    ) -> ExchangeResult<Option<TabularSheet>> {
        let Some(item_type) = field.item_type() else {
            return Ok(None);
        };
        let item_config = match self.registry.get(item_type) {
            Ok(config) => config,
            Err(e) => {
                warn!(field = %field.property, error = %e, "明细类型未注册，跳过明细表");
                return Ok(None);
            }
        };

        let back_ref = item_config
            .back_reference_to(&parent.type_name)
            .map(|f| f.property.clone());
        let item_fields: Vec<&FieldConfiguration> = item_config
            .main_sheet_fields()
            .filter(|f| Some(&f.property) != back_ref.as_ref())
            .collect();

        let relation_header = match parent.identity() {
            Some(identity) => format!("{}{}", RELATION_COLUMN_PREFIX, identity.column()),
            None => format!("{}{}", RELATION_COLUMN_PREFIX, parent.sheet_name),
        };

        let mut headers = Vec::with_capacity(item_fields.len() + 1);
        headers.push(relation_header);
        headers.extend(item_fields.iter().map(|f| f.column().to_string()));

        let mut rows = Vec::new();
        for record in records {
            let relation = self.identity_text(parent, record)?;
            for child_id in record.get(&field.property).as_collection() {
                let Some(child) = self.store.get_object(*child_id)? else {
                    continue;
                };
                let mut row = Vec::with_capacity(headers.len());
                row.push(relation.clone());
                for item_field in &item_fields {
                    row.push(self.cell_text(&child, item_field)?);
                }
                rows.push(row);
            }
        }

        Ok(Some(TabularSheet {
            name: detail_sheet_name(field),
            headers,
            rows,
        }))
    }

    /// 单元格文本
    fn cell_text(&self, record: &Record, field: &FieldConfiguration) -> ExchangeResult<String> {
        let value = record.get(&field.property);

        if field.export_converter.is_some() {
            return self.converter.export_value(value, field);
        }

        match value {
            FieldValue::Reference(id) => self.reference_text(*id, field),
            FieldValue::Collection(ids) => self.collection_text(ids, field),
            _ if field.is_collection() => self.collection_text(&[], field),
            other => self.converter.export_value(other, field),
        }
    }

    /// 引用对象按匹配字段（或其标识字段）显示
    fn reference_text(&self, id: RecordId, field: &FieldConfiguration) -> ExchangeResult<String> {
        let Some(target) = self.store.get_object(id)? else {
            return Ok(String::new());
        };

        let target_config = self.registry.get(&target.type_name).ok();
        let display_field = field
            .reference
            .as_ref()
            .map(|r| r.match_field.clone())
            .or_else(|| target_config.as_ref().and_then(|c| c.identity_field.clone()));

        let Some(display_field) = display_field else {
            return Ok(id.to_string());
        };

        let value = target.get(&display_field);
        match target_config.as_ref().and_then(|c| c.field(&display_field)) {
            Some(target_field) => self.converter.export_value(value, target_field),
            None => Ok(value.identity_key().unwrap_or_default()),
        }
    }

    fn collection_text(&self, ids: &[RecordId], field: &FieldConfiguration) -> ExchangeResult<String> {
        let options = field.collection.clone().unwrap_or_default();
        if options.mode == CollectionExportMode::Count {
            return Ok(ids.len().to_string());
        }

        let item_config = field.item_type().and_then(|t| self.registry.get(t).ok());
        let display: Vec<String> = if options.display_properties.is_empty() {
            item_config
                .as_ref()
                .and_then(|c| c.identity_field.clone())
                .into_iter()
                .collect()
        } else {
            options.display_properties.clone()
        };

        let mut parts = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(child) = self.store.get_object(*id)? else {
                continue;
            };
            let mut values = Vec::with_capacity(display.len());
            for property in &display {
                let value = child.get(property);
                let text = match item_config.as_ref().and_then(|c| c.field(property)) {
                    Some(item_field) => self.converter.export_value(value, item_field)?,
                    None => value.identity_key().unwrap_or_default(),
                };
                if !text.is_empty() {
                    values.push(text);
                }
            }
            if values.is_empty() {
                values.push(child.id.to_string());
            }
            parts.push(values.join(" "));
        }

        Ok(parts.join(&options.delimiter))
    }

    /// 主表记录在明细表关联列中的文本
    fn identity_text(&self, config: &TypeConfiguration, record: &Record) -> ExchangeResult<String> {
        match config.identity() {
            Some(identity) => self.cell_text(record, identity),
            None => Ok(record.id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::ExchangeSettings;
    use crate::domain::types::ValueKind;
    use crate::importer::converter_registry::ConverterRegistry;
    use crate::repository::memory_store::InMemoryObjectStore;
    use crate::schema::field_config::CollectionOptions;
    use crate::schema::type_config::TypeDescriptor;

    fn registry(mode: CollectionOptions) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::new("Employee")
                    .sheet("员工")
                    .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号").unique())
                    .field(FieldConfiguration::new("salary", ValueKind::Decimal).column_name("薪资").hidden())
                    .field(
                        FieldConfiguration::new("skills", ValueKind::Collection("Skill".to_string()))
                            .column_name("技能")
                            .collection(mode),
                    ),
            )
            .unwrap();
        registry
            .register(
                TypeDescriptor::new("Skill")
                    .field(FieldConfiguration::new("name", ValueKind::Text).column_name("技能名称"))
                    .field(FieldConfiguration::new("level", ValueKind::Integer).column_name("等级"))
                    .field(
                        FieldConfiguration::new("owner", ValueKind::Reference("Employee".to_string()))
                            .column_name("员工"),
                    ),
            )
            .unwrap();
        registry
    }

    fn seed(store: &mut InMemoryObjectStore) -> Vec<Record> {
        let mut parents = Vec::new();
        for code in ["E100", "E101"] {
            let mut parent = Record::new("Employee").with("code", FieldValue::Text(code.to_string()));
            for (name, level) in [("Rust", 3), ("SQL", 2)] {
                let child = Record::new("Skill")
                    .with("name", FieldValue::Text(name.to_string()))
                    .with("level", FieldValue::Integer(level))
                    .with("owner", FieldValue::Reference(parent.id));
                parent.append_child("skills", child.id);
                store.seed(child);
            }
            store.seed(parent.clone());
            parents.push(parent);
        }
        parents
    }

    fn compose(mode: CollectionOptions) -> TabularDocument {
        let registry = registry(mode);
        let settings = ExchangeSettings::default();
        let converters = ConverterRegistry::new();
        let mut store = InMemoryObjectStore::new();
        let records = seed(&mut store);

        let composer = ExportComposer::new(&registry, ValueConverter::new(&settings, &converters), &store);
        let config = registry.get("Employee").unwrap();
        composer.compose(&config, &records, None).unwrap()
    }

    #[test]
    fn test_multi_sheet_export_shape() {
        let document = compose(CollectionOptions::multi_sheet());

        let main = document.main_sheet().unwrap();
        assert_eq!(main.name, "员工");
        assert_eq!(main.headers, vec!["工号"]);
        assert_eq!(main.rows.len(), 2);

        let detail = document.sheet("技能明细").unwrap();
        assert_eq!(detail.headers, vec!["所属工号", "技能名称", "等级"]);
        assert_eq!(detail.rows.len(), 4);
        assert_eq!(detail.rows[0], vec!["E100", "Rust", "3"]);
        assert_eq!(detail.rows[3][0], "E101");
    }

    #[test]
    fn test_summary_and_count_modes() {
        let document = compose(CollectionOptions::summary("; ", &["name", "level"]));
        let main = document.main_sheet().unwrap();
        assert_eq!(main.headers, vec!["工号", "技能"]);
        assert_eq!(main.rows[0][1], "Rust 3; SQL 2");
        assert_eq!(document.sheets.len(), 1);

        let document = compose(CollectionOptions::count());
        assert_eq!(document.main_sheet().unwrap().rows[1][1], "2");
    }
}
