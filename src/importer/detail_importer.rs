// ==========================================
// 表格数据交换引擎 - 明细表导入
// ==========================================
// 职责: 多工作表文件中，按集合字段导入明细行并挂到主表对象
// 明细表定位: 显式 detail_sheet_name，否则 "<集合列名>明细"；
//             找不到原名时按写出规则清洗后的表名再找，仍缺失记警告
// 关联值匹配: 原文，或按主表标识字段的导入规则转换后的标识文本
// 关联列定位: 显式 relation_field -> 主表标识列启发式 -> 常用关联列名
// 孤儿行: 关联值找不到本轮主表对象时只记警告，不计入统计
// 挂接: 子对象回指字段（声明类型为主表类型）+ 主表集合追加
// ==========================================

use crate::domain::outcome::{RowRecord, SheetRows};
use crate::domain::types::ErrorKind;
use crate::domain::value::{FieldValue, Record, RecordId};
use crate::exporter::file_writer::clean_sheet_name;
use crate::importer::file_parser::ParsedDocument;
use crate::importer::reconciler::{ImportReconciler, RowResult};
use crate::repository::error::StoreResult;
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use crate::schema::field_config::FieldConfiguration;
use crate::schema::type_config::TypeConfiguration;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 明细表默认后缀
pub const DETAIL_SHEET_SUFFIX: &str = "明细";

/// 导出时关联列的前缀（所属 + 主表标识列名）
pub const RELATION_COLUMN_PREFIX: &str = "所属";

// 常用关联列名
const COMMON_RELATION_COLUMNS: &[&str] = &[
    "所属", "父级", "主表", "关联", "Parent", "ParentId", "Master",
];

/// 集合字段对应的明细表名
pub fn detail_sheet_name(field: &FieldConfiguration) -> String {
    field
        .collection
        .as_ref()
        .and_then(|c| c.detail_sheet_name.clone())
        .unwrap_or_else(|| format!("{}{}", field.column(), DETAIL_SHEET_SUFFIX))
}

/// 在明细表表头中定位关联列
pub fn locate_relation_column(
    sheet: &SheetRows,
    field: &FieldConfiguration,
    parent: &TypeConfiguration,
) -> Option<String> {
    let find = |name: &str| -> Option<String> {
        let name = name.trim();
        sheet
            .headers
            .iter()
            .find(|h| h.trim().eq_ignore_ascii_case(name))
            .cloned()
    };

    // 1. 显式配置
    if let Some(explicit) = field.collection.as_ref().and_then(|c| c.relation_field.as_deref()) {
        if let Some(header) = find(explicit) {
            return Some(header);
        }
    }

    // 2. 主表标识列
    if let Some(identity) = parent.identity() {
        let candidates = [
            format!("{}{}", RELATION_COLUMN_PREFIX, identity.column()),
            identity.column().to_string(),
            identity.property.clone(),
            format!("{}{}", parent.type_name, identity.property),
        ];
        for candidate in &candidates {
            if let Some(header) = find(candidate) {
                return Some(header);
            }
        }
        if let Some(header) = sheet
            .headers
            .iter()
            .find(|h| h.trim().ends_with(identity.column().trim()))
        {
            return Some(header.clone());
        }
    }

    // 3. 常用关联列名
    COMMON_RELATION_COLUMNS.iter().find_map(|name| {
        sheet
            .headers
            .iter()
            .find(|h| {
                let h = h.trim();
                h.eq_ignore_ascii_case(name) || h.starts_with(name)
            })
            .cloned()
    })
}

impl<'a, S: PersistentObjectStore + ?Sized> ImportReconciler<'a, S> {
    /// 导入主表类型的全部明细表
    ///
    /// # 参数
    /// - parents: 本轮主表中 新增/更新/已存在 的对象，按标识文本索引
    pub(crate) fn import_details(
        &mut self,
        config: &TypeConfiguration,
        document: &ParsedDocument,
        parents: &HashMap<String, RecordId>,
    ) {
        let collections: Vec<FieldConfiguration> = config
            .multi_sheet_collections()
            .filter(|f| f.import_enabled)
            .cloned()
            .collect();

        for field in &collections {
            if self.outcome.aborted {
                break;
            }

            let sheet_name = detail_sheet_name(field);
            let Some(sheet) = document
                .find_sheet(&sheet_name)
                .or_else(|| document.find_sheet(&clean_sheet_name(&sheet_name)))
            else {
                debug!(sheet = %sheet_name, field = %field.property, "未找到明细表，跳过");
                self.warning(
                    0,
                    &sheet_name,
                    Some(field.property.as_str()),
                    ErrorKind::ParseError,
                    format!("文件中没有明细表 {}，{} 未导入", sheet_name, field.column()),
                );
                continue;
            };

            let Some(item_type) = field.item_type() else {
                continue;
            };
            let item_config = match self.registry.get(item_type) {
                Ok(c) => c,
                Err(e) => {
                    self.error(0, &sheet.name, Some(field.property.as_str()), ErrorKind::SystemError, e.to_string());
                    continue;
                }
            };

            let Some(relation_column) = locate_relation_column(sheet, field, config) else {
                warn!(sheet = %sheet.name, "明细表中找不到关联列");
                self.error(
                    0,
                    &sheet.name,
                    Some(field.property.as_str()),
                    ErrorKind::SystemError,
                    format!("明细表 {} 中找不到关联列", sheet.name),
                );
                continue;
            };

            info!(
                sheet = %sheet.name,
                item_type = %item_type,
                relation_column = %relation_column,
                rows = sheet.rows.len(),
                "开始导入明细表"
            );
            self.import_detail_sheet(config, field, &item_config, sheet, &relation_column, parents);
        }
    }

    fn import_detail_sheet(
        &mut self,
        parent_config: &TypeConfiguration,
        field: &FieldConfiguration,
        item_config: &TypeConfiguration,
        sheet: &SheetRows,
        relation_column: &str,
        parents: &HashMap<String, RecordId>,
    ) {
        let back_ref = item_config
            .back_reference_to(&parent_config.type_name)
            .map(|f| f.property.clone());

        for row in &sheet.rows {
            if self.outcome.aborted {
                break;
            }

            let relation_value = row.get(relation_column).trim().to_string();
            let Some(parent_id) = self.parent_for(parent_config, parents, &relation_value) else {
                // 孤儿行: 只警告，不计数
                self.warning(
                    row.row_number,
                    &sheet.name,
                    Some(relation_column),
                    ErrorKind::LookupError,
                    format!("关联值 {} 找不到对应的主表记录", relation_value),
                );
                continue;
            };

            self.outcome.total_rows += 1;
            let result = self.import_detail_row(item_config, field, row, &sheet.name, parent_id, back_ref.as_deref());
            self.finish_row(result);
        }
    }

    /// 关联列文本 -> 本轮主表对象
    ///
    /// 先按原文匹配；导出时标识列按格式显示（千分位、日期格式、枚举标签等），
    /// 因此再按主表标识字段的导入规则转换后匹配
    fn parent_for(
        &self,
        parent_config: &TypeConfiguration,
        parents: &HashMap<String, RecordId>,
        relation_value: &str,
    ) -> Option<RecordId> {
        if relation_value.is_empty() {
            return None;
        }
        if let Some(&id) = parents.get(relation_value) {
            return Some(id);
        }
        let identity = parent_config.identity()?;
        let converted = self.converter.import_value(relation_value, identity);
        if !converted.success {
            return None;
        }
        converted
            .value
            .identity_key()
            .and_then(|key| parents.get(&key).copied())
    }

    fn import_detail_row(
        &mut self,
        item_config: &TypeConfiguration,
        field: &FieldConfiguration,
        row: &RowRecord,
        sheet: &str,
        parent_id: RecordId,
        back_ref: Option<&str>,
    ) -> RowResult {
        let Some(mapped) = self.map_row(item_config, row, sheet, back_ref) else {
            return RowResult::Failed;
        };

        // 标识按 (明细标识值, 主表对象) 限定范围
        let existing = match mapped.identity.as_ref() {
            Some(value) => match self.find_child(item_config, &field.property, parent_id, back_ref, value) {
                Ok(found) => found,
                Err(e) => {
                    self.error(row.row_number, sheet, None, ErrorKind::SystemError, format!("查找明细失败: {}", e));
                    return RowResult::Failed;
                }
            },
            None => None,
        };

        let result = self.reconcile(item_config, mapped, existing, row.row_number, sheet);

        if let RowResult::Created(id) | RowResult::Updated(id) = result {
            if let Err(e) = self.attach_child(&field.property, parent_id, id, back_ref) {
                self.error(row.row_number, sheet, None, ErrorKind::SystemError, format!("挂接明细失败: {}", e));
                return RowResult::Failed;
            }
        }
        result
    }

    /// 在主表对象范围内按标识查找明细
    fn find_child(
        &self,
        item_config: &TypeConfiguration,
        collection: &str,
        parent_id: RecordId,
        back_ref: Option<&str>,
        value: &FieldValue,
    ) -> StoreResult<Option<Record>> {
        let Some(identity) = item_config.identity() else {
            return Ok(None);
        };
        let key = value.identity_key();

        if let Some(parent) = self.store.get_object(parent_id)? {
            for child_id in parent.get(collection).as_collection() {
                if let Some(child) = self.store.get_object(*child_id)? {
                    if child.get(&identity.property).identity_key() == key {
                        return Ok(Some(child));
                    }
                }
            }
        }

        if let Some(back_ref) = back_ref {
            let criteria = Criteria::And(vec![
                Criteria::equals(identity.property.clone(), value.clone()),
                Criteria::equals(back_ref.to_string(), FieldValue::Reference(parent_id)),
            ]);
            return Ok(self
                .store
                .get_objects(&item_config.type_name, &criteria)?
                .into_iter()
                .next());
        }

        Ok(None)
    }

    fn attach_child(
        &mut self,
        collection: &str,
        parent_id: RecordId,
        child_id: RecordId,
        back_ref: Option<&str>,
    ) -> StoreResult<()> {
        if let Some(back_ref) = back_ref {
            if let Some(mut child) = self.store.get_object(child_id)? {
                child.set(back_ref, FieldValue::Reference(parent_id));
                self.store.save_object(child)?;
            }
        }

        if let Some(mut parent) = self.store.get_object(parent_id)? {
            if !parent.get(collection).as_collection().contains(&child_id) {
                parent.append_child(collection, child_id);
                self.store.save_object(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ValueKind;
    use crate::schema::field_config::CollectionOptions;
    use crate::schema::registry::TypeRegistry;
    use crate::schema::type_config::TypeDescriptor;

    fn employee() -> TypeConfiguration {
        let mut registry = TypeRegistry::new();
        let config = registry
            .register(
                TypeDescriptor::new("Employee")
                    .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号").unique())
                    .field(
                        FieldConfiguration::new("skills", ValueKind::Collection("Skill".to_string()))
                            .column_name("技能")
                            .collection(CollectionOptions::multi_sheet()),
                    ),
            )
            .unwrap();
        (*config).clone()
    }

    fn sheet(headers: &[&str]) -> SheetRows {
        SheetRows {
            name: "技能明细".to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_detail_sheet_name_convention() {
        let config = employee();
        let field = config.field("skills").unwrap();
        assert_eq!(detail_sheet_name(field), "技能明细");

        let explicit = field
            .clone()
            .collection(CollectionOptions::multi_sheet().detail_sheet("Skills"));
        assert_eq!(detail_sheet_name(&explicit), "Skills");
    }

    #[test]
    fn test_relation_column_discovery() {
        let config = employee();
        let field = config.field("skills").unwrap();

        assert_eq!(
            locate_relation_column(&sheet(&["所属工号", "技能名称"]), field, &config).as_deref(),
            Some("所属工号")
        );
        assert_eq!(
            locate_relation_column(&sheet(&["员工工号", "技能名称"]), field, &config).as_deref(),
            Some("员工工号")
        );
        assert_eq!(
            locate_relation_column(&sheet(&["技能名称", "ParentId"]), field, &config).as_deref(),
            Some("ParentId")
        );
        assert_eq!(locate_relation_column(&sheet(&["技能名称"]), field, &config), None);

        let explicit = field
            .clone()
            .collection(CollectionOptions::multi_sheet().relation_field("员工"));
        assert_eq!(
            locate_relation_column(&sheet(&["员工", "所属工号"]), &explicit, &config).as_deref(),
            Some("员工")
        );
    }
}
