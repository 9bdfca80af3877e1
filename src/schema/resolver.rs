// ==========================================
// 表格数据交换引擎 - 配置解析器
// ==========================================
// 职责: TypeDescriptor -> TypeConfiguration
// 步骤:
//   1. 计算有效排序（列序号 × 1000 > 显式排序 > 声明顺序），稳定排序
//   2. 编译校验正则
//   3. 校验列名/列序号唯一性与引用/集合配置
//   4. 确定标识字段（唯一字段 > 默认标识 > 常用属性名）
// 红线: 配置错误在注册时一次性报告，不延后到导入时
// ==========================================

use crate::domain::types::ValueKind;
use crate::error::{ExchangeError, ExchangeResult};
use crate::schema::type_config::{TypeConfiguration, TypeDescriptor};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 列序号放大倍数，保证显式列序号优先于排序号
const COLUMN_INDEX_SCALE: i64 = 1000;

/// 标识字段启发式候选（按优先级，忽略大小写）
pub const IDENTITY_HEURISTICS: &[&str] = &["Name", "Title", "Code", "Number", "Key"];

pub struct ConfigurationResolver;

impl ConfigurationResolver {
    /// 解析类型声明
    ///
    /// # 返回
    /// - Ok(TypeConfiguration)
    /// - Err(ExchangeError::Configuration): 列出全部配置问题
    pub fn resolve(descriptor: TypeDescriptor) -> ExchangeResult<TypeConfiguration> {
        let TypeDescriptor {
            type_name,
            sheet_name,
            import_enabled,
            export_enabled,
            default_import_mode,
            validation_mode,
            header_row,
            data_start_row,
            default_identity,
            mut fields,
        } = descriptor;

        let mut problems = Vec::new();

        if type_name.trim().is_empty() {
            problems.push("类型名不能为空".to_string());
        }
        if header_row == 0 {
            problems.push("表头行号从 1 开始".to_string());
        }

        // 1. 有效排序
        for (i, field) in fields.iter_mut().enumerate() {
            field.declaration_index = i;
            field.effective_order = match (field.column_index, field.sort_order) {
                (Some(index), _) => index as i64 * COLUMN_INDEX_SCALE,
                (None, Some(order)) => order,
                (None, None) => i as i64,
            };
        }
        fields.sort_by_key(|f| (f.effective_order, f.declaration_index));

        // 2. 正则
        for field in fields.iter_mut() {
            if let Some(rule) = field.validation.as_mut() {
                match Regex::new(&rule.pattern) {
                    Ok(re) => rule.compiled = Some(re),
                    Err(e) => problems.push(format!(
                        "字段 {} 的校验正则无效: {}",
                        field.property, e
                    )),
                }
            }
        }

        // 3. 唯一性与扩展配置
        let mut properties: HashSet<&str> = HashSet::new();
        let mut columns: HashMap<String, &str> = HashMap::new();
        let mut indices: HashMap<usize, &str> = HashMap::new();

        for field in &fields {
            if field.property.trim().is_empty() {
                problems.push("属性名不能为空".to_string());
                continue;
            }
            if !properties.insert(field.property.as_str()) {
                problems.push(format!("属性重复声明: {}", field.property));
            }

            if !field.import_enabled && !field.export_enabled {
                continue;
            }

            let column_key = field.column().trim().to_lowercase();
            if let Some(other) = columns.insert(column_key, field.property.as_str()) {
                problems.push(format!(
                    "列名重复: {} ({} / {})",
                    field.column(),
                    other,
                    field.property
                ));
            }

            if let Some(index) = field.column_index {
                if let Some(other) = indices.insert(index, field.property.as_str()) {
                    problems.push(format!(
                        "列序号重复: {} ({} / {})",
                        index, other, field.property
                    ));
                }
            }

            if field.reference.is_some() && field.reference_target().is_none() {
                problems.push(format!("字段 {} 配置了引用查找但不是引用类型", field.property));
            }
            if field.collection.is_some() && !field.is_collection() {
                problems.push(format!("字段 {} 配置了集合选项但不是集合类型", field.property));
            }
            if let ValueKind::Enum(literals) = &field.kind {
                if literals.is_empty() {
                    problems.push(format!("枚举字段 {} 未声明任何取值", field.property));
                }
            }
        }

        if let Some(identity) = default_identity.as_deref() {
            if !properties.contains(identity) {
                problems.push(format!("默认标识字段不存在: {}", identity));
            }
        }

        if !problems.is_empty() {
            warn!(type_name = %type_name, problems = problems.len(), "类型配置校验失败");
            return Err(ExchangeError::Configuration { type_name, problems });
        }

        // 4. 标识字段
        let identity_field = fields
            .iter()
            .find(|f| f.unique && !f.is_collection())
            .map(|f| f.property.clone())
            .or(default_identity)
            .or_else(|| {
                IDENTITY_HEURISTICS.iter().find_map(|candidate| {
                    fields
                        .iter()
                        .find(|f| !f.is_collection() && f.property.eq_ignore_ascii_case(candidate))
                        .map(|f| f.property.clone())
                })
            });

        debug!(
            type_name = %type_name,
            fields = fields.len(),
            identity = ?identity_field,
            "类型配置解析完成"
        );

        let data_start_row = data_start_row.unwrap_or(header_row + 1);
        let sheet_name = sheet_name.unwrap_or_else(|| type_name.clone());

        Ok(TypeConfiguration {
            type_name,
            sheet_name,
            import_enabled,
            export_enabled,
            default_import_mode,
            validation_mode,
            header_row,
            data_start_row,
            fields,
            identity_field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field_config::FieldConfiguration;

    #[test]
    fn test_effective_order() {
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .field(FieldConfiguration::new("a", ValueKind::Text).index(1))
                .field(FieldConfiguration::new("b", ValueKind::Text).order(5))
                .field(FieldConfiguration::new("c", ValueKind::Text))
                .field(FieldConfiguration::new("d", ValueKind::Text).index(0)),
        )
        .unwrap();

        let order: Vec<&str> = config.fields.iter().map(|f| f.property.as_str()).collect();
        // c: 声明序 2, d: 0, b: 5, a: 1000
        assert_eq!(order, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_duplicate_columns_are_configuration_errors() {
        let result = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号").index(0))
                .field(FieldConfiguration::new("alt_code", ValueKind::Text).column_name("工号"))
                .field(FieldConfiguration::new("name", ValueKind::Text).index(0)),
        );

        match result {
            Err(ExchangeError::Configuration { problems, .. }) => {
                assert_eq!(problems.len(), 2);
                assert!(problems.iter().any(|p| p.contains("列名重复")));
                assert!(problems.iter().any(|p| p.contains("列序号重复")));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_fields_do_not_conflict() {
        let result = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号"))
                .field(
                    FieldConfiguration::new("legacy", ValueKind::Text)
                        .column_name("工号")
                        .no_import()
                        .no_export(),
                ),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let result = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .field(FieldConfiguration::new("code", ValueKind::Text).pattern("[A-Z", "格式错误")),
        );
        assert!(matches!(result, Err(ExchangeError::Configuration { .. })));
    }

    #[test]
    fn test_identity_resolution_priority() {
        // 唯一字段优先
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .identity("name")
                .field(FieldConfiguration::new("name", ValueKind::Text))
                .field(FieldConfiguration::new("code", ValueKind::Text).unique()),
        )
        .unwrap();
        assert_eq!(config.identity_field.as_deref(), Some("code"));

        // 其次默认标识
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee")
                .identity("email")
                .field(FieldConfiguration::new("name", ValueKind::Text))
                .field(FieldConfiguration::new("email", ValueKind::Text)),
        )
        .unwrap();
        assert_eq!(config.identity_field.as_deref(), Some("email"));

        // 最后常用属性名
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Department")
                .field(FieldConfiguration::new("remark", ValueKind::Text))
                .field(FieldConfiguration::new("Title", ValueKind::Text)),
        )
        .unwrap();
        assert_eq!(config.identity_field.as_deref(), Some("Title"));

        // 无法确定
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Note").field(FieldConfiguration::new("remark", ValueKind::Text)),
        )
        .unwrap();
        assert!(config.identity_field.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = ConfigurationResolver::resolve(
            TypeDescriptor::new("Employee").field(FieldConfiguration::new("code", ValueKind::Text)),
        )
        .unwrap();
        assert_eq!(config.sheet_name, "Employee");
        assert_eq!(config.data_start_row, 2);
    }
}
