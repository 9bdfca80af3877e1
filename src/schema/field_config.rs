// ==========================================
// 表格数据交换引擎 - 字段配置
// ==========================================
// 职责: 单个属性与表格列之间的声明式映射
// 用法: FieldConfiguration::new("code", ValueKind::Text).column_name("工号").required().unique()
// 生命周期: 注册类型时由 ConfigurationResolver 补齐派生项后冻结
// ==========================================

use crate::domain::types::{CollectionExportMode, ValueKind};
use regex::Regex;

// ==========================================
// ReferenceOptions - 引用/字典字段
// ==========================================
// 导入时按 match_field 在目标类型中查找；category_field/category
// 用于同一字典表内按类别区分（如 类别=部门）
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceOptions {
    pub match_field: String,
    pub category_field: Option<String>,
    pub category: Option<String>,
    pub auto_create: bool,
}

impl ReferenceOptions {
    pub fn match_on(field: impl Into<String>) -> Self {
        Self {
            match_field: field.into(),
            category_field: None,
            category: None,
            auto_create: false,
        }
    }

    pub fn category(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.category_field = Some(field.into());
        self.category = Some(value.into());
        self
    }

    pub fn auto_create(mut self) -> Self {
        self.auto_create = true;
        self
    }
}

// ==========================================
// CollectionOptions - 子对象集合字段
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOptions {
    pub mode: CollectionExportMode,
    pub delimiter: String,
    pub display_properties: Vec<String>, // 摘要模式拼接的子属性；为空时取子类型标识字段
    pub detail_sheet_name: Option<String>,
    pub relation_field: Option<String>,  // 明细表中指向主表的列名
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            mode: CollectionExportMode::Summary,
            delimiter: ", ".to_string(),
            display_properties: Vec::new(),
            detail_sheet_name: None,
            relation_field: None,
        }
    }
}

impl CollectionOptions {
    pub fn summary(delimiter: &str, display_properties: &[&str]) -> Self {
        Self {
            mode: CollectionExportMode::Summary,
            delimiter: delimiter.to_string(),
            display_properties: display_properties.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn count() -> Self {
        Self {
            mode: CollectionExportMode::Count,
            ..Self::default()
        }
    }

    pub fn multi_sheet() -> Self {
        Self {
            mode: CollectionExportMode::MultiSheet,
            ..Self::default()
        }
    }

    pub fn detail_sheet(mut self, name: impl Into<String>) -> Self {
        self.detail_sheet_name = Some(name.into());
        self
    }

    pub fn relation_field(mut self, column: impl Into<String>) -> Self {
        self.relation_field = Some(column.into());
        self
    }
}

// ==========================================
// ValidationRule - 正则校验
// ==========================================
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub pattern: String,
    pub message: String,
    pub(crate) compiled: Option<Regex>, // 由 resolver 编译
}

impl ValidationRule {
    pub fn regex(&self) -> Option<&Regex> {
        self.compiled.as_ref()
    }
}

// ==========================================
// FieldConfiguration
// ==========================================
#[derive(Debug, Clone)]
pub struct FieldConfiguration {
    // ===== 标识 =====
    pub property: String,
    pub kind: ValueKind,

    // ===== 列映射 =====
    pub column_name: Option<String>, // 未指定时取属性名
    pub column_index: Option<usize>, // 0 起的列序号，只决定导出列顺序
    pub sort_order: Option<i64>,

    // ===== 规则 =====
    pub required: bool,
    pub unique: bool,   // 作为标识字段
    pub nullable: bool, // 值类型允许为空
    pub format: Option<String>,
    pub validation: Option<ValidationRule>,
    pub null_value: Option<String>, // 空值替换

    // ===== 开关 =====
    pub import_enabled: bool,
    pub export_enabled: bool,
    pub hidden: bool,

    // ===== 扩展 =====
    pub import_converter: Option<String>,
    pub export_converter: Option<String>,
    pub reference: Option<ReferenceOptions>,
    pub collection: Option<CollectionOptions>,

    // ===== 派生项（resolver 填充）=====
    pub(crate) declaration_index: usize,
    pub(crate) effective_order: i64,
}

impl FieldConfiguration {
    pub fn new(property: impl Into<String>, kind: ValueKind) -> Self {
        let collection = match kind {
            ValueKind::Collection(_) => Some(CollectionOptions::default()),
            _ => None,
        };

        Self {
            property: property.into(),
            kind,
            column_name: None,
            column_index: None,
            sort_order: None,
            required: false,
            unique: false,
            nullable: false,
            format: None,
            validation: None,
            null_value: None,
            import_enabled: true,
            export_enabled: true,
            hidden: false,
            import_converter: None,
            export_converter: None,
            reference: None,
            collection,
            declaration_index: 0,
            effective_order: 0,
        }
    }

    // ===== 构建方法 =====

    pub fn column_name(mut self, name: impl Into<String>) -> Self {
        self.column_name = Some(name.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.column_index = Some(index);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.validation = Some(ValidationRule {
            pattern: pattern.into(),
            message: message.into(),
            compiled: None,
        });
        self
    }

    pub fn null_value(mut self, value: impl Into<String>) -> Self {
        self.null_value = Some(value.into());
        self
    }

    pub fn no_import(mut self) -> Self {
        self.import_enabled = false;
        self
    }

    pub fn no_export(mut self) -> Self {
        self.export_enabled = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn import_converter(mut self, name: impl Into<String>) -> Self {
        self.import_converter = Some(name.into());
        self
    }

    pub fn export_converter(mut self, name: impl Into<String>) -> Self {
        self.export_converter = Some(name.into());
        self
    }

    pub fn lookup(mut self, options: ReferenceOptions) -> Self {
        self.reference = Some(options);
        self
    }

    pub fn collection(mut self, options: CollectionOptions) -> Self {
        self.collection = Some(options);
        self
    }

    // ===== 查询 =====

    /// 实际列名
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.property)
    }

    pub fn effective_order(&self) -> i64 {
        self.effective_order
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ValueKind::Collection(_))
    }

    pub fn is_multi_sheet(&self) -> bool {
        self.is_collection()
            && self
                .collection
                .as_ref()
                .map(|c| c.mode == CollectionExportMode::MultiSheet)
                .unwrap_or(false)
    }

    /// 引用目标类型
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Reference(target) => Some(target.as_str()),
            _ => None,
        }
    }

    /// 集合元素类型
    pub fn item_type(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Collection(item) => Some(item.as_str()),
            _ => None,
        }
    }

    /// 按列表格式解析的枚举显示映射（key=label;key=label）
    ///
    /// # 返回
    /// - Vec<(key, label)>，格式不含 '=' 时为空
    pub fn display_map(&self) -> Vec<(String, String)> {
        let Some(format) = self.format.as_deref() else {
            return Vec::new();
        };
        if !format.contains('=') {
            return Vec::new();
        }

        format
            .split(';')
            .filter_map(|pair| {
                let (key, label) = pair.split_once('=')?;
                let key = key.trim();
                let label = label.trim();
                if key.is_empty() {
                    None
                } else {
                    Some((key.to_string(), label.to_string()))
                }
            })
            .collect()
    }
}
