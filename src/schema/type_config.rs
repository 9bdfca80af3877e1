// ==========================================
// 表格数据交换引擎 - 类型配置
// ==========================================
// TypeDescriptor: 注册时书写的声明（类型名 + 类级设置 + 字段列表）
// TypeConfiguration: resolver 校验、排序、确定标识字段后的只读结果
// 生命周期: TypeConfiguration 进程内缓存，跨调用共享
// ==========================================

use crate::domain::types::{ImportMode, ValidationMode, ValueKind};
use crate::schema::field_config::FieldConfiguration;

// ==========================================
// TypeDescriptor - 类型声明
// ==========================================
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub sheet_name: Option<String>,
    pub import_enabled: bool,
    pub export_enabled: bool,
    pub default_import_mode: ImportMode,
    pub validation_mode: ValidationMode,
    pub header_row: usize,             // 表头所在行（1 起）
    pub data_start_row: Option<usize>, // 数据起始行（1 起），默认紧随表头
    pub default_identity: Option<String>,
    pub fields: Vec<FieldConfiguration>,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            sheet_name: None,
            import_enabled: true,
            export_enabled: true,
            default_import_mode: ImportMode::CreateOrUpdate,
            validation_mode: ValidationMode::Lenient,
            header_row: 1,
            data_start_row: None,
            default_identity: None,
            fields: Vec::new(),
        }
    }

    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    pub fn import_mode(mut self, mode: ImportMode) -> Self {
        self.default_import_mode = mode;
        self
    }

    pub fn strict(mut self) -> Self {
        self.validation_mode = ValidationMode::Strict;
        self
    }

    pub fn rows(mut self, header_row: usize, data_start_row: usize) -> Self {
        self.header_row = header_row;
        self.data_start_row = Some(data_start_row);
        self
    }

    pub fn identity(mut self, property: impl Into<String>) -> Self {
        self.default_identity = Some(property.into());
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

    pub fn field(mut self, field: FieldConfiguration) -> Self {
        self.fields.push(field);
        self
    }
}

// ==========================================
// TypeConfiguration - 解析后的类型配置
// ==========================================
#[derive(Debug, Clone)]
pub struct TypeConfiguration {
    pub type_name: String,
    pub sheet_name: String,
    pub import_enabled: bool,
    pub export_enabled: bool,
    pub default_import_mode: ImportMode,
    pub validation_mode: ValidationMode,
    pub header_row: usize,
    pub data_start_row: usize,
    pub fields: Vec<FieldConfiguration>, // 已按 effective_order 稳定排序
    pub identity_field: Option<String>,
}

impl TypeConfiguration {
    pub fn field(&self, property: &str) -> Option<&FieldConfiguration> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// 参与导入的标量字段（集合字段由明细表处理）
    pub fn import_fields(&self) -> impl Iterator<Item = &FieldConfiguration> {
        self.fields
            .iter()
            .filter(|f| f.import_enabled && !f.is_collection())
    }

    /// 参与导出的字段（启用且未隐藏）
    pub fn export_fields(&self) -> impl Iterator<Item = &FieldConfiguration> {
        self.fields.iter().filter(|f| f.export_enabled && !f.hidden)
    }

    /// 主表导出列（多表模式的集合字段拆到明细表）
    pub fn main_sheet_fields(&self) -> impl Iterator<Item = &FieldConfiguration> {
        self.export_fields().filter(|f| !f.is_multi_sheet())
    }

    /// 以多工作表方式交换的集合字段
    pub fn multi_sheet_collections(&self) -> impl Iterator<Item = &FieldConfiguration> {
        self.fields.iter().filter(|f| f.is_multi_sheet())
    }

    pub fn identity(&self) -> Option<&FieldConfiguration> {
        self.identity_field.as_deref().and_then(|p| self.field(p))
    }

    /// 指向父类型的回指引用字段（声明类型等于父类型）
    pub fn back_reference_to(&self, parent_type: &str) -> Option<&FieldConfiguration> {
        self.fields
            .iter()
            .find(|f| matches!(&f.kind, ValueKind::Reference(target) if target == parent_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = TypeDescriptor::new("Employee")
            .sheet("员工")
            .strict()
            .rows(2, 4)
            .identity("code")
            .field(FieldConfiguration::new("code", ValueKind::Text));

        assert_eq!(descriptor.sheet_name.as_deref(), Some("员工"));
        assert_eq!(descriptor.validation_mode, ValidationMode::Strict);
        assert_eq!(descriptor.header_row, 2);
        assert_eq!(descriptor.data_start_row, Some(4));
        assert_eq!(descriptor.fields.len(), 1);
    }
}
