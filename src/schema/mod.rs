// ==========================================
// 表格数据交换引擎 - 类型配置层
// ==========================================
// 职责: 记录类型的声明式字段映射，注册时解析并缓存
// ==========================================

pub mod field_config;
pub mod registry;
pub mod resolver;
pub mod type_config;

pub use field_config::{CollectionOptions, FieldConfiguration, ReferenceOptions, ValidationRule};
pub use registry::TypeRegistry;
pub use resolver::ConfigurationResolver;
pub use type_config::{TypeConfiguration, TypeDescriptor};
