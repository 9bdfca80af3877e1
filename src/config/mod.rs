// ==========================================
// 表格数据交换引擎 - 配置层
// ==========================================
// 职责: 引擎配置读取（config_kv 表）与单次调用选项
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod exchange_config_trait;
pub mod options;
pub mod settings;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use exchange_config_trait::ExchangeConfigReader;
pub use options::{ExportOptions, ImportOptions};
pub use settings::ExchangeSettings;
