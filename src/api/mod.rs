// ==========================================
// 表格数据交换引擎 - API 层
// ==========================================
// 职责: 面向调用方的导入/导出入口
// ==========================================

pub mod exchange_api;

// 重导出核心类型
pub use exchange_api::DataExchangeApi;
