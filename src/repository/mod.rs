// ==========================================
// 表格数据交换引擎 - 对象存储层
// ==========================================
// 职责: 导入/导出所依赖的持久化协作者
// 红线: 存储层不含导入规则，只做对象 CRUD 与工作单元提交
// ==========================================

pub mod error;
pub mod memory_store;
pub mod object_store;
pub mod sqlite_store;

// 重导出
pub use error::{StoreError, StoreResult};
pub use memory_store::InMemoryObjectStore;
pub use object_store::{Criteria, PersistentObjectStore};
pub use sqlite_store::SqliteObjectStore;
