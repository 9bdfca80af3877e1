// ==========================================
// 表格数据交换引擎 - 类型注册表
// ==========================================
// 职责: 启动时一次性注册所有可交换的记录类型
// 并发: 注册完成后只读，可通过 Arc 在调用间共享
// ==========================================

use crate::error::{ExchangeError, ExchangeResult};
use crate::schema::resolver::ConfigurationResolver;
use crate::schema::type_config::{TypeConfiguration, TypeDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeConfiguration>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析并注册类型（同名类型覆盖旧配置）
    pub fn register(&mut self, descriptor: TypeDescriptor) -> ExchangeResult<Arc<TypeConfiguration>> {
        let config = Arc::new(ConfigurationResolver::resolve(descriptor)?);
        info!(
            type_name = %config.type_name,
            sheet = %config.sheet_name,
            identity = ?config.identity_field,
            "注册交换类型"
        );
        self.types
            .insert(config.type_name.clone(), Arc::clone(&config));
        Ok(config)
    }

    pub fn get(&self, type_name: &str) -> ExchangeResult<Arc<TypeConfiguration>> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}
