// ==========================================
// SQLite 存储 + 配置读取 集成测试
// ==========================================
// 测试目标: 导入结果落库、工作单元回滚、config_kv 覆盖引擎配置
// ==========================================


use tabular_exchange::config::{config_keys, ConfigManager, ImportOptions};
use tabular_exchange::domain::{FieldValue, ImportMode, ValidationMode};
use tabular_exchange::importer::{ConverterRegistry, TabularImporter};
use tabular_exchange::logging;
use tabular_exchange::repository::{Criteria, PersistentObjectStore, SqliteObjectStore};
use tabular_exchange::DataExchangeApi;
use test_helpers::{create_test_db, employee_registry, EMPLOYEE_CSV, EMPLOYEE_HEADER};

async fn create_sqlite_api(db_path: &str) -> DataExchangeApi<SqliteObjectStore> {
    let store = SqliteObjectStore::new(db_path).expect("打开对象存储失败");
    let config = ConfigManager::new(db_path).expect("打开配置失败");
    DataExchangeApi::with_config_reader(store, employee_registry(), ConverterRegistry::new(), &config)
        .await
        .expect("创建 API 失败")
}

fn employees_in(db_path: &str) -> Vec<String> {
    let store = SqliteObjectStore::new(db_path).expect("重新打开对象存储失败");
    let mut codes: Vec<String> = store
        .get_objects("Employee", &Criteria::All)
        .expect("查询失败")
        .into_iter()
        .filter_map(|r| r.get("code").as_text().map(str::to_string))
        .collect();
    codes.sort();
    codes
}

#[tokio::test]
async fn test_import_is_persisted_to_sqlite() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建临时数据库失败");
    let api = create_sqlite_api(&db_path).await;

    let outcome = api
        .import_bytes("Employee", EMPLOYEE_CSV.as_bytes(), &ImportOptions::default())
        .await
        .expect("导入失败");
    assert_eq!(outcome.created, 2);

    // 新连接可见
    assert_eq!(employees_in(&db_path), vec!["E100", "E101"]);

    let store = SqliteObjectStore::new(&db_path).expect("重新打开对象存储失败");
    let departments = store
        .get_objects("DictionaryItem", &Criteria::All)
        .expect("查询失败");
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0].get("name"), &FieldValue::Text("研发部".to_string()));
}

#[tokio::test]
async fn test_aborted_replace_all_leaves_database_untouched() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建临时数据库失败");
    let api = create_sqlite_api(&db_path).await;

    api.import_bytes("Employee", EMPLOYEE_CSV.as_bytes(), &ImportOptions::default())
        .await
        .expect("首次导入失败");

    let bytes = format!(
        "{}\nE300,孙八,男,2024-05-06,7000,是,研发部\nBAD,周九,男,2024-05-06,7000,是,研发部\n",
        EMPLOYEE_HEADER
    );
    let options = ImportOptions {
        validation_mode: Some(ValidationMode::Strict),
        ..ImportOptions::with_mode(ImportMode::ReplaceAll)
    };
    let outcome = api
        .import_bytes("Employee", bytes.as_bytes(), &options)
        .await
        .expect("导入调用失败");

    assert!(outcome.aborted);
    assert_eq!(employees_in(&db_path), vec!["E100", "E101"]);
    assert!(!api.store().lock().expect("存储锁中毒").has_pending_changes());
}

#[tokio::test]
async fn test_config_kv_overrides_settings() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建临时数据库失败");

    let config = ConfigManager::new(&db_path).expect("打开配置失败");
    config
        .set_global_config_value(config_keys::BOOL_TRUE_DISPLAY, "Y")
        .expect("写入配置失败");
    config
        .set_global_config_value(config_keys::BOOL_FALSE_DISPLAY, "N")
        .expect("写入配置失败");
    config
        .set_global_config_value(config_keys::DEFAULT_MAX_ERROR_COUNT, "1")
        .expect("写入配置失败");

    let api = create_sqlite_api(&db_path).await;
    assert_eq!(api.settings().bool_true_display, "Y");
    assert_eq!(api.settings().default_max_error_count, 1);

    let bytes = format!(
        "{}\nE100,张三,男,2023-03-01,8000,Y,研发部\nX1,甲,男,2023-03-01,8000,N,研发部\nE102,乙,男,2023-03-01,8000,N,研发部\n",
        EMPLOYEE_HEADER
    );
    let outcome = api
        .import_bytes("Employee", bytes.as_bytes(), &ImportOptions::default())
        .await
        .expect("导入失败");

    // 配置的错误上限为 1: 第一个失败行即终止
    assert!(outcome.aborted);
    assert_eq!(outcome.success_count, 1);
    assert_eq!(employees_in(&db_path), vec!["E100"]);

    let store = SqliteObjectStore::new(&db_path).expect("重新打开对象存储失败");
    let zhang = store
        .find_object("Employee", "code", &FieldValue::Text("E100".to_string()))
        .expect("查询失败")
        .expect("E100 不存在");
    assert_eq!(zhang.get("active"), &FieldValue::Boolean(true));
}
