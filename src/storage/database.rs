//! # 数据库模块
//!
//! `Database` 是命名的表注册中心：表名 -> `Arc<Table>`。
//! 注册中心自身带一把读写锁，与各表内部的锁相互独立，
//! 因此并发的建表/删表互相串行化，且任何核心操作最多只持一把表锁，
//! 不会产生跨表死锁。

use crate::db_error::{Error, Result};
use crate::storage::table::Table;
use crate::types::{Column, ValueType};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// 数据库级统计信息
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub name: String,
    pub table_count: usize,
    pub total_row_count: usize,
    pub total_memory_estimate: usize,
    /// 表名 -> 行数
    pub table_row_counts: Vec<(String, usize)>,
}

/// 命名的表集合
pub struct Database {
    name: String,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tables: RwLock::new(HashMap::new()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 建表并注册。表名已被占用返回 AlreadyExists
    pub fn create_table(
        &self,
        table_name: &str,
        columns: Vec<Column>,
        pk_column_name: &str,
    ) -> Result<Arc<Table>> {
        let mut tables = self.tables.write()?;
        if tables.contains_key(table_name) {
            return Err(Error::AlreadyExists(format!("table '{table_name}' already exists")));
        }
        let table = Arc::new(Table::new(table_name, columns, pk_column_name)?);
        tables.insert(table_name.to_string(), Arc::clone(&table));
        info!("表 '{table_name}' 已创建");
        Ok(table)
    }

    /// 用 (列名, 类型, 可空) 三元组建简单表。
    /// 主键列强制唯一且非空，忽略传入的可空标志
    pub fn create_simple_table(
        &self,
        table_name: &str,
        column_specs: &[(&str, ValueType, bool)],
        pk_column_name: &str,
    ) -> Result<Arc<Table>> {
        let mut columns = Vec::with_capacity(column_specs.len());
        for (col_name, col_type, nullable) in column_specs {
            let is_pk = *col_name == pk_column_name;
            let actual_nullable = if is_pk { false } else { *nullable };
            columns.push(Column::new(*col_name, *col_type, actual_nullable, is_pk, None)?);
        }
        self.create_table(table_name, columns, pk_column_name)
    }

    /// 按名字查表。未命中返回 None，不是错误
    pub fn get_table(&self, table_name: &str) -> Option<Arc<Table>> {
        self.tables.read().ok()?.get(table_name).cloned()
    }

    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.read().map(|t| t.contains_key(table_name)).unwrap_or(false)
    }

    /// 删表。返回表此前是否存在
    pub fn drop_table(&self, table_name: &str) -> Result<bool> {
        let removed = self.tables.write()?.remove(table_name).is_some();
        if removed {
            info!("表 '{table_name}' 已删除");
        }
        Ok(removed)
    }

    /// 全部表名，按字典序返回，保证遍历顺序与落盘文档的确定性
    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.read()?.keys().cloned().sorted().collect())
    }

    pub fn table_count(&self) -> Result<usize> {
        Ok(self.tables.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.tables.read()?.is_empty())
    }

    /// 移除所有表
    pub fn clear(&self) -> Result<()> {
        self.tables.write()?.clear();
        Ok(())
    }

    /// 用新的表集合整体替换注册中心（load 成功后一次性换入）
    pub(crate) fn replace_tables(&self, new_tables: HashMap<String, Arc<Table>>) -> Result<()> {
        *self.tables.write()? = new_tables;
        Ok(())
    }

    /// 按谓词筛选表名
    pub fn query_tables<F>(&self, predicate: F) -> Result<Vec<String>>
    where
        F: Fn(&str, &Table) -> bool,
    {
        let tables = self.tables.read()?;
        Ok(tables
            .iter()
            .filter(|(name, table)| predicate(name, table))
            .map(|(name, _)| name.clone())
            .sorted()
            .collect())
    }

    /// 聚合所有表的行数与内存估计
    pub fn stats(&self) -> Result<DatabaseStats> {
        let tables = self.tables.read()?;
        let mut stats = DatabaseStats {
            name: self.name.clone(),
            table_count: tables.len(),
            total_row_count: 0,
            total_memory_estimate: 0,
            table_row_counts: Vec::with_capacity(tables.len()),
        };
        for name in tables.keys().sorted() {
            let table_stats = tables[name].stats()?;
            stats.total_row_count += table_stats.row_count;
            stats.total_memory_estimate += table_stats.memory_usage_estimate;
            stats.table_row_counts.push((name.clone(), table_stats.row_count));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn specs() -> Vec<(&'static str, ValueType, bool)> {
        vec![("id", ValueType::Int32, true), ("name", ValueType::String, true)]
    }

    /// 单元测试：
    /// 建表/查表/重名/删表
    #[test]
    fn test_registry() -> Result<()> {
        let db = Database::new("testdb");
        assert!(db.is_empty()?);

        db.create_simple_table("users", &specs(), "id")?;
        assert!(db.has_table("users"));
        assert_eq!(db.table_count()?, 1);

        // 重名表
        let dup = db.create_simple_table("users", &specs(), "id");
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        assert!(db.get_table("users").is_some());
        assert!(db.get_table("ghost").is_none());

        assert!(db.drop_table("users")?);
        assert!(!db.drop_table("users")?);
        assert!(db.is_empty()?);
        Ok(())
    }

    /// 单元测试：
    /// 简单建表强制主键列唯一且非空
    #[test]
    fn test_simple_table_forces_pk_flags() -> Result<()> {
        let db = Database::new("testdb");
        // id 列声明为可空，建表时被强制非空
        let table = db.create_simple_table("users", &specs(), "id")?;
        let pk = &table.schema().columns()[0];
        assert!(pk.is_unique());
        assert!(!pk.is_nullable());

        let bad = table.insert_values(vec![Value::Null, Value::from("x")]);
        assert!(bad.is_err());
        Ok(())
    }

    /// 单元测试：
    /// 表名按字典序返回
    #[test]
    fn test_table_names_sorted() -> Result<()> {
        let db = Database::new("testdb");
        for name in ["zebra", "alpha", "mid"] {
            db.create_simple_table(name, &specs(), "id")?;
        }
        assert_eq!(db.table_names()?, vec!["alpha", "mid", "zebra"]);
        Ok(())
    }

    /// 单元测试：
    /// 聚合统计
    #[test]
    fn test_stats() -> Result<()> {
        let db = Database::new("testdb");
        let users = db.create_simple_table("users", &specs(), "id")?;
        users.insert_values(vec![Value::Int32(1), Value::from("Alice")])?;
        users.insert_values(vec![Value::Int32(2), Value::from("Bob")])?;
        db.create_simple_table("empty", &specs(), "id")?;

        let stats = db.stats()?;
        assert_eq!(stats.table_count, 2);
        assert_eq!(stats.total_row_count, 2);
        assert_eq!(
            stats.table_row_counts,
            vec![("empty".to_string(), 0), ("users".to_string(), 2)]
        );
        Ok(())
    }

    /// 单元测试：
    /// 谓词筛表
    #[test]
    fn test_query_tables() -> Result<()> {
        let db = Database::new("testdb");
        let users = db.create_simple_table("users", &specs(), "id")?;
        users.insert_values(vec![Value::Int32(1), Value::Null])?;
        db.create_simple_table("empty", &specs(), "id")?;

        let nonempty = db.query_tables(|_, t| t.row_count().map(|n| n > 0).unwrap_or(false))?;
        assert_eq!(nonempty, vec!["users"]);
        Ok(())
    }
}
