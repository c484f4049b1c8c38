//! # 模式模块
//!
//! `Schema` 是一张表的不可变列集合，构造时一次性建立列名到下标的映射。
//! 表和行共享同一个 `Arc<Schema>` 句柄，行因此可以安全地活得比表久，
//! 不存在裸指针悬垂的问题。

use crate::db_error::Result;
use crate::errschema;
use crate::types::column::Column;
use std::collections::HashMap;

/// 表的模式，指定其数据结构和约束。
///
/// 模式在创建后无法更改：没有 ALTER TABLE，列集合与名称映射均为只读。
#[derive(Debug)]
pub struct Schema {
    /// 列集合，至少一个
    columns: Vec<Column>,
    /// 列名 -> 下标，构造时一次性建立
    name_index: HashMap<String, usize>,
}

impl Schema {
    /// 构建模式。零列或列名重复返回 SchemaError
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(errschema!("schema must have at least one column"));
        }
        let mut name_index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if name_index.insert(col.name().to_string(), i).is_some() {
                return Err(errschema!("duplicate column name '{}'", col.name()));
            }
        }
        Ok(Self { columns, name_index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// 列名解析为下标，未知列名返回 None
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
