//! # 表引擎模块
//!
//! `Table` 拥有一份模式（`Arc<Schema>`）、按位置寻址的行存储，
//! 以及主键规范字符串到行位置的哈希索引。全部结构性变更
//! （插入/更新/删除/清空）持表级读写锁的**独占模式**执行，
//! 只读操作持**共享模式**，因此单表内部不可能死锁。
//!
//! 位置不变式：对位置 i 的行 r，恒有 index[canonical(r[pk])] == i；
//! 删除造成的位置左移和更新造成的主键变化都必须同步修正索引。

use crate::db_error::{Error, Result};
use crate::types::{Column, Row, Schema, Value};
use crate::{errschema, errval};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 表的统计信息。内存占用是粗略估计，仅供参考
#[derive(Debug, Clone)]
pub struct TableStats {
    /// 行数
    pub row_count: usize,
    /// 列数
    pub column_count: usize,
    /// 主键列名
    pub primary_key_column: String,
    /// 粗略的内存占用估计（字节）
    pub memory_usage_estimate: usize,
}

/// 锁保护下的可变状态：行存储 + 主键索引 + 自增计数器
#[derive(Debug)]
struct TableInner {
    rows: Vec<Row>,
    /// 主键规范字符串 -> 行位置
    pk_index: HashMap<String, usize>,
    /// 自增行号，供调用方生成整数主键，clear 时重置
    next_row_id: u64,
}

/// 主键索引的表。锁固定在结构内部，Table 不可复制，
/// 调用方通过 `Arc<Table>` 共享所有权。
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Arc<Schema>,
    /// 主键列下标，构造时固定
    pk_col: usize,
    inner: RwLock<TableInner>,
}

impl Table {
    /// 构建一张表：
    /// 1、模式非空（零列在 Schema::new 处拒绝）
    /// 2、主键列必须存在、唯一且非空
    ///
    /// 预留容量取全局配置的 default_table_capacity
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        pk_column_name: &str,
    ) -> Result<Self> {
        let expected_rows = crate::cfg::current_config()?.default_table_capacity;
        Self::with_capacity(name, columns, pk_column_name, expected_rows)
    }

    /// 带容量提示的构建，预留行存储和索引空间
    pub fn with_capacity(
        name: impl Into<String>,
        columns: Vec<Column>,
        pk_column_name: &str,
        expected_rows: usize,
    ) -> Result<Self> {
        let name = name.into();
        let schema = Arc::new(Schema::new(columns)?);
        let pk_col = schema
            .column_index(pk_column_name)
            .ok_or_else(|| errschema!("primary key column '{pk_column_name}' not found in schema"))?;
        let pk_column = &schema.columns()[pk_col];
        if !pk_column.is_unique() {
            return Err(errschema!("primary key column '{pk_column_name}' must be unique"));
        }
        if pk_column.is_nullable() {
            return Err(errschema!("primary key column '{pk_column_name}' cannot be nullable"));
        }
        Ok(Self {
            name,
            schema,
            pk_col,
            inner: RwLock::new(TableInner {
                rows: Vec::with_capacity(expected_rows),
                pk_index: HashMap::with_capacity(expected_rows),
                next_row_id: 1,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn pk_column_name(&self) -> &str {
        self.schema.columns()[self.pk_col].name()
    }

    /// 共享锁
    fn read_lock(&self) -> Result<RwLockReadGuard<'_, TableInner>> {
        Ok(self.inner.read()?)
    }

    /// 独占锁
    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, TableInner>> {
        Ok(self.inner.write()?)
    }

    /// 行的主键规范字符串
    fn pk_string(&self, row: &Row) -> Result<String> {
        Ok(row.get(self.pk_col)?.to_string())
    }

    /// 唯一列冲突扫描，O(行数 × 唯一列数)。
    /// Null 彼此视为不同（SQL 惯例），不参与冲突判定。
    /// 返回第一个冲突的列名
    fn unique_conflict(
        &self,
        inner: &TableInner,
        row: &Row,
        exclude: Option<usize>,
    ) -> Result<Option<String>> {
        for (col_idx, column) in self.schema.columns().iter().enumerate() {
            if !column.is_unique() {
                continue;
            }
            let value = row.get(col_idx)?;
            if value.is_null() {
                continue;
            }
            for (row_idx, stored) in inner.rows.iter().enumerate() {
                if exclude == Some(row_idx) {
                    continue;
                }
                if stored.get(col_idx)? == value {
                    return Ok(Some(column.name().to_string()));
                }
            }
        }
        Ok(None)
    }

    /// 插入一行（独占锁）。失败不产生任何部分变更：
    /// 1、行长度必须等于模式列数，且整行有效 —— ValidationError
    /// 2、任何唯一列与已存储行取值重复 —— ConstraintViolation
    /// 3、主键规范字符串已在索引中 —— ConstraintViolation
    pub fn insert_row(&self, mut row: Row) -> Result<()> {
        let mut inner = self.write_lock()?;

        if row.len() != self.schema.len() {
            return Err(errval!(
                "row size ({}) doesn't match schema size ({})",
                row.len(),
                self.schema.len()
            ));
        }
        // 绑定到本表的模式句柄
        row.rebind(self.schema.clone());
        if !row.validate() {
            return Err(errval!("row validation failed for table '{}'", self.name));
        }

        if let Some(col) = self.unique_conflict(&inner, &row, None)? {
            return Err(Error::ConstraintViolation(format!(
                "duplicate value on unique column '{col}' in table '{}'",
                self.name
            )));
        }

        let pk_value = self.pk_string(&row)?;
        if inner.pk_index.contains_key(&pk_value) {
            return Err(Error::ConstraintViolation(format!(
                "primary key '{pk_value}' already exists in table '{}'",
                self.name
            )));
        }

        let new_index = inner.rows.len();
        inner.rows.push(row);
        inner.pk_index.insert(pk_value, new_index);
        Ok(())
    }

    /// 用值序列插入一行
    pub fn insert_values(&self, values: Vec<Value>) -> Result<()> {
        let row = Row::new(self.schema.clone(), values)?;
        self.insert_row(row)
    }

    /// 按主键查找（共享锁）。未命中返回 Ok(None)，不是错误
    pub fn find_row_by_pk(&self, primary_key: &Value) -> Result<Option<Row>> {
        let inner = self.read_lock()?;
        let pk = primary_key.to_string();
        Ok(inner.pk_index.get(&pk).map(|&idx| inner.rows[idx].clone()))
    }

    /// 按主键更新整行（全程独占锁）。主键缺席返回 Ok(false)。
    /// 主键变化时索引的换键对并发读者是原子的：读者要么看到旧行，
    /// 要么看到新行，不会看到中间态
    pub fn update_row(&self, primary_key: &Value, new_values: Vec<Value>) -> Result<bool> {
        let mut inner = self.write_lock()?;

        let old_pk = primary_key.to_string();
        let row_index = match inner.pk_index.get(&old_pk) {
            Some(&idx) => idx,
            None => return Ok(false),
        };

        let new_row = Row::new(self.schema.clone(), new_values)?;
        if !new_row.validate() {
            return Err(errval!("new row validation failed for table '{}'", self.name));
        }

        if let Some(col) = self.unique_conflict(&inner, &new_row, Some(row_index))? {
            return Err(Error::ConstraintViolation(format!(
                "duplicate value on unique column '{col}' in table '{}'",
                self.name
            )));
        }

        let new_pk = self.pk_string(&new_row)?;
        if new_pk != old_pk {
            if inner.pk_index.contains_key(&new_pk) {
                return Err(Error::ConstraintViolation(format!(
                    "new primary key '{new_pk}' already exists in table '{}'",
                    self.name
                )));
            }
            inner.pk_index.remove(&old_pk);
            inner.pk_index.insert(new_pk, row_index);
        }

        inner.rows[row_index] = new_row;
        Ok(true)
    }

    /// 按主键删除（独占锁）。主键缺席返回 Ok(false)。
    /// 行删除后所有后续行左移一位，索引中大于删除位置的条目同步递减，
    /// 恢复位置不变式。整体是表大小的线性操作
    pub fn delete_row(&self, primary_key: &Value) -> Result<bool> {
        let mut inner = self.write_lock()?;

        let pk = primary_key.to_string();
        let row_index = match inner.pk_index.remove(&pk) {
            Some(idx) => idx,
            None => return Ok(false),
        };

        inner.rows.remove(row_index);
        for pos in inner.pk_index.values_mut() {
            if *pos > row_index {
                *pos -= 1;
            }
        }
        Ok(true)
    }

    /// 全表行快照（共享锁）
    pub fn all_rows(&self) -> Result<Vec<Row>> {
        let inner = self.read_lock()?;
        Ok(inner.rows.clone())
    }

    /// 按位置取一行，越界返回 NotFound
    pub fn row(&self, index: usize) -> Result<Row> {
        let inner = self.read_lock()?;
        inner
            .rows
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("row index {index} out of range")))
    }

    /// 谓词扫描（共享锁）
    pub fn find_rows<F>(&self, predicate: F) -> Result<Vec<Row>>
    where
        F: Fn(&Row) -> bool,
    {
        let inner = self.read_lock()?;
        Ok(inner.rows.iter().filter(|r| predicate(r)).cloned().collect())
    }

    /// 按列值扫描（共享锁）。未知列名视为零命中，不报错
    pub fn find_rows_by_column(&self, column_name: &str, value: &Value) -> Result<Vec<Row>> {
        let col_idx = match self.schema.column_index(column_name) {
            Some(idx) => idx,
            None => return Ok(Vec::new()),
        };
        self.find_rows(|row| row.get(col_idx).map(|v| v == value).unwrap_or(false))
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.read_lock()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_lock()?.rows.is_empty())
    }

    /// 清空全表（独占锁）：行、索引、自增计数器一并重置
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.write_lock()?;
        inner.rows.clear();
        inner.pk_index.clear();
        inner.next_row_id = 1;
        Ok(())
    }

    /// 取下一个自增行号，供调用方生成整数主键
    pub fn next_row_id(&self) -> Result<u64> {
        let mut inner = self.write_lock()?;
        let id = inner.next_row_id;
        inner.next_row_id += 1;
        Ok(id)
    }

    /// 表统计信息
    pub fn stats(&self) -> Result<TableStats> {
        let inner = self.read_lock()?;
        let row_count = inner.rows.len();
        let column_count = self.schema.len();
        // 粗略估计：行数×列数×值槽大小 + 索引开销
        let memory_usage_estimate = row_count * column_count * std::mem::size_of::<Value>()
            + inner.pk_index.len()
                * (std::mem::size_of::<String>() + std::mem::size_of::<usize>());
        Ok(TableStats {
            row_count,
            column_count,
            primary_key_column: self.pk_column_name().to_string(),
            memory_usage_estimate,
        })
    }
}
