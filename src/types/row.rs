//! # 行模块
//!
//! `Row` 是与模式按位置绑定的定长值序列：第 i 个值对应第 i 列。
//! 行通过 `Arc<Schema>` 引用（不拥有）模式；按列名取值经由模式里
//! 一次性建立的名称映射完成。写入值时先按绑定列做校验，
//! 校验失败行保持不变。

use crate::db_error::{Error, Result};
use crate::types::schema::Schema;
use crate::types::value::Value;
use crate::{errschema, errval};
use std::sync::Arc;

/// 模式绑定的行
#[derive(Clone, Debug)]
pub struct Row {
    values: Vec<Value>,
    schema: Arc<Schema>,
}

impl Row {
    /// 构建一行，所有位置填充各列的默认值或 Null
    pub fn with_defaults(schema: Arc<Schema>) -> Self {
        let values = schema.columns().iter().map(|c| c.default_or_null()).collect();
        Self { values, schema }
    }

    /// 用显式值构建一行，值个数必须等于模式列数
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(errschema!(
                "number of values ({}) doesn't match schema size ({})",
                values.len(),
                schema.len()
            ));
        }
        Ok(Self { values, schema })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// 按下标取值，越界返回 NotFound
    pub fn get(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("column index {index} out of range")))
    }

    /// 按列名取值，未知列名返回 NotFound
    pub fn get_by_name(&self, column_name: &str) -> Result<&Value> {
        let index = self.column_index(column_name)?;
        Ok(&self.values[index])
    }

    /// 列名解析为下标
    pub fn column_index(&self, column_name: &str) -> Result<usize> {
        self.schema
            .column_index(column_name)
            .ok_or_else(|| Error::NotFound(format!("column '{column_name}' not found")))
    }

    /// 按下标写值，先用绑定列校验，失败时行保持不变
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let column = self
            .schema
            .column(index)
            .ok_or_else(|| Error::NotFound(format!("column index {index} out of range")))?;
        if !column.validate_value(&value) {
            return Err(errval!(
                "value {value} doesn't satisfy constraints of column '{}'",
                column.name()
            ));
        }
        self.values[index] = value;
        Ok(())
    }

    /// 按列名写值
    pub fn set_by_name(&mut self, column_name: &str, value: Value) -> Result<()> {
        let index = self.column_index(column_name)?;
        self.set(index, value)
    }

    /// 行内全部值
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 重新绑定到新模式。长度一致时只替换模式句柄；
    /// 长度不一致时重新推导值序列：
    /// 1、长度调整到新模式的列数（收缩即截断）
    /// 2、新引入的位置和 Null 位置填充该列的默认值或 Null
    pub fn rebind(&mut self, schema: Arc<Schema>) {
        if self.values.len() != schema.len() {
            let old_len = self.values.len();
            self.values.resize(schema.len(), Value::Null);
            for (i, column) in schema.columns().iter().enumerate() {
                if i >= old_len || self.values[i].is_null() {
                    self.values[i] = column.default_or_null();
                }
            }
        }
        self.schema = schema;
    }

    /// 行是否整体有效：每个位置都满足对应列
    pub fn validate(&self) -> bool {
        if self.values.len() != self.schema.len() {
            return false;
        }
        self.schema
            .columns()
            .iter()
            .zip(self.values.iter())
            .all(|(col, val)| col.validate_value(val))
    }
}

/// 行等价只看值序列，不看绑定的模式句柄
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Row {}
