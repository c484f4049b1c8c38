//! # 值类型模块
//!
//! 本模块提供存储层面的**原始数据类型**与**值表示**：
//! - `ValueType`：受限的标量类型枚举（`Null`/`Boolean`/`Int32`/`Int64`/`Double`/`String`），
//!   与持久化文档中的 `type_index`（0..=5）一一对应。
//! - `Value`：值的统一承载，封闭的六分支标签联合。
//!   - **等价语义**：不同类型永不相等（`Int32` 与 `Int64` 也不相等，不做数值提升）；
//!     `Null == Null`；`Double` 使用 `total_cmp`，因此 `NaN == NaN`，便于索引与排序。
//!   - **排序语义**：跨类型按类型下标定义**全序**，`Null` 最小；同类型按载荷比较。
//!   - **取值**：`as_bool`/`as_i32`/`as_i64`/`as_f64`/`as_str` 按声明类型取出载荷，
//!     类型不符时返回 `Error::TypeMismatch`，不做任何隐式加宽/截断。
//!   - **规范字符串**：`Display` 输出每种类型的规范形式
//!     （`NULL`、`true`/`false`、十进制数字、原始字符串），主键索引以此为键。

use crate::db_error::{Error, Result};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// 原始的标量数据类型。为简化实现，仅支持少量标量类型（不支持复合类型）。
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ValueType {
    /// 空值
    Null,
    /// 布尔类型：true/false
    Boolean,
    /// 32bit有符号整形
    Int32,
    /// 64bit有符号整形
    Int64,
    /// 浮点类型
    Double,
    /// UTF-8编码的字符串
    String,
}

impl ValueType {
    /// 类型在持久化文档中的标签（type_index）
    pub fn type_index(self) -> u8 {
        match self {
            ValueType::Null => 0,
            ValueType::Boolean => 1,
            ValueType::Int32 => 2,
            ValueType::Int64 => 3,
            ValueType::Double => 4,
            ValueType::String => 5,
        }
    }

    /// 从文档标签还原类型，未知标签返回 None
    pub fn from_type_index(index: u8) -> Option<ValueType> {
        match index {
            0 => Some(ValueType::Null),
            1 => Some(ValueType::Boolean),
            2 => Some(ValueType::Int32),
            3 => Some(ValueType::Int64),
            4 => Some(ValueType::Double),
            5 => Some(ValueType::String),
            _ => None,
        }
    }
}

/// 实现格式化打印
impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Null => write!(f, "Null"),
            ValueType::Boolean => write!(f, "Boolean"),
            ValueType::Int32 => write!(f, "Int32"),
            ValueType::Int64 => write!(f, "Int64"),
            ValueType::Double => write!(f, "Double"),
            ValueType::String => write!(f, "String"),
        }
    }
}

/// 值的统一承载
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
}

impl Value {
    /// 返回值对应的类型
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_int32(&self) -> bool {
        matches!(self, Value::Int32(_))
    }

    pub fn is_int64(&self) -> bool {
        matches!(self, Value::Int64(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// 类型不匹配时构建错误
    fn mismatch(&self, expected: ValueType) -> Error {
        Error::TypeMismatch {
            expected: expected.to_string(),
            actual: self.value_type().to_string(),
        }
    }

    /// 按布尔类型取值，存储类型不符返回 TypeMismatch
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Boolean(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Boolean)),
        }
    }

    /// 按 Int32 取值。存储的 Int64 读作 Int32 同样是 TypeMismatch，不做窄化
    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Value::Int32(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Int32)),
        }
    }

    /// 按 Int64 取值。存储的 Int32 读作 Int64 同样是 TypeMismatch，不做加宽
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int64(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Int64)),
        }
    }

    /// 按 Double 取值
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Double(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Double)),
        }
    }

    /// 按字符串取值
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(ValueType::String)),
        }
    }

    /// 真值转换：Null 为假，布尔取自身，数值非零为真，字符串非空为真
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(v) => *v,
            Value::Int32(v) => *v != 0,
            Value::Int64(v) => *v != 0,
            Value::Double(v) => *v != 0.0,
            Value::String(v) => !v.is_empty(),
        }
    }
}

/// 等价语义：类型必须一致；Double 用 total_cmp，NaN 等于 NaN
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b) == Ordering::Equal,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 跨类型全序：先比类型下标（Null 最小），同类型再比载荷
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self
                .value_type()
                .type_index()
                .cmp(&other.value_type().type_index()),
        }
    }
}

/// 规范字符串形式，主键索引以此为键
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
