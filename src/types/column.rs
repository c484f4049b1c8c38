//! # 列元数据与约束模块
//!
//! `Column` 描述一列的不可变元数据：列名、声明类型、可空标志、唯一标志、
//! 可选默认值，以及一组有序的约束。列构造之后只允许追加约束
//! （且必须在参与任何已存储行之前追加，保证校验的确定性）。
//!
//! 约束不再是不可序列化的闭包，而是携带自身参数的标签枚举
//! （`Range`/`LengthRange`/`InSet`），可以随文档精确落盘与还原；
//! `Custom` 保留任意谓词的逃生口，落盘时丢弃。

use crate::db_error::Result;
use crate::errschema;
use crate::types::value::{Value, ValueType};
use std::fmt;
use std::sync::Arc;

/// 列约束。每个约束对 Null 一律放行（交给可空检查处理），
/// 对类型不符的值返回 false 而不是报错。
#[derive(Clone)]
pub enum Constraint {
    /// 数值闭区间 [min, max]，min/max 的类型即约束适用的类型
    Range { min: Value, max: Value },
    /// 字符串字节长度闭区间 [min, max]
    LengthRange { min: usize, max: usize },
    /// 枚举集合约束：值必须出现在集合中
    InSet { values: Vec<Value> },
    /// 任意谓词的逃生口。无法序列化，落盘时丢弃
    Custom(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl Constraint {
    /// 校验一个值是否满足本约束
    pub fn check(&self, value: &Value) -> bool {
        // Null 交给可空检查处理
        if value.is_null() {
            return true;
        }
        match self {
            Constraint::Range { min, max } => {
                if value.value_type() != min.value_type() {
                    return false;
                }
                min <= value && value <= max
            }
            Constraint::LengthRange { min, max } => match value.as_str() {
                Ok(s) => s.len() >= *min && s.len() <= *max,
                Err(_) => false,
            },
            Constraint::InSet { values } => values.contains(value),
            Constraint::Custom(pred) => pred(value),
        }
    }

    /// 是否可以随文档序列化
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Constraint::Custom(_))
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Range { min, max } => write!(f, "Range[{min}, {max}]"),
            Constraint::LengthRange { min, max } => write!(f, "LengthRange[{min}, {max}]"),
            Constraint::InSet { values } => write!(f, "InSet({} values)", values.len()),
            Constraint::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// 列的元数据与约束集合
#[derive(Clone, Debug)]
pub struct Column {
    /// 列名 不可为空，同一模式内唯一
    name: String,

    /// 列类型
    data_type: ValueType,

    /// 是否允许为空。对主键无效
    nullable: bool,

    /// 是否该列只允许唯一值（Null 彼此视为不同，见 uniqueness 策略）
    unique: bool,

    /// 列的默认值。如果为 None，填充时使用 Null。
    /// 非 Null 的默认值必须与列的数据类型匹配。
    default: Option<Value>,

    /// 有序的约束集合，只允许在使用前追加
    constraints: Vec<Constraint>,
}

impl Column {
    /// 构建一列。非 Null 默认值与声明类型不符时返回 SchemaError
    pub fn new(
        name: impl Into<String>,
        data_type: ValueType,
        nullable: bool,
        unique: bool,
        default: Option<Value>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(d) = &default {
            if !d.is_null() && d.value_type() != data_type {
                return Err(errschema!(
                    "column '{name}' default value type {} doesn't match column type {data_type}",
                    d.value_type()
                ));
            }
        }
        Ok(Self { name, data_type, nullable, unique, default, constraints: Vec::new() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> ValueType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// 追加一条约束。必须在该列参与任何已存储行之前调用
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// 校验一个值：
    /// 1、Null 只看可空标志
    /// 2、类型不符直接拒绝
    /// 3、所有约束逐条通过才算有效
    pub fn validate_value(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.nullable;
        }
        if value.value_type() != self.data_type {
            return false;
        }
        self.constraints.iter().all(|c| c.check(value))
    }

    /// 默认值，未设置时为 Null
    pub fn default_or_null(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}
