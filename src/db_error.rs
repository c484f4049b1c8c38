use serde::{Deserialize, Serialize};

/// 自定义错误信息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// 模式错误：主键缺失、零列模式、行与模式长度不一致
    SchemaError(String),
    /// 校验错误：值不满足列的类型/可空/约束检查
    ValidationError(String),
    /// 约束冲突：主键重复、唯一列取值重复
    ConstraintViolation(String),
    /// 类型不匹配：按错误的类型读取 Value
    TypeMismatch { expected: String, actual: String },
    /// 未找到：未知的列名、越界的行下标、未知的表
    NotFound(String),
    /// 已存在：重复创建同名表
    AlreadyExists(String),
    /// 文件IO错误
    IO(String),
    /// 序列化错误：文档格式非法、未知类型标签
    SerializationError(String),
    //配置错误
    ConfigError(String),
    /// 锁中毒错误
    LockPoisoned(String),
}

/// 自定义错误类型
pub type Result<T> = std::result::Result<T, Error>;

/// 实现标准库std::error::Error特征
impl std::error::Error for Error {}

/// 实现格式输出
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::SchemaError(msg) => write!(f, "schema error: {msg}"),
            Error::ValidationError(msg) => write!(f, "validation error: {msg}"),
            Error::ConstraintViolation(msg) => write!(f, "constraint violation: {msg}"),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, actual {actual}")
            }
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::AlreadyExists(msg) => write!(f, "already exists: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
            Error::SerializationError(msg) => write!(f, "serialization error: {msg}"),
            Error::ConfigError(msg) => write!(f, "error: config error:{msg}"),
            Error::LockPoisoned(msg) => write!(f, "error: lock poisoned:{msg}"),
        }
    }
}

/// 构建一个结构体实例
/// an Error::ValidationError for the given format string.
#[macro_export]
macro_rules! errval {
    ($($args:tt)*) => {
        $crate::db_error::Error::ValidationError(format!($($args)*))
    };
}

/// an Error::SchemaError for the given format string.
#[macro_export]
macro_rules! errschema {
    ($($args:tt)*) => {
        $crate::db_error::Error::SchemaError(format!($($args)*))
    };
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

/// RwLock/Mutex 中毒统一转换成 LockPoisoned
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned(err.to_string())
    }
}

#[cfg(test)]
mod tests {

    #[test]
    fn test_err_macros() {
        let e = errval!("bad value {}", 1);
        assert_eq!(e.to_string(), "validation error: bad value 1");
        let e = errschema!("no pk");
        assert_eq!(e.to_string(), "schema error: no pk");
    }
}
