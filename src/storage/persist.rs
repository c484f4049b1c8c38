//! # 持久化模块
//!
//! 每个实体映射到一个可序列化的镜像结构（文档字段名即兼容性契约），
//! 整库序列化成一个 JSON 文档落盘，加载时整体替换目标库的表集合。
//!
//! 已知取舍：
//! - `numeric_data` 用 double 统一承载 Int32/Int64/Double/Boolean 数值，
//!   Int64 超出 double 精确整数范围（|v| > 2^53）时往返有精度损失，文档化不修复；
//! - 声明式约束（Range/LengthRange/InSet）随文档往返；
//!   `Custom` 谓词无法序列化，落盘时丢弃，应用需在加载后自行重挂。

use crate::db_error::{Error, Result};
use crate::storage::database::Database;
use crate::storage::table::Table;
use crate::types::{Column, Constraint, Row, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Value 的文档镜像。只有与 type_index 匹配的字段有语义，
/// 其余字段照常写出但被忽略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueDoc {
    pub type_index: u8,
    #[serde(default)]
    pub string_data: String,
    #[serde(default)]
    pub numeric_data: f64,
    #[serde(default)]
    pub bool_data: bool,
}

impl ValueDoc {
    pub fn from_value(value: &Value) -> Self {
        let mut doc = ValueDoc { type_index: value.value_type().type_index(), ..Default::default() };
        match value {
            Value::Null => {}
            Value::Boolean(v) => doc.bool_data = *v,
            Value::Int32(v) => doc.numeric_data = *v as f64,
            // 2^53 以外的 Int64 在这里丢精度
            Value::Int64(v) => doc.numeric_data = *v as f64,
            Value::Double(v) => doc.numeric_data = *v,
            Value::String(v) => doc.string_data = v.clone(),
        }
        doc
    }

    /// 还原 Value，未知类型标签返回 SerializationError
    pub fn to_value(&self) -> Result<Value> {
        let value_type = ValueType::from_type_index(self.type_index).ok_or_else(|| {
            Error::SerializationError(format!("unknown value type index {}", self.type_index))
        })?;
        Ok(match value_type {
            ValueType::Null => Value::Null,
            ValueType::Boolean => Value::Boolean(self.bool_data),
            ValueType::Int32 => Value::Int32(self.numeric_data as i32),
            ValueType::Int64 => Value::Int64(self.numeric_data as i64),
            ValueType::Double => Value::Double(self.numeric_data),
            ValueType::String => Value::String(self.string_data.clone()),
        })
    }
}

/// 声明式约束的文档镜像
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintDoc {
    Range { min: ValueDoc, max: ValueDoc },
    LengthRange { min: usize, max: usize },
    InSet { values: Vec<ValueDoc> },
}

impl ConstraintDoc {
    /// Custom 谓词不可序列化，返回 None 表示丢弃
    pub fn from_constraint(constraint: &Constraint) -> Option<Self> {
        match constraint {
            Constraint::Range { min, max } => Some(ConstraintDoc::Range {
                min: ValueDoc::from_value(min),
                max: ValueDoc::from_value(max),
            }),
            Constraint::LengthRange { min, max } => {
                Some(ConstraintDoc::LengthRange { min: *min, max: *max })
            }
            Constraint::InSet { values } => Some(ConstraintDoc::InSet {
                values: values.iter().map(ValueDoc::from_value).collect(),
            }),
            Constraint::Custom(_) => None,
        }
    }

    pub fn to_constraint(&self) -> Result<Constraint> {
        Ok(match self {
            ConstraintDoc::Range { min, max } => {
                Constraint::Range { min: min.to_value()?, max: max.to_value()? }
            }
            ConstraintDoc::LengthRange { min, max } => {
                Constraint::LengthRange { min: *min, max: *max }
            }
            ConstraintDoc::InSet { values } => Constraint::InSet {
                values: values.iter().map(|v| v.to_value()).collect::<Result<Vec<_>>>()?,
            },
        })
    }
}

/// Column 的文档镜像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDoc {
    pub name: String,
    pub type_index: u8,
    pub nullable: bool,
    pub unique: bool,
    pub default_value: ValueDoc,
    pub has_default: bool,
    /// 声明式约束，向后兼容：老文档没有该字段时按空处理
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDoc>,
}

impl ColumnDoc {
    pub fn from_column(column: &Column) -> Self {
        let has_default = column.default_value().is_some();
        ColumnDoc {
            name: column.name().to_string(),
            type_index: column.data_type().type_index(),
            nullable: column.is_nullable(),
            unique: column.is_unique(),
            default_value: column
                .default_value()
                .map(ValueDoc::from_value)
                .unwrap_or_default(),
            has_default,
            constraints: column
                .constraints()
                .iter()
                .filter_map(ConstraintDoc::from_constraint)
                .collect(),
        }
    }

    pub fn to_column(&self) -> Result<Column> {
        let data_type = ValueType::from_type_index(self.type_index).ok_or_else(|| {
            Error::SerializationError(format!("unknown column type index {}", self.type_index))
        })?;
        let default = if self.has_default { Some(self.default_value.to_value()?) } else { None };
        let mut column = Column::new(&self.name, data_type, self.nullable, self.unique, default)?;
        for doc in &self.constraints {
            column.add_constraint(doc.to_constraint()?);
        }
        Ok(column)
    }
}

/// Row 的文档镜像：按表的列序排列的值列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDoc {
    pub values: Vec<ValueDoc>,
}

impl RowDoc {
    pub fn from_row(row: &Row) -> Self {
        RowDoc { values: row.values().iter().map(ValueDoc::from_value).collect() }
    }

    pub fn to_values(&self) -> Result<Vec<Value>> {
        self.values.iter().map(|v| v.to_value()).collect()
    }
}

/// Table 的文档镜像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDoc {
    pub name: String,
    pub columns: Vec<ColumnDoc>,
    pub rows: Vec<RowDoc>,
    pub primary_key_column: String,
}

impl TableDoc {
    pub fn from_table(table: &Table) -> Result<Self> {
        Ok(TableDoc {
            name: table.name().to_string(),
            columns: table.schema().columns().iter().map(ColumnDoc::from_column).collect(),
            rows: table.all_rows()?.iter().map(RowDoc::from_row).collect(),
            primary_key_column: table.pk_column_name().to_string(),
        })
    }

    /// 重建活表：先恢复模式，再逐行插入（插入路径重建主键索引并复验约束）
    pub fn to_table(&self) -> Result<Table> {
        let columns =
            self.columns.iter().map(|c| c.to_column()).collect::<Result<Vec<_>>>()?;
        let table =
            Table::with_capacity(&self.name, columns, &self.primary_key_column, self.rows.len())?;
        for row in &self.rows {
            table.insert_values(row.to_values()?)?;
        }
        Ok(table)
    }
}

/// Database 的文档镜像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDoc {
    pub tables: Vec<TableDoc>,
}

impl DatabaseDoc {
    pub fn from_database(database: &Database) -> Result<Self> {
        let mut tables = Vec::new();
        // 表名字典序，保证文档内容稳定
        for name in database.table_names()? {
            if let Some(table) = database.get_table(&name) {
                tables.push(TableDoc::from_table(&table)?);
            }
        }
        Ok(DatabaseDoc { tables })
    }
}

impl Database {
    /// 整库保存为一个 JSON 文档。
    /// 先写临时文件再原子重命名，写失败不会留下看似有效的半截文件。
    /// 返回布尔结果，诊断信息走日志
    pub fn save(&self, path: impl AsRef<Path>) -> bool {
        match self.try_save(path.as_ref()) {
            Ok(table_count) => {
                info!("数据库已保存到 {}，共 {table_count} 张表", path.as_ref().display());
                true
            }
            Err(e) => {
                error!("保存数据库失败: {e}");
                false
            }
        }
    }

    pub fn try_save(&self, path: &Path) -> Result<usize> {
        let doc = DatabaseDoc::from_database(self)?;
        let config = crate::cfg::current_config()?;
        let json = if config.pretty_json {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };

        let target = config.resolve(path);
        // 1、写临时文件
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        // 2、原子重命名到目标路径，失败时顺手清掉临时文件
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(doc.tables.len())
    }

    /// 从 JSON 文档整体加载，成功后完全替换当前的表集合；
    /// 任何解析或结构错误都让目标库保持原状
    pub fn load(&self, path: impl AsRef<Path>) -> bool {
        match self.try_load(path.as_ref()) {
            Ok(summary) => {
                info!("数据库已从 {} 加载，共 {} 张表", path.as_ref().display(), summary.len());
                for (name, rows) in &summary {
                    info!("  - 表 '{name}': {rows} 行");
                }
                true
            }
            Err(e) => {
                error!("加载数据库失败: {e}");
                false
            }
        }
    }

    pub fn try_load(&self, path: &Path) -> Result<Vec<(String, usize)>> {
        let config = crate::cfg::current_config()?;
        let content = std::fs::read_to_string(config.resolve(path))?;
        let doc: DatabaseDoc = serde_json::from_str(&content)?;

        // 先把所有表完整重建出来，任何一步失败都不触碰当前状态
        let mut new_tables: HashMap<String, Arc<Table>> = HashMap::with_capacity(doc.tables.len());
        let mut summary = Vec::with_capacity(doc.tables.len());
        for table_doc in &doc.tables {
            if new_tables.contains_key(&table_doc.name) {
                return Err(Error::SerializationError(format!(
                    "duplicate table '{}' in document",
                    table_doc.name
                )));
            }
            let table = Arc::new(table_doc.to_table()?);
            summary.push((table_doc.name.clone(), table.row_count()?));
            new_tables.insert(table_doc.name.clone(), table);
        }

        // 整体换入
        self.replace_tables(new_tables)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_database() -> Database {
        let db = Database::new("testdb");

        let id = Column::new("id", ValueType::Int32, false, true, None).unwrap();
        let mut name = Column::new(
            "name",
            ValueType::String,
            true,
            false,
            Some(Value::from("unknown")),
        )
        .unwrap();
        name.add_constraint(Constraint::LengthRange { min: 1, max: 32 });
        // Custom 谓词：落盘时应被丢弃
        name.add_constraint(Constraint::Custom(Arc::new(|v: &Value| {
            v.as_str().map(|s| !s.starts_with(' ')).unwrap_or(false)
        })));
        let score = Column::new("score", ValueType::Double, true, false, None).unwrap();
        let big = Column::new("big", ValueType::Int64, true, false, None).unwrap();
        let active = Column::new("active", ValueType::Boolean, true, false, None).unwrap();

        let users = db.create_table("users", vec![id, name, score, big, active], "id").unwrap();
        users
            .insert_values(vec![
                Value::Int32(1),
                Value::from("Alice"),
                Value::Double(99.5),
                Value::Int64(1_234_567_890_123),
                Value::Boolean(true),
            ])
            .unwrap();
        users
            .insert_values(vec![
                Value::Int32(2),
                Value::from("Bob"),
                Value::Null,
                Value::Null,
                Value::Boolean(false),
            ])
            .unwrap();

        let tag = Column::new("tag", ValueType::String, false, true, None).unwrap();
        let tags = db.create_table("tags", vec![tag], "tag").unwrap();
        tags.insert_values(vec![Value::from("alpha")]).unwrap();

        db
    }

    /// 单元测试：
    /// 每种类型的 ValueDoc 往返
    #[test]
    fn test_value_doc_roundtrip() -> Result<()> {
        let values = vec![
            Value::Null,
            Value::Boolean(true),
            Value::Int32(-7),
            Value::Int64(1 << 40),
            Value::Double(3.25),
            Value::from("中文 ok"),
        ];
        for v in values {
            let doc = ValueDoc::from_value(&v);
            assert_eq!(doc.to_value()?, v);
        }
        // 未知类型标签
        let bad = ValueDoc { type_index: 9, ..Default::default() };
        assert!(matches!(bad.to_value(), Err(Error::SerializationError(_))));
        Ok(())
    }

    /// 单元测试：
    /// 整库往返：表名、列元数据、声明式约束、行值全部一致；
    /// Custom 谓词被丢弃
    #[test]
    fn test_database_roundtrip() -> Result<()> {
        crate::init_tracing();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.json");

        let db = sample_database();
        assert!(db.save(&path));

        let restored = Database::new("restored");
        assert!(restored.load(&path));

        assert_eq!(restored.table_names()?, vec!["tags", "users"]);

        let users = restored.get_table("users").unwrap();
        assert_eq!(users.row_count()?, 2);
        assert_eq!(users.pk_column_name(), "id");

        // 列元数据
        let columns = users.schema().columns();
        assert_eq!(columns[1].name(), "name");
        assert_eq!(columns[1].data_type(), ValueType::String);
        assert!(columns[1].is_nullable());
        assert_eq!(columns[1].default_value(), Some(&Value::from("unknown")));
        // 声明式约束随文档还原，Custom 谓词被丢弃
        assert_eq!(columns[1].constraints().len(), 1);
        assert!(columns[1].constraints()[0].is_serializable());

        // 行值逐项一致
        let alice = users.find_row_by_pk(&Value::Int32(1))?.unwrap();
        assert_eq!(alice.get_by_name("name")?, &Value::from("Alice"));
        assert_eq!(alice.get_by_name("score")?, &Value::Double(99.5));
        assert_eq!(alice.get_by_name("big")?, &Value::Int64(1_234_567_890_123));
        assert_eq!(alice.get_by_name("active")?, &Value::Boolean(true));
        let bob = users.find_row_by_pk(&Value::Int32(2))?.unwrap();
        assert_eq!(bob.get_by_name("score")?, &Value::Null);
        Ok(())
    }

    /// 单元测试：
    /// 文档字段名是兼容性契约
    #[test]
    fn test_document_field_names() -> Result<()> {
        let db = sample_database();
        let doc = DatabaseDoc::from_database(&db)?;
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&doc)?)?;

        let table = &json["tables"][1];
        assert_eq!(table["name"], "users");
        assert_eq!(table["primary_key_column"], "id");
        let col = &table["columns"][0];
        assert_eq!(col["name"], "id");
        assert_eq!(col["type_index"], 2);
        assert_eq!(col["nullable"], false);
        assert_eq!(col["unique"], true);
        assert_eq!(col["has_default"], false);
        let val = &table["rows"][0]["values"][0];
        assert_eq!(val["type_index"], 2);
        assert_eq!(val["numeric_data"], 1.0);
        Ok(())
    }

    /// 单元测试：
    /// 重命名失败时目标文件保持原状，临时文件也不残留
    #[test]
    fn test_failed_save_leaves_no_tmp_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // 目标路径被一个目录占用，rename 必然失败
        let target = dir.path().join("db.json");
        std::fs::create_dir(&target)?;

        let db = sample_database();
        assert!(matches!(db.try_save(&target), Err(Error::IO(_))));

        let mut tmp = target.into_os_string();
        tmp.push(".tmp");
        assert!(!std::path::PathBuf::from(tmp).exists());
        Ok(())
    }

    /// 单元测试：
    /// 加载失败时目标库保持原状
    #[test]
    fn test_failed_load_leaves_db_untouched() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let db = Database::new("testdb");
        db.create_simple_table("keep", &[("id", ValueType::Int32, false)], "id")?;

        // 文件不存在
        assert!(!db.load(dir.path().join("missing.json")));
        assert!(db.has_table("keep"));

        // 文档格式非法
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json")?;
        assert!(!db.load(&bad));
        assert!(db.has_table("keep"));

        // 结构非法：未知类型标签
        let ugly = dir.path().join("ugly.json");
        std::fs::write(
            &ugly,
            r#"{"tables":[{"name":"t","columns":[{"name":"id","type_index":9,
               "nullable":false,"unique":true,"default_value":{"type_index":0,
               "string_data":"","numeric_data":0.0,"bool_data":false},
               "has_default":false}],"rows":[],"primary_key_column":"id"}]}"#,
        )?;
        assert!(!db.load(&ugly));
        assert!(db.has_table("keep"));
        assert_eq!(db.table_count()?, 1);
        Ok(())
    }

    /// 单元测试：
    /// 加载整体替换旧的表集合
    #[test]
    fn test_load_replaces_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.json");

        let db = sample_database();
        assert!(db.save(&path));

        let target = Database::new("target");
        target.create_simple_table("old", &[("id", ValueType::Int32, false)], "id")?;
        assert!(target.load(&path));
        assert!(!target.has_table("old"));
        assert_eq!(target.table_names()?, vec!["tags", "users"]);
        Ok(())
    }
}
