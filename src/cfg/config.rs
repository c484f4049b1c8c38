use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db_error::Result;

pub fn get_config_path() -> PathBuf {
    PathBuf::from("./tabledb.toml")
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigWrapper {
    pub config: Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // 数据文档的基准目录，save/load 的相对路径以此解析
    pub data_dir: PathBuf,

    // 是否以缩进格式输出 JSON 文档，便于人工检查
    pub pretty_json: bool,

    // 新建表时行存储与主键索引的默认预留容量，0 表示不预留
    #[serde(default)]
    pub default_table_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("."), pretty_json: true, default_table_capacity: 0 }
    }
}

impl Config {
    /// 相对路径基于 data_dir 解析，绝对路径原样使用
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

pub struct ConfigBuilder {
    pub inner: Config,
}

impl ConfigBuilder {
    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.inner.data_dir = dir.into();
        self
    }

    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.inner.pretty_json = pretty;
        self
    }

    pub fn default_table_capacity(mut self, capacity: usize) -> Self {
        self.inner.default_table_capacity = capacity;
        self
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    pub fn build(self) -> Result<Config> {
        self.validate()?;
        Ok(self.inner)
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder { inner: Config::default() }
    }

    pub fn load_config() -> Result<Config> {
        let path = get_config_path();
        // 1、读取配置文件
        let content = std::fs::read_to_string(path)?;
        // 2、解析配置文件
        let wrapper: ConfigWrapper = toml::from_str(&content)?;
        // 3、返回实际的配置
        Ok(wrapper.config)
    }
}

#[cfg(test)]
mod test {
    use crate::cfg::config::Config;
    use crate::db_error::Result;
    use std::path::{Path, PathBuf};

    /// 单元测试：
    /// 测试配置模块的构建方法
    #[test]
    fn build_test() -> Result<()> {
        let config = Config::builder()
            .data_dir("./data")
            .pretty_json(false)
            .default_table_capacity(128)
            .build()?;
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(!config.pretty_json);
        assert_eq!(config.default_table_capacity, 128);
        Ok(())
    }

    /// 单元测试：
    /// 旧配置文件缺少 default_table_capacity 字段时仍可解析，取 0
    #[test]
    fn parse_without_capacity_test() -> Result<()> {
        let wrapper: crate::cfg::ConfigWrapper =
            toml::from_str("[config]\ndata_dir = \"./data\"\npretty_json = true\n")?;
        assert_eq!(wrapper.config.default_table_capacity, 0);
        Ok(())
    }

    /// 单元测试：
    /// 路径解析：相对路径基于 data_dir，绝对路径原样
    #[test]
    fn resolve_test() -> Result<()> {
        let config = Config::builder().data_dir("/var/data").build()?;
        assert_eq!(config.resolve(Path::new("db.json")), PathBuf::from("/var/data/db.json"));
        assert_eq!(config.resolve(Path::new("/tmp/db.json")), PathBuf::from("/tmp/db.json"));
        Ok(())
    }
}
