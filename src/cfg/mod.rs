mod config;

use crate::db_error::Result;
use lazy_static::lazy_static;
use std::sync::Mutex;

pub use config::{get_config_path, Config, ConfigBuilder, ConfigWrapper};

lazy_static! {
    /// 全局配置实例，load_config/set_config 更新，各模块读取
    static ref CONFIG: Mutex<Config> = Mutex::new(Config::default());
}

/// 从配置文件读取并更新全局配置
pub fn load_config() -> Result<Config> {
    let config = Config::load_config()?;
    *CONFIG.lock()? = config.clone();
    Ok(config)
}

/// 直接设置全局配置
pub fn set_config(config: Config) -> Result<()> {
    *CONFIG.lock()? = config;
    Ok(())
}

/// 当前全局配置的一份拷贝
pub fn current_config() -> Result<Config> {
    Ok(CONFIG.lock()?.clone())
}
