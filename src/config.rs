use serde::{Deserialize, Serialize};
use std::fs;

static mut CONFIG: Option<Config> = None;

#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Config {
    /// 單純形法的數值容差
    pub lp_tolerance: f64,
    /// 單純形法的疊代上限
    pub lp_max_iterations: usize,
    /// 未指定 k 時，不相交路徑查詢預設找幾條
    pub default_disjoint_paths: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lp_tolerance: 1e-9,
            lp_max_iterations: 10_000,
            default_disjoint_paths: 2,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let txt = fs::read_to_string("config.json")
            .or_else(|_| fs::read_to_string("config.example.json"));
        match txt {
            Ok(txt) => serde_json::from_str(&txt).expect("無法解析設定檔"),
            Err(_) => Config::default(),
        }
    }
    pub fn get() -> &'static Self {
        unsafe {
            if CONFIG.is_none() {
                CONFIG = Some(Config::load());
            }
            CONFIG.as_ref().unwrap()
        }
    }
}
