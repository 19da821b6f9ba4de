use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 指定 TOML 配置文件路径的环境变量
pub const CONFIG_FILE_VAR: &str = "CRAWLER_CONFIG";

/// 程序配置
///
/// 启动时读取一次，之后只以引用方式传递，运行期间不会再读取环境变量。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 选课系统根地址
    pub base_url: String,
    /// 指定学年度（为空时从选课系统页面获取）
    pub academic_year: Option<String>,
    /// 指定总页数（为空时从结果页面解析）
    pub max_page: Option<u32>,
    /// 解析警告 Webhook 地址
    pub webhook: Option<String>,
    /// 关闭解析警告
    pub no_warning: bool,
    /// 验证码模型权重路径
    pub model_path: String,
    /// 识别前是否做中值滤波
    pub median_filter: bool,
    /// 输出数据根目录
    pub output_root: String,
    /// path.json 中 raw_url 的前缀
    pub raw_base_url: String,
    /// path.json 中 static_url 的前缀
    pub static_base_url: String,
    /// 同时抓取的页面数量
    pub max_concurrent_pages: usize,
    /// 传输错误最大重试次数（None 表示不限）
    pub fetch_max_retries: Option<u32>,
    /// 验证码最大尝试次数（None 表示不限）
    pub captcha_max_attempts: Option<u32>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://selcrs.nsysu.edu.tw/menu1".to_string(),
            academic_year: None,
            max_page: None,
            webhook: None,
            no_warning: false,
            model_path: "model/glyph_classifier.json".to_string(),
            median_filter: true,
            output_root: "data".to_string(),
            raw_base_url: String::new(),
            static_base_url: String::new(),
            max_concurrent_pages: 16,
            fetch_max_retries: None,
            captcha_max_attempts: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（若 `CRAWLER_CONFIG` 指定）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match env_string(CONFIG_FILE_VAR) {
            Some(path) => Self::from_toml_file(Path::new(&path))?,
            None => Self::default(),
        };
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// 仅从环境变量加载（基于默认值）
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件加载，缺失的键使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            AppError::Config(ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, origin: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: origin.to_string(),
                source,
            })
        })
    }

    /// 用环境变量覆盖配置项
    ///
    /// # 参数
    /// - `lookup`: 变量查询函数（测试时可注入）
    fn with_env_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("ACADEMIC_YEAR") {
            self.academic_year = Some(v);
        }
        if let Some(v) = get("MAX_PAGE") {
            self.max_page = Some(parse_var("MAX_PAGE", &v, "u32")?);
        }
        if let Some(v) = get("WEBHOOK") {
            self.webhook = Some(v);
        }
        if get("NO_WARNING").is_some() {
            self.no_warning = true;
        }
        if let Some(v) = get("MODEL_PATH") {
            self.model_path = v;
        }
        if let Some(v) = get("CAPTCHA_MEDIAN_FILTER") {
            self.median_filter = parse_var("CAPTCHA_MEDIAN_FILTER", &v, "bool")?;
        }
        if let Some(v) = get("API_ROOT_PATH") {
            self.output_root = v;
        }
        if let Some(v) = get("RAW_BASE_URL") {
            self.raw_base_url = v;
        }
        if let Some(v) = get("STATIC_BASE_URL") {
            self.static_base_url = v;
        }
        if let Some(v) = get("MAX_CONCURRENT_PAGES") {
            self.max_concurrent_pages = parse_var("MAX_CONCURRENT_PAGES", &v, "usize")?;
        }
        if let Some(v) = get("FETCH_MAX_RETRIES") {
            self.fetch_max_retries = Some(parse_var("FETCH_MAX_RETRIES", &v, "u32")?);
        }
        if let Some(v) = get("CAPTCHA_MAX_ATTEMPTS") {
            self.captcha_max_attempts = Some(parse_var("CAPTCHA_MAX_ATTEMPTS", &v, "u32")?);
        }
        if let Some(v) = get("VERBOSE_LOGGING") {
            self.verbose_logging = parse_var("VERBOSE_LOGGING", &v, "bool")?;
        }

        // 并发数为 0 时信号量永远拿不到许可
        self.max_concurrent_pages = self.max_concurrent_pages.max(1);
        Ok(self)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::env_parse_failed(name, value, expected_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_env_overrides(lookup_from(&[
                ("ACADEMIC_YEAR", " 1122 "),
                ("MAX_PAGE", "3"),
                ("NO_WARNING", "1"),
                ("WEBHOOK", ""),
                ("FETCH_MAX_RETRIES", "5"),
            ]))
            .unwrap();

        assert_eq!(config.academic_year.as_deref(), Some("1122"));
        assert_eq!(config.max_page, Some(3));
        assert!(config.no_warning);
        assert_eq!(config.webhook, None);
        assert_eq!(config.fetch_max_retries, Some(5));
        assert_eq!(config.captcha_max_attempts, None);
        assert!(config.median_filter);
    }

    #[test]
    fn test_invalid_env_value_is_fatal() {
        let err = Config::default()
            .with_env_overrides(lookup_from(&[("MAX_PAGE", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("MAX_PAGE"));
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn test_toml_partial_file_uses_defaults() {
        let config = Config::from_toml_str(
            "output_root = \"out\"\nmax_page = 2\nmedian_filter = false\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.output_root, "out");
        assert_eq!(config.max_page, Some(2));
        assert!(!config.median_filter);
        assert_eq!(config.base_url, Config::default().base_url);
    }
}
