use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 验证码识别错误
    #[error("验证码错误: {0}")]
    Captcha(#[from] CaptchaError),
    /// 选课系统请求错误
    #[error("网络错误: {0}")]
    Portal(#[from] PortalError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 版本记录错误
    #[error("版本错误: {0}")]
    Version(#[from] VersionError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 验证码识别错误
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// 图片解码失败
    #[error("无法解码验证码图片: {source}")]
    DecodeFailed {
        #[source]
        source: image::ImageError,
    },
    /// 图片宽度不足以切成 4 个字符
    #[error("验证码图片过窄 (宽度: {width})，无法切分为 4 个字符")]
    ImageTooNarrow { width: u32 },
    /// 模型权重加载失败
    #[error("无法加载模型权重 ({path}): {reason}")]
    ModelLoadFailed { path: String, reason: String },
    /// 模型结构不合法
    #[error("模型结构不合法: {reason}")]
    InvalidModel { reason: String },
    /// 模型输出数量与字符数不符
    #[error("模型输出 {actual} 个标签，预期 {expected} 个")]
    LabelCountMismatch { expected: usize, actual: usize },
}

/// 选课系统请求错误
#[derive(Debug, Error)]
pub enum PortalError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 传输错误重试次数耗尽
    #[error("请求 {endpoint} 已重试 {attempts} 次仍然失败")]
    RetriesExhausted { endpoint: String, attempts: u32 },
    /// 验证码尝试次数耗尽
    #[error("验证码已尝试 {attempts} 次仍未通过")]
    CaptchaAttemptsExhausted { attempts: u32 },
    /// 页面中找不到学年度选项
    #[error("无法从查询页面找到学年度 (academic_year)")]
    AcademicYearNotFound,
    /// 页面中找不到总页数
    #[error("无法从结果页面解析总页数")]
    PageCountNotFound,
    /// 总页数为 0
    #[error("总页数为 0")]
    ZeroPages,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除文件失败
    #[error("删除文件失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化或解析失败
    #[error("JSON 处理失败 ({path}): {source}")]
    JsonFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 图片保存失败
    #[error("保存图片失败 ({path}): {source}")]
    ImageSaveFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// 目录不存在
    #[error("路径 {path} 不是目录")]
    NotADirectory { path: String },
}

/// 版本记录错误
#[derive(Debug, Error)]
pub enum VersionError {
    /// 学年度代码不合法
    #[error("学年度代码不合法: {code:?}")]
    InvalidAcademicYear { code: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 抓取结果为空
    #[error("抓取结果为空，不发布快照")]
    EmptyDataset,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("无法读取配置文件 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件 TOML 解析失败
    #[error("配置文件 TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建文件删除错误
    pub fn file_delete_failed(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::DeleteFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建 JSON 处理错误
    pub fn json_failed(path: impl AsRef<std::path::Path>, source: serde_json::Error) -> Self {
        AppError::File(FileError::JsonFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建网络请求错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Portal(PortalError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建环境变量解析错误
    pub fn env_parse_failed(
        var_name: impl Into<String>,
        value: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.into(),
            value: value.into(),
            expected_type: expected_type.into(),
        })
    }

    /// 是否为不应写出任何快照的致命结构性错误
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AppError::Business(_)
                | AppError::Version(_)
                | AppError::Portal(
                    PortalError::AcademicYearNotFound
                        | PortalError::PageCountNotFound
                        | PortalError::ZeroPages
                )
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_chains_domain_prefix() {
        let err = AppError::from(VersionError::InvalidAcademicYear {
            code: "11x".to_string(),
        });
        assert_eq!(err.to_string(), "版本错误: 学年度代码不合法: \"11x\"");
    }

    #[test]
    fn test_structural_errors() {
        assert!(AppError::from(BusinessError::EmptyDataset).is_structural());
        assert!(AppError::from(PortalError::ZeroPages).is_structural());
        assert!(!AppError::from(PortalError::CaptchaAttemptsExhausted { attempts: 3 })
            .is_structural());
    }
}
