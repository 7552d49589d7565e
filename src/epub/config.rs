//! 构建配置模块
//!
//! 提供构建参数的配置管理功能，支持从YAML文件加载配置。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::media_type_for_extension;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "taoforge.yaml";

/// 构建配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// 输出目录
    pub output_dir: PathBuf,
    /// 模板目录，未设置时使用内置模板
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// 静态资源目录（CSS、字体、图片等），原样复制到输出目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
    /// 封面图片路径，复制为输出目录下的 `cover.<扩展名>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<PathBuf>,
    /// 目录页标题
    pub toc_title: String,
    /// 封面页标签
    pub cover_label: String,
    /// 严格模式：模板引用了未定义的变量时报错
    pub strict: bool,
    /// 构建完成后验证生成的OPF包文件
    pub validate: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl BuildConfig {
    /// 获取默认配置
    pub fn default_config() -> Self {
        Self {
            output_dir: PathBuf::from("dist"),
            templates_dir: None,
            assets_dir: None,
            cover_image: None,
            toc_title: "Table of contents".to_string(),
            cover_label: "Cover".to_string(),
            strict: false,
            validate: true,
        }
    }

    /// 从指定的YAML文件加载配置
    ///
    /// # 示例
    ///
    /// ```rust,no_run
    /// use taoforge::BuildConfig;
    /// let config = BuildConfig::from_path("taoforge.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EpubError::ConfigError(format!(
                "无法读取配置文件 {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// 从YAML字符串解析配置，未出现的字段取默认值
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 配置文件存在时加载，不存在时返回默认配置
    ///
    /// 文件存在但格式错误时仍然返回错误。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_path(path)
        } else {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", path.as_ref().display());
            Ok(Self::default_config())
        }
    }

    /// 封面图片在输出目录中的文件名和媒体类型，未配置封面时返回None
    pub fn cover_target(&self) -> Result<Option<(String, &'static str)>> {
        let Some(cover) = &self.cover_image else {
            return Ok(None);
        };

        let extension = cover
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                EpubError::ConfigError(format!("封面图片缺少扩展名: {}", cover.display()))
            })?;

        let media_type = media_type_for_extension(&extension)
            .filter(|media_type| media_type.starts_with("image/"))
            .ok_or_else(|| EpubError::ConfigError(format!("不支持的封面图片格式: {}", extension)))?;

        Ok(Some((format!("cover.{}", extension), media_type)))
    }

    /// 序列化为YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(self)
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))
    }

    /// 生成默认配置文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = Self::default_config().to_yaml()?;

        let content_with_header = format!(
            "# taoforge 构建配置文件\n\
             # 可选字段: templates_dir, assets_dir, cover_image\n\
             # strict: true 时模板中未定义的变量会导致构建失败\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
