pub mod epub;

// === 核心API重新导出 ===

/// EPUB构建器（主要接口）
pub use epub::{BuildReport, Builder};

/// 构建配置
pub use epub::BuildConfig;

/// 译本文档
pub use epub::{Section, SectionKind, Translation};

/// 模板
pub use epub::TemplateSet;

/// EPUB文件读取器
pub use epub::{BookInfo, Epub};

/// 错误处理
pub use epub::{EpubError, Result};

// === 底层组件（高级用法） ===

/// 容器组件
pub use epub::{Container, RootFile};

/// OPF组件
pub use epub::{
    Creator, Identifier, ManifestItem, Metadata, Opf, SpineItem, ValidationIssue,
    ValidationReport, validate_package,
};

/// 打包
pub use epub::{EPUB_MIMETYPE, OPF_FILE_NAME, package_dir};

// === 库信息 ===

/// TaoForge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// TaoForge库的描述
pub const DESCRIPTION: &str = "把XHTML译本构建为EPUB 3电子书的工具库";

// === 便捷函数 ===

/// 读取译本并按配置构建到输出目录
///
/// # 示例
///
/// ```no_run
/// use taoforge::BuildConfig;
///
/// let report = taoforge::build("translation.xhtml", BuildConfig::default_config())?;
/// println!("写入了 {} 个文件", report.files.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn build<P: AsRef<std::path::Path>>(translation_path: P, config: BuildConfig) -> Result<BuildReport> {
    let translation = Translation::from_path(translation_path)?;
    Builder::new(config)?.build(&translation)
}

/// 快速打开EPUB文件
///
/// 这是 `Epub::new` 的便捷包装函数。
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Epub> {
    Epub::new(path)
}
