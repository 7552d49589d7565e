pub mod builder;
pub mod config;
pub mod container;
pub mod error;
pub mod opf;
pub mod packager;
pub mod reader;
pub mod template;
pub mod translation;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出构建配置
pub use config::{BuildConfig, DEFAULT_CONFIG_PATH};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出构建和打包
pub use builder::{BuildReport, Builder, OPF_FILE_NAME};
pub use packager::{EPUB_MIMETYPE, package_dir};

// 重新导出模板
pub use template::TemplateSet;

// 重新导出译本解析
pub use translation::{Section, SectionKind, Translation};

// 重新导出EPUB读取器
pub use reader::{BookInfo, Epub};

// 重新导出OPF相关
pub use opf::{
    Creator, Identifier, ManifestItem, Metadata, Opf, SpineItem, ValidationIssue,
    ValidationReport, validate_package,
};
