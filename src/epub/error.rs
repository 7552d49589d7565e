use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// 构建、打包、读取EPUB时的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("文件不是有效的EPUB格式: {0}")]
    InvalidEpub(String),

    #[error("缺少mimetype文件")]
    MissingMimetype,

    #[error("无效的mimetype: {expected}, 找到: {found}")]
    InvalidMimetype { expected: String, found: String },

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("模板 {template} 语法错误: {message}")]
    TemplateParseError { template: String, message: String },

    #[error("模板 {template} 渲染错误: {message}")]
    TemplateRenderError { template: String, message: String },

    #[error("译本文档错误: {0}")]
    TranslationError(String),

    #[error("章节错误: {0}")]
    SectionError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    #[error("包文件验证失败: 共{0}个问题")]
    ValidationFailed(usize),
}
