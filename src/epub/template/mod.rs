//! 模板模块
//!
//! 用Handlebars渲染EPUB包中的模板文件（`content.opf`、导航文档、章节页等）。
//! 变量输出按XML转义，`{` 也会被转义，渲染结果中不会残留模板占位符。

use crate::epub::error::{EpubError, Result};
use handlebars::Handlebars;
use quick_xml::escape::escape;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// 每个章节渲染一次的模板文件名
pub const SECTION_TEMPLATE: &str = "section.xhtml";

/// 局部模板的扩展名，这类文件不会单独输出，按去掉扩展名的文件名引用
pub const PARTIAL_EXTENSION: &str = "hbs";

/// 内置模板
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("content.opf", include_str!("../../../templates/content.opf")),
    ("nav.xhtml", include_str!("../../../templates/nav.xhtml")),
    ("cover.xhtml", include_str!("../../../templates/cover.xhtml")),
    ("section.xhtml", include_str!("../../../templates/section.xhtml")),
    ("style.css", include_str!("../../../templates/style.css")),
    ("head.hbs", include_str!("../../../templates/head.hbs")),
];

/// 转义变量输出，供 `{{name}}` 使用，`{{{name}}}` 不经过这里
pub fn escape_xml(data: &str) -> String {
    escape(data).replace('{', "&#123;")
}

/// 一组命名模板
pub struct TemplateSet {
    registry: Handlebars<'static>,
    documents: Vec<String>,
    has_section: bool,
}

impl TemplateSet {
    /// 加载内置模板
    pub fn builtin() -> Result<Self> {
        Self::from_sources(
            BUILTIN_TEMPLATES
                .iter()
                .map(|(name, source)| (name.to_string(), source.to_string())),
        )
    }

    /// 从目录加载模板
    ///
    /// 只读取目录第一层中带扩展名的文件，子目录被忽略。
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut sources = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                tracing::warn!("跳过文件名无法识别的模板: {}", path.display());
                continue;
            };
            let source = fs::read_to_string(&path)?;
            sources.push((name.to_string(), source));
        }
        tracing::debug!("从 {} 加载了 {} 个模板", dir.as_ref().display(), sources.len());
        Self::from_sources(sources)
    }

    /// 从(文件名, 源码)列表构建模板集
    pub fn from_sources<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(escape_xml);

        let mut documents = Vec::new();
        let mut has_section = false;
        for (name, source) in sources {
            let partial_name = Path::new(&name)
                .extension()
                .filter(|ext| *ext == PARTIAL_EXTENSION)
                .and_then(|_| Path::new(&name).file_stem())
                .and_then(|stem| stem.to_str())
                .map(str::to_string);

            let result = match &partial_name {
                Some(partial) => registry.register_partial(partial, &source),
                None => registry.register_template_string(&name, &source),
            };
            result.map_err(|e| EpubError::TemplateParseError {
                template: name.clone(),
                message: e.to_string(),
            })?;

            if partial_name.is_some() {
                continue;
            }
            if name == SECTION_TEMPLATE {
                has_section = true;
            } else {
                documents.push(name);
            }
        }
        documents.sort();

        Ok(Self {
            registry,
            documents,
            has_section,
        })
    }

    /// 设置严格模式，未定义的变量视为错误
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.registry.set_strict_mode(strict);
        self
    }

    /// 是否有指定名称的模板或局部模板
    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// 需要单独输出的文档模板名（排除章节模板和局部模板），按名称排序
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(String::as_str)
    }

    /// 是否有章节模板
    pub fn has_section_template(&self) -> bool {
        self.has_section
    }

    /// 模板数量（不含局部模板）
    pub fn len(&self) -> usize {
        self.documents.len() + usize::from(self.has_section)
    }

    /// 是否没有任何模板
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 渲染指定模板
    pub fn render_template(&self, name: &str, context: &Value) -> Result<String> {
        self.registry
            .render(name, context)
            .map_err(|e| EpubError::TemplateRenderError {
                template: name.to_string(),
                message: e.to_string(),
            })
    }
}
