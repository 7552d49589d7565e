//! 译本文档模块
//!
//! 一个译本是一份XHTML文档：`<head>` 中的 `<title>` 和 `<meta name content>` 提供书籍元数据，
//! `<body>` 中的每个 `<section epub:type>` 是一个章节。

mod section;
pub mod xhtml;

pub use section::{Section, SectionKind, title_case};

use crate::epub::config::BuildConfig;
use crate::epub::error::{EpubError, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

static HTML_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("html"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("head > title"));
static META_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("head > meta[name]"));
static SECTION_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("body section"));

/// 模板中用 `{{#if}}` 判断的可选变量，没有提供时为null，严格模式下不会报错
const OPTIONAL_VARIABLES: &[&str] = &[
    "series",
    "publisher",
    "date",
    "version",
    "number_of_pages",
    "cover_image",
    "cover_media_type",
    "section_label",
    "section_id",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("静态选择器有效")
}

/// `<head>` 中的一个 `<meta name content>` 标签
#[derive(Debug, Clone, PartialEq)]
pub struct MetaEntry {
    pub name: String,
    pub content: String,
    /// `lang` 属性（用于多语言描述）
    pub lang: Option<String>,
}

/// 目录与清单中的一项
#[derive(Debug, Clone, PartialEq)]
pub struct TocItem {
    pub label: String,
    pub path: String,
    pub id: String,
}

/// 译本文档
#[derive(Debug, Clone)]
pub struct Translation {
    path: Option<PathBuf>,
    language: String,
    title: String,
    metas: Vec<MetaEntry>,
    sections: Vec<Section>,
}

impl Translation {
    /// 从文件加载译本
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut translation = Self::parse_str(&content)?;
        translation.path = Some(path.as_ref().to_path_buf());
        Ok(translation)
    }

    /// 解析译本XHTML内容
    ///
    /// 章节按(类型, 正文章节序号)排序，同一排序键保持文档顺序。
    pub fn parse_str(content: &str) -> Result<Self> {
        let document = Html::parse_document(content);

        let language = document
            .select(&HTML_SELECTOR)
            .next()
            .and_then(|html| html.value().attr("lang").or_else(|| html.value().attr("xml:lang")))
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .ok_or_else(|| EpubError::TranslationError("<html>缺少lang属性".to_string()))?
            .to_string();

        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| EpubError::TranslationError("<head>缺少<title>".to_string()))?;

        let metas = document
            .select(&META_SELECTOR)
            .filter_map(|meta| {
                let element = meta.value();
                Some(MetaEntry {
                    name: element.attr("name")?.to_string(),
                    content: element.attr("content").unwrap_or_default().to_string(),
                    lang: element.attr("lang").map(str::to_string),
                })
            })
            .collect();

        let mut sections = Vec::new();
        for element in document.select(&SECTION_SELECTOR) {
            if is_nested_section(element) {
                continue;
            }
            sections.push(Section::from_element(element)?);
        }

        if sections.is_empty() {
            return Err(EpubError::TranslationError(
                "<body>中没有找到任何<section>".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.id.as_str()) {
                return Err(EpubError::SectionError(format!("章节ID \"{}\" 重复", section.id)));
            }
        }

        sections.sort_by_key(Section::sort_key);

        tracing::debug!("解析译本 \"{}\": {} 个章节", title, sections.len());

        Ok(Self {
            path: None,
            language,
            title,
            metas,
            sections,
        })
    }

    /// 源文件路径
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 语言
    pub fn language(&self) -> &str {
        &self.language
    }

    /// 标题
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 全部meta标签（文档顺序）
    pub fn metas(&self) -> &[MetaEntry] {
        &self.metas
    }

    /// 获取指定名称的meta内容，重复时以最后一个为准
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metas
            .iter()
            .rev()
            .find(|meta| meta.name == name)
            .map(|meta| meta.content.as_str())
    }

    /// 排序后的章节
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// 全部译者
    pub fn translators(&self) -> Vec<&str> {
        self.metas_named("translator")
            .map(|meta| meta.content.as_str())
            .collect()
    }

    /// 全部章节正文的词数
    pub fn word_count(&self) -> usize {
        self.sections.iter().map(|section| section.word_count).sum()
    }

    /// 目录项（阅读顺序）
    pub fn items(&self) -> Vec<TocItem> {
        self.sections
            .iter()
            .map(|section| TocItem {
                label: section.label(),
                path: section.file_name(),
                id: section.id.clone(),
            })
            .collect()
    }

    fn metas_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetaEntry> + 'a {
        self.metas.iter().filter(move |meta| meta.name == name)
    }

    /// 生成模板变量
    ///
    /// 固定变量（语言、标题、标签）可以被同名meta覆盖；
    /// `uuid`、`date_modified`、`word_count` 缺失时自动生成。
    pub fn variables(&self, config: &BuildConfig) -> Result<Value> {
        let mut vars = Map::new();
        vars.insert("language".to_string(), json!(self.language));
        vars.insert("title".to_string(), json!(self.title));
        vars.insert("toc_title".to_string(), json!(config.toc_title));
        vars.insert("cover_label".to_string(), json!(config.cover_label));

        for meta in &self.metas {
            vars.insert(meta.name.clone(), json!(meta.content));
        }

        let translations: Vec<Value> = self
            .translators()
            .into_iter()
            .enumerate()
            .map(|(i, translator)| json!({ "prefix": format!("trl-{}", i + 1), "translator": translator }))
            .collect();
        vars.insert("translations".to_string(), Value::Array(translations));

        let descriptions: Vec<Value> = self
            .metas_named("description")
            .map(|meta| {
                json!({
                    "lang": meta.lang.as_deref().unwrap_or(&self.language),
                    "text": meta.content,
                })
            })
            .collect();
        vars.insert("descriptions".to_string(), Value::Array(descriptions));

        let subjects: Vec<Value> = self
            .metas_named("subject")
            .map(|meta| json!(meta.content))
            .collect();
        vars.insert("subjects".to_string(), Value::Array(subjects));

        let items: Vec<Value> = self
            .items()
            .into_iter()
            .map(|item| json!({ "label": item.label, "path": item.path, "id": item.id }))
            .collect();
        vars.insert("items".to_string(), Value::Array(items.clone()));
        vars.insert("sections".to_string(), Value::Array(items));

        if !vars.contains_key("uuid") {
            let uuid = uuid::Uuid::new_v4().to_string();
            tracing::warn!("译本没有提供uuid，本次构建使用随机生成的 {}", uuid);
            vars.insert("uuid".to_string(), json!(uuid));
        }

        if !vars.contains_key("date_modified") {
            let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
            vars.insert("date_modified".to_string(), json!(now));
        }

        if !vars.contains_key("word_count") {
            vars.insert("word_count".to_string(), json!(self.word_count()));
        }

        if let Some((file_name, media_type)) = config.cover_target()? {
            vars.insert("cover_image".to_string(), json!(file_name));
            vars.insert("cover_media_type".to_string(), json!(media_type));
        }

        vars.insert(
            "generator".to_string(),
            json!(format!("taoforge {}", env!("CARGO_PKG_VERSION"))),
        );

        for name in OPTIONAL_VARIABLES {
            vars.entry(name.to_string()).or_insert(Value::Null);
        }

        Ok(Value::Object(vars))
    }
}

/// 只处理最外层的章节，嵌套的 `<section>` 属于外层章节的内容
fn is_nested_section(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "section")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en">
<head>
  <title>Tao Te Ching</title>
  <meta name="uuid" content="0d9a7a5c-4d3c-4f0c-9d1a-0f5b0f6f1b2c"/>
  <meta name="author" content="Lao Tzu"/>
  <meta name="translator" content="Stephen Mitchell"/>
  <meta name="description" content="A new English version."/>
  <meta name="description" lang="ru" content="Новый перевод."/>
  <meta name="subject" content="Taoism"/>
  <meta name="toc_title" content="Contents"/>
</head>
<body>
  <section epub:type="chapter" id="ch-10"><p>Can you coax your mind from its wandering</p></section>
  <section epub:type="chapter" id="ch-2"><p>When people see some things as beautiful</p></section>
  <section epub:type="foreword"><p>Before the chapters.</p><section epub:type="epigraph"><p>nested</p></section></section>
  <section epub:type="chapter" id="ch-1"><p>The tao that can be told is not the eternal Tao.</p></section>
</body>
</html>"#;

    #[test]
    fn test_metadata_extraction() {
        let translation = Translation::parse_str(SAMPLE).unwrap();
        assert_eq!(translation.language(), "en");
        assert_eq!(translation.title(), "Tao Te Ching");
        assert_eq!(translation.meta("author"), Some("Lao Tzu"));
        assert_eq!(translation.translators(), vec!["Stephen Mitchell"]);
        assert_eq!(translation.meta("missing"), None);
    }

    #[test]
    fn test_sections_are_ordered_numerically() {
        let translation = Translation::parse_str(SAMPLE).unwrap();
        let ids: Vec<&str> = translation.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["foreword", "ch-1", "ch-2", "ch-10"]);
        assert!(translation.sections()[0].xhtml.contains("nested"));
    }

    #[test]
    fn test_variables() {
        let translation = Translation::parse_str(SAMPLE).unwrap();
        let vars = translation.variables(&BuildConfig::default_config()).unwrap();

        assert_eq!(vars["uuid"], "0d9a7a5c-4d3c-4f0c-9d1a-0f5b0f6f1b2c");
        assert_eq!(vars["toc_title"], "Contents");
        assert_eq!(vars["cover_label"], "Cover");
        assert_eq!(vars["translations"][0]["prefix"], "trl-1");
        assert_eq!(vars["descriptions"][1]["lang"], "ru");
        assert_eq!(vars["descriptions"][0]["lang"], "en");
        assert_eq!(vars["subjects"][0], "Taoism");
        assert_eq!(vars["items"][1]["path"], "ch-1.xhtml");
        assert_eq!(vars["items"][1]["label"], "1");
        assert_eq!(vars["sections"], vars["items"]);
        assert!(vars["date_modified"].as_str().unwrap().ends_with('Z'));
        assert_eq!(vars["word_count"], json!(translation.word_count()));
        assert!(vars["cover_image"].is_null());
        assert!(vars["publisher"].is_null());
    }

    #[test]
    fn test_generated_uuid_when_missing() {
        let html = r#"<html lang="zh"><head><title>道德经</title></head><body><section epub:type="chapter" id="ch-1"><p>道可道</p></section></body></html>"#;
        let translation = Translation::parse_str(html).unwrap();
        let vars = translation.variables(&BuildConfig::default_config()).unwrap();
        let uuid = vars["uuid"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(uuid).is_ok());
    }

    #[test]
    fn test_missing_required_parts() {
        let no_lang = r#"<html><head><title>T</title></head><body><section epub:type="preface"></section></body></html>"#;
        assert!(matches!(Translation::parse_str(no_lang), Err(EpubError::TranslationError(_))));

        let no_title = r#"<html lang="en"><head></head><body><section epub:type="preface"></section></body></html>"#;
        assert!(matches!(Translation::parse_str(no_title), Err(EpubError::TranslationError(_))));

        let no_sections = r#"<html lang="en"><head><title>T</title></head><body><p>x</p></body></html>"#;
        assert!(matches!(Translation::parse_str(no_sections), Err(EpubError::TranslationError(_))));
    }

    #[test]
    fn test_duplicate_section_ids() {
        let html = r#"<html lang="en"><head><title>T</title></head><body>
            <section epub:type="preface"></section><section epub:type="preface"></section>
        </body></html>"#;
        assert!(matches!(Translation::parse_str(html), Err(EpubError::SectionError(_))));
    }
}
