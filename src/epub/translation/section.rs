//! 章节模块
//!
//! 译本文档中每个 `<section epub:type="...">` 对应一个章节，构建时输出为单独的XHTML文件。

use crate::epub::error::{EpubError, Result};
use crate::epub::translation::xhtml;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::fmt;

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2").expect("静态选择器有效"));

/// 章节类型，声明顺序即阅读顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Dedication,
    Foreword,
    Preface,
    Introduction,
    Epigraph,
    Prologue,
    Chapter,
    Epilogue,
    Afterword,
    Footnotes,
    Endnotes,
    Appendix,
    Acknowledgments,
}

impl SectionKind {
    /// 全部章节类型（按阅读顺序）
    pub const ALL: [SectionKind; 13] = [
        SectionKind::Dedication,
        SectionKind::Foreword,
        SectionKind::Preface,
        SectionKind::Introduction,
        SectionKind::Epigraph,
        SectionKind::Prologue,
        SectionKind::Chapter,
        SectionKind::Epilogue,
        SectionKind::Afterword,
        SectionKind::Footnotes,
        SectionKind::Endnotes,
        SectionKind::Appendix,
        SectionKind::Acknowledgments,
    ];

    /// 根据 `epub:type` 属性值获取章节类型
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// `epub:type` 属性值
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::Dedication => "dedication",
            SectionKind::Foreword => "foreword",
            SectionKind::Preface => "preface",
            SectionKind::Introduction => "introduction",
            SectionKind::Epigraph => "epigraph",
            SectionKind::Prologue => "prologue",
            SectionKind::Chapter => "chapter",
            SectionKind::Epilogue => "epilogue",
            SectionKind::Afterword => "afterword",
            SectionKind::Footnotes => "footnotes",
            SectionKind::Endnotes => "endnotes",
            SectionKind::Appendix => "appendix",
            SectionKind::Acknowledgments => "acknowledgments",
        }
    }

    /// 默认标题，题献、题词和正文章节没有默认标题
    pub fn default_title(&self) -> Option<&'static str> {
        match self {
            SectionKind::Dedication | SectionKind::Epigraph | SectionKind::Chapter => None,
            SectionKind::Foreword => Some("Foreword"),
            SectionKind::Preface => Some("Preface"),
            SectionKind::Introduction => Some("Introduction"),
            SectionKind::Prologue => Some("Prologue"),
            SectionKind::Epilogue => Some("Epilogue"),
            SectionKind::Afterword => Some("Afterword"),
            SectionKind::Footnotes | SectionKind::Endnotes => Some("Notes"),
            SectionKind::Appendix => Some("Appendix"),
            SectionKind::Acknowledgments => Some("Acknowledgments"),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 译本中的一个章节
#[derive(Debug, Clone)]
pub struct Section {
    /// 章节类型
    pub kind: SectionKind,
    /// 章节ID，同时决定输出文件名
    pub id: String,
    /// 正文章节的序号（来自 `ch-<数字>` 形式的ID）
    pub chapter: Option<u32>,
    /// 标题
    pub title: Option<String>,
    /// 序列化后的XHTML片段
    pub xhtml: String,
    /// 章节正文的词数
    pub word_count: usize,
}

impl Section {
    /// 从 `<section>` 元素构建章节
    ///
    /// 章节有标题但不含 `h1`/`h2` 时，会在开头插入 `<h2>标题</h2>`。
    pub fn from_element(element: ElementRef<'_>) -> Result<Self> {
        let kind_name = element.value().attr("epub:type").ok_or_else(|| {
            EpubError::SectionError("章节缺少epub:type属性".to_string())
        })?;

        let kind = SectionKind::from_name(kind_name).ok_or_else(|| {
            EpubError::SectionError(format!("无效的章节类型 \"{}\"", kind_name))
        })?;

        let id = element
            .value()
            .attr("id")
            .filter(|id| !id.is_empty())
            .unwrap_or(kind.name())
            .to_string();
        check_section_id(&id)?;

        let (chapter, title) = if kind == SectionKind::Chapter {
            let number = parse_chapter_id(&id)?;
            (Some(number), Some(number.to_string()))
        } else {
            let title = kind.default_title().map(|default| {
                if id == kind.name() {
                    default.to_string()
                } else {
                    title_case(&id)
                }
            });
            (None, title)
        };

        let has_heading = element.select(&HEADING_SELECTOR).next().is_some();
        let heading = title.as_deref().filter(|_| !has_heading);

        Ok(Self {
            kind,
            xhtml: xhtml::serialize_element(element, heading),
            word_count: xhtml::text_content(element).split_whitespace().count(),
            id,
            chapter,
            title,
        })
    }

    /// 目录中显示的标签：有标题时为标题，否则为标题化的ID
    pub fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| title_case(&self.id))
    }

    /// 输出文件名
    pub fn file_name(&self) -> String {
        format!("{}.xhtml", self.id)
    }

    /// 排序键：章节类型在前，正文章节再按序号排列
    ///
    /// 序号按数值比较，`ch-10` 排在 `ch-9` 之后。
    pub fn sort_key(&self) -> (SectionKind, u32) {
        (self.kind, self.chapter.unwrap_or(0))
    }
}

/// 章节ID同时用作文件名、清单ID和href，必须是XML NCName
///
/// NCName不含 `/`、`\` 和 `:`，也不能以 `.` 开头，因此不会指向输出目录之外。
fn check_section_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(EpubError::SectionError(format!(
            "章节ID \"{}\" 不是合法的XML名称",
            id
        )))
    }
}

/// 解析 `ch-<数字>` 形式的正文章节ID
fn parse_chapter_id(id: &str) -> Result<u32> {
    id.strip_prefix("ch-")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| EpubError::SectionError(format!("正文章节ID \"{}\" 无效，应为 ch-<数字>", id)))
}

/// 每个单词首字母大写，其余小写；单词以非字母字符分隔
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}
