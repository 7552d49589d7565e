//! OPF包文件验证模块
//!
//! 检查渲染后的包文件：XML格式良好、没有残留的模板占位符、脊柱引用都能在清单中找到、
//! 封面和导航文档在清单中存在，以及清单文件实际存在。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::parser::Opf;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashSet;
use std::fmt;

/// 封面页清单项的约定ID
pub const COVER_PAGE_ID: &str = "cover";

/// 单个验证问题
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// XML格式错误
    Malformed(String),
    /// 渲染后仍残留模板占位符
    UnresolvedPlaceholder { line: usize, token: String },
    /// 脊柱引用了不存在的清单项
    DanglingSpineRef(String),
    /// `<meta name="cover">` 指向不存在的清单项
    MissingCoverItem(String),
    /// 封面页没有出现在脊柱中
    CoverPageNotInSpine(String),
    /// 没有具有nav属性的清单项
    MissingNav,
    /// 导航文档没有出现在脊柱中
    NavNotInSpine(String),
    /// 清单项ID重复
    DuplicateManifestId(String),
    /// 多个清单项指向同一个文件
    DuplicateManifestHref(String),
    /// unique-identifier没有指向任何dc:identifier
    MissingUniqueIdentifier(Option<String>),
    /// 脊柱为空
    EmptySpine,
    /// 清单中的文件不存在
    MissingFile(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Malformed(message) => write!(f, "XML格式错误: {}", message),
            ValidationIssue::UnresolvedPlaceholder { line, token } => {
                write!(f, "第{}行残留模板占位符: {}", line, token)
            }
            ValidationIssue::DanglingSpineRef(idref) => {
                write!(f, "脊柱引用的清单项 \"{}\" 不存在", idref)
            }
            ValidationIssue::MissingCoverItem(id) => {
                write!(f, "cover元数据指向的清单项 \"{}\" 不存在", id)
            }
            ValidationIssue::CoverPageNotInSpine(id) => write!(f, "封面页 \"{}\" 不在脊柱中", id),
            ValidationIssue::MissingNav => write!(f, "清单中没有导航文档(nav)"),
            ValidationIssue::NavNotInSpine(id) => write!(f, "导航文档 \"{}\" 不在脊柱中", id),
            ValidationIssue::DuplicateManifestId(id) => write!(f, "清单项ID \"{}\" 重复", id),
            ValidationIssue::DuplicateManifestHref(href) => {
                write!(f, "多个清单项指向同一个文件 \"{}\"", href)
            }
            ValidationIssue::MissingUniqueIdentifier(Some(id)) => {
                write!(f, "unique-identifier \"{}\" 没有对应的dc:identifier", id)
            }
            ValidationIssue::MissingUniqueIdentifier(None) => {
                write!(f, "package元素缺少unique-identifier属性")
            }
            ValidationIssue::EmptySpine => write!(f, "脊柱为空"),
            ValidationIssue::MissingFile(href) => write!(f, "清单中的文件 \"{}\" 不存在", href),
        }
    }
}

/// 验证结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// 没有任何问题
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// 问题数量
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// 添加问题
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// 合并另一份报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// 是否包含指定问题
    pub fn contains(&self, issue: &ValidationIssue) -> bool {
        self.issues.contains(issue)
    }

    /// 有问题时转换为错误
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(EpubError::ValidationFailed(self.len()))
        }
    }
}

/// 检查XML是否格式良好，并查找残留的模板占位符
pub fn check_well_formed(xml: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (index, line) in xml.lines().enumerate() {
        if let Some(start) = line.find("{{") {
            let rest = &line[start..];
            let token = match rest.find("}}") {
                Some(end) => &rest[..end + 2],
                None => rest,
            };
            report.push(ValidationIssue::UnresolvedPlaceholder {
                line: index + 1,
                token: token.to_string(),
            });
        }
    }

    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(text)) if depth == 0 => {
                if text.iter().any(|b| !b.is_ascii_whitespace()) {
                    report.push(ValidationIssue::Malformed("根元素之外存在文本".to_string()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                report.push(ValidationIssue::Malformed(format!(
                    "位置{}: {}",
                    reader.buffer_position(),
                    err
                )));
                return report;
            }
        }
    }

    if depth > 0 {
        report.push(ValidationIssue::Malformed("存在未闭合的元素".to_string()));
    }
    match roots {
        0 => report.push(ValidationIssue::Malformed("没有根元素".to_string())),
        1 => {}
        _ => report.push(ValidationIssue::Malformed("存在多个根元素".to_string())),
    }

    report
}

/// 验证OPF包文件内容：格式良好性 + 结构检查
pub fn validate_package(xml: &str) -> ValidationReport {
    run_validation(xml, None)
}

/// 验证OPF包文件内容，并用 `file_exists` 检查清单文件是否存在
///
/// `file_exists` 接收去掉片段标识后的清单href（相对于OPF文件）。
pub fn validate_package_files<F>(xml: &str, file_exists: F) -> ValidationReport
where
    F: Fn(&str) -> bool,
{
    run_validation(xml, Some(&file_exists))
}

fn run_validation(xml: &str, file_exists: Option<&dyn Fn(&str) -> bool>) -> ValidationReport {
    let mut report = check_well_formed(xml);
    if report
        .issues
        .iter()
        .any(|issue| matches!(issue, ValidationIssue::Malformed(_)))
    {
        return report;
    }

    match Opf::parse_xml(xml) {
        Ok(opf) => {
            report.merge(opf.validate());
            if let Some(file_exists) = file_exists {
                report.merge(opf.validate_files(file_exists));
            }
        }
        Err(err) => report.push(ValidationIssue::Malformed(err.to_string())),
    }

    report
}

impl Opf {
    /// 结构检查：脊柱引用、封面、导航文档、唯一标识符、清单ID和文件的唯一性
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let mut ids = HashSet::new();
        let mut paths = HashSet::new();
        for item in &self.manifest {
            if !ids.insert(item.id.as_str()) {
                report.push(ValidationIssue::DuplicateManifestId(item.id.clone()));
            }
            if !paths.insert(item.file_path()) {
                report.push(ValidationIssue::DuplicateManifestHref(item.href.clone()));
            }
        }

        if self.spine.is_empty() {
            report.push(ValidationIssue::EmptySpine);
        }
        for spine_item in &self.spine {
            if !ids.contains(spine_item.idref.as_str()) {
                report.push(ValidationIssue::DanglingSpineRef(spine_item.idref.clone()));
            }
        }

        let in_spine = |id: &str| self.spine.iter().any(|spine_item| spine_item.idref == id);

        if let Some(cover) = self.metadata.cover() {
            if self.manifest_item(&cover).is_none() {
                report.push(ValidationIssue::MissingCoverItem(cover));
            }
        }

        if let Some(cover_page) = self.manifest_item(COVER_PAGE_ID).filter(|item| item.is_xhtml()) {
            if !in_spine(&cover_page.id) {
                report.push(ValidationIssue::CoverPageNotInSpine(cover_page.id.clone()));
            }
        }

        if self.version.starts_with('3') {
            match self.nav_item() {
                Some(nav) if !in_spine(&nav.id) => {
                    report.push(ValidationIssue::NavNotInSpine(nav.id.clone()));
                }
                Some(_) => {}
                None => report.push(ValidationIssue::MissingNav),
            }
        }

        match &self.unique_identifier {
            Some(uid) => {
                let found = self
                    .metadata
                    .identifiers()
                    .iter()
                    .any(|identifier| identifier.id.as_deref() == Some(uid.as_str()));
                if !found {
                    report.push(ValidationIssue::MissingUniqueIdentifier(Some(uid.clone())));
                }
            }
            None => report.push(ValidationIssue::MissingUniqueIdentifier(None)),
        }

        report
    }

    /// 检查每个清单项对应的文件是否存在
    pub fn validate_files(&self, file_exists: &dyn Fn(&str) -> bool) -> ValidationReport {
        let mut report = ValidationReport::default();
        for item in &self.manifest {
            if !file_exists(item.file_path()) {
                report.push(ValidationIssue::MissingFile(item.href.clone()));
            }
        }
        report
    }
}
