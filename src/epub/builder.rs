//! 构建模块
//!
//! 把译本和模板渲染到输出目录：每个文档模板输出一个同名文件，
//! `section.xhtml` 为每个章节输出一个 `<章节ID>.xhtml`。

use crate::epub::config::BuildConfig;
use crate::epub::error::Result;
use crate::epub::opf::{ValidationReport, media_type_for_extension, validate_package_files};
use crate::epub::packager::{collect_files, zip_path};
use crate::epub::template::{SECTION_TEMPLATE, TemplateSet};
use crate::epub::translation::Translation;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 包文件在输出目录中的文件名
pub const OPF_FILE_NAME: &str = "content.opf";

/// 一次构建的结果
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// 输出目录
    pub output_dir: PathBuf,
    /// 写入的文件（相对于输出目录）
    pub files: Vec<PathBuf>,
    /// 包文件验证结果，关闭验证或没有包文件时为None
    pub validation: Option<ValidationReport>,
}

impl BuildReport {
    /// 验证通过或未进行验证
    pub fn is_valid(&self) -> bool {
        self.validation
            .as_ref()
            .is_none_or(ValidationReport::is_valid)
    }
}

/// EPUB构建器
pub struct Builder {
    config: BuildConfig,
    templates: TemplateSet,
}

impl Builder {
    /// 根据配置创建构建器，配置了模板目录时从目录加载模板，否则使用内置模板
    pub fn new(config: BuildConfig) -> Result<Self> {
        let templates = match &config.templates_dir {
            Some(dir) => TemplateSet::from_dir(dir)?,
            None => TemplateSet::builtin()?,
        };
        Ok(Self::with_templates(config, templates))
    }

    /// 使用指定的模板集创建构建器
    pub fn with_templates(config: BuildConfig, templates: TemplateSet) -> Self {
        let templates = templates.with_strict(config.strict);
        Self { config, templates }
    }

    /// 构建配置
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// 模板集
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// 构建译本
    pub fn build(&self, translation: &Translation) -> Result<BuildReport> {
        let output_dir = self.config.output_dir.clone();
        fs::create_dir_all(&output_dir)?;
        tracing::info!("构建 \"{}\" 到 {}", translation.title(), output_dir.display());

        let mut vars = translation.variables(&self.config)?;
        let mut files = Vec::new();

        let cover = self.config.cover_target()?;
        if let (Some(source), Some((file_name, _))) = (&self.config.cover_image, &cover) {
            fs::copy(source, output_dir.join(file_name))?;
            tracing::debug!("复制封面 {} -> {}", source.display(), file_name);
            files.push(PathBuf::from(file_name));
        }

        let assets = self.copy_assets(
            &output_dir,
            translation,
            cover.as_ref().map(|(name, _)| name.as_str()),
            &mut files,
        )?;
        insert_var(&mut vars, "assets", Value::Array(assets));

        for name in self.templates.documents() {
            let rendered = self.templates.render_template(name, &vars)?;
            write_output(&output_dir, name, &rendered, &mut files)?;
        }

        if self.templates.has_section_template() {
            for section in translation.sections() {
                let mut section_vars = vars.clone();
                insert_var(&mut section_vars, "section_body", json!(section.xhtml));
                insert_var(&mut section_vars, "section_label", json!(section.label()));
                insert_var(&mut section_vars, "section_id", json!(section.id));

                let rendered = self.templates.render_template(SECTION_TEMPLATE, &section_vars)?;
                write_output(&output_dir, &section.file_name(), &rendered, &mut files)?;
            }
        } else {
            tracing::warn!("模板集中没有 {}，跳过章节输出", SECTION_TEMPLATE);
        }

        let validation = if self.config.validate {
            self.validate_output(&output_dir)?
        } else {
            None
        };

        tracing::info!("构建完成，共写入 {} 个文件", files.len());

        Ok(BuildReport {
            output_dir,
            files,
            validation,
        })
    }

    /// 验证输出目录中的包文件，没有包文件时返回None
    pub fn validate_output(&self, output_dir: &Path) -> Result<Option<ValidationReport>> {
        let opf_path = output_dir.join(OPF_FILE_NAME);
        if !opf_path.is_file() {
            tracing::warn!("输出目录中没有 {}，跳过验证", OPF_FILE_NAME);
            return Ok(None);
        }

        let xml = fs::read_to_string(&opf_path)?;
        let report = validate_package_files(&xml, |href| output_dir.join(href).is_file());
        for issue in &report.issues {
            tracing::warn!("{}", issue);
        }
        Ok(Some(report))
    }

    /// 复制静态资源，返回资源清单变量
    ///
    /// 与模板输出、章节文件或封面同名的文件会被跳过。
    fn copy_assets(
        &self,
        output_dir: &Path,
        translation: &Translation,
        cover_name: Option<&str>,
        files: &mut Vec<PathBuf>,
    ) -> Result<Vec<Value>> {
        let Some(assets_dir) = &self.config.assets_dir else {
            return Ok(Vec::new());
        };

        let section_files: Vec<String> = if self.templates.has_section_template() {
            translation.sections().iter().map(|section| section.file_name()).collect()
        } else {
            Vec::new()
        };
        let reserved: HashSet<&str> = self
            .templates
            .documents()
            .chain(section_files.iter().map(String::as_str))
            .chain(cover_name)
            .collect();

        let mut assets = Vec::new();
        for relative in collect_files(assets_dir)? {
            let href = zip_path(&relative);
            if reserved.contains(href.as_str()) {
                tracing::warn!("资源 {} 与生成的文件同名，已跳过", href);
                continue;
            }

            let target = output_dir.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(assets_dir.join(&relative), &target)?;

            let extension = relative
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            let media_type = media_type_for_extension(&extension).unwrap_or_else(|| {
                tracing::warn!("无法识别资源 {} 的媒体类型", href);
                "application/octet-stream"
            });

            assets.push(json!({
                "path": href,
                "id": format!("asset-{}", assets.len() + 1),
                "media_type": media_type,
            }));
            files.push(relative);
        }

        tracing::debug!("复制了 {} 个静态资源", assets.len());
        Ok(assets)
    }
}

fn insert_var(vars: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = vars {
        map.insert(key.to_string(), value);
    }
}

fn write_output(output_dir: &Path, name: &str, content: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    fs::write(output_dir.join(name), content)?;
    tracing::debug!("写入 {}", name);
    files.push(PathBuf::from(name));
    Ok(())
}
