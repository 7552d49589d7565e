//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{manifest::ManifestItem, metadata::Metadata, spine::SpineItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// OPF文件解析结果
#[derive(Debug, Clone)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// package元素的unique-identifier属性
    pub unique_identifier: Option<String>,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项(文件列表)，保持文档顺序
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// 脊柱的目录引用
    pub spine_toc: Option<String>,
}

/// 当前所处的OPF区域
#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    None,
    Metadata,
    Manifest,
    Spine,
}

/// meta标签上的属性
#[derive(Debug, Default)]
struct MetaAttributes {
    name: String,
    content: String,
    property: String,
    refines: String,
    scheme: Option<String>,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut opf = Opf {
            version: String::new(),
            unique_identifier: None,
            metadata: Metadata::new(),
            manifest: Vec::new(),
            spine: Vec::new(),
            spine_toc: None,
        };

        let mut buf = Vec::new();
        let mut region = Region::None;
        let mut text_content = String::new();
        let mut current_attributes = HashMap::new();
        let mut pending_meta: Option<MetaAttributes> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                    match (local_name.as_str(), region) {
                        ("package", _) => opf.parse_package_attributes(e)?,
                        ("metadata", _) => region = Region::Metadata,
                        ("manifest", _) => region = Region::Manifest,
                        ("spine", _) => {
                            region = Region::Spine;
                            opf.spine_toc = attribute(e, b"toc")?;
                        }
                        ("item", Region::Manifest) => opf.parse_manifest_item(e)?,
                        ("itemref", Region::Spine) => opf.parse_spine_item(e)?,
                        ("meta", Region::Metadata) => {
                            let attrs = read_meta_attributes(e)?;
                            if !attrs.name.is_empty() && !attrs.content.is_empty() {
                                opf.metadata
                                    .add_meta_name_based(attrs.name.clone(), attrs.content.clone());
                            }
                            pending_meta = Some(attrs).filter(|attrs| !attrs.property.is_empty());
                            text_content.clear();
                        }
                        (_, Region::Metadata) => {
                            current_attributes = collect_attributes(e);
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::Empty(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                    match (local_name.as_str(), region) {
                        ("spine", _) => opf.spine_toc = attribute(e, b"toc")?,
                        ("item", Region::Manifest) => opf.parse_manifest_item(e)?,
                        ("itemref", Region::Spine) => opf.parse_spine_item(e)?,
                        ("meta", Region::Metadata) => {
                            opf.handle_empty_meta(read_meta_attributes(e)?);
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                    match (local_name.as_str(), region) {
                        ("metadata" | "manifest" | "spine", _) => region = Region::None,
                        ("meta", Region::Metadata) => {
                            if let Some(attrs) = pending_meta.take() {
                                let content = text_content.trim().to_string();
                                if attrs.refines.is_empty() {
                                    opf.metadata.add_meta_property_based(attrs.property, content);
                                } else {
                                    opf.metadata.add_meta_refines_based(
                                        attrs.refines,
                                        attrs.property,
                                        content,
                                        attrs.scheme,
                                    );
                                }
                            }
                        }
                        (_, Region::Metadata) => {
                            // local_name会去掉命名空间前缀：<dc:title> 解析为 "title"
                            let content = text_content.trim();
                            if !content.is_empty() {
                                opf.metadata.add_dublin_core(
                                    local_name,
                                    content.to_string(),
                                    std::mem::take(&mut current_attributes),
                                );
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::CData(e) => {
                    text_content.push_str(&String::from_utf8_lossy(&e));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if opf.version.is_empty() {
            return Err(EpubError::OpfParseError("没有找到package元素或version属性".to_string()));
        }

        Ok(opf)
    }

    /// 解析package元素的version和unique-identifier属性
    fn parse_package_attributes(&mut self, e: &BytesStart) -> Result<()> {
        self.version = attribute(e, b"version")?.unwrap_or_default();
        self.unique_identifier = attribute(e, b"unique-identifier")?;
        Ok(())
    }

    /// 处理空的meta标签，内容在content属性中
    fn handle_empty_meta(&mut self, attrs: MetaAttributes) {
        if !attrs.name.is_empty() && !attrs.content.is_empty() {
            self.metadata
                .add_meta_name_based(attrs.name, attrs.content.clone());
        }

        if attrs.property.is_empty() {
            return;
        }
        if attrs.refines.is_empty() {
            self.metadata.add_meta_property_based(attrs.property, attrs.content);
        } else if !attrs.content.is_empty() {
            self.metadata
                .add_meta_refines_based(attrs.refines, attrs.property, attrs.content, attrs.scheme);
        }
    }

    /// 解析清单项
    fn parse_manifest_item(&mut self, e: &BytesStart) -> Result<()> {
        let item = ManifestItem {
            id: attribute(e, b"id")?.unwrap_or_default(),
            href: attribute(e, b"href")?.unwrap_or_default(),
            media_type: attribute(e, b"media-type")?.unwrap_or_default(),
            properties: attribute(e, b"properties")?,
        };

        if item.id.is_empty() || item.href.is_empty() || item.media_type.is_empty() {
            tracing::warn!("忽略不完整的清单项: id=\"{}\" href=\"{}\"", item.id, item.href);
            return Ok(());
        }

        self.manifest.push(item);
        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(&mut self, e: &BytesStart) -> Result<()> {
        let Some(idref) = attribute(e, b"idref")?.filter(|idref| !idref.is_empty()) else {
            return Ok(());
        };
        let linear = attribute(e, b"linear")?.as_deref() != Some("no");

        self.spine.push(SpineItem { idref, linear });
        Ok(())
    }

    /// 根据ID获取清单项
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 导航文档清单项
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.is_nav())
    }

    /// 获取导航文档的路径
    pub fn nav_path(&self) -> Option<String> {
        self.nav_item().map(|item| item.href.clone())
    }

    /// 获取具有cover-image属性的封面图片路径
    pub fn cover_image_path(&self) -> Option<String> {
        self.manifest
            .iter()
            .find(|item| item.is_cover_image())
            .map(|item| item.href.clone())
    }

    /// 获取封面路径
    ///
    /// 先检查cover-image属性，再检查 `<meta name="cover">` 指向的清单项。
    pub fn cover_path(&self) -> Option<String> {
        self.cover_image_path().or_else(|| {
            let cover = self.metadata.cover()?;
            self.manifest_item(&cover).map(|item| item.href.clone())
        })
    }

    /// 获取所有章节文件的路径(按阅读顺序，跳过非线性项)
    pub fn chapter_paths(&self) -> Vec<String> {
        self.spine
            .iter()
            .filter(|spine_item| spine_item.is_linear())
            .filter_map(|spine_item| self.manifest_item(&spine_item.idref))
            .map(|manifest_item| manifest_item.href.clone())
            .collect()
    }

    /// 获取所有图片文件路径
    pub fn image_paths(&self) -> Vec<String> {
        self.manifest
            .iter()
            .filter(|item| item.is_image())
            .map(|item| item.href.clone())
            .collect()
    }
}

/// 读取指定本地名称的属性值
fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn read_meta_attributes(e: &BytesStart) -> Result<MetaAttributes> {
    let mut attrs = MetaAttributes::default();

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.local_name().as_ref() {
            b"name" => attrs.name = value,
            b"content" => attrs.content = value,
            b"property" => attrs.property = value,
            b"refines" => attrs.refines = value.trim_start_matches('#').to_string(),
            b"scheme" => attrs.scheme = Some(value),
            _ => {}
        }
    }

    Ok(attrs)
}

/// 收集元素的全部属性（键为本地名称，xml:lang 记为 lang）
fn collect_attributes(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|attr_result| attr_result.ok())
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            (key, value)
        })
        .collect()
}
