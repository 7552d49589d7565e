//! 元数据处理模块
//!
//! 提供EPUB元数据的结构定义和处理功能。

use std::collections::HashMap;

/// 元数据值枚举，表示不同类型的元数据
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Dublin Core标签元数据
    DublinCore {
        /// 元素内容
        value: String,
        /// 元素属性（本地名称，如 id、lang、scheme）
        attributes: HashMap<String, String>,
    },
    /// meta标签的自定义元数据
    Meta(MetaValue),
}

/// meta标签值枚举
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// 基于name属性的meta标签，如 <meta name="cover" content="cover-image"/>
    NameBased { content: String },
    /// 基于property属性的meta标签，如 <meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>
    PropertyBased { content: String },
    /// 基于refines属性的meta标签，如 <meta refines="#trl-1" property="role">trl</meta>
    RefinesBased {
        /// 被精化的元素ID（不包含#前缀）
        refines_id: String,
        property: String,
        content: String,
        scheme: Option<String>,
    },
}

impl MetaValue {
    fn content(&self) -> &str {
        match self {
            MetaValue::NameBased { content }
            | MetaValue::PropertyBased { content }
            | MetaValue::RefinesBased { content, .. } => content,
        }
    }
}

/// 创建者或贡献者信息(作者、译者等)
#[derive(Debug, Clone, PartialEq)]
pub struct Creator {
    /// 姓名
    pub name: String,
    /// 角色(如author、translator)
    pub role: Option<String>,
    /// 排序用名称
    pub file_as: Option<String>,
    /// 显示顺序
    pub display_seq: Option<u32>,
    /// 元素ID（用于关联refines元数据）
    pub id: Option<String>,
}

/// 标识符信息
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// 标识符值
    pub value: String,
    /// 标识符类型(如ISBN、UUID等)
    pub scheme: Option<String>,
    /// 元素ID
    pub id: Option<String>,
}

/// 某种语言的书籍描述
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub text: String,
    pub lang: Option<String>,
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// 原始元数据映射：key为标签名（如"title"、"cover"、"dcterms:modified"）
    raw_metadata: HashMap<String, Vec<MetadataValue>>,
    /// 关联元数据映射：key为被精化的元素ID
    refines_metadata: HashMap<String, Vec<MetaValue>>,
}

impl Metadata {
    /// 创建新的元数据实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加Dublin Core元数据
    pub fn add_dublin_core(&mut self, tag: String, value: String, attributes: HashMap<String, String>) {
        self.raw_metadata
            .entry(tag)
            .or_default()
            .push(MetadataValue::DublinCore { value, attributes });
    }

    /// 添加基于name的meta元数据
    pub fn add_meta_name_based(&mut self, name: String, content: String) {
        self.raw_metadata
            .entry(name)
            .or_default()
            .push(MetadataValue::Meta(MetaValue::NameBased { content }));
    }

    /// 添加基于property的meta元数据
    pub fn add_meta_property_based(&mut self, property: String, content: String) {
        self.raw_metadata
            .entry(property)
            .or_default()
            .push(MetadataValue::Meta(MetaValue::PropertyBased { content }));
    }

    /// 添加基于refines的meta元数据
    pub fn add_meta_refines_based(
        &mut self,
        refines_id: String,
        property: String,
        content: String,
        scheme: Option<String>,
    ) {
        self.refines_metadata
            .entry(refines_id.clone())
            .or_default()
            .push(MetaValue::RefinesBased {
                refines_id,
                property,
                content,
                scheme,
            });
    }

    fn first(&self, tag: &str) -> Option<&MetadataValue> {
        self.raw_metadata.get(tag).and_then(|values| values.first())
    }

    fn all(&self, tag: &str) -> impl Iterator<Item = &MetadataValue> {
        self.raw_metadata.get(tag).into_iter().flatten()
    }

    fn first_content(&self, tag: &str) -> Option<String> {
        self.first(tag).map(|value| Self::extract_content(value).to_string())
    }

    /// 获取标题
    pub fn title(&self) -> Option<String> {
        self.first_content("title")
    }

    /// 获取语言
    pub fn language(&self) -> Option<String> {
        self.first_content("language")
    }

    /// 获取出版社
    pub fn publisher(&self) -> Option<String> {
        self.first_content("publisher")
    }

    /// 获取出版日期
    pub fn date(&self) -> Option<String> {
        self.first_content("date")
    }

    /// 获取版权信息
    pub fn rights(&self) -> Option<String> {
        self.first_content("rights")
    }

    /// 获取 `<meta name="cover">` 指向的清单项ID
    pub fn cover(&self) -> Option<String> {
        self.first_content("cover")
    }

    /// 获取修改时间
    pub fn modified(&self) -> Option<String> {
        self.first_content("dcterms:modified")
    }

    /// 按name或property获取meta内容
    pub fn meta(&self, name: &str) -> Option<String> {
        self.all(name).find_map(|value| match value {
            MetadataValue::Meta(meta) => Some(meta.content().to_string()),
            MetadataValue::DublinCore { .. } => None,
        })
    }

    /// 获取所有创建者
    pub fn creators(&self) -> Vec<Creator> {
        self.all("creator").map(|v| self.extract_creator(v)).collect()
    }

    /// 获取所有贡献者
    pub fn contributors(&self) -> Vec<Creator> {
        self.all("contributor").map(|v| self.extract_creator(v)).collect()
    }

    /// 获取所有译者（角色为translator的创建者和贡献者）
    pub fn translators(&self) -> Vec<Creator> {
        self.creators()
            .into_iter()
            .chain(self.contributors())
            .filter(|creator| creator.role.as_deref() == Some("translator"))
            .collect()
    }

    /// 获取所有标识符
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.all("identifier")
            .map(|value| match value {
                MetadataValue::DublinCore { value, attributes } => Identifier {
                    value: value.clone(),
                    scheme: attributes.get("scheme").cloned(),
                    id: attributes.get("id").cloned(),
                },
                MetadataValue::Meta(meta) => Identifier {
                    value: meta.content().to_string(),
                    scheme: None,
                    id: None,
                },
            })
            .collect()
    }

    /// 获取所有描述（按出现顺序，附带xml:lang）
    pub fn descriptions(&self) -> Vec<Description> {
        self.all("description")
            .map(|value| match value {
                MetadataValue::DublinCore { value, attributes } => Description {
                    text: value.clone(),
                    lang: attributes.get("lang").cloned(),
                },
                MetadataValue::Meta(meta) => Description {
                    text: meta.content().to_string(),
                    lang: None,
                },
            })
            .collect()
    }

    /// 获取所有主题
    pub fn subjects(&self) -> Vec<String> {
        self.all("subject")
            .map(|value| Self::extract_content(value).to_string())
            .collect()
    }

    /// 获取精化指定元素的meta
    pub fn refinements(&self, id: &str) -> &[MetaValue] {
        self.refines_metadata
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 获取原始元数据映射
    pub fn raw_metadata(&self) -> &HashMap<String, Vec<MetadataValue>> {
        &self.raw_metadata
    }

    fn extract_content(value: &MetadataValue) -> &str {
        match value {
            MetadataValue::DublinCore { value, .. } => value,
            MetadataValue::Meta(meta) => meta.content(),
        }
    }

    /// 从元数据值中提取创建者信息（支持EPUB3的refines关联）
    fn extract_creator(&self, value: &MetadataValue) -> Creator {
        let MetadataValue::DublinCore { value, attributes } = value else {
            return Creator {
                name: Self::extract_content(value).to_string(),
                role: None,
                file_as: None,
                display_seq: None,
                id: None,
            };
        };

        let mut creator = Creator {
            name: value.clone(),
            role: attributes.get("role").map(|role| relator_name(role)),
            file_as: attributes.get("file-as").cloned(),
            display_seq: None,
            id: attributes.get("id").cloned(),
        };

        if let Some(id) = &creator.id {
            for refines in self.refinements(id) {
                if let MetaValue::RefinesBased {
                    property, content, ..
                } = refines
                {
                    match property.as_str() {
                        "role" => creator.role = Some(relator_name(content)),
                        "file-as" => creator.file_as = Some(content.clone()),
                        "display-seq" => creator.display_seq = content.parse::<u32>().ok(),
                        _ => {}
                    }
                }
            }
        }

        creator
    }
}

/// MARC关系代码转换为角色名
fn relator_name(code: &str) -> String {
    match code {
        "aut" => "author".to_string(),
        "edt" => "editor".to_string(),
        "trl" => "translator".to_string(),
        "ill" => "illustrator".to_string(),
        "bkp" => "producer".to_string(),
        other => other.to_string(),
    }
}
