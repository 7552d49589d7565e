use crate::epub::error::{EpubError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// OPF包文件的媒体类型
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 创建只包含一个OPF rootfile的容器
    pub fn for_opf(full_path: &str) -> Self {
        Self {
            rootfiles: vec![RootFile {
                full_path: full_path.to_string(),
                media_type: OPF_MEDIA_TYPE.to_string(),
            }],
        }
    }

    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container, EpubError>` - 解析后的Container信息
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();
        let mut in_rootfiles = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"rootfiles" => {
                        in_rootfiles = true;
                    }
                    b"rootfile" if in_rootfiles => {
                        let mut full_path = String::new();
                        let mut media_type = String::new();

                        for attr_result in e.attributes() {
                            let attr = attr_result
                                .map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
                            match attr.key.local_name().as_ref() {
                                b"full-path" => {
                                    full_path = String::from_utf8_lossy(&attr.value).to_string();
                                }
                                b"media-type" => {
                                    media_type = String::from_utf8_lossy(&attr.value).to_string();
                                }
                                _ => {}
                            }
                        }

                        if !full_path.is_empty() && !media_type.is_empty() {
                            rootfiles.push(RootFile {
                                full_path,
                                media_type,
                            });
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"rootfiles" {
                        in_rootfiles = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError(
                "没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 获取主要的OPF文件路径
    ///
    /// 优先返回第一个 `application/oebps-package+xml` 类型的rootfile，否则返回第一个rootfile。
    pub fn get_opf_path(&self) -> Option<String> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.media_type == OPF_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
            .map(|rootfile| rootfile.full_path.clone())
    }

    /// 生成container.xml内容
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n",
            "  <rootfiles>\n",
        ));
        for rootfile in &self.rootfiles {
            xml.push_str(&format!(
                "    <rootfile full-path=\"{}\" media-type=\"{}\"/>\n",
                escape_attr(&rootfile.full_path),
                escape_attr(&rootfile.media_type)
            ));
        }
        xml.push_str("  </rootfiles>\n</container>\n");
        xml
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
