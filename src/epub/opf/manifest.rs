//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

/// 清单项信息
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: &str, href: &str, media_type: &str) -> Self {
        Self {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
        }
    }

    /// 设置属性
    pub fn with_properties(mut self, properties: &str) -> Self {
        self.properties = Some(properties.to_string());
        self
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否为图片文件
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == "application/xhtml+xml"
    }

    /// 去掉片段标识和查询参数后的文件路径
    pub fn file_path(&self) -> &str {
        self.href
            .split(['#', '?'])
            .next()
            .unwrap_or(&self.href)
    }
}

/// 根据文件扩展名（小写，不含点）推断EPUB核心媒体类型
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    let media_type = match extension {
        "xhtml" | "html" | "htm" => "application/xhtml+xml",
        "css" => "text/css",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "js" => "application/javascript",
        "ncx" => "application/x-dtbncx+xml",
        "smil" => "application/smil+xml",
        "mp3" => "audio/mpeg",
        "mp4" | "m4a" => "audio/mp4",
        _ => return None,
    };
    Some(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let item = ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml")
            .with_properties("nav scripted");
        assert!(item.is_nav());
        assert!(item.has_property("scripted"));
        assert!(!item.is_cover_image());
        assert!(item.is_xhtml());
    }

    #[test]
    fn test_file_path_strips_fragment() {
        let item = ManifestItem::new("n", "notes.xhtml#n1", "application/xhtml+xml");
        assert_eq!(item.file_path(), "notes.xhtml");
    }

    #[test]
    fn test_media_types() {
        assert_eq!(media_type_for_extension("png"), Some("image/png"));
        assert_eq!(media_type_for_extension("css"), Some("text/css"));
        assert_eq!(media_type_for_extension("exe"), None);
    }
}
