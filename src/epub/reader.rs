use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::epub::container::Container;
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{Opf, ValidationReport, validate_package_files};
use crate::epub::packager::EPUB_MIMETYPE;

/// 书籍的基本信息
#[derive(Debug, Clone, PartialEq)]
pub struct BookInfo {
    pub title: String,
    pub authors: Vec<String>,
    pub translators: Vec<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub modified: Option<String>,
}

/// 表示一个EPUB文件
pub struct Epub {
    archive: ZipArchive<File>,
}

impl Epub {
    /// 从文件路径创建Epub实例
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub, EpubError>` - 成功返回Epub实例，mimetype缺失或错误时返回错误
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Epub> {
        let file = File::open(path.as_ref())?;
        let archive = ZipArchive::new(file)?;

        let mut epub = Epub { archive };
        epub.check_mimetype()?;
        tracing::debug!("已打开 {}", path.as_ref().display());

        Ok(epub)
    }

    /// 检查mimetype文件是否存在且内容为 "application/epub+zip"
    fn check_mimetype(&mut self) -> Result<()> {
        let mut file = self
            .archive
            .by_name("mimetype")
            .map_err(|_| EpubError::MissingMimetype)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let content = content.trim();
        if content != EPUB_MIMETYPE {
            return Err(EpubError::InvalidMimetype {
                expected: EPUB_MIMETYPE.to_string(),
                found: content.to_string(),
            });
        }
        Ok(())
    }

    /// 列出EPUB文件中的所有条目
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            files.push(file.name().to_string());
        }

        Ok(files)
    }

    /// 提取指定文件的文本内容
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 提取指定文件的二进制内容
    pub fn extract_binary_file(&mut self, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(filename)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 解析container.xml文件
    pub fn parse_container(&mut self) -> Result<Container> {
        let container_content = self.extract_file("META-INF/container.xml")?;
        Container::parse_xml(&container_content)
    }

    /// 获取主要的OPF文件路径
    pub fn get_opf_path(&mut self) -> Result<String> {
        let container = self.parse_container()?;

        container.get_opf_path().ok_or_else(|| {
            EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string())
        })
    }

    /// 获取OPF文件所在的目录，位于根目录时为空字符串
    pub fn get_opf_directory(&mut self) -> Result<String> {
        let opf_path = self.get_opf_path()?;
        Ok(opf_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default())
    }

    /// 解析OPF文件
    pub fn parse_opf(&mut self) -> Result<Opf> {
        let opf_path = self.get_opf_path()?;
        let opf_content = self.extract_file(&opf_path)?;

        Opf::parse_xml(&opf_content).map_err(|e| match e {
            EpubError::XmlError(xml_err) => {
                EpubError::OpfParseError(format!("XML解析错误: {}", xml_err))
            }
            other => other,
        })
    }

    /// 获取书籍的基本信息
    pub fn get_book_info(&mut self) -> Result<BookInfo> {
        let opf = self.parse_opf()?;
        let metadata = &opf.metadata;

        let identifier = metadata
            .identifiers()
            .into_iter()
            .find(|identifier| {
                identifier.id.is_some() && identifier.id == opf.unique_identifier
            })
            .or_else(|| metadata.identifiers().into_iter().next())
            .map(|identifier| identifier.value);

        Ok(BookInfo {
            title: metadata.title().unwrap_or_else(|| "未知标题".to_string()),
            authors: metadata.creators().into_iter().map(|creator| creator.name).collect(),
            translators: metadata
                .translators()
                .into_iter()
                .map(|creator| creator.name)
                .collect(),
            language: metadata.language(),
            identifier,
            modified: metadata.modified(),
        })
    }

    /// 获取所有章节内容
    ///
    /// # 返回值
    /// * `Result<Vec<(String, String)>, EpubError>` - 按阅读顺序的(文件路径, 内容)列表
    pub fn get_chapters(&mut self) -> Result<Vec<(String, String)>> {
        let opf = self.parse_opf()?;
        let opf_dir = self.get_opf_directory()?;

        let mut chapters = Vec::new();
        for path in opf.chapter_paths() {
            let full_path = resolve(&opf_dir, &path);
            match self.extract_file(&full_path) {
                Ok(content) => chapters.push((path, content)),
                Err(e) => {
                    tracing::warn!("无法读取章节文件 {}: {}", full_path, e);
                    continue;
                }
            }
        }

        Ok(chapters)
    }

    /// 获取封面图片的二进制数据
    ///
    /// 先按清单中的cover-image属性和 `<meta name="cover">` 查找，
    /// 找不到时退回清单中的第一个图片。
    ///
    /// # 返回值
    /// * `Result<Option<(Vec<u8>, String)>, EpubError>` - (封面数据, 小写扩展名)，没有封面时返回None
    pub fn get_cover_image(&mut self) -> Result<Option<(Vec<u8>, String)>> {
        let opf = self.parse_opf()?;
        let opf_dir = self.get_opf_directory()?;

        let candidates = opf.cover_path().into_iter().chain(opf.image_paths());
        for path in candidates {
            if let Some(result) = self.try_extract_cover(&resolve(&opf_dir, &path))? {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }

    fn try_extract_cover(&mut self, full_path: &str) -> Result<Option<(Vec<u8>, String)>> {
        match self.extract_binary_file(full_path) {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => {
                let extension = Path::new(full_path)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("unknown")
                    .to_lowercase();
                Ok(Some((data, extension)))
            }
            Err(EpubError::Zip(zip::result::ZipError::FileNotFound)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 检查EPUB的包文件，清单中的文件必须存在于压缩包中
    pub fn check(&mut self) -> Result<ValidationReport> {
        let opf_path = self.get_opf_path()?;
        let opf_dir = self.get_opf_directory()?;
        let xml = self.extract_file(&opf_path)?;

        let entries: HashSet<String> = self.list_files()?.into_iter().collect();
        let report =
            validate_package_files(&xml, |href| entries.contains(&resolve(&opf_dir, href)));

        tracing::debug!("{} 检查完成，发现 {} 个问题", opf_path, report.len());
        Ok(report)
    }
}

/// 把相对于OPF文件的路径转换为压缩包内的完整路径
fn resolve(opf_dir: &str, href: &str) -> String {
    if opf_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", opf_dir, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::opf::ValidationIssue;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

    const OPF_XML: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:identifier id="isbn">978-1234567890</dc:identifier>
        <dc:identifier id="uid">urn:uuid:0f0e0d0c-0000-4000-8000-000000000001</dc:identifier>
        <dc:title>Tao Te Ching</dc:title>
        <dc:creator id="author">Lao Tzu</dc:creator>
        <meta refines="#author" property="role" scheme="marc:relators">aut</meta>
        <dc:contributor id="trl-1">Stephen Mitchell</dc:contributor>
        <meta refines="#trl-1" property="role" scheme="marc:relators">trl</meta>
        <dc:language>en</dc:language>
        <meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>
        <meta name="cover" content="cover-image"/>
    </metadata>
    <manifest>
        <item id="cover-image" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
        <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
        <item id="ch-1" href="text/ch-1.xhtml" media-type="application/xhtml+xml"/>
        <item id="ch-2" href="text/ch-2.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine>
        <itemref idref="nav"/>
        <itemref idref="ch-1"/>
        <itemref idref="ch-2"/>
    </spine>
</package>"##;

    /// 创建测试用EPUB，`skip` 中的条目不写入
    fn create_test_epub(dir: &Path, mimetype: &str, skip: &[&str]) -> PathBuf {
        let path = dir.join("test.epub");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();

        let entries: [(&str, &[u8]); 6] = [
            ("mimetype", mimetype.as_bytes()),
            ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
            ("OEBPS/content.opf", OPF_XML.as_bytes()),
            ("OEBPS/nav.xhtml", b"<html/>"),
            ("OEBPS/text/ch-1.xhtml", "<p>The tao that can be told</p>".as_bytes()),
            ("OEBPS/text/ch-2.xhtml", "<p>When people see some things as beautiful</p>".as_bytes()),
        ];
        for (name, data) in entries {
            if skip.contains(&name) {
                continue;
            }
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        if !skip.contains(&"OEBPS/images/cover.jpg") {
            zip.start_file("OEBPS/images/cover.jpg", options).unwrap();
            zip.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        }

        zip.finish().unwrap();
        path
    }

    #[test]
    fn test_invalid_mimetype() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), "invalid/mimetype", &[]);

        match Epub::new(&path) {
            Err(EpubError::InvalidMimetype { expected, found }) => {
                assert_eq!(expected, EPUB_MIMETYPE);
                assert_eq!(found, "invalid/mimetype");
            }
            _ => panic!("期望InvalidMimetype错误"),
        }
    }

    #[test]
    fn test_missing_mimetype() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), EPUB_MIMETYPE, &["mimetype"]);
        assert!(matches!(Epub::new(&path), Err(EpubError::MissingMimetype)));
    }

    #[test]
    fn test_opf_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), EPUB_MIMETYPE, &[]);

        let mut epub = Epub::new(&path).unwrap();
        assert_eq!(epub.get_opf_path().unwrap(), "OEBPS/content.opf");
        assert_eq!(epub.get_opf_directory().unwrap(), "OEBPS");
        assert_eq!(epub.list_files().unwrap().len(), 7);
    }

    #[test]
    fn test_get_book_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), EPUB_MIMETYPE, &[]);

        let mut epub = Epub::new(&path).unwrap();
        let info = epub.get_book_info().unwrap();
        assert_eq!(info.title, "Tao Te Ching");
        assert_eq!(info.authors, vec!["Lao Tzu".to_string()]);
        assert_eq!(info.translators, vec!["Stephen Mitchell".to_string()]);
        assert_eq!(info.language.as_deref(), Some("en"));
        assert_eq!(
            info.identifier.as_deref(),
            Some("urn:uuid:0f0e0d0c-0000-4000-8000-000000000001")
        );
        assert_eq!(info.modified.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_get_chapters_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), EPUB_MIMETYPE, &["OEBPS/text/ch-2.xhtml"]);

        let mut epub = Epub::new(&path).unwrap();
        let chapters = epub.get_chapters().unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].0, "nav.xhtml");
        assert_eq!(chapters[1].0, "text/ch-1.xhtml");
        assert!(chapters[1].1.contains("The tao that can be told"));
    }

    #[test]
    fn test_get_cover_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_epub(dir.path(), EPUB_MIMETYPE, &[]);

        let mut epub = Epub::new(&path).unwrap();
        let (data, extension) = epub.get_cover_image().unwrap().unwrap();
        assert_eq!(extension, "jpg");
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_check_reports_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let complete = create_test_epub(dir.path(), EPUB_MIMETYPE, &[]);
        assert!(Epub::new(&complete).unwrap().check().unwrap().is_valid());

        let broken = create_test_epub(dir.path(), EPUB_MIMETYPE, &["OEBPS/images/cover.jpg"]);
        let report = Epub::new(&broken).unwrap().check().unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.contains(&ValidationIssue::MissingFile("images/cover.jpg".to_string())));
    }
}
