//! EPUB打包模块
//!
//! 把构建目录压缩为 `.epub` 文件：`mimetype` 必须是第一个条目且不压缩，
//! 之后是 `META-INF/container.xml` 和 `OEBPS/` 下的全部内容文件。

use crate::epub::container::Container;
use crate::epub::error::{EpubError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// EPUB的mimetype
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 压缩包中存放内容文件的目录
pub const CONTENT_DIR: &str = "OEBPS";

/// 打包构建目录
///
/// # 参数
/// * `dir` - 构建输出目录
/// * `epub_path` - 生成的EPUB文件路径
/// * `opf_name` - OPF文件在构建目录中的相对路径
///
/// # 返回值
/// * `Result<usize>` - 写入的内容文件数量（不含mimetype和container.xml）
pub fn package_dir<P, Q>(dir: P, epub_path: Q, opf_name: &str) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let dir = dir.as_ref();
    let epub_path = epub_path.as_ref();

    if !dir.join(opf_name).is_file() {
        return Err(EpubError::InvalidEpub(format!(
            "构建目录 {} 中没有 {}",
            dir.display(),
            opf_name
        )));
    }

    // 在创建输出文件之前收集，避免把输出文件本身打包进去
    let files = collect_files(dir)?;

    let file = File::create(epub_path)?;
    let mut zip = ZipWriter::new(file);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", options_stored)?;
    zip.write_all(EPUB_MIMETYPE.as_bytes())?;

    let container = Container::for_opf(&format!("{}/{}", CONTENT_DIR, zip_path(Path::new(opf_name))));
    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(container.to_xml().as_bytes())?;

    let mut count = 0;
    for relative in &files {
        let entry_name = format!("{}/{}", CONTENT_DIR, zip_path(relative));
        tracing::debug!("打包 {}", entry_name);
        zip.start_file(entry_name, options_deflate)?;
        zip.write_all(&fs::read(dir.join(relative))?)?;
        count += 1;
    }

    zip.finish()?;
    tracing::info!("已生成 {} ({} 个内容文件)", epub_path.display(), count);

    Ok(count)
}

/// 递归收集目录下的全部文件，返回排序后的相对路径
pub(crate) fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(dir, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(root.join(relative))? {
        let entry = entry?;
        let path = relative.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_into(root, &path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// 压缩包内统一使用 `/` 分隔路径
pub(crate) fn zip_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_mimetype_first_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("dist");
        fs::create_dir_all(build.join("images")).unwrap();
        fs::write(build.join("content.opf"), "<package/>").unwrap();
        fs::write(build.join("nav.xhtml"), "<html/>").unwrap();
        fs::write(build.join("images").join("a.png"), [0u8, 1, 2]).unwrap();

        let epub_path = dir.path().join("book.epub");
        let count = package_dir(&build, &epub_path, "content.opf").unwrap();
        assert_eq!(count, 3);

        let mut archive = ZipArchive::new(File::open(&epub_path).unwrap()).unwrap();
        {
            let mut first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), zip::CompressionMethod::Stored);
            let mut content = String::new();
            first.read_to_string(&mut content).unwrap();
            assert_eq!(content, EPUB_MIMETYPE);
        }

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"META-INF/container.xml".to_string()));
        assert!(names.contains(&"OEBPS/images/a.png".to_string()));

        let mut container = String::new();
        archive
            .by_name("META-INF/container.xml")
            .unwrap()
            .read_to_string(&mut container)
            .unwrap();
        let parsed = Container::parse_xml(&container).unwrap();
        assert_eq!(parsed.get_opf_path().as_deref(), Some("OEBPS/content.opf"));
    }

    #[test]
    fn test_missing_opf_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = package_dir(dir.path(), dir.path().join("book.epub"), "content.opf");
        assert!(matches!(result, Err(EpubError::InvalidEpub(_))));
    }

    #[test]
    fn test_output_inside_build_dir_is_not_packed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("content.opf"), "<package/>").unwrap();
        let count = package_dir(dir.path(), dir.path().join("book.epub"), "content.opf").unwrap();
        assert_eq!(count, 1);
    }
}
