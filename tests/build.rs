use std::fs;
use std::path::Path;
use taoforge::{
    BuildConfig, Builder, Epub, OPF_FILE_NAME, Opf, SectionKind, Translation, ValidationIssue,
    package_dir, validate_package,
};

const TRANSLATION: &str = r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en">
<head>
  <title>Tao Te Ching</title>
  <meta name="uuid" content="6f1c2b7e-1d3a-4c55-9a77-2b0e5f4d8c10"/>
  <meta name="author" content="Lao Tzu"/>
  <meta name="translator" content="Stephen Mitchell"/>
  <meta name="translator" content="Ursula K. Le Guin"/>
  <meta name="description" lang="en" content="Eighty-one short chapters &amp; a way."/>
  <meta name="subject" content="Taoism"/>
  <meta name="publisher" content="Open Editions"/>
</head>
<body>
  <section epub:type="endnotes"><p>Notes on the text.</p></section>
  <section epub:type="chapter" id="ch-10"><p>Can you coax your mind from its wandering</p></section>
  <section epub:type="chapter" id="ch-2"><p>When people see some things as beautiful</p></section>
  <section epub:type="chapter" id="ch-1"><p>The tao that can be told is not the eternal Tao</p></section>
  <section epub:type="foreword"><p>A few words first.</p></section>
  <section epub:type="dedication"><p>For my teachers.</p></section>
</body>
</html>
"#;

fn write_translation(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("tao.xhtml");
    fs::write(&path, TRANSLATION).unwrap();
    path
}

#[test]
fn sections_follow_reading_order() {
    let dir = tempfile::tempdir().unwrap();
    let translation = Translation::from_path(write_translation(dir.path())).unwrap();

    let ids: Vec<&str> = translation.sections().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["dedication", "foreword", "ch-1", "ch-2", "ch-10", "endnotes"]
    );
    assert_eq!(translation.sections()[5].kind, SectionKind::Endnotes);
    assert_eq!(translation.translators(), vec!["Stephen Mitchell", "Ursula K. Le Guin"]);
}

#[test]
fn builtin_templates_produce_valid_package() {
    let dir = tempfile::tempdir().unwrap();
    let translation = Translation::from_path(write_translation(dir.path())).unwrap();

    let config = BuildConfig {
        output_dir: dir.path().join("dist"),
        strict: true,
        ..BuildConfig::default_config()
    };
    let report = Builder::new(config).unwrap().build(&translation).unwrap();

    let validation = report.validation.as_ref().unwrap();
    assert!(validation.is_valid(), "{:?}", validation.issues);

    let xml = fs::read_to_string(report.output_dir.join(OPF_FILE_NAME)).unwrap();
    assert!(validate_package(&xml).is_valid());
    assert!(xml.contains("urn:uuid:6f1c2b7e-1d3a-4c55-9a77-2b0e5f4d8c10"));
    assert!(xml.contains("Eighty-one short chapters &amp; a way."));

    let opf = Opf::parse_xml(&xml).unwrap();
    let spine: Vec<&str> = opf.spine.iter().map(|item| item.idref.as_str()).collect();
    assert_eq!(
        spine,
        vec!["cover", "nav", "dedication", "foreword", "ch-1", "ch-2", "ch-10", "endnotes"]
    );
    assert!(!opf.spine[0].linear);
    assert_eq!(opf.metadata.publisher().as_deref(), Some("Open Editions"));
    assert_eq!(opf.metadata.translators().len(), 2);

    let nav = fs::read_to_string(report.output_dir.join("nav.xhtml")).unwrap();
    assert!(nav.contains(r#"<a href="ch-10.xhtml">10</a>"#));

    let chapter = fs::read_to_string(report.output_dir.join("ch-1.xhtml")).unwrap();
    assert!(chapter.contains("<title>1 | Tao Te Ching</title>"));
    assert!(chapter.contains("<h2>1</h2>"));
}

#[test]
fn broken_template_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let templates_dir = dir.path().join("templates");
    fs::create_dir_all(&templates_dir).unwrap();
    fs::write(
        templates_dir.join("content.opf"),
        r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:identifier id="uid">{{uuid}}</dc:identifier></metadata>
<manifest><item href="nav.xhtml" id="nav" media-type="application/xhtml+xml" properties="nav"/></manifest>
<spine><itemref idref="nav"/><itemref idref="missing"/></spine>
</package>"#,
    )
    .unwrap();

    let translation = Translation::from_path(write_translation(dir.path())).unwrap();
    let config = BuildConfig {
        output_dir: dir.path().join("dist"),
        templates_dir: Some(templates_dir),
        ..BuildConfig::default_config()
    };
    let report = Builder::new(config).unwrap().build(&translation).unwrap();

    assert!(!report.is_valid());
    let validation = report.validation.unwrap();
    assert!(validation.contains(&ValidationIssue::DanglingSpineRef("missing".to_string())));
    assert!(validation.contains(&ValidationIssue::MissingFile("nav.xhtml".to_string())));
}

#[test]
fn packaged_epub_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let translation = Translation::from_path(write_translation(dir.path())).unwrap();

    let cover = dir.path().join("Cover.PNG");
    fs::write(&cover, [0x89, b'P', b'N', b'G']).unwrap();

    let config = BuildConfig {
        output_dir: dir.path().join("dist"),
        cover_image: Some(cover),
        ..BuildConfig::default_config()
    };
    let report = Builder::new(config).unwrap().build(&translation).unwrap();
    assert!(report.is_valid());
    assert!(report.output_dir.join("cover.png").is_file());

    let epub_path = dir.path().join("tao.epub");
    package_dir(&report.output_dir, &epub_path, OPF_FILE_NAME).unwrap();

    let mut epub = Epub::new(&epub_path).unwrap();
    assert_eq!(epub.get_opf_path().unwrap(), "OEBPS/content.opf");
    assert!(epub.check().unwrap().is_valid());

    let info = epub.get_book_info().unwrap();
    assert_eq!(info.title, "Tao Te Ching");
    assert_eq!(info.authors, vec!["Lao Tzu".to_string()]);
    assert_eq!(info.language.as_deref(), Some("en"));
    assert!(info.modified.is_some());

    let (data, extension) = epub.get_cover_image().unwrap().unwrap();
    assert_eq!(extension, "png");
    assert_eq!(data.len(), 4);

    // 封面页不在线性阅读顺序中
    let chapters = epub.get_chapters().unwrap();
    assert_eq!(chapters[0].0, "nav.xhtml");
    assert_eq!(chapters.len(), 7);
}
