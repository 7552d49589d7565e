use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use taoforge::epub::DEFAULT_CONFIG_PATH;
use taoforge::{
    BuildConfig, Builder, Epub, OPF_FILE_NAME, Result, Translation, ValidationReport,
    package_dir,
};

/// 📚 TaoForge - EPUB构建工具
#[derive(Parser)]
#[command(name = "taoforge")]
#[command(about = "把XHTML译本构建为EPUB 3电子书")]
#[command(version)]
struct Cli {
    /// 日志详细程度（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// 只输出错误
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 渲染模板并生成构建目录
    Build {
        /// 译本XHTML文件
        translation: PathBuf,

        /// 配置文件路径
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// 输出目录（覆盖配置文件）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 模板目录（覆盖配置文件）
        #[arg(short, long)]
        templates: Option<PathBuf>,

        /// 构建完成后打包为EPUB文件
        #[arg(long)]
        epub: Option<PathBuf>,

        /// 模板中未定义的变量视为错误
        #[arg(long)]
        strict: bool,

        /// 跳过包文件验证
        #[arg(long)]
        no_validate: bool,
    },

    /// 验证content.opf或EPUB文件
    Check {
        /// content.opf 或 .epub 文件
        path: PathBuf,
    },

    /// 按阅读顺序列出译本的章节
    Sections {
        /// 译本XHTML文件
        translation: PathBuf,
    },

    /// 生成默认配置文件
    Init {
        /// 配置文件路径
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match cli.verbose {
        0 if cli.quiet => EnvFilter::new("error"),
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(cli.verbose >= 2))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match cli.command {
        Command::Build {
            translation,
            config,
            output,
            templates,
            epub,
            strict,
            no_validate,
        } => run_build(BuildArgs {
            translation,
            config,
            output,
            templates,
            epub,
            strict,
            no_validate,
        }),
        Command::Check { path } => run_check(&path),
        Command::Sections { translation } => run_sections(&translation),
        Command::Init { path } => run_init(&path),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct BuildArgs {
    translation: PathBuf,
    config: PathBuf,
    output: Option<PathBuf>,
    templates: Option<PathBuf>,
    epub: Option<PathBuf>,
    strict: bool,
    no_validate: bool,
}

/// 构建译本，验证失败时返回false
fn run_build(args: BuildArgs) -> Result<bool> {
    let mut config = BuildConfig::load_or_default(&args.config)?;
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(templates) = args.templates {
        config.templates_dir = Some(templates);
    }
    config.strict |= args.strict;
    if args.no_validate {
        config.validate = false;
    }

    let translation = Translation::from_path(&args.translation)?;
    println!(
        "📖 {} ({}, {} 个章节)",
        translation.title(),
        translation.language(),
        translation.sections().len()
    );

    let report = Builder::new(config)?.build(&translation)?;
    println!(
        "📁 已写入 {} 个文件到 {}",
        report.files.len(),
        report.output_dir.display()
    );

    if let Some(validation) = &report.validation {
        if !print_report(validation) {
            return Ok(false);
        }
    }

    if let Some(epub_path) = args.epub {
        let count = package_dir(&report.output_dir, &epub_path, OPF_FILE_NAME)?;
        println!("📦 已打包 {} ({} 个内容文件)", epub_path.display(), count);
    }

    println!("🎉 构建完成！");
    Ok(true)
}

/// 验证包文件或EPUB，发现问题时返回false
fn run_check(path: &Path) -> Result<bool> {
    let is_epub = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"));

    let report = if is_epub {
        let mut epub = Epub::new(path)?;
        let info = epub.get_book_info()?;
        println!("📚 {} - {}", info.title, info.authors.join(", "));
        match epub.get_cover_image()? {
            Some((data, extension)) => println!("🖼️  封面: {} ({} 字节)", extension, data.len()),
            None => println!("🖼️  没有封面图片"),
        }
        epub.check()?
    } else {
        let xml = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or(Path::new(""));
        taoforge::epub::opf::validate_package_files(&xml, |href| base.join(href).is_file())
    };

    Ok(print_report(&report))
}

fn run_sections(translation: &Path) -> Result<bool> {
    let translation = Translation::from_path(translation)?;
    println!("📖 {}", translation.title());
    for (i, section) in translation.sections().iter().enumerate() {
        println!(
            "  {}. [{}] {} -> {} ({} 词)",
            i + 1,
            section.kind,
            section.label(),
            section.file_name(),
            section.word_count
        );
    }
    Ok(true)
}

fn run_init(path: &Path) -> Result<bool> {
    if path.exists() {
        println!("⚠️  {} 已存在，未覆盖", path.display());
        return Ok(false);
    }
    BuildConfig::generate_default_config(path)?;
    println!("✅ 已生成默认配置文件: {}", path.display());
    Ok(true)
}

/// 打印验证结果，没有问题时返回true
fn print_report(report: &ValidationReport) -> bool {
    if report.is_valid() {
        println!("✅ 包文件验证通过");
        return true;
    }

    println!("❌ 发现 {} 个问题:", report.len());
    for (i, issue) in report.issues.iter().enumerate() {
        println!("  {}. {}", i + 1, issue);
    }
    false
}
