//! OPF（Open Packaging Format）文件模块
//!
//! 此模块提供OPF包文件的解析和验证功能，包括元数据、清单、脊柱等信息的提取。

mod manifest;
mod metadata;
mod parser;
mod spine;
mod validate;

pub use manifest::{ManifestItem, media_type_for_extension};
pub use metadata::{Creator, Description, Identifier, MetaValue, Metadata, MetadataValue};
pub use parser::Opf;
pub use spine::SpineItem;
pub use validate::{
    COVER_PAGE_ID, ValidationIssue, ValidationReport, check_well_formed, validate_package,
    validate_package_files,
};
