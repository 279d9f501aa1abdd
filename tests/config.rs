use std::fs;

use assert_matches::assert_matches;

use gaqet::config::{ToolConfig, ToolConfigLoader};
use gaqet::error::GaqetError;

#[test]
fn resolve_reads_explicit_tool_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("tools.json");
    fs::write(&path, r#"{"lai": "/opt/LTR_retriever/LAI", "stringtie": "stringtie2"}"#).unwrap();

    let config = ToolConfigLoader::resolve(path.to_str()).unwrap();

    assert_eq!(config.lai, "/opt/LTR_retriever/LAI");
    assert_eq!(config.stringtie, "stringtie2");
    assert_eq!(config.gffcompare, ToolConfig::default().gffcompare);
}

#[test]
fn unknown_shape_is_a_config_error() {
    let err = ToolConfigLoader::parse(r#"{"busco": 5}"#).unwrap_err();
    assert!(err.is_config_error());
    assert_matches!(err, GaqetError::ToolConfigParse(_));
}

#[test]
fn programs_cover_every_tool() {
    let config = ToolConfig::default();
    let programs = config.programs();
    assert_eq!(programs.len(), 10);
    assert!(programs.contains(&"LTR_FINDER_parallel"));
    assert!(programs.contains(&"agat_sp_statistics.pl"));
}
