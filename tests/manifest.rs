use std::fs;
use std::path::Path;

use assert_matches::assert_matches;

use gaqet::domain::BuscoMode;
use gaqet::error::GaqetError;
use gaqet::manifest::Manifest;

fn write_inputs(root: &Path) {
    for input in ["genome.fa", "ann.gff3", "reads.bam"] {
        fs::write(root.join(input), "data").unwrap();
    }
}

#[test]
fn load_resolves_against_manifest_directory() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path());
    let path = temp.path().join("samples.tsv");
    fs::write(
        &path,
        "name\tassembly\tannotation\talignments\tlineage\tbusco_mode\n\
         Ath\tgenome.fa\tann.gff3\treads.bam\tbrassicales_odb10\ttranscriptome\n\
         \n\
         Osa\tgenome.fa\tann.gff3\treads.bam\tpoales_odb10\t\n",
    )
    .unwrap();

    let manifest = Manifest::load(&path).unwrap();

    assert_eq!(manifest.len(), 2);
    let ath = manifest.get("Ath").unwrap();
    assert_eq!(ath.assembly.as_std_path(), temp.path().join("genome.fa"));
    assert_eq!(ath.busco_mode, BuscoMode::Transcriptome);
    assert_eq!(manifest.get("Osa").unwrap().busco_mode, BuscoMode::Proteins);
    assert_eq!(manifest.path(), path.as_path());
}

#[test]
fn missing_manifest_is_a_config_error() {
    let err = Manifest::load(Path::new("/nonexistent/samples.tsv")).unwrap_err();
    assert!(err.is_config_error());
    assert_matches!(err, GaqetError::ManifestNotFound(_));
}

#[test]
fn missing_required_column_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("samples.tsv");
    fs::write(&path, "name\tassembly\tannotation\tlineage\nsp1\tg.fa\ta.gff\teukaryota_odb10\n").unwrap();

    let err = Manifest::load(&path).unwrap_err();

    assert!(err.is_config_error());
    assert_matches!(err, GaqetError::ManifestHeader(ref missing) if missing == "alignments");
}

#[test]
fn duplicate_sample_names_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path());
    let path = temp.path().join("samples.tsv");
    fs::write(
        &path,
        "name\tassembly\tannotation\talignments\tlineage\n\
         sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n\
         sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n",
    )
    .unwrap();

    let err = Manifest::load(&path).unwrap_err();

    assert_matches!(err, GaqetError::DuplicateSample(ref name) if name == "sp1");
}

#[test]
fn sample_name_cannot_escape_output_root() {
    let err = Manifest::parse(
        "name\tassembly\tannotation\talignments\tlineage\n\
         ../sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n",
        Path::new("/in"),
    )
    .unwrap_err();

    assert_matches!(err, GaqetError::InvalidSampleName(_));
}

#[test]
fn missing_input_file_is_reported_with_its_column() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("genome.fa"), "data").unwrap();
    let path = temp.path().join("samples.tsv");
    fs::write(
        &path,
        "name\tassembly\tannotation\talignments\tlineage\n\
         sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n",
    )
    .unwrap();

    let err = Manifest::load(&path).unwrap_err();

    assert!(err.is_config_error());
    assert_matches!(err, GaqetError::MissingInput { ref column, .. } if column == "annotation");
}

#[test]
fn names_differing_only_in_case_are_duplicates() {
    let err = Manifest::parse(
        "name\tassembly\tannotation\talignments\tlineage\n\
         Sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n\
         sp1\tgenome.fa\tann.gff3\treads.bam\teukaryota_odb10\n",
        Path::new("/in"),
    )
    .unwrap_err();

    assert_matches!(err, GaqetError::DuplicateSample(ref name) if name == "sp1");
}
