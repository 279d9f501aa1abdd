use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::GaqetError;
use crate::manifest::SampleRecord;

pub const SUMMARY_FILE: &str = "GAQET_summary.tsv";
pub const RUN_REPORT_FILE: &str = "gaqet_run.json";

const AGAT_DIR: &str = "GenomeAnnStats";
const BUSCO_DIR: &str = "BUSCOCompleteness";
const LAI_DIR: &str = "LAICompleteness";
const RNASEQ_DIR: &str = "RNASeqCheck";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn summary_path(&self) -> Utf8PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn run_report_path(&self) -> Utf8PathBuf {
        self.root.join(RUN_REPORT_FILE)
    }

    pub fn sample(&self, sample: &SampleRecord) -> SampleLayout {
        SampleLayout {
            dir: self.root.join(sample.name.as_str()),
            assembly_name: file_name(&sample.assembly),
            annotation_stem: file_stem(&sample.annotation),
            alignments_stem: file_stem(&sample.alignments),
            busco_run: format!("RunBusco_{}", sample.lineage),
            lineage: sample.lineage.to_string(),
        }
    }

    pub fn ensure_root(&self) -> Result<(), GaqetError> {
        ensure_dir(&self.root)
    }
}

/// Every path a sample's stages read or write, derived only from the output
/// root and that sample's own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLayout {
    dir: Utf8PathBuf,
    assembly_name: String,
    annotation_stem: String,
    alignments_stem: String,
    busco_run: String,
    lineage: String,
}

impl SampleLayout {
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn agat_dir(&self) -> Utf8PathBuf {
        self.dir.join(AGAT_DIR)
    }

    pub fn agat_report(&self) -> Utf8PathBuf {
        self.agat_dir().join("ResultAgat.txt")
    }

    pub fn busco_dir(&self) -> Utf8PathBuf {
        self.dir.join(BUSCO_DIR)
    }

    pub fn proteins(&self) -> Utf8PathBuf {
        self.busco_dir()
            .join(format!("{}.proteins.faa", self.annotation_stem))
    }

    pub fn cdna(&self) -> Utf8PathBuf {
        self.busco_dir()
            .join(format!("{}.transcripts.fna", self.annotation_stem))
    }

    pub fn busco_run_name(&self) -> &str {
        &self.busco_run
    }

    pub fn busco_run_dir(&self) -> Utf8PathBuf {
        self.busco_dir().join(&self.busco_run)
    }

    pub fn busco_summary(&self) -> Utf8PathBuf {
        self.busco_run_dir().join(format!(
            "short_summary.specific.{}.{}.txt",
            self.lineage, self.busco_run
        ))
    }

    pub fn lai_dir(&self) -> Utf8PathBuf {
        self.dir.join(LAI_DIR)
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    /// Symlink to the assembly inside the LAI directory; doubles as the
    /// suffix-array index name.
    pub fn lai_assembly(&self) -> Utf8PathBuf {
        self.lai_dir().join(&self.assembly_name)
    }

    pub fn rnaseq_dir(&self) -> Utf8PathBuf {
        self.dir.join(RNASEQ_DIR)
    }

    pub fn assembled_transcripts(&self) -> Utf8PathBuf {
        self.rnaseq_dir()
            .join(format!("{}.gtf", self.alignments_stem))
    }

    pub fn comparison_stats(&self) -> Utf8PathBuf {
        self.rnaseq_dir()
            .join(format!("{}.stats", self.alignments_stem))
    }
}

fn file_name(path: &Utf8Path) -> String {
    path.file_name().unwrap_or(path.as_str()).to_string()
}

fn file_stem(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or(path.as_str()).to_string()
}

pub fn ensure_dir(path: &Utf8Path) -> Result<(), GaqetError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| GaqetError::Filesystem(format!("create {path}: {err}")))
}

/// Hidden sibling a stage writes into before its output is promoted.
pub fn staging_path(path: &Utf8Path) -> Utf8PathBuf {
    let name = path.file_name().unwrap_or("output");
    match path.parent() {
        Some(parent) => parent.join(format!(".{name}.partial")),
        None => Utf8PathBuf::from(format!(".{name}.partial")),
    }
}

pub fn promote_staged(staged: &Utf8Path, dest: &Utf8Path) -> Result<(), GaqetError> {
    fs::rename(staged.as_std_path(), dest.as_std_path())
        .map_err(|err| GaqetError::Filesystem(format!("rename {staged} -> {dest}: {err}")))
}

pub fn discard_staged(staged: &Utf8Path) -> Result<(), GaqetError> {
    match fs::remove_file(staged.as_std_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(GaqetError::Filesystem(format!("remove {staged}: {err}"))),
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GaqetError> {
    let parent = path
        .parent()
        .ok_or_else(|| GaqetError::Filesystem(format!("invalid destination path {path}")))?;
    ensure_dir(parent)?;
    let temp = Builder::new()
        .prefix(".gaqet-write")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| GaqetError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| GaqetError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| GaqetError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Points `link` at `target`, leaving an existing link or file untouched.
pub fn link_file(target: &Utf8Path, link: &Utf8Path) -> Result<(), GaqetError> {
    if link.as_std_path().symlink_metadata().is_ok() {
        return Ok(());
    }
    if let Some(parent) = link.parent() {
        ensure_dir(parent)?;
    }
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path());
    #[cfg(not(unix))]
    let result = fs::copy(target.as_std_path(), link.as_std_path()).map(|_| ());
    result.map_err(|err| GaqetError::Filesystem(format!("link {link} -> {target}: {err}")))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::manifest::Manifest;

    fn layout() -> SampleLayout {
        let content = "name\tassembly\tannotation\talignments\tlineage\n\
                       Ath\tTAIR10.fa\tAraport11.gff3\tleaf.sorted.bam\tbrassicales_odb10\n";
        let manifest = Manifest::parse(content, Path::new("/in")).unwrap();
        OutputLayout::new(Utf8PathBuf::from("/out")).sample(&manifest.samples()[0])
    }

    #[test]
    fn layout_paths() {
        let layout = layout();
        assert_eq!(layout.dir(), Utf8Path::new("/out/Ath"));
        assert!(layout.agat_report().ends_with("Ath/GenomeAnnStats/ResultAgat.txt"));
        assert!(layout.proteins().ends_with("BUSCOCompleteness/Araport11.proteins.faa"));
        assert!(layout.cdna().ends_with("BUSCOCompleteness/Araport11.transcripts.fna"));
        assert!(layout.busco_summary().ends_with(
            "RunBusco_brassicales_odb10/short_summary.specific.brassicales_odb10.RunBusco_brassicales_odb10.txt"
        ));
        assert!(layout.lai_assembly().ends_with("LAICompleteness/TAIR10.fa"));
        assert!(layout.assembled_transcripts().ends_with("RNASeqCheck/leaf.sorted.gtf"));
        assert!(layout.comparison_stats().ends_with("RNASeqCheck/leaf.sorted.stats"));
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        let staged = staging_path(Utf8Path::new("/out/Ath/GenomeAnnStats/ResultAgat.txt"));
        assert_eq!(staged, Utf8Path::new("/out/Ath/GenomeAnnStats/.ResultAgat.txt.partial"));
    }

    #[test]
    fn write_bytes_atomic_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("nested").join("summary.tsv");
        write_bytes_atomic(&path, b"first").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "second");
    }
}
