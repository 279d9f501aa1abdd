use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::{BuscoMode, Lineage, SampleName};
use crate::error::GaqetError;

pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "assembly", "annotation", "alignments", "lineage"];
pub const BUSCO_MODE_COLUMN: &str = "busco_mode";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub name: SampleName,
    pub assembly: Utf8PathBuf,
    pub annotation: Utf8PathBuf,
    pub alignments: Utf8PathBuf,
    pub lineage: Lineage,
    pub busco_mode: BuscoMode,
}

impl SampleRecord {
    fn inputs(&self) -> [(&'static str, &Utf8Path); 3] {
        [
            ("assembly", self.assembly.as_path()),
            ("annotation", self.annotation.as_path()),
            ("alignments", self.alignments.as_path()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    samples: Vec<SampleRecord>,
}

impl Manifest {
    /// Reads and validates a tab-separated manifest, including the existence
    /// of every input file it references.
    pub fn load(path: &Path) -> Result<Self, GaqetError> {
        if !path.exists() {
            return Err(GaqetError::ManifestNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|err| GaqetError::ManifestRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut manifest = Self::parse(&content, &base_dir)?;
        manifest.path = path.to_path_buf();
        manifest.check_inputs()?;
        Ok(manifest)
    }

    /// Parses manifest text; relative paths are resolved against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, GaqetError> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'));

        let (_, header_line) = lines
            .next()
            .ok_or_else(|| GaqetError::ManifestHeader(REQUIRED_COLUMNS.join(", ")))?;
        let header = header_line
            .split('\t')
            .map(|column| column.trim().to_string())
            .collect::<Vec<_>>();

        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !header.iter().any(|column| column == *required))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(GaqetError::ManifestHeader(missing.join(", ")));
        }

        let mut samples = Vec::new();
        let mut seen = HashSet::new();
        for (line, row) in lines {
            let fields = row.split('\t').map(str::trim).collect::<Vec<_>>();
            if fields.len() != header.len() {
                return Err(GaqetError::ManifestRow {
                    line,
                    message: format!(
                        "expected {} tab-separated fields, found {}",
                        header.len(),
                        fields.len()
                    ),
                });
            }
            let cell = |column: &str| -> Result<&str, GaqetError> {
                let value = header
                    .iter()
                    .position(|name| name == column)
                    .map(|idx| fields[idx])
                    .unwrap_or_default();
                if value.is_empty() {
                    return Err(GaqetError::ManifestRow {
                        line,
                        message: format!("empty value for column {column}"),
                    });
                }
                Ok(value)
            };

            let name: SampleName = cell("name")?.parse()?;
            // Output directories must stay distinct on case-insensitive filesystems.
            if !seen.insert(name.as_str().to_lowercase()) {
                return Err(GaqetError::DuplicateSample(name.to_string()));
            }
            let busco_mode = match header.iter().position(|name| name == BUSCO_MODE_COLUMN) {
                Some(idx) if !fields[idx].is_empty() => {
                    fields[idx].parse().map_err(|err| at_line(line, err))?
                }
                _ => BuscoMode::default(),
            };

            samples.push(SampleRecord {
                assembly: resolve_path(base_dir, cell("assembly")?, line)?,
                annotation: resolve_path(base_dir, cell("annotation")?, line)?,
                alignments: resolve_path(base_dir, cell("alignments")?, line)?,
                lineage: cell("lineage")?.parse().map_err(|err| at_line(line, err))?,
                busco_mode,
                name,
            });
        }

        Ok(Self {
            path: PathBuf::new(),
            samples,
        })
    }

    pub fn check_inputs(&self) -> Result<(), GaqetError> {
        for sample in &self.samples {
            for (column, path) in sample.inputs() {
                if !path.as_std_path().exists() {
                    return Err(GaqetError::MissingInput {
                        sample: sample.name.to_string(),
                        column: column.to_string(),
                        path: path.as_std_path().to_path_buf(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    pub fn get(&self, name: &str) -> Option<&SampleRecord> {
        self.samples
            .iter()
            .find(|sample| sample.name.as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn resolve_path(base_dir: &Path, value: &str, line: usize) -> Result<Utf8PathBuf, GaqetError> {
    let joined = base_dir.join(value);
    let absolute = std::path::absolute(&joined).map_err(|err| GaqetError::ManifestRow {
        line,
        message: format!("cannot resolve path {value}: {err}"),
    })?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|path| GaqetError::ManifestRow {
        line,
        message: format!("path is not valid UTF-8: {}", path.display()),
    })
}

fn at_line(line: usize, err: GaqetError) -> GaqetError {
    match err {
        GaqetError::ManifestRow { message, .. } => GaqetError::ManifestRow { line, message },
        other => other,
    }
}
