use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GaqetError;

/// Sample key from the manifest `name` column. Also used verbatim as the
/// per-sample output directory name, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SampleName(String);

impl SampleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleName {
    type Err = GaqetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.starts_with('.')
            && !trimmed
                .chars()
                .any(|ch| matches!(ch, '/' | '\\' | '\0') || ch.is_control());
        if !is_valid {
            return Err(GaqetError::InvalidSampleName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// BUSCO lineage dataset tag, e.g. `eukaryota_odb10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lineage(String);

impl Lineage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Lineage {
    type Err = GaqetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
        if !is_valid {
            return Err(GaqetError::ManifestRow {
                line: 0,
                message: format!("invalid lineage: {value:?}"),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuscoMode {
    #[default]
    Proteins,
    Genome,
    Transcriptome,
}

impl fmt::Display for BuscoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuscoMode::Proteins => write!(f, "proteins"),
            BuscoMode::Genome => write!(f, "genome"),
            BuscoMode::Transcriptome => write!(f, "transcriptome"),
        }
    }
}

impl FromStr for BuscoMode {
    type Err = GaqetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proteins" | "prot" | "protein" => Ok(BuscoMode::Proteins),
            "genome" | "geno" => Ok(BuscoMode::Genome),
            "transcriptome" | "tran" | "transcript" => Ok(BuscoMode::Transcriptome),
            _ => Err(GaqetError::ManifestRow {
                line: 0,
                message: format!("invalid busco_mode: {value:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_sample_name_valid() {
        let name: SampleName = " Athaliana_v1 ".parse().unwrap();
        assert_eq!(name.as_str(), "Athaliana_v1");
    }

    #[test]
    fn parse_sample_name_rejects_paths() {
        for value in ["", "..", "a/b", ".hidden", "a\\b"] {
            let err = value.parse::<SampleName>().unwrap_err();
            assert_matches!(err, GaqetError::InvalidSampleName(_));
        }
    }

    #[test]
    fn parse_lineage() {
        let lineage: Lineage = "viridiplantae_odb10".parse().unwrap();
        assert_eq!(lineage.as_str(), "viridiplantae_odb10");
        assert!("bad lineage".parse::<Lineage>().is_err());
    }

    #[test]
    fn parse_busco_mode_aliases() {
        assert_eq!("prot".parse::<BuscoMode>().unwrap(), BuscoMode::Proteins);
        assert_eq!("Genome".parse::<BuscoMode>().unwrap(), BuscoMode::Genome);
        assert!("rna".parse::<BuscoMode>().is_err());
    }
}
