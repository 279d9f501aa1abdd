use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};

use crate::command::Invocation;
use crate::config::ToolConfig;
use crate::error::GaqetError;
use crate::layout::{SampleLayout, ensure_dir, link_file};
use crate::manifest::SampleRecord;
use crate::report::{MetricValue, Metrics};
use crate::stage::{Stage, StageId, StagePolicy, Staging};
use crate::stages::read_report;

pub const ASSEMBLY_INDEX_COLUMNS: [&str; 1] = ["LAI"];

const HARVEST_ARGS: [&str; 20] = [
    "-minlenltr", "100", "-maxlenltr", "7000", "-mintsd", "4", "-maxtsd", "6", "-motif", "TGCA",
    "-motifmis", "1", "-similar", "85", "-vic", "10", "-seed", "20", "-seqids", "yes",
];

/// Creates the LAI working directory and links the assembly into it under its
/// own file name; the retriever tools resolve every file relative to it.
pub fn prepare_lai_dir(sample: &SampleRecord, layout: &SampleLayout) -> Result<(), GaqetError> {
    ensure_dir(&layout.lai_dir())?;
    link_file(&sample.assembly, &layout.lai_assembly())
}

/// Shared inputs of the LTR stages of one sample.
#[derive(Debug, Clone)]
pub struct LaiContext {
    assembly: Utf8PathBuf,
    assembly_name: String,
    dir: Utf8PathBuf,
    index: Utf8PathBuf,
    threads: NonZeroUsize,
}

impl LaiContext {
    pub fn new(sample: &SampleRecord, layout: &SampleLayout, threads: NonZeroUsize) -> Self {
        Self {
            assembly: sample.assembly.clone(),
            assembly_name: layout.assembly_name().to_string(),
            dir: layout.lai_dir(),
            index: layout.lai_assembly(),
            threads,
        }
    }

    fn file(&self, suffix: &str) -> Utf8PathBuf {
        self.dir.join(self.local(suffix))
    }

    fn local(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.assembly_name)
    }
}

#[derive(Debug, Clone)]
pub struct SuffixArrayIndex {
    program: String,
    ctx: LaiContext,
}

impl SuffixArrayIndex {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.gt.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for SuffixArrayIndex {
    fn id(&self) -> StageId {
        StageId::Suffixerator
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.index.clone()
    }

    fn marker(&self) -> Utf8PathBuf {
        self.ctx.file("md5")
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("suffixerator")
            .arg("-db")
            .path_arg(&self.ctx.assembly)
            .arg("-indexname")
            .path_arg(&self.ctx.index)
            .args(["-tis", "-suf", "-lcp", "-des", "-ssp", "-sds", "-dna"])
    }

    fn policy(&self) -> StagePolicy {
        StagePolicy::Fatal
    }
}

#[derive(Debug, Clone)]
pub struct LtrHarvest {
    program: String,
    ctx: LaiContext,
}

impl LtrHarvest {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.gt.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for LtrHarvest {
    fn id(&self) -> StageId {
        StageId::LtrHarvest
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.file("harvest.scn")
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("ltrharvest")
            .arg("-index")
            .path_arg(&self.ctx.index)
            .args(HARVEST_ARGS)
            .stdout_to(target)
    }

    fn staging(&self) -> Staging {
        Staging::Atomic
    }
}

#[derive(Debug, Clone)]
pub struct LtrFinder {
    program: String,
    ctx: LaiContext,
}

impl LtrFinder {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.ltr_finder.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for LtrFinder {
    fn id(&self) -> StageId {
        StageId::LtrFinder
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.file("finder.combine.scn")
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-seq")
            .arg(&self.ctx.assembly_name)
            .arg("-threads")
            .arg(self.ctx.threads.to_string())
            .args(["-harvest_out", "-size", "1000000", "-time", "300"])
            .current_dir(&self.ctx.dir)
    }
}

/// Pools harvest and finder candidates into the raw LTR list.
#[derive(Debug, Clone)]
pub struct MergeCandidates {
    program: String,
    ctx: LaiContext,
}

impl MergeCandidates {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.cat.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for MergeCandidates {
    fn id(&self) -> StageId {
        StageId::MergeCandidates
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.file("rawLTR.scn")
    }

    fn invocation(&self, target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .path_arg(&self.ctx.file("harvest.scn"))
            .path_arg(&self.ctx.file("finder.combine.scn"))
            .stdout_to(target)
    }

    fn staging(&self) -> Staging {
        Staging::Atomic
    }
}

#[derive(Debug, Clone)]
pub struct LtrRetriever {
    program: String,
    ctx: LaiContext,
}

impl LtrRetriever {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.ltr_retriever.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for LtrRetriever {
    fn id(&self) -> StageId {
        StageId::LtrRetriever
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.file("mod.pass.list")
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-genome")
            .arg(&self.ctx.assembly_name)
            .arg("-inharvest")
            .arg(self.ctx.local("rawLTR.scn"))
            .arg("-threads")
            .arg(self.ctx.threads.to_string())
            .current_dir(&self.ctx.dir)
    }
}

#[derive(Debug, Clone)]
pub struct LaiScore {
    program: String,
    ctx: LaiContext,
}

impl LaiScore {
    pub fn new(tools: &ToolConfig, ctx: &LaiContext) -> Self {
        Self {
            program: tools.lai.clone(),
            ctx: ctx.clone(),
        }
    }
}

impl Stage for LaiScore {
    fn id(&self) -> StageId {
        StageId::Lai
    }

    fn output(&self) -> Utf8PathBuf {
        self.ctx.file("mod.out.LAI")
    }

    fn invocation(&self, _target: &Utf8Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-genome")
            .arg(&self.ctx.assembly_name)
            .arg("-intact")
            .arg(self.ctx.local("mod.pass.list"))
            .arg("-all")
            .arg(self.ctx.local("mod.out"))
            .current_dir(&self.ctx.dir)
    }
}

pub fn read_lai_report(path: &Utf8Path) -> Result<Metrics, GaqetError> {
    Ok(parse_lai_report(&read_report(path)?))
}

/// Takes the LAI column (seventh field) of the first `whole_genome` row.
pub fn parse_lai_report(text: &str) -> Metrics {
    let mut metrics = Metrics::new();
    let value = text
        .lines()
        .find(|line| line.contains("whole_genome"))
        .and_then(|line| line.split_whitespace().nth(6))
        .and_then(|token| token.parse::<f64>().ok());
    if let Some(value) = value {
        metrics.insert(ASSEMBLY_INDEX_COLUMNS[0].to_string(), MetricValue::Decimal(value));
    }
    metrics
}
