//! Prediction algorithms and their allele/length compatibility.
//!
//! Each [`PredictionAlgorithm`] answers the capability query
//! [`supports`](PredictionAlgorithm::supports) for an (allele, epitope length) pair.
//! Incompatible combinations are skipped by the engine rather than treated as errors.
//!
//! Allele knowledge comes from an [`AlleleCatalog`]. A catalog loaded from an allele
//! directory uses the per-method tables shipped with the prediction service
//! (`class_i/<method>.tsv` with `MHC` and `PeptideLength` columns, and `class_ii/<method>.tsv`
//! with one allele per line). Without a directory, alleles are classified by name.
//!
//! An allele directory may also hold `cutoffs.csv` (columns `allele` and
//! `allele_specific_cutoff`), the per-allele binding cutoffs read by [`AlleleCutoffs`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use fgoxide::io::{DelimFile, Io};
use serde::Deserialize;

use crate::errors::PipelineError;

/// Epitope length accepted by every class II method.
pub const CLASS_II_LENGTH: usize = 15;

/// Epitope lengths accepted by class I methods when no allele table is loaded.
pub const CLASS_I_LENGTHS: std::ops::RangeInclusive<usize> = 8..=15;

/// File name of the allele-specific cutoff table inside an allele directory.
pub const CUTOFFS_FILE: &str = "cutoffs.csv";

/// Locus prefixes identifying class II alleles by name.
const CLASS_II_LOCI: &[&str] = &["DRA", "DRB", "DQA", "DQB", "DPA", "DPB", "H2-IA", "H2-IE"];

/// MHC class of an allele or algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MhcClass {
    /// Class I (CD8+ T cell epitopes, 8-15mers)
    I,
    /// Class II (CD4+ T cell epitopes, 15mers)
    II,
}

impl MhcClass {
    /// Classifies an allele by its locus name.
    #[must_use]
    pub fn of_allele(allele: &str) -> Self {
        if CLASS_II_LOCI.iter().any(|locus| allele.contains(locus)) { Self::II } else { Self::I }
    }

    fn dir_name(self) -> &'static str {
        match self {
            Self::I => "class_i",
            Self::II => "class_ii",
        }
    }
}

/// A prediction algorithm offered by the external prediction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredictionAlgorithm {
    NetMHC,
    NetMHCpan,
    SMMPMBEC,
    SMM,
    NetMHCcons,
    PickPocket,
    NetMHCIIpan,
    NNalign,
    SMMalign,
}

impl PredictionAlgorithm {
    /// Every supported algorithm, class I first.
    pub const ALL: [PredictionAlgorithm; 9] = [
        Self::NetMHC,
        Self::NetMHCpan,
        Self::SMMPMBEC,
        Self::SMM,
        Self::NetMHCcons,
        Self::PickPocket,
        Self::NetMHCIIpan,
        Self::NNalign,
        Self::SMMalign,
    ];

    /// User-facing algorithm name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NetMHC => "NetMHC",
            Self::NetMHCpan => "NetMHCpan",
            Self::SMMPMBEC => "SMMPMBEC",
            Self::SMM => "SMM",
            Self::NetMHCcons => "NetMHCcons",
            Self::PickPocket => "PickPocket",
            Self::NetMHCIIpan => "NetMHCIIpan",
            Self::NNalign => "NNalign",
            Self::SMMalign => "SMMalign",
        }
    }

    /// Method name understood by the prediction service; also used in artifact names.
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            Self::NetMHC => "ann",
            Self::NetMHCpan => "netmhcpan",
            Self::SMMPMBEC => "smmpmbec",
            Self::SMM => "smm",
            Self::NetMHCcons => "netmhccons",
            Self::PickPocket => "pickpocket",
            Self::NetMHCIIpan => "NetMHCIIpan",
            Self::NNalign => "nn_align",
            Self::SMMalign => "smm_align",
        }
    }

    /// MHC class served by this algorithm.
    #[must_use]
    pub fn mhc_class(self) -> MhcClass {
        match self {
            Self::NetMHCIIpan | Self::NNalign | Self::SMMalign => MhcClass::II,
            _ => MhcClass::I,
        }
    }

    /// Whether the tool must be told the epitope length (`-l`).
    #[must_use]
    pub fn needs_epitope_length(self) -> bool {
        self.mhc_class() == MhcClass::I
    }

    /// Allele name as the prediction service expects it.
    #[must_use]
    pub fn service_allele_name(self, allele: &str) -> String {
        match self.mhc_class() {
            MhcClass::I => allele.to_string(),
            MhcClass::II => allele.replace("-DPB", "/DPB").replace("-DQB", "/DQB"),
        }
    }

    /// Capability query: can this algorithm predict `length`-mers for `allele`?
    #[must_use]
    pub fn supports(self, catalog: &AlleleCatalog, allele: &str, length: usize) -> bool {
        match catalog.table(self) {
            Some(AlleleTable::ClassI(lengths)) => {
                lengths.get(allele).is_some_and(|valid| valid.contains(&length))
            }
            Some(AlleleTable::ClassII(alleles)) => {
                length == CLASS_II_LENGTH && alleles.contains(allele)
            }
            None => {
                MhcClass::of_allele(allele) == self.mhc_class()
                    && match self.mhc_class() {
                        MhcClass::I => CLASS_I_LENGTHS.contains(&length),
                        MhcClass::II => length == CLASS_II_LENGTH,
                    }
            }
        }
    }
}

impl fmt::Display for PredictionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PredictionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s) || a.method().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|a| a.name()).collect();
                format!("unknown prediction algorithm '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Allele knowledge for one algorithm.
#[derive(Debug, Clone)]
enum AlleleTable {
    /// Allele to valid epitope lengths
    ClassI(BTreeMap<String, BTreeSet<usize>>),
    /// Valid alleles (all at length 15)
    ClassII(BTreeSet<String>),
}

/// Row of a class I allele table.
#[derive(Debug, Deserialize)]
struct ClassIAlleleRow {
    #[serde(rename = "MHC")]
    mhc: String,
    #[serde(rename = "PeptideLength")]
    peptide_length: usize,
}

/// Row of the allele-specific cutoff table.
#[derive(Debug, Deserialize)]
struct CutoffRow {
    allele: String,
    allele_specific_cutoff: f64,
}

/// Allele-specific binding cutoffs (IC50, nM), keyed by allele.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlleleCutoffs {
    cutoffs: BTreeMap<String, f64>,
}

impl AlleleCutoffs {
    /// Reads a comma-separated cutoff table with `allele` and `allele_specific_cutoff` columns.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to read allele cutoffs: {}", path.display()))?;
        let mut cutoffs = BTreeMap::new();
        for row in reader.deserialize::<CutoffRow>() {
            let row = row.with_context(|| format!("Failed to read cutoff row from {}", path.display()))?;
            cutoffs.insert(row.allele, row.allele_specific_cutoff);
        }
        Ok(Self { cutoffs })
    }

    /// Cutoff of `allele`, if the table has one.
    #[must_use]
    pub fn cutoff_for(&self, allele: &str) -> Option<f64> {
        self.cutoffs.get(allele).copied()
    }

    /// Every (allele, cutoff) pair, sorted by allele.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.cutoffs.iter().map(|(allele, cutoff)| (allele.as_str(), *cutoff))
    }

    /// Number of alleles with a cutoff.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cutoffs.len()
    }

    /// True if no allele has a cutoff.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }
}

impl FromIterator<(String, f64)> for AlleleCutoffs {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { cutoffs: iter.into_iter().collect() }
    }
}

/// Source of allele validity for every algorithm.
#[derive(Debug, Clone, Default)]
pub struct AlleleCatalog {
    dir: Option<PathBuf>,
    tables: HashMap<PredictionAlgorithm, AlleleTable>,
}

impl AlleleCatalog {
    /// A catalog that classifies alleles by name only.
    #[must_use]
    pub fn by_name() -> Self {
        Self::default()
    }

    /// Loads the allele tables of `algorithms` from `dir`.
    pub fn load(dir: &Path, algorithms: &[PredictionAlgorithm]) -> Result<Self> {
        let mut tables = HashMap::new();
        for &algorithm in algorithms {
            let class = algorithm.mhc_class();
            let path = dir.join(class.dir_name()).join(format!("{}.tsv", algorithm.method()));
            let table = match class {
                MhcClass::I => {
                    let rows: Vec<ClassIAlleleRow> = DelimFile::default()
                        .read_tsv(&path)
                        .with_context(|| format!("Failed to read allele table: {}", path.display()))?;
                    let mut lengths: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
                    for row in rows {
                        lengths.entry(row.mhc).or_default().insert(row.peptide_length);
                    }
                    AlleleTable::ClassI(lengths)
                }
                MhcClass::II => {
                    let lines = Io::default()
                        .read_lines(&path)
                        .with_context(|| format!("Failed to read allele table: {}", path.display()))?;
                    AlleleTable::ClassII(
                        lines.into_iter().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect(),
                    )
                }
            };
            tables.insert(algorithm, table);
        }
        Ok(Self { dir: Some(dir.to_path_buf()), tables })
    }

    /// Sorted valid allele names for an algorithm, if its table is loaded.
    #[must_use]
    pub fn valid_alleles(&self, algorithm: PredictionAlgorithm) -> Option<Vec<String>> {
        self.table(algorithm).map(|table| match table {
            AlleleTable::ClassI(lengths) => lengths.keys().cloned().collect(),
            AlleleTable::ClassII(alleles) => alleles.iter().cloned().collect(),
        })
    }

    /// Checks that every allele is valid for at least one loaded algorithm.
    ///
    /// A catalog classifying by name has no allele list and accepts every allele.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidParameter`] naming the first unknown allele.
    pub fn check_alleles_valid(&self, alleles: &[String]) -> std::result::Result<(), PipelineError> {
        if self.tables.is_empty() {
            return Ok(());
        }
        let known = |allele: &str| {
            self.tables.values().any(|table| match table {
                AlleleTable::ClassI(lengths) => lengths.contains_key(allele),
                AlleleTable::ClassII(valid) => valid.contains(allele),
            })
        };
        match alleles.iter().find(|allele| !known(allele)) {
            Some(allele) => {
                let mut methods: Vec<_> = self.tables.keys().map(|a| a.name()).collect();
                methods.sort_unstable();
                Err(PipelineError::InvalidParameter {
                    parameter: "alleles".to_string(),
                    reason: format!(
                        "Allele {allele} not valid for any of {}. Run `epiforge valid-alleles` for a list of valid allele names.",
                        methods.join(", ")
                    ),
                })
            }
            None => Ok(()),
        }
    }

    /// Reads the allele-specific cutoffs shipped in the catalog's directory.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidParameter`] if the catalog was not loaded from a directory,
    /// or a read error if `cutoffs.csv` is missing or malformed.
    pub fn cutoffs(&self) -> Result<AlleleCutoffs> {
        let dir = self.dir.as_deref().ok_or_else(|| PipelineError::InvalidParameter {
            parameter: "allele-dir".to_string(),
            reason: format!("allele-specific cutoffs are read from <allele-dir>/{CUTOFFS_FILE}"),
        })?;
        AlleleCutoffs::load(&dir.join(CUTOFFS_FILE))
    }

    fn table(&self, algorithm: PredictionAlgorithm) -> Option<&AlleleTable> {
        self.tables.get(&algorithm)
    }
}
