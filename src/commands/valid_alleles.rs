//! List the alleles each prediction algorithm accepts.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use epiforge_lib::algorithm::{AlleleCatalog, AlleleCutoffs, PredictionAlgorithm};
use epiforge_lib::validation::validate_file_exists;
use log::info;

use crate::commands::command::Command;

/// List valid alleles per prediction algorithm.
#[derive(Debug, Parser)]
#[command(
    name = "valid-alleles",
    about = "\x1b[38;5;30m[UTILITIES]\x1b[0m      \x1b[36mList valid alleles per prediction algorithm\x1b[0m",
    long_about = r#"
List the alleles each prediction algorithm accepts, read from per-method allele tables.

The allele directory holds class_i/<method>.tsv tables (columns MHC and PeptideLength)
and class_ii/<method>.tsv lists (one allele per line). Output is one
"<algorithm>\t<allele>" line per allele on stdout.

With --print-cutoffs, the allele-specific binding cutoffs of <allele-dir>/cutoffs.csv are
printed instead, one "<allele>\t<cutoff>" line per allele, sorted by allele.

Example usage:
  epiforge valid-alleles --allele-dir iedb/alleles -p NetMHC
  epiforge valid-alleles --allele-dir iedb/alleles -p NetMHC,SMM --filter HLA-A
  epiforge valid-alleles --allele-dir iedb/alleles --print-cutoffs
"#
)]
pub struct ValidAlleles {
    /// Directory with the per-method allele tables
    #[arg(long = "allele-dir")]
    pub allele_dir: PathBuf,

    /// Algorithms to list (comma separated); all when omitted
    #[arg(short = 'p', long = "algorithms", value_delimiter = ',')]
    pub algorithms: Vec<PredictionAlgorithm>,

    /// Only list alleles containing this text (case insensitive)
    #[arg(short = 'f', long = "filter")]
    pub filter: Option<String>,

    /// Print the allele-specific binding cutoffs instead of the valid alleles
    #[arg(long = "print-cutoffs", default_value = "false")]
    pub print_cutoffs: bool,
}

impl ValidAlleles {
    fn selected(&self) -> Vec<PredictionAlgorithm> {
        if self.algorithms.is_empty() {
            PredictionAlgorithm::ALL.to_vec()
        } else {
            self.algorithms.clone()
        }
    }

    /// Returns `(algorithm, allele)` pairs in algorithm order.
    fn listing(&self, catalog: &AlleleCatalog) -> Vec<(PredictionAlgorithm, String)> {
        let filter = self.filter.as_ref().map(|f| f.to_lowercase());
        self.selected()
            .into_iter()
            .flat_map(|algorithm| {
                catalog
                    .valid_alleles(algorithm)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |allele| (algorithm, allele))
            })
            .filter(|(_, allele)| {
                filter.as_ref().is_none_or(|f| allele.to_lowercase().contains(f.as_str()))
            })
            .collect()
    }

    /// Returns `(allele, cutoff)` pairs sorted by allele, honouring the filter.
    fn cutoff_listing(&self, cutoffs: &AlleleCutoffs) -> Vec<(String, f64)> {
        let filter = self.filter.as_ref().map(|f| f.to_lowercase());
        cutoffs
            .iter()
            .filter(|(allele, _)| filter.as_ref().is_none_or(|f| allele.to_lowercase().contains(f.as_str())))
            .map(|(allele, cutoff)| (allele.to_string(), cutoff))
            .collect()
    }
}

impl Command for ValidAlleles {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_file_exists(&self.allele_dir, "Allele directory")?;
        if !self.allele_dir.is_dir() {
            bail!("Allele directory is not a directory: {}", self.allele_dir.display());
        }
        let catalog = AlleleCatalog::load(&self.allele_dir, &self.selected())?;
        if self.print_cutoffs {
            let listing = self.cutoff_listing(&catalog.cutoffs()?);
            for (allele, cutoff) in &listing {
                println!("{allele}\t{cutoff}");
            }
            info!("Listed {} allele-specific cutoff(s)", listing.len());
            return Ok(());
        }
        let listing = self.listing(&catalog);
        for (algorithm, allele) in &listing {
            println!("{algorithm}\t{allele}");
        }
        info!("Listed {} allele(s)", listing.len());
        Ok(())
    }
}
