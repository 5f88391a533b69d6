//! A stand-in for the external prediction tool.
//!
//! The tool is a POSIX shell script following the prediction tool contract
//! (`<sequences> <output> <method> <allele> -r N [-e exe] [-l length]`). For every FASTA
//! entry it predicts one epitope starting at residue 5 (residue 1 for short entries) with an
//! IC50 that is low for mutant (even) entries and high for wildtype (odd) ones. Every call
//! is appended to a call log (method, allele, length and the `-r` value), and calls for alleles listed in a failure file exit non-zero.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const SCRIPT: &str = r#"#!/bin/sh
sequences="$1"; output="$2"; method="$3"; allele="$4"; shift 4
length=15
retries=none
while [ $# -gt 0 ]; do
    case "$1" in
        -l) length="$2"; shift 2 ;;
        -r) retries="$2"; shift 2 ;;
        -e) shift 2 ;;
        *) shift ;;
    esac
done
echo "$method $allele $length $retries" >> "@CALLS@"
if [ -f "@FAIL@" ] && grep -qxF "$allele" "@FAIL@"; then
    echo "prediction service unavailable" >&2
    exit 1
fi
awk -v allele="$allele" -v len="$length" -v method="$method" '
BEGIN { OFS = "\t"; print "allele", "seq_num", "start", "end", "length", "peptide", "ic50", "percentile" }
/^>/ { id = substr($0, 2); next }
{
    if (length($0) < len) next
    start = (length($0) - len >= 4) ? 5 : 1
    offset = (method == "smm") ? 10 : 0
    ic50 = (id % 2 == 0) ? 40 + len + offset : 4000 + len + offset
    print allele, id, start, start + len - 1, len, substr($0, start, len), ic50, 1.5
}' "$sequences" > "$output"
"#;

/// An installed fake prediction tool.
#[derive(Debug, Clone)]
pub struct FakeTool {
    pub script: PathBuf,
    calls: PathBuf,
    fail_alleles: PathBuf,
}

impl FakeTool {
    /// Writes the tool script into `dir`.
    pub fn install(dir: &Path) -> Self {
        let script = dir.join("fake-predict.sh");
        let calls = dir.join("fake-predict.calls");
        let fail_alleles = dir.join("fake-predict.fail");
        let content = SCRIPT
            .replace("@CALLS@", calls.to_str().unwrap())
            .replace("@FAIL@", fail_alleles.to_str().unwrap());
        fs::write(&script, content).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        Self { script, calls, fail_alleles }
    }

    /// Number of calls made since installation or the last reset.
    pub fn calls(&self) -> usize {
        fs::read_to_string(&self.calls).map(|c| c.lines().count()).unwrap_or(0)
    }

    /// Recorded calls as `<method> <allele> <length> <retries>` lines.
    pub fn call_log(&self) -> Vec<String> {
        fs::read_to_string(&self.calls).map(|c| c.lines().map(str::to_string).collect()).unwrap_or_default()
    }

    /// Forgets all recorded calls.
    pub fn reset_calls(&self) {
        let _ = fs::remove_file(&self.calls);
    }

    /// Makes every call for `allele` fail.
    pub fn fail_for(&self, allele: &str) {
        fs::write(&self.fail_alleles, format!("{allele}\n")).unwrap();
    }

    /// Lets every call succeed again.
    pub fn heal(&self) {
        let _ = fs::remove_file(&self.fail_alleles);
    }
}
