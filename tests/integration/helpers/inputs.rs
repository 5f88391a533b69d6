//! Input fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Three missense variants with 21-residue wildtype and mutant contexts.
pub const VARIANTS: [(&str, &str, &str, &str); 3] = [
    ("chr12\t25398284\t.\tC\tT", "KRAS", "MTEYKLVVVGAGGVGKSALTI", "MTEYKLVVVGADGVGKSALTI"),
    ("chr17\t7577120\t.\tC\tT", "TP53", "SSCMGGMNRRPILTIITLEDS", "SSCMGGMNWRPILTIITLEDS"),
    ("chr7\t55259515\t.\tT\tG", "EGFR", "KIPVAIKELREATSPKANKEI", "KIPVAIKEPREATSPKANKEI"),
];

const VCF_HEADER: &str = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

/// Writes a VCF with every entry of [`VARIANTS`].
pub fn write_vcf(dir: &Path) -> PathBuf {
    let mut content = VCF_HEADER.to_string();
    for (site, gene, wildtype, mutant) in VARIANTS {
        content.push_str(&format!(
            "{site}\t60\tPASS\tGENE={gene};TYPE=missense;WT_SEQ={wildtype};MT_SEQ={mutant}\n"
        ));
    }
    let path = dir.join("variants.vcf");
    fs::write(&path, content).unwrap();
    path
}

/// Writes a VCF with a header and no records.
pub fn write_empty_vcf(dir: &Path) -> PathBuf {
    let path = dir.join("empty.vcf");
    fs::write(&path, VCF_HEADER).unwrap();
    path
}

/// Writes a BEDPE file with two fusions.
pub fn write_bedpe(dir: &Path) -> PathBuf {
    let content = "chr1\t100\t200\tchr2\t300\t400\tBCR--ABL1\t.\t+\t-\tMVDPVGFAEAWKAQFPDSEPPRMELRSVGDIEQELERCKASIRRLEQEVNQERFRMIYLQTLLAKEKKSYDRQRWGFRRAAQAPDGASEPRASASRPQPAPADGADPPPAEEPEARPDGEGSPGKARPGTARRPGAAASGERDDRG\n\
        chr3\t100\t200\tchr4\t300\t400\tEML4--ALK\t.\t+\t-\tMDGFAGSLDDSISAASTSDVQDRLSALESRVQQQEDEITVLKAALADVLRRLAISEDHVASVKKSVSSKGQPSPRAVIPMSCITNGSGANRKPSHTSAVSIAGKETLSSAAKSGTEKKKEKPQGQREKKEESHSNDQSPQIRASPSPQPSSQPLQIHRQTPESKNATPTKSIKRPSPAEKSHNSWENSDDSRNKLSKIPSTPKLIPKVTKTADKHKDVIINQEGEYIKMFMRGRPITMFIPSDVDNYDDIRTELPPEKLKLEWAYGYRGKDCRANVYLLPTGKIVYFIASVVVLFNYEERTQRHYLGHTDCVKCLAIHPDKIRIATGQIAGVDKDGRPLQPHVRVWDSVTLSTLQIIGLGTFERGVGCLDFSKADSGVHLCIIDDSNEHMLTVWDWQKKAKGAEIKTTNEVVLAVEFHPTDANTIITCGKSHIFFWTWSGNSLTRKQGIFGKYEKPKFVQCLAFLGNGDVLTGDSGGVMLIWSKTTVEPTPGKGPKGVYQISKQIKAHDGSVFTLCQMRNGMLLTGGGKDRKIILWDHDLNPEREIEVPDQYGTIRAVAEGKADQFLVGTSRNFILRGTFNDGFQIEVQGHTDELWGLATHPFKDLLLTCAQDRQVCLWNSMEHRLEWTRLVDEPGHCADFHPSGTVVAIGTHSGRWFVLDAETRDLVSIHTDGNEQLSVMRYSIDGTFLAVGSHDNFIYLYVVSENGRKYSRYGRCTGHSSYITHLDWSPDNKYIMSNSGDYEILYWDIPNGCKLIRNRSDCKDIDWTTYTCVLGFQVFGVWPEGSDGTDINALVRSHNRKVIAVADDFCKVHLFQYPCSKAKAPSHKYSAHSSHVTNVSFTHNDSHLISTGGKDMSIIQWKLVEKLSLPQNETVADTTLTKAPVSSTESVIQSNTPTPPPSQPLNETAEEESRISSSPTLLENSLEQTVEPSEDHSEEESEEGSGDLGEPLYEEPCNEISKEQAKATLLEDQQDPSPSS\n";
    let path = dir.join("fusions.bedpe");
    fs::write(&path, content).unwrap();
    path
}

/// Writes a peptide FASTA of two vector elements.
pub fn write_vector_fasta(dir: &Path) -> PathBuf {
    let path = dir.join("vector.fa");
    fs::write(&path, ">MT.KRAS\nMTEYKLVVVGADGVGKSALTI\n>MT.TP53\nSSCMGGMNWRPILTIITLEDS\n").unwrap();
    path
}
