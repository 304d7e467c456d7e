//! The compiled-in business schema.

use super::{FieldSize, TableSpec, TypeTag};

fn w(width: u16) -> FieldSize {
    FieldSize::new(width)
}

fn d(width: u16, places: u8) -> FieldSize {
    FieldSize::decimal(width, places)
}

/// Every managed business table, in migration order.
pub fn tables() -> Vec<TableSpec> {
    use TypeTag::*;

    vec![
        TableSpec::new("ctlmst", "Company Master")
            .with_field("ctm_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("ctm_name", Alpha, w(30), "Company Name", "Name")
            .with_field("ctm_add1", Alpha, w(30), "Address Line 1", "Address")
            .with_field("ctm_email", LowerAlpha, w(50), "Email Address", "Email")
            .with_field("ctm_logo", Blob, w(0), "Company Logo", "Logo")
            .with_index(true, &["ctm_cono"]),
        TableSpec::new("ctlynd", "Financial Periods")
            .with_field("cye_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("cye_period", UnsignedInteger, w(3), "Period", "Per")
            .with_field("cye_start", Date, w(10), "Starting Date", "Start-Date")
            .with_field("cye_end", Date, w(10), "Ending Date", "End-Date")
            .with_field("cye_final", UpperAlpha, w(1), "Final Flag (Y/N)", "F")
            .with_index(true, &["cye_cono", "cye_period"]),
        TableSpec::new("ctlrat", "Statutory Rates")
            .with_field("ctr_code", UpperAlpha, w(3), "Rate Code", "Cod")
            .with_field("ctr_date", Date, w(10), "Effective Date", "Eff-Date")
            .with_field("ctr_desc", Alpha, w(30), "Description", "Description")
            .with_field("ctr_rate", UnsignedDecimal, d(6, 2), "Rate Percentage", "Rate-%")
            .with_index(true, &["ctr_code", "ctr_date"]),
        TableSpec::new("tplmst", "Document Templates")
            .with_field("tpm_tname", LowerAlpha, w(20), "Template Name", "Template")
            .with_field("tpm_title", Alpha, w(50), "Template Title", "Title")
            .with_field("tpm_type", UpperAlpha, w(1), "Template Type", "T")
            .with_field("tpm_system", UpperAlpha, w(3), "System Code", "Sys")
            .with_field("tpm_layout", Text, w(500), "Layout Definition", "Layout")
            .with_index(true, &["tpm_tname"])
            .with_index(false, &["tpm_system", "tpm_type"]),
        TableSpec::new("rptcol", "Report Writer Columns")
            .with_field("rpc_rnam", LowerAlpha, w(20), "Report Name", "Report")
            .with_field("rpc_seq", UnsignedInteger, w(3), "Column Sequence", "Seq")
            .with_field("rpc_tabl", LowerAlpha, w(20), "Table Name", "Table")
            .with_field("rpc_colm", LowerAlpha, w(20), "Column Name", "Column")
            .with_field("rpc_head", Alpha, w(20), "Column Heading", "Heading")
            .with_index(true, &["rpc_rnam", "rpc_seq"])
            .with_index(false, &["rpc_tabl", "rpc_colm"]),
        TableSpec::new("gentrn", "General Ledger Transactions")
            .with_field("glt_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("glt_acno", SignedInteger, w(7), "Account Number", "Acc-Num")
            .with_field("glt_trdt", Date, w(10), "Transaction Date", "Trans-Date")
            .with_field("glt_type", UnsignedInteger, w(2), "Transaction Type", "TT")
            .with_field("glt_refno", Alpha, w(9), "Reference Number", "Reference")
            .with_field("glt_batch", Alpha, w(7), "Batch Number", "Batch")
            .with_field("glt_tramt", SignedDecimal, d(13, 2), "Transaction Amount", "Amount")
            .with_field("glt_desc", Alpha, w(30), "Details", "Details")
            .with_field("glt_capdt", Date, w(10), "Capture Date", "Capt-Date")
            .with_field("glt_seq", UnsignedInteger, w(10), "Sequence", "Sequence")
            .with_index(false, &["glt_cono", "glt_acno", "glt_trdt"])
            .with_index(false, &["glt_cono", "glt_refno"])
            .with_index(true, &["glt_seq"]),
        TableSpec::new("drsmst", "Debtors Master")
            .with_field("drm_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("drm_chain", UnsignedInteger, w(3), "Chain Store", "Chn")
            .with_field("drm_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("drm_name", Alpha, w(30), "Name", "Name")
            .with_field("drm_limit", UnsignedInteger, w(7), "Credit Limit", "Limit")
            .with_field("drm_stat", UpperAlpha, w(1), "Account Status", "S")
            .with_field("drm_notes", Text, w(150), "Notes", "Notes")
            .with_index(true, &["drm_cono", "drm_chain", "drm_acno"])
            .with_index(false, &["drm_cono", "drm_name"])
            .with_index(false, &["drm_cono", "drm_notes"]),
        TableSpec::new("drstrn", "Debtors Transactions")
            .with_field("drt_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("drt_chain", UnsignedInteger, w(3), "Chain Store", "Chn")
            .with_field("drt_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("drt_type", UnsignedInteger, w(1), "Transaction Type", "T")
            .with_field("drt_ref1", Alpha, w(9), "Reference Number", "Reference")
            .with_field("drt_trdt", Date, w(10), "Transaction Date", "Trans-Date")
            .with_field("drt_tramt", SignedDecimal, d(13, 2), "Transaction Amount", "Amount")
            .with_field("drt_capdt", Date, w(10), "Capture Date", "Capt-Date")
            .with_field("drt_seq", UnsignedInteger, w(10), "Sequence", "Sequence")
            .with_index(false, &["drt_cono", "drt_chain", "drt_acno", "drt_type", "drt_ref1"])
            .with_index(true, &["drt_seq"]),
        TableSpec::new("drsage", "Debtors Age Allocations")
            .with_field("dra_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("dra_chain", UnsignedInteger, w(3), "Chain Store", "Chn")
            .with_field("dra_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("dra_type", UnsignedInteger, w(1), "Transaction Type", "T")
            .with_field("dra_ref1", Alpha, w(9), "Reference Number", "Reference")
            .with_field("dra_atyp", UnsignedInteger, w(1), "Allocation Type", "A")
            .with_field("dra_aref", Alpha, w(9), "Allocation Reference", "Alloc-Ref")
            .with_field("dra_amt", SignedDecimal, d(13, 2), "Allocated Amount", "Amount")
            .with_index(false, &["dra_cono", "dra_chain", "dra_acno", "dra_type", "dra_ref1"]),
        TableSpec::new("crsmst", "Creditors Master")
            .with_field("crm_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("crm_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("crm_name", Alpha, w(30), "Name", "Name")
            .with_field("crm_terms", UnsignedInteger, w(3), "Payment Terms", "Trm")
            .with_field("crm_stat", UpperAlpha, w(1), "Account Status", "S")
            .with_index(true, &["crm_cono", "crm_acno"])
            .with_index(false, &["crm_cono", "crm_name"]),
        TableSpec::new("crstrn", "Creditors Transactions")
            .with_field("crt_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("crt_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("crt_type", UnsignedInteger, w(1), "Transaction Type", "T")
            .with_field("crt_ref1", Alpha, w(9), "Reference Number", "Reference")
            .with_field("crt_trdt", Date, w(10), "Transaction Date", "Trans-Date")
            .with_field("crt_tramt", SignedDecimal, d(13, 2), "Transaction Amount", "Amount")
            .with_field("crt_capdt", Date, w(10), "Capture Date", "Capt-Date")
            .with_field("crt_seq", UnsignedInteger, w(10), "Sequence", "Sequence")
            .with_index(false, &["crt_cono", "crt_acno", "crt_type", "crt_ref1"])
            .with_index(true, &["crt_seq"]),
        TableSpec::new("crsage", "Creditors Age Allocations")
            .with_field("cra_cono", UnsignedInteger, w(7), "Company Number", "Coy")
            .with_field("cra_acno", UpperAlpha, w(7), "Account Number", "Acc-Num")
            .with_field("cra_type", UnsignedInteger, w(1), "Transaction Type", "T")
            .with_field("cra_ref1", Alpha, w(9), "Reference Number", "Reference")
            .with_field("cra_atyp", UnsignedInteger, w(1), "Allocation Type", "A")
            .with_field("cra_aref", Alpha, w(9), "Allocation Reference", "Alloc-Ref")
            .with_field("cra_amt", SignedDecimal, d(13, 2), "Allocated Amount", "Amount")
            .with_index(false, &["cra_cono", "cra_acno", "cra_type", "cra_ref1"]),
    ]
}
