use std::fs;

use icpp_attribution::{run, AttributionConfig, AttributionInput};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

fn ledger_markers(config: &AttributionConfig) -> Vec<String> {
    config.ledger.columns.identifier_headers().cloned().collect()
}

#[test]
fn xlsx_ledger_and_csv_fees_to_csv_report() {
    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("transactions.xlsx");
    let fees_path = dir.path().join("fees.csv");
    let out_path = dir.path().join("report.csv");

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "Transactions").unwrap();
    let headers = ["Transaction ID", "Merchant", "Card Type", "Processor Status", "Amount", "Currency"];
    for (col, h) in headers.iter().enumerate() {
        ws.write_string(1, col as u16, *h).unwrap();
    }
    let rows = [
        ("t1", "Acme Malaysia", "Visa", "CAPTURED", 2000.0, "MYR"),
        ("t2", "Acme Malaysia", "Visa", "CAPTURED", 3000.0, "MYR"),
        ("t3", "Acme Malaysia", "Visa", "DECLINED", 50.0, "MYR"),
    ];
    for (i, (id, merchant, card, status, amount, cur)) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        ws.write_string(r, 0, *id).unwrap();
        ws.write_string(r, 1, *merchant).unwrap();
        ws.write_string(r, 2, *card).unwrap();
        ws.write_string(r, 3, *status).unwrap();
        ws.write_number(r, 4, *amount).unwrap();
        ws.write_string(r, 5, *cur).unwrap();
    }
    wb.save(&ledger_path).unwrap();

    fs::write(
        &fees_path,
        "NP Transaction ID,MDR Amount,MDR Currency,Interchange Amount,Interchange Currency,\
         Scheme Fee Bucket Amount,Scheme Fee Bucket Currency,Gateway Fee Amount,Gateway Fee Currency\n\
         t1,40,MYR,20,MYR,6,MYR,5,MYR\n\
         t2,60,MYR,30,MYR,9,MYR,5,MYR\n",
    )
    .unwrap();

    let config = AttributionConfig::default();
    let input = AttributionInput {
        ledger: icpp_io::load_table(&ledger_path, &ledger_markers(&config)).unwrap(),
        fees: icpp_io::load_table(&fees_path, &config.fees.columns.identifier).unwrap(),
    };
    let report = run(&config, &input).unwrap();
    assert_eq!(report.summary.total_processed, 2);
    assert_eq!(report.groups.len(), 1);
    let g = &report.groups[0];
    assert_eq!(g.region, "MY");
    assert_eq!(g.first_plus.total, 0.0);
    assert_eq!(g.second_plus.total, 50.0);
    assert_eq!(g.net_acquirer_markup(), 40.0);

    icpp_io::export::export(&report.groups, &out_path).unwrap();
    let content = fs::read_to_string(&out_path).unwrap();
    let row = content.lines().nth(1).unwrap();
    assert!(row.starts_with("MY,VISA,2,5000.00,MYR,50.00,1.00,0.00,0.00,50.00,1.00,10.00,"), "{row}");
    assert!(row.ends_with(",40.00,100.00,2.00"), "{row}");
}

#[test]
fn unreadable_input_is_an_error() {
    let dir = tempdir().unwrap();
    let err = icpp_io::load_table(&dir.path().join("missing.csv"), &[]).unwrap_err();
    assert!(err.contains("missing.csv"), "{err}");
}
