//! End-to-end runs of the pipeline over temporary CSV files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use claims_core::config::PipelineConfig;
use claims_core::error::ClaimsError;
use claims_data::cleaning::clean;
use claims_data::reader::load_table;
use claims_data::run_pipeline;
use tempfile::TempDir;

fn write_input(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("claim_data.csv");
    std::fs::write(&path, body).unwrap();
    path
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

// ── Failing input ─────────────────────────────────────────────────────────────

#[test]
fn test_invalid_billed_amounts_fail_but_leave_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        tmp.path(),
        "\
Claim ID,Patient ID,Billed Amount,Date of Service,Diagnosis Code
C1,P1,100,2023-01-02,E11
C2,P2,-5,2023-01-03,I10
C3,P3,,2023-01-04,E11
C4,P1,40,2023-02-01,J45
C5,P4,60,2023-02-02,E11
",
    );
    let out = tmp.path().join("outputs");

    let err = run_pipeline(&input, &out, &PipelineConfig::default()).unwrap_err();

    let ClaimsError::Integrity(integrity) = err else {
        panic!("expected an integrity failure");
    };
    assert_eq!(
        integrity.failures,
        vec!["Found 2 rows with missing or non-positive 'Billed Amount'.".to_string()]
    );
    assert!(out.join("tables/missingness.csv").exists());
    assert!(out.join("tables/basic_profile.csv").exists());

    let profile = read(out.join("tables/basic_profile.csv"));
    assert!(profile.contains("row_count,5"));
    assert!(profile.contains("grain_guess,One row per claim (unique `Claim ID`)."));

    let missingness = read(out.join("tables/missingness.csv"));
    assert!(missingness.starts_with("column,missing_count,missing_pct\nBilled Amount,1,20"));

    // Cleaning the same table keeps the three valid rows.
    let cleaned = clean(&load_table(&input).unwrap(), &PipelineConfig::default().columns);
    assert_eq!(cleaned.row_count(), 3);
}

// ── Uniform population ────────────────────────────────────────────────────────

#[test]
fn test_uniform_entities_concentration_and_no_anomalies() {
    let tmp = TempDir::new().unwrap();
    let mut body = String::from("Claim ID,Patient ID,Billed Amount,Date of Service\n");
    for i in 0..100 {
        writeln!(body, "C{i},P{i:03},100,2023-03-{:02}", i % 28 + 1).unwrap();
    }
    let input = write_input(tmp.path(), &body);
    let out = tmp.path().join("outputs");

    let outcome = run_pipeline(&input, &out, &PipelineConfig::default()).unwrap();

    let shares: Vec<f64> = outcome
        .analysis
        .concentration
        .rows()
        .iter()
        .map(|r| r.cost_share_pct)
        .collect();
    assert_eq!(shares, vec![1.0, 5.0, 10.0]);
    assert!(outcome.analysis.anomalies.is_empty());

    let table = read(out.join("tables/cost_concentration.csv"));
    assert_eq!(
        table,
        "top_pct_patients,patient_count,total_patients,cost_share_pct\n\
         1,1,100,1.00\n\
         5,5,100,5.00\n\
         10,10,100,10.00\n"
    );
    assert_eq!(
        read(out.join("tables/patient_anomalies.csv")),
        "patient_id,total_billed,z_score\n"
    );

    let kpis = &outcome.analysis.kpis;
    assert_eq!(kpis.total_billed_amount, 10_000.0);
    assert_eq!(kpis.unique_patients, Some(100));
    let mm = kpis.member_months.unwrap();
    assert_eq!(mm.member_months, 100);
    assert_eq!(mm.pmpm_billed, Some(100.0));
}

// ── Z-score boundary ──────────────────────────────────────────────────────────

#[test]
fn test_single_outlier_below_default_threshold() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        tmp.path(),
        "\
Claim ID,member_id,Billed Amount
C1,M1,10
C2,M2,10
C3,M3,10
C4,M4,10
C5,M5,1000
",
    );
    let out = tmp.path().join("outputs");

    let outcome = run_pipeline(&input, &out, &PipelineConfig::default()).unwrap();
    assert!(outcome.analysis.anomalies.is_empty());

    let mut config = PipelineConfig::default();
    config.analysis.z_threshold = 2.0;
    let outcome = run_pipeline(&input, &out, &config).unwrap();
    assert_eq!(outcome.analysis.anomalies.rows[0].patient_id, "M5");
    assert_eq!(
        read(out.join("tables/patient_anomalies.csv")),
        "patient_id,total_billed,z_score\nM5,1000,2\n"
    );
}

// ── Full run ──────────────────────────────────────────────────────────────────

#[test]
fn test_kpis_written_in_both_shapes() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        tmp.path(),
        "\
Claim ID,Patient ID,Date of Service,ICD-10 Code,Billed Amount,Paid Amount
C1,P1,01/15/2023,E11,120.50,100
C2,P2,02/01/2023,E11,79.50,60
C3,P2,02/20/2023,I10,200,150
",
    );
    let out = tmp.path().join("outputs");

    let outcome = run_pipeline(&input, &out, &PipelineConfig::default()).unwrap();

    let wide = read(out.join("tables/kpis_summary.csv"));
    let mut lines = wide.lines();
    let headers: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(&headers[..3], &["row_count", "column_count", "total_billed_amount"]);
    assert!(headers.contains(&"top_diagnosis_code"));
    assert!(headers.contains(&"pmpm_billed"));

    let long = read(out.join("tables/kpis.csv"));
    assert!(long.starts_with("metric,value\nrow_count,3\ncolumn_count,6\ntotal_billed_amount,400.00\n"));
    assert!(long.contains("top_diagnosis_code,E11\n"));
    assert!(long.contains("top_diagnosis_pct_of_total,50.00\n"));
    assert!(long.contains("date_min,2023-01-15\n"));

    let clean_csv = read(out.join("data/claims_clean.csv"));
    assert!(clean_csv.contains("C1,P1,2023-01-15,E11,120.5,100"));

    let pareto: serde_json::Value =
        serde_json::from_str(&read(out.join("charts/pareto.json"))).unwrap();
    assert_eq!(pareto["cumulative_cost"].as_array().unwrap().len(), 2);
    assert_eq!(outcome.analysis.charts.available().len(), 5);
}
