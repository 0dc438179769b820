//! Downstream finance helper tests.

use cyberrisk_core::finance::{debt_service, dscr, npv, risk_adjusted_npv, stressed_dscr, wacc};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn debt_service_is_interest_plus_straight_line_principal() {
    assert!(approx(debt_service(100.0, 0.06, 5.0), 26.0));
}

#[test]
fn debt_service_without_term_is_interest_only() {
    assert!(approx(debt_service(100.0, 0.06, 0.0), 6.0));
}

#[test]
fn dscr_is_none_without_debt() {
    assert_eq!(dscr(10.0, 0.0), None);
    assert!(approx(dscr(52.0, 26.0).unwrap(), 2.0));
}

#[test]
fn stressed_dscr_absorbs_the_loss() {
    // (18M - 4.8M) / 10.4M
    let stressed = stressed_dscr(18_000_000.0, 4_800_000.0, 10_400_000.0).unwrap();
    assert!((stressed - 1.269_230_769).abs() < 1e-6);
}

#[test]
fn wacc_weights_after_tax_debt() {
    // 0.5 * 0.10 + 0.5 * 0.08 * 0.75 = 0.08
    assert!(approx(wacc(50.0, 50.0, 0.10, 0.08, 0.25), 0.08));
    assert_eq!(wacc(0.0, 0.0, 0.1, 0.05, 0.2), 0.0);
}

#[test]
fn npv_leaves_first_cash_flow_undiscounted() {
    assert!(approx(npv(0.1, &[-100.0, 110.0]), 0.0));
}

#[test]
fn risk_adjusted_npv_charges_every_later_period() {
    let flows = [-100.0, 60.0, 60.0];
    let plain = npv(0.0, &flows);
    let adjusted = risk_adjusted_npv(0.0, &flows, 10.0);
    assert!(approx(plain - adjusted, 20.0));
}
