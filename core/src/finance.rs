//! Closed-form corporate-finance helpers that consume engine output.
//!
//! These are downstream of the simulation: they take net P90 or mean
//! loss as a plain number and never touch the RNG.

/// Annual debt service: interest plus straight-line principal.
/// A non-positive term leaves only the interest component.
pub fn debt_service(principal: f64, rate: f64, term_years: f64) -> f64 {
    let interest = principal * rate;
    if term_years <= 0.0 {
        return interest;
    }
    interest + principal / term_years
}

/// Debt service coverage ratio. None when there is no debt to cover.
pub fn dscr(cash_flow: f64, debt_service: f64) -> Option<f64> {
    if debt_service == 0.0 {
        None
    } else {
        Some(cash_flow / debt_service)
    }
}

/// DSCR after absorbing a loss (typically net P90) out of EBITDA.
pub fn stressed_dscr(ebitda: f64, loss: f64, debt_service: f64) -> Option<f64> {
    dscr(ebitda - loss, debt_service)
}

/// Weighted average cost of capital with after-tax cost of debt.
pub fn wacc(equity: f64, debt: f64, cost_of_equity: f64, cost_of_debt: f64, tax_rate: f64) -> f64 {
    let total = equity + debt;
    if total <= 0.0 {
        return 0.0;
    }
    (equity / total) * cost_of_equity + (debt / total) * cost_of_debt * (1.0 - tax_rate)
}

/// Net present value; `cash_flows[0]` is undiscounted (t = 0).
pub fn npv(rate: f64, cash_flows: &[f64]) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// NPV with `annual_loss` charged against every period after t = 0.
pub fn risk_adjusted_npv(rate: f64, cash_flows: &[f64], annual_loss: f64) -> f64 {
    let adjusted: Vec<f64> = cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| if t == 0 { *cf } else { cf - annual_loss })
        .collect();
    npv(rate, &adjusted)
}
