//! risk-runner: headless driver for the cyber-loss engine.
//!
//! Usage:
//!   risk-runner --seed 12345 --iterations 25000 --data-dir ./data
//!   risk-runner --seed 12345 --ipc-mode
//!
//! Batch mode runs one simulation and prints a summary (or a JSON report
//! with --json). IPC mode reads one JSON command per line on stdin and
//! answers each with the current UI state on stdout.

use anyhow::Result;
use chrono::{DateTime, Utc};
use cyberrisk_core::{
    command::ScenarioCommand,
    config::{CompanyFinancials, ScenarioConfig},
    controls::ControlLevels,
    finance,
    scheduler::{Dispatch, Scheduler},
    SimulationResults,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on waiting for a background run in batch mode.
const BATCH_WAIT: Duration = Duration::from_secs(600);

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Apply { command: ScenarioCommand },
    Run { iterations: usize, #[serde(default)] sensitivity: bool },
    Poll,
    Quit,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UiState {
    generation: u64,
    is_running: bool,
    preview_pending: bool,
    iteration_count: usize,
    maturity: ControlLevels,
    results: Option<Arc<SimulationResults>>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FinanceSummary {
    debt_service: f64,
    base_dscr: Option<f64>,
    stressed_dscr_net_p90: Option<f64>,
    stressed_dscr_gross_p90: Option<f64>,
    wacc: f64,
    npv: f64,
    risk_adjusted_npv: f64,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    run_id: String,
    generated_at: DateTime<Utc>,
    scenario: &'a str,
    seed: u64,
    results: &'a SimulationResults,
    finance: FinanceSummary,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json = args.iter().any(|a| a == "--json");
    let sensitivity = args.iter().any(|a| a == "--sensitivity");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    let scenario = ScenarioConfig::load(data_dir)?;
    let iterations = parse_arg(&args, "--iterations", scenario.engine.live_iterations);

    if !ipc_mode && !json {
        println!("Cyber-loss engine: risk-runner");
        println!("  scenario:   {}", scenario.name);
        println!("  seed:       {seed}");
        println!("  iterations: {iterations}");
        println!("  data_dir:   {data_dir}");
        println!();
    }

    let mut scheduler = Scheduler::from_scenario(&scenario, seed);

    if ipc_mode {
        return run_ipc_loop(&mut scheduler);
    }

    let results = match scheduler.run_simulation(iterations, sensitivity)? {
        Dispatch::Completed(results) => results,
        Dispatch::Started { generation } => {
            log::debug!("gen={generation} waiting for background run");
            scheduler
                .wait(BATCH_WAIT)?
                .ok_or_else(|| anyhow::anyhow!("simulation did not finish within {BATCH_WAIT:?}"))?
        }
    };

    let finance = finance_summary(&scenario.financials, &results);
    if json {
        let report = RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            scenario: &scenario.name,
            seed,
            results: &results,
            finance,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&scenario, &results, &finance);
    }
    Ok(())
}

fn run_ipc_loop(scheduler: &mut Scheduler) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let now = Instant::now();
        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState | IpcCommand::Poll => {}
            IpcCommand::Apply { command } => {
                let name = command.name();
                if let Err(e) = scheduler.apply(command, now) {
                    log::warn!("Rejected {name}: {e}");
                    write_error(&mut stdout, &e.to_string())?;
                    continue;
                }
            }
            IpcCommand::Run { iterations, sensitivity } => {
                scheduler.run_simulation(iterations, sensitivity)?;
            }
        }

        scheduler.tick(now)?;
        scheduler.poll()?;
        let state = build_ui_state(scheduler);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn build_ui_state(scheduler: &Scheduler) -> UiState {
    UiState {
        generation: scheduler.generation(),
        is_running: scheduler.is_running(),
        preview_pending: scheduler.preview_pending(),
        iteration_count: scheduler.state().iteration_count,
        maturity: scheduler.state().levels.clone(),
        results: scheduler.latest(),
    }
}

fn finance_summary(fin: &CompanyFinancials, results: &SimulationResults) -> FinanceSummary {
    let debt_service = finance::debt_service(fin.debt_principal, fin.interest_rate, fin.debt_term_years);
    let years = fin.debt_term_years.max(0.0) as usize;
    let cash_flows: Vec<f64> = std::iter::once(0.0)
        .chain(std::iter::repeat(fin.ebitda).take(years))
        .collect();

    FinanceSummary {
        debt_service,
        base_dscr: finance::dscr(fin.ebitda, debt_service),
        stressed_dscr_net_p90: finance::stressed_dscr(fin.ebitda, results.net_p90, debt_service),
        stressed_dscr_gross_p90: finance::stressed_dscr(fin.ebitda, results.gross_p90, debt_service),
        wacc: finance::wacc(
            fin.equity_value,
            fin.debt_value,
            fin.cost_of_equity,
            fin.interest_rate,
            fin.tax_rate,
        ),
        npv: finance::npv(fin.discount_rate, &cash_flows),
        risk_adjusted_npv: finance::risk_adjusted_npv(fin.discount_rate, &cash_flows, results.mean),
    }
}

fn print_summary(scenario: &ScenarioConfig, results: &SimulationResults, fin: &FinanceSummary) {
    const PER_MILLION: f64 = 1_000_000.0;

    println!("=== LOSS DISTRIBUTION ({} trials) ===", results.iteration_count);
    println!("  mean (net):     ${:.2}M", results.mean / PER_MILLION);
    println!("  median (net):   ${:.2}M", results.median / PER_MILLION);
    println!("  P90 gross:      ${:.2}M", results.gross_p90 / PER_MILLION);
    println!("  P90 net:        ${:.2}M", results.net_p90 / PER_MILLION);
    println!("  P95 net:        ${:.2}M", results.p95 / PER_MILLION);
    println!(
        "  baseline P90:   ${:.2}M gross / ${:.2}M net (published)",
        scenario.baseline.gross_p90_millions, scenario.baseline.net_p90_millions
    );
    if let Some(driver) = results.top_driver {
        println!("  top driver:     {driver}");
    }
    if !results.sensitivity.is_empty() {
        println!();
        println!("=== SENSITIVITY (+10% per variable) ===");
        for impact in &results.sensitivity {
            println!(
                "  {:<16} P90 ${:>8.2}M  Δ ${:>+7.2}M",
                impact.variable.key(),
                impact.p90 / PER_MILLION,
                impact.delta / PER_MILLION
            );
        }
    }

    println!();
    println!("=== FINANCIAL IMPACT ===");
    println!("  debt service:   ${:.2}M", fin.debt_service / PER_MILLION);
    println!("  DSCR base:      {}", fmt_ratio(fin.base_dscr));
    println!("  DSCR @ net P90: {}", fmt_ratio(fin.stressed_dscr_net_p90));
    println!("  DSCR @ gross P90: {}", fmt_ratio(fin.stressed_dscr_gross_p90));
    println!("  WACC:           {:.2}%", fin.wacc * 100.0);
    println!("  NPV:            ${:.2}M", fin.npv / PER_MILLION);
    println!("  risk-adj. NPV:  ${:.2}M", fin.risk_adjusted_npv / PER_MILLION);
}

fn fmt_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}x"))
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
