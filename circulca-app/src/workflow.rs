use crate::config::{self, AppConfig};
use anyhow::{bail, Context, Result};
use circulca_core::{
    defaults_store::{DefaultsStore, YamlDefaultsStore},
    ingest,
    logger::RunLog,
    missingness::MissingnessReport,
    pipeline::session::{RunOutcome, SimulationSession},
    service::HttpLcaService,
};
use circulca_schemas::{
    metrics::{DerivedMetrics, MetricValue},
    project::ProjectMetadata,
    wire::{SimulationResponse, StageImpact},
};
use std::{
    fs,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::info;

/// Validates an inventory and reports which values are missing.
pub fn check(input: &Path) -> Result<()> {
    let rows = ingest::ingest_path(input)?;
    let report = MissingnessReport::from_rows(&rows);

    println!("\n--- [Check] {} ---", input.display());
    println!("Rows: {}", report.rows);
    if report.is_complete() {
        println!("No missing values.");
        return Ok(());
    }
    println!(
        "Missing values: {} across {} columns",
        report.total_missing(),
        report.columns_with_missing()
    );
    for (field, count) in &report.by_field {
        println!("  - {:<28} {}", field.label(), count);
    }
    Ok(())
}

fn open_session(
    config: &AppConfig,
    input: &Path,
    project: &Path,
) -> Result<SimulationSession<HttpLcaService>> {
    let rows = ingest::ingest_path(input)?;
    let metadata = config::load_project(project)?;
    let defaults = YamlDefaultsStore::new(&config.defaults_path).read(&config.company_id)?;
    let service = HttpLcaService::new(&config.service.base_url, config.timeout())?;
    info!(rows = rows.len(), product = %metadata.product_name, "session opened");

    Ok(SimulationSession::new(
        service,
        metadata,
        rows,
        Arc::new(RwLock::new(Some(defaults))),
    ))
}

fn require_applied(outcome: RunOutcome, action: &str) -> Result<()> {
    match outcome {
        RunOutcome::Applied => Ok(()),
        RunOutcome::Stale => bail!("{} result was superseded", action),
        RunOutcome::Failed(message) => bail!(message),
    }
}

/// Fills missing values through the service and writes the merged table.
pub async fn impute(config: &AppConfig, input: &Path, project: &Path, out: &Path) -> Result<()> {
    let session = open_session(config, input, project)?;
    require_applied(session.impute().await?, "Imputation")?;

    let csv = ingest::to_csv(&session.rows())?;
    fs::write(out, csv).with_context(|| format!("Failed to write {:?}", out))?;
    if let Some(status) = session.status() {
        println!("{}", status);
    }
    println!("Merged table written to {:?}", out);
    Ok(())
}

/// Runs the linear vs. circular comparison and prints the summary.
pub async fn simulate(
    config: &AppConfig,
    input: &Path,
    project: &Path,
    with_imputation: bool,
    with_report: bool,
) -> Result<()> {
    let session = open_session(config, input, project)?;

    if with_imputation {
        println!("\n--- [Workflow] Imputing Missing Values ---");
        require_applied(session.impute().await?, "Imputation")?;
        if let Some(status) = session.status() {
            println!("{}", status);
        }
    }

    println!("\n--- [Workflow] Running Linear vs. Circular Simulation ---");
    require_applied(session.simulate().await?, "Simulation")?;
    let state = session.snapshot();
    let metrics = state
        .metrics
        .context("Simulation completed without results")?;
    print_summary(&state.metadata, &metrics, state.last_response.as_ref());

    if let Some(parent) = config.run_log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    RunLog::new(&config.run_log_path).record(chrono::Utc::now(), &state.metadata, &metrics)?;

    if with_report {
        println!("\n--- [Workflow] Generating Report ---");
        let document = session.generate_report().await?;
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", config.output_dir))?;
        let path = config.output_dir.join(&document.filename);
        fs::write(&path, &document.bytes).with_context(|| format!("Failed to write {:?}", path))?;
        println!("Report saved to {:?}", path);
    }
    Ok(())
}

/// One line describing the imputation the service ran during a simulation.
fn imputation_summary(response: &SimulationResponse) -> Option<String> {
    let summary = response.metadata.as_ref()?.imputation.as_ref()?;
    Some(format!(
        "Service imputed {} of {} missing values across {} columns",
        summary.values_imputed, summary.total_missing_values, summary.columns_with_missing
    ))
}

fn metric_line(value: MetricValue, decimals: usize, unit_prefix: &str, unit_suffix: &str) -> String {
    match value.value() {
        Some(v) => format!("{}{:.*}{}", unit_prefix, decimals, v, unit_suffix),
        None => "n/a".to_string(),
    }
}

fn stage_cell(stage: Option<f64>) -> String {
    stage.map_or_else(|| format!("{:>10}", "n/a"), |v| format!("{:>10.3}", v))
}

fn print_summary(
    metadata: &ProjectMetadata,
    metrics: &DerivedMetrics,
    response: Option<&SimulationResponse>,
) {
    println!("\n\n--- [Comparison Summary] ---");
    println!("========================================");
    println!("Product: {} ({})", metadata.product_name, metadata.functional_unit);
    println!("Scope: {}", metadata.geographic_scope);
    if let Some(line) = response.and_then(imputation_summary) {
        println!("{}", line);
    }
    println!("----------------------------------------");
    println!(
        "  - CO2 Reduction:            {}",
        metric_line(metrics.co2_reduction_percent, 1, "", "%")
    );
    println!(
        "  - Cost Savings:             {}",
        metric_line(metrics.cost_savings, 2, "$", " USD")
    );
    println!(
        "  - Circularity Score:        {}",
        metric_line(metrics.circularity_score, 1, "", "%")
    );

    let stages = &metrics.stage_impact;
    let (linear, circular) = (stages.linear.as_ref(), stages.circular.as_ref());
    println!("\nStage Impact (kg CO2, {:?}):", stages.source);
    let rows: [(&str, fn(&StageImpact) -> f64); 4] = [
        ("Extraction", |s| s.extraction),
        ("Manufacturing", |s| s.manufacturing),
        ("Transport", |s| s.transport),
        ("End of Life", |s| s.end_of_life),
    ];
    for (name, stage) in rows {
        println!(
            "  - {:<14} linear {}   circular {}",
            name,
            stage_cell(linear.map(stage)),
            stage_cell(circular.map(stage))
        );
    }

    let flow = &metrics.material_flow;
    println!("\nMaterial Flow ({:?}):", flow.source);
    println!(
        "  - Virgin {:.1}%, Recycled {:.1}%, Losses {:.1}%",
        flow.virgin_percent, flow.recycled_percent, flow.loss_percent
    );

    println!("\nRecommendations:");
    for recommendation in &metrics.recommendations {
        println!("  - {}", recommendation);
    }
    println!("========================================");
}

pub fn show_defaults(config: &AppConfig) -> Result<()> {
    let store = YamlDefaultsStore::new(&config.defaults_path);
    let defaults = store.read(&config.company_id)?;
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

pub fn set_defaults(config: &AppConfig, file: &Path) -> Result<()> {
    let defaults = config::load_company_defaults(file)?;
    let store = YamlDefaultsStore::new(&config.defaults_path);
    store.write(&config.company_id, &defaults)?;
    println!(
        "Saved {} default parameters for '{}' to {:?}",
        defaults.parameters.len(),
        config.company_id,
        store.path()
    );
    Ok(())
}
