use crate::infra::{filter_params, DEFAULT_HOTSPOTS};
use chrono::Local;
use clap::Args;
use ipd::config::AppConfig;
use ipd::error::AppError;
use ipd::pipeline::report::{DatasetTables, ReportOptions};
use ipd::pipeline::{DashboardReport, DatasetLoader, DirectorySource, PeakActivity};
use ipd::telemetry;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Directory holding the api_data_aadhar_*.csv batches (defaults to IPD_DATA_DIR)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Restrict to one month (YYYY-MM or All)
    #[arg(long)]
    pub(crate) month: Option<String>,
    /// Restrict to one state (name or All)
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Number of hotspots and action plan rows to list
    #[arg(long, default_value_t = DEFAULT_HOTSPOTS)]
    pub(crate) top_n: usize,
    /// Emit the full report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        data_dir,
        month,
        state,
        top_n,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init_stderr(&config.telemetry)?;
    let data_dir = data_dir.unwrap_or(config.data.data_dir);
    let params = filter_params(month.as_deref(), state.as_deref())?;

    let loader = DatasetLoader::new(DirectorySource::new(data_dir.clone()), config.data.cache_ttl);
    let tables = DatasetTables::load(&loader)?;
    let options = ReportOptions {
        hotspots: top_n,
        action_plan: top_n,
        ..ReportOptions::default()
    };
    let report = DashboardReport::build(&tables, &params, options);

    if json {
        serde_json::to_writer_pretty(io::stdout().lock(), &report).map_err(io::Error::from)?;
        println!();
    } else {
        render_report(&report, &data_dir);
    }

    Ok(())
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.2}"))
}

fn score(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.3}"))
}

pub(crate) fn render_report(report: &DashboardReport, data_dir: &std::path::Path) {
    println!("Invisible population report");
    println!(
        "Data directory: {} (generated {})",
        data_dir.display(),
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!(
        "Filters: month {} | state {}",
        report
            .filters
            .month
            .map_or_else(|| "All".to_string(), |month| month.to_string()),
        report.filters.state.as_deref().unwrap_or("All")
    );

    let kpis = &report.kpis;
    println!("\nActivity");
    println!(
        "- {} enrolments | {} demographic updates | {} biometric updates",
        kpis.total_enrolments, kpis.total_demo_updates, kpis.total_bio_updates
    );
    match kpis.peak_activity {
        PeakActivity::Peak { date, total } => {
            println!("- Peak enrolment day {} ({} enrolments)", date, total)
        }
        PeakActivity::NoData => println!("- Peak enrolment day: no data"),
    }

    if report.top_states.is_empty() {
        println!("\nTop states: none");
    } else {
        println!("\nTop states");
        for entry in &report.top_states {
            println!("{:>3}. {}: {}", entry.rank, entry.state, entry.total_enrolments);
        }
    }

    println!("\nRisk distribution");
    for entry in &report.risk_distribution {
        println!("- {}: {} districts", entry.risk_label, entry.districts);
    }

    if report.hotspots.is_empty() {
        println!("\nHotspots: none");
    } else {
        println!("\nHotspots (by visibility gap score)");
        for view in &report.hotspots {
            println!(
                "{:>3}. {} / {}: VGS {} [{}] | observed {} vs expected {:.1} | MPI {} | BSI {}",
                view.rank,
                view.state,
                view.district,
                score(view.visibility_gap_score),
                view.risk_label,
                view.observed_enrolments,
                view.expected_enrolments,
                ratio(view.update_intensity_ratio),
                ratio(view.biometric_intensity_ratio)
            );
        }
    }

    if !report.action_plan.is_empty() {
        println!("\nAction plan");
        for entry in &report.action_plan {
            println!(
                "{:>3}. {} / {}: {}",
                entry.rank, entry.state, entry.district, entry.recommended_action
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_ratios_render_as_not_available() {
        assert_eq!(ratio(None), "n/a");
        assert_eq!(ratio(Some(0.5)), "0.50");
        assert_eq!(score(None), "n/a");
        assert_eq!(score(Some(-1.0)), "-1.000");
    }
}
