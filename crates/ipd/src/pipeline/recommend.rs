use super::scoring::ScoredDistrict;

pub const OUTREACH_ACTION: &str = "Mobile enrolment + outreach camps";
pub const DEMOGRAPHIC_DRIVE_ACTION: &str = "Assisted demographic update drive (migration/churn)";
pub const BIOMETRIC_SUPPORT_ACTION: &str = "Biometric recapture support + assisted verification";
pub const MONITOR_ACTION: &str = "Monitor (low risk)";

pub const OUTREACH_VGS_THRESHOLD: f64 = 0.20;
pub const CHURN_MPI_THRESHOLD: f64 = 0.50;
pub const BIOMETRIC_BSI_THRESHOLD: f64 = 0.50;

pub const ACTION_SEPARATOR: &str = " | ";

/// Interventions for a scored district, in evaluation order: outreach (VGS),
/// demographic drive (MPI), biometric support (BSI). Undefined scores and
/// ratios never trigger; a district that triggers nothing gets the monitor
/// fallback.
pub fn recommend(district: &ScoredDistrict) -> Vec<&'static str> {
    actions_for(
        district.visibility_gap_score,
        district.update_intensity_ratio,
        district.biometric_intensity_ratio,
    )
}

pub fn recommend_joined(district: &ScoredDistrict) -> String {
    recommend(district).join(ACTION_SEPARATOR)
}

fn actions_for(vgs: Option<f64>, mpi: Option<f64>, bsi: Option<f64>) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if vgs.is_some_and(|score| score > OUTREACH_VGS_THRESHOLD) {
        actions.push(OUTREACH_ACTION);
    }
    if mpi.is_some_and(|ratio| ratio > CHURN_MPI_THRESHOLD) {
        actions.push(DEMOGRAPHIC_DRIVE_ACTION);
    }
    if bsi.is_some_and(|ratio| ratio > BIOMETRIC_BSI_THRESHOLD) {
        actions.push(BIOMETRIC_SUPPORT_ACTION);
    }
    if actions.is_empty() {
        actions.push(MONITOR_ACTION);
    }
    actions
}
