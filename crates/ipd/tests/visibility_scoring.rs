use ipd::pipeline::aggregate::{self, DistrictAggregate};
use ipd::pipeline::recommend::{recommend, recommend_joined, MONITOR_ACTION};
use ipd::pipeline::scoring::{self, rank_by, top_hotspots, VGS_CEILING, VGS_FLOOR};
use ipd::pipeline::{
    filter, DatasetKind, DatasetLoader, FilterParams, HotspotMetric, InMemorySource, Month,
    PipelineError, RiskTier, ScoredDistrict,
};
use std::time::Duration;

fn district(name: &str, observed: u64, demo: u64, bio: u64) -> DistrictAggregate {
    DistrictAggregate {
        state: "Assam".to_string(),
        district: name.to_string(),
        observed_enrolments: observed,
        demo_updates: demo,
        bio_updates: bio,
        state_total_enrolments: 100,
        num_districts_in_state: 2,
    }
}

fn scored_with(vgs: f64, mpi: Option<f64>, bsi: Option<f64>) -> ScoredDistrict {
    ScoredDistrict {
        state: "Assam".to_string(),
        district: "Cachar".to_string(),
        observed_enrolments: 10,
        expected_enrolments: 10.0,
        demo_updates: 0,
        bio_updates: 0,
        state_total_enrolments: 20,
        num_districts_in_state: 2,
        visibility_gap_score: Some(vgs),
        update_intensity_ratio: mpi,
        biometric_intensity_ratio: bsi,
        risk_tier: Some(RiskTier::from_score(vgs)),
    }
}

#[test]
fn two_district_state_scores_end_to_end() {
    let enrol = "date,state,district,age_0_5,age_5_17,age_18_greater\n\
01-05-2025,Assam,Kamrup,60,30,10\n\
01-05-2025,Assam,Dhubri,0,0,0\n";
    let demo = "date,state,district,demo_age_5_17\n01-05-2025,Assam,Dhubri,10\n";
    let bio = "date,state,district,bio_age_5_17\n01-05-2025,Assam,Kamrup,5\n";
    let source = InMemorySource::new()
        .with_batch(DatasetKind::Enrolment, "enrol.csv", enrol)
        .with_batch(DatasetKind::DemographicUpdate, "demo.csv", demo)
        .with_batch(DatasetKind::BiometricUpdate, "bio.csv", bio);
    let loader = DatasetLoader::new(source, Duration::from_secs(60));

    let enrol = loader.load(DatasetKind::Enrolment).expect("enrolment loads");
    let demo = loader.load(DatasetKind::DemographicUpdate).expect("demo loads");
    let bio = loader.load(DatasetKind::BiometricUpdate).expect("bio loads");

    let districts = aggregate::by_district(&enrol, &demo, &bio);
    assert!(districts
        .iter()
        .all(|d| d.expected_enrolments() == Some(50.0)));

    let ranked = top_hotspots(&scoring::score(&districts), 10);
    assert_eq!(ranked[0].district, "Dhubri");
    assert_eq!(ranked[0].visibility_gap_score, Some(1.0));
    assert_eq!(ranked[0].risk_tier, Some(RiskTier::High));
    assert!(ranked[0].update_intensity_ratio.is_none());

    assert_eq!(ranked[1].district, "Kamrup");
    assert_eq!(ranked[1].visibility_gap_score, Some(-1.0));
    assert_eq!(ranked[1].biometric_intensity_ratio, Some(0.05));
}

#[test]
fn gap_score_stays_within_clamp_for_any_observation() {
    let districts: Vec<DistrictAggregate> = [0u64, 1, 49, 50, 51, 100, 5_000_000]
        .into_iter()
        .map(|observed| district("X", observed, 0, 0))
        .collect();
    for scored in scoring::score(&districts) {
        let vgs = scored.visibility_gap_score.expect("state has enrolments");
        assert!((VGS_FLOOR..=VGS_CEILING).contains(&vgs), "{vgs} out of range");
    }
}

#[test]
fn state_with_only_zero_enrolments_has_undefined_gap() {
    let enrol = "date,state,district,age_0_5,age_5_17,age_18_greater\n\
01-05-2025,Assam,Kamrup,0,0,0\n\
01-05-2025,Assam,Dhubri,0,0,0\n\
01-05-2025,Goa,North Goa,3,0,0\n";
    let loader = DatasetLoader::new(
        InMemorySource::new().with_batch(DatasetKind::Enrolment, "enrol.csv", enrol),
        Duration::from_secs(60),
    );
    let table = loader.load(DatasetKind::Enrolment).expect("loads");

    let scored = scoring::score(&aggregate::by_district(&table, &table, &table));
    let assam: Vec<_> = scored.iter().filter(|d| d.state == "Assam").collect();
    assert_eq!(assam.len(), 2);
    for district in assam {
        assert_eq!(district.expected_enrolments, 0.0);
        assert!(district.visibility_gap_score.is_none());
        assert!(district.risk_tier.is_none());
        assert_eq!(recommend(district), vec![MONITOR_ACTION]);
    }

    let ranked = rank_by(&scored, HotspotMetric::Vgs);
    assert_eq!(ranked[0].district, "North Goa");
}

#[test]
fn zero_enrolment_district_survives_ranking() {
    let scored = scoring::score(&[
        district("Dhubri", 0, 10, 0),
        district("Kamrup", 100, 20, 70),
    ]);
    assert!(scored[0].update_intensity_ratio.is_none());

    let by_mpi = rank_by(&scored, HotspotMetric::Mpi);
    assert_eq!(by_mpi[0].district, "Kamrup");
    assert_eq!(by_mpi[1].district, "Dhubri");

    let by_bsi = rank_by(&scored, HotspotMetric::Bsi);
    assert_eq!(by_bsi.last().map(|d| d.district.as_str()), Some("Dhubri"));

    let by_vgs = rank_by(&scored, HotspotMetric::Vgs);
    assert_eq!(by_vgs[0].visibility_gap_score, Some(1.0));
    assert_eq!(by_vgs[0].district, "Dhubri");
}

#[test]
fn scoring_twice_is_identical() {
    let districts = vec![
        district("Dhubri", 0, 10, 0),
        district("Kamrup", 70, 3, 9),
        district("Cachar", 30, 40, 1),
    ];
    assert_eq!(scoring::score(&districts), scoring::score(&districts));
}

#[test]
fn risk_tier_boundaries() {
    assert_eq!(RiskTier::from_score(0.10), RiskTier::Low);
    assert_eq!(RiskTier::from_score(0.100_000_01), RiskTier::Medium);
    assert_eq!(RiskTier::from_score(0.20), RiskTier::Medium);
    assert_eq!(RiskTier::from_score(0.200_000_1), RiskTier::High);
    assert_eq!(scored_with(0.2, None, None).risk_label(), "Medium");
}

#[test]
fn recommendations_keep_fixed_order() {
    let district = scored_with(0.25, Some(0.6), Some(0.6));
    assert_eq!(
        recommend(&district),
        vec![
            "Mobile enrolment + outreach camps",
            "Assisted demographic update drive (migration/churn)",
            "Biometric recapture support + assisted verification",
        ]
    );
    assert_eq!(
        recommend_joined(&district),
        "Mobile enrolment + outreach camps | Assisted demographic update drive (migration/churn) | Biometric recapture support + assisted verification"
    );
    assert_eq!(recommend(&scored_with(0.1, None, Some(0.5))), vec![MONITOR_ACTION]);
}

#[test]
fn empty_month_filter_produces_empty_aggregates() {
    let enrol = "date,state,district,age_0_5\n01-05-2025,Assam,Kamrup,6\n";
    let loader = DatasetLoader::new(
        InMemorySource::new().with_batch(DatasetKind::Enrolment, "enrol.csv", enrol),
        Duration::from_secs(60),
    );
    let table = loader.load(DatasetKind::Enrolment).expect("loads");
    let params = FilterParams {
        month: Month::new(2024, 12),
        state: None,
    };

    let filtered = filter::apply(&table, &params);
    assert!(aggregate::by_state(&filtered).is_empty());
    assert!(aggregate::by_district(&filtered, &filtered, &filtered).is_empty());
    assert!(scoring::score(&[]).is_empty());
    assert_eq!(table.len(), 1);
}

#[test]
fn missing_kind_is_fatal() {
    let loader = DatasetLoader::new(
        InMemorySource::new().with_batch(
            DatasetKind::Enrolment,
            "enrol.csv",
            "date,state,district\n",
        ),
        Duration::from_secs(60),
    );
    assert!(loader.load(DatasetKind::Enrolment).is_ok());
    let error = loader
        .load(DatasetKind::BiometricUpdate)
        .expect_err("biometric batches are missing");
    assert!(matches!(
        error,
        PipelineError::MissingSourceData {
            kind: DatasetKind::BiometricUpdate,
            ..
        }
    ));
}
