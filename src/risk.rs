use crate::models::{
    QuestionnaireResponse, RiskLevel, ScoreResult, WellnessInput, WellnessLevel, RISK_FACTOR_KEYS,
};
use crate::narrative;

pub const MAX_RISK_SCORE: u8 = 100;
pub const MAX_WELLNESS_SCORE: u8 = 20;

pub fn assess(response: &QuestionnaireResponse) -> ScoreResult {
    let risk_score = score_risk(response);
    let wellness_score = score_wellness(response.wellness.as_ref());
    let causal_analysis = narrative::explain(response, risk_score);

    tracing::debug!(risk_score, wellness_score, "assessment scored");

    ScoreResult {
        risk_score,
        risk_level: risk_level(risk_score),
        wellness_score,
        wellness_level: wellness_level(wellness_score),
        causal_analysis,
    }
}

/// Points contributed by one factor label. Unknown factors and labels score zero.
pub fn factor_points(factor: &str, label: &str) -> u8 {
    match (factor, label) {
        ("memory_loss", "None") => 0,
        ("memory_loss", "Mild") => 10,
        ("memory_loss", "Moderate") => 20,
        ("memory_loss", "Severe") => 30,
        ("age_group", "Below 60") => 5,
        ("age_group", "60-70") => 10,
        ("age_group", "70-80") => 15,
        ("age_group", "Above 80") => 20,
        ("problem_solving" | "disorientation", "Yes") => 15,
        ("mood_swings" | "family_history" | "poor_judgment", "Yes") => 10,
        _ => 0,
    }
}

pub fn score_risk(response: &QuestionnaireResponse) -> u8 {
    let total = RISK_FACTOR_KEYS
        .iter()
        .filter_map(|factor| response.label(factor).map(|label| (*factor, label)))
        .fold(0u8, |acc, (factor, label)| {
            let points = factor_points(factor, label);
            if points == 0 && !is_known_label(factor, label) {
                tracing::debug!(factor, label, "unrecognized factor label scores zero");
            }
            acc.saturating_add(points)
        });

    total.min(MAX_RISK_SCORE)
}

fn is_known_label(factor: &str, label: &str) -> bool {
    match factor {
        "memory_loss" => matches!(label, "None" | "Mild" | "Moderate" | "Severe"),
        "age_group" => matches!(label, "Below 60" | "60-70" | "70-80" | "Above 80"),
        _ => matches!(label, "No" | "Yes"),
    }
}

pub fn risk_level(score: u8) -> RiskLevel {
    match score {
        0..=30 => RiskLevel::Low,
        31..=60 => RiskLevel::Moderate,
        _ => RiskLevel::High,
    }
}

pub fn social_points(engagement: Option<&str>) -> i64 {
    match engagement {
        Some("Rarely") => 2,
        Some("Often") => 3,
        _ => 1,
    }
}

pub fn score_wellness(wellness: Option<&WellnessInput>) -> u8 {
    let (sleep, mood, social) = match wellness {
        Some(w) => (
            w.sleep_quality.unwrap_or(1),
            w.mood_level.unwrap_or(1),
            social_points(w.social_engagement.as_deref()),
        ),
        None => (1, 1, 1),
    };

    let raw = sleep
        .saturating_mul(2)
        .saturating_add(mood.saturating_mul(2))
        .saturating_add(social);

    raw.clamp(0, i64::from(MAX_WELLNESS_SCORE)) as u8
}

pub fn wellness_level(score: u8) -> WellnessLevel {
    match score {
        0..=7 => WellnessLevel::Low,
        8..=14 => WellnessLevel::Moderate,
        _ => WellnessLevel::High,
    }
}
