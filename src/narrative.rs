use crate::models::QuestionnaireResponse;

pub const NARRATIVE_LEN: usize = 6;

const DEFAULT_FACTOR: &str = "lifestyle factors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryFactor {
    MemoryLoss,
    Age,
    FamilyHistory,
    MoodDisorders,
}

impl PrimaryFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryFactor::MemoryLoss => "memory_loss",
            PrimaryFactor::Age => "age",
            PrimaryFactor::FamilyHistory => "family_history",
            PrimaryFactor::MoodDisorders => "mood_disorders",
        }
    }
}

pub struct CausalTemplate {
    pub causes: [&'static str; 3],
    pub reduction: [&'static str; 3],
    pub consequences: [&'static str; 3],
}

static MEMORY_LOSS: CausalTemplate = CausalTemplate {
    causes: [
        "Memory impairment often stems from {factor1} and {factor2}, creating a cascade of cognitive challenges.",
        "The combination of {factor1} and neurological changes contributes significantly to memory difficulties.",
        "Progressive memory loss typically results from {factor1} combined with {factor2}, affecting daily functioning.",
    ],
    reduction: [
        "Memory training exercises like puzzles and brain games can help maintain cognitive function.",
        "Regular mental stimulation through reading and learning new skills preserves memory capacity.",
        "Structured routines and memory aids such as calendars and reminders can compensate for memory challenges.",
    ],
    consequences: [
        "Untreated memory loss may lead to increased dependency and reduced quality of life over time.",
        "Without intervention, memory impairment can progress, making daily tasks increasingly difficult.",
        "Progressive memory loss may result in social withdrawal and diminished independence if not addressed.",
    ],
};

static AGE: CausalTemplate = CausalTemplate {
    causes: [
        "Age-related cognitive changes combined with {factor1} accelerate brain function decline.",
        "Natural aging processes interact with {factor1} to impact cognitive reserve and brain health.",
        "Advanced age amplifies the effects of {factor1}, making brain cells more vulnerable to damage.",
    ],
    reduction: [
        "Regular cardiovascular exercise maintains brain blood flow and supports cognitive health in older adults.",
        "A Mediterranean-style diet rich in antioxidants and omega-3s helps protect against age-related decline.",
        "Lifelong learning and social engagement build cognitive reserve against age-related changes.",
    ],
    consequences: [
        "Age-related cognitive decline may progress more rapidly without proper lifestyle interventions.",
        "Advanced age combined with risk factors can lead to accelerated functional impairment.",
        "Without preventive measures, age-related brain changes may significantly impact independence.",
    ],
};

static FAMILY_HISTORY: CausalTemplate = CausalTemplate {
    causes: [
        "Genetic predisposition from {factor1} creates inherited vulnerabilities in brain cell function.",
        "Family history indicates genetic factors that interact with {factor1} to affect cognitive processes.",
        "Inherited genetic traits combined with {factor1} increase susceptibility to cognitive decline.",
    ],
    reduction: [
        "While genetic factors can't be changed, lifestyle modifications can significantly reduce overall risk.",
        "Regular health screenings and early intervention can help manage genetic predispositions effectively.",
        "Healthy lifestyle choices provide the best defense against genetic vulnerabilities.",
    ],
    consequences: [
        "Genetic predispositions may accelerate cognitive decline when combined with other risk factors.",
        "Family history suggests increased vulnerability that requires proactive risk management.",
        "Without intervention, genetic factors may contribute to more rapid cognitive deterioration.",
    ],
};

static MOOD_DISORDERS: CausalTemplate = CausalTemplate {
    causes: [
        "Mood disturbances and {factor1} create a complex interplay affecting cognitive function.",
        "Neurological inflammation from mood issues combined with {factor1} impacts brain cell communication.",
        "Chronic stress and mood changes interact with {factor1} to affect memory and cognitive processes.",
    ],
    reduction: [
        "Stress management techniques like meditation and mindfulness can improve mood and cognitive function.",
        "Regular exercise and social connections help stabilize mood and support brain health.",
        "Professional counseling and therapy can address underlying mood issues affecting cognition.",
    ],
    consequences: [
        "Untreated mood disorders may exacerbate cognitive decline and reduce treatment effectiveness.",
        "Chronic mood disturbances can accelerate brain changes and functional impairment.",
        "Without mood management, cognitive symptoms may worsen and become more resistant to intervention.",
    ],
};

const BASELINE_NARRATIVE: [&str; NARRATIVE_LEN] = [
    "General lifestyle factors combined with normal aging processes contribute to baseline cognitive health considerations.",
    "Regular health monitoring and maintaining an active lifestyle help preserve cognitive function across all age groups.",
    "A balanced diet rich in brain-healthy nutrients supports optimal cognitive performance throughout life.",
    "Regular physical exercise and mental stimulation build cognitive reserve against future challenges.",
    "Without regular health monitoring, subtle changes in cognitive function may go unnoticed over time.",
    "Maintaining social connections and stress management contributes to long-term brain health preservation.",
];

/// Template bundle for a primary factor key; unknown keys use the memory loss bundle.
pub fn template_for(key: &str) -> &'static CausalTemplate {
    match key {
        "memory_loss" => &MEMORY_LOSS,
        "age" => &AGE,
        "family_history" => &FAMILY_HISTORY,
        "mood_disorders" => &MOOD_DISORDERS,
        _ => &MEMORY_LOSS,
    }
}

/// Qualifying factors in precedence order.
pub fn primary_factors(response: &QuestionnaireResponse) -> Vec<PrimaryFactor> {
    let mut factors = Vec::new();

    if matches!(response.memory_loss.as_deref(), Some("Moderate" | "Severe")) {
        factors.push(PrimaryFactor::MemoryLoss);
    }
    if matches!(response.age_group.as_deref(), Some("70-80" | "Above 80")) {
        factors.push(PrimaryFactor::Age);
    }
    if response.family_history.as_deref() == Some("Yes") {
        factors.push(PrimaryFactor::FamilyHistory);
    }
    if response.mood_swings.as_deref() == Some("Yes")
        || response.disorientation.as_deref() == Some("Yes")
    {
        factors.push(PrimaryFactor::MoodDisorders);
    }

    factors
}

pub fn explain(response: &QuestionnaireResponse, risk_score: u8) -> Vec<String> {
    let Some(primary) = primary_factors(response).into_iter().next() else {
        tracing::debug!(risk_score, "no primary factor, using baseline narrative");
        return BASELINE_NARRATIVE.iter().map(|line| line.to_string()).collect();
    };

    tracing::debug!(risk_score, primary = primary.as_str(), "building causal narrative");

    let template = template_for(primary.as_str());
    let factor1 = response.age_group.as_deref().unwrap_or(DEFAULT_FACTOR);
    let factor2 = match response.family_history.as_deref() {
        Some("Yes") => "Yes",
        _ => DEFAULT_FACTOR,
    };

    let mut lines = Vec::with_capacity(NARRATIVE_LEN);
    for cause in &template.causes[..2] {
        lines.push(fill(cause, factor1, factor2));
    }
    lines.extend(template.reduction[..2].iter().map(|line| line.to_string()));
    lines.extend(template.consequences[..2].iter().map(|line| line.to_string()));
    lines
}

fn fill(template: &str, factor1: &str, factor2: &str) -> String {
    template
        .replace("{factor1}", factor1)
        .replace("{factor2}", factor2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(memory: &str, age: &str, family: &str) -> QuestionnaireResponse {
        QuestionnaireResponse {
            memory_loss: Some(memory.to_string()),
            age_group: Some(age.to_string()),
            family_history: Some(family.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_uses_baseline_narrative() {
        let lines = explain(&QuestionnaireResponse::default(), 0);
        assert_eq!(lines.len(), NARRATIVE_LEN);
        assert_eq!(lines, BASELINE_NARRATIVE.map(str::to_string).to_vec());
    }

    #[test]
    fn memory_loss_takes_precedence() {
        let r = response("Severe", "Above 80", "Yes");
        assert_eq!(
            primary_factors(&r),
            vec![
                PrimaryFactor::MemoryLoss,
                PrimaryFactor::Age,
                PrimaryFactor::FamilyHistory
            ]
        );

        let lines = explain(&r, 60);
        assert_eq!(lines.len(), NARRATIVE_LEN);
        assert_eq!(
            lines[0],
            "Memory impairment often stems from Above 80 and Yes, creating a cascade of cognitive challenges."
        );
        assert_eq!(
            lines[1],
            "The combination of Above 80 and neurological changes contributes significantly to memory difficulties."
        );
        assert_eq!(lines[2], MEMORY_LOSS.reduction[0]);
        assert_eq!(lines[3], MEMORY_LOSS.reduction[1]);
        assert_eq!(lines[4], MEMORY_LOSS.consequences[0]);
        assert_eq!(lines[5], MEMORY_LOSS.consequences[1]);
    }

    #[test]
    fn missing_substitutions_use_default_phrase() {
        let r = QuestionnaireResponse {
            disorientation: Some("Yes".to_string()),
            family_history: Some("No".to_string()),
            ..Default::default()
        };
        assert_eq!(primary_factors(&r), vec![PrimaryFactor::MoodDisorders]);

        let lines = explain(&r, 15);
        assert_eq!(
            lines[0],
            "Mood disturbances and lifestyle factors create a complex interplay affecting cognitive function."
        );
        assert_eq!(lines[2], MOOD_DISORDERS.reduction[0]);
    }

    #[test]
    fn mild_memory_loss_defers_to_age() {
        let r = response("Mild", "70-80", "No");
        assert_eq!(primary_factors(&r), vec![PrimaryFactor::Age]);
        let lines = explain(&r, 25);
        assert_eq!(
            lines[0],
            "Age-related cognitive changes combined with 70-80 accelerate brain function decline."
        );
    }

    #[test]
    fn unknown_template_key_falls_back_to_memory_loss() {
        assert!(std::ptr::eq(template_for("sleep"), &MEMORY_LOSS));
        assert!(std::ptr::eq(template_for("age"), &AGE));
    }

    #[test]
    fn narrative_is_deterministic() {
        let r = response("Moderate", "60-70", "Yes");
        assert_eq!(explain(&r, 50), explain(&r, 50));
    }
}
