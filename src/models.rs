use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AssessmentError;

/// The seven questionnaire dimensions that contribute to the risk score.
pub const RISK_FACTOR_KEYS: [&str; 7] = [
    "memory_loss",
    "age_group",
    "problem_solving",
    "disorientation",
    "mood_swings",
    "family_history",
    "poor_judgment",
];

/// A validated questionnaire submission.
///
/// Risk factor labels are permissive: anything that is not a string is
/// dropped and later scores zero, as does an unknown label. The `wellness`
/// block is strict: wrong types are rejected with
/// [`AssessmentError::InvalidInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionnaireResponse {
    pub memory_loss: Option<String>,
    pub age_group: Option<String>,
    pub problem_solving: Option<String>,
    pub disorientation: Option<String>,
    pub mood_swings: Option<String>,
    pub family_history: Option<String>,
    pub poor_judgment: Option<String>,
    pub wellness: Option<WellnessInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WellnessInput {
    pub sleep_quality: Option<i64>,
    pub mood_level: Option<i64>,
    pub social_engagement: Option<String>,
}

impl QuestionnaireResponse {
    pub fn from_json(value: &Value) -> Result<Self, AssessmentError> {
        let obj = value.as_object().ok_or_else(|| {
            AssessmentError::InvalidInput(format!(
                "questionnaire must be a JSON object, got {}",
                json_kind(value)
            ))
        })?;

        let wellness = match obj.get("wellness") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(WellnessInput::from_map(map)?),
            Some(other) => {
                return Err(AssessmentError::InvalidInput(format!(
                    "`wellness` must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(Self {
            memory_loss: factor_label(obj, "memory_loss"),
            age_group: factor_label(obj, "age_group"),
            problem_solving: factor_label(obj, "problem_solving"),
            disorientation: factor_label(obj, "disorientation"),
            mood_swings: factor_label(obj, "mood_swings"),
            family_history: factor_label(obj, "family_history"),
            poor_judgment: factor_label(obj, "poor_judgment"),
            wellness,
        })
    }

    /// Label supplied for a risk factor key, if any.
    pub fn label(&self, factor: &str) -> Option<&str> {
        let value = match factor {
            "memory_loss" => &self.memory_loss,
            "age_group" => &self.age_group,
            "problem_solving" => &self.problem_solving,
            "disorientation" => &self.disorientation,
            "mood_swings" => &self.mood_swings,
            "family_history" => &self.family_history,
            "poor_judgment" => &self.poor_judgment,
            _ => return None,
        };
        value.as_deref()
    }
}

impl WellnessInput {
    fn from_map(map: &Map<String, Value>) -> Result<Self, AssessmentError> {
        let social_engagement = match map.get("social_engagement") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(AssessmentError::InvalidInput(format!(
                    "`wellness.social_engagement` must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(Self {
            sleep_quality: integer_field(map, "sleep_quality")?,
            mood_level: integer_field(map, "mood_level")?,
            social_engagement,
        })
    }
}

fn factor_label(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(label)) => Some(label.clone()),
        None | Some(Value::Null) => None,
        Some(other) => {
            tracing::debug!(factor = key, value = %other, "ignoring non-string factor label");
            None
        }
    }
}

// Integers may arrive as JSON numbers or as numeric strings from form posts.
fn integer_field(map: &Map<String, Value>, key: &str) -> Result<Option<i64>, AssessmentError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            AssessmentError::InvalidInput(format!("`wellness.{key}` must be an integer, got {n}"))
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            AssessmentError::InvalidInput(format!("`wellness.{key}` must be an integer, got {s:?}"))
        }),
        Some(other) => Err(AssessmentError::InvalidInput(format!(
            "`wellness.{key}` must be an integer, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WellnessLevel {
    #[serde(rename = "Low Wellness")]
    Low,
    #[serde(rename = "Moderate Wellness")]
    Moderate,
    #[serde(rename = "High Wellness")]
    High,
}

impl WellnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WellnessLevel::Low => "Low Wellness",
            WellnessLevel::Moderate => "Moderate Wellness",
            WellnessLevel::High => "High Wellness",
        }
    }
}

impl fmt::Display for WellnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub wellness_score: u8,
    pub wellness_level: WellnessLevel,
    pub causal_analysis: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatExchange {
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub related_queries: Vec<String>,
    pub can_answer: bool,
}

#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub patient_name: String,
    pub patient_email: String,
    pub risk_score: i32,
    pub risk_level: String,
    pub wellness_score: i32,
    pub wellness_level: String,
    pub causal_analysis: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PatientSummary {
    pub full_name: String,
    pub email: String,
    pub latest_risk_score: Option<i32>,
    pub latest_risk_level: Option<String>,
    pub latest_wellness_level: Option<String>,
    pub last_assessment: Option<DateTime<Utc>>,
    pub total_assessments: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientRole {
    Patient,
    Doctor,
}

impl PatientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientRole::Patient => "patient",
            PatientRole::Doctor => "doctor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/// A doctor's verdict on a pending request. Only approval or rejection can be
/// recorded; requests are never moved back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentDecision(AppointmentStatus);

impl AppointmentDecision {
    pub fn status(&self) -> AppointmentStatus {
        self.0
    }
}

impl FromStr for AppointmentDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<AppointmentStatus>()? {
            AppointmentStatus::Pending => {
                Err("a decision must be either approved or rejected".to_string())
            }
            status => Ok(AppointmentDecision(status)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub appointment_type: String,
    pub preferred_date: NaiveDate,
    pub notes: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Anxious,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Sad => "Sad",
            Mood::Anxious => "Anxious",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "neutral" => Ok(Mood::Neutral),
            "sad" => Ok(Mood::Sad),
            "anxious" => Ok(Mood::Anxious),
            other => Err(format!("unknown mood: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoodTrend {
    pub mood: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct MoodLog {
    pub mood: String,
    pub notes: String,
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_documents() {
        for value in [json!([1, 2]), json!("memory_loss"), json!(42), json!(null)] {
            let err = QuestionnaireResponse::from_json(&value).unwrap_err();
            assert!(matches!(err, AssessmentError::InvalidInput(_)));
        }
    }

    #[test]
    fn non_string_factor_labels_are_dropped() {
        let response =
            QuestionnaireResponse::from_json(&json!({"memory_loss": 3, "age_group": "60-70"}))
                .unwrap();
        assert_eq!(response.memory_loss, None);
        assert_eq!(response.label("age_group"), Some("60-70"));
        assert_eq!(response.label("unknown_factor"), None);
    }

    #[test]
    fn wellness_accepts_numeric_strings() {
        let response = QuestionnaireResponse::from_json(&json!({
            "wellness": {"sleep_quality": "4", "mood_level": 2, "social_engagement": "Often"}
        }))
        .unwrap();
        let wellness = response.wellness.unwrap();
        assert_eq!(wellness.sleep_quality, Some(4));
        assert_eq!(wellness.mood_level, Some(2));
        assert_eq!(wellness.social_engagement.as_deref(), Some("Often"));
    }

    #[test]
    fn wellness_rejects_wrong_types() {
        let cases = [
            json!({"wellness": "good"}),
            json!({"wellness": {"sleep_quality": "restful"}}),
            json!({"wellness": {"mood_level": 2.5}}),
            json!({"wellness": {"social_engagement": 3}}),
        ];
        for case in cases {
            let err = QuestionnaireResponse::from_json(&case).unwrap_err();
            assert!(matches!(err, AssessmentError::InvalidInput(_)), "{case}");
        }
    }

    #[test]
    fn levels_serialize_with_display_labels() {
        assert_eq!(serde_json::to_value(RiskLevel::Moderate).unwrap(), json!("Moderate Risk"));
        assert_eq!(serde_json::to_value(WellnessLevel::High).unwrap(), json!("High Wellness"));
        assert!(RiskLevel::Low < RiskLevel::High);
    }

    #[test]
    fn decisions_exclude_pending() {
        assert!("pending".parse::<AppointmentDecision>().is_err());
        assert_eq!(
            "Approved".parse::<AppointmentDecision>().unwrap().status(),
            AppointmentStatus::Approved
        );
        assert!("maybe".parse::<AppointmentDecision>().is_err());
    }
}
