use std::fmt::Write;

use chrono::{Duration, NaiveDate, Utc};

use crate::models::{Appointment, AssessmentRecord, MoodLog, MoodTrend, PatientSummary};

#[derive(Debug, Clone)]
pub struct RiskLevelSummary {
    pub risk_level: String,
    pub count: usize,
    pub avg_risk_score: f64,
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}

pub fn summarize_by_level(assessments: &[AssessmentRecord]) -> Vec<RiskLevelSummary> {
    let mut map: std::collections::HashMap<String, (usize, i32)> =
        std::collections::HashMap::new();

    for assessment in assessments {
        let entry = map
            .entry(assessment.risk_level.clone())
            .or_insert((0, 0));
        entry.0 += 1;
        entry.1 += assessment.risk_score;
    }

    let mut summaries: Vec<RiskLevelSummary> = map
        .into_iter()
        .map(|(risk_level, (count, total_score))| RiskLevelSummary {
            risk_level,
            count,
            avg_risk_score: if count == 0 {
                0.0
            } else {
                total_score as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.risk_level.cmp(&b.risk_level))
    });
    summaries
}

pub fn build_report(
    since_days: i64,
    cutoff: NaiveDate,
    patients: &[PatientSummary],
    assessments: &[AssessmentRecord],
    pending: &[Appointment],
) -> String {
    let summaries = summarize_by_level(assessments);

    let mut output = String::new();

    let _ = writeln!(output, "# Memory Risk Screening Report");
    let _ = writeln!(
        output,
        "Generated for the last {} days (assessments since {})",
        since_days.max(1),
        cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Level Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No assessments recorded for this window.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} assessments (avg score {:.1})",
                summary.risk_level, summary.count, summary.avg_risk_score
            );
        }
    }

    let mut ranked: Vec<&PatientSummary> = patients
        .iter()
        .filter(|p| p.latest_risk_score.is_some())
        .collect();
    ranked.sort_by(|a, b| b.latest_risk_score.cmp(&a.latest_risk_score));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Patients");

    if ranked.is_empty() {
        let _ = writeln!(output, "No patients assessed in this window.");
    } else {
        for patient in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) score {} {}, {} across {} assessments",
                patient.full_name,
                patient.email,
                patient.latest_risk_score.unwrap_or_default(),
                patient.latest_risk_level.as_deref().unwrap_or("unscored"),
                patient
                    .latest_wellness_level
                    .as_deref()
                    .unwrap_or("wellness unknown"),
                patient.total_assessments
            );
        }
    }

    let unassessed: Vec<&PatientSummary> = patients
        .iter()
        .filter(|p| p.last_assessment.is_none())
        .collect();
    if !unassessed.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Patients Without Recent Assessments");
        for patient in unassessed {
            let _ = writeln!(output, "- {} ({})", patient.full_name, patient.email);
        }
    }

    let mut recent = assessments.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Assessments");

    if recent.is_empty() {
        let _ = writeln!(output, "No assessments recorded for this window.");
    } else {
        for assessment in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}, {}, score {}; {} {}) on {}: {}",
                assessment.patient_name,
                assessment.patient_email,
                assessment.risk_level,
                assessment.risk_score,
                assessment.wellness_level,
                assessment.wellness_score,
                assessment.created_at.date_naive(),
                assessment
                    .causal_analysis
                    .first()
                    .map(String::as_str)
                    .unwrap_or("no narrative recorded")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending Appointment Requests");

    if pending.is_empty() {
        let _ = writeln!(output, "No pending requests.");
    } else {
        for appointment in pending.iter() {
            let _ = writeln!(
                output,
                "- {} ({}) requests {} on {} [{}]",
                appointment.patient_name,
                appointment.patient_email,
                appointment.appointment_type,
                appointment.preferred_date,
                appointment.id
            );
        }
    }

    output
}

/// Markdown overview for one patient. `assessments` are expected newest first.
pub fn build_dashboard(
    email: &str,
    assessments: &[AssessmentRecord],
    mood_trends: &[MoodTrend],
    recent_moods: &[MoodLog],
    appointments: &[Appointment],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Dashboard for {email}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Assessment");

    match assessments.first() {
        Some(latest) => {
            let _ = writeln!(
                output,
                "- {} (score {}), {} ({}) on {}",
                latest.risk_level,
                latest.risk_score,
                latest.wellness_level,
                latest.wellness_score,
                latest.created_at.date_naive()
            );
            for line in latest.causal_analysis.iter() {
                let _ = writeln!(output, "  - {line}");
            }
        }
        None => {
            let _ = writeln!(output, "No assessments yet.");
        }
    }

    if assessments.len() > 1 {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Recent Assessments");
        for assessment in assessments.iter() {
            let _ = writeln!(
                output,
                "- {}: {} {}, {} {}",
                assessment.created_at.date_naive(),
                assessment.risk_level,
                assessment.risk_score,
                assessment.wellness_level,
                assessment.wellness_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mood Trends");
    if mood_trends.is_empty() {
        let _ = writeln!(output, "No moods logged in this window.");
    } else {
        for trend in mood_trends.iter() {
            let _ = writeln!(output, "- {}: {}", trend.mood, trend.count);
        }
    }

    if !recent_moods.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Recent Moods");
        for mood in recent_moods.iter() {
            if mood.notes.is_empty() {
                let _ = writeln!(output, "- {} {}", mood.logged_at.date_naive(), mood.mood);
            } else {
                let _ = writeln!(
                    output,
                    "- {} {}: {}",
                    mood.logged_at.date_naive(),
                    mood.mood,
                    mood.notes
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Appointments");
    if appointments.is_empty() {
        let _ = writeln!(output, "No appointment requests.");
    } else {
        for appointment in appointments.iter() {
            let _ = writeln!(
                output,
                "- {} on {} [{}]",
                appointment.appointment_type,
                appointment.preferred_date,
                appointment.status.as_str()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use uuid::Uuid;

    fn assessment(name: &str, score: i32, level: &str, days_ago: i64) -> AssessmentRecord {
        AssessmentRecord {
            patient_name: name.to_string(),
            patient_email: format!("{}@example.com", name.to_lowercase()),
            risk_score: score,
            risk_level: level.to_string(),
            wellness_score: 12,
            wellness_level: "Moderate Wellness".to_string(),
            causal_analysis: vec![format!("{name} narrative")],
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn patient(name: &str, score: Option<i32>) -> PatientSummary {
        PatientSummary {
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            latest_risk_score: score,
            latest_risk_level: score.map(|_| "High Risk".to_string()),
            latest_wellness_level: score.map(|_| "Low Wellness".to_string()),
            last_assessment: score.map(|_| Utc::now()),
            total_assessments: i64::from(score.is_some()),
        }
    }

    #[test]
    fn summarizes_levels_by_count() {
        let records = vec![
            assessment("Ada", 70, "High Risk", 1),
            assessment("Ben", 80, "High Risk", 2),
            assessment("Cy", 20, "Low Risk", 3),
        ];
        let summaries = summarize_by_level(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].risk_level, "High Risk");
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_risk_score - 75.0).abs() < 0.001);
    }

    #[test]
    fn cutoff_date_respects_since_days() {
        let expected = Utc::now().date_naive() - Duration::days(14);
        assert_eq!(cutoff_date(14), expected);
        assert_eq!(cutoff_date(0), Utc::now().date_naive() - Duration::days(1));
    }

    #[test]
    fn report_orders_patients_and_lists_pending() {
        let patients = vec![patient("Ada", Some(40)), patient("Ben", Some(90)), patient("Cy", None)];
        let records = vec![assessment("Ada", 40, "Moderate Risk", 3), assessment("Ben", 90, "High Risk", 1)];
        let pending = vec![Appointment {
            id: Uuid::nil(),
            patient_name: "Ada".to_string(),
            patient_email: "ada@example.com".to_string(),
            appointment_type: "cognitive screening".to_string(),
            preferred_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            notes: String::new(),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }];

        let report = build_report(30, cutoff_date(30), &patients, &records, &pending);
        let ben = report.find("- Ben (ben@example.com) score 90").unwrap();
        let ada = report.find("- Ada (ada@example.com) score 40").unwrap();
        assert!(ben < ada);
        assert!(report.contains("## Patients Without Recent Assessments\n- Cy (cy@example.com)"));
        assert!(report.contains("- Ben (ben@example.com, High Risk, score 90; Moderate Wellness 12) on"));
        assert!(report.contains(": Ben narrative"));
        assert!(report.contains("requests cognitive screening on 2026-11-02"));
    }

    #[test]
    fn dashboard_shows_latest_assessment_and_history() {
        let mut latest = assessment("Ada", 55, "Moderate Risk", 1);
        latest.causal_analysis = vec!["first cause".to_string(), "second cause".to_string()];
        let records = vec![latest, assessment("Ada", 30, "Low Risk", 40)];
        let trends = vec![
            MoodTrend {
                mood: "Happy".to_string(),
                count: 4,
            },
            MoodTrend {
                mood: "Sad".to_string(),
                count: 1,
            },
        ];
        let moods = vec![MoodLog {
            mood: "Happy".to_string(),
            notes: "walked in the park".to_string(),
            logged_at: Utc::now(),
        }];
        let appointments = vec![Appointment {
            id: Uuid::nil(),
            patient_name: "Ada".to_string(),
            patient_email: "ada@example.com".to_string(),
            appointment_type: "follow-up".to_string(),
            preferred_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            notes: String::new(),
            status: AppointmentStatus::Approved,
            created_at: Utc::now(),
        }];

        let dashboard =
            build_dashboard("ada@example.com", &records, &trends, &moods, &appointments);
        assert!(dashboard.starts_with("# Dashboard for ada@example.com"));
        assert!(dashboard.contains("## Latest Assessment\n- Moderate Risk (score 55), Moderate Wellness (12)"));
        assert!(dashboard.contains("  - first cause\n  - second cause"));
        assert!(dashboard.contains("Low Risk 30"));
        assert!(dashboard.contains("- Happy: 4\n- Sad: 1"));
        assert!(dashboard.contains("Happy: walked in the park"));
        assert!(dashboard.contains("- follow-up on 2026-12-01 [approved]"));
    }

    #[test]
    fn dashboard_without_history() {
        let dashboard = build_dashboard("new@example.com", &[], &[], &[], &[]);
        assert!(dashboard.contains("No assessments yet."));
        assert!(!dashboard.contains("## Recent Assessments"));
        assert!(dashboard.contains("No moods logged in this window."));
        assert!(!dashboard.contains("## Recent Moods"));
        assert!(dashboard.contains("No appointment requests."));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report(7, cutoff_date(7), &[], &[], &[]);
        assert!(report.contains("No assessments recorded for this window."));
        assert!(report.contains("No patients assessed in this window."));
        assert!(report.contains("No pending requests."));
    }
}
