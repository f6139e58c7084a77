use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAlert {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub recommendation: &'static str,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskForecast {
    pub alerts: Vec<TrendAlert>,
    pub predicted_increase: u8,
    pub timeframe: &'static str,
    pub urgency: Urgency,
}

pub fn forecast(current_risk: u8) -> RiskForecast {
    let (predicted_increase, timeframe, urgency) = match current_risk {
        80..=u8::MAX => (15, "2 years", Urgency::High),
        60..=79 => (25, "3 years", Urgency::Medium),
        40..=59 => (15, "5 years", Urgency::Low),
        _ => (5, "7 years", Urgency::VeryLow),
    };

    let mut alerts = Vec::new();
    if current_risk > 60 {
        alerts.push(TrendAlert {
            kind: "high_risk_trend",
            message: format!(
                "If current lifestyle continues, risk may increase by {predicted_increase}% in {timeframe}"
            ),
            recommendation: "Consider consulting healthcare provider for comprehensive evaluation",
            urgency,
        });
    } else if current_risk > 30 {
        alerts.push(TrendAlert {
            kind: "moderate_risk_trend",
            message: format!(
                "With lifestyle improvements, you can maintain low risk for the next {timeframe}"
            ),
            recommendation: "Continue healthy habits and regular check-ups",
            urgency,
        });
    }

    RiskForecast {
        alerts,
        predicted_increase,
        timeframe,
        urgency,
    }
}

/// Two consecutive readings for one patient. Zero counts as not recorded.
#[derive(Debug, Clone, Default)]
pub struct VitalsReading {
    pub current_weight: Option<f64>,
    pub previous_weight: Option<f64>,
    pub current_memory_score: Option<f64>,
    pub previous_memory_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub severity: Severity,
}

pub fn detect_anomalies(reading: &VitalsReading) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if let Some(change) = change_between(reading.current_weight, reading.previous_weight) {
        if change > 10.0 {
            anomalies.push(Anomaly {
                kind: "weight_change",
                message: format!(
                    "Significant weight change detected: {change}kg difference from previous reading"
                ),
                severity: if change > 20.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            });
        }
    }

    if let Some(change) =
        change_between(reading.current_memory_score, reading.previous_memory_score)
    {
        if change > 15.0 {
            anomalies.push(Anomaly {
                kind: "memory_change",
                message: format!(
                    "Significant memory score change detected: {change} point difference"
                ),
                severity: if change > 25.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            });
        }
    }

    anomalies
}

fn change_between(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(c), Some(p)) if c != 0.0 && p != 0.0 => Some((c - p).abs()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_tiers() {
        let high = forecast(85);
        assert_eq!((high.predicted_increase, high.timeframe), (15, "2 years"));
        assert_eq!(high.urgency, Urgency::High);
        assert_eq!(high.alerts[0].kind, "high_risk_trend");

        let medium = forecast(60);
        assert_eq!((medium.predicted_increase, medium.timeframe), (25, "3 years"));
        assert_eq!(medium.alerts[0].kind, "moderate_risk_trend");

        let low = forecast(40);
        assert_eq!(low.urgency, Urgency::Low);
        assert_eq!(low.alerts.len(), 1);

        let minimal = forecast(30);
        assert_eq!(minimal.urgency, Urgency::VeryLow);
        assert!(minimal.alerts.is_empty());
    }

    #[test]
    fn high_alert_message_mentions_timeframe() {
        let result = forecast(65);
        assert_eq!(
            result.alerts[0].message,
            "If current lifestyle continues, risk may increase by 25% in 3 years"
        );
    }

    #[test]
    fn flags_large_changes() {
        let reading = VitalsReading {
            current_weight: Some(80.0),
            previous_weight: Some(58.0),
            current_memory_score: Some(70.0),
            previous_memory_score: Some(52.0),
        };
        let anomalies = detect_anomalies(&reading);
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].kind, "weight_change");
        assert_eq!(anomalies[0].severity, Severity::High);
        assert_eq!(anomalies[1].kind, "memory_change");
        assert_eq!(anomalies[1].severity, Severity::Medium);
    }

    #[test]
    fn ignores_small_or_missing_readings() {
        let reading = VitalsReading {
            current_weight: Some(70.0),
            previous_weight: Some(75.0),
            current_memory_score: Some(40.0),
            previous_memory_score: Some(0.0),
        };
        assert!(detect_anomalies(&reading).is_empty());
        assert!(detect_anomalies(&VitalsReading::default()).is_empty());
    }
}
