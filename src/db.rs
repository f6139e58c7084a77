use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::history::{ChatWindow, CHAT_HISTORY_LIMIT};
use crate::models::{
    Appointment, AppointmentDecision, AssessmentRecord, ChatExchange, Mood, MoodLog, MoodTrend,
    PatientRole, PatientSummary, QuestionnaireResponse, ScoreResult,
};
use crate::risk;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let people = vec![
        (
            "Margaret Hill",
            "margaret.hill@example.com",
            PatientRole::Patient,
        ),
        ("Omar Haddad", "omar.haddad@example.com", PatientRole::Patient),
        ("Lena Novak", "lena.novak@example.com", PatientRole::Patient),
        ("Dr. Priya Raman", "priya.raman@example.com", PatientRole::Doctor),
    ];

    for (name, email, role) in people {
        upsert_patient(pool, email, name, role).await?;
    }

    let questionnaires = vec![
        (
            "seed-001",
            "margaret.hill@example.com",
            json!({
                "memory_loss": "Moderate",
                "age_group": "Above 80",
                "problem_solving": "Yes",
                "disorientation": "No",
                "mood_swings": "Yes",
                "family_history": "Yes",
                "poor_judgment": "No",
                "wellness": {"sleep_quality": 2, "mood_level": 2, "social_engagement": "Rarely"}
            }),
        ),
        (
            "seed-002",
            "omar.haddad@example.com",
            json!({
                "memory_loss": "Mild",
                "age_group": "60-70",
                "problem_solving": "No",
                "disorientation": "No",
                "mood_swings": "Yes",
                "family_history": "No",
                "poor_judgment": "No",
                "wellness": {"sleep_quality": 4, "mood_level": 3, "social_engagement": "Often"}
            }),
        ),
        (
            "seed-003",
            "lena.novak@example.com",
            json!({
                "memory_loss": "None",
                "age_group": "Below 60",
                "problem_solving": "No",
                "disorientation": "No",
                "mood_swings": "No",
                "family_history": "No",
                "poor_judgment": "No",
                "wellness": {"sleep_quality": 5, "mood_level": 4, "social_engagement": "Often"}
            }),
        ),
    ];

    let mut inserted = 0usize;
    for (source_key, email, raw) in questionnaires {
        let patient_id = patient_id_by_email(pool, email).await?;
        let response = QuestionnaireResponse::from_json(&raw)?;
        let result = risk::assess(&response);
        if save_assessment(pool, patient_id, &result, &raw, Some(source_key)).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn upsert_patient(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    role: PatientRole,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO memory_screening.patients (id, full_name, email, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn patient_id_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM memory_screening.patients WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no patient registered with email {email}"))?;

    Ok(row.get("id"))
}

/// Stores a scored assessment. Returns false when `source_key` was already imported.
pub async fn save_assessment(
    pool: &PgPool,
    patient_id: Uuid,
    result: &ScoreResult,
    raw_input: &Value,
    source_key: Option<&str>,
) -> anyhow::Result<bool> {
    let outcome = sqlx::query(
        r#"
        INSERT INTO memory_screening.assessments
        (id, patient_id, risk_score, risk_level, wellness_score, wellness_level,
         causal_analysis, raw_input, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(i32::from(result.risk_score))
    .bind(result.risk_level.as_str())
    .bind(i32::from(result.wellness_score))
    .bind(result.wellness_level.as_str())
    .bind(&result.causal_analysis)
    .bind(raw_input)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(outcome.rows_affected() > 0)
}

pub async fn fetch_patient_summaries(
    pool: &PgPool,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<PatientSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT p.full_name, p.email,
               latest.risk_score, latest.risk_level, latest.wellness_level,
               latest.created_at AS last_assessment,
               COALESCE(counts.total, 0) AS total_assessments
        FROM memory_screening.patients p
        LEFT JOIN LATERAL (
            SELECT a.risk_score, a.risk_level, a.wellness_level, a.created_at
            FROM memory_screening.assessments a
            WHERE a.patient_id = p.id AND a.created_at >= $1
            ORDER BY a.created_at DESC
            LIMIT 1
        ) latest ON TRUE
        LEFT JOIN LATERAL (
            SELECT COUNT(*) AS total
            FROM memory_screening.assessments a
            WHERE a.patient_id = p.id AND a.created_at >= $1
        ) counts ON TRUE
        WHERE p.role = 'patient'
        ORDER BY latest.created_at DESC NULLS LAST
        "#,
    )
    .bind(since_date)
    .fetch_all(pool)
    .await?;

    let summaries = rows
        .into_iter()
        .map(|row| PatientSummary {
            full_name: row.get("full_name"),
            email: row.get("email"),
            latest_risk_score: row.get("risk_score"),
            latest_risk_level: row.get("risk_level"),
            latest_wellness_level: row.get("wellness_level"),
            last_assessment: row.get("last_assessment"),
            total_assessments: row.get("total_assessments"),
        })
        .collect();

    Ok(summaries)
}

/// Assessments newest first, optionally limited to one patient, a window and a count.
pub async fn fetch_recent_assessments(
    pool: &PgPool,
    since_date: Option<NaiveDate>,
    email: Option<&str>,
    limit: Option<i64>,
) -> anyhow::Result<Vec<AssessmentRecord>> {
    let mut query = String::from(
        "SELECT p.full_name, p.email, a.risk_score, a.risk_level, a.wellness_score, \
         a.wellness_level, a.causal_analysis, a.created_at \
         FROM memory_screening.assessments a \
         JOIN memory_screening.patients p ON p.id = a.patient_id \
         WHERE TRUE",
    );

    let mut param = 0;
    if since_date.is_some() {
        param += 1;
        query.push_str(&format!(" AND a.created_at >= ${param}"));
    }
    if email.is_some() {
        param += 1;
        query.push_str(&format!(" AND p.email = ${param}"));
    }
    query.push_str(" ORDER BY a.created_at DESC");
    if limit.is_some() {
        param += 1;
        query.push_str(&format!(" LIMIT ${param}"));
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = since_date {
        rows = rows.bind(value);
    }
    if let Some(value) = email {
        rows = rows.bind(value);
    }
    if let Some(value) = limit {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut assessments = Vec::with_capacity(records.len());

    for row in records {
        assessments.push(AssessmentRecord {
            patient_name: row.get("full_name"),
            patient_email: row.get("email"),
            risk_score: row.get("risk_score"),
            risk_level: row.get("risk_level"),
            wellness_score: row.get("wellness_score"),
            wellness_level: row.get("wellness_level"),
            causal_analysis: row.get("causal_analysis"),
            created_at: row.get("created_at"),
        });
    }

    Ok(assessments)
}

pub async fn save_chat_exchange(
    pool: &PgPool,
    session_id: &str,
    patient_id: Option<Uuid>,
    exchange: &ChatExchange,
    context: &Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO memory_screening.chat_exchanges
        (id, session_id, patient_id, user_message, bot_response, context, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(patient_id)
    .bind(&exchange.message)
    .bind(&exchange.response)
    .bind(context)
    .bind(exchange.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Stores an exchange and trims the session back to the most recent
/// [`CHAT_HISTORY_LIMIT`] rows. Returns the number of rows dropped.
pub async fn append_chat_exchange(
    pool: &PgPool,
    session_id: &str,
    patient_id: Option<Uuid>,
    exchange: &ChatExchange,
    context: &Value,
) -> anyhow::Result<u64> {
    save_chat_exchange(pool, session_id, patient_id, exchange, context).await?;
    prune_chat_history(pool, session_id).await
}

/// Most recent exchanges of a session, oldest first.
pub async fn fetch_chat_history(pool: &PgPool, session_id: &str) -> anyhow::Result<ChatWindow> {
    let rows = sqlx::query(
        r#"
        SELECT user_message, bot_response, created_at
        FROM memory_screening.chat_exchanges
        WHERE session_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(session_id)
    .bind(CHAT_HISTORY_LIMIT as i64)
    .fetch_all(pool)
    .await?;

    let exchanges = rows.into_iter().rev().map(|row| ChatExchange {
        message: row.get("user_message"),
        response: row.get("bot_response"),
        timestamp: row.get("created_at"),
    });

    Ok(ChatWindow::from_exchanges(exchanges))
}

/// Drops everything but the most recent exchanges of a session.
pub async fn prune_chat_history(pool: &PgPool, session_id: &str) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM memory_screening.chat_exchanges
        WHERE session_id = $1
          AND id NOT IN (
              SELECT id FROM memory_screening.chat_exchanges
              WHERE session_id = $1
              ORDER BY created_at DESC
              LIMIT $2
          )
        "#,
    )
    .bind(session_id)
    .bind(CHAT_HISTORY_LIMIT as i64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        memory_loss: Option<String>,
        age_group: Option<String>,
        problem_solving: Option<String>,
        disorientation: Option<String>,
        mood_swings: Option<String>,
        family_history: Option<String>,
        poor_judgment: Option<String>,
        sleep_quality: Option<String>,
        mood_level: Option<String>,
        social_engagement: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let raw = json!({
            "memory_loss": row.memory_loss,
            "age_group": row.age_group,
            "problem_solving": row.problem_solving,
            "disorientation": row.disorientation,
            "mood_swings": row.mood_swings,
            "family_history": row.family_history,
            "poor_judgment": row.poor_judgment,
            "wellness": {
                "sleep_quality": row.sleep_quality,
                "mood_level": row.mood_level,
                "social_engagement": row.social_engagement,
            },
        });
        let response = QuestionnaireResponse::from_json(&raw)
            .with_context(|| format!("invalid questionnaire on data row {}", line + 1))?;
        let result = risk::assess(&response);

        let patient_id =
            upsert_patient(pool, &row.email, &row.full_name, PatientRole::Patient).await?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if save_assessment(pool, patient_id, &result, &raw, Some(&source_key)).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn request_appointment(
    pool: &PgPool,
    patient_id: Uuid,
    appointment_type: &str,
    preferred_date: NaiveDate,
    notes: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO memory_screening.appointments
        (id, patient_id, appointment_type, preferred_date, notes)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(patient_id)
    .bind(appointment_type)
    .bind(preferred_date)
    .bind(notes)
    .execute(pool)
    .await?;

    Ok(id)
}

const APPOINTMENT_COLUMNS: &str = "SELECT ap.id, p.full_name, p.email, ap.appointment_type, \
     ap.preferred_date, ap.notes, ap.status, ap.created_at \
     FROM memory_screening.appointments ap \
     JOIN memory_screening.patients p ON p.id = ap.patient_id";

fn appointment_from_row(row: &PgRow) -> anyhow::Result<Appointment> {
    let status: String = row.get("status");
    Ok(Appointment {
        id: row.get("id"),
        patient_name: row.get("full_name"),
        patient_email: row.get("email"),
        appointment_type: row.get("appointment_type"),
        preferred_date: row.get("preferred_date"),
        notes: row.get("notes"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        created_at: row.get("created_at"),
    })
}

pub async fn fetch_pending_appointments(pool: &PgPool) -> anyhow::Result<Vec<Appointment>> {
    let query = format!(
        "{APPOINTMENT_COLUMNS} WHERE ap.status = 'pending' ORDER BY ap.created_at DESC"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    rows.iter().map(appointment_from_row).collect()
}

/// A patient's own requests in any status, latest preferred date first.
pub async fn fetch_patient_appointments(
    pool: &PgPool,
    patient_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let query = format!(
        "{APPOINTMENT_COLUMNS} WHERE ap.patient_id = $1 \
         ORDER BY ap.preferred_date DESC, ap.created_at DESC LIMIT $2"
    );
    let rows = sqlx::query(&query)
        .bind(patient_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(appointment_from_row).collect()
}

pub async fn update_appointment_status(
    pool: &PgPool,
    appointment_id: Uuid,
    decision: AppointmentDecision,
) -> anyhow::Result<()> {
    let result = sqlx::query("UPDATE memory_screening.appointments SET status = $1 WHERE id = $2")
        .bind(decision.status().as_str())
        .bind(appointment_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("appointment {appointment_id} not found");
    }

    Ok(())
}

pub async fn log_mood(
    pool: &PgPool,
    patient_id: Uuid,
    mood: Mood,
    notes: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO memory_screening.mood_logs (id, patient_id, mood, notes)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(mood.as_str())
    .bind(notes)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_mood_trends(
    pool: &PgPool,
    patient_id: Uuid,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<MoodTrend>> {
    let rows = sqlx::query(
        r#"
        SELECT mood, COUNT(*) AS count
        FROM memory_screening.mood_logs
        WHERE patient_id = $1 AND logged_at >= $2
        GROUP BY mood
        ORDER BY count DESC, mood
        "#,
    )
    .bind(patient_id)
    .bind(since_date)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| MoodTrend {
            mood: row.get("mood"),
            count: row.get("count"),
        })
        .collect())
}

pub async fn fetch_recent_moods(
    pool: &PgPool,
    patient_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<MoodLog>> {
    let rows = sqlx::query(
        r#"
        SELECT mood, notes, logged_at
        FROM memory_screening.mood_logs
        WHERE patient_id = $1
        ORDER BY logged_at DESC
        LIMIT $2
        "#,
    )
    .bind(patient_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| MoodLog {
            mood: row.get("mood"),
            notes: row.get("notes"),
            logged_at: row.get("logged_at"),
        })
        .collect())
}

pub async fn log_emergency(
    pool: &PgPool,
    patient_id: Uuid,
    emergency_type: &str,
    location: &Value,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO memory_screening.emergency_logs (id, patient_id, emergency_type, location)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(patient_id)
    .bind(emergency_type)
    .bind(location)
    .execute(pool)
    .await?;

    Ok(id)
}
