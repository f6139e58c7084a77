use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod alerts;
mod chatbot;
mod db;
mod error;
mod history;
mod knowledge;
mod models;
mod narrative;
mod report;
mod risk;

use chatbot::{Chatbot, FallbackPicker, RoundRobin, SeededRandom};
use knowledge::KnowledgeBase;
use models::{AppointmentDecision, ChatExchange, Mood, PatientRole, QuestionnaireResponse};

const DASHBOARD_ASSESSMENTS: i64 = 5;
const DASHBOARD_MOOD_DAYS: i64 = 30;
const DASHBOARD_RECENT_MOODS: i64 = 7;
const DASHBOARD_APPOINTMENTS: i64 = 10;

#[derive(Parser)]
#[command(name = "memory-risk-screening")]
#[command(about = "Alzheimer's risk self-assessment and information assistant", long_about = None)]
struct Cli {
    /// Knowledge base JSON used by the chatbot (defaults to the bundled data)
    #[arg(long, global = true, env = "KNOWLEDGE_BASE_PATH")]
    knowledge_base: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo patients and assessments
    Seed,
    /// Register a patient or doctor
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        doctor: bool,
    },
    /// Score a questionnaire (JSON file, or `-` for stdin)
    Assess {
        #[arg(long, default_value = "-")]
        input: PathBuf,
        /// Store the assessment for this patient when DATABASE_URL is set
        #[arg(long)]
        email: Option<String>,
        /// Include a risk trend forecast
        #[arg(long)]
        forecast: bool,
    },
    /// Ask the information chatbot a question
    Chat {
        message: String,
        /// Conversation id; history is kept when DATABASE_URL is set
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Seed for fallback selection
        #[arg(long, conflicts_with = "rotate_fallbacks")]
        seed: Option<u64>,
        /// Cycle through fallback answers in order
        #[arg(long)]
        rotate_fallbacks: bool,
    },
    /// Show the recent exchanges of a chat session
    History {
        #[arg(long)]
        session: String,
    },
    /// Score and store questionnaires from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown report of patient assessments
    Report {
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show a patient's latest assessments, moods and appointments
    Dashboard {
        #[arg(long)]
        email: String,
    },
    /// Record an emergency contact request for a patient
    Emergency {
        #[arg(long)]
        email: String,
        #[arg(long = "type", default_value = "general")]
        emergency_type: String,
        /// Location details as a JSON object
        #[arg(long)]
        location: Option<String>,
    },
    /// Forecast how a risk score may trend
    Forecast {
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        risk: u8,
    },
    /// Flag sudden changes between two readings
    Anomalies {
        #[arg(long)]
        current_weight: Option<f64>,
        #[arg(long)]
        previous_weight: Option<f64>,
        #[arg(long)]
        current_memory_score: Option<f64>,
        #[arg(long)]
        previous_memory_score: Option<f64>,
    },
    /// Daily mood tracking
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },
    /// Appointment requests
    Appointments {
        #[command(subcommand)]
        command: AppointmentCommands,
    },
}

#[derive(Subcommand)]
enum MoodCommands {
    /// Record today's mood (Happy, Neutral, Sad, Anxious)
    Log {
        #[arg(long)]
        email: String,
        #[arg(long)]
        mood: Mood,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Count moods over a window
    Trends {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
    },
}

#[derive(Subcommand)]
enum AppointmentCommands {
    /// Request an appointment
    Request {
        #[arg(long)]
        email: String,
        #[arg(long = "type")]
        appointment_type: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List requests awaiting a decision
    Pending,
    /// Approve or reject a request
    Decide {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        status: AppointmentDecision,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} new assessments).");
        }
        Commands::Register {
            name,
            email,
            doctor,
        } => {
            let pool = connect().await?;
            let role = if doctor {
                PatientRole::Doctor
            } else {
                PatientRole::Patient
            };
            let id = db::upsert_patient(&pool, &email, &name, role).await?;
            println!("Registered {} {name} <{email}> as {id}.", role.as_str());
        }
        Commands::Assess {
            input,
            email,
            forecast,
        } => {
            let raw = read_questionnaire(&input)?;
            let response =
                QuestionnaireResponse::from_json(&raw).context("invalid questionnaire")?;
            let result = risk::assess(&response);

            if let Some(email) = email.as_deref() {
                if let Some(pool) = connect_optional().await {
                    if let Err(err) = store_assessment(&pool, email, &result, &raw).await {
                        tracing::warn!(error = %err, email, "assessment not stored");
                    }
                }
            }

            let mut output = serde_json::to_value(&result)?;
            if forecast {
                output["forecast"] = serde_json::to_value(alerts::forecast(result.risk_score))?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Chat {
            message,
            session,
            email,
            seed,
            rotate_fallbacks,
        } => {
            let knowledge = Arc::new(KnowledgeBase::load_or_fallback(
                cli.knowledge_base.as_deref(),
            ));
            let picker: Box<dyn FallbackPicker> = match (seed, rotate_fallbacks) {
                (_, true) => Box::<RoundRobin>::default(),
                (Some(seed), false) => Box::new(SeededRandom::with_seed(seed)),
                (None, false) => Box::new(SeededRandom::from_entropy()),
            };
            let bot = Chatbot::new(knowledge, picker);
            let reply = bot.reply(&message);

            if let Some(session) = session.as_deref() {
                if let Some(pool) = connect_optional().await {
                    let exchange = ChatExchange {
                        message: message.clone(),
                        response: reply.response.clone(),
                        timestamp: Utc::now(),
                    };
                    let context = json!({
                        "related_queries": reply.related_queries,
                        "timestamp": exchange.timestamp.to_rfc3339(),
                    });
                    if let Err(err) =
                        record_chat(&pool, session, email.as_deref(), exchange, &context).await
                    {
                        tracing::warn!(error = %err, session, "chat exchange not stored");
                    }
                }
            }

            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::History { session } => {
            let pool = connect().await?;
            let window = db::fetch_chat_history(&pool, &session).await?;
            if window.is_empty() {
                println!("No history for session {session}.");
                return Ok(());
            }
            for exchange in window.into_vec() {
                println!(
                    "[{}] you: {}\n        bot: {}",
                    exchange.timestamp.format("%H:%M"),
                    exchange.message,
                    exchange.response
                );
            }
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} assessments from {}.", csv.display());
        }
        Commands::Report { since_days, out } => {
            let pool = connect().await?;
            let since_date = report::cutoff_date(since_days);
            let patients = db::fetch_patient_summaries(&pool, since_date).await?;
            let assessments = db::fetch_recent_assessments(&pool, Some(since_date), None, None).await?;
            let pending = db::fetch_pending_appointments(&pool).await?;
            let output =
                report::build_report(since_days, since_date, &patients, &assessments, &pending);
            std::fs::write(&out, output)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Dashboard { email } => {
            let pool = connect().await?;
            let patient_id = db::patient_id_by_email(&pool, &email).await?;
            let assessments = db::fetch_recent_assessments(
                &pool,
                None,
                Some(email.as_str()),
                Some(DASHBOARD_ASSESSMENTS),
            )
            .await?;
            let mood_trends =
                db::fetch_mood_trends(&pool, patient_id, report::cutoff_date(DASHBOARD_MOOD_DAYS))
                    .await?;
            let recent_moods =
                db::fetch_recent_moods(&pool, patient_id, DASHBOARD_RECENT_MOODS).await?;
            let appointments =
                db::fetch_patient_appointments(&pool, patient_id, DASHBOARD_APPOINTMENTS).await?;
            let output = report::build_dashboard(
                &email,
                &assessments,
                &mood_trends,
                &recent_moods,
                &appointments,
            );
            print!("{output}");
        }
        Commands::Emergency {
            email,
            emergency_type,
            location,
        } => {
            let location: Value = match location.as_deref() {
                Some(raw) => serde_json::from_str(raw).context("location is not valid JSON")?,
                None => json!({}),
            };
            let pool = connect().await?;
            let patient_id = db::patient_id_by_email(&pool, &email).await?;
            let id = db::log_emergency(&pool, patient_id, &emergency_type, &location).await?;
            tracing::warn!(email, emergency_type, %id, "emergency contact requested");
            println!("Emergency contact notified ({id}).");
        }
        Commands::Forecast { risk } => {
            let forecast = alerts::forecast(risk);
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
        Commands::Anomalies {
            current_weight,
            previous_weight,
            current_memory_score,
            previous_memory_score,
        } => {
            let reading = alerts::VitalsReading {
                current_weight,
                previous_weight,
                current_memory_score,
                previous_memory_score,
            };
            let anomalies = alerts::detect_anomalies(&reading);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "anomalies": anomalies }))?
            );
        }
        Commands::Mood { command } => {
            let pool = connect().await?;
            match command {
                MoodCommands::Log { email, mood, notes } => {
                    let patient_id = db::patient_id_by_email(&pool, &email).await?;
                    db::log_mood(&pool, patient_id, mood, &notes).await?;
                    println!("Mood logged ({}).", mood.as_str());
                }
                MoodCommands::Trends { email, since_days } => {
                    let patient_id = db::patient_id_by_email(&pool, &email).await?;
                    let since_date = report::cutoff_date(since_days);
                    let trends = db::fetch_mood_trends(&pool, patient_id, since_date).await?;
                    if trends.is_empty() {
                        println!("No moods logged since {since_date}.");
                    }
                    for trend in trends {
                        println!("- {}: {}", trend.mood, trend.count);
                    }
                }
            }
        }
        Commands::Appointments { command } => {
            let pool = connect().await?;
            match command {
                AppointmentCommands::Request {
                    email,
                    appointment_type,
                    date,
                    notes,
                } => {
                    let patient_id = db::patient_id_by_email(&pool, &email).await?;
                    let id = db::request_appointment(
                        &pool,
                        patient_id,
                        &appointment_type,
                        date,
                        &notes,
                    )
                    .await?;
                    println!("Appointment request {id} submitted.");
                }
                AppointmentCommands::Pending => {
                    let pending = db::fetch_pending_appointments(&pool).await?;
                    if pending.is_empty() {
                        println!("No pending requests.");
                    }
                    for appointment in pending {
                        println!(
                            "{} [{}] {} ({}) {} on {} requested {}{}",
                            appointment.id,
                            appointment.status.as_str(),
                            appointment.patient_name,
                            appointment.patient_email,
                            appointment.appointment_type,
                            appointment.preferred_date,
                            appointment.created_at.date_naive(),
                            if appointment.notes.is_empty() {
                                String::new()
                            } else {
                                format!(": {}", appointment.notes)
                            }
                        );
                    }
                }
                AppointmentCommands::Decide { id, status } => {
                    db::update_appointment_status(&pool, id, status).await?;
                    println!("Appointment {id} {}.", status.status().as_str());
                }
            }
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Storage is optional for scoring and chat; results are printed either way.
async fn connect_optional() -> Option<PgPool> {
    if std::env::var_os("DATABASE_URL").is_none() {
        tracing::debug!("DATABASE_URL not set, skipping persistence");
        return None;
    }
    match connect().await {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!(error = %err, "continuing without persistence");
            None
        }
    }
}

fn read_questionnaire(input: &Path) -> anyhow::Result<Value> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read questionnaire from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    serde_json::from_str(&raw).context("questionnaire is not valid JSON")
}

async fn store_assessment(
    pool: &PgPool,
    email: &str,
    result: &models::ScoreResult,
    raw: &Value,
) -> anyhow::Result<()> {
    let patient_id = db::patient_id_by_email(pool, email).await?;
    db::save_assessment(pool, patient_id, result, raw, None).await?;
    tracing::info!(email, risk_score = result.risk_score, "assessment stored");
    Ok(())
}

async fn record_chat(
    pool: &PgPool,
    session: &str,
    email: Option<&str>,
    exchange: ChatExchange,
    context: &Value,
) -> anyhow::Result<()> {
    let patient_id = match email {
        Some(email) => Some(db::patient_id_by_email(pool, email).await?),
        None => None,
    };

    let mut window = db::fetch_chat_history(pool, session).await?;
    let pruned = db::append_chat_exchange(pool, session, patient_id, &exchange, context).await?;
    window.push(exchange);
    tracing::debug!(session, pruned, exchanges = window.len(), "chat history updated");
    Ok(())
}
