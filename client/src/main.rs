use chrono::Local;
use clap::{Parser, Subcommand};
use client::api::HttpApi;
use client::auth::{FeedbackForm, LoginRedirect, Session};
use client::config::ClientConfig;
use client::error::{ApiError, ConfigError, FeedbackError, HistoryError, ScanError, SessionError};
use client::feedback::send_feedback;
use client::history::ScanHistory;
use client::presenter::{build_record_report, build_report, ScanReport, Section};
use client::scan::{ImageFile, SaveAction, ScanPhase, ScanTracker, ScanView, SubmitOutcome};
use shared::{Credentials, ScanId, ScanRecord, UserProfile};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "eatwisely")]
#[command(about = "Scan food labels and review their health analysis")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "EATWISELY_CONFIG")]
    config: Option<PathBuf>,

    /// Log in with this email before running the command
    #[arg(long, global = true, env = "EATWISELY_EMAIL")]
    email: Option<String>,

    #[arg(long, global = true, env = "EATWISELY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a label image and wait for its analysis
    Scan {
        image: PathBuf,

        /// Save the result to your history (requires login)
        #[arg(long)]
        save: bool,

        /// Include the extracted label text in the report
        #[arg(long)]
        text: bool,
    },

    /// List saved scans
    History {
        /// Load every page instead of the first one
        #[arg(long)]
        all: bool,
    },

    /// Show one saved scan
    Show { id: String },

    /// Delete a saved scan
    Delete { id: String },

    /// Show the signed-in profile
    Me,

    /// Send feedback to the EatWisely team
    Feedback {
        /// One of: suggestion, bug, general
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        message: String,

        /// Defaults to the signed-in profile's name
        #[arg(long)]
        name: Option<String>,

        /// Reply address, defaults to the signed-in profile's email
        #[arg(long = "reply-to", value_name = "EMAIL")]
        reply_to: Option<String>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error("{0}")]
    Analysis(String),
    #[error("Scan aborted")]
    Aborted,
    #[error("Login required, continue at {0}")]
    LoginRequired(LoginRedirect),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Aborted) => {
            eprintln!("Scan aborted");
            ExitCode::from(130)
        }
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let api = Arc::new(HttpApi::new(&config.api_url, config.request_timeout())?);
    log::info!("Using scan service at {}", api.base_url());

    let mut session = Session::new(
        api.clone(),
        config.unauthorized_policy,
        config.scan_origin.clone(),
    );
    if let (Some(email), Some(password)) = (cli.email, cli.password) {
        let user = session.login(&Credentials { email, password }).await?;
        log::info!("Signed in as {}", user.name);
    }

    match cli.command {
        Command::Scan { image, save, text } => {
            scan(&config, api, &mut session, &image, save, text).await
        }
        Command::History { all } => {
            let mut history = ScanHistory::new(api, config.history_page_size);
            let loaded = if all {
                history.load_all().await
            } else {
                history.load_more().await
            };
            if let Err(err) = loaded {
                return Err(unauthorized(&mut session, err.api_error()).unwrap_or(err.into()));
            }
            print_history(&history);
            Ok(())
        }
        Command::Show { id } => {
            let history = ScanHistory::new(api, config.history_page_size);
            match history.get(&ScanId::new(id)).await {
                Ok(record) => {
                    print_record(&record, &session);
                    Ok(())
                }
                Err(err) => Err(unauthorized(&mut session, err.api_error()).unwrap_or(err.into())),
            }
        }
        Command::Delete { id } => {
            let mut history = ScanHistory::new(api, config.history_page_size);
            let id = ScanId::new(id);
            match history.delete(&id).await {
                Ok(()) => {
                    println!("Deleted scan {}", id);
                    Ok(())
                }
                Err(err) => Err(unauthorized(&mut session, err.api_error()).unwrap_or(err.into())),
            }
        }
        Command::Me => {
            let refreshed = session.refresh().await.map(|user| user.clone());
            let user = match refreshed {
                Ok(user) => user,
                Err(SessionError::Request { message, source }) => {
                    return Err(unauthorized(&mut session, &source)
                        .unwrap_or(SessionError::Request { message, source }.into()));
                }
                Err(err) => return Err(err.into()),
            };
            print_profile(&user);
            Ok(())
        }
        Command::Feedback {
            kind,
            message,
            name,
            reply_to,
        } => {
            let profile = session.profile();
            let form = FeedbackForm {
                name: name
                    .or_else(|| profile.map(|p| p.name.clone()))
                    .unwrap_or_default(),
                email: reply_to
                    .or_else(|| profile.map(|p| p.email.clone()))
                    .unwrap_or_default(),
                feedback_type: kind,
                message,
            };
            println!("{}", send_feedback(&*api, &form).await?);
            Ok(())
        }
    }
}

/// Applies the 401 policy. Returns the redirect error to report, if any.
fn unauthorized(session: &mut Session, err: &ApiError) -> Option<CliError> {
    session
        .handle_unauthorized(err)
        .map(CliError::LoginRequired)
}

async fn scan(
    config: &ClientConfig,
    api: Arc<HttpApi>,
    session: &mut Session,
    path: &Path,
    save: bool,
    text: bool,
) -> Result<(), CliError> {
    let mode = session.actor_mode();
    let tracker = ScanTracker::new(api, config.poll_settings());
    tracker.select_image(ImageFile::open(path).await?);

    let view = match tracker.submit(mode).await {
        Ok(SubmitOutcome::Completed) => tracker.view(),
        Ok(SubmitOutcome::Polling(task_id)) => {
            log::info!("Analysis queued as task {}", task_id);
            follow_progress(&tracker).await
        }
        Err(err) => {
            if let Some(redirect) = err.api_error().and_then(|e| unauthorized(session, e)) {
                return Err(redirect);
            }
            return Err(err.into());
        }
    };

    let result = match view.phase {
        ScanPhase::Aborted => return Err(CliError::Aborted),
        _ => match (&view.result, &view.error) {
            (Some(result), _) => result,
            (None, error) => {
                return Err(CliError::Analysis(
                    error.clone().unwrap_or_else(|| "Scan did not finish".to_string()),
                ));
            }
        },
    };
    print_report(&build_report(result, mode), text);

    if save {
        match tracker.save(mode).await {
            Ok(SaveAction::Saved) => {
                if let Some(notice) = tracker.view().save_notice {
                    println!("{}", notice.message);
                }
            }
            Ok(SaveAction::LoginRequired(redirect)) => {
                return Err(CliError::LoginRequired(redirect));
            }
            Ok(SaveAction::NothingToSave) => {
                if let Some(notice) = tracker.view().save_notice {
                    eprintln!("{}", notice.message);
                }
            }
            Err(err) => {
                if let Some(redirect) = err.api_error().and_then(|e| unauthorized(session, e)) {
                    return Err(redirect);
                }
                return Err(err.into());
            }
        }
    }
    Ok(())
}

/// Prints progress until the scan settles. Ctrl-C aborts the poll.
async fn follow_progress(tracker: &ScanTracker) -> ScanView {
    let mut rx = tracker.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let view = rx.borrow_and_update().clone();
        if !view.is_loading() {
            return view;
        }
        eprintln!(
            "[{:>3}%] {}",
            view.progress.percent, view.progress.status_message
        );

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return tracker.view();
                }
            }
            _ = &mut ctrl_c => {
                log::warn!("Interrupted, aborting scan");
                tracker.abort();
                return tracker.view();
            }
        }
    }
}

fn print_profile(user: &UserProfile) {
    println!("{} <{}>", user.name, user.email);
    if let Some(age) = user.age {
        println!("Age: {}", age);
    }
    if let Some(gender) = &user.gender {
        println!("Gender: {}", gender);
    }
    if let Some(weight) = user.weight {
        println!("Weight: {} kg", weight);
    }
    if !user.diseases.is_empty() {
        println!("Conditions: {}", user.diseases.join(", "));
    }
    if !user.allergies.is_empty() {
        println!("Allergies: {}", user.allergies.join(", "));
    }
    println!("Profile {}% complete", user.completion_percent());
}

fn print_report(report: &ScanReport, with_text: bool) {
    for section in &report.sections {
        if matches!(section, Section::ExtractedText(_)) && !with_text {
            continue;
        }
        print!("{}", section);
    }
}

fn print_record(record: &ScanRecord, session: &Session) {
    println!(
        "Scan {} from {}",
        record.id,
        record.created_at.with_timezone(&Local).format("%b %e, %Y %H:%M")
    );
    if let Some(image) = &record.image_url {
        println!("Image: {}", image);
    }
    print_report(&build_record_report(record, session.actor_mode()), true);
}

fn print_history(history: &ScanHistory) {
    let groups = history.grouped_in(&Local::now());
    for (title, scans) in [
        ("Yesterday", &groups.yesterday),
        ("Last Month", &groups.last_month),
        ("All Scans", &groups.earlier),
    ] {
        if scans.is_empty() {
            continue;
        }
        println!("{}:", title);
        for scan in scans {
            let score = scan
                .analysis
                .health_score
                .map(|s| format!("{}/100", s))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  {}  {}",
                scan.id,
                scan.created_at.with_timezone(&Local).format("%b %e, %Y"),
                score
            );
        }
    }
    println!(
        "{} of {} scans loaded",
        history.scans().len(),
        history.total()
    );
}
