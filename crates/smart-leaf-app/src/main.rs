//! Command-line front end for the smart-leaf prediction flow.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use smart_leaf_app::{
    AppConfig, AppError, AppShell, FlowFactory, PredictionFlow, app_version, redact_sensitive,
};
use smart_leaf_auth::{AuthSession, HttpAuthTransport, SessionProvider};
use smart_leaf_capture::{
    FileImageSource, ImageAcquirer, PermissionGate, PermissionOutcome, StaticPermissions,
};
use smart_leaf_core::{Endpoint, display_label, format_confidence};
use smart_leaf_ui::ScreenState;
use smart_leaf_upload::{HttpInferenceTransport, InferenceClient};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Plant leaf disease diagnosis client
#[derive(Parser)]
#[command(name = "smart-leaf")]
#[command(author, version = app_version(), about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, submit one leaf image and print the ranked diagnosis
    Predict {
        /// Image file to analyze (.jpg, .jpeg or .png)
        image: PathBuf,

        /// Account email
        #[arg(long, env = "SMART_LEAF_EMAIL")]
        email: String,

        /// Account password
        #[arg(long, env = "SMART_LEAF_PASSWORD", hide_env_values = true)]
        password: String,

        /// Number of ranked entries to print
        #[arg(long, default_value_t = smart_leaf_core::DEFAULT_RANK_LIMIT)]
        top: usize,
    },

    /// Print the resolved backend endpoints
    Endpoints,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Endpoints => print_endpoints(),
        Commands::Predict {
            image,
            email,
            password,
            top,
        } => predict(image, &email, &password, top),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            let detail = redact_sensitive(&err.to_string());
            error!(stage = "cli", action = "abort", error = %detail);
            eprintln!("error: {detail}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("SMART_LEAF_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_endpoints() -> Result<ExitCode, AppError> {
    let config = AppConfig::from_env()?;
    println!("smart-leaf {}", app_version());
    for endpoint in Endpoint::ALL {
        println!("{:<8} {}", endpoint.name(), config.endpoints.url(endpoint));
    }
    Ok(ExitCode::SUCCESS)
}

fn predict(image: PathBuf, email: &str, password: &str, top: usize) -> Result<ExitCode, AppError> {
    let config = AppConfig::from_env()?;
    info!(stage = "cli", action = "start", version = app_version());

    let auth_transport = HttpAuthTransport::new(config.http_timeout_ms)?;
    let session = AuthSession::new(
        config.endpoints.url(Endpoint::Login),
        config.endpoints.url(Endpoint::Signup),
        Arc::new(auth_transport),
    )?;
    session.restore(None);
    let session: Arc<dyn SessionProvider> = Arc::new(session);

    let client = InferenceClient::new(
        config.endpoints.url(Endpoint::Predict),
        Arc::new(HttpInferenceTransport::new(config.http_timeout_ms)?),
    )?;
    let gate = PermissionGate::new(Arc::new(StaticPermissions::all_granted()));
    let acquirer = ImageAcquirer::new(Arc::new(FileImageSource::new(image)));
    let new_flow: FlowFactory = Box::new(move || {
        PredictionFlow::new(gate.clone(), acquirer.clone(), client.clone())
    });

    let mut shell = AppShell::new(session, new_flow);
    shell.sync_session();

    if !shell.login(email, password)? {
        eprintln!("Invalid email or password.");
        return Ok(ExitCode::FAILURE);
    }
    if let Some(name) = shell.greeting() {
        println!("Welcome back, {name}!");
    }

    let flow = shell.open_prediction()?;
    if flow.prepare() == PermissionOutcome::Denied {
        return Err(AppError::PermissionDenied);
    }
    flow.pick_image()?;
    if let Some(notice) = flow.screen_mut().take_notice() {
        eprintln!("{}: {}", notice.title, notice.message);
        return Ok(ExitCode::FAILURE);
    }
    flow.submit()?;

    let ready = matches!(flow.screen().state(), ScreenState::ResultReady(_));
    let code = if ready {
        if let Some(result) = flow.screen().view().result {
            println!("Prediction: {} ({})", result.headline, result.confidence);
        }
        for entry in flow.screen().ranked(top) {
            println!(
                "{:>2}. {:<40} {}",
                entry.rank,
                display_label(&entry.label),
                format_confidence(entry.confidence)
            );
        }
        ExitCode::SUCCESS
    } else {
        match flow.screen_mut().take_notice() {
            Some(notice) => eprintln!("{}: {}", notice.title, notice.message),
            None => eprintln!("{}", flow.screen().view().status),
        }
        ExitCode::FAILURE
    };

    shell.logout();
    Ok(code)
}
