use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "AURA - retinal screening client for patients, doctors and admins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with username and password
    Login {
        username: String,
        #[arg(long)]
        password: String,
        /// Keep the profile in memory only; the token is always stored
        #[arg(long)]
        session_only: bool,
    },
    /// Sign in with a Google ID token
    Google {
        credential: String,
        #[arg(long)]
        session_only: bool,
    },
    /// Sign in with a Facebook access token
    Facebook {
        access_token: String,
        #[arg(long)]
        session_only: bool,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Choose the display name of a new social account
    SetUsername { name: String },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user and their landing view
    Whoami,
    /// Follow the analysis history until every record has finished
    History,
    /// Follow one analysis result until it has finished
    Result {
        record_id: String,
        /// Show the annotated image once available
        #[arg(long)]
        annotated: bool,
    },
    /// Conversations, one thread and sending
    Inbox {
        /// Open the thread with this partner
        #[arg(long)]
        partner: Option<String>,
        /// Send a message to the open thread
        #[arg(long, requires = "partner")]
        send: Option<String>,
        /// How long to keep polling
        #[arg(long, default_value_t = 10)]
        watch_secs: u64,
    },
    /// Doctor's patient roster
    Patients {
        /// Only severe completed scans waiting for review
        #[arg(long)]
        reviews: bool,
    },
    /// Account administration
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Profile details
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List manageable users and doctors
    Users,
    /// Assign a patient to a doctor
    Assign { patient_id: String, doctor_id: String },
    /// Flip a user between ACTIVE and INACTIVE
    ToggleStatus { user_id: String },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the profile
    Show,
    /// Update fields, given as field=value
    Set {
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = commands::app_context()?;

    match cli.command {
        Commands::Login {
            username,
            password,
            session_only,
        } => commands::auth::login(ctx, &username, &password, !session_only).await?,
        Commands::Google {
            credential,
            session_only,
        } => commands::auth::google(ctx, &credential, !session_only).await?,
        Commands::Facebook {
            access_token,
            session_only,
        } => commands::auth::facebook(ctx, &access_token, !session_only).await?,
        Commands::Register {
            username,
            password,
            confirm,
            email,
        } => commands::auth::register(ctx, &username, &password, &confirm, email.as_deref()).await?,
        Commands::SetUsername { name } => commands::auth::set_username(ctx, &name).await?,
        Commands::Logout => commands::auth::logout(ctx),
        Commands::Whoami => commands::auth::whoami(ctx),
        Commands::History => commands::records::history(ctx).await?,
        Commands::Result {
            record_id,
            annotated,
        } => commands::records::result(ctx, &record_id, annotated).await?,
        Commands::Inbox {
            partner,
            send,
            watch_secs,
        } => commands::inbox::run(ctx, partner.as_deref(), send.as_deref(), watch_secs).await?,
        Commands::Patients { reviews } => commands::doctor::patients(ctx, reviews).await?,
        Commands::Admin { action } => match action {
            AdminAction::Users => commands::admin::users(ctx).await?,
            AdminAction::Assign {
                patient_id,
                doctor_id,
            } => commands::admin::assign(ctx, &patient_id, &doctor_id).await?,
            AdminAction::ToggleStatus { user_id } => {
                commands::admin::toggle_status(ctx, &user_id).await?
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(ctx).await?,
            ProfileAction::Set { fields } => commands::profile::set(ctx, &fields).await?,
        },
    }

    Ok(())
}
