use api_types::trip::TripNew;
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use client::{ApiClient, ClientError, Session, SessionStore, TripView, convert};
use engine::{
    BudgetSummary, ExpenseCategory, ExpenseId, MoneyCents, Participant, ParticipantId, TripId,
    TripRole,
};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    prompt,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Signs in and stores the session.
    Login {
        #[arg(long)]
        email: String,
    },
    /// Creates an account and signs in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    Logout,
    /// Shows the signed-in user, checking the stored session first.
    Whoami,
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Sets a new password using the token from the reset email.
    ResetPassword {
        #[arg(long)]
        token: String,
    },
    Trips,
    TripNew(TripNewArgs),
    Participants {
        trip: i64,
    },
    Invite {
        trip: i64,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "MEMBER", value_parser = parse_role)]
        role: TripRole,
    },
    SetRole {
        trip: i64,
        participant: i64,
        #[arg(value_parser = parse_role)]
        role: TripRole,
    },
    Remove {
        trip: i64,
        participant: i64,
    },
    /// Lists invitations addressed to you.
    Invitations,
    /// Accepts or declines an invitation.
    Respond {
        invitation: i64,
        #[arg(long, conflicts_with = "decline", required_unless_present = "decline")]
        accept: bool,
        #[arg(long)]
        decline: bool,
    },
    Expenses {
        trip: i64,
    },
    ExpenseAdd(ExpenseAddArgs),
    ExpenseDelete {
        trip: i64,
        expense: i64,
    },
    /// Toggles whether a participant has paid their share of an expense.
    Pay {
        trip: i64,
        expense: i64,
        participant: i64,
    },
    Balances {
        trip: i64,
        /// Show the server's summary instead of computing it locally.
        #[arg(long)]
        server: bool,
    },
}

#[derive(Debug, Args)]
pub struct TripNewArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Planned total budget.
    #[arg(long)]
    pub budget: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ExpenseAddArgs {
    pub trip: i64,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub amount: String,
    #[arg(long, default_value = "OTHER", value_parser = parse_category)]
    pub category: ExpenseCategory,
    #[arg(long)]
    pub description: Option<String>,
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Participant id of the payer. Defaults to yourself.
    #[arg(long)]
    pub payer: Option<i64>,
    /// Custom share as ID=PCT. Repeat for every participant.
    #[arg(long = "share", value_parser = parse_share)]
    pub shares: Vec<ShareArg>,
    /// Leaves a participant out of an equal split.
    #[arg(long = "exclude")]
    pub exclude: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShareArg {
    pub participant: ParticipantId,
    pub percentage: String,
}

fn parse_role(raw: &str) -> std::result::Result<TripRole, String> {
    TripRole::try_from(raw).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> std::result::Result<ExpenseCategory, String> {
    ExpenseCategory::try_from(raw).map_err(|err| err.to_string())
}

fn parse_share(raw: &str) -> std::result::Result<ShareArg, String> {
    let (id, percentage) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PCT, got {raw}"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid participant id: {id}"))?;
    Ok(ShareArg {
        participant: ParticipantId(id),
        percentage: percentage.trim().to_string(),
    })
}

pub async fn run(settings: &AppConfig, command: Command) -> Result<()> {
    let api = ApiClient::with_timeout(&settings.base_url, settings.request_timeout())?;
    let store = SessionStore::new(&settings.session_file);

    match command {
        Command::Login { email } => {
            let password = prompt::password("Password: ")?;
            let session = api.login(&email, &password).await?;
            store.save(&session)?;
            tracing::info!(user = %session.user_id(), "logged in");
            println!("Logged in as {}.", session.display_name());
        }
        Command::Register {
            email,
            first_name,
            last_name,
        } => {
            let password = prompt::new_password()?;
            let session = api
                .register(&email, &password, first_name.as_deref(), last_name.as_deref())
                .await?;
            store.save(&session)?;
            tracing::info!(user = %session.user_id(), "registered");
            println!("Welcome, {}.", session.display_name());
        }
        Command::Logout => {
            store.clear()?;
            tracing::info!("logged out");
            println!("Logged out.");
        }
        Command::Whoami => match store.restore(&api).await? {
            Some(session) => println!(
                "{} <{}>",
                session.display_name(),
                session.user().email
            ),
            None => println!("Not logged in."),
        },
        Command::ForgotPassword { email } => {
            let res = api.forgot_password(&email).await?;
            println!(
                "{}",
                res.message
                    .unwrap_or_else(|| "Check your inbox for a reset link.".to_string())
            );
        }
        Command::ResetPassword { token } => {
            api.validate_reset_token(&token).await?;
            let password = prompt::new_password()?;
            let res = api.reset_password(&token, &password).await?;
            println!(
                "{}",
                res.message
                    .unwrap_or_else(|| "Password updated.".to_string())
            );
        }
        Command::Trips => {
            let session = signed_in(&api, &store).await?;
            for trip in api.trips(&session).await? {
                let dates = match (trip.start_date, trip.end_date) {
                    (Some(start), Some(end)) => format!("{start} → {end}"),
                    (Some(start), None) => format!("from {start}"),
                    _ => String::new(),
                };
                println!("{:>4}  {:<28} {dates}", trip.id, trip.name);
            }
        }
        Command::TripNew(args) => {
            let session = signed_in(&api, &store).await?;
            if let (Some(start), Some(end)) = (args.start, args.end)
                && end < start
            {
                return Err(AppError::Input("trip ends before it starts".to_string()));
            }
            let payload = TripNew {
                name: args.name,
                description: args.description,
                start_date: args.start,
                end_date: args.end,
                budget: args.budget,
            };
            let trip = api.create_trip(&session, &payload).await?;
            tracing::info!(trip = trip.id, "trip created");
            println!("Created trip {} ({}).", trip.id, trip.name);
        }
        Command::Participants { trip } => {
            let view = open_trip(&api, &store, trip).await?;
            for p in view.participants() {
                println!(
                    "{:>4}  {:<24} {:<10} {:<9} {}",
                    p.id,
                    p.display_name(),
                    p.role,
                    p.status.as_str(),
                    p.email
                );
            }
        }
        Command::Invite { trip, email, role } => {
            let view = open_trip(&api, &store, trip).await?;
            view.invite(&email, role).await?;
            println!("Invited {email} as {role}.");
        }
        Command::SetRole {
            trip,
            participant,
            role,
        } => {
            let view = open_trip(&api, &store, trip).await?;
            view.change_role(ParticipantId(participant), role).await?;
            println!("Participant {participant} is now {role}.");
        }
        Command::Remove { trip, participant } => {
            let view = open_trip(&api, &store, trip).await?;
            view.remove_participant(ParticipantId(participant)).await?;
            println!("Removed participant {participant}.");
        }
        Command::Invitations => {
            let session = signed_in(&api, &store).await?;
            for inv in api.my_invitations(&session).await? {
                let status = convert::status_from_api(inv.status);
                println!(
                    "{:>4}  {:<28} {:<10} {}",
                    inv.id,
                    inv.trip_name.unwrap_or_else(|| format!("trip {}", inv.trip_id)),
                    convert::role_from_api(inv.role),
                    status.as_str()
                );
            }
        }
        Command::Respond {
            invitation,
            accept,
            decline: _,
        } => {
            let session = signed_in(&api, &store).await?;
            let inv = api
                .my_invitations(&session)
                .await?
                .into_iter()
                .find(|inv| inv.id == invitation)
                .ok_or(ClientError::NotFound)?;
            let status = convert::status_from_api(inv.status).respond(accept)?;
            api.respond_invitation(
                &session,
                TripId(inv.trip_id),
                ParticipantId(inv.id),
                convert::status_to_api(status),
            )
            .await?;
            tracing::info!(trip = inv.trip_id, accept, "invitation answered");
            println!("Invitation {}.", status.as_str().to_ascii_lowercase());
        }
        Command::Expenses { trip } => {
            let view = open_trip(&api, &store, trip).await?;
            let participants = view.participants();
            for expense in view.expenses() {
                let payer = expense
                    .payer
                    .map(|id| name_of(&participants, id))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>4}  {}  {:<24} {:<14} {:>10}  paid by {payer}{}",
                    expense.id,
                    expense.date,
                    expense.name,
                    expense.category.as_str(),
                    expense.amount,
                    if expense.is_fully_split() {
                        String::new()
                    } else {
                        format!(" ({:.2}% split)", expense.share_total())
                    }
                );
                for line in expense.share_lines() {
                    println!(
                        "        {:<24} {:>6.2}% {:>10} {}",
                        name_of(&participants, line.participant),
                        line.percentage,
                        line.owed,
                        if line.paid { "paid" } else { "open" }
                    );
                }
            }
        }
        Command::ExpenseAdd(args) => {
            let view = open_trip(&api, &store, args.trip).await?;
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            let mut draft = view.new_expense_draft(date);
            draft.name = args.name;
            draft.amount = args.amount;
            draft.category = args.category;
            draft.description = args.description;
            if let Some(payer) = args.payer {
                draft.payer = Some(ParticipantId(payer));
            }
            for id in args.exclude {
                let id = ParticipantId(id);
                if draft.split.is_active(id) {
                    draft.split.toggle_participant(id)?;
                }
            }
            for share in &args.shares {
                draft
                    .split
                    .set_custom_share_text(share.participant, &share.percentage)?;
            }

            let record = view.submit_expense(&draft).await?;
            println!("Added expense {} ({}).", record.id, record.amount);
        }
        Command::ExpenseDelete { trip, expense } => {
            let view = open_trip(&api, &store, trip).await?;
            view.delete_expense(ExpenseId(expense)).await?;
            println!("Deleted expense {expense}.");
        }
        Command::Pay {
            trip,
            expense,
            participant,
        } => {
            let view = open_trip(&api, &store, trip).await?;
            let paid = view
                .toggle_paid_status(ExpenseId(expense), ParticipantId(participant))
                .await?;
            println!(
                "{} marked as {}.",
                name_of(&view.participants(), ParticipantId(participant)),
                if paid { "paid" } else { "not paid" }
            );
        }
        Command::Balances { trip, server } => {
            let view = open_trip(&api, &store, trip).await?;
            let summary = if server {
                view.server_summary().unwrap_or_default()
            } else {
                view.balances()?
            };
            print_summary(&view.participants(), &summary);
        }
    }

    Ok(())
}

async fn signed_in(api: &ApiClient, store: &SessionStore) -> Result<Session> {
    store
        .restore(api)
        .await?
        .ok_or(AppError::Client(ClientError::NotAuthenticated))
}

async fn open_trip(api: &ApiClient, store: &SessionStore, trip: i64) -> Result<TripView> {
    let session = signed_in(api, store).await?;
    let view = TripView::new(api.clone(), session, TripId(trip));
    view.refresh().await?;
    Ok(view)
}

fn name_of(participants: &[Participant], id: ParticipantId) -> String {
    participants
        .iter()
        .find(|p| p.id == id)
        .map(Participant::display_name)
        .unwrap_or_else(|| format!("#{id}"))
}

fn print_summary(participants: &[Participant], summary: &BudgetSummary) {
    println!("Total spent: {}", summary.total_cost);
    if let (Some(planned), Some(remaining)) = (summary.planned_budget, summary.remaining_budget())
    {
        println!("Budget:      {planned} ({remaining} left)");
    }
    for row in &summary.balances {
        println!(
            "  {:<24} share {:>10}  paid {:>10}  {:>10} {}",
            name_of(participants, row.participant),
            row.share_total,
            row.paid_total,
            row.balance.abs(),
            row.standing().label()
        );
    }
    let open: MoneyCents = summary
        .balances
        .iter()
        .filter(|row| row.balance.is_negative())
        .map(|row| row.balance.abs())
        .sum();
    if !open.is_zero() {
        println!("Still to settle: {open}");
    }
}
