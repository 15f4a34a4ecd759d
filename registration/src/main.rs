//! `ticketr`: register for events and manage tickets from the terminal.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ticketr_client::{ApiClient, EventId, TicketId, UserId};
use ticketr_registration::{
    check_registration, load_my_tickets, registration_store, ticket_qr, Config, PaymentField,
    QrPayloadEncoder, RegistrationAction, RegistrationCheck, RegistrationEnvironment,
    RegistrationStep, Requester, TicketCard, TicketWithEvent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ticketr - campus event registration
#[derive(Parser)]
#[command(name = "ticketr")]
#[command(about = "Register for events and manage your tickets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register for an event and save the ticket card
    Register {
        /// Event to register for
        #[arg(long)]
        event: i64,

        /// Registering user
        #[arg(long)]
        user: i64,

        #[command(flatten)]
        card: CardArgs,
    },
    /// List upcoming and past tickets
    Tickets {
        /// Ticket holder
        #[arg(long)]
        user: i64,
    },
    /// Save the card for a stored ticket
    Download {
        /// Ticket holder
        #[arg(long)]
        user: i64,

        /// Ticket to render
        #[arg(long)]
        ticket: i64,
    },
    /// Check whether a user already holds a ticket for an event
    Check {
        /// Event
        #[arg(long)]
        event: i64,

        /// User
        #[arg(long)]
        user: i64,
    },
}

/// Payment details for paid events
#[derive(clap::Args)]
struct CardArgs {
    /// Card number
    #[arg(long, env = "TICKETR_CARD_NUMBER", hide_env_values = true)]
    card_number: Option<String>,

    /// Name on card
    #[arg(long)]
    card_name: Option<String>,

    /// Expiry, MM/YY
    #[arg(long)]
    expiry: Option<String>,

    /// Security code
    #[arg(long, env = "TICKETR_CARD_CVV", hide_env_values = true)]
    cvv: Option<String>,

    /// Postal code
    #[arg(long)]
    zip: Option<String>,
}

impl CardArgs {
    fn edits(self) -> Vec<RegistrationAction> {
        [
            (PaymentField::CardNumber, self.card_number),
            (PaymentField::CardName, self.card_name),
            (PaymentField::Expiry, self.expiry),
            (PaymentField::Cvv, self.cvv),
            (PaymentField::Zip, self.zip),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| RegistrationAction::EditPayment { field, value }))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketr=info,ticketr_registration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = config.api_client()?;

    match cli.command {
        Commands::Register { event, user, card } => {
            register_command(&config, &client, EventId::new(event), UserId::new(user), card).await
        },
        Commands::Tickets { user } => tickets_command(&client, UserId::new(user)).await,
        Commands::Download { user, ticket } => {
            download_command(&config, &client, UserId::new(user), TicketId::new(ticket)).await
        },
        Commands::Check { event, user } => {
            check_command(&client, EventId::new(event), UserId::new(user)).await
        },
    }
}

#[tracing::instrument(skip(config, client, card))]
async fn register_command(
    config: &Config,
    client: &ApiClient,
    event_id: EventId,
    user_id: UserId,
    card: CardArgs,
) -> Result<()> {
    let event = client.event(event_id).await.context("Could not load event")?;
    let user = client.user(user_id).await.context("Could not load user")?;
    let requester = Requester::from(&user);

    if let RegistrationCheck::Registered(ticket_id) =
        check_registration(client, user_id, event_id).await
    {
        bail!("Already registered for {} (ticket {ticket_id})", event.name);
    }
    if !event.registration_open(Utc::now(), requester.is_vip) {
        bail!("Registration for {} is not open", event.name);
    }

    println!("Event:    {}", event.name);
    println!("Date:     {}", ticketr_registration::card::format_event_date(event.date));
    println!("Location: {}", event.location);
    if event.is_free() {
        println!("Price:    Free");
    } else {
        let fee = event.ticket_price.platform_fee();
        println!(
            "Price:    {} + {fee} platform fee = {}",
            event.ticket_price,
            event.ticket_price.with_platform_fee()
        );
    }

    let env = RegistrationEnvironment::production(client, config.qr_options());
    let store = registration_store(event, requester, env);

    store.send(RegistrationAction::Confirm).await?;

    if store.state(|s| matches!(s.step, RegistrationStep::Payment { .. })).await {
        for edit in card.edits() {
            store.send(edit).await?;
        }
        store.send(RegistrationAction::SubmitPayment).await?;
    }

    let step = store.state(|s| s.step.clone()).await;
    match step {
        RegistrationStep::Success(issued) => {
            println!("Registered! Ticket ID: {}", issued.ticket_id);
            if let Some(paid) = issued.amount_paid {
                println!("Charged {paid}");
            }
            match config.card_renderer().download(&TicketCard::from_issued(&issued)).await? {
                Some(path) => println!("Ticket saved to {}", path.display()),
                None => println!("QR code unavailable; open the ticket later to download it"),
            }
            Ok(())
        },
        RegistrationStep::Payment { error, .. } => match error {
            Some(error) => bail!("Payment failed: {error}"),
            None => bail!("Payment details required"),
        },
        RegistrationStep::Failed { error, .. } => bail!("Registration failed: {error}"),
        other => bail!("Registration stopped at {}", other.name()),
    }
}

async fn tickets_command(client: &ApiClient, user_id: UserId) -> Result<()> {
    let now = Utc::now();
    let mine = load_my_tickets(client, client, user_id, now).await?;

    if mine.is_empty() {
        println!("No tickets yet");
        return Ok(());
    }

    println!("Upcoming");
    for entry in &mine.upcoming {
        print_entry(entry, now);
    }
    println!("Past");
    for entry in &mine.past {
        print_entry(entry, now);
    }
    Ok(())
}

fn print_entry(entry: &TicketWithEvent, now: chrono::DateTime<Utc>) {
    let status = format!("{:?}", entry.display_status(now)).to_lowercase();
    match &entry.event {
        Some(event) => println!(
            "  #{:<6} {:<8} {} | {} | {}",
            entry.ticket.id,
            status,
            event.name,
            ticketr_registration::card::format_event_date(event.date),
            event.location
        ),
        None => println!("  #{:<6} {:<8} (event unavailable)", entry.ticket.id, status),
    }
}

#[tracing::instrument(skip(config, client))]
async fn download_command(
    config: &Config,
    client: &ApiClient,
    user_id: UserId,
    ticket_id: TicketId,
) -> Result<()> {
    let now = Utc::now();
    let user = client.user(user_id).await.context("Could not load user")?;
    let mine = load_my_tickets(client, client, user_id, now).await?;

    let Some(entry) = mine.find(ticket_id) else {
        bail!("Ticket {ticket_id} not found for user {user_id}");
    };
    let Some(event) = &entry.event else {
        bail!("Event for ticket {ticket_id} is unavailable");
    };

    let encoder = QrPayloadEncoder::qrcode(config.view_qr_options());
    let qr = ticket_qr(&encoder, entry, &Requester::from(&user), now);
    let card = TicketCard::from_ticket(&entry.ticket, event, qr);

    match config.card_renderer().download(&card).await? {
        Some(path) => println!("Ticket saved to {}", path.display()),
        None => println!("QR code unavailable; nothing saved"),
    }
    Ok(())
}

async fn check_command(client: &ApiClient, event_id: EventId, user_id: UserId) -> Result<()> {
    match check_registration(client, user_id, event_id).await {
        RegistrationCheck::Registered(ticket_id) => println!("Registered (ticket {ticket_id})"),
        RegistrationCheck::NotRegistered => println!("Not registered"),
        RegistrationCheck::Unknown(reason) => println!("Unknown: {reason}"),
    }

    let event = client.event(event_id).await?;
    let registered = client.event_tickets(event_id).await?.len();
    let registered = u32::try_from(registered).unwrap_or(u32::MAX);
    if let Some(seats) = event.seats_remaining(registered) {
        println!("{seats} seats remaining");
    }
    Ok(())
}
