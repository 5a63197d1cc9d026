use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ControllerSnapshot, Environment, LaneKind, LaneState, LaneStatus, Resource,
    ResourceController, ServiceEndpoints,
};
use shared::domain::{ProductDraft, UserDraft};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "View and create users and products")]
struct Args {
    /// TOML settings file (defaults to ./storefront.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// API base URL. Implies the production environment unless --env is given.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    env: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch both collections once and print them.
    List,
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    AddProduct {
        #[arg(long)]
        name: String,
        /// Sent as a number; text that does not parse follows the configured price policy.
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Load both collections and reprint on every state change until q or Ctrl-C.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(api_url) = args.api_url {
        settings.api_url = Some(api_url);
        settings.environment = Environment::Production;
    }
    if let Some(env) = args.env.as_deref() {
        settings.environment = Environment::parse(env);
    }

    let endpoints =
        ServiceEndpoints::resolve(&settings).context("failed to resolve service URLs")?;
    let controller =
        ResourceController::new(&settings, &endpoints).context("failed to build controller")?;

    match args.command {
        Command::List => {
            let (users, products) = controller.fetch_all().await;
            print_snapshot(&controller.snapshot());
            if users.is_err() || products.is_err() {
                bail!("one or more collections failed to load");
            }
        }
        Command::AddUser {
            name,
            email,
            password,
        } => {
            controller.set_user_draft(UserDraft {
                name,
                email,
                password,
            });
            let outcome = controller.create_user().await;
            print_snapshot(&controller.snapshot());
            outcome.context("user was not created")?;
        }
        Command::AddProduct {
            name,
            price,
            description,
        } => {
            controller.set_product_draft(ProductDraft {
                name,
                description,
                price,
            });
            let outcome = controller.create_product().await;
            print_snapshot(&controller.snapshot());
            outcome.context("product was not created")?;
        }
        Command::Watch => watch(&controller).await?,
    }

    Ok(())
}

async fn watch(controller: &Arc<ResourceController>) -> Result<()> {
    let mut rx = controller.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut retries = JoinSet::new();
    controller.mount();
    println!("commands: r = retry failed lists, q = quit");

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
            line = input.next_line() => {
                match line.context("failed to read stdin")?.as_deref().map(str::trim) {
                    Some("r") => retry_failed(controller, &mut retries),
                    Some("q") | None => {
                        controller.unmount();
                        break;
                    }
                    Some(_) => {}
                }
            }
            Some(_) = retries.join_next(), if !retries.is_empty() => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("shutting down");
                controller.unmount();
                break;
            }
        }
    }
    retries.abort_all();
    Ok(())
}

fn retry_failed(controller: &Arc<ResourceController>, retries: &mut JoinSet<()>) {
    let snapshot = controller.snapshot();
    let failed = [
        (LaneKind::Users, snapshot.users.status),
        (LaneKind::Products, snapshot.products.status),
    ];
    for (lane, status) in failed {
        if status != LaneStatus::Failed {
            continue;
        }
        let controller = Arc::clone(controller);
        retries.spawn(async move {
            let _ = controller.retry(lane).await;
        });
    }
}

fn print_snapshot(snapshot: &ControllerSnapshot) {
    if let Some(banner) = &snapshot.banner {
        println!("[ok] {}", banner.message);
    }
    print_lane("Registered users", &snapshot.users);
    print_lane("Available products", &snapshot.products);
    println!();
}

fn print_lane<R: Resource>(title: &str, lane: &LaneState<R>) {
    println!("{title}");
    if lane.loading {
        println!("  loading...");
    }
    if let Some(error) = &lane.error {
        println!("  error: {error}");
    }
    for line in lane.display_lines() {
        println!("  {line}");
    }
}
