//! `dyetrack orders` and `dyetrack batch`: the order store side.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Subcommand;

use dyetrack_io::SqliteStore;
use dyetrack_recon::model::{BatchEvent, BatchEventKind};
use dyetrack_recon::store::OrderStore;

use crate::CliError;

#[derive(Subcommand)]
pub enum OrdersCommands {
    /// Load clients and orders from a JSON seed file
    #[command(after_help = "\
Seed format:
  {\"clients\": [{\"id\": \"c1\", \"name\": \"Acme Textiles\"}],
   \"orders\":  [{\"id\": \"o1\", \"customer_id\": \"c1\", \"reference\": \"ORD-7\",
                \"fabric\": \"Cotton Jersey\", \"quantity\": 500,
                \"batches\": [{\"color\": \"Red\", \"dyehouse\": \"North\"}]}]}

Loading is an upsert: orders are matched by id, planned colors are added once.")]
    Load {
        seed: PathBuf,

        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,
    },

    /// List stored orders
    List {
        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum BatchCommands {
    /// List committed color batches of an order
    List {
        /// Order path, e.g. customers/c1/orders/o1
        order_path: String,

        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Record a delivery or return against a batch
    #[command(after_help = "\
Examples:
  dyetrack batch event 12 --kind delivery --quantity 48.5 --date 2025-02-03 --db orders.db
  dyetrack batch event 12 --kind return --quantity 2 --date 2025-02-10 --db orders.db")]
    Event {
        batch_id: i64,

        /// delivery | return
        #[arg(long)]
        kind: BatchEventKind,

        #[arg(long)]
        quantity: f64,

        #[arg(long)]
        date: String,

        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,
    },
}

pub fn cmd_orders(cmd: OrdersCommands) -> Result<(), CliError> {
    match cmd {
        OrdersCommands::Load { seed, db } => {
            let text = std::fs::read_to_string(&seed)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", seed.display())))?;
            let mut store = SqliteStore::open(&db)?;
            let (clients, orders) = store.load_seed(&text)?;
            eprintln!("loaded {clients} clients, {orders} orders into {}", db.display());
            Ok(())
        }
        OrdersCommands::List { db, json } => {
            let store = SqliteStore::open(&db)?;
            let orders = store.load_orders()?;

            if json {
                let text = serde_json::to_string_pretty(&orders)
                    .map_err(|e| CliError::args(format!("JSON serialization error: {e}")))?;
                println!("{text}");
                return Ok(());
            }

            let clients: HashMap<String, String> = store
                .load_clients()?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect();
            for o in &orders {
                let colors: Vec<&str> = o.batches.iter().map(|b| b.color.as_str()).collect();
                println!(
                    "{:<10} {:<20} {:<20} {:>8.2}  {:<30} {}",
                    o.display_ref(),
                    clients.get(&o.customer_id).map(String::as_str).unwrap_or(&o.customer_id),
                    o.fabric,
                    o.quantity,
                    colors.join(", "),
                    o.path,
                );
            }
            eprintln!("{} orders", orders.len());
            Ok(())
        }
    }
}

pub fn cmd_batch(cmd: BatchCommands) -> Result<(), CliError> {
    match cmd {
        BatchCommands::List { order_path, db, json } => {
            let store = SqliteStore::open(&db)?;
            let batches = store.batches(&order_path)?;

            if json {
                let text = serde_json::to_string_pretty(&batches)
                    .map_err(|e| CliError::args(format!("JSON serialization error: {e}")))?;
                println!("{text}");
                return Ok(());
            }

            for b in &batches {
                let delivered: f64 = b
                    .events
                    .iter()
                    .map(|e| match e.kind {
                        BatchEventKind::Delivery => e.quantity,
                        BatchEventKind::Return => -e.quantity,
                    })
                    .sum();
                println!(
                    "{:>5}  {:<10} {:<12} {:>9.2} sent {:>9.2} delivered  {}",
                    b.id, b.entry.dispatch_number, b.entry.color, b.entry.quantity_sent, delivered, b.entry.status,
                );
            }
            Ok(())
        }
        BatchCommands::Event { batch_id, kind, quantity, date, db } => {
            if !(quantity.is_finite() && quantity > 0.0) {
                return Err(CliError::args(format!("quantity must be positive, got {quantity}")));
            }
            let store = SqliteStore::open(&db)?;
            let event = BatchEvent { kind, quantity, date };
            let id = store.append_event(batch_id, &event)?;
            tracing::info!(batch = batch_id, event = id, kind = %kind, "batch event recorded");
            eprintln!("recorded {kind} of {quantity} kg on batch {batch_id}");
            Ok(())
        }
    }
}
