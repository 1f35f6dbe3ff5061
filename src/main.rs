use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use payment_commons::application::lock::{AsyncExclusiveLock, LockState};
use payment_commons::config::KeyspaceSettings;
use payment_commons::documents::events::TransactionEvent;
use payment_commons::documents::gateway::{
    GatewayActivationData, GatewayAuthorizationRequestedData,
};
use payment_commons::domain::ports::SharedAsyncBackend;
use payment_commons::domain::schema::{Polymorphic, SchemaVersion};
use payment_commons::infrastructure::in_memory::InMemoryBackend;
#[cfg(feature = "storage-rocksdb")]
use payment_commons::infrastructure::rocksdb::RocksDbBackend;
use payment_commons::interfaces::jsonl::payload_reader::PayloadReader;
use payment_commons::serialization::PolymorphicCodec;
use payment_commons::telemetry;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "PAYMENT_COMMONS_DB_PATH")]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a JSON-lines file and print `line,tag` for every payload
    Inspect {
        /// Input JSON-lines file
        input: PathBuf,

        #[arg(long, value_enum)]
        family: Family,

        /// Schema version the payloads were written with
        #[arg(long, default_value = "v2")]
        schema: SchemaVersion,
    },
    /// Exclusive lock operations
    Lock {
        #[arg(
            long,
            env = "PAYMENT_COMMONS_LOCK_KEYSPACE",
            default_value = "exclusiveLocks"
        )]
        keyspace: String,

        #[command(subcommand)]
        action: LockAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    Event,
    Activation,
    AuthorizationRequested,
}

#[derive(Subcommand)]
enum LockAction {
    /// Try once to take the lock; prints `true` or `false`
    Acquire {
        resource: String,
        holder: String,
        #[arg(long, default_value_t = 30)]
        lease_secs: u64,
    },
    /// Release a lock owned by `holder`
    Release { resource: String, holder: String },
    /// Extend the lease of a lock owned by `holder`
    Renew {
        resource: String,
        holder: String,
        #[arg(long, default_value_t = 30)]
        lease_secs: u64,
    },
    /// Print `unlocked` or `locked,<holder>,<since>`
    Status { resource: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing();

    match cli.command {
        Command::Inspect {
            input,
            family,
            schema,
        } => match family {
            Family::Event => inspect::<TransactionEvent>(&input, schema),
            Family::Activation => inspect::<GatewayActivationData>(&input, schema),
            Family::AuthorizationRequested => {
                inspect::<GatewayAuthorizationRequestedData>(&input, schema)
            }
        },
        Command::Lock { keyspace, action } => {
            let backend = open_backend(cli.db_path)?;
            run_lock(backend, keyspace, action).await
        }
    }
}

fn open_backend(db_path: Option<PathBuf>) -> Result<SharedAsyncBackend> {
    #[cfg(feature = "storage-rocksdb")]
    {
        if let Some(path) = db_path {
            let backend = RocksDbBackend::open(path).into_diagnostic()?;
            return Ok(Arc::new(backend));
        }
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        if db_path.is_some() {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
    }

    Ok(Arc::new(InMemoryBackend::new()))
}

fn inspect<P: Polymorphic>(input: &Path, schema: SchemaVersion) -> Result<()> {
    let codec = PolymorphicCodec::<P>::new(schema);
    let file = File::open(input).into_diagnostic()?;
    let reader = PayloadReader::new(BufReader::new(file));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in reader.payloads() {
        let line = line.into_diagnostic()?;
        match codec.decode_with_descriptor(&line.bytes, schema) {
            Ok((descriptor, _)) => {
                writeln!(out, "{},{}", line.number, descriptor.tag).into_diagnostic()?;
            }
            Err(e) if e.is_recoverable() => {
                eprintln!("Skipping line {}: {}", line.number, e);
            }
            Err(e) => {
                eprintln!("Error decoding line {}: {}", line.number, e);
            }
        }
    }

    Ok(())
}

async fn run_lock(
    backend: SharedAsyncBackend,
    keyspace: String,
    action: LockAction,
) -> Result<()> {
    match action {
        LockAction::Acquire {
            resource,
            holder,
            lease_secs,
        } => {
            let settings = KeyspaceSettings::new(keyspace, Duration::from_secs(lease_secs))
                .into_diagnostic()?;
            let lock = AsyncExclusiveLock::new(backend, settings);
            let acquired = lock
                .acquire(&resource, &holder, Duration::from_secs(lease_secs))
                .await
                .into_diagnostic()?;
            println!("{acquired}");
        }
        LockAction::Release { resource, holder } => {
            let lock = lock_with_default_lease(backend, keyspace)?;
            lock.release(&resource, &holder).await.into_diagnostic()?;
            println!("released");
        }
        LockAction::Renew {
            resource,
            holder,
            lease_secs,
        } => {
            let settings = KeyspaceSettings::new(keyspace, Duration::from_secs(lease_secs))
                .into_diagnostic()?;
            let lock = AsyncExclusiveLock::new(backend, settings);
            lock.renew(&resource, &holder, Duration::from_secs(lease_secs))
                .await
                .into_diagnostic()?;
            println!("renewed");
        }
        LockAction::Status { resource } => {
            let lock = lock_with_default_lease(backend, keyspace)?;
            match lock.state(&resource).await.into_diagnostic()? {
                LockState::Unlocked => println!("unlocked"),
                LockState::Locked { holder, since } => println!("locked,{holder},{since}"),
            }
        }
    }

    Ok(())
}

fn lock_with_default_lease(
    backend: SharedAsyncBackend,
    keyspace: String,
) -> Result<AsyncExclusiveLock> {
    let settings = KeyspaceSettings::new(keyspace, Duration::from_secs(30)).into_diagnostic()?;
    Ok(AsyncExclusiveLock::new(backend, settings))
}
