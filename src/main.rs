mod backends;
mod config;
mod config_persistence;
mod integration_keyring;
mod match_resolver;
mod metadata_client;
mod protocol;
mod rate_limiter;
mod reference_cache;
mod sheet_sync;
mod sync_runtime;
#[cfg(test)]
mod test_support;

use std::io::BufRead;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use backends::google_sheets::GoogleSheetsStore;
use backends::igdb::IgdbApi;
use backends::{twitch, DocumentStore, MetadataService};
use config::Config;
use integration_keyring::CredentialKind;
use protocol::{Message, SyncMessage};
use rate_limiter::RequestThrottle;
use sync_runtime::{spawn_sync_worker, MetadataConnector, SyncRuntime};

const GOOGLE_TOKEN_ENV: &str = "GAME_LOOKUP_GOOGLE_TOKEN";
const USAGE: &str = "usage: game_lookup [--debug] (--list | --doc <ID> [--open] | --set-client-id <ID> | --save-credential <twitch|google> | --delete-credential <twitch|google>)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    List,
    Sync { doc_id: String, open: bool },
    SetClientId(String),
    SaveCredential(CredentialKind),
    DeleteCredential(CredentialKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    debug: bool,
    command: CliCommand,
}

fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut debug = false;
    let mut open = false;
    let mut list = false;
    let mut doc_id = None;
    let mut client_id = None;
    let mut commands = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" | "--debug" => debug = true,
            "--open" => open = true,
            "--list" => list = true,
            "--doc" => {
                doc_id = Some(args.next().ok_or("--doc requires a document id")?);
            }
            "--set-client-id" => {
                let id = args.next().ok_or("--set-client-id requires a client id")?;
                if id.trim().is_empty() {
                    return Err("--set-client-id requires a non-empty client id".to_string());
                }
                client_id = Some(id);
            }
            "--save-credential" => {
                let kind = parse_credential_kind(&arg, args.next())?;
                commands.push(CliCommand::SaveCredential(kind));
            }
            "--delete-credential" => {
                let kind = parse_credential_kind(&arg, args.next())?;
                commands.push(CliCommand::DeleteCredential(kind));
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    if list {
        commands.push(CliCommand::List);
    }
    if let Some(doc_id) = doc_id {
        commands.push(CliCommand::Sync { doc_id, open });
    }
    if let Some(client_id) = client_id {
        commands.push(CliCommand::SetClientId(client_id));
    }
    let mut commands = commands.into_iter();
    match (commands.next(), commands.next()) {
        (Some(command), None) => Ok(CliArgs { debug, command }),
        _ => Err(
            "expected exactly one of --list, --doc, --set-client-id, --save-credential or --delete-credential"
                .to_string(),
        ),
    }
}

fn parse_credential_kind(flag: &str, value: Option<String>) -> Result<CredentialKind, String> {
    let kind = value.ok_or_else(|| format!("{flag} requires twitch or google"))?;
    CredentialKind::parse(&kind).ok_or_else(|| format!("unknown credential kind: {kind}"))
}

fn google_access_token() -> Result<String, String> {
    if let Some(token) = std::env::var_os(GOOGLE_TOKEN_ENV) {
        debug!("Using Google token from {GOOGLE_TOKEN_ENV}");
        return Ok(token.to_string_lossy().trim().to_string());
    }
    integration_keyring::get_credential(CredentialKind::GoogleAccessToken)?.ok_or_else(|| {
        format!("no Google access token stored; run --save-credential google or set {GOOGLE_TOKEN_ENV}")
    })
}

fn document_store(config: &Config) -> Result<GoogleSheetsStore, String> {
    Ok(GoogleSheetsStore::new(
        &config.sheets.sheets_api_base_url,
        &config.sheets.drive_api_base_url,
        &google_access_token()?,
    ))
}

fn igdb_api(config: &Config) -> Result<IgdbApi, String> {
    if config.igdb.client_id.is_empty() {
        return Err("igdb.client_id is not set in the config file".to_string());
    }
    let client_secret = integration_keyring::get_credential(CredentialKind::TwitchClientSecret)?
        .ok_or("no Twitch client secret stored; run --save-credential twitch")?;
    let access_token = twitch::fetch_app_access_token(
        &config.twitch.token_url,
        &config.igdb.client_id,
        &client_secret,
    )?;
    Ok(IgdbApi::new(
        &config.igdb.api_base_url,
        &config.igdb.client_id,
        &access_token,
    ))
}

fn metadata_connector(config: &Config) -> MetadataConnector {
    let config = config.clone();
    Box::new(move || {
        let api = igdb_api(&config)?;
        Ok(Arc::new(api) as Arc<dyn MetadataService>)
    })
}

fn set_client_id(client_id: &str) -> Result<(), String> {
    let path = config_persistence::default_config_path()
        .ok_or("no config directory available to store the client id")?;
    let config = config_persistence::update_config_file(&path, |config| {
        config.igdb.client_id = client_id.to_string();
    });
    info!("IGDB client id set to {}", config.igdb.client_id);
    Ok(())
}

fn delete_credential(kind: CredentialKind) -> Result<(), String> {
    integration_keyring::delete_credential(kind)?;
    info!("Removed {kind:?} from the system keyring");
    Ok(())
}

fn save_credential(kind: CredentialKind) -> Result<(), String> {
    println!("Enter secret for {kind:?}:");
    let mut secret = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut secret)
        .map_err(|err| format!("failed to read secret: {err}"))?;
    let secret = secret.trim();
    if secret.is_empty() {
        return Err("empty secret, nothing saved".to_string());
    }
    integration_keyring::set_credential(kind, secret)?;
    info!("Saved {kind:?} to the system keyring");
    Ok(())
}

fn list_documents(config: &Config) -> Result<(), String> {
    let store = document_store(config)?;
    for spreadsheet in store.list_spreadsheets()? {
        println!("{}\t{}", spreadsheet.id, spreadsheet.name);
    }
    Ok(())
}

fn run_sync(config: &Config, doc_id: String, open: bool) -> Result<(), String> {
    let store = document_store(config)?;

    let (bus_sender, _) = broadcast::channel(1024);
    let mut observer = bus_sender.subscribe();
    let runtime = SyncRuntime::new(
        bus_sender,
        metadata_connector(config),
        Arc::new(store),
        Arc::new(RequestThrottle::new(config.igdb.request_interval())),
        config.igdb.search_options(),
        &config.sheets.range,
    );
    let worker = spawn_sync_worker(runtime, doc_id.clone())
        .map_err(|err| format!("failed to start sync worker: {err}"))?;

    loop {
        match observer.blocking_recv() {
            Ok(Message::Sync(SyncMessage::Started { rows, .. })) => {
                info!("Processing {rows} rows");
            }
            Ok(Message::Sync(SyncMessage::RowEnriched {
                row_index, title, ..
            })) => debug!("Row {row_index} ({title}) enriched"),
            Ok(Message::Sync(SyncMessage::Completed { .. }))
            | Ok(Message::Sync(SyncMessage::Failed { .. }))
            | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} progress messages"),
        }
    }

    let result = worker
        .join()
        .map_err(|_| "sync worker panicked".to_string())?;
    match result {
        Ok(_) => {
            info!("Sheet updated. All done.");
            if open {
                let url = format!("https://docs.google.com/spreadsheets/d/{doc_id}");
                if let Err(err) = webbrowser::open(&url) {
                    warn!("Failed to open {url}: {err}");
                }
            }
            Ok(())
        }
        Err(run_error) => Err(format!("{:?} failure: {}", run_error.kind, run_error.error)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config = match config_persistence::default_config_path() {
        Some(path) => config_persistence::load_config_file(&path),
        None => {
            warn!("No config directory available. Using default config");
            Config::default()
        }
    };

    let outcome = match args.command {
        CliCommand::List => list_documents(&config),
        CliCommand::Sync { doc_id, open } => run_sync(&config, doc_id, open),
        CliCommand::SetClientId(client_id) => set_client_id(&client_id),
        CliCommand::SaveCredential(kind) => save_credential(kind),
        CliCommand::DeleteCredential(kind) => delete_credential(kind),
    };
    if let Err(err) = &outcome {
        error!("{err}");
    }
    outcome.map_err(Into::into)
}
