//! steambind command line.
//!
//! Talks to a running Steam client through the flat API, mostly to check that
//! the library, the app id and the dispatch loop work on a given machine.
//!
//! ```text
//! steambind info --json
//! steambind lobbies --max 10
//! steambind create-lobby --kind friends-only --max-members 4
//! steambind achievement set ACH_WIN_ONE_GAME
//! steambind file write save.dat --input ./save.dat
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use steambind::config::BindingConfig;
use steambind::capabilities::{LobbyType, SteamUserStats, UserStatsReceived};
use steambind::sys::{AppId, CallbackPayload};
use steambind::{Client, ClientError};
use steambind_utils::{Stopwatch, init_logging};

#[derive(Parser)]
#[command(name = "steambind")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Steamworks flat API from the command line", long_about = None)]
struct Cli {
    #[command(flatten)]
    binding: BindingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BindingArgs {
    /// TOML configuration file (requires the `toml-config` feature)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Steam API library to load
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Callback shim library exporting `SetCallbackDispatcher`
    #[arg(long, global = true)]
    shim: Option<PathBuf>,

    /// App id to check with `SteamAPI_RestartAppIfNecessary`
    #[arg(long, global = true)]
    app_id: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current user, language and environment
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search for lobbies and list their ids
    Lobbies {
        /// Most lobbies to print
        #[arg(long, default_value_t = 20)]
        max: usize,
    },

    /// Create a lobby and print its id
    CreateLobby {
        /// private, friends-only, public, invisible or private-unique
        #[arg(long, default_value = "public")]
        kind: LobbyType,

        #[arg(long, default_value_t = 4)]
        max_members: i32,
    },

    /// Read or change an achievement
    #[command(subcommand)]
    Achievement(AchievementCommand),

    /// Steam Cloud files
    #[command(subcommand)]
    File(FileCommand),
}

#[derive(Subcommand)]
enum AchievementCommand {
    Get { name: String },
    Set { name: String },
    Clear { name: String },
}

#[derive(Subcommand)]
enum FileCommand {
    /// Print a file, or save it with --output
    Read {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a local file, or stdin when --input is missing
    Write {
        name: String,
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    Delete { name: String },
    Size { name: String },
}

#[derive(Serialize)]
struct Info {
    steam_id: u64,
    language: String,
    install_dir: Option<String>,
    steam_deck: bool,
    controllers: usize,
}

fn main() {
    init_logging();

    if let Err(err) = run(Cli::parse()) {
        if let Some(ClientError::Relaunching(app_id)) = err.downcast_ref::<ClientError>() {
            eprintln!("steam is relaunching app {app_id} through the client");
            return;
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.binding)?;
    let client = Client::init(config)?;
    if let Err(err) = client.utils().and_then(|utils| utils.set_warning_message_hook()) {
        tracing::warn!(error = %err, "warning message hook not installed");
    }

    match cli.command {
        Commands::Info { json } => info(&client, json),
        Commands::Lobbies { max } => lobbies(&client, max),
        Commands::CreateLobby { kind, max_members } => {
            let created = client.matchmaking()?.create_lobby(kind, max_members)?;
            if !created.result().is_ok() {
                bail!("lobby creation failed: {}", created.result());
            }
            println!("{}", created.lobby());
            Ok(())
        }
        Commands::Achievement(command) => achievement(&client, command),
        Commands::File(command) => file(&client, command),
    }?;

    client.shutdown().context("failed to shut down the steam api")
}

fn load_config(args: &BindingArgs) -> Result<BindingConfig> {
    let mut config = BindingConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(library) = &args.library {
        config.library.path = Some(library.clone());
    }
    if let Some(shim) = &args.shim {
        config.library.shim_path = Some(shim.clone());
    }
    if args.app_id.is_some() {
        config.app_id = args.app_id;
    }
    Ok(config)
}

fn info(client: &Client, json: bool) -> Result<()> {
    let apps = client.apps()?;
    let install_dir = match client.config().app_id {
        Some(app_id) => apps.app_install_dir(AppId(app_id))?,
        None => None,
    };
    let info = Info {
        steam_id: client.user()?.steam_id()?.0,
        language: apps.current_game_language()?,
        install_dir,
        steam_deck: client.utils()?.is_running_on_steam_deck()?,
        controllers: client.input()?.connected_controllers()?.len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("steam id:    {}", info.steam_id);
    println!("language:    {}", info.language);
    if let Some(dir) = &info.install_dir {
        println!("install dir: {dir}");
    }
    println!("steam deck:  {}", info.steam_deck);
    println!("controllers: {}", info.controllers);
    Ok(())
}

fn lobbies(client: &Client, max: usize) -> Result<()> {
    let matchmaking = client.matchmaking()?;
    let list = matchmaking
        .request_lobby_list()
        .context("lobby search failed")?;
    let count = (list.lobbies_matching as usize).min(max);
    println!("{} lobbies found", list.lobbies_matching);
    for index in 0..count {
        let index = i32::try_from(index)?;
        println!("{}", matchmaking.lobby_by_index(index)?);
    }
    Ok(())
}

fn achievement(client: &Client, command: AchievementCommand) -> Result<()> {
    let stats = client.user_stats()?;
    wait_for_stats(client, &stats)?;

    match command {
        AchievementCommand::Get { name } => match stats.achievement(&name)? {
            Some(achieved) => println!("{name}: {}", if achieved { "unlocked" } else { "locked" }),
            None => bail!("unknown achievement '{name}'"),
        },
        AchievementCommand::Set { name } => {
            if !stats.set_achievement(&name)? {
                bail!("could not unlock '{name}'");
            }
            stats.store_stats()?;
        }
        AchievementCommand::Clear { name } => {
            if !stats.clear_achievement(&name)? {
                bail!("could not clear '{name}'");
            }
            stats.store_stats()?;
        }
    }
    Ok(())
}

/// Request the user's stats and poll until they arrive.
fn wait_for_stats(client: &Client, stats: &SteamUserStats) -> Result<()> {
    if !stats.request_current_stats()? {
        bail!("no user is logged on");
    }

    let watch = Stopwatch::start_new();
    let timeout = client.config().dispatch.call_timeout();
    loop {
        if let Some(payload) = client.dispatch().await_callback(UserStatsReceived::CALLBACK_ID)? {
            let received = UserStatsReceived::read_from(&payload).context("stats callback is truncated")?;
            if !received.result().is_ok() {
                bail!("stats request failed: {}", received.result());
            }
            return Ok(());
        }
        if watch.exceeded(timeout) {
            bail!("stats did not arrive within {timeout:?}");
        }
        thread::sleep(client.config().dispatch.poll_interval());
    }
}

fn file(client: &Client, command: FileCommand) -> Result<()> {
    let storage = client.remote_storage()?;
    match command {
        FileCommand::Read { name, output } => {
            let data = storage.read_to_vec(&name)?;
            match output {
                Some(path) => fs::write(&path, &data)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => io::stdout().write_all(&data)?,
            }
        }
        FileCommand::Write { name, input } => {
            let data = match input {
                Some(path) => fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut data = Vec::new();
                    io::stdin().read_to_end(&mut data)?;
                    data
                }
            };
            if !storage.file_write(&name, &data)? {
                bail!("steam cloud rejected '{name}'");
            }
        }
        FileCommand::Delete { name } => {
            if !storage.file_delete(&name)? {
                bail!("'{name}' does not exist");
            }
        }
        FileCommand::Size { name } => println!("{}", storage.file_size(&name)?),
    }
    Ok(())
}
