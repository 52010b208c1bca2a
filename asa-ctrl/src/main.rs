use ansi_term::Colour::{Fixed, Green};
use asa_rcon_client::{
    CredentialResolver, Packet, PacketType, Timeouts, DEFAULT_GAME_USER_SETTINGS_PATH,
    DEFAULT_HOST, RCON_ENABLED_ENV, START_PARAMS_ENV,
};
use clap::{ArgGroup, Parser, Subcommand};
use log::{debug, error, LevelFilter};
use mods::{ModDatabase, ModsError};
use proc_exit::Code;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod exit_codes;
mod mods;

#[derive(Parser, Debug)]
#[clap(name = "asa-ctrl", author, version, about, long_about = None)]
struct Args {
    /// Log each step of the exchange with the server.
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute an RCON command on the server.
    Rcon(RconArgs),

    /// Manage server mods.
    Mods(ModsArgs),
}

#[derive(clap::Args, Debug)]
struct RconArgs {
    /// RCON command to execute, e.g. `saveworld`.
    #[clap(long, value_name = "COMMAND")]
    exec: String,

    /// Address of the server.
    #[clap(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server start parameters, searched for `ServerAdminPassword` and `RCONPort`.
    #[clap(long, value_name = "PARAMS", env = START_PARAMS_ENV, hide_env_values = true)]
    start_params: Option<String>,

    /// Forces RCON on or off regardless of the server configuration.
    #[clap(long, value_name = "BOOL", env = RCON_ENABLED_ENV)]
    rcon_enabled: Option<String>,

    /// Path of GameUserSettings.ini.
    #[clap(long, value_name = "PATH", default_value = DEFAULT_GAME_USER_SETTINGS_PATH)]
    settings: PathBuf,

    /// Seconds to wait for the connection to be established.
    #[clap(
        long,
        value_name = "SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    connect_timeout: u64,

    /// Seconds to wait for each reply from the server.
    #[clap(
        long,
        value_name = "SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,
}

#[derive(clap::Args, Debug)]
#[clap(group(ArgGroup::new("action").required(true).args(&["enable", "list", "params"])))]
struct ModsArgs {
    /// Enable a mod by its CurseForge project id.
    #[clap(long, value_name = "MOD_ID")]
    enable: Option<u64>,

    /// List all configured mods.
    #[clap(long)]
    list: bool,

    /// Print the `-mods=` start parameter for the enabled mods.
    #[clap(long)]
    params: bool,

    /// Path of the mod database.
    #[clap(long, value_name = "PATH", default_value = mods::DEFAULT_DATABASE_PATH)]
    database: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ! {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if let Err(print_err) = err.print() {
                eprintln!("Could not print usage: {}", print_err);
            }
            usage_code(&err).process_exit()
        }
    };

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Could not set up logging: {}", err);
    }

    let code = match args.command {
        Command::Rcon(args) => run_rcon(args).await,
        Command::Mods(args) => run_mods(args),
    };

    code.process_exit()
}

/// clap exits with 2 on bad usage, which is taken by [`exit_codes::CORRUPTED_MODS_DATABASE`].
fn usage_code(err: &clap::Error) -> Code {
    if err.use_stderr() {
        exit_codes::FAILURE
    } else {
        // --help and --version
        exit_codes::OK
    }
}

async fn run_rcon(args: RconArgs) -> Code {
    let resolver = CredentialResolver::new(args.start_params.clone(), &args.settings)
        .with_rcon_enabled(args.rcon_enabled.clone());

    let response = match exec_command(&args, &resolver).await {
        Ok(response) => response,
        Err(err) => return rcon_failure(err, &resolver),
    };

    if response.id == PacketType::RESPONSE_VALUE {
        println!("{}", response.body);
        exit_codes::OK
    } else {
        error!("RCON command execution failed: {:?}", response);
        exit_codes::RCON_COMMAND_EXECUTION_FAILED
    }
}

async fn exec_command(
    args: &RconArgs,
    resolver: &CredentialResolver,
) -> asa_rcon_client::Result<Packet> {
    if !resolver.resolve_rcon_enabled()? {
        return Err(asa_rcon_client::Error::RconDisabled);
    }

    let port = resolver.resolve_port()?;
    let password = resolver.resolve_password()?;
    let timeouts = Timeouts::new(
        Duration::from_secs(args.connect_timeout),
        Duration::from_secs(args.timeout),
    );

    asa_rcon_client::r#async::exec_command(
        (args.host.as_str(), port),
        &args.exec,
        &password,
        timeouts,
    )
    .await
}

fn rcon_failure(err: asa_rcon_client::Error, resolver: &CredentialResolver) -> Code {
    use asa_rcon_client::Error;

    match err {
        Error::PasswordNotFound => {
            error!(
                "Could not read RCON password. Make sure it is properly configured, either as start \
                 parameter ?ServerAdminPassword=mypass or in GameUserSettings.ini in the \
                 [ServerSettings] section as ServerAdminPassword=mypass"
            );
            exit_codes::RCON_PASSWORD_NOT_FOUND
        }
        Error::PortNotFound => {
            error!(
                "Could not read RCON port. Make sure it is properly configured, either as start \
                 parameter ?RCONPort=27020 or in GameUserSettings.ini in the [ServerSettings] \
                 section as RCONPort=27020"
            );
            exit_codes::RCON_PORT_NOT_FOUND
        }
        Error::InvalidPort(value) => {
            error!(
                "Configured RCON port `{}` is not a valid port number. Set it to a value such as \
                 RCONPort=27020",
                value
            );
            exit_codes::RCON_PORT_NOT_FOUND
        }
        Error::AuthenticationFailed => {
            error!(
                "Could not execute this RCON command. Authentication failed (wrong server \
                 password)."
            );
            exit_codes::RCON_PASSWORD_WRONG
        }
        Error::RconDisabled => {
            error!(
                "RCON is disabled. Enable it with the start parameter ?RCONEnabled=True or in \
                 GameUserSettings.ini in the [ServerSettings] section as RCONEnabled=True"
            );
            exit_codes::RCON_DISABLED
        }
        Error::Timeout(after) => {
            error!(
                "No answer from the server after {:?}. Make sure it is running and RCON is enabled.",
                after
            );
            exit_codes::RCON_TIMEOUT
        }
        Error::Settings(err) => {
            error!("Could not read {}: {}", resolver.settings_path().display(), err);
            exit_codes::RCON_COMMAND_EXECUTION_FAILED
        }
        err => {
            error!("Connection failed: {}", err);
            exit_codes::RCON_COMMAND_EXECUTION_FAILED
        }
    }
}

fn run_mods(args: ModsArgs) -> Code {
    if args.params {
        print_mod_params(&args.database);
        return exit_codes::OK;
    }

    let mut database = match ModDatabase::open(&args.database) {
        Ok(database) => database,
        Err(ModsError::Corrupted { .. }) => {
            error!(
                "mods.json file is corrupted and cannot be parsed. Please delete this file manually. \
                 It can be found in the server files root directory."
            );
            return exit_codes::CORRUPTED_MODS_DATABASE;
        }
        Err(err) => {
            error!("Could not open {}: {}", args.database.display(), err);
            return exit_codes::FAILURE;
        }
    };

    if let Some(mod_id) = args.enable {
        if let Some(record) = database.lookup(mod_id) {
            debug!("Found mod {} ({}) in {}", mod_id, record.name, database.path().display());
        }

        return match database.enable(mod_id) {
            Ok(()) => {
                println!(
                    "Enabled mod id '{}' successfully. The server will download the mod upon startup.",
                    mod_id
                );
                exit_codes::OK
            }
            Err(ModsError::AlreadyEnabled(_)) => {
                error!(
                    "This mod is already enabled! Use 'asa-ctrl mods --list' to see what mods are \
                     currently enabled."
                );
                exit_codes::MOD_ALREADY_ENABLED
            }
            Err(err) => {
                error!("Failed to enable mod: {}", err);
                exit_codes::FAILURE
            }
        };
    }

    if database.records().is_empty() {
        println!("No mods configured.");
        return exit_codes::OK;
    }

    println!("Configured mods:");
    for record in database.records() {
        let status = if record.enabled {
            Green.paint("enabled")
        } else {
            Fixed(8).paint("disabled")
        };
        println!("  - {} ({}) [{}]", record.mod_id, record.name, status);
    }

    exit_codes::OK
}

/// Prints the `-mods=` start parameter. Never fails, as it runs as part of server startup; read
/// errors are left in a file instead.
fn print_mod_params(path: &Path) {
    let mut stdout = std::io::stdout().lock();
    write_mod_params(path, mods::MOD_READ_ERROR_PATH, &mut stdout);
}

fn write_mod_params(path: &Path, error_path: &str, out: &mut impl Write) {
    match ModDatabase::load_existing(path) {
        Ok(Some(database)) => {
            if let Some(param) = database.start_param() {
                if let Err(err) = write!(out, "{}", param) {
                    error!("Could not write mod parameters: {}", err);
                }
            }
        }
        Ok(None) => {}
        Err(err) => {
            if let Err(write_err) = std::fs::write(error_path, err.to_string()) {
                error!("Could not write {}: {}", error_path, write_err);
            }
        }
    }

    if let Err(err) = out.flush() {
        error!("Could not flush stdout: {}", err);
    }
}
