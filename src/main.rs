use std::{io, path::PathBuf, process::ExitCode};

use nm_bridge::{config::Config, dispatch::Dispatcher, host::run_stdio};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

#[cfg(feature = "install")]
use nm_bridge::install::{self, Browser, Scope};

const LOG_ENV: &str = "NM_BRIDGE_LOG";

#[cfg(feature = "install")]
const DEFAULT_HOST_NAME: &str = "com.nm_bridge.host";
#[cfg(feature = "install")]
const DESCRIPTION: &str = "Native messaging bridge host";

const HELP: &str = "\
nm-bridge-host: native messaging bridge for a browser extension

USAGE:
  nm-bridge-host [OPTIONS]                 serve frames on stdin/stdout
  nm-bridge-host install --exe PATH [--origin O]... [--extension E]... [--browser B]... [--name N] [--system]
  nm-bridge-host remove  [--browser B]... [--name N] [--system]
  nm-bridge-host verify  [--browser B]... [--name N] [--system]

OPTIONS:
  --config PATH    config file (default $NM_BRIDGE_CONFIG or ~/.config/nm-bridge/config.toml)
  -v, --verbose    debug logging on stderr (otherwise $NM_BRIDGE_LOG, default warn)
  -h, --help       print this help

Browsers: chrome, chromium, edge, brave, firefox (default: all).
";

enum Command {
    /// Launched by the browser. It may pass the caller's origin (and on
    /// Firefox the manifest path) as positional arguments.
    Serve { caller: Vec<String> },
    #[cfg(feature = "install")]
    Install {
        target: Target,
        exe: PathBuf,
        origins: Vec<String>,
        extensions: Vec<String>,
    },
    #[cfg(feature = "install")]
    Remove(Target),
    #[cfg(feature = "install")]
    Verify(Target),
}

#[cfg(feature = "install")]
struct Target {
    name: String,
    browsers: Vec<Browser>,
    scope: Scope,
}

struct AppArgs {
    verbose: bool,
    config: Option<PathBuf>,
    command: Command,
}

#[cfg(feature = "install")]
fn parse_target(pargs: &mut pico_args::Arguments) -> Result<Target, pico_args::Error> {
    let mut browsers: Vec<Browser> = pargs.values_from_str("--browser")?;
    if browsers.is_empty() {
        browsers = Browser::ALL.to_vec();
    }
    Ok(Target {
        name: pargs
            .opt_value_from_str("--name")?
            .unwrap_or_else(|| DEFAULT_HOST_NAME.to_string()),
        browsers,
        scope: if pargs.contains("--system") {
            Scope::System
        } else {
            Scope::User
        },
    })
}

/// `Ok(None)` means help was requested.
fn parse_args(mut pargs: pico_args::Arguments) -> Result<Option<AppArgs>, pico_args::Error> {
    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let verbose = pargs.contains(["-v", "--verbose"]);
    let config = pargs.opt_value_from_str("--config")?;

    let command = match pargs.subcommand()?.as_deref() {
        #[cfg(feature = "install")]
        Some("install") => {
            let exe = pargs.value_from_str("--exe")?;
            let origins = pargs.values_from_str("--origin")?;
            let extensions = pargs.values_from_str("--extension")?;
            Command::Install {
                target: parse_target(&mut pargs)?,
                exe,
                origins,
                extensions,
            }
        }
        #[cfg(feature = "install")]
        Some("remove") => Command::Remove(parse_target(&mut pargs)?),
        #[cfg(feature = "install")]
        Some("verify") => Command::Verify(parse_target(&mut pargs)?),
        first => {
            let mut caller: Vec<String> = first.map(str::to_string).into_iter().collect();
            caller.extend(
                pargs
                    .finish()
                    .into_iter()
                    .map(|a| a.to_string_lossy().into_owned()),
            );
            return Ok(Some(AppArgs {
                verbose,
                config,
                command: Command::Serve { caller },
            }));
        }
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(pico_args::Error::ArgumentParsingFailed {
            cause: format!("unexpected arguments: {remaining:?}"),
        });
    }

    Ok(Some(AppArgs {
        verbose,
        config,
        command,
    }))
}

fn log_subscriber<W>(verbose: bool, writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Browsers copy stderr into their own logs verbatim: no colour codes.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .finish()
}

/// All log output goes to stderr: stdout carries frames.
fn init_logging(verbose: bool) {
    if let Err(e) = tracing::subscriber::set_global_default(log_subscriber(verbose, io::stderr)) {
        eprintln!("cannot initialise logging: {e}");
    }
}

#[cfg(feature = "install")]
fn finish(result: Result<(), nm_bridge::error::InstallError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "install command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "install")]
fn verify(target: Target) -> ExitCode {
    let browsers = Some(target.browsers.as_slice());
    match install::verify_installed(&target.name, browsers, target.scope) {
        Ok(true) => {
            println!("{}: installed", target.name);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("{}: not installed", target.name);
            ExitCode::FAILURE
        }
        Err(e) => finish(Err(e)),
    }
}

fn serve(config_path: Option<PathBuf>, caller: Vec<String>) -> ExitCode {
    let config = match Config::resolve(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "cannot load configuration");
            return ExitCode::FAILURE;
        }
    };
    if !caller.is_empty() {
        info!(?caller, "launched by browser");
    }
    info!(port = config.port, "serving on stdio");
    let outcome = run_stdio(Dispatcher::from_config(config));
    if !outcome.is_clean() {
        warn!("session ended with a framing error");
    }
    ExitCode::from(outcome.exit_code())
}

fn main() -> ExitCode {
    let args = match parse_args(pico_args::Arguments::from_env()) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print!("{HELP}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            return ExitCode::from(2);
        }
    };
    init_logging(args.verbose);

    match args.command {
        Command::Serve { caller } => serve(args.config, caller),
        #[cfg(feature = "install")]
        Command::Install {
            target,
            exe,
            origins,
            extensions,
        } => finish(install::install(
            &target.name,
            DESCRIPTION,
            &exe,
            &origins,
            &extensions,
            &target.browsers,
            target.scope,
        )),
        #[cfg(feature = "install")]
        Command::Remove(target) => finish(install::remove(
            &target.name,
            &target.browsers,
            target.scope,
        )),
        #[cfg(feature = "install")]
        Command::Verify(target) => verify(target),
    }
}
