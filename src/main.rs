//! W3LF - Warcraft III launcher for Eurobattle.Net
//!
//! Keeps the game's gateway list in line with the Eurobattle.Net gateways and
//! starts war3.exe through the loader helper.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use w3lf::config::LauncherConfig;
use w3lf::gateways::GatewayList;
use w3lf::injector::HelperInjector;
use w3lf::launcher::{sync_store, LaunchPaths, ProcessLauncher};
use w3lf::logging::{init_logger, log_error, log_info};
use w3lf::options::{StartOption, StartOptions};
use w3lf::registry::{GatewayStore, WineRegistryStore};

#[derive(Parser)]
#[command(name = "w3lf")]
#[command(about = "Warcraft III launcher for Eurobattle.Net", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synchronize gateways and start the game
    Launch(LaunchArgs),
    /// Print the gateway list stored in the Wine registry
    Gateways,
    /// Synchronize gateways without starting the game
    Sync(SyncArgs),
    /// Show or update launcher settings
    Config(ConfigArgs),
}

#[derive(Args)]
struct LaunchArgs {
    /// Windowed mode
    #[arg(long)]
    window: bool,
    /// OpenGL renderer
    #[arg(long)]
    opengl: bool,
    /// Software transform and lighting
    #[arg(long)]
    swtnl: bool,
    /// Classic (Reign of Chaos) mode
    #[arg(long)]
    classic: bool,
    /// Select the GProxy gateway
    #[arg(long)]
    proxy: bool,
}

impl LaunchArgs {
    fn options(&self) -> StartOptions {
        [
            (self.window, StartOption::Window),
            (self.opengl, StartOption::OpenGl),
            (self.swtnl, StartOption::Swtnl),
            (self.classic, StartOption::Classic),
        ]
        .into_iter()
        .filter_map(|(set, opt)| set.then_some(opt))
        .collect()
    }
}

#[derive(Args)]
struct SyncArgs {
    /// Select the GProxy gateway
    #[arg(long)]
    proxy: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    install_path: Option<PathBuf>,
    #[arg(long)]
    wine_prefix: Option<PathBuf>,
    #[arg(long)]
    injector: Option<PathBuf>,
    #[arg(long)]
    prefer_proxy: Option<bool>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger();
    log_info("W3LF starting up...");

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    let config = LauncherConfig::load();
    match command {
        Command::Launch(args) => launch(&config, &args),
        Command::Gateways => print_gateways(&config),
        Command::Sync(args) => {
            let mut store = WineRegistryStore::new(config.wine_prefix());
            let synced = sync_store(&mut store, &config.gateways, args.proxy || config.prefer_proxy)?;
            println!(
                "Gateway list synchronized: {} gateways, default #{}",
                synced.list.len(),
                synced.selected_index
            );
            Ok(())
        }
        Command::Config(args) => update_config(config, args),
    }
}

fn launch(config: &LauncherConfig, args: &LaunchArgs) -> Result<(), Box<dyn Error>> {
    let install_dir = config
        .resolve_install_path()
        .ok_or("Warcraft III install path is not configured (use `w3lf config --install-path`)")?;
    // The loader and support library are picked up from where w3lf is started
    let paths = LaunchPaths::from_current_dir(install_dir)?;
    let prefix = config.wine_prefix();

    let store = WineRegistryStore::new(&prefix);
    let injector = HelperInjector::new(config.injector_path(&paths.working_dir)).with_wine_prefix(&prefix);

    let mut launcher = ProcessLauncher::new(paths, config.gateways.clone(), store, injector);
    let options = config.start_options.union(args.options());
    let success = launcher.launch(options, args.proxy || config.prefer_proxy)?;

    if let Some(message) = success.message {
        println!("{}", message);
    }
    Ok(())
}

fn print_gateways(config: &LauncherConfig) -> Result<(), Box<dyn Error>> {
    let store = WineRegistryStore::new(config.wine_prefix());
    let list = GatewayList::from_slots(store.read_gateways()?)?;
    let selected = list.selected_index();

    println!("{}", store.describe());
    for (index, entry) in list.entries().iter().enumerate() {
        let mark = if selected == Some(index) { '*' } else { ' ' };
        println!("{} {:2}  {}", mark, index, entry);
    }
    Ok(())
}

fn update_config(mut config: LauncherConfig, args: ConfigArgs) -> Result<(), Box<dyn Error>> {
    let mut changed = false;
    if let Some(path) = args.install_path {
        config.install_path = Some(path);
        changed = true;
    }
    if let Some(prefix) = args.wine_prefix {
        config.wine_prefix = Some(prefix);
        changed = true;
    }
    if let Some(injector) = args.injector {
        config.injector_path = Some(injector);
        changed = true;
    }
    if let Some(prefer_proxy) = args.prefer_proxy {
        config.prefer_proxy = prefer_proxy;
        changed = true;
    }

    if changed {
        config.save()?;
        log_info("Config saved");
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
