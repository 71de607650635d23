use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Human,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "steamcheck-probe",
    version,
    about = "Runs the steamcheck aggregators against the live Steam endpoints"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormatArg::Human)]
    pub format: OutputFormatArg,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// One virtual page of store listings.
    Featured(FeaturedArgs),
    /// Every store listing page, deduplicated.
    All(AllArgs),
    /// Full record of one store item.
    App(AppArgs),
    Search(SearchArgs),
    /// Profile and owned library of a user.
    User(UserArgs),
    /// Library statistics of a user.
    Stats(UserArgs),
}

#[derive(Debug, Args)]
pub struct FeaturedArgs {
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Defaults to the configured page size.
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AllArgs {
    #[arg(long, default_value_t = 10)]
    pub max_pages: usize,
}

#[derive(Debug, Args)]
pub struct AppArgs {
    pub appid: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Args)]
pub struct UserArgs {
    /// 17-digit SteamID64.
    pub steamid: String,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

impl Cli {
    pub fn resolved_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            match self.format {
                OutputFormatArg::Human => OutputFormat::Human,
                OutputFormatArg::Json => OutputFormat::Json,
            }
        }
    }
}
