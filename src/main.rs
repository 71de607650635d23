mod cli;
mod output;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use steamcheck_core::library::validate_steam_id;
use steamcheck_core::{
    AppError, ClientConfig, GameSummary, GamesFeed, HttpClient, LibraryAggregator, LibraryStats,
    LoadOutcome, ProfileStatus, RemoteClient, SearchResolver, StoreAggregator, UserProfile,
    UserStatsLoader,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{AllArgs, AppArgs, Cli, Commands, FeaturedArgs, OutputFormat, SearchArgs, UserArgs};
use crate::output::{DataSource, build_pagination, print_error, print_success};

#[derive(Debug, Serialize)]
struct GamesData {
    items: Vec<GameSummary>,
}

#[derive(Debug, Serialize)]
struct AllGamesData {
    items: Vec<GameSummary>,
    featured: Vec<GameSummary>,
}

#[derive(Debug, Serialize)]
struct AppData {
    app: GameSummary,
}

#[derive(Debug, Serialize)]
struct UserData {
    status: ProfileStatus,
    profile: UserProfile,
}

#[derive(Debug, Serialize)]
struct StatsData {
    status: Option<ProfileStatus>,
    stats: Option<LibraryStats>,
}

/// Aggregators wired to one shared HTTP client.
struct Services {
    config: ClientConfig,
    store: StoreAggregator,
    search: SearchResolver,
    library: LibraryAggregator,
}

impl Services {
    fn from_env() -> Result<Self, AppError> {
        let config = ClientConfig::from_env()?;
        let client: Arc<dyn RemoteClient> = Arc::new(HttpClient::new(config.clone())?);
        let store = StoreAggregator::from_config(client.clone(), &config);
        Ok(Self {
            search: SearchResolver::new(client.clone(), store.clone()),
            library: LibraryAggregator::from_config(client, &config),
            store,
            config,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.resolved_format();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = run(cli, format, &cancel).await;
    if let Err(err) = result {
        print_error(format, err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, format: OutputFormat, cancel: &CancellationToken) -> Result<(), AppError> {
    let services = Services::from_env()?;

    match cli.command {
        Commands::Featured(args) => handle_featured(format, &services, args).await,
        Commands::All(args) => handle_all(format, &services, args, cancel).await,
        Commands::App(args) => handle_app(format, &services, args).await,
        Commands::Search(args) => handle_search(format, &services, args).await,
        Commands::User(args) => handle_user(format, &services, args).await,
        Commands::Stats(args) => handle_stats(format, &services, args, cancel).await,
    }
}

async fn handle_featured(
    format: OutputFormat,
    services: &Services,
    args: FeaturedArgs,
) -> Result<(), AppError> {
    if args.page == 0 {
        return Err(AppError::InvalidArgument("--page starts at 1".to_string()));
    }
    let page_size = args.page_size.unwrap_or(services.config.page_size);
    if page_size == 0 {
        return Err(AppError::InvalidArgument(
            "--page-size must be positive".to_string(),
        ));
    }

    let items = services.store.fetch_page(args.page, page_size).await;
    let pagination = build_pagination(args.page, page_size, items.len());

    print_success(
        format,
        GamesData { items },
        Some(pagination),
        DataSource::SteamStore,
        |d| print_games_human(&format!("store page {}", args.page), &d.items),
    );
    Ok(())
}

async fn handle_all(
    format: OutputFormat,
    services: &Services,
    args: AllArgs,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    let feed = GamesFeed::new(services.store.clone(), services.search.clone());
    let state = match feed.load_all_games(args.max_pages, cancel).await {
        LoadOutcome::Completed(state) => state,
        LoadOutcome::Cancelled => return Err(AppError::Cancelled),
        LoadOutcome::AlreadyInFlight => {
            return Err(AppError::Internal("load already in flight".to_string()));
        }
    };
    if let Some(message) = state.error {
        return Err(AppError::NotFound(message));
    }

    print_success(
        format,
        AllGamesData {
            items: state.games,
            featured: state.featured,
        },
        None,
        DataSource::SteamStore,
        |d| {
            print_games_human("featured", &d.featured);
            println!();
            print_games_human("all listings", &d.items);
        },
    );
    Ok(())
}

async fn handle_app(format: OutputFormat, services: &Services, args: AppArgs) -> Result<(), AppError> {
    let appid = args.appid.trim();
    if appid.is_empty() || !appid.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidIdentifier(format!(
            "'{appid}' is not a numeric app id"
        )));
    }

    let app = services
        .store
        .fetch_details(appid)
        .await
        .ok_or_else(|| AppError::NotFound(format!("app {appid} not found")))?;

    print_success(format, AppData { app }, None, DataSource::SteamStore, |d| {
        print_app_human(&d.app)
    });
    Ok(())
}

async fn handle_search(
    format: OutputFormat,
    services: &Services,
    args: SearchArgs,
) -> Result<(), AppError> {
    if args.query.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }

    let items = services.search.search(&args.query).await;

    print_success(
        format,
        GamesData { items },
        None,
        DataSource::SteamStore,
        |d| print_games_human(&format!("search '{}'", args.query.trim()), &d.items),
    );
    Ok(())
}

async fn handle_user(format: OutputFormat, services: &Services, args: UserArgs) -> Result<(), AppError> {
    let mut profile = services.library.fetch_user(&args.steamid).await?;
    profile
        .owned_games
        .sort_by(|a, b| b.total_playtime_minutes.cmp(&a.total_playtime_minutes));

    let data = UserData {
        status: profile.status(),
        profile,
    };

    print_success(format, data, None, DataSource::SteamWebapi, print_user_human);
    Ok(())
}

async fn handle_stats(
    format: OutputFormat,
    services: &Services,
    args: UserArgs,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    validate_steam_id(&args.steamid)?;

    let loader = UserStatsLoader::new(services.library.clone());
    let state = match loader.load(&args.steamid, cancel).await {
        LoadOutcome::Completed(state) => state,
        LoadOutcome::Cancelled => return Err(AppError::Cancelled),
        LoadOutcome::AlreadyInFlight => {
            return Err(AppError::Internal("load already in flight".to_string()));
        }
    };
    if let Some(message) = state.error {
        return Err(AppError::Internal(message));
    }

    let data = StatsData {
        status: state.status,
        stats: state.stats,
    };

    print_success(format, data, None, DataSource::SteamWebapi, print_stats_human);
    Ok(())
}

fn print_games_human(title: &str, games: &[GameSummary]) {
    println!("{} ({})", title, games.len());
    for game in games {
        let release = if game.release_date.is_empty() {
            "-"
        } else {
            game.release_date.as_str()
        };
        if game.discount_percent > 0 {
            println!(
                "{}\t{}\t{:.2} (-{}%)\t{}",
                game.id, game.name, game.price, game.discount_percent, release
            );
        } else {
            println!("{}\t{}\t{:.2}\t{}", game.id, game.name, game.price, release);
        }
    }
}

fn print_app_human(app: &GameSummary) {
    println!("{} ({})", app.name, app.id);
    println!("price: {:.2} ({}% off)", app.price, app.discount_percent);
    if !app.release_date.is_empty() {
        println!("released: {}", app.release_date);
    }
    println!("developers: {}", app.developers.join(", "));
    if !app.publisher().is_empty() {
        println!("publisher: {}", app.publisher());
    }
    println!(
        "platforms: {}",
        app.platforms.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!("genres: {}", app.genres.join(", "));
}

fn print_user_human(data: &UserData) {
    let profile = &data.profile;
    match data.status {
        ProfileStatus::NotFound => {
            println!("profile not found");
            return;
        }
        ProfileStatus::Private => {
            println!("{} ({}) is private", profile.username, profile.steam_id);
            return;
        }
        ProfileStatus::Public => {}
    }

    println!(
        "owned games for {} ({}) ({})",
        profile.username,
        profile.steam_id,
        profile.owned_games.len()
    );
    for game in &profile.owned_games {
        println!(
            "{}\t{}\t{}m\t{}/{}",
            game.id,
            game.name,
            game.total_playtime_minutes,
            game.unlocked_achievements,
            game.total_achievements
        );
    }
}

fn print_stats_human(data: &StatsData) {
    match (data.status, &data.stats) {
        (Some(ProfileStatus::NotFound), _) | (None, _) | (_, None) => {
            println!("profile not found");
        }
        (Some(ProfileStatus::Private), _) => {
            println!("profile is private");
        }
        (Some(ProfileStatus::Public), Some(stats)) => {
            println!("user: {}", stats.user_id);
            println!("games: {}", stats.total_games);
            println!("playtime: {}m", stats.total_playtime_minutes);
            if !stats.favorite_game.is_empty() {
                println!("favorite: {}", stats.favorite_game);
            }
            println!(
                "achievements: {}/{}",
                stats.unlocked_achievements, stats.total_achievements
            );
        }
    }
}
