use std::sync::Arc;

use clap::{Arg, Command};
use tracing::info;

use crate::config::Settings;
use crate::generator::{ItineraryGenerator, PhotoSource};
use crate::http::{router, AppState};
use crate::llm::OpenAiChat;
use crate::providers::{GooglePlacesPhotos, NoPhotos, VworldGeocoder, WeatherService};

/// CLI entry point for the daytrip service
pub async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = Command::new("daytrip")
        .version("0.1.0")
        .about("LLM-backed one-day course recommendations for a location, date and time")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve").about("Run the HTTP recommendation server").arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Port to bind on")
                    .default_value("8000"),
            ),
        )
        .subcommand(
            Command::new("recommend")
                .about("Print one recommendation as JSON and exit")
                .arg(
                    Arg::new("location")
                        .help("Street-level address to recommend around")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("date")
                        .help("Date as YYYY-MM-DD")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("time")
                        .help("Time of day as HH:MM")
                        .required(true)
                        .index(3),
                ),
        )
        .get_matches();

    let settings = Settings::from_env()?;
    let state = build_state(&settings)?;

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let port: u16 = sub.get_one::<String>("port").unwrap().parse()?;
            serve(state, port).await
        }
        Some(("recommend", sub)) => {
            let location = sub.get_one::<String>("location").unwrap();
            let date = sub.get_one::<String>("date").unwrap();
            let time = sub.get_one::<String>("time").unwrap();
            one_shot(state, location, date, time).await
        }
        _ => unreachable!("subcommand is required"),
    }
}

fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let chat = Arc::new(OpenAiChat::new(settings));
    let photos: Arc<dyn PhotoSource> = match &settings.google_maps_api_key {
        Some(key) => Arc::new(GooglePlacesPhotos::new(key.clone())),
        None => Arc::new(NoPhotos),
    };
    let generator = Arc::new(ItineraryGenerator::new(chat, photos)?);
    let geocoder = Arc::new(VworldGeocoder::new(settings.vworld_api_key.clone()));
    let weather = Arc::new(WeatherService::new(settings.kma_service_key.clone()));

    Ok(AppState {
        geocoder,
        weather,
        generator,
    })
}

async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(target: "daytrip::http", port, "recommendation server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn one_shot(state: AppState, location: &str, date: &str, time: &str) -> anyhow::Result<()> {
    let (lat, lon) = state.geocoder.geocode(location).await?;
    let yyyymmdd = date.replace('-', "");
    let report = state.weather.report(lat, lon, &yyyymmdd, time).await;
    let weather_text = report.weather_text();

    let itinerary = state
        .generator
        .generate(location, date, time, Some(&weather_text))
        .await;

    println!("{}", serde_json::to_string_pretty(&itinerary)?);
    Ok(())
}
