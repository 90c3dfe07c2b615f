//! daytrip-rs: LLM-backed one-day course recommendation service
//!
//! Given a location, date and time, the service geocodes the location, looks
//! up a weather forecast and asks a chat model for three alternative day
//! courses, coercing the untrusted model output into a schema-valid itinerary
//! with bounded retries and a deterministic fallback.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use daytrip_rs::{ItineraryGenerator, OpenAiChat, Settings};
//! use daytrip_rs::providers::NoPhotos;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let chat = Arc::new(OpenAiChat::new(&settings));
//!     let generator = ItineraryGenerator::new(chat, Arc::new(NoPhotos))?;
//!
//!     let itinerary = generator
//!         .generate("서울특별시 강남구 역삼동", "2025-08-23", "13:00", Some("맑음, 27°C"))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&itinerary)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod http;
pub mod itinerary;
pub mod llm;
pub mod providers;

pub use config::Settings;
pub use error::{RecommendError, Result};
pub use generator::{ChatModel, ItineraryGenerator, PhotoSource, Sleeper, TokioSleeper};
pub use itinerary::{Category, Course, Itinerary, ItineraryValidator, Stop, TimeOfDay};
pub use llm::{OpenAiChat, OpenAiClient};

#[cfg(feature = "cli")]
pub mod cli;
