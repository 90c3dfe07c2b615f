//! The itinerary generator: prompt → chat call → parse → normalize → validate,
//! with bounded retries and a deterministic fallback once they are exhausted.

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::itinerary::{extract_candidate, normalize_fields, Itinerary, ItineraryValidator};

const MAX_ATTEMPTS: usize = 3;
/// Fixed, increasing delays keyed to the attempt that just failed.
const BACKOFF: [Duration; 3] = [
    Duration::from_millis(800),
    Duration::from_millis(1600),
    Duration::from_millis(3200),
];
/// How much of the raw model output is kept in the last-error record.
const ERROR_SNIPPET_CHARS: usize = 200;

/// One chat completion per attempt. The model is an unreliable collaborator;
/// implementations report transport and API failures as errors and leave the
/// output untrusted.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Best-effort photo lookup for a validated stop. Infallible by contract:
/// failures come back as the empty string.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn find_photo(&self, place_name: &str) -> String;
}

/// Injectable delay so tests drive the retry loop without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry state: attempts are numbered from 1.
enum GenerationState {
    Attempting(usize),
    Succeeded(Itinerary),
    Exhausted,
}

/// Orchestrates the recommendation pipeline. `generate` never fails: every
/// failure path terminates in the deterministic fallback itinerary.
pub struct ItineraryGenerator {
    chat: Arc<dyn ChatModel>,
    photos: Arc<dyn PhotoSource>,
    sleeper: Arc<dyn Sleeper>,
    validator: ItineraryValidator,
}

impl ItineraryGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, photos: Arc<dyn PhotoSource>) -> Result<Self> {
        Ok(Self {
            chat,
            photos,
            sleeper: Arc::new(TokioSleeper),
            validator: ItineraryValidator::new()?,
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn generate(
        &self,
        location: &str,
        date: &str,
        time: &str,
        weather_text: Option<&str>,
    ) -> Itinerary {
        let system = prompt::system_prompt();
        let user = prompt::user_prompt(location, date, time, weather_text);

        let mut last_error = String::new();
        let mut state = GenerationState::Attempting(1);

        loop {
            match state {
                GenerationState::Attempting(attempt) => {
                    match self.attempt(&system, &user).await {
                        Ok(itinerary) => state = GenerationState::Succeeded(itinerary),
                        Err(reason) => {
                            warn!(
                                target: "daytrip::generator",
                                attempt,
                                error = %reason,
                                "recommendation attempt failed"
                            );
                            last_error = reason;
                            if attempt < MAX_ATTEMPTS {
                                self.sleeper.sleep(BACKOFF[attempt - 1]).await;
                                state = GenerationState::Attempting(attempt + 1);
                            } else {
                                state = GenerationState::Exhausted;
                            }
                        }
                    }
                }
                GenerationState::Succeeded(mut itinerary) => {
                    self.enrich(&mut itinerary).await;
                    itinerary.weather_text = weather_text.map(str::to_string);
                    return itinerary;
                }
                GenerationState::Exhausted => {
                    let mut fallback = Itinerary::generation_failure(&last_error);
                    fallback.weather_text = weather_text.map(str::to_string);
                    return fallback;
                }
            }
        }
    }

    /// One full attempt. The error string is what ends up in the fallback
    /// stop's description if this turns out to be the last attempt.
    async fn attempt(
        &self,
        system: &str,
        user: &str,
    ) -> std::result::Result<Itinerary, String> {
        let content = self
            .chat
            .complete(system, user)
            .await
            .map_err(|err| err.to_string())?;

        let candidate = match extract_candidate(&content) {
            Some(candidate) => normalize_fields(candidate),
            None => return Err(schema_mismatch(&content)),
        };

        if !self.validator.is_valid(&candidate) {
            if let Some(detail) = self.validator.explain(&candidate) {
                debug!(target: "daytrip::generator", %detail, "candidate failed structural validation");
            }
            return Err(schema_mismatch(&content));
        }

        Itinerary::from_value(&candidate).map_err(|err| err.to_string())
    }

    async fn enrich(&self, itinerary: &mut Itinerary) {
        for course in &mut itinerary.courses {
            for stop in &mut course.stops {
                stop.photo_url = self.photos.find_photo(&stop.name).await;
            }
        }
    }
}

fn schema_mismatch(content: &str) -> String {
    format!("스키마 미스매치: {}", truncate_chars(content, ERROR_SNIPPET_CHARS))
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "스키마".repeat(100);
        let truncated = truncate_chars(&text, ERROR_SNIPPET_CHARS);
        assert_eq!(truncated.chars().count(), ERROR_SNIPPET_CHARS);

        assert_eq!(truncate_chars("짧다", ERROR_SNIPPET_CHARS), "짧다");
    }

    #[test]
    fn backoff_table_is_fixed_and_increasing() {
        assert_eq!(BACKOFF.len(), MAX_ATTEMPTS);
        assert!(BACKOFF.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
