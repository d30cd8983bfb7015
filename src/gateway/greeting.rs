//! Daily greeting job: one randomized post per UTC day inside a window.

use super::prompts::{greeting_prompts, GREETING_FALLBACK};
use super::Gateway;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use rand::Rng;
use spore_core::{context::Context, message::OutgoingMessage};
use tracing::{info, warn};

/// Channel the greeting is posted through.
const GREETING_CHANNEL: &str = "telegram";
const GREETING_MAX_TOKENS: u32 = 60;
const GREETING_TEMPERATURE: f32 = 1.0;

/// Next greeting time for a window of `[start_hour, end_hour)` UTC.
///
/// Picks today's window if it has not closed yet, otherwise tomorrow's,
/// then a uniformly random whole minute inside it. An empty window
/// (`start_hour == end_hour`) is treated as one minute long.
pub fn compute_next_fire<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    start_hour: u32,
    end_hour: u32,
    rng: &mut R,
) -> DateTime<Utc> {
    let midnight = now
        - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));

    let window_minutes = (i64::from(end_hour.saturating_sub(start_hour)) * 60).max(1);
    let window_start = midnight + Duration::hours(i64::from(start_hour));
    let window_end = window_start + Duration::minutes(window_minutes);

    let day = if now < window_end {
        midnight
    } else {
        midnight + Duration::days(1)
    };

    let offset = rng.gen_range(0..window_minutes);
    day + Duration::hours(i64::from(start_hour)) + Duration::minutes(offset)
}

/// Like [`compute_next_fire`], but never schedules a second greeting on
/// the UTC date that already had one.
pub(super) fn next_fire_after<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    last_fired: Option<NaiveDate>,
    start_hour: u32,
    end_hour: u32,
    rng: &mut R,
) -> DateTime<Utc> {
    let next = compute_next_fire(now, start_hour, end_hour, rng);
    if Some(next.date_naive()) != last_fired {
        return next;
    }
    let tomorrow = next
        - Duration::seconds(i64::from(next.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(next.nanosecond()))
        + Duration::days(1);
    compute_next_fire(tomorrow, start_hour, end_hour, rng)
}

impl Gateway {
    /// Background task: sleep until the next greeting, post it, re-arm.
    pub(super) async fn greeting_loop(&self) {
        let start = self.greeting.start_hour;
        let end = self.greeting.end_hour;
        let mut last_fired: Option<NaiveDate> = None;

        loop {
            let now = Utc::now();
            let next = {
                let mut rng = rand::thread_rng();
                next_fire_after(now, last_fired, start, end, &mut rng)
            };
            info!("greeting: next post at {}", next.format("%Y-%m-%d %H:%M UTC"));

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            self.fire_greeting().await;
            last_fired = Some(next.date_naive());
        }
    }

    /// Generate and post one greeting. Returns whether a message was sent.
    pub(super) async fn fire_greeting(&self) -> bool {
        let chat_id = self.greeting.chat_id;
        if chat_id == 0 {
            info!("greeting: no chat id configured, skipping");
            return false;
        }

        let (system, prompt) = greeting_prompts();
        let context = Context::new(system, prompt)
            .with_max_tokens(GREETING_MAX_TOKENS)
            .with_temperature(GREETING_TEMPERATURE);

        let text = match self.complete_bounded(&context).await {
            Some(text) => text,
            None => {
                warn!("greeting: falling back to canned text");
                GREETING_FALLBACK.to_string()
            }
        };

        let sent = self
            .send_bounded(
                GREETING_CHANNEL,
                OutgoingMessage::to_chat(chat_id.to_string(), text),
            )
            .await;
        if sent {
            info!("greeting: posted to chat {chat_id}");
        }
        sent
    }
}
