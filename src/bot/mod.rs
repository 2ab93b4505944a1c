//! Word-of-the-day bot - watches r/all and replies when someone uses today's word.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod reddit;
pub mod render;
pub mod scheduler;
pub mod word;


use std::time::Duration;

pub use engine::{CycleReport, CycleState, MatchEngine};
pub use error::Error;
pub use ledger::ReplyLedger;
pub use reddit::{Comment, Credentials, RedditClient};
pub use scheduler::Scheduler;
pub use word::{MerriamWebster, WordRecord};

pub const WORD_URL: &str = "https://www.merriam-webster.com/word-of-the-day";
pub const SUBREDDIT: &str = "all";
/// Comments fetched per poll.
pub const POLL_LIMIT: usize = 25;
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const LEDGER_FILE: &str = "comments.txt";

/// Shared HTTP client for the word page and the Reddit API.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(HTTP_TIMEOUT)
        .build()
}
