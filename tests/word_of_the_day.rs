//! Live check against merriam-webster.com.
//!
//! Run with: cargo test --features integ_test --test word_of_the_day

#[cfg(feature = "integ_test")]
mod tests {
    use wotd_bot::bot::render::render;
    use wotd_bot::bot::word::{MerriamWebster, WordSource};
    use wotd_bot::bot::http_client;

    /// Fails loudly if the page layout drifts away from what the parser expects.
    #[tokio::test]
    async fn test_fetch_todays_word() {
        let http = http_client("wotd-bot integration test").expect("Failed to build HTTP client");
        let source = MerriamWebster::new(http);

        let record = source.fetch().await.expect("Failed to fetch word of the day");
        println!("Word: {} ({} | {})", record.word(), record.attribute(), record.pronunciation());

        assert!(!record.word().is_empty());
        assert!(!record.definitions().is_empty());

        let reply = render(&record);
        assert!(reply.contains(&format!("**{}**", record.word())));
    }
}
