//! Match engine - scans the comment stream and replies to today's word.

use tracing::{debug, error, info, warn};

use crate::bot::Error;
use crate::bot::ledger::ReplyLedger;
use crate::bot::reddit::{Comment, ReplyTransport, StreamWatcher};
use crate::bot::render::render;
use crate::bot::word::WordRecord;

/// Where the engine is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    WordLoaded,
    Scanning,
    CycleDone,
}

/// Why a comment was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    OwnComment,
    AlreadyReplied,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip(Skip),
    Reply,
}

/// Decide what to do with one comment. First matching rule wins:
///
/// 1. authored by the bot itself: skip, so the bot never triggers on its own replies
/// 2. already in the ledger: skip
/// 3. body lacks the word (case-sensitive substring): skip
/// 4. otherwise: reply
pub fn decide(comment: &Comment, word: &str, bot_username: &str, ledger: &ReplyLedger) -> Decision {
    if comment.is_authored_by(bot_username) {
        return Decision::Skip(Skip::OwnComment);
    }
    if ledger.contains(&comment.id) {
        return Decision::Skip(Skip::AlreadyReplied);
    }
    if !comment.body.contains(word) {
        return Decision::Skip(Skip::NoMatch);
    }
    Decision::Reply
}

/// Tally of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub scanned: usize,
    pub replied: usize,
    pub own_comments: usize,
    pub already_replied: usize,
    pub no_match: usize,
    pub failed: usize,
}

/// Owns the ledger for its whole lifetime; the only writer to it.
pub struct MatchEngine<P> {
    platform: P,
    ledger: ReplyLedger,
    bot_username: String,
    poll_limit: usize,
    dry_run: bool,
    state: CycleState,
}

impl<P: StreamWatcher + ReplyTransport> MatchEngine<P> {
    pub fn new(platform: P, ledger: ReplyLedger, bot_username: impl Into<String>, poll_limit: usize) -> Self {
        Self {
            platform,
            ledger,
            bot_username: bot_username.into(),
            poll_limit,
            dry_run: false,
            state: CycleState::Idle,
        }
    }

    /// Log matches instead of replying.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn ledger(&self) -> &ReplyLedger {
        &self.ledger
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// One scan of the stream against `record`.
    ///
    /// A failed reply is logged and the scan moves on; the comment stays out
    /// of the ledger and is retried if a later poll returns it again. Only a
    /// failed stream poll or a failed ledger append end the cycle early.
    pub async fn run_cycle(&mut self, record: &WordRecord) -> Result<CycleReport, Error> {
        self.state = CycleState::WordLoaded;
        let result = self.scan(record).await;
        self.state = CycleState::CycleDone;
        result
    }

    async fn scan(&mut self, record: &WordRecord) -> Result<CycleReport, Error> {
        let comments = self.platform.poll(self.poll_limit).await?;
        self.state = CycleState::Scanning;

        let mut report = CycleReport::default();
        let mut reply_text: Option<String> = None;

        for comment in &comments {
            report.scanned += 1;
            match decide(comment, record.word(), &self.bot_username, &self.ledger) {
                Decision::Skip(Skip::OwnComment) => report.own_comments += 1,
                Decision::Skip(Skip::AlreadyReplied) => report.already_replied += 1,
                Decision::Skip(Skip::NoMatch) => report.no_match += 1,
                Decision::Reply => {
                    info!("Comment found with id {}", comment.id);
                    let text = reply_text.get_or_insert_with(|| render(record));

                    if self.dry_run {
                        info!("[DRY RUN] Would reply to comment {}", comment.id);
                        continue;
                    }

                    match self.platform.reply(comment, text).await {
                        Ok(()) => {
                            // Reply is out; from here a lost ledger write means a duplicate later
                            if let Err(e) = self.ledger.record(&comment.id) {
                                error!("Replied to {} but could not record it: {e}", comment.id);
                                return Err(e);
                            }
                            report.replied += 1;
                            info!("✅ Replied to comment with id {}", comment.id);
                        }
                        Err(e) => {
                            report.failed += 1;
                            warn!("{e}");
                        }
                    }
                }
            }
        }

        debug!("Cycle report: {:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn comment(id: &str, author: &str, body: &str) -> Comment {
        Comment {
            id: id.to_string(),
            body: body.to_string(),
            author: author.to_string(),
        }
    }

    fn ledger_with(dir: &TempDir, ids: &[&str]) -> ReplyLedger {
        let mut ledger = ReplyLedger::load(dir.path().join("comments.txt")).unwrap();
        for id in ids {
            ledger.record(id).unwrap();
        }
        ledger
    }

    #[test]
    fn test_decide_reply() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &[]);
        let c = comment("c1", "alice", "what an ephemeral moment");
        assert_eq!(decide(&c, "ephemeral", "wotd_bot", &ledger), Decision::Reply);
    }

    #[test]
    fn test_decide_own_comment_wins_over_everything() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &["c1"]);
        let c = comment("c1", "WOTD_BOT", "ephemeral");
        assert_eq!(decide(&c, "ephemeral", "wotd_bot", &ledger), Decision::Skip(Skip::OwnComment));
    }

    #[test]
    fn test_decide_ledger_before_match() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &["c1"]);
        let c = comment("c1", "alice", "no word here");
        assert_eq!(decide(&c, "ephemeral", "wotd_bot", &ledger), Decision::Skip(Skip::AlreadyReplied));
    }

    #[test]
    fn test_decide_case_sensitive_substring() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, &[]);
        let upper = comment("c1", "alice", "Ephemeral things");
        let inner = comment("c2", "alice", "unephemerality");
        assert_eq!(decide(&upper, "ephemeral", "wotd_bot", &ledger), Decision::Skip(Skip::NoMatch));
        assert_eq!(decide(&inner, "ephemeral", "wotd_bot", &ledger), Decision::Reply);
    }
}
