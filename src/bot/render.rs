//! Reply text for a matched comment.

use crate::bot::word::WordRecord;

const REPLY_HEADER: &str = "You said the word of the day!";
/// A bare `\n\n` collapses in Reddit markdown; `&nbsp;` forces a visible gap.
const BLANK_LINE: &str = "\n\n&nbsp;\n\n";
const REPLY_LINK: &str =
    "Read more at [merriam-webster.com](https://www.merriam-webster.com/word-of-the-day).";

/// Build the markdown reply for `record`.
pub fn render(record: &WordRecord) -> String {
    let mut reply = String::new();
    reply.push_str(REPLY_HEADER);
    reply.push_str(BLANK_LINE);
    reply.push_str(&format!("**{}**\n\n", record.word()));
    reply.push_str(&format!("*{}* | *{}*\n\n", record.attribute(), record.pronunciation()));
    for definition in record.definitions() {
        reply.push_str(definition);
        reply.push_str("\n\n");
    }
    reply.push_str(REPLY_LINK);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral() -> WordRecord {
        WordRecord::new(
            "ephemeral",
            "adjective",
            "ih-FEM-er-uhl",
            vec!["lasting a very short time".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_render_exact_output() {
        let expected = "You said the word of the day!\n\n&nbsp;\n\n\
            **ephemeral**\n\n\
            *adjective* | *ih-FEM-er-uhl*\n\n\
            lasting a very short time\n\n\
            Read more at [merriam-webster.com](https://www.merriam-webster.com/word-of-the-day).";
        assert_eq!(render(&ephemeral()), expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let record = ephemeral();
        assert_eq!(render(&record), render(&record));
        assert_eq!(render(&record), render(&ephemeral()));
    }

    #[test]
    fn test_definitions_keep_order() {
        let record = WordRecord::new(
            "cogent",
            "adjective",
            "KOH-junt",
            vec![
                ": appealing forcibly to the mind or reason".to_string(),
                ": pertinent, relevant".to_string(),
            ],
        )
        .unwrap();

        let reply = render(&record);
        let first = reply.find("appealing forcibly").unwrap();
        let second = reply.find("pertinent, relevant").unwrap();
        assert!(first < second);
        assert!(reply.contains("relevant\n\nRead more at"));
    }

    #[test]
    fn test_no_escaping() {
        let record = WordRecord::new("a*b", "noun", "x", vec!["_under_".to_string()]).unwrap();
        let reply = render(&record);
        assert!(reply.contains("**a*b**"));
        assert!(reply.contains("_under_\n\n"));
    }
}
