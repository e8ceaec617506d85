//! Property tests for recursive chunking bounds and overlap.

use proptest::prelude::*;
use syllabus_rag::chunk_text;

/// Text built from short words joined by a mix of word, sentence, line and
/// paragraph boundaries.
fn arb_syllabus_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        ("[a-z]{1,12}", prop_oneof![Just(" "), Just(". "), Just("\n"), Just("\n\n")]),
        0..200,
    )
    .prop_map(|parts| parts.into_iter().map(|(word, sep)| format!("{word}{sep}")).collect())
}

fn shared_boundary(prev: &str, next: &str) -> usize {
    let prev: Vec<char> = prev.chars().collect();
    let next: Vec<char> = next.chars().collect();
    (1..=prev.len().min(next.len()))
        .rev()
        .find(|&n| prev[prev.len() - n..] == next[..n])
        .unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_never_exceed_size_and_are_never_blank(
        text in arb_syllabus_text(),
        chunk_size in 20usize..200,
    ) {
        let overlap = chunk_size / 4;
        let chunks = chunk_text(&text, chunk_size, overlap);

        for chunk in &chunks {
            prop_assert!(chunk.chars().count() <= chunk_size, "oversized chunk: {:?}", chunk);
            prop_assert!(!chunk.trim().is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
        }
        prop_assert_eq!(chunks.is_empty(), text.trim().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk(text in "[a-zA-Z][a-zA-Z .,\n]{0,300}") {
        let chunks = chunk_text(&text, 400, 60);
        prop_assert_eq!(chunks, vec![text.trim().to_string()]);
    }

    #[test]
    fn every_word_survives_chunking(text in arb_syllabus_text()) {
        let chunks = chunk_text(&text, 80, 20);
        let joined = chunks.join(" ");
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            prop_assert!(joined.contains(word), "lost word {:?}", word);
        }
    }

    #[test]
    fn each_chunk_starts_with_the_tail_of_its_predecessor(
        text in arb_syllabus_text(),
        chunk_size in 60usize..400,
    ) {
        let overlap = chunk_size / 6;
        let chunks = chunk_text(&text, chunk_size, overlap);

        for pair in chunks.windows(2) {
            let expected = overlap.min(pair[0].chars().count());
            let shared = shared_boundary(&pair[0], &pair[1]);
            prop_assert!(
                shared >= expected,
                "shared {} < {}: {:?} | {:?}", shared, expected, pair[0], pair[1]
            );
        }
    }
}
