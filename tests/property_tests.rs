use proptest::prelude::*;
use tidewatch::memory::{ConversationMemory, TurnRecord};
use tidewatch::pipeline::stages::normalize_categories;
use tidewatch::router::extract_categorical_label;

proptest! {
    // Memory never exceeds its cap, and the survivors are always the
    // most recent records in arrival order.
    #[test]
    fn test_memory_cap_invariant(
        cap in 1usize..=20,
        contents in prop::collection::vec("[a-z ]{0,12}", 0..60),
    ) {
        let mut memory = ConversationMemory::with_cap(cap);
        for content in &contents {
            memory.push(TurnRecord::user(content));
        }

        prop_assert!(memory.len() <= cap);
        prop_assert!(memory.len() <= contents.len());

        let expected_tail: Vec<&String> = contents
            .iter()
            .rev()
            .take(memory.len())
            .rev()
            .collect();
        for (record, expected) in memory.records().iter().zip(expected_tail) {
            prop_assert_eq!(&record.content, expected);
        }
    }

    // Rendering is a pure function of the retained records
    #[test]
    fn test_memory_render_is_idempotent(
        contents in prop::collection::vec("[a-z]{1,8}", 0..20),
    ) {
        let mut memory = ConversationMemory::new();
        for content in &contents {
            memory.push(TurnRecord::assistant(content));
        }
        prop_assert_eq!(memory.render_as_text(), memory.render_as_text());
    }

    // Normalization removes every colloquial category token regardless
    // of casing, and only ever rewrites toward the canonical set.
    #[test]
    fn test_normalization_removes_colloquial_tokens(
        word in "submarine|Submarine|SUBMARINE|ship|Ships|SHIPS|aircraft|Aircraft|helicopter|Helicopters",
        prefix in "[a-z ]{0,10}",
        suffix in "[a-z ]{0,10}",
    ) {
        let query = format!("{} {} {}", prefix.trim(), word, suffix.trim());
        let normalized = normalize_categories(&query).to_lowercase();

        prop_assert!(!normalized.contains("submarine"));
        prop_assert!(
            normalized.contains("subsurface")
                || normalized.contains("surface")
                || normalized.contains("air")
        );
    }

    // Normalization never touches text without a colloquial token
    #[test]
    fn test_normalization_is_identity_without_tokens(
        query in "[a-rt-z ']{0,40}",
    ) {
        prop_assert_eq!(normalize_categories(&query), query);
    }

    // Label extraction finds a categorical label wherever the model
    // buries it in surrounding prose
    #[test]
    fn test_categorical_label_found_in_noise(
        label in "report|analysis|general",
        prefix in "[A-Z][a-z]{0,8}: ",
        suffix in "\\.?[a-z ]{0,10}",
    ) {
        let raw = format!("{}{}{}", prefix, label, suffix);
        prop_assert!(extract_categorical_label(&raw).is_some());
    }
}
