use crate::orchestrator::types::{Block, MarkerId, SequenceItem};
use crate::text::safe_text;

/// Result of grouping a host sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockPlan {
    pub blocks: Vec<Block>,
    pub has_text: bool,
    pub marker_ids: Vec<MarkerId>,
}

/// Groups text runs with the markers that follow them, keeping input order.
///
/// Every marker flushes the text gathered so far into a block carrying just that
/// marker; leftover text becomes a final block without markers. Trailing blocks
/// with neither text nor markers are dropped.
pub fn build_blocks(sequence: &[SequenceItem]) -> BlockPlan {
    let mut blocks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for item in sequence {
        match item {
            SequenceItem::Text(text) => pending.push(text.as_str()),
            SequenceItem::IndexMarker(id) => {
                blocks.push(flush(&mut pending, vec![*id]));
            }
        }
    }

    if !pending.is_empty() {
        blocks.push(flush(&mut pending, Vec::new()));
    }

    while blocks.last().map(Block::is_blank).unwrap_or(false) {
        blocks.pop();
    }

    let has_text = blocks.iter().any(|block| !block.text.is_empty());
    let marker_ids = blocks
        .iter()
        .flat_map(|block| block.markers.iter().copied())
        .collect();

    BlockPlan {
        blocks,
        has_text,
        marker_ids,
    }
}

fn flush(pending: &mut Vec<&str>, markers: Vec<MarkerId>) -> Block {
    let raw = pending.join(" ");
    pending.clear();
    Block::new(safe_text(&raw), markers)
}

/// A lone marker needs no engine work at all.
pub fn lone_marker(sequence: &[SequenceItem]) -> Option<MarkerId> {
    match sequence {
        [SequenceItem::IndexMarker(id)] => Some(*id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> SequenceItem {
        SequenceItem::text(value)
    }

    fn marker(id: MarkerId) -> SequenceItem {
        SequenceItem::marker(id)
    }

    #[test]
    fn text_marker_text_builds_two_blocks() {
        let plan = build_blocks(&[text("Hello"), marker(1), text("world")]);
        assert_eq!(
            plan.blocks,
            vec![Block::new("Hello", vec![1]), Block::new("world", vec![])]
        );
        assert!(plan.has_text);
        assert_eq!(plan.marker_ids, vec![1]);
    }

    #[test]
    fn adjacent_text_items_join_with_a_space() {
        let plan = build_blocks(&[text("one"), text("two"), marker(7)]);
        assert_eq!(plan.blocks, vec![Block::new("one two", vec![7])]);
    }

    #[test]
    fn consecutive_markers_each_get_their_own_block() {
        let plan = build_blocks(&[text("a"), marker(1), marker(2), text("b"), marker(3)]);
        assert_eq!(
            plan.blocks,
            vec![
                Block::new("a", vec![1]),
                Block::new("", vec![2]),
                Block::new("b", vec![3]),
            ]
        );
        assert_eq!(plan.marker_ids, vec![1, 2, 3]);
    }

    #[test]
    fn markers_keep_input_order() {
        let sequence = vec![
            marker(5),
            text("x"),
            marker(3),
            marker(9),
            text("y"),
            text("z"),
            marker(1),
        ];
        let plan = build_blocks(&sequence);
        let expected: Vec<MarkerId> = sequence
            .iter()
            .filter_map(|item| match item {
                SequenceItem::IndexMarker(id) => Some(*id),
                SequenceItem::Text(_) => None,
            })
            .collect();
        assert_eq!(plan.marker_ids, expected);
        assert_eq!(plan.blocks[3], Block::new("y z", vec![1]));
    }

    #[test]
    fn trailing_text_block_has_no_markers() {
        let plan = build_blocks(&[marker(1), text("tail")]);
        assert_eq!(plan.blocks.last(), Some(&Block::new("tail", vec![])));
    }

    #[test]
    fn whitespace_only_text_is_trimmed_but_markers_survive() {
        let plan = build_blocks(&[text("   "), marker(4), text("\u{200B}"), marker(8), text(" ")]);
        assert!(!plan.has_text);
        assert_eq!(plan.marker_ids, vec![4, 8]);
        assert_eq!(
            plan.blocks,
            vec![Block::new("", vec![4]), Block::new("", vec![8])]
        );
    }

    #[test]
    fn empty_and_blank_sequences_produce_no_blocks() {
        assert_eq!(build_blocks(&[]), BlockPlan::default());
        let plan = build_blocks(&[text(""), text("  ")]);
        assert!(plan.blocks.is_empty());
        assert!(!plan.has_text);
        assert!(plan.marker_ids.is_empty());
    }

    #[test]
    fn block_text_is_engine_safe() {
        let plan = build_blocks(&[text("\u{2019}Hello\u{2014}world\u{2026}")]);
        assert_eq!(plan.blocks, vec![Block::new("'Hello-world...", vec![])]);
    }

    #[test]
    fn lone_marker_detection() {
        assert_eq!(lone_marker(&[marker(5)]), Some(5));
        assert_eq!(lone_marker(&[marker(5), marker(6)]), None);
        assert_eq!(lone_marker(&[text("a")]), None);
        assert_eq!(lone_marker(&[]), None);
    }
}
