use agentic_ui_engine::editing::{Cmd, EditorStore, Point, Selection};
use agentic_ui_engine::lazy::{LazyConfig, LazyList, Render};
use agentic_ui_engine::parsing::{StreamingParser, parse};
use agentic_ui_engine::perf::{ContentType, OperationType, PerformanceMonitor};
use agentic_ui_engine::schema::{ElementKind, outline, to_markdown};
use pretty_assertions::assert_eq;

const REPLY: &str = "# Answer\n\nHere is **the plan**:\n\n- [x] parse\n- [ ] render\n\n| step | ms |\n| --- | --- |\n| parse | 12 |\n| render | 40 |\n\n```rust\nfn main() {}\n```\n\n> done";

#[test]
fn streaming_matches_a_full_parse_at_every_prefix() {
    let mut parser = StreamingParser::new();
    let mut seen = String::new();
    for chunk in REPLY.as_bytes().chunks(7) {
        let chunk = std::str::from_utf8(chunk).unwrap();
        seen.push_str(chunk);
        let streamed = parser.push_str(chunk).to_vec();
        assert_eq!(streamed, parse(&seen).schema, "after {seen:?}");
    }
}

#[test]
fn markdown_round_trip_is_stable() {
    let once = to_markdown(&parse(REPLY).schema);
    let twice = to_markdown(&parse(&once).schema);
    assert_eq!(once, twice);
}

#[test]
fn deleting_columns_until_the_table_is_gone() {
    let mut store = EditorStore::from_markdown("| a | b |\n| - | - |\n| 1 | 2 |");
    store.set_selection(Some(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0))));

    store.apply(Cmd::DeleteTableColumn).unwrap();
    assert_eq!(store.markdown(), "| b |\n| --- |\n| 2 |");
    assert!(matches!(
        store.nodes()[0].kind(),
        Some(ElementKind::Table { aligns }) if aligns.len() == 1
    ));

    store.apply(Cmd::DeleteTableColumn).unwrap();
    assert!(store.nodes().is_empty());
    assert!(store.keys().is_empty());
}

#[test]
fn store_follows_a_streamed_reply() {
    let mut store = EditorStore::new();
    let mut parser = StreamingParser::new();
    let mut first_key = None;
    for chunk in REPLY.split_inclusive('\n') {
        let schema = parser.push_str(chunk).to_vec();
        store.update_node_list(schema);
        first_key = first_key.or(store.key_of(0));
        assert_eq!(store.key_of(0), first_key, "heading key must survive");
    }
    assert_eq!(store.nodes(), parse(REPLY).schema.as_slice());
}

#[test]
fn last_ten_of_two_hundred_are_always_rendered() {
    let mut list = LazyList::new(LazyConfig::enabled().keep_last(10));
    for i in 0..200 {
        list.push(if i % 2 == 0 { "user" } else { "assistant" });
    }
    let placeholders: Vec<usize> = (0..200).filter(|&i| list.is_placeholder(i)).collect();
    assert_eq!(placeholders, (0..190).collect::<Vec<_>>());

    // scrolled to the top: only items near the viewport are promoted
    list.set_viewport(0.0, 600.0);
    assert_eq!(list.decision(0), Some(Render::Content));
    assert!(list.is_placeholder(50));
    assert!((190..200).all(|i| list.decision(i) == Some(Render::Content)));
}

#[test]
fn finished_metric_leaves_nothing_behind() {
    let monitor = PerformanceMonitor::with_enabled(true);
    monitor.start_monitoring("paste-1", ContentType::Text, 2048);
    monitor.start_sub_operation("paste-1", OperationType::Parse);
    monitor.end_sub_operation("paste-1", OperationType::Parse);

    let summary = monitor.end_monitoring("paste-1");
    assert!(summary.is_some());
    assert!(monitor.metric("paste-1").is_none());
    assert!(monitor.sub_metric("paste-1", OperationType::Parse).is_none());
    assert!(monitor.is_empty());
}

#[test]
fn toc_skips_deep_and_blank_headings() {
    let schema = parse("# One\n\n##### Five\n\n## \n\n#### Four").schema;
    let titles: Vec<(u8, String)> = outline(&schema)
        .into_iter()
        .map(|e| (e.level, e.title))
        .collect();
    assert_eq!(titles, vec![(1, "One".to_string()), (4, "Four".to_string())]);
}
