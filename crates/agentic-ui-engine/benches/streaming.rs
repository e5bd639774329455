use agentic_ui_engine::editing::EditorStore;
use agentic_ui_engine::parsing::StreamingParser;
use criterion::{Criterion, criterion_group, criterion_main};
mod common;

fn bench_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming");
    group.sample_size(10);

    let reply = common::generate_chat_reply(50);
    let chunks = common::chunks(&reply, 16);

    group.bench_function("push_chunks", |b| {
        b.iter(|| {
            let mut parser = StreamingParser::new();
            for chunk in &chunks {
                std::hint::black_box(parser.push_str(chunk));
            }
        });
    });

    group.bench_function("push_chunks_into_store", |b| {
        b.iter(|| {
            let mut parser = StreamingParser::new();
            let mut store = EditorStore::new();
            for chunk in &chunks {
                let schema = parser.push_str(chunk).to_vec();
                std::hint::black_box(store.update_node_list(schema));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_streaming);
criterion_main!(benches);
