// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with **bold**, *italic* and `code`.\n\n- Bullet point\n  - Nested item\n- [x] Done task\n\n| col | value |\n| --- | ---: |\n| a | 1 |\n| b | 2 |\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n> A quote with a [link](https://example.com)\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_chat_reply(sections: usize) -> String {
    let mut content = String::new();

    for section in 0..sections {
        content.push_str(&format!("## Step {}\n\n", section));
        content.push_str("Some paragraph content with multiple sentences. This mimics a realistic assistant reply for benchmarking.\n\n");
        for i in 0..3 {
            content.push_str(&format!("{}. Item {} of step {}\n", i + 1, i, section));
        }
        content.push('\n');

        // Add code block occasionally
        if section % 3 == 0 {
            content.push_str("```python\ndef benchmark():\n    return 42\n```\n\n");
        }
    }

    content
}

/// Splits `text` into chunks of roughly `size` bytes on char boundaries.
#[allow(dead_code)]
pub fn chunks(text: &str, size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[start..end]);
        start = end;
    }
    out
}
