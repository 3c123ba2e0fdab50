// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_source(functions: usize) -> String {
    let mut content = String::new();
    for i in 0..functions {
        content.push_str(&format!(
            "fn handler_{i}(value: usize) -> usize {{\n    let total = value + {i};\n    total * 2\n}}\n\n"
        ));
    }
    content
}

#[allow(dead_code)]
pub fn generate_prose(paragraphs: usize) -> String {
    "The quick brown fox jumps over the lazy dog. The dog sleeps on.\n\n".repeat(paragraphs)
}
