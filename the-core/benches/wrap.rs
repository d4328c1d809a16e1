//! Benchmarks for wrapped-line navigation in the-core.
//!
//! Run with: `cargo bench -p the-core --bench wrap`

use divan::{
  Bencher,
  black_box,
};
use the_core::wrap::{
  count_wrapped_lines,
  end_of_wrapped_line,
  move_n_wrapped_lines_down,
};

fn main() {
  divan::main();
}

fn make_text(lines: usize) -> String {
  let line = "The quick brown fox jumps over the lazy dog, again and again and again.\n";
  line.repeat(lines)
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn count(bencher: Bencher, lines: usize) {
  let text = make_text(lines);
  bencher.bench(|| count_wrapped_lines(black_box(&text), black_box(40)));
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn snap_to_height(bencher: Bencher, lines: usize) {
  let text = make_text(lines);
  bencher.bench(|| {
    let last = move_n_wrapped_lines_down(black_box(&text), 40, 0, 49);
    end_of_wrapped_line(&text, 40, last) + 1
  });
}
