use crate::config::ChunkingConfig;
use crate::source::split_lines;
use crate::types::estimate_tokens;

/// One window produced by [`LineWindow::split`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowSlice {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

/// Token-budgeted sliding window over lines, with a token-bounded overlap
/// tail carried from each flushed window into the next.
pub(crate) struct LineWindow<'c> {
    config: &'c ChunkingConfig,
}

impl<'c> LineWindow<'c> {
    pub fn new(config: &'c ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split `text`, whose first line is `first_line` in the file.
    ///
    /// A single line over budget is emitted on its own and never cut.
    pub fn split(&self, text: &str, first_line: usize) -> Vec<WindowSlice> {
        let lines = split_lines(text);
        let max_tokens = self.config.max_chunk_tokens;
        let max_lines = self.config.max_chunk_lines.max(1);

        let mut slices = Vec::new();
        // Indices into `lines`; `fresh` counts lines not already emitted.
        let mut window: Vec<usize> = Vec::new();
        let mut window_chars = 0usize;
        let mut fresh = 0usize;

        for idx in 0..lines.len() {
            let line_chars = lines[idx].chars().count();

            if !window.is_empty() {
                let candidate = window_chars + 1 + line_chars;
                if candidate.div_ceil(4) > max_tokens || window.len() >= max_lines {
                    slices.push(Self::slice(&lines, &window, first_line));
                    window = self.overlap_tail(&lines, &window, line_chars, max_lines);
                    window_chars = Self::joined_chars(&lines, &window);
                    fresh = 0;
                }
            }

            window_chars = if window.is_empty() {
                line_chars
            } else {
                window_chars + 1 + line_chars
            };
            window.push(idx);
            fresh += 1;
        }

        if fresh > 0 && !window.is_empty() {
            slices.push(Self::slice(&lines, &window, first_line));
        }

        slices
    }

    /// Trailing lines of the flushed window whose joined estimate fits
    /// `overlap_tokens`, trimmed so the next line still fits the budget.
    fn overlap_tail(
        &self,
        lines: &[&str],
        window: &[usize],
        next_line_chars: usize,
        max_lines: usize,
    ) -> Vec<usize> {
        let overlap = self.config.overlap_tokens;
        if overlap == 0 {
            return Vec::new();
        }

        let mut tail: Vec<usize> = Vec::new();
        let mut chars = 0usize;
        // At most half the line cap, so every window advances by fresh lines.
        let limit = window.len().saturating_sub(1).min(max_lines / 2);
        for &idx in window.iter().rev() {
            if tail.len() >= limit {
                break;
            }
            let line_chars = lines[idx].chars().count();
            let next = if tail.is_empty() {
                line_chars
            } else {
                chars + 1 + line_chars
            };
            if next.div_ceil(4) > overlap {
                break;
            }
            chars = next;
            tail.push(idx);
        }
        tail.reverse();

        while !tail.is_empty() {
            let with_next = Self::joined_chars(lines, &tail) + 1 + next_line_chars;
            if with_next.div_ceil(4) <= self.config.max_chunk_tokens {
                break;
            }
            tail.remove(0);
        }

        tail
    }

    fn joined_chars(lines: &[&str], window: &[usize]) -> usize {
        if window.is_empty() {
            return 0;
        }
        window
            .iter()
            .map(|&idx| lines[idx].chars().count())
            .sum::<usize>()
            + window.len()
            - 1
    }

    fn slice(lines: &[&str], window: &[usize], first_line: usize) -> WindowSlice {
        let first = window.first().copied().unwrap_or(0);
        let last = window.last().copied().unwrap_or(first);
        let content = window
            .iter()
            .map(|&idx| lines[idx])
            .collect::<Vec<_>>()
            .join("\n");
        debug_assert_eq!(estimate_tokens(&content), Self::joined_chars(lines, window).div_ceil(4));
        WindowSlice {
            start_line: first_line + first,
            end_line: first_line + last,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize, overlap: usize, max_lines: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_tokens: max,
            min_chunk_tokens: 0,
            overlap_tokens: overlap,
            max_chunk_lines: max_lines,
        }
    }

    fn numbered_lines(count: usize) -> String {
        (0..count)
            .map(|i| format!("line number {i:04} of the test input"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn small_text_is_one_window() {
        let config = ChunkingConfig::default();
        let slices = LineWindow::new(&config).split("a\nb\nc\n", 1);
        assert_eq!(
            slices,
            vec![WindowSlice {
                start_line: 1,
                end_line: 3,
                content: "a\nb\nc".to_string()
            }]
        );
    }

    #[test]
    fn windows_respect_token_budget_and_overlap() {
        let config = config(40, 10, 1_000);
        let text = numbered_lines(30);
        let slices = LineWindow::new(&config).split(&text, 5);

        assert!(slices.len() > 1);
        assert_eq!(slices[0].start_line, 5);
        assert_eq!(slices.last().unwrap().end_line, 34);
        for slice in &slices {
            assert!(estimate_tokens(&slice.content) <= 40);
        }
        for pair in slices.windows(2) {
            // Each line is 9 tokens, so exactly one line of overlap fits in 10.
            assert_eq!(pair[1].start_line, pair[0].end_line);
        }
    }

    #[test]
    fn windows_respect_line_cap() {
        let config = config(10_000, 0, 7);
        let text = numbered_lines(20);
        let slices = LineWindow::new(&config).split(&text, 1);

        assert_eq!(slices.len(), 3);
        assert!(slices.iter().all(|s| s.end_line - s.start_line + 1 <= 7));
        assert_eq!(slices[1].start_line, 8);
        assert_eq!(slices[2].end_line, 20);
    }

    #[test]
    fn overlap_on_short_lines_still_advances() {
        // 50 overlap tokens would cover every line of a 10-line window.
        let config = config(10_000, 50, 10);
        let text = vec!["x"; 40].join("\n");
        let slices = LineWindow::new(&config).split(&text, 1);

        let spans: Vec<(usize, usize)> = slices.iter().map(|s| (s.start_line, s.end_line)).collect();
        assert_eq!(
            spans,
            vec![(1, 10), (6, 15), (11, 20), (16, 25), (21, 30), (26, 35), (31, 40)]
        );
    }

    #[test]
    fn oversized_line_is_kept_whole() {
        let config = config(10, 5, 100);
        let long = "x".repeat(200);
        let text = format!("a\n{long}\nb");
        let slices = LineWindow::new(&config).split(&text, 1);

        assert_eq!(slices.len(), 3);
        assert_eq!(slices[1].content, long);
        assert_eq!((slices[1].start_line, slices[1].end_line), (2, 2));
        // the oversized line is never carried as overlap
        assert_eq!(slices[2].content, "b");
    }

    #[test]
    fn empty_text_has_no_windows() {
        let config = ChunkingConfig::default();
        assert!(LineWindow::new(&config).split("", 1).is_empty());
    }
}
