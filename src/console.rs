use crate::{output, uc::UcObject};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tokio::sync::Mutex;

/// Operator-facing suspension points: preview, confirmation and selection
#[async_trait]
pub trait Console: Send + Sync {
    /// Render a candidate set before any step runs
    fn preview(&self, title: &str, objects: &[UcObject]);

    /// Block until the operator answers yes or no
    async fn confirm(&self, question: &str) -> bool;

    /// Pick a subset of `items`; returns indexes into `items`
    async fn select(&self, title: &str, items: &[String]) -> Vec<usize>;
}

/// Console on stdin/stdout
///
/// Prompts are serialized so concurrent workers never interleave questions.
#[derive(Default)]
pub struct TerminalConsole {
    prompt: Mutex<()>,
}

impl TerminalConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Console for TerminalConsole {
    fn preview(&self, title: &str, objects: &[UcObject]) {
        output::objects_table(title, objects);
    }

    async fn confirm(&self, question: &str) -> bool {
        let _turn = self.prompt.lock().await;
        let answer = read_answer(format!("{question} [y/N]: ")).await;
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    async fn select(&self, title: &str, items: &[String]) -> Vec<usize> {
        let _turn = self.prompt.lock().await;
        println!("{title}");
        for (i, item) in items.iter().enumerate() {
            println!("  {:>3}) {item}", i + 1);
        }
        let answer = read_answer("Select (e.g. 1,3-5 or 'all', empty for none): ".to_string()).await;
        parse_selection(&answer, items.len())
    }
}

/// Read one line from stdin without blocking the runtime
async fn read_answer(prompt: String) -> String {
    tokio::task::spawn_blocking(move || {
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line,
            Err(_) => String::new(),
        }
    })
    .await
    .unwrap_or_default()
}

/// Parse `1,3-5`, `all` or `*` into zero-based indexes below `len`.
///
/// Unparseable or out-of-range parts are ignored; the result is sorted and unique.
#[must_use]
pub fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return (0..len).collect();
    }

    let mut picked = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>(), b.trim().parse::<usize>()),
            None => (part.parse::<usize>(), part.parse::<usize>()),
        };
        if let (Ok(start), Ok(end)) = (start, end) {
            for n in start.max(1)..=end.min(len) {
                picked.push(n - 1);
            }
        }
    }
    picked.sort_unstable();
    picked.dedup();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_all() {
        assert_eq!(parse_selection("all", 3), vec![0, 1, 2]);
        assert_eq!(parse_selection(" ALL\n", 2), vec![0, 1]);
        assert_eq!(parse_selection("*", 2), vec![0, 1]);
    }

    #[test]
    fn test_parse_selection_list_and_ranges() {
        assert_eq!(parse_selection("1,3-5", 6), vec![0, 2, 3, 4]);
        assert_eq!(parse_selection("2, 2, 1", 3), vec![0, 1]);
    }

    #[test]
    fn test_parse_selection_ignores_out_of_range() {
        assert_eq!(parse_selection("0,4,9", 4), vec![3]);
        assert_eq!(parse_selection("3-10", 4), vec![2, 3]);
    }

    #[test]
    fn test_parse_selection_empty_and_garbage() {
        assert!(parse_selection("", 3).is_empty());
        assert!(parse_selection("\n", 3).is_empty());
        assert!(parse_selection("abc,x-y", 3).is_empty());
    }
}
