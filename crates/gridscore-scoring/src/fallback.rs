//! Fallback strategies.
//!
//! When rule-based scoring cannot produce a decision, the whole scheduling
//! call is handed to a previously registered [`FallbackStrategy`].
//! [`RoundRobinFallback`] is the stock implementation.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use gridscore_core::{Mapping, Task, Worksheet};

/// A complete scheduling strategy used when scoring aborts.
pub trait FallbackStrategy: Send + Sync {
    /// Map every chunk of `worksheet`, or `None` if that is not possible.
    fn map(&self, task: &Task, worksheet: &Worksheet) -> Option<Mapping>;
}

/// Spreads chunks over their feasible candidates in turn.
///
/// One cursor is shared by every call, so successive tasks start on
/// successive nodes instead of all landing on the first candidate.
#[derive(Debug, Default)]
pub struct RoundRobinFallback {
    cursor: AtomicUsize,
}

impl RoundRobinFallback {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&self, feasible: usize) -> Option<usize> {
        (feasible > 0).then(|| self.cursor.fetch_add(1, Ordering::Relaxed) % feasible)
    }
}

impl FallbackStrategy for RoundRobinFallback {
    fn map(&self, task: &Task, worksheet: &Worksheet) -> Option<Mapping> {
        let mut mapping = Mapping::for_worksheet(worksheet);
        for chunk in &worksheet.chunks {
            let feasible = worksheet.feasible_nodes(chunk, &mapping);
            let Some(pick) = self.advance(feasible.len()) else {
                debug!(task = %task.name, chunk = chunk.index, "fallback found no feasible node");
                return None;
            };
            let node = feasible[pick].id.clone();
            mapping.assign(chunk.index, node);
        }
        Some(mapping)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use gridscore_core::Node;

    use super::*;

    fn one_chunk_over(ids: &[&str]) -> Worksheet {
        let mut ws = Worksheet::new(ids.iter().map(|id| Node::new(*id)).collect());
        ws.push_chunk(vec!["build".into()], ids.iter().copied());
        ws
    }

    #[test]
    fn successive_calls_rotate_the_starting_node() {
        let ws = one_chunk_over(&["a", "b", "c"]);
        let fallback = RoundRobinFallback::new();

        let picks: Vec<String> = (0..4)
            .map(|_| {
                let mapping = fallback.map(&Task::new("job"), &ws).unwrap();
                mapping.get(0).unwrap().to_string()
            })
            .collect();
        assert_eq!(picks, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn chunks_within_one_call_rotate() {
        let mut ws = Worksheet::new(vec![Node::new("a"), Node::new("b").with_executors(2)]);
        ws.push_chunk(vec!["one".into()], ["a", "b"]);
        ws.push_chunk(vec!["two".into()], ["a", "b"]);
        let fallback = RoundRobinFallback::new();

        let mapping = fallback.map(&Task::new("job"), &ws).unwrap();
        assert_eq!(mapping.get(0), Some("a"));
        assert_eq!(mapping.get(1), Some("b"));
        assert!(mapping.is_complete());
    }

    #[test]
    fn full_nodes_are_skipped() {
        let mut ws = Worksheet::new(vec![Node::new("a"), Node::new("b")]);
        ws.push_chunk(vec![], ["a"]);
        ws.push_chunk(vec![], ["a", "b"]);
        let fallback = RoundRobinFallback::new();

        let mapping = fallback.map(&Task::new("job"), &ws).unwrap();
        assert_eq!(mapping.get(0), Some("a"));
        // "a" is full; only "b" remains feasible.
        assert_eq!(mapping.get(1), Some("b"));
    }

    #[test]
    fn no_feasible_node_gives_no_mapping() {
        let mut ws = Worksheet::new(vec![Node::new("a")]);
        ws.push_chunk(vec![], ["a"]);
        ws.push_chunk(vec![], ["a"]);

        assert_eq!(RoundRobinFallback::new().map(&Task::new("job"), &ws), None);
    }

    #[test]
    fn shared_fallback_serves_concurrent_callers() {
        let fallback = Arc::new(RoundRobinFallback::new());
        let ws = Arc::new(one_chunk_over(&["a", "b"]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let fallback = fallback.clone();
                let ws = ws.clone();
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| {
                            let mapping = fallback.map(&Task::new("job"), &ws).unwrap();
                            mapping.get(0) == Some("a")
                        })
                        .count()
                })
            })
            .collect();

        let on_a: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 200 calls alternate strictly between the two nodes.
        assert_eq!(on_a, 100);
    }
}
