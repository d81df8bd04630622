use anyhow::Result;
use std::thread;

/// Runs `fetch` once per non-empty name, each on its own scoped thread.
///
/// Every call owns one slot of the returned vector, indexed like `names`.
/// All threads are joined before this returns. Empty names and failed
/// fetches leave `None` in their slot; failures are logged and never stop
/// the remaining fetches.
pub fn fetch_each<T, F>(names: &[String], fetch: F) -> Vec<Option<T>>
where
    T: Send,
    F: Fn(&str) -> Result<T> + Sync,
{
    let fetch = &fetch;
    thread::scope(|scope| {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                if name.is_empty() {
                    None
                } else {
                    Some(scope.spawn(move || fetch(name)))
                }
            })
            .collect();

        handles
            .into_iter()
            .zip(names)
            .map(|(handle, name)| match handle?.join() {
                Ok(Ok(value)) => Some(value),
                Ok(Err(err)) => {
                    log::warn!("{}: {:#}", name, err);
                    None
                }
                Err(_) => {
                    log::warn!("{}: fetch panicked", name);
                    None
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skips_empty_names() {
        let calls = AtomicUsize::new(0);
        let input = names(&["a", "", "b", "", "c"]);
        let results = fetch_each(&input, |name| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(name.to_uppercase())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            results,
            vec![
                Some("A".to_string()),
                None,
                Some("B".to_string()),
                None,
                Some("C".to_string())
            ]
        );
    }

    #[test]
    fn test_partial_failure_keeps_successes() {
        let input = names(&["ok1", "bad1", "ok2", "bad2", "bad3"]);
        let results = fetch_each(&input, |name| {
            if name.starts_with("bad") {
                anyhow::bail!("no such app: {}", name)
            }
            Ok(name.len())
        });

        let found: Vec<usize> = results.into_iter().flatten().collect();
        assert_eq!(found, vec![3, 3]);
    }

    #[test]
    fn test_no_names_no_calls() {
        let calls = AtomicUsize::new(0);
        let results: Vec<Option<()>> = fetch_each(&[], |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
