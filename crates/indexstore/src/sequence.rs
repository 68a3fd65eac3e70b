//! Pull-over-push plumbing for engine traversals.
//!
//! The engine enumerates children by calling an applier once per item, and
//! the handle it passes is only valid during that call. Sequences therefore
//! lend each view to a visitor whose argument lifetime is higher-ranked:
//! the view cannot be stored or returned. Breaking out of the visitor makes
//! the applier return `false`, which stops the native traversal.

use std::ops::ControlFlow;

/// Drive `traverse` and feed every raw item through `visit` until it breaks.
pub(crate) fn drive<R, B>(
    traverse: impl FnOnce(&mut dyn FnMut(R) -> bool) -> bool,
    mut visit: impl FnMut(R) -> ControlFlow<B>,
) -> Option<B> {
    let mut outcome = None;
    traverse(&mut |raw| match visit(raw) {
        ControlFlow::Continue(()) => true,
        ControlFlow::Break(value) => {
            outcome = Some(value);
            false
        }
    });
    outcome
}

/// Helpers shared by every lending sequence. The sequence type provides
/// `try_for_each(&self, impl FnMut($item<'_>) -> ControlFlow<B>) -> Option<B>`.
macro_rules! lending_sequence {
    ($item:ident) => {
        /// Visit every item in engine order.
        pub fn for_each(&self, mut f: impl FnMut($item<'_>)) {
            self.try_for_each(|item| {
                f(item);
                std::ops::ControlFlow::<()>::Continue(())
            });
        }

        /// Visit items until `f` returns `Some`, stopping the traversal there.
        pub fn find_map<T>(&self, mut f: impl FnMut($item<'_>) -> Option<T>) -> Option<T> {
            self.try_for_each(|item| match f(item) {
                Some(found) => std::ops::ControlFlow::Break(found),
                None => std::ops::ControlFlow::Continue(()),
            })
        }

        pub fn count(&self) -> usize {
            let mut n = 0;
            self.for_each(|_| n += 1);
            n
        }

        pub fn is_empty(&self) -> bool {
            self.try_for_each(|_| std::ops::ControlFlow::Break(())).is_none()
        }

        /// Map every item to an owned value.
        pub fn map_collect<T>(&self, mut f: impl FnMut($item<'_>) -> T) -> Vec<T> {
            let mut out = Vec::new();
            self.for_each(|item| out.push(f(item)));
            out
        }
    };
}

pub(crate) use lending_sequence;

#[cfg(test)]
mod tests {
    use super::*;

    fn traverse_upto(n: u32, seen: &mut Vec<u32>) -> impl FnOnce(&mut dyn FnMut(u32) -> bool) -> bool {
        move |applier| {
            for i in 0..n {
                seen.push(i);
                if !applier(i) {
                    return false;
                }
            }
            true
        }
    }

    #[test]
    fn test_break_stops_the_underlying_traversal() {
        let mut produced = Vec::new();
        let found = drive(traverse_upto(10, &mut produced), |i| {
            if i == 3 {
                ControlFlow::Break(i * 10)
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(found, Some(30));
        assert_eq!(produced, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_exhausted_traversal_yields_none() {
        let mut produced = Vec::new();
        let found: Option<()> = drive(traverse_upto(4, &mut produced), |_| ControlFlow::Continue(()));
        assert_eq!(found, None);
        assert_eq!(produced.len(), 4);
    }
}
