//! Ordered fallback over pure extraction steps.

/// One named attempt at extracting `T` from a surface `S`.
pub struct Step<S: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&S) -> Option<T>,
}

impl<S: ?Sized, T> Clone for Step<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, T> Copy for Step<S, T> {}

impl<S: ?Sized, T> std::fmt::Debug for Step<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Runs `steps` in order and returns the first success with its step name.
#[must_use]
pub fn first_success<S: ?Sized, T>(
    surface: &S,
    steps: &[Step<S, T>],
) -> Option<(&'static str, T)> {
    steps.iter().find_map(|step| {
        let found = (step.run)(surface);
        if found.is_none() {
            tracing::trace!(step = step.name, "extraction step found nothing");
        }
        found.map(|value| (step.name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> Option<usize> {
        None
    }

    fn length(s: &str) -> Option<usize> {
        (!s.is_empty()).then_some(s.len())
    }

    fn always_one(_: &str) -> Option<usize> {
        Some(1)
    }

    #[test]
    fn returns_first_successful_step() {
        let steps: [Step<str, usize>; 3] = [
            Step { name: "never", run: never },
            Step { name: "length", run: length },
            Step { name: "one", run: always_one },
        ];
        assert_eq!(first_success("abc", &steps), Some(("length", 3)));
        assert_eq!(first_success("", &steps), Some(("one", 1)));
    }

    #[test]
    fn no_success_is_none() {
        let steps: [Step<str, usize>; 1] = [Step { name: "never", run: never }];
        assert_eq!(first_success("abc", &steps), None);
    }
}
