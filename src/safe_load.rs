//! Fail-soft execution of a named load step.
//!
//! One misconfigured section must not keep the rest of the namespace from
//! loading. [`safe_load`] runs a unit of work, logs its outcome and hands the
//! value back only when it succeeded; errors and panics end at this boundary.

use crate::error::{LoadError, LoadResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Human-readable label of a load step, optionally with the type being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStep<'a> {
    name: &'a str,
    class: Option<&'a str>,
}

impl<'a> LoadStep<'a> {
    /// A step labelled by name only.
    pub fn new(name: &'a str) -> Self {
        Self { name, class: None }
    }

    /// Add the type of the object being loaded to the log label.
    pub fn with_class(mut self, class: &'a str) -> Self {
        self.class = Some(class);
        self
    }

    /// The label used in log messages: `name` or `name class`.
    pub fn identifier(&self) -> String {
        match self.class {
            Some(class) => format!("{} {}", self.name, class),
            None => self.name.to_string(),
        }
    }

    /// Run `work` under this label. See [`safe_load`].
    pub fn run<T, F>(&self, work: F) -> Option<T>
    where
        F: FnOnce() -> LoadResult<T>,
    {
        let identifier = self.identifier();
        tracing::info!("Loading {}...", identifier);

        match catch_panics(&identifier, work) {
            Ok(value) => {
                crate::success!("Successfully loaded {}", identifier);
                Some(value)
            }
            Err(err) => {
                tracing::error!("Failed to load {}", identifier);
                tracing::debug!(error = ?err, "{}", err);
                None
            }
        }
    }
}

/// Run a named unit of load work, absorbing any failure.
///
/// Logs `Loading <name>...` on entry, a SUCCESS event when `work` returns
/// `Ok`, and an error naming the step when it returns `Err` or panics. The
/// failure detail goes to the debug level. Returns the produced value, or
/// `None` when the step failed.
///
/// ```
/// use daq_loader::safe_load::safe_load;
///
/// let motors = safe_load("motors", None, || Ok(vec!["x", "y"]));
/// assert_eq!(motors, Some(vec!["x", "y"]));
///
/// let broken: Option<()> = safe_load("camera", Some("PIMCamera"), || {
///     Err(anyhow::anyhow!("no such host").into())
/// });
/// assert!(broken.is_none());
/// ```
pub fn safe_load<T, F>(name: &str, class: Option<&str>, work: F) -> Option<T>
where
    F: FnOnce() -> LoadResult<T>,
{
    let step = LoadStep::new(name);
    match class {
        Some(class) => step.with_class(class).run(work),
        None => step.run(work),
    }
}

/// Run `work`, turning a panic into [`LoadError::Panicked`].
///
/// Nothing is logged; callers that need their own messages (hook delivery,
/// for one) use this instead of [`safe_load`].
pub fn catch_panics<T, F>(label: &str, work: F) -> LoadResult<T>
where
    F: FnOnce() -> LoadResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => Err(LoadError::Panicked(format!(
            "{}: {}",
            label,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
