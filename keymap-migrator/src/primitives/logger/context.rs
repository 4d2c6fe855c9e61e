use std::cell::RefCell;

thread_local! {
    static LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Scope guard that prefixes log lines on the current thread until dropped.
///
/// Contexts nest: dropping an inner guard restores the outer prefix.
///
/// # Examples
///
/// ```rust
/// use keymap_migrator::primitives::logger::{get_context, LogContext};
///
/// {
///     let _ctx = LogContext::new("TableMigrator");
///     assert_eq!(get_context().as_deref(), Some("[TableMigrator]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
}

impl LogContext {
    /// Activates `[module]` as the prefix for the current thread.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let previous = LOG_CONTEXT.with(|ctx| ctx.replace(Some(format!("[{module}]"))));
        Self { previous }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        LOG_CONTEXT.with(|ctx| {
            (*ctx.borrow_mut()).clone_from(&self.previous);
        });
    }
}

/// Gets the current logging context, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Runs a block with a logging context active.
///
/// ```rust
/// use keymap_migrator::with_log_context;
///
/// let rows = with_log_context!("keymap" => { 3 });
/// assert_eq!(rows, 3);
/// ```
#[macro_export]
macro_rules! with_log_context {
    ($module:expr => $block:block) => {{
        let _ctx = $crate::primitives::logger::LogContext::new($module);
        $block
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_contexts_restore_outer_prefix() {
        let _outer = LogContext::new("MigrationController");
        {
            let _inner = LogContext::new("keymap");
            assert_eq!(get_context().as_deref(), Some("[keymap]"));
        }
        assert_eq!(get_context().as_deref(), Some("[MigrationController]"));
    }

    #[test]
    fn test_context_is_thread_local() {
        let _ctx = LogContext::new("MigrationController");
        let other = std::thread::spawn(get_context).join().unwrap();
        assert_eq!(other, None);
    }
}
