//! Fault isolation for calls into plugin code.
//!
//! Panics in plugin code are caught with `catch_unwind` and converted into
//! [`PluginError::Panicked`], so a panicking plugin is handled exactly like
//! one that returned an error.
//!
//! `catch_unwind` only catches unwinding panics. A plugin built with
//! `panic = "abort"` still takes the process down.

use snapqueue_plugin_api::{PluginError, PluginResult};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Call into plugin code, turning a panic into an error.
///
/// The closure usually captures `&mut dyn Plugin`, which is not
/// `UnwindSafe`; the runtime never touches a plugin's state again after it
/// panicked mid-call except to dispose it, so the assertion holds.
pub fn call_plugin<F, T>(plugin_fn: F) -> PluginResult<T>
where
    F: FnOnce() -> PluginResult<T>,
{
    match catch_unwind(AssertUnwindSafe(plugin_fn)) {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Plugin panicked");
            Err(PluginError::Panicked(msg))
        }
    }
}

/// Call into plugin code that returns no result, swallowing a panic.
///
/// Returns `false` if the call panicked.
pub fn call_plugin_infallible<F>(plugin_fn: F) -> bool
where
    F: FnOnce(),
{
    call_plugin(|| {
        plugin_fn();
        Ok(())
    })
    .is_ok()
}

pub(crate) fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_plugin_success() {
        let result = call_plugin(|| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_call_plugin_error_is_preserved() {
        let result: PluginResult<()> = call_plugin(|| Err(PluginError::failed("boom")));
        match result {
            Err(PluginError::Failed(msg)) => assert_eq!(msg, "boom"),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_call_plugin_panic_str() {
        let result: PluginResult<i32> = call_plugin(|| panic!("test panic message"));
        match result {
            Err(PluginError::Panicked(msg)) => assert!(msg.contains("test panic message")),
            other => panic!("Expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn test_call_plugin_panic_string() {
        let result: PluginResult<i32> =
            call_plugin(|| panic!("{}", "dynamic panic message".to_string()));
        match result {
            Err(PluginError::Panicked(msg)) => assert!(msg.contains("dynamic panic message")),
            other => panic!("Expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn test_call_plugin_infallible() {
        let mut counter = 0;
        assert!(call_plugin_infallible(|| counter += 1));
        assert_eq!(counter, 1);
        assert!(!call_plugin_infallible(|| panic!("dispose failed")));
    }
}
