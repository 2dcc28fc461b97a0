//! Mutex lock recovery so a panicking channel handler does not wedge the session.

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(context, "mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::lock_or_recover;
    use std::sync::Mutex;

    #[test]
    fn lock_or_recover_returns_normal_guard_when_not_poisoned() {
        let lock = Mutex::new(Vec::<String>::new());
        lock_or_recover(&lock, "normal").push("first".to_string());

        let value = match lock.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("lock should not be poisoned"),
        };
        assert_eq!(value.as_slice(), ["first".to_string()]);
    }

    #[test]
    fn lock_or_recover_keeps_subscriptions_after_poisoning() {
        let lock = Mutex::new(vec!["message".to_string()]);
        let _ = std::panic::catch_unwind(|| {
            let _guard = match lock.lock() {
                Ok(guard) => guard,
                Err(_) => panic!("initial lock acquisition should succeed"),
            };
            panic!("handler panicked while holding the subscription table");
        });
        assert!(lock.is_poisoned(), "lock should be poisoned by panic");

        lock_or_recover(&lock, "poisoned-test").push("field_update".to_string());

        let value = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        assert_eq!(
            value.as_slice(),
            ["message".to_string(), "field_update".to_string()]
        );
    }
}
