//! Signal helpers for exercising `EINTR` handling.

use std::os::unix::thread::JoinHandleExt;
use std::sync::Once;
use std::thread;
use std::time::Duration;

extern "C" fn ignore_signal(_: libc::c_int) {}

/// Installs a no-op `SIGUSR1` handler without `SA_RESTART`, so a blocked
/// `poll(2)` returns `EINTR` instead of the process dying.
fn install_handler() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = ignore_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        assert_eq!(
            libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()),
            0
        );
    });
}

/// Runs `f` on a new thread and sends it `SIGUSR1` up to `signals` times,
/// 50 ms apart, stopping early once `f` returns.
pub(crate) fn run_interrupted<T, F>(signals: usize, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    install_handler();
    let handle = thread::spawn(f);
    for _ in 0..signals {
        thread::sleep(Duration::from_millis(50));
        if handle.is_finished() {
            break;
        }
        unsafe {
            libc::pthread_kill(handle.as_pthread_t(), libc::SIGUSR1);
        }
    }
    handle.join().unwrap()
}
