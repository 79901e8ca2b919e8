use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::signal;

use crate::error::{Error, Result};

/// Set when the user asked the process to stop.
///
/// Long running operations poll the flag between steps and bail out with
/// [`Error::Interrupted`], which drops (and thereby removes) their temporary
/// files and directories.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag nobody but [`CancelFlag::cancel`] will set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag set by SIGINT.
    ///
    /// A second SIGINT, while the first one is still being handled, terminates
    /// the process right away.
    pub fn on_sigint() -> std::io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register_conditional_default(signal::SIGINT, flag.clone())?;
        signal_hook::flag::register(signal::SIGINT, flag.clone())?;
        Ok(Self(flag))
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`Error::Interrupted`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let flag = CancelFlag::new();
        let clone = flag.clone();

        assert!(clone.check().is_ok());
        flag.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(Error::Interrupted)));
    }
}
