use std::path::Path;

use crate::domain::Status;

/// Display capability supplied by the UI collaborator.
///
/// `popup` is called from the polling loop and from the streaming task. It
/// must return promptly: while it runs, the stream is not being read.
pub trait Notifier: Send + Sync {
    fn popup(&self, status: &Status, avatar: Option<&Path>);
}

impl<F> Notifier for F
where
    F: Fn(&Status, Option<&Path>) + Send + Sync,
{
    fn popup(&self, status: &Status, avatar: Option<&Path>) {
        self(status, avatar)
    }
}
