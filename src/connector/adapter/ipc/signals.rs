use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::DomainError;

/// Cancel `token` on the first SIGTERM or SIGINT.
///
/// The watcher exits on its own once the token is cancelled for any reason.
pub fn cancel_on_signals(token: CancellationToken) -> Result<JoinHandle<()>, DomainError> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = terminate.recv() => {
                warn!("SIGTERM received, cancelling");
                token.cancel();
            }
            _ = interrupt.recv() => {
                warn!("SIGINT received, cancelling");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    }))
}
