//! Interrupt handling
//!
//! [`Interrupt`] is a shared "Ctrl-C was pressed" state. The watcher thread
//! started by [`watch_interrupts`] raises it on every SIGINT. Blocking work
//! runs through [`Interrupt::block_on`], which races the work against the
//! interrupt so a hung connect or query gives up with
//! [`PantryError::Interrupted`]. Prompts consume the interrupt with
//! [`Interrupt::take`] and the session then shuts down.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::thread;

use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{PantryError, Result};

/// Cloneable handle to the process-wide interrupt state
#[derive(Debug, Clone)]
pub struct Interrupt {
    state: Arc<watch::Sender<bool>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    /// A handle that is not raised
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state: Arc::new(state) }
    }

    /// Mark the interrupt as raised, waking everything blocked in [`Interrupt::block_on`]
    pub fn raise(&self) {
        self.state.send_replace(true);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.state.borrow()
    }

    /// Clear the interrupt, returning whether it was raised
    pub fn take(&self) -> bool {
        self.state.send_replace(false)
    }

    /// Resolves once the interrupt is raised; immediately if it already is
    pub async fn raised(&self) {
        let mut state = self.state.subscribe();
        // The sender lives in `self`, so the channel stays open while we wait
        let _ = state.wait_for(|raised| *raised).await;
    }

    /// Drive `future` to completion on `runtime` unless the interrupt is raised first
    ///
    /// The interrupt is left raised so the next prompt still sees it.
    pub fn block_on<F: Future>(&self, runtime: &Runtime, future: F) -> Result<F::Output> {
        runtime.block_on(async {
            tokio::select! {
                output = future => Ok(output),
                () = self.raised() => {
                    debug!("blocking operation interrupted");
                    Err(PantryError::Interrupted)
                }
            }
        })
    }
}

/// Install the SIGINT handler and spawn the watcher thread
///
/// The handler is registered before this returns, so a Ctrl-C arriving right
/// afterwards is never lost to the default "terminate" action.
pub fn watch_interrupts() -> Result<Interrupt> {
    let interrupt = Interrupt::new();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PantryError::engine_error("signal", format!("Failed to start runtime: {e}")))?;

    let mut listener = {
        let _entered = runtime.enter();
        Listener::install().map_err(PantryError::Io)?
    };

    let raised = interrupt.clone();
    thread::Builder::new()
        .name("pantry-sigint".into())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    match listener.recv().await {
                        Ok(()) => {
                            debug!("interrupt received");
                            raised.raise();
                        }
                        Err(e) => {
                            warn!(error = %e, "could not listen for interrupts");
                            break;
                        }
                    }
                }
            });
        })
        .map_err(PantryError::Io)?;

    Ok(interrupt)
}

#[cfg(unix)]
struct Listener(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Listener {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::interrupt()).map(Self)
    }

    async fn recv(&mut self) -> io::Result<()> {
        self.0.recv().await.ok_or_else(|| io::Error::other("signal stream closed"))
    }
}

#[cfg(not(unix))]
struct Listener;

#[cfg(not(unix))]
impl Listener {
    fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}
