//! Global keyboard and mouse hooks. Events are delivered on a dedicated OS thread, the daemon
//! only ever sees [InputEvent]s through a callback.

#[cfg(any(feature = "win", feature = "x11"))]
mod listener;

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyPress,
    /// Button press only, releases are ignored.
    MouseClick,
    MouseMove,
}

pub type InputCallback = Box<dyn Fn(InputEvent) + Send + Sync + 'static>;

pub trait InputHook: Send {
    /// Installs the hooks and starts delivering events to `callback`. Fails when the OS refuses
    /// the hooks. Hooks can't be removed again, callers stop consuming events instead.
    fn start(&mut self, callback: InputCallback) -> Result<()>;
}

/// Serves as a cross-compatible InputHook implementation.
pub struct GenericInputHook {
    inner: Box<dyn InputHook>,
}

impl GenericInputHook {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(any(feature = "win", feature = "x11"))] {
                Ok(Self {
                    inner: Box::new(listener::ListenerInputHook::default()),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No input hook was compiled in, enable the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl InputHook for GenericInputHook {
    fn start(&mut self, callback: InputCallback) -> Result<()> {
        self.inner.start(callback)
    }
}
