//! Contains logic for reading the focused window in different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;

/// Substituted when the owning process of a window can't be resolved.
pub const UNKNOWN_PROCESS: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindowData {
    /// Name of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Chrome'
    pub window_title: String,
    /// Executable name, for example `chrome.exe` or `nvim`. [UNKNOWN_PROCESS] if lookup failed.
    pub process_name: String,
    /// OS handle of the window. Together with the process it identifies a window across polls.
    pub window_id: u64,
}

impl ActiveWindowData {
    pub fn same_window(&self, other: &ActiveWindowData) -> bool {
        self.process_name == other.process_name && self.window_id == other.window_id
    }
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager: Send {
    /// Errors when there is no focused window or it has no title.
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window manager was compiled in, enable the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData> {
        self.inner.get_active_window_data()
    }
}
