use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::debug;
use windows::Win32::{
    Foundation::{CloseHandle, BOOL, HANDLE, HWND},
    System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    },
    UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
};

use super::{ActiveWindowData, WindowManager, UNKNOWN_PROCESS};

#[tracing::instrument]
pub fn get_active() -> Result<ActiveWindowData> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        return Err(anyhow!("No foreground window"));
    }

    let mut text: [u16; 4096] = [0; 4096];
    let title = unsafe { get_window_title(window, &mut text) };
    if title.is_empty() {
        return Err(anyhow!("Foreground window has no title"));
    }

    let mut id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut id)) };
    let process_name = match get_process_name(id, &mut text) {
        Ok(name) => name,
        Err(e) => {
            debug!("Failed to resolve process {id}: {e:?}");
            UNKNOWN_PROCESS.to_string()
        }
    };

    Ok(ActiveWindowData {
        window_title: title,
        process_name,
        window_id: window.0 as usize as u64,
    })
}

fn get_process_name(id: u32, text: &mut [u16]) -> Result<String> {
    if id == 0 {
        return Err(anyhow!("Window has no owning process"));
    }
    let process_handle =
        unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), id) }?;

    let path = unsafe { get_window_process_path(process_handle, text) };
    unsafe { CloseHandle(process_handle) }?;

    let path = path?;
    Path::new(&path)
        .file_name()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string())
        .ok_or_else(|| anyhow!("Process path {path} has no file name"))
}

unsafe fn get_window_process_path(process_handle: HANDLE, text: &mut [u16]) -> Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

unsafe fn get_window_title(window_handle: HWND, text: &mut [u16]) -> String {
    let len = unsafe { GetWindowTextW(window_handle, text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

#[derive(Default)]
pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl WindowManager for WindowsWindowManager {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData> {
        get_active()
    }
}
