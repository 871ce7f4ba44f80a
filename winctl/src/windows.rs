use {
    anyhow::bail,
    std::ffi::c_void,
    tracing::debug,
    windows_sys::Win32::{
        Foundation::GetLastError,
        UI::{
            HiDpi::{SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2},
            WindowsAndMessaging::{IsIconic, SetForegroundWindow, ShowWindow, SW_RESTORE},
        },
    },
};

pub struct Context {}

impl Context {
    pub fn new() -> anyhow::Result<Self> {
        // Window geometry and captures must agree on physical pixels.
        let ret = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) };
        if ret == 0 {
            let error = unsafe { GetLastError() };
            debug!("dpi awareness was not changed (error code: {})", error);
        }
        Ok(Self {})
    }

    pub fn activate_window(&self, window: &crate::Window) -> anyhow::Result<()> {
        // xcap returns HWND pointer as window id.
        let hwnd = window.id() as *mut c_void;
        unsafe {
            if IsIconic(hwnd) != 0 {
                ShowWindow(hwnd, SW_RESTORE);
            }
        }
        let ret = unsafe { SetForegroundWindow(hwnd) };
        if ret == 0 {
            let error = unsafe { GetLastError() };
            bail!("failed to activate window (error code: {})", error);
        }
        Ok(())
    }
}
