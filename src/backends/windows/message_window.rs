//! Raw Input mice through a message-only window.
//!
//! A dedicated thread owns a hidden `HWND_MESSAGE` window registered for
//! generic-desktop mice with `RIDEV_INPUTSINK | RIDEV_DEVNOTIFY`, so input
//! keeps flowing when the game window is not focused and arrivals/removals
//! show up as `WM_INPUT_DEVICE_CHANGE`.
//!
//! The window procedure copies each packet into a byte buffer and hands it to
//! the portable decoder in [`raw_input`](crate::backends::raw_input); the
//! decoded events go straight into the hub's ingest handle. After every
//! `WM_INPUT` the rest of the queue is drained with `GetRawInputBuffer`, which
//! keeps high-rate mice from flooding the message loop.
//!
//! A process can have only one window per Raw Input usage. A host window that
//! registers mice for itself takes them away from ours, so a timer on the
//! pump thread checks the registration and takes it back.

use crate::backends::raw_input::{
    decode_mouse, mouse_registration, HeaderLayout, MouseRegistration, RawInputRecords,
    HID_USAGE_GENERIC_MOUSE, HID_USAGE_PAGE_GENERIC,
};
use crate::device::InputBackend;
use crate::error::BackendError;
use crate::event::{DeviceEvent, DeviceHandle};
use crate::hub::HubIngest;

use core::ffi::c_void;
use std::cell::RefCell;
use std::mem::{size_of, zeroed};
use std::ptr::{null, null_mut};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_CLASS_ALREADY_EXISTS, HWND, LPARAM, LRESULT, WPARAM,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Threading::{GetCurrentProcess, IsWow64Process};
use windows_sys::Win32::UI::Input::{
    GetRawInputBuffer, GetRawInputData, GetRegisteredRawInputDevices, RegisterRawInputDevices,
    RAWINPUT, RAWINPUTDEVICE, RAWINPUTHEADER, RIDEV_DEVNOTIFY, RIDEV_INPUTSINK, RID_INPUT,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, KillTimer,
    PostMessageW, PostQuitMessage, RegisterClassExW, SetTimer, TranslateMessage, UnregisterClassW,
    HWND_MESSAGE, MSG, WM_CLOSE, WM_DESTROY, WM_INPUT, WM_TIMER, WNDCLASSEXW,
};

// Local constants (avoid relying on module exports that vary by windows-sys version)
const WM_INPUT_DEVICE_CHANGE: u32 = 0x00FE;
const GIDC_ARRIVAL: usize = 1;
const GIDC_REMOVAL: usize = 2;

const WINDOW_CLASS: &str = "MultimouseRawInputWindow";

const REGISTRATION_TIMER: usize = 1;
const REGISTRATION_CHECK_MS: u32 = 250;

/// 8 KiB, 8-byte aligned (`GetRawInputBuffer` requires pointer alignment).
const DRAIN_WORDS: usize = 1024;

struct Pump {
    sink: HubIngest,
    buffered: HeaderLayout,
    drain: Vec<u64>,
}

thread_local! {
    static PUMP: RefCell<Option<Pump>> = const { RefCell::new(None) };
}

/// Raw Input backend. Start it through [`DeviceHub::attach`](crate::hub::DeviceHub::attach).
#[derive(Default)]
pub struct RawInputBackend {
    /// Window handle as an integer (`HWND` is not `Send`).
    hwnd: Option<isize>,
    thread: Option<JoinHandle<()>>,
}

impl RawInputBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputBackend for RawInputBackend {
    fn name(&self) -> &'static str {
        "rawinput"
    }

    fn start(&mut self, sink: HubIngest) -> Result<(), BackendError> {
        if self.thread.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<isize, String>>(1);

        let thread = thread::Builder::new()
            .name("rawinput".to_string())
            .spawn(move || run_message_loop(sink, ready_tx))
            .map_err(|source| BackendError::Thread {
                backend: "rawinput",
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok(hwnd)) => {
                self.hwnd = Some(hwnd);
                self.thread = Some(thread);
                info!("raw input window ready");
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(BackendError::Init {
                    backend: "rawinput",
                    reason,
                })
            }
            Err(_) => {
                let _ = thread.join();
                Err(BackendError::Init {
                    backend: "rawinput",
                    reason: "window thread exited before reporting".into(),
                })
            }
        }
    }

    fn stop(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            // SAFETY: posting to a window owned by our thread; a stale handle
            // makes the call fail harmlessly.
            unsafe {
                PostMessageW(hwnd as HWND, WM_CLOSE, 0, 0);
            }
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("raw input thread panicked");
            }
        }
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn is_wow64() -> bool {
    let mut wow: i32 = 0;
    // SAFETY: pseudo-handle for the current process, valid out pointer.
    let ok = unsafe { IsWow64Process(GetCurrentProcess(), &mut wow) };
    ok != 0 && wow != 0
}

fn run_message_loop(sink: HubIngest, ready: crossbeam_channel::Sender<Result<isize, String>>) {
    let class_name = wide(WINDOW_CLASS);

    // SAFETY: plain Win32 window setup on the thread that will own the window.
    let hwnd = match unsafe { create_window(&class_name) } {
        Ok(hwnd) => hwnd,
        Err(reason) => {
            let _ = ready.send(Err(reason));
            return;
        }
    };

    // SAFETY: `hwnd` was created above on this thread.
    if let Err(reason) = unsafe { register_mice(hwnd) } {
        unsafe {
            DestroyWindow(hwnd);
        }
        let _ = ready.send(Err(reason));
        return;
    }

    // SAFETY: `hwnd` is owned by this thread; the timer dies with the window.
    if unsafe { SetTimer(hwnd, REGISTRATION_TIMER, REGISTRATION_CHECK_MS, None) } == 0 {
        warn!("SetTimer failed, raw input registration will not be re-checked");
    }

    let buffered = HeaderLayout::buffered(is_wow64());
    debug!(?buffered, "raw input buffer layout");
    PUMP.with(|p| {
        *p.borrow_mut() = Some(Pump {
            sink,
            buffered,
            drain: vec![0u64; DRAIN_WORDS],
        })
    });
    let _ = ready.send(Ok(hwnd as isize));

    // SAFETY: standard message pump for a window owned by this thread.
    unsafe {
        let mut msg: MSG = zeroed();
        while GetMessageW(&mut msg, null_mut(), 0, 0) > 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        UnregisterClassW(class_name.as_ptr(), GetModuleHandleW(null()));
    }

    PUMP.with(|p| p.borrow_mut().take());
    info!("raw input thread exiting");
}

unsafe fn create_window(class_name: &[u16]) -> Result<HWND, String> {
    let hinstance = GetModuleHandleW(null());

    let mut class: WNDCLASSEXW = zeroed();
    class.cbSize = size_of::<WNDCLASSEXW>() as u32;
    class.lpfnWndProc = Some(window_proc);
    class.hInstance = hinstance;
    class.lpszClassName = class_name.as_ptr();

    if RegisterClassExW(&class) == 0 {
        let err = GetLastError();
        if err != ERROR_CLASS_ALREADY_EXISTS {
            return Err(format!("RegisterClassExW failed (error {err})"));
        }
    }

    let title = wide("multimouse raw input");
    let hwnd = CreateWindowExW(
        0,
        class_name.as_ptr(),
        title.as_ptr(),
        0,
        0,
        0,
        0,
        0,
        HWND_MESSAGE,
        null_mut(),
        hinstance,
        null(),
    );
    if hwnd.is_null() {
        return Err(format!("CreateWindowExW failed (error {})", GetLastError()));
    }
    Ok(hwnd)
}

unsafe fn register_mice(hwnd: HWND) -> Result<(), String> {
    let device = RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: HID_USAGE_GENERIC_MOUSE,
        dwFlags: RIDEV_INPUTSINK | RIDEV_DEVNOTIFY,
        hwndTarget: hwnd,
    };
    if RegisterRawInputDevices(&device, 1, size_of::<RAWINPUTDEVICE>() as u32) == 0 {
        return Err(format!(
            "RegisterRawInputDevices failed (error {})",
            GetLastError()
        ));
    }
    Ok(())
}

/// Take the mouse registration back if another window claimed it.
unsafe fn ensure_registration(hwnd: HWND) {
    let entry = size_of::<RAWINPUTDEVICE>() as u32;
    let mut count = 0u32;
    GetRegisteredRawInputDevices(null_mut(), &mut count, entry);

    let mut devices: Vec<RAWINPUTDEVICE> = (0..count).map(|_| zeroed()).collect();
    let listed = if count == 0 {
        0
    } else {
        GetRegisteredRawInputDevices(devices.as_mut_ptr(), &mut count, entry)
    };
    if listed == u32::MAX {
        warn!(error = GetLastError(), "GetRegisteredRawInputDevices failed");
        return;
    }
    devices.truncate(listed as usize);

    let entries = devices
        .iter()
        .map(|d| (d.usUsagePage, d.usUsage, d.hwndTarget as isize));
    match mouse_registration(entries, hwnd as isize) {
        MouseRegistration::Ours => return,
        MouseRegistration::Taken(other) => {
            warn!(other_window = other, "mouse registration taken by another window, registering again")
        }
        MouseRegistration::Missing => warn!("mouse registration missing, registering again"),
    }
    if let Err(reason) = register_mice(hwnd) {
        error!("{reason}");
    }
}

fn emit<I: IntoIterator<Item = DeviceEvent>>(events: I) {
    PUMP.with(|p| {
        if let Some(pump) = p.borrow().as_ref() {
            pump.sink.ingest_all(events);
        }
    });
}

/// Read the packet behind a `WM_INPUT` `lParam`.
unsafe fn read_message_packet(lparam: LPARAM) {
    let header = size_of::<RAWINPUTHEADER>() as u32;
    let handle = lparam as *mut c_void;

    let mut size = 0u32;
    if GetRawInputData(handle, RID_INPUT, null_mut(), &mut size, header) != 0 || size == 0 {
        return;
    }
    let mut buf = vec![0u8; size as usize];
    let copied = GetRawInputData(handle, RID_INPUT, buf.as_mut_ptr().cast(), &mut size, header);
    if copied != size {
        #[cfg(feature = "debug-log")]
        tracing::trace!(copied, size, "short GetRawInputData read");
        return;
    }
    if let Some(packet) = decode_mouse(&buf, HeaderLayout::native()) {
        emit(packet.events());
    }
}

/// Drain whatever is still queued for this thread.
unsafe fn drain_buffer() {
    let header = size_of::<RAWINPUTHEADER>() as u32;
    PUMP.with(|p| {
        let mut guard = p.borrow_mut();
        let Some(pump) = guard.as_mut() else {
            return;
        };
        loop {
            let bytes = pump.drain.len() * size_of::<u64>();
            let mut size = bytes as u32;
            let count = GetRawInputBuffer(pump.drain.as_mut_ptr().cast::<RAWINPUT>(), &mut size, header);
            if count == 0 || count == u32::MAX {
                break;
            }
            // SAFETY: `drain` is a live Vec<u64> of exactly `bytes` bytes.
            let raw = std::slice::from_raw_parts(pump.drain.as_ptr().cast::<u8>(), bytes);
            for record in RawInputRecords::new(raw, count as usize) {
                if let Some(packet) = decode_mouse(record, pump.buffered) {
                    pump.sink.ingest_all(packet.events());
                }
            }
        }
    });
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_INPUT => {
            read_message_packet(lparam);
            drain_buffer();
            // DefWindowProc must see WM_INPUT so the system can free the packet.
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        WM_INPUT_DEVICE_CHANGE => {
            let device = DeviceHandle::pointer(lparam as usize as u64);
            match wparam {
                GIDC_ARRIVAL => emit([DeviceEvent::connected(device)]),
                GIDC_REMOVAL => emit([DeviceEvent::disconnected(device)]),
                other => warn!(wparam = other, "unknown device change"),
            }
            0
        }
        WM_TIMER if wparam == REGISTRATION_TIMER => {
            ensure_registration(hwnd);
            0
        }
        WM_CLOSE => {
            KillTimer(hwnd, REGISTRATION_TIMER);
            DestroyWindow(hwnd);
            0
        }
        WM_DESTROY => {
            PostQuitMessage(0);
            0
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
