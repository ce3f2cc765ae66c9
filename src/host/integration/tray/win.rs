//! Notification area icon built on `Shell_NotifyIconW`. The icon belongs to a hidden window that
//! lives on its own thread, where its messages are pumped.

use std::{cell::RefCell, ffi::c_void, sync::mpsc as std_mpsc, thread::JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error};
use windows::{
    core::{w, HSTRING, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            Shell::{
                Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE,
                NOTIFYICONDATAW,
            },
            WindowsAndMessaging::{
                AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu,
                DestroyWindow, DispatchMessageW, GetCursorPos, GetMessageW, LoadIconW,
                PostMessageW, PostQuitMessage, RegisterClassW, SetForegroundWindow,
                TrackPopupMenu, TranslateMessage, HMENU, IDI_APPLICATION, MF_SEPARATOR,
                MF_STRING, MSG, TPM_BOTTOMALIGN, TPM_RIGHTBUTTON, WINDOW_EX_STYLE, WINDOW_STYLE,
                WM_APP, WM_CLOSE, WM_COMMAND, WM_DESTROY, WM_LBUTTONUP, WM_RBUTTONUP, WNDCLASSW,
            },
        },
    },
};

use super::{TrayAction, TrayBackend, TrayError, TrayMenu, TrayMenuItem};

const CLASS_NAME: PCWSTR = w!("LegalTimeTrackerTray");
const WM_TRAY: u32 = WM_APP + 1;
const ICON_ID: u32 = 1;

/// Everything the window procedure needs. Only touched from the tray thread.
struct TrayState {
    menu: TrayMenu,
    popup: HMENU,
    icon: NOTIFYICONDATAW,
    actions: mpsc::UnboundedSender<TrayAction>,
}

thread_local! {
    static STATE: RefCell<Option<TrayState>> = const { RefCell::new(None) };
}

pub struct WindowsTray {
    /// Raw `HWND` of the hidden window, which isn't `Send` itself.
    window: Option<isize>,
    thread: Option<JoinHandle<()>>,
}

impl WindowsTray {
    pub fn new() -> Self {
        Self {
            window: None,
            thread: None,
        }
    }
}

impl Default for WindowsTray {
    fn default() -> Self {
        Self::new()
    }
}

impl TrayBackend for WindowsTray {
    fn install(
        &mut self,
        menu: &TrayMenu,
        actions: mpsc::UnboundedSender<TrayAction>,
    ) -> Result<(), TrayError> {
        let (ready_sender, ready) = std_mpsc::channel();
        let menu = menu.clone();
        let thread = std::thread::Builder::new()
            .name("tray".into())
            .spawn(move || {
                let window = unsafe { create_tray(menu, actions) };
                let created = window.is_ok();
                let _ = ready_sender.send(window.map(|window| window.0 as isize));
                if created {
                    unsafe { pump_messages() };
                }
                debug!("Tray thread finished");
            })
            .map_err(|e| TrayError::Backend(e.to_string()))?;

        let window = ready
            .recv()
            .map_err(|e| TrayError::Backend(e.to_string()))??;
        self.window = Some(window);
        self.thread = Some(thread);
        Ok(())
    }
}

impl Drop for WindowsTray {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            // The window can only be destroyed by its own thread.
            let closed = unsafe {
                PostMessageW(
                    HWND(window as *mut c_void),
                    WM_CLOSE,
                    WPARAM(0),
                    LPARAM(0),
                )
            };
            if let Err(e) = closed {
                error!("Failed to close tray window {e:?}");
                return;
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn backend(e: windows::core::Error) -> TrayError {
    TrayError::Backend(e.to_string())
}

unsafe fn create_tray(
    menu: TrayMenu,
    actions: mpsc::UnboundedSender<TrayAction>,
) -> Result<HWND, TrayError> {
    let instance: HINSTANCE = GetModuleHandleW(None).map_err(backend)?.into();
    let class = WNDCLASSW {
        lpfnWndProc: Some(window_proc),
        hInstance: instance,
        lpszClassName: CLASS_NAME,
        ..Default::default()
    };
    if RegisterClassW(&class) == 0 {
        return Err(backend(windows::core::Error::from_win32()));
    }

    let window = CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        CLASS_NAME,
        &HSTRING::from(menu.tooltip.as_str()),
        WINDOW_STYLE::default(),
        0,
        0,
        0,
        0,
        None,
        None,
        instance,
        None,
    )
    .map_err(backend)?;

    let popup = match create_popup(&menu) {
        Ok(popup) => popup,
        Err(e) => {
            let _ = DestroyWindow(window);
            return Err(e);
        }
    };

    let mut icon = NOTIFYICONDATAW {
        cbSize: size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: window,
        uID: ICON_ID,
        uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
        uCallbackMessage: WM_TRAY,
        hIcon: LoadIconW(None, IDI_APPLICATION).map_err(backend)?,
        ..Default::default()
    };
    // Last slot stays zero as the terminator.
    let tip_capacity = icon.szTip.len() - 1;
    for (slot, unit) in icon
        .szTip
        .iter_mut()
        .zip(menu.tooltip.encode_utf16().take(tip_capacity))
    {
        *slot = unit;
    }

    if !Shell_NotifyIconW(NIM_ADD, &icon).as_bool() {
        let _ = DestroyMenu(popup);
        let _ = DestroyWindow(window);
        return Err(TrayError::Backend(
            "the shell refused to add the notification icon".into(),
        ));
    }

    STATE.with_borrow_mut(|state| {
        *state = Some(TrayState {
            menu,
            popup,
            icon,
            actions,
        })
    });
    Ok(window)
}

unsafe fn create_popup(menu: &TrayMenu) -> Result<HMENU, TrayError> {
    let popup = CreatePopupMenu().map_err(backend)?;
    for (index, item) in menu.items.iter().enumerate() {
        let appended = match item {
            TrayMenuItem::Action { label, .. } => AppendMenuW(
                popup,
                MF_STRING,
                TrayMenu::command_id(index),
                &HSTRING::from(label.as_str()),
            ),
            TrayMenuItem::Separator => AppendMenuW(popup, MF_SEPARATOR, 0, PCWSTR::null()),
        };
        if let Err(e) = appended {
            let _ = DestroyMenu(popup);
            return Err(backend(e));
        }
    }
    Ok(popup)
}

unsafe fn pump_messages() {
    let mut message = MSG::default();
    // -1 is an error, 0 is WM_QUIT.
    while GetMessageW(&mut message, None, 0, 0).0 > 0 {
        let _ = TranslateMessage(&message);
        DispatchMessageW(&message);
    }
}

fn send_action(action: TrayAction) {
    STATE.with_borrow(|state| {
        if let Some(state) = state {
            if state.actions.send(action).is_err() {
                debug!("Host stopped listening to the tray");
            }
        }
    });
}

unsafe fn show_menu(window: HWND) {
    let Some(popup) = STATE.with_borrow(|state| state.as_ref().map(|state| state.popup)) else {
        return;
    };
    let mut cursor = POINT::default();
    if let Err(e) = GetCursorPos(&mut cursor) {
        error!("Failed to place tray menu {e:?}");
        return;
    }
    // Without it the menu doesn't close when the user clicks elsewhere.
    let _ = SetForegroundWindow(window);
    let _ = TrackPopupMenu(
        popup,
        TPM_RIGHTBUTTON | TPM_BOTTOMALIGN,
        cursor.x,
        cursor.y,
        0,
        window,
        None,
    );
}

unsafe extern "system" fn window_proc(
    window: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match message {
        WM_TRAY => {
            match lparam.0 as u32 {
                WM_LBUTTONUP => send_action(TrayAction::Open),
                WM_RBUTTONUP => show_menu(window),
                _ => {}
            }
            LRESULT(0)
        }
        WM_COMMAND => {
            let command = wparam.0 & 0xffff;
            let action = STATE.with_borrow(|state| {
                state
                    .as_ref()
                    .and_then(|state| state.menu.action(command))
            });
            if let Some(action) = action {
                send_action(action);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            if let Some(state) = STATE.take() {
                let _ = Shell_NotifyIconW(NIM_DELETE, &state.icon);
                let _ = DestroyMenu(state.popup);
            }
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(window, message, wparam, lparam),
    }
}
