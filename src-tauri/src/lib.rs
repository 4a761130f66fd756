use std::sync::{Mutex, MutexGuard};

use tauri::{AppHandle, Manager, Runtime};
use tracing::warn;

pub mod activation;
pub mod api;
pub mod host;
pub mod palette;
pub mod store;

use activation::{Activation, SubscriptionError, ToggleError};
use host::{FocusListener, TauriHost};
use store::JsonStore;

/// Shared extension state. Every field sits behind its own lock and none of
/// them is held while the host emits, so Rust listeners on the tab color
/// event may read the state back. `toggle` serializes [`AppState::enable`]
/// and [`AppState::disable`]; calling either from such a listener blocks.
pub struct AppState {
    global_state: Mutex<JsonStore>,
    settings: Mutex<JsonStore>,
    active_document: Mutex<Option<String>>,
    focus_listener: Mutex<Option<FocusListener>>,
    toggle: Mutex<()>,
}

impl AppState {
    pub fn new() -> Self {
        let global_state = store::open_state().unwrap_or_else(|err| {
            warn!(?err, "failed to load extension state, keeping it in memory");
            JsonStore::in_memory()
        });
        let settings = store::open_settings().unwrap_or_else(|err| {
            warn!(?err, "failed to load global settings, keeping them in memory");
            JsonStore::in_memory()
        });
        Self::with_stores(global_state, settings)
    }

    pub fn with_stores(global_state: JsonStore, settings: JsonStore) -> Self {
        Self {
            global_state: Mutex::new(global_state),
            settings: Mutex::new(settings),
            active_document: Mutex::new(None),
            focus_listener: Mutex::new(None),
            toggle: Mutex::new(()),
        }
    }

    pub fn get_global_state(&self) -> MutexGuard<'_, JsonStore> {
        self.global_state.lock().expect("global state lock poisoned")
    }

    pub fn get_settings(&self) -> MutexGuard<'_, JsonStore> {
        self.settings.lock().expect("settings lock poisoned")
    }

    pub fn active_document(&self) -> Option<String> {
        self.active_document
            .lock()
            .expect("active document lock poisoned")
            .clone()
    }

    pub fn set_active_document(&self, path: Option<String>) {
        *self
            .active_document
            .lock()
            .expect("active document lock poisoned") = path;
    }

    pub fn activation(&self) -> Activation {
        activation::load_activation(&self.get_global_state())
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener_slot().is_some()
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<FocusListener>> {
        self.focus_listener
            .lock()
            .expect("focus listener lock poisoned")
    }

    pub fn enable<R: Runtime>(&self, host: &TauriHost<R>) -> Result<(), ToggleError> {
        let _toggle = self.toggle.lock().expect("toggle lock poisoned");
        let current = self.listener_slot().take();
        let mut global_state = &self.global_state;

        match activation::enable(host, &mut global_state, current) {
            Ok(listener) => {
                *self.listener_slot() = Some(listener);
                Ok(())
            }
            Err(SubscriptionError {
                subscription,
                source,
            }) => {
                *self.listener_slot() = subscription;
                Err(source)
            }
        }
    }

    pub fn disable<R: Runtime>(&self, host: &TauriHost<R>) -> Result<(), ToggleError> {
        let _toggle = self.toggle.lock().expect("toggle lock poisoned");
        let current = self.listener_slot().take();
        let mut global_state = &self.global_state;

        activation::disable(host, &mut global_state, current).map_err(
            |SubscriptionError {
                 subscription,
                 source,
             }| {
                *self.listener_slot() = subscription;
                source
            },
        )
    }

    /// Re-enables coloring at startup when the persisted flag says so.
    pub fn restore<R: Runtime>(&self, host: &TauriHost<R>) -> Result<Activation, ToggleError> {
        let activation = self.activation();
        if activation.is_active() {
            self.enable(host)?;
        }
        Ok(activation)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Wires the extension into a Tauri app: tracks the focused editor and
/// restores the persisted activation state.
pub fn setup<R: Runtime>(app: &AppHandle<R>, state: &AppState) {
    host::track_active_editor(app.clone());

    let host = TauriHost::new(app.clone());
    if let Err(err) = state.restore(&host) {
        warn!(?err, "failed to restore tab coloring at startup");
    }
}

pub mod commands {
    use super::*;
    use tauri::State;

    #[tauri::command]
    pub fn activate<R: Runtime>(
        app: AppHandle<R>,
        state: State<'_, AppState>,
    ) -> Result<api::ActivationStatus, String> {
        let host = TauriHost::new(app);
        state.enable(&host).map_err(|err| err.to_string())?;
        Ok(api::ActivationStatus { active: true })
    }

    #[tauri::command]
    pub fn deactivate<R: Runtime>(
        app: AppHandle<R>,
        state: State<'_, AppState>,
    ) -> Result<api::ActivationStatus, String> {
        let host = TauriHost::new(app);
        state.disable(&host).map_err(|err| err.to_string())?;
        Ok(api::ActivationStatus { active: false })
    }

    #[tauri::command]
    pub fn activation_status(state: State<AppState>) -> Result<api::ActivationStatus, String> {
        Ok(api::ActivationStatus {
            active: state.activation().is_active(),
        })
    }

    #[tauri::command]
    pub fn color_for_path(path: String) -> Result<api::ColorPreview, String> {
        Ok(api::ColorPreview {
            index: palette::index_for_path(&path),
            color: palette::color_for_path(&path),
            path,
        })
    }

    #[tauri::command]
    pub fn list_palette() -> Result<Vec<palette::Color>, String> {
        Ok(palette::palette().to_vec())
    }
}

/// Installs the global `tracing` subscriber, filtered by `RUST_LOG` and
/// defaulting to `info`. Fails if a subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(err) = init_tracing() {
        eprintln!("failed to install tracing subscriber: {err}");
    }

    tauri::Builder::default()
        .setup(|app| {
            let handle = app.handle();
            setup(handle, &handle.state::<AppState>());
            Ok(())
        })
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![
            commands::activate,
            commands::deactivate,
            commands::activation_status,
            commands::color_for_path,
            commands::list_palette
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
