//! The editor-host seam. The core only needs three things from its host: the
//! path of the focused document, a way to write the tab color settings, and a
//! focus-change subscription. [`TauriHost`] provides them on top of the Tauri
//! event bus and the managed [`AppState`].

use tauri::{AppHandle, Emitter, EventId, Listener, Manager, Runtime};
use tracing::{debug, error};

use crate::api::{ColorCustomizations, FocusChangedPayload};
use crate::store::StoreError;
use crate::AppState;

pub const FOCUS_EVENT: &str = "active-editor-changed";
pub const TAB_COLORS_EVENT: &str = "tab-colors-changed";
pub const COLOR_CUSTOMIZATIONS_SECTION: &str = "workbench.colorCustomizations";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to write global settings: {0}")]
    Settings(#[from] StoreError),
    #[error("failed to emit tab color event: {0}")]
    Emit(#[from] tauri::Error),
}

pub trait EditorHost: Clone + Send + Sync + 'static {
    type Subscription;

    /// Path of the document behind the focused editor, if any.
    fn active_document(&self) -> Option<String>;

    /// Writes both tab color keys at global scope.
    fn apply_tab_colors(&self, colors: ColorCustomizations) -> Result<(), HostError>;

    /// Calls `handler` with the newly focused path on every focus change until
    /// the returned subscription is passed to [`EditorHost::unsubscribe`].
    fn on_focus_change<F>(&self, handler: F) -> Self::Subscription
    where
        F: Fn(&Self, Option<String>) + Send + Sync + 'static;

    fn unsubscribe(&self, subscription: Self::Subscription);
}

/// Handle of a focus listener registered on the Tauri event bus.
#[derive(Debug, PartialEq, Eq)]
pub struct FocusListener(EventId);

pub struct TauriHost<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriHost<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> Clone for TauriHost<R> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<R: Runtime> EditorHost for TauriHost<R> {
    type Subscription = FocusListener;

    fn active_document(&self) -> Option<String> {
        let state = self.app.try_state::<AppState>()?;
        state.active_document()
    }

    fn apply_tab_colors(&self, colors: ColorCustomizations) -> Result<(), HostError> {
        if let Some(state) = self.app.try_state::<AppState>() {
            let mut settings = state.get_settings();
            settings.update(COLOR_CUSTOMIZATIONS_SECTION, &colors)?;
        }

        debug!(color = %colors.tabs_border, "applying tab colors");
        self.app.emit(TAB_COLORS_EVENT, colors)?;
        Ok(())
    }

    fn on_focus_change<F>(&self, handler: F) -> Self::Subscription
    where
        F: Fn(&Self, Option<String>) + Send + Sync + 'static,
    {
        let host = self.clone();
        let id = self.app.listen_any(FOCUS_EVENT, move |event| {
            if let Some(payload) = parse_focus_payload(event.payload()) {
                handler(&host, payload.path);
            }
        });
        FocusListener(id)
    }

    fn unsubscribe(&self, subscription: Self::Subscription) {
        self.app.unlisten(subscription.0);
    }
}

/// Keeps [`AppState`]'s notion of the focused document current. Installed
/// once at startup, independent of whether coloring is enabled.
pub fn track_active_editor<R: Runtime>(app: AppHandle<R>) {
    let handle = app.clone();

    app.listen_any(FOCUS_EVENT, move |event| {
        handle_focus_payload(&handle, event.payload());
    });
}

pub fn handle_focus_payload<R: Runtime>(handle: &AppHandle<R>, payload: &str) {
    let Some(payload) = parse_focus_payload(payload) else {
        return;
    };

    if let Some(state) = handle.try_state::<AppState>() {
        state.set_active_document(payload.path);
    }
}

fn parse_focus_payload(payload: &str) -> Option<FocusChangedPayload> {
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(payload) => Some(payload),
        Err(err) => {
            error!(?err, "failed to parse {FOCUS_EVENT} payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_focus_payload_ignores_empty_and_malformed_input() {
        assert_eq!(parse_focus_payload(""), None);
        assert_eq!(parse_focus_payload("not json"), None);
    }

    #[test]
    fn parse_focus_payload_reads_path() {
        let payload = parse_focus_payload(r#"{"path":"/a/b.rs"}"#).expect("parse payload");
        assert_eq!(payload.path.as_deref(), Some("/a/b.rs"));

        let payload = parse_focus_payload(r#"{"path":null}"#).expect("parse payload");
        assert_eq!(payload.path, None);
    }
}
