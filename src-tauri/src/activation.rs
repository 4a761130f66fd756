//! Enable/disable of per-file tab coloring and the persisted activation flag.
//!
//! The focus subscription is an owned value: [`enable`] hands it to the
//! caller, which keeps it until it passes it back into [`disable`].

use std::fmt;
use std::sync::Mutex;

use tracing::{error, info};

use crate::api::{ColorCustomizations, TabColor};
use crate::host::{EditorHost, HostError};
use crate::palette::{self, Color};
use crate::store::{JsonStore, StoreError};

pub const ACTIVATION_KEY: &str = "rainbow-tabs.isActive";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activation {
    #[default]
    Active,
    Inactive,
}

impl Activation {
    pub fn from_flag(active: bool) -> Self {
        if active {
            Activation::Active
        } else {
            Activation::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Activation::Active
    }
}

/// Reads the persisted flag. A store that has never been written (first run)
/// reads as [`Activation::Active`].
pub fn load_activation(store: &JsonStore) -> Activation {
    store
        .get::<bool>(ACTIVATION_KEY)
        .map(Activation::from_flag)
        .unwrap_or_default()
}

pub fn persist_activation(store: &mut JsonStore, activation: Activation) -> Result<(), StoreError> {
    store.update(ACTIVATION_KEY, &activation.is_active())
}

/// Where [`enable`] and [`disable`] record the activation flag.
pub trait ActivationStore {
    fn persist(&mut self, activation: Activation) -> Result<(), StoreError>;
}

impl ActivationStore for JsonStore {
    fn persist(&mut self, activation: Activation) -> Result<(), StoreError> {
        persist_activation(self, activation)
    }
}

/// Locks only for the duration of the write, so the host is never called
/// while the store is held.
impl ActivationStore for &Mutex<JsonStore> {
    fn persist(&mut self, activation: Activation) -> Result<(), StoreError> {
        let mut store = self.lock().expect("activation store lock poisoned");
        persist_activation(&mut store, activation)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("failed to persist activation state: {0}")]
    State(#[from] StoreError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Failure from [`enable`] or [`disable`]. Carries back whatever subscription
/// is still live so the caller does not lose ownership of it.
pub struct SubscriptionError<S> {
    pub subscription: Option<S>,
    pub source: ToggleError,
}

impl<S> SubscriptionError<S> {
    fn new(subscription: Option<S>, source: impl Into<ToggleError>) -> Self {
        Self {
            subscription,
            source: source.into(),
        }
    }
}

impl<S> fmt::Debug for SubscriptionError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionError")
            .field("subscribed", &self.subscription.is_some())
            .field("source", &self.source)
            .finish()
    }
}

impl<S> fmt::Display for SubscriptionError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl<S> std::error::Error for SubscriptionError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Recolors the tabs for `path`. No focused document means no change.
pub fn apply_for_path<H: EditorHost>(
    host: &H,
    path: Option<&str>,
) -> Result<Option<Color>, HostError> {
    let Some(path) = path else {
        return Ok(None);
    };

    let color = palette::color_for_path(path);
    host.apply_tab_colors(ColorCustomizations::uniform(TabColor::Custom(color)))?;
    Ok(Some(color))
}

/// Persists [`Activation::Active`] and, unless `current` already holds a
/// subscription, colors the focused editor and subscribes to focus changes.
///
/// Calling it again with the returned handle is a no-op apart from the
/// persisted flag, so there is never more than one live subscription.
pub fn enable<H: EditorHost, S: ActivationStore>(
    host: &H,
    store: &mut S,
    current: Option<H::Subscription>,
) -> Result<H::Subscription, SubscriptionError<H::Subscription>> {
    if let Err(err) = store.persist(Activation::Active) {
        return Err(SubscriptionError::new(current, err));
    }

    if let Some(existing) = current {
        return Ok(existing);
    }

    let subscription = host.on_focus_change(|host, path| {
        if let Err(err) = apply_for_path(host, path.as_deref()) {
            error!(?err, "failed to recolor tabs after focus change");
        }
    });

    if let Err(err) = apply_for_path(host, host.active_document().as_deref()) {
        return Err(SubscriptionError::new(Some(subscription), err));
    }

    info!("tab coloring enabled");
    Ok(subscription)
}

/// Persists [`Activation::Inactive`], drops the focus subscription if there
/// is one and restores the host's default tab styling. Safe to call while
/// already inactive.
///
/// The subscription is only dropped once the flag is on disk. If the write
/// fails it comes back untouched in the error.
pub fn disable<H: EditorHost, S: ActivationStore>(
    host: &H,
    store: &mut S,
    current: Option<H::Subscription>,
) -> Result<(), SubscriptionError<H::Subscription>> {
    if let Err(err) = store.persist(Activation::Inactive) {
        return Err(SubscriptionError::new(current, err));
    }

    if let Some(subscription) = current {
        host.unsubscribe(subscription);
    }

    if let Err(err) = host.apply_tab_colors(ColorCustomizations::reset()) {
        return Err(SubscriptionError::new(None, err));
    }

    info!("tab coloring disabled");
    Ok(())
}
