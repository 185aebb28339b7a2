//! Renderers.
//!
//! A renderer reads the store, projects records into view models, and turns
//! user actions into validated store mutations. Views are always rebuilt from
//! a fresh store read; every action returns the whole re-rendered view that
//! owns the mutated entity kind together with the notification to show.

pub mod admin;
pub mod catalog;
pub mod format;

use serde::Deserialize;

use crate::notify::Notification;

/// A freshly rendered view plus the notification produced by the action.
#[derive(Debug, Clone)]
pub struct Rendered<V> {
    pub view: V,
    pub notification: Option<Notification>,
}

impl<V> Rendered<V> {
    pub fn new(view: V, notification: Notification) -> Self {
        Self {
            view,
            notification: Some(notification),
        }
    }

    pub fn silent(view: V) -> Self {
        Self {
            view,
            notification: None,
        }
    }
}

/// Whether the user confirmed a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Query parameters of destructive endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

impl From<ConfirmQuery> for Confirmation {
    fn from(query: ConfirmQuery) -> Self {
        if query.confirm {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}
