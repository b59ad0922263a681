use serde::Serialize;

use crate::types::User;
use crate::ui::router::{Route, LOGIN_PATH};

pub const APP_TITLE: &str = "Cyborg Coffeeshop";

pub const COLOR_PALETTE: [&str; 6] = ["red", "blue", "green", "yellow", "purple", "orange"];

/// Avatar color from the first UTF-16 code unit of the name
pub fn pick_palette(name: &str) -> &'static str {
    let code = name.encode_utf16().next().unwrap_or(0) as usize;
    COLOR_PALETTE[code % COLOR_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItem {
    Settings,
    Logout,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Settings => "Settings",
            MenuItem::Logout => "Logout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Avatar {
    /// Signed-in user with a menu
    User {
        name: String,
        palette: &'static str,
        menu: Vec<MenuItem>,
    },
    /// Anonymous visitor; clicking goes to the login page
    Guest { href: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderView {
    pub title: &'static str,
    pub avatar: Avatar,
}

/// Header for a path, or `None` on the login page
pub fn header_for(pathname: &str, user: Option<&User>) -> Option<HeaderView> {
    if Route::resolve(pathname) == Route::Login {
        return None;
    }

    let avatar = match user.and_then(|user| user.full_name.as_deref()) {
        Some(name) if !name.is_empty() => Avatar::User {
            name: name.to_string(),
            palette: pick_palette(name),
            menu: vec![MenuItem::Settings, MenuItem::Logout],
        },
        _ => Avatar::Guest { href: LOGIN_PATH },
    };

    Some(HeaderView {
        title: APP_TITLE,
        avatar,
    })
}
