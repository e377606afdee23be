//! Layout of the settings screens.

use tsundoku_core::settings::keys;

/// Key of the top-level settings screen.
pub const ROOT: &str = "root";

/// One settings screen: its own items plus links to nested screens.
#[derive(Debug, PartialEq, Eq)]
pub struct Section {
    pub key: &'static str,
    pub title: &'static str,
    pub items: &'static [&'static str],
    pub children: &'static [&'static str],
}

impl Section {
    pub fn contains(&self, key: &str) -> bool {
        self.items.contains(&key)
    }
}

pub static SECTIONS: &[Section] = &[
    Section {
        key: ROOT,
        title: "Settings",
        items: &[keys::COLOR_THEME, keys::APP_LOCK],
        children: &["library", "downloads", "privacy", "advanced"],
    },
    Section {
        key: "library",
        title: "Library",
        items: &[
            keys::SETTINGS_FOLDER,
            keys::SD_STORAGE_URI,
            keys::ADD_NO_MEDIA_FILE,
            keys::REFRESH_LIBRARY,
            keys::EXPORT_LIBRARY,
            keys::IMPORT_LIBRARY,
            keys::DELETE_ALL_EXCEPT_FAVS,
        ],
        children: &[],
    },
    Section {
        key: "downloads",
        title: "Downloads",
        items: &[keys::DL_THREADS_QUANTITY_LISTS],
        children: &[],
    },
    Section {
        key: "privacy",
        title: "Privacy",
        items: &[keys::APP_PREVIEW, keys::ANALYTICS],
        children: &[],
    },
    Section {
        key: "advanced",
        title: "Advanced",
        items: &[keys::CHECK_UPDATE_MANUAL],
        children: &[],
    },
];

pub fn root() -> &'static Section {
    &SECTIONS[0]
}

pub fn find(key: &str) -> Option<&'static Section> {
    SECTIONS.iter().find(|s| s.key == key)
}
