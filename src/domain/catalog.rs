//! Premium theme catalog.
//!
//! The catalog is shipped with the binary: theme assets live in the
//! extension, this service only needs the IDs to resolve entitlements.

use once_cell::sync::Lazy;

use crate::domain::foundation::ThemeId;

/// Premium theme IDs, in display order.
pub static PREMIUM_THEMES: Lazy<Vec<ThemeId>> = Lazy::new(|| {
    [
        "midnight-aurora",
        "solar-flare",
        "deep-ocean",
        "sakura-drift",
        "neon-grid",
        "forest-canopy",
        "desert-dusk",
        "arctic-glass",
        "velvet-noir",
        "citrus-pop",
    ]
    .iter()
    .map(|slug| ThemeId::new(*slug).expect("catalog slugs are non-empty"))
    .collect()
});

/// True if the theme is part of the premium catalog.
pub fn is_premium(theme: &ThemeId) -> bool {
    PREMIUM_THEMES.iter().any(|t| t == theme)
}
