//! Stage kinds and the fixed execution order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of asset a stage processes.
///
/// Variants are declared in execution order; [`StageKind::ORDER`] is the
/// single source of truth for that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Localization tables.
    I18n,
    /// Raster images.
    Image,
    /// Web fonts.
    Font,
    /// Vector graphics.
    Vector,
    /// Video files.
    Video,
    /// Audio files.
    Audio,
    /// Stylesheets.
    Stylesheet,
    /// Scripts.
    Script,
    /// Markup pages.
    Markup,
    /// Copy from the source tree into the output tree.
    Copy,
    /// Move within the output tree.
    Move,
    /// Delete from the output tree.
    Delete,
}

impl StageKind {
    /// Every stage kind, in execution order.
    ///
    /// Markup runs after stylesheet and script so it can inline their
    /// artifacts; the filesystem stages run last so they see the full output.
    pub const ORDER: [Self; 12] = [
        Self::I18n,
        Self::Image,
        Self::Font,
        Self::Vector,
        Self::Video,
        Self::Audio,
        Self::Stylesheet,
        Self::Script,
        Self::Markup,
        Self::Copy,
        Self::Move,
        Self::Delete,
    ];

    /// Returns the canonical configuration key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::I18n => "i18n",
            Self::Image => "image",
            Self::Font => "font",
            Self::Vector => "vector",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Markup => "markup",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
        }
    }

    /// Returns the alternate configuration keys accepted for this kind.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::I18n => &["locale"],
            Self::Image => &["img"],
            Self::Font => &["fonts"],
            Self::Vector => &["svg"],
            Self::Stylesheet => &["less", "css"],
            Self::Script => &["js"],
            Self::Markup => &["html"],
            Self::Video | Self::Audio | Self::Copy | Self::Move | Self::Delete => &[],
        }
    }

    /// Looks up a kind by configuration key or alias.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|kind| kind.key() == key || kind.aliases().contains(&key))
    }

    /// Returns the shared-context namespace this kind publishes into.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        self.key()
    }

    /// Returns the position of this kind in [`StageKind::ORDER`].
    #[must_use]
    pub fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(Self::ORDER.len())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown stage kind '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_declaration() {
        let mut sorted = StageKind::ORDER;
        sorted.sort();
        assert_eq!(sorted, StageKind::ORDER);
    }

    #[test]
    fn test_markup_after_producers() {
        let markup = StageKind::Markup.position();
        for producer in [
            StageKind::I18n,
            StageKind::Vector,
            StageKind::Stylesheet,
            StageKind::Script,
        ] {
            assert!(producer.position() < markup, "{producer} must precede markup");
        }
        assert!(StageKind::Copy.position() > markup);
        assert_eq!(StageKind::Delete.position(), StageKind::ORDER.len() - 1);
    }

    #[test]
    fn test_from_key_and_aliases() {
        assert_eq!(StageKind::from_key("markup"), Some(StageKind::Markup));
        assert_eq!(StageKind::from_key("html"), Some(StageKind::Markup));
        assert_eq!(StageKind::from_key("less"), Some(StageKind::Stylesheet));
        assert_eq!(StageKind::from_key("css"), Some(StageKind::Stylesheet));
        assert_eq!(StageKind::from_key("js"), Some(StageKind::Script));
        assert_eq!(StageKind::from_key("img"), Some(StageKind::Image));
        assert_eq!(StageKind::from_key("svg"), Some(StageKind::Vector));
        assert_eq!(StageKind::from_key("sass"), None);
        assert_eq!(StageKind::from_key("src"), None);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(StageKind::Stylesheet.to_string(), "stylesheet");
        assert_eq!("delete".parse::<StageKind>(), Ok(StageKind::Delete));
        assert!("nope".parse::<StageKind>().is_err());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&StageKind::I18n).unwrap();
        assert_eq!(json, r#""i18n""#);
    }
}
