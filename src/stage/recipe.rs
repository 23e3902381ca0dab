//! Recipes: which icing pattern goes on which cookie slot.

use core::fmt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use heapless::FnvIndexMap;
use serde::Deserialize;

/// The icing patterns the stage knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Letter D outline.
    DOutline,
    /// Letter U outline.
    UOutline,
    /// Letter K outline.
    KOutline,
    /// Letter E outline.
    EOutline,
    /// Plain square.
    Square,
    /// Square spiralling inward.
    SpiralSquare,
    /// Mascot.
    BlueDevil,
}

impl Pattern {
    /// Every pattern.
    pub const ALL: [Pattern; 7] = [
        Pattern::DOutline,
        Pattern::UOutline,
        Pattern::KOutline,
        Pattern::EOutline,
        Pattern::Square,
        Pattern::SpiralSquare,
        Pattern::BlueDevil,
    ];

    /// Snake-case name, as used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            Pattern::DOutline => "d_outline",
            Pattern::UOutline => "u_outline",
            Pattern::KOutline => "k_outline",
            Pattern::EOutline => "e_outline",
            Pattern::Square => "square",
            Pattern::SpiralSquare => "spiral_square",
            Pattern::BlueDevil => "blue_devil",
        }
    }

    /// Default file name inside the pattern directory.
    pub fn file_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where pattern files live.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    dir: PathBuf,
    overrides: FnvIndexMap<Pattern, PathBuf, 8>,
}

impl PatternLibrary {
    /// Resolve every pattern to `<dir>/<name>.txt`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            overrides: FnvIndexMap::new(),
        }
    }

    /// Use `path` for `pattern` instead of the default file.
    pub fn with_override<P: Into<PathBuf>>(mut self, pattern: Pattern, path: P) -> Self {
        // Eight slots for seven patterns: never full.
        let _ = self.overrides.insert(pattern, path.into());
        self
    }

    /// Directory holding the default files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `pattern`.
    pub fn path(&self, pattern: Pattern) -> PathBuf {
        match self.overrides.get(&pattern) {
            Some(path) => path.clone(),
            None => self.dir.join(pattern.file_name()),
        }
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new("icing_patterns")
    }
}

/// Cookie slot on the platform grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridPos {
    /// Column
    pub gx: i32,
    /// Row
    pub gy: i32,
}

impl GridPos {
    /// Create a grid position.
    #[inline]
    pub const fn new(gx: i32, gy: i32) -> Self {
        Self { gx, gy }
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((gx, gy): (i32, i32)) -> Self {
        Self { gx, gy }
    }
}

/// What to do to one cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSpec {
    /// Icing pattern to draw.
    pub icing: Pattern,
}

impl CookieSpec {
    /// Cookie iced with `icing`.
    pub const fn new(icing: Pattern) -> Self {
        Self { icing }
    }
}

/// Cookies to decorate, keyed by grid slot and visited in grid order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    cookies: BTreeMap<GridPos, CookieSpec>,
}

impl Recipe {
    /// Create an empty recipe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a cookie, replacing any cookie already in that slot.
    ///
    /// Returns the replaced cookie.
    pub fn add_cookie<P: Into<GridPos>>(&mut self, spec: CookieSpec, pos: P) -> Option<CookieSpec> {
        self.cookies.insert(pos.into(), spec)
    }

    /// Remove the cookie in a slot.
    pub fn remove_cookie<P: Into<GridPos>>(&mut self, pos: P) -> Option<CookieSpec> {
        self.cookies.remove(&pos.into())
    }

    /// Cookie in a slot.
    pub fn cookie<P: Into<GridPos>>(&self, pos: P) -> Option<&CookieSpec> {
        self.cookies.get(&pos.into())
    }

    /// Remove every cookie.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the recipe has no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Cookies in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &CookieSpec)> {
        self.cookies.iter().map(|(pos, spec)| (*pos, spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_cookie_overwrites_slot() {
        let mut recipe = Recipe::new();
        assert!(recipe.add_cookie(CookieSpec::new(Pattern::Square), (0, 0)).is_none());
        let old = recipe.add_cookie(CookieSpec::new(Pattern::BlueDevil), (0, 0));

        assert_eq!(old, Some(CookieSpec::new(Pattern::Square)));
        assert_eq!(recipe.len(), 1);
        assert_eq!(recipe.cookie((0, 0)).map(|c| c.icing), Some(Pattern::BlueDevil));
    }

    #[test]
    fn test_iterates_in_grid_order() {
        let mut recipe = Recipe::new();
        recipe.add_cookie(CookieSpec::new(Pattern::Square), (1, 0));
        recipe.add_cookie(CookieSpec::new(Pattern::DOutline), (0, 1));
        recipe.add_cookie(CookieSpec::new(Pattern::UOutline), (0, 0));

        let order: Vec<GridPos> = recipe.iter().map(|(pos, _)| pos).collect();
        assert_eq!(order, vec![GridPos::new(0, 0), GridPos::new(0, 1), GridPos::new(1, 0)]);

        recipe.remove_cookie((0, 1));
        assert_eq!(recipe.len(), 2);
        recipe.clear();
        assert!(recipe.is_empty());
    }

    #[test]
    fn test_pattern_paths() {
        let library = PatternLibrary::new("/srv/patterns")
            .with_override(Pattern::BlueDevil, "/tmp/devil.txt");

        assert_eq!(
            library.path(Pattern::SpiralSquare),
            PathBuf::from("/srv/patterns/spiral_square.txt")
        );
        assert_eq!(library.path(Pattern::BlueDevil), PathBuf::from("/tmp/devil.txt"));
        assert_eq!(Pattern::KOutline.to_string(), "k_outline");
    }
}
