//! Random background and music selection.
//!
//! Both selectors rescan their directories on every request and avoid repeating
//! the previous choice whenever there is more than one candidate. The memory of
//! previous choices lives in [`SelectorState`], owned by the caller.

use anyhow::{Context, Result};
use common::{Color, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, VideokeError};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::presenter;
use crate::surface::DisplaySurface;

/// Last selections, used only to avoid immediate repeats
#[derive(Debug, Clone, Default)]
pub struct SelectorState {
    pub last_music: Option<PathBuf>,
    pub last_background: Option<PathBuf>,
}

/// Pick one candidate uniformly, excluding `last` when there is a choice.
pub fn pick_excluding<'a, R: Rng + ?Sized>(
    candidates: &'a [PathBuf],
    last: Option<&Path>,
    rng: &mut R,
) -> Option<&'a PathBuf> {
    if candidates.len() <= 1 {
        return candidates.first();
    }

    let fresh: Vec<&PathBuf> = candidates
        .iter()
        .filter(|path| Some(path.as_path()) != last)
        .collect();

    match fresh.choose(rng) {
        Some(path) => Some(*path),
        None => candidates.choose(rng),
    }
}

/// Picks the next music video
#[derive(Debug, Clone)]
pub struct MusicSelector {
    dirs: Vec<PathBuf>,
}

impl MusicSelector {
    /// `dirs` in scan order; later directories shadow earlier ones
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::scan(&self.dirs, VIDEO_EXTENSIONS)
    }

    /// Choose a video, failing with [`VideokeError::NotFound`] when there is none
    pub fn choose<R: Rng + ?Sized>(
        &self,
        state: &mut SelectorState,
        rng: &mut R,
    ) -> Result<PathBuf, VideokeError> {
        let catalog = self.catalog();
        log::debug!("{} music found", catalog.len());
        if catalog.is_empty() {
            return Err(VideokeError::NotFound("No music found!".to_string()));
        }

        let candidates = catalog.paths();
        let chosen = pick_excluding(&candidates, state.last_music.as_deref(), rng)
            .cloned()
            .ok_or_else(|| VideokeError::NotFound("No music found!".to_string()))?;

        state.last_music = Some(chosen.clone());
        Ok(chosen)
    }
}

/// Picks and draws the background image
#[derive(Debug, Clone)]
pub struct BackgroundSelector {
    dir: PathBuf,
    color: Color,
}

impl BackgroundSelector {
    pub fn new(dir: PathBuf, color: Color) -> Self {
        Self { dir, color }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::scan(&[&self.dir], IMAGE_EXTENSIONS)
    }

    /// Choose a background and draw it on `surface`.
    ///
    /// Returns `Ok(None)` without touching the surface when there are no
    /// backgrounds to choose from.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        surface: &mut dyn DisplaySurface,
        state: &mut SelectorState,
        rng: &mut R,
    ) -> Result<Option<PathBuf>> {
        let catalog = self.catalog();
        if catalog.is_empty() {
            log::debug!("No backgrounds in {}", self.dir.display());
            return Ok(None);
        }

        let candidates = catalog.paths();
        let Some(chosen) = pick_excluding(&candidates, state.last_background.as_deref(), rng) else {
            return Ok(None);
        };

        let image = presenter::load_image(chosen)
            .with_context(|| format!("Failed to load background: {}", chosen.display()))?;

        surface.fill(self.color);
        presenter::blit_fitted(surface, image)?;

        log::debug!("Background: {}", chosen.display());
        state.last_background = Some(chosen.clone());
        Ok(Some(chosen.clone()))
    }
}
