//! Ownership-tagged handles from script objects to volumes.
//!
//! A handle either owns what it points at (volumes created by a script, or
//! a merged snapshot) or borrows a layer volume from the host image. Only
//! owned storage is released when the script object is finalized; borrowed
//! handles re-resolve their layer on every access and fail with
//! `StaleHandle` once the layer or image is gone.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::voxel::{Image, Layer, LayerId, Volume};

/// Counters for script-visible handles, used to check finalization.
#[derive(Debug, Default)]
pub struct BridgeStats {
    live_owned: Cell<usize>,
    finalized_owned: Cell<usize>,
    finalized_borrowed: Cell<usize>,
}

impl BridgeStats {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Owned handles currently reachable from scripts (not yet finalized)
    pub fn live_owned(&self) -> usize {
        self.live_owned.get()
    }

    /// Owned handles released by the finalization hook
    pub fn finalized_owned(&self) -> usize {
        self.finalized_owned.get()
    }

    /// Borrowed handles dropped without touching host storage
    pub fn finalized_borrowed(&self) -> usize {
        self.finalized_borrowed.get()
    }

    pub(crate) fn on_created(&self, owned: bool) {
        if owned {
            self.live_owned.set(self.live_owned.get() + 1);
        }
    }

    pub(crate) fn on_finalized(&self, owned: bool) {
        if owned {
            self.live_owned.set(self.live_owned.get().saturating_sub(1));
            self.finalized_owned.set(self.finalized_owned.get() + 1);
        } else {
            self.finalized_borrowed.set(self.finalized_borrowed.get() + 1);
        }
    }
}

/// Non-owning reference to the host image.
#[derive(Clone, Debug)]
pub struct ImageRef(Weak<RefCell<Image>>);

impl ImageRef {
    pub fn new(image: &Rc<RefCell<Image>>) -> Self {
        Self(Rc::downgrade(image))
    }

    fn upgrade(&self) -> Result<Rc<RefCell<Image>>> {
        self.0
            .upgrade()
            .ok_or_else(|| Error::StaleHandle("image has been closed".to_string()))
    }

    pub fn read<R>(&self, f: impl FnOnce(&Image) -> R) -> Result<R> {
        let image = self.upgrade()?;
        let guard = image
            .try_borrow()
            .map_err(|_| Error::Busy("image".to_string()))?;
        Ok(f(&guard))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Image) -> R) -> Result<R> {
        let image = self.upgrade()?;
        let mut guard = image
            .try_borrow_mut()
            .map_err(|_| Error::Busy("image".to_string()))?;
        Ok(f(&mut guard))
    }
}

/// Non-owning reference to one layer of the host image.
#[derive(Clone, Debug)]
pub struct LayerRef {
    image: ImageRef,
    layer: LayerId,
}

impl LayerRef {
    pub fn new(image: ImageRef, layer: LayerId) -> Self {
        Self { image, layer }
    }

    pub fn id(&self) -> LayerId {
        self.layer
    }

    fn stale(&self) -> Error {
        Error::StaleHandle(format!("layer {} no longer exists", self.layer.0))
    }

    pub fn read<R>(&self, f: impl FnOnce(&Layer) -> R) -> Result<R> {
        self.image
            .read(|image| image.layer(self.layer).map(f))?
            .ok_or_else(|| self.stale())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Layer) -> R) -> Result<R> {
        self.image
            .write(|image| image.layer_mut(self.layer).map(f))?
            .ok_or_else(|| self.stale())
    }
}

/// What a script volume object refers to.
#[derive(Debug)]
pub enum VolumeHandle {
    /// Created by the script (`Volume()`, `copy()`); freed on finalization.
    Owned(RefCell<Volume>),
    /// Merged view of the image layers; read-only, freed on finalization.
    Merged(Rc<Volume>),
    /// A layer's volume, owned by the host image.
    Borrowed(LayerRef),
}

impl VolumeHandle {
    /// True if finalizing the script object releases the storage
    pub fn is_owned(&self) -> bool {
        !matches!(self, VolumeHandle::Borrowed(_))
    }

    pub fn read<R>(&self, f: impl FnOnce(&Volume) -> R) -> Result<R> {
        match self {
            VolumeHandle::Owned(volume) => {
                let guard = volume
                    .try_borrow()
                    .map_err(|_| Error::Busy("volume".to_string()))?;
                Ok(f(&guard))
            }
            VolumeHandle::Merged(volume) => Ok(f(volume)),
            VolumeHandle::Borrowed(layer) => layer.read(|l| f(l.volume())),
        }
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Volume) -> R) -> Result<R> {
        match self {
            VolumeHandle::Owned(volume) => {
                let mut guard = volume
                    .try_borrow_mut()
                    .map_err(|_| Error::Busy("volume".to_string()))?;
                Ok(f(&mut guard))
            }
            VolumeHandle::Merged(_) => Err(Error::ReadOnly("merged layers volume".to_string())),
            VolumeHandle::Borrowed(layer) => layer.write(|l| f(l.volume_mut())),
        }
    }

    /// Independent copy of the current content, taken without holding any
    /// borrow afterwards.
    pub fn snapshot(&self) -> Result<Volume> {
        self.read(Volume::copy)
    }
}
