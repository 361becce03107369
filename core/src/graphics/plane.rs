//! Graphics plane: the presentation-state graphics attached to one image
//!
//! Overlays live in an arena owned by the plane. Pools, the shutter
//! collection and the layers refer to them through [`OverlayHandle`]s, and
//! each overlay carries one [`OverlayRole`] saying where it is shown. Moving
//! an overlay between a layer and the shutters only changes that role.

use crate::error::{PresentationStateError, Result};
use crate::graphics::layers::{format_layer_id, LayerCollection, INACTIVE_LAYER_ID};
use crate::graphics::shutters::GeometricShuttersGraphic;
use crate::overlay::OverlayPlaneGraphic;
use crate::types::{OverlayPlaneSource, PointF};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

const POOL_SIZE: usize = 16;

static NEXT_PLANE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a graphics plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneId(u64);

impl PlaneId {
    fn next() -> Self {
        PlaneId(NEXT_PLANE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reference to an overlay owned by a graphics plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle {
    plane: PlaneId,
    index: usize,
}

/// Where an overlay is currently shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayRole {
    /// In a pool only
    Unassigned,
    /// Member of the shutter collection
    Shutter,
    /// Member of the named layer; the empty id is the inactive layer
    Layer(String),
}

/// Overlay pools of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPool {
    /// Overlays read from the image header
    Image,
    /// Overlays read from the presentation state
    PresentationState,
    /// Overlays created by the user
    User,
}

/// A shutter that can be active on a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterRef {
    /// Index into the plane's geometric shutters
    Geometric(usize),
    /// An overlay in the shutter collection
    Bitmap(OverlayHandle),
}

/// Marker shown on an image whose presentation state was not fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMarker {
    pub message: String,
}

#[derive(Debug, Clone)]
struct OverlayEntry {
    graphic: OverlayPlaneGraphic,
    role: OverlayRole,
}

/// Presentation-state graphics of one image
#[derive(Debug)]
pub struct GraphicsPlane {
    id: PlaneId,
    arena: Vec<Option<OverlayEntry>>,
    image_pool: [Option<usize>; POOL_SIZE],
    presentation_pool: [Option<usize>; POOL_SIZE],
    user_pool: Vec<usize>,
    geometric_shutters: Vec<GeometricShuttersGraphic>,
    active_shutter: Option<ShutterRef>,
    layers: LayerCollection,
    error_marker: Option<ErrorMarker>,
}

impl Default for GraphicsPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GraphicsPlane {
    fn clone(&self) -> Self {
        self.deep_copy()
    }
}

impl GraphicsPlane {
    pub fn new() -> Self {
        Self {
            id: PlaneId::next(),
            arena: Vec::new(),
            image_pool: [None; POOL_SIZE],
            presentation_pool: [None; POOL_SIZE],
            user_pool: Vec::new(),
            geometric_shutters: Vec::new(),
            active_shutter: None,
            layers: LayerCollection::new(),
            error_marker: None,
        }
    }

    pub fn id(&self) -> PlaneId {
        self.id
    }

    /// Independent copy under a new plane id
    ///
    /// Handles issued by this plane do not address the copy.
    pub fn deep_copy(&self) -> Self {
        let id = PlaneId::next();
        let active_shutter = self.active_shutter.map(|shutter| match shutter {
            ShutterRef::Bitmap(h) => ShutterRef::Bitmap(OverlayHandle {
                plane: id,
                index: h.index,
            }),
            geometric => geometric,
        });
        Self {
            id,
            arena: self.arena.clone(),
            image_pool: self.image_pool,
            presentation_pool: self.presentation_pool,
            user_pool: self.user_pool.clone(),
            geometric_shutters: self.geometric_shutters.clone(),
            active_shutter,
            layers: self.layers.clone(),
            error_marker: self.error_marker.clone(),
        }
    }

    fn handle(&self, index: usize) -> OverlayHandle {
        OverlayHandle {
            plane: self.id,
            index,
        }
    }

    fn entry(&self, handle: OverlayHandle) -> Result<&OverlayEntry> {
        if handle.plane != self.id {
            return Err(PresentationStateError::ForeignOverlay);
        }
        self.arena
            .get(handle.index)
            .and_then(Option::as_ref)
            .ok_or_else(|| PresentationStateError::InvalidOperation("overlay was removed".into()))
    }

    fn entry_mut(&mut self, handle: OverlayHandle) -> Result<&mut OverlayEntry> {
        if handle.plane != self.id {
            return Err(PresentationStateError::ForeignOverlay);
        }
        self.arena
            .get_mut(handle.index)
            .and_then(Option::as_mut)
            .ok_or_else(|| PresentationStateError::InvalidOperation("overlay was removed".into()))
    }

    fn insert(&mut self, graphic: OverlayPlaneGraphic) -> usize {
        self.arena.push(Some(OverlayEntry {
            graphic,
            role: OverlayRole::Unassigned,
        }));
        self.arena.len() - 1
    }

    fn release(&mut self, index: usize) {
        if self.active_shutter == Some(ShutterRef::Bitmap(self.handle(index))) {
            self.active_shutter = None;
        }
        if let Some(slot) = self.arena.get_mut(index) {
            *slot = None;
        }
    }

    /// Takes an overlay out of whichever pool holds it
    fn leave_pools(&mut self, index: usize) {
        for slot in self.image_pool.iter_mut().chain(self.presentation_pool.iter_mut()) {
            if *slot == Some(index) {
                *slot = None;
            }
        }
        self.user_pool.retain(|&i| i != index);
    }

    /// Puts an overlay into a pool, releasing the overlay it displaces
    fn place(&mut self, pool: OverlayPool, slot: usize, index: usize) {
        self.leave_pools(index);
        let displaced = match pool {
            OverlayPool::Image => self.image_pool[slot].replace(index),
            OverlayPool::PresentationState => self.presentation_pool[slot].replace(index),
            OverlayPool::User => {
                self.user_pool.push(index);
                None
            }
        };
        if let Some(old) = displaced {
            self.release(old);
        }
        if let Some(entry) = self.arena.get_mut(index).and_then(Option::as_mut) {
            if entry.role == OverlayRole::Unassigned {
                entry.role = OverlayRole::Layer(INACTIVE_LAYER_ID.to_string());
            }
        }
    }

    fn slot_of(graphic: &OverlayPlaneGraphic) -> Result<usize> {
        graphic
            .index()
            .map(usize::from)
            .filter(|&n| n < POOL_SIZE)
            .ok_or_else(|| {
                PresentationStateError::InvalidValue(format!(
                    "{} has no overlay group index",
                    graphic.name()
                ))
            })
    }

    /// Adds an overlay read from the image header
    ///
    /// It takes the pool slot of its group index, replacing any overlay
    /// already there, and is parked on the inactive layer.
    pub fn add_image_overlay(&mut self, graphic: OverlayPlaneGraphic) -> Result<OverlayHandle> {
        let slot = Self::slot_of(&graphic)?;
        let index = self.insert(graphic);
        self.place(OverlayPool::Image, slot, index);
        Ok(self.handle(index))
    }

    /// Adds an overlay read from the presentation state
    pub fn add_presentation_overlay(&mut self, graphic: OverlayPlaneGraphic) -> Result<OverlayHandle> {
        let slot = Self::slot_of(&graphic)?;
        let index = self.insert(graphic);
        self.place(OverlayPool::PresentationState, slot, index);
        Ok(self.handle(index))
    }

    /// Adds a user-drawn overlay
    pub fn add_user_overlay(&mut self, graphic: OverlayPlaneGraphic) -> OverlayHandle {
        let index = self.insert(graphic);
        self.place(OverlayPool::User, 0, index);
        self.handle(index)
    }

    /// Moves an overlay this plane already owns into a pool
    ///
    /// Handles from another plane are rejected; re-adding to a pool the
    /// overlay is already in does nothing. The overlay leaves its previous
    /// pool, and an image or presentation-state overlay displaced from its
    /// group slot is released. The overlay keeps its role.
    pub fn add_to_pool(&mut self, pool: OverlayPool, handle: OverlayHandle) -> Result<()> {
        let entry = self.entry(handle)?;
        let (slot, resident) = match pool {
            OverlayPool::User => (0, self.user_pool.contains(&handle.index)),
            OverlayPool::Image => {
                let slot = Self::slot_of(&entry.graphic)?;
                (slot, self.image_pool[slot] == Some(handle.index))
            }
            OverlayPool::PresentationState => {
                let slot = Self::slot_of(&entry.graphic)?;
                (slot, self.presentation_pool[slot] == Some(handle.index))
            }
        };
        if !resident {
            self.place(pool, slot, handle.index);
            debug!("Overlay {} moved to the {:?} pool", handle.index, pool);
        }
        Ok(())
    }

    /// Pool currently holding an overlay
    pub fn pool_of(&self, handle: OverlayHandle) -> Option<OverlayPool> {
        if self.entry(handle).is_err() {
            return None;
        }
        let index = Some(handle.index);
        if self.image_pool.contains(&index) {
            Some(OverlayPool::Image)
        } else if self.presentation_pool.contains(&index) {
            Some(OverlayPool::PresentationState)
        } else if self.user_pool.contains(&handle.index) {
            Some(OverlayPool::User)
        } else {
            None
        }
    }

    /// Removes a user overlay from the plane
    pub fn remove_user_overlay(&mut self, handle: OverlayHandle) -> Result<OverlayPlaneGraphic> {
        self.entry(handle)?;
        let pos = self
            .user_pool
            .iter()
            .position(|&i| i == handle.index)
            .ok_or_else(|| PresentationStateError::InvalidOperation("not a user overlay".into()))?;
        self.user_pool.remove(pos);
        if self.active_shutter == Some(ShutterRef::Bitmap(handle)) {
            self.active_shutter = None;
        }
        self.arena[handle.index]
            .take()
            .map(|entry| entry.graphic)
            .ok_or_else(|| PresentationStateError::InvalidOperation("overlay was removed".into()))
    }

    /// Image overlay in group slot `n`
    pub fn image_overlay(&self, n: u8) -> Option<OverlayHandle> {
        self.image_pool
            .get(n as usize)
            .copied()
            .flatten()
            .map(|i| self.handle(i))
    }

    /// Presentation-state overlay in group slot `n`
    pub fn presentation_overlay(&self, n: u8) -> Option<OverlayHandle> {
        self.presentation_pool
            .get(n as usize)
            .copied()
            .flatten()
            .map(|i| self.handle(i))
    }

    pub fn user_overlays(&self) -> Vec<OverlayHandle> {
        self.user_pool.iter().map(|&i| self.handle(i)).collect()
    }

    /// Every overlay the plane holds
    pub fn overlays(&self) -> Vec<OverlayHandle> {
        self.arena
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| self.handle(i))
            .collect()
    }

    pub fn contains(&self, handle: OverlayHandle) -> bool {
        self.entry(handle).is_ok()
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Result<&OverlayPlaneGraphic> {
        self.entry(handle).map(|e| &e.graphic)
    }

    pub fn overlay_mut(&mut self, handle: OverlayHandle) -> Result<&mut OverlayPlaneGraphic> {
        self.entry_mut(handle).map(|e| &mut e.graphic)
    }

    pub fn role(&self, handle: OverlayHandle) -> Result<&OverlayRole> {
        self.entry(handle).map(|e| &e.role)
    }

    /// Makes an overlay the active shutter
    ///
    /// The overlay leaves its layer and joins the shutter collection; any
    /// other active shutter is deactivated. `None` deactivates all shutters.
    pub fn activate_as_shutter(&mut self, handle: Option<OverlayHandle>) -> Result<()> {
        match handle {
            None => {
                self.active_shutter = None;
            }
            Some(handle) => {
                self.entry_mut(handle)?.role = OverlayRole::Shutter;
                self.active_shutter = Some(ShutterRef::Bitmap(handle));
                debug!("Overlay {:?} activated as shutter", handle.index);
            }
        }
        Ok(())
    }

    /// Moves an overlay onto a layer and makes it visible
    ///
    /// The layer is created when absent. An empty name selects the inactive
    /// layer.
    pub fn activate_as_layer(&mut self, handle: OverlayHandle, layer: &str) -> Result<()> {
        let id = format_layer_id(layer)?;
        self.entry(handle)?;
        self.layers.get_or_create(&id)?;
        if self.active_shutter == Some(ShutterRef::Bitmap(handle)) {
            self.active_shutter = None;
        }
        let entry = self.entry_mut(handle)?;
        entry.role = OverlayRole::Layer(id);
        entry.graphic.set_visible(true);
        Ok(())
    }

    /// Hides an overlay without removing it
    ///
    /// A shutter stays in the shutter collection but is no longer active; an
    /// overlay on a visible layer moves to the inactive layer.
    pub fn deactivate(&mut self, handle: OverlayHandle) -> Result<()> {
        match self.entry(handle)?.role.clone() {
            OverlayRole::Shutter => {
                if self.active_shutter == Some(ShutterRef::Bitmap(handle)) {
                    self.active_shutter = None;
                }
                Ok(())
            }
            OverlayRole::Layer(id) if id != INACTIVE_LAYER_ID => {
                self.activate_as_layer(handle, INACTIVE_LAYER_ID)
            }
            _ => Ok(()),
        }
    }

    /// Puts the image overlay of group `n`, if any, on a layer
    pub fn activate_image_overlay_as_layer(&mut self, n: u8, layer: &str) -> Result<bool> {
        match self.image_overlay(n) {
            Some(h) => self.activate_as_layer(h, layer).map(|_| true),
            None => Ok(false),
        }
    }

    /// Puts the presentation-state overlay of group `n`, if any, on a layer
    pub fn activate_presentation_overlay_as_layer(&mut self, n: u8, layer: &str) -> Result<bool> {
        match self.presentation_overlay(n) {
            Some(h) => self.activate_as_layer(h, layer).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn deactivate_image_overlay(&mut self, n: u8) -> Result<()> {
        match self.image_overlay(n) {
            Some(h) => self.deactivate(h),
            None => Ok(()),
        }
    }

    pub fn deactivate_presentation_overlay(&mut self, n: u8) -> Result<()> {
        match self.presentation_overlay(n) {
            Some(h) => self.deactivate(h),
            None => Ok(()),
        }
    }

    /// Adds a geometric shutter graphic and returns its index
    pub fn add_geometric_shutter(&mut self, shutter: GeometricShuttersGraphic) -> usize {
        self.geometric_shutters.push(shutter);
        self.geometric_shutters.len() - 1
    }

    pub fn geometric_shutters(&self) -> &[GeometricShuttersGraphic] {
        &self.geometric_shutters
    }

    pub fn geometric_shutter_mut(&mut self, index: usize) -> Option<&mut GeometricShuttersGraphic> {
        self.geometric_shutters.get_mut(index)
    }

    /// Activates any shutter, or deactivates all with `None`
    pub fn activate_shutter(&mut self, shutter: Option<ShutterRef>) -> Result<()> {
        match shutter {
            Some(ShutterRef::Geometric(i)) => {
                if i >= self.geometric_shutters.len() {
                    return Err(PresentationStateError::InvalidOperation(format!(
                        "no geometric shutter {}",
                        i
                    )));
                }
                self.active_shutter = Some(ShutterRef::Geometric(i));
                Ok(())
            }
            Some(ShutterRef::Bitmap(h)) => self.activate_as_shutter(Some(h)),
            None => self.activate_as_shutter(None),
        }
    }

    pub fn active_shutter(&self) -> Option<ShutterRef> {
        self.active_shutter
    }

    /// Active geometric shutters, if a geometric graphic is the active shutter
    pub fn active_geometric_shutter(&self) -> Option<&GeometricShuttersGraphic> {
        match self.active_shutter {
            Some(ShutterRef::Geometric(i)) => self.geometric_shutters.get(i),
            _ => None,
        }
    }

    /// Active bitmap shutter overlay, if any
    pub fn active_bitmap_shutter(&self) -> Option<OverlayHandle> {
        match self.active_shutter {
            Some(ShutterRef::Bitmap(h)) => Some(h),
            _ => None,
        }
    }

    /// Overlays in the shutter collection
    pub fn shutter_overlays(&self) -> Vec<OverlayHandle> {
        self.overlays_with(|role| *role == OverlayRole::Shutter)
    }

    /// Overlays on the named layer
    pub fn layer_overlays(&self, layer: &str) -> Vec<OverlayHandle> {
        match format_layer_id(layer) {
            Ok(id) => self.overlays_with(|role| matches!(role, OverlayRole::Layer(l) if *l == id)),
            Err(_) => Vec::new(),
        }
    }

    fn overlays_with(&self, pred: impl Fn(&OverlayRole) -> bool) -> Vec<OverlayHandle> {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().filter(|e| pred(&e.role)).map(|_| self.handle(i)))
            .collect()
    }

    /// Returns whether an overlay is currently shown
    pub fn is_overlay_visible(&self, handle: OverlayHandle) -> bool {
        let Ok(entry) = self.entry(handle) else {
            return false;
        };
        match &entry.role {
            OverlayRole::Shutter => self.active_shutter == Some(ShutterRef::Bitmap(handle)),
            OverlayRole::Layer(id) => {
                entry.graphic.visible() && self.layers.get(id).is_some_and(|l| l.visible())
            }
            OverlayRole::Unassigned => false,
        }
    }

    /// Overlays shown on visible layers, in layer order
    pub fn visible_layer_overlays(&self) -> Vec<OverlayHandle> {
        self.layers
            .iter()
            .filter(|l| l.visible())
            .flat_map(|l| self.layer_overlays(l.id()))
            .filter(|h| self.is_overlay_visible(*h))
            .collect()
    }

    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerCollection {
        &mut self.layers
    }

    pub fn error_marker(&self) -> Option<&ErrorMarker> {
        self.error_marker.as_ref()
    }

    /// Places the error marker; a plane shows at most one
    pub fn set_error_marker(&mut self, message: impl Into<String>) {
        if self.error_marker.is_none() {
            self.error_marker = Some(ErrorMarker {
                message: message.into(),
            });
        }
    }

    /// Removes every overlay, shutter, layer and the error marker
    pub fn clear(&mut self) {
        self.arena.clear();
        self.image_pool = [None; POOL_SIZE];
        self.presentation_pool = [None; POOL_SIZE];
        self.user_pool.clear();
        self.geometric_shutters.clear();
        self.active_shutter = None;
        self.layers.clear();
        self.error_marker = None;
        // handles issued before the clear must not alias new overlays
        self.id = PlaneId::next();
    }

    /// Overlays from a given source, in arena order
    pub fn overlays_from(&self, source: OverlayPlaneSource) -> Vec<OverlayHandle> {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                e.as_ref()
                    .filter(|e| e.graphic.source() == source)
                    .map(|_| self.handle(i))
            })
            .collect()
    }

    /// Moves every user overlay by an offset
    pub fn translate_user_overlays(&mut self, offset: PointF) {
        for &i in &self.user_pool {
            if let Some(entry) = self.arena.get_mut(i).and_then(Option::as_mut) {
                let o = entry.graphic.origin();
                entry
                    .graphic
                    .set_origin(PointF::new(o.x + offset.x, o.y + offset.y));
            }
        }
    }
}
