//! Load, save and validate entry points that route through the registry.
//!
//! Every operation that opens a plugin session closes it again on all exit
//! paths, including when the operation itself fails.

use core::any::Any;

use crate::bitmap::{Bitmap, PixelBuffer};
use crate::error::ImageError;
use crate::flags::{LoadFlags, SaveFlags};
use crate::io::{ImageIo, SeekFrom};
use crate::plugin::{Plugin, Session};
use crate::registry::{FormatId, PluginNode, PluginRegistry};

/// An open plugin session. Closing happens on drop.
struct OpenSession<'a, 'io> {
    plugin: &'a dyn Plugin,
    io: &'io mut dyn ImageIo,
    session: Option<Session>,
    close: bool,
}

impl<'a, 'io> OpenSession<'a, 'io> {
    fn open(node: &'a PluginNode, io: &'io mut dyn ImageIo, read: bool) -> Self {
        let plugin = node.plugin();
        let caps = plugin.capabilities();
        let session = if caps.open() { plugin.open(io, read) } else { None };
        Self {
            plugin,
            io,
            session,
            close: caps.close(),
        }
    }

    fn parts(&mut self) -> (&dyn Plugin, &mut dyn ImageIo, Option<&mut (dyn Any + Send)>) {
        (self.plugin, &mut *self.io, self.session.as_deref_mut())
    }
}

impl Drop for OpenSession<'_, '_> {
    fn drop(&mut self) {
        if self.close {
            self.plugin.close(self.io, self.session.take());
        }
    }
}

impl PluginRegistry {
    fn node(&self, id: FormatId) -> Result<&PluginNode, ImageError> {
        self.find_by_id(id).ok_or(ImageError::UnknownFormat(id))
    }

    /// Load the default page of `io` with format `id`.
    pub fn load(
        &self,
        id: FormatId,
        io: &mut dyn ImageIo,
        flags: LoadFlags,
    ) -> Result<Bitmap, ImageError> {
        self.load_page(id, io, None, flags)
    }

    /// Load one page of `io` with format `id`.
    ///
    /// Runs open, load, close. Fails without touching the stream when `id` is
    /// unknown or the format cannot load.
    pub fn load_page(
        &self,
        id: FormatId,
        io: &mut dyn ImageIo,
        page: Option<u32>,
        flags: LoadFlags,
    ) -> Result<Bitmap, ImageError> {
        let node = self.node(id)?;
        if !node.capabilities().load() {
            return Err(ImageError::UnsupportedOperation {
                format: id,
                operation: "load",
            });
        }
        let mut open = OpenSession::open(node, io, true);
        let (plugin, io, session) = open.parts();
        let result = plugin.load(io, session, page, flags);
        if let Err(e) = &result {
            tracing::warn!(%id, format = node.format(), error = %e, "load failed");
        }
        result
    }

    /// Save `bitmap` to `io` with format `id`.
    ///
    /// Header-only bitmaps are refused before the plugin is consulted.
    pub fn save(
        &self,
        id: FormatId,
        bitmap: &Bitmap,
        io: &mut dyn ImageIo,
        flags: SaveFlags,
    ) -> Result<(), ImageError> {
        if !bitmap.has_pixels() {
            tracing::warn!(%id, "refusing to save a bitmap without pixel data");
            return Err(ImageError::NoPixels);
        }
        let node = self.node(id)?;
        if !node.capabilities().save() {
            return Err(ImageError::UnsupportedOperation {
                format: id,
                operation: "save",
            });
        }
        let mut open = OpenSession::open(node, io, false);
        let (plugin, io, session) = open.parts();
        let result = plugin.save(io, bitmap, session, None, flags);
        if let Err(e) = &result {
            tracing::warn!(%id, format = node.format(), error = %e, "save failed");
        }
        result
    }

    /// Whether `io` looks like format `id`.
    ///
    /// Disabled formats and formats without a validate slot report `false`.
    /// The stream position is restored whatever the outcome.
    pub fn validate(&self, id: FormatId, io: &mut dyn ImageIo) -> bool {
        let Some(node) = self.find_by_id(id) else {
            return false;
        };
        let Ok(start) = io.tell() else {
            return false;
        };
        let valid =
            node.is_enabled() && node.capabilities().validate() && node.plugin().validate(io);
        if let Err(e) = io.seek(SeekFrom::Start(start)) {
            tracing::warn!(%id, error = %e, "could not restore stream position after validate");
        }
        valid
    }

    /// First enabled format, in id order, whose validate accepts `io`.
    pub fn identify(&self, io: &mut dyn ImageIo) -> Option<FormatId> {
        self.iter()
            .filter(|n| n.is_enabled())
            .map(PluginNode::id)
            .find(|&id| self.validate(id, io))
    }

    /// Number of pages in `io`.
    pub fn page_count(&self, id: FormatId, io: &mut dyn ImageIo) -> Result<u32, ImageError> {
        let node = self.node(id)?;
        if !node.capabilities().page_count() {
            return Err(ImageError::UnsupportedOperation {
                format: id,
                operation: "page count",
            });
        }
        let mut open = OpenSession::open(node, io, true);
        let (plugin, io, session) = open.parts();
        Ok(plugin.page_count(io, session))
    }

    /// Number of pages the format can write to `io`.
    pub fn page_capability(&self, id: FormatId, io: &mut dyn ImageIo) -> Result<u32, ImageError> {
        let node = self.node(id)?;
        if !node.capabilities().page_capability() {
            return Err(ImageError::UnsupportedOperation {
                format: id,
                operation: "page capability",
            });
        }
        let mut open = OpenSession::open(node, io, false);
        let (plugin, io, session) = open.parts();
        Ok(plugin.page_capability(io, session))
    }
}
