//! The format plugin contract.
//!
//! A [`Plugin`] is a bundle of optional operations for one image format. Which
//! operations exist is declared by [`Plugin::capabilities`]; dispatch never
//! calls an operation whose slot is absent, and an absent slot always means
//! "not offered", never a failure.

use alloc::boxed::Box;
use core::any::Any;

use crate::bitmap::Bitmap;
use crate::error::ImageError;
use crate::flags::{LoadFlags, SaveFlags};
use crate::io::ImageIo;
use crate::pixel::ImageType;
use crate::registry::FormatId;

/// Per-call state returned by [`Plugin::open`] and handed back to every
/// operation of the same open/close pair.
pub type Session = Box<dyn Any + Send>;

/// Factory that builds a plugin once its format id is known.
pub type InitProc = Box<dyn FnOnce(FormatId) -> Result<Box<dyn Plugin>, ImageError> + Send>;

/// Which optional operation slots a plugin fills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    open: bool,
    close: bool,
    load: bool,
    save: bool,
    validate: bool,
    page_count: bool,
    page_capability: bool,
    export_bpp: bool,
    export_type: bool,
    icc_profiles: bool,
    no_pixels: bool,
}

impl Capabilities {
    /// No slots filled.
    pub const fn new() -> Self {
        Self {
            open: false,
            close: false,
            load: false,
            save: false,
            validate: false,
            page_count: false,
            page_capability: false,
            export_bpp: false,
            export_type: false,
            icc_profiles: false,
            no_pixels: false,
        }
    }

    pub const fn with_open(mut self, v: bool) -> Self {
        self.open = v;
        self
    }

    pub const fn with_close(mut self, v: bool) -> Self {
        self.close = v;
        self
    }

    pub const fn with_load(mut self, v: bool) -> Self {
        self.load = v;
        self
    }

    pub const fn with_save(mut self, v: bool) -> Self {
        self.save = v;
        self
    }

    pub const fn with_validate(mut self, v: bool) -> Self {
        self.validate = v;
        self
    }

    pub const fn with_page_count(mut self, v: bool) -> Self {
        self.page_count = v;
        self
    }

    pub const fn with_page_capability(mut self, v: bool) -> Self {
        self.page_capability = v;
        self
    }

    pub const fn with_export_bpp(mut self, v: bool) -> Self {
        self.export_bpp = v;
        self
    }

    pub const fn with_export_type(mut self, v: bool) -> Self {
        self.export_type = v;
        self
    }

    pub const fn with_icc_profiles(mut self, v: bool) -> Self {
        self.icc_profiles = v;
        self
    }

    pub const fn with_no_pixels(mut self, v: bool) -> Self {
        self.no_pixels = v;
        self
    }

    pub const fn open(&self) -> bool {
        self.open
    }

    pub const fn close(&self) -> bool {
        self.close
    }

    pub const fn load(&self) -> bool {
        self.load
    }

    pub const fn save(&self) -> bool {
        self.save
    }

    pub const fn validate(&self) -> bool {
        self.validate
    }

    pub const fn page_count(&self) -> bool {
        self.page_count
    }

    pub const fn page_capability(&self) -> bool {
        self.page_capability
    }

    pub const fn export_bpp(&self) -> bool {
        self.export_bpp
    }

    pub const fn export_type(&self) -> bool {
        self.export_type
    }

    pub const fn icc_profiles(&self) -> bool {
        self.icc_profiles
    }

    pub const fn no_pixels(&self) -> bool {
        self.no_pixels
    }
}

/// One image format.
///
/// Metadata accessors return `None` when the plugin leaves the value to the
/// registration overrides. Operation methods are only called when the
/// matching [`Capabilities`] slot is set.
pub trait Plugin: Send + Sync {
    /// Operation slots this plugin fills.
    fn capabilities(&self) -> Capabilities;

    /// Short format name, e.g. `"PNM"`. Matched case-insensitively.
    fn format(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Comma-separated extension list without dots, e.g. `"pbm,pgm,ppm"`.
    fn extensions(&self) -> Option<&str> {
        None
    }

    /// Signature pattern hint for external tools.
    fn regex(&self) -> Option<&str> {
        None
    }

    fn mime_type(&self) -> Option<&str> {
        None
    }

    /// Start a load (`read == true`) or save. May return per-call state.
    fn open(&self, _io: &mut dyn ImageIo, _read: bool) -> Option<Session> {
        None
    }

    /// Release whatever [`open`](Self::open) acquired.
    fn close(&self, _io: &mut dyn ImageIo, _session: Option<Session>) {}

    /// Decode one page. `page` is `None` for the default page.
    fn load(
        &self,
        _io: &mut dyn ImageIo,
        _session: Option<&mut (dyn Any + Send)>,
        _page: Option<u32>,
        _flags: LoadFlags,
    ) -> Result<Bitmap, ImageError> {
        Err(ImageError::NotImplemented("load"))
    }

    /// Encode `bitmap`. Never called with a header-only bitmap.
    fn save(
        &self,
        _io: &mut dyn ImageIo,
        _bitmap: &Bitmap,
        _session: Option<&mut (dyn Any + Send)>,
        _page: Option<u32>,
        _flags: SaveFlags,
    ) -> Result<(), ImageError> {
        Err(ImageError::NotImplemented("save"))
    }

    /// Check the stream's signature. May move the stream cursor freely.
    fn validate(&self, _io: &mut dyn ImageIo) -> bool {
        false
    }

    fn page_count(&self, _io: &mut dyn ImageIo, _session: Option<&mut (dyn Any + Send)>) -> u32 {
        1
    }

    /// Number of pages that can be written.
    fn page_capability(
        &self,
        _io: &mut dyn ImageIo,
        _session: Option<&mut (dyn Any + Send)>,
    ) -> u32 {
        1
    }

    fn supports_export_bpp(&self, _bpp: u32) -> bool {
        false
    }

    fn supports_export_type(&self, _image_type: ImageType) -> bool {
        false
    }

    fn supports_icc_profiles(&self) -> bool {
        false
    }

    /// Whether [`LoadFlags::HEADER_ONLY`] is honoured.
    fn supports_no_pixels(&self) -> bool {
        false
    }
}

/// A loadable provider of one plugin, e.g. a dynamically loaded library.
///
/// The registry owns the module for as long as the plugin it produced is
/// registered. Dropping the module is the unload.
pub trait PluginModule: Send + Sync {
    /// Module name used in diagnostics.
    fn name(&self) -> &str;

    /// Resolve the module's init entry point, if it exports one.
    fn init_proc(&self) -> Option<InitProc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl Plugin for Bare {
        fn capabilities(&self) -> Capabilities {
            Capabilities::new()
        }
    }

    #[test]
    fn builder_sets_individual_slots() {
        const CAPS: Capabilities = Capabilities::new().with_load(true).with_validate(true);
        assert!(CAPS.load());
        assert!(CAPS.validate());
        assert!(!CAPS.save());
        assert!(!CAPS.open());
        assert_eq!(Capabilities::default(), Capabilities::new());
    }

    #[test]
    fn defaults_offer_nothing() {
        let p = Bare;
        let mut io = crate::io::MemoryIo::new();
        assert!(p.format().is_none());
        assert!(!p.validate(&mut io));
        assert!(!p.supports_export_bpp(8));
        assert!(matches!(
            p.load(&mut io, None, None, LoadFlags::EMPTY),
            Err(ImageError::NotImplemented("load"))
        ));
    }
}
