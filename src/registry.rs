//! Ordered, id-indexed table of format plugins.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::ImageError;
use crate::pixel::ImageType;
use crate::plugin::{Capabilities, Plugin, PluginModule};

/// Identifier of a registered format.
///
/// Ids are handed out in registration order starting at 0 and are never
/// reused or reordered while the registry lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatId(usize);

impl FormatId {
    pub const fn new(index: usize) -> Self {
        FormatId(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata supplied at registration that takes precedence over the
/// plugin's own accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationOverrides {
    format: Option<String>,
    description: Option<String>,
    extensions: Option<String>,
    regex: Option<String>,
}

impl RegistrationOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Comma-separated extension list.
    pub fn with_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.extensions = Some(extensions.into());
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }
}

/// One registered format.
pub struct PluginNode {
    id: FormatId,
    format: String,
    overrides: RegistrationOverrides,
    enabled: bool,
    // Declared before `module`: the plugin's code may live in the module, so
    // the plugin must be dropped first.
    pub(crate) plugin: Box<dyn Plugin>,
    module: Option<Box<dyn PluginModule>>,
}

impl PluginNode {
    pub fn id(&self) -> FormatId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolved format name: the override if one was given, else the plugin's.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn description(&self) -> Option<&str> {
        self.overrides
            .description
            .as_deref()
            .or_else(|| self.plugin.description())
    }

    pub fn extensions(&self) -> Option<&str> {
        self.overrides
            .extensions
            .as_deref()
            .or_else(|| self.plugin.extensions())
    }

    pub fn regex(&self) -> Option<&str> {
        self.overrides
            .regex
            .as_deref()
            .or_else(|| self.plugin.regex())
    }

    /// MIME type as reported by the plugin; there is no override for it.
    pub fn mime_type(&self) -> Option<&str> {
        self.plugin.mime_type()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.plugin.capabilities()
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    fn matches_extension(&self, extension: &str) -> bool {
        if self.format.eq_ignore_ascii_case(extension) {
            return true;
        }
        self.extensions().is_some_and(|list| {
            list.split(',')
                .filter(|token| !token.is_empty())
                .any(|token| token.eq_ignore_ascii_case(extension))
        })
    }
}

impl fmt::Debug for PluginNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginNode")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("enabled", &self.enabled)
            .field("module", &self.module.as_ref().map(|m| m.name()))
            .finish_non_exhaustive()
    }
}

impl Drop for PluginNode {
    fn drop(&mut self) {
        if let Some(module) = &self.module {
            tracing::trace!(format = %self.format, module = module.name(), "unloading plugin module");
        }
    }
}

/// Registered formats, indexed by [`FormatId`].
///
/// Lookups and dispatch take `&self`, so a shared registry can serve many
/// threads. Registration and enable/disable need `&mut self`.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    nodes: Vec<PluginNode>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin built by `init`.
    ///
    /// `init` receives the id the plugin will get. Registration is rejected,
    /// and the id left for the next registration, when `init` fails or when
    /// no format name can be resolved from `overrides` or the plugin.
    pub fn register<F>(
        &mut self,
        init: F,
        overrides: RegistrationOverrides,
    ) -> Result<FormatId, ImageError>
    where
        F: FnOnce(FormatId) -> Result<Box<dyn Plugin>, ImageError>,
    {
        self.insert(init, overrides, None)
    }

    /// Register the plugin exported by `module`.
    ///
    /// On success the registry keeps the module until the entry is dropped.
    /// On failure the module is dropped before returning.
    pub fn register_external(
        &mut self,
        module: Box<dyn PluginModule>,
        overrides: RegistrationOverrides,
    ) -> Result<FormatId, ImageError> {
        let Some(init) = module.init_proc() else {
            tracing::debug!(module = module.name(), "plugin module exports no init entry point");
            return Err(ImageError::RegistrationRejected(alloc::format!(
                "module {} has no init entry point",
                module.name()
            )));
        };
        self.insert(init, overrides, Some(module))
    }

    fn insert<F>(
        &mut self,
        init: F,
        overrides: RegistrationOverrides,
        module: Option<Box<dyn PluginModule>>,
    ) -> Result<FormatId, ImageError>
    where
        F: FnOnce(FormatId) -> Result<Box<dyn Plugin>, ImageError>,
    {
        let id = FormatId(self.nodes.len());
        let plugin = match init(id) {
            Ok(plugin) => plugin,
            Err(e) => {
                tracing::debug!(%id, error = %e, "plugin init failed");
                return Err(ImageError::RegistrationRejected(e.to_string()));
            }
        };

        let format = match overrides.format.as_deref().or_else(|| plugin.format()) {
            Some(name) => name.to_string(),
            None => {
                tracing::debug!(%id, "plugin registration has no format name");
                // Plugin drops before the module.
                drop(plugin);
                drop(module);
                return Err(ImageError::RegistrationRejected(
                    "no format name from overrides or plugin".to_string(),
                ));
            }
        };

        tracing::debug!(%id, format = %format, "registered format plugin");
        self.nodes.push(PluginNode {
            id,
            format,
            overrides,
            enabled: true,
            plugin,
            module,
        });
        Ok(id)
    }

    /// Number of registered formats.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginNode> {
        self.nodes.iter()
    }

    fn enabled(&self) -> impl Iterator<Item = &PluginNode> {
        self.nodes.iter().filter(|n| n.enabled)
    }

    /// Entry for `id`, enabled or not.
    pub fn find_by_id(&self, id: FormatId) -> Option<&PluginNode> {
        self.nodes.get(id.0)
    }

    /// First enabled entry whose resolved name equals `format`, ignoring case.
    pub fn find_by_format(&self, format: &str) -> Option<&PluginNode> {
        self.enabled().find(|n| n.format.eq_ignore_ascii_case(format))
    }

    /// First enabled entry whose MIME type equals `mime` exactly.
    ///
    /// Plugins without a MIME type compare as the empty string.
    pub fn find_by_mime(&self, mime: &str) -> Option<&PluginNode> {
        self.enabled()
            .find(|n| n.mime_type().unwrap_or_default() == mime)
    }

    /// First enabled entry matching the extension of `filename`.
    ///
    /// The extension is whatever follows the last `.`, or the whole name when
    /// there is no dot. Each entry is tried against its format name and then
    /// its extension list, ignoring case.
    pub fn find_by_filename(&self, filename: &str) -> Option<&PluginNode> {
        let extension = filename
            .rsplit_once('.')
            .map_or(filename, |(_, ext)| ext);
        self.enabled().find(|n| n.matches_extension(extension))
    }

    pub fn format_from_name(&self, format: &str) -> Option<FormatId> {
        self.find_by_format(format).map(PluginNode::id)
    }

    pub fn format_from_mime(&self, mime: &str) -> Option<FormatId> {
        self.find_by_mime(mime).map(PluginNode::id)
    }

    pub fn format_from_filename(&self, filename: &str) -> Option<FormatId> {
        self.find_by_filename(filename).map(PluginNode::id)
    }

    /// Enable or disable a format and return its previous state.
    ///
    /// `None` means `id` is not registered.
    pub fn set_enabled(&mut self, id: FormatId, enabled: bool) -> Option<bool> {
        let node = self.nodes.get_mut(id.0)?;
        Some(core::mem::replace(&mut node.enabled, enabled))
    }

    pub fn is_enabled(&self, id: FormatId) -> Option<bool> {
        self.find_by_id(id).map(PluginNode::is_enabled)
    }

    pub fn format_name(&self, id: FormatId) -> Option<&str> {
        self.find_by_id(id).map(PluginNode::format)
    }

    pub fn mime_type(&self, id: FormatId) -> Option<&str> {
        self.find_by_id(id)?.mime_type()
    }

    pub fn extension_list(&self, id: FormatId) -> Option<&str> {
        self.find_by_id(id)?.extensions()
    }

    pub fn description(&self, id: FormatId) -> Option<&str> {
        self.find_by_id(id)?.description()
    }

    pub fn regex(&self, id: FormatId) -> Option<&str> {
        self.find_by_id(id)?.regex()
    }

    fn caps(&self, id: FormatId) -> Capabilities {
        self.find_by_id(id)
            .map(PluginNode::capabilities)
            .unwrap_or_default()
    }

    pub fn supports_reading(&self, id: FormatId) -> bool {
        self.caps(id).load()
    }

    pub fn supports_writing(&self, id: FormatId) -> bool {
        self.caps(id).save()
    }

    pub fn supports_export_bpp(&self, id: FormatId, bpp: u32) -> bool {
        self.find_by_id(id)
            .is_some_and(|n| n.capabilities().export_bpp() && n.plugin.supports_export_bpp(bpp))
    }

    pub fn supports_export_type(&self, id: FormatId, image_type: ImageType) -> bool {
        self.find_by_id(id).is_some_and(|n| {
            n.capabilities().export_type() && n.plugin.supports_export_type(image_type)
        })
    }

    pub fn supports_icc_profiles(&self, id: FormatId) -> bool {
        self.find_by_id(id)
            .is_some_and(|n| n.capabilities().icc_profiles() && n.plugin.supports_icc_profiles())
    }

    pub fn supports_no_pixels(&self, id: FormatId) -> bool {
        self.find_by_id(id)
            .is_some_and(|n| n.capabilities().no_pixels() && n.plugin.supports_no_pixels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(Option<&'static str>, Option<&'static str>);

    impl Plugin for Named {
        fn capabilities(&self) -> Capabilities {
            Capabilities::new().with_icc_profiles(true)
        }

        fn format(&self) -> Option<&str> {
            self.0
        }

        fn extensions(&self) -> Option<&str> {
            self.1
        }

        fn supports_icc_profiles(&self) -> bool {
            true
        }
    }

    fn named(
        name: Option<&'static str>,
        ext: Option<&'static str>,
    ) -> impl FnOnce(FormatId) -> Result<Box<dyn Plugin>, ImageError> {
        move |_| Ok(Box::new(Named(name, ext)) as Box<dyn Plugin>)
    }

    #[test]
    fn failed_init_consumes_no_id() {
        let mut reg = PluginRegistry::new();
        assert_eq!(
            reg.register(named(Some("A"), None), RegistrationOverrides::new())
                .unwrap(),
            FormatId::new(0)
        );
        let err = reg.register(
            |_| Err(ImageError::InvalidData("boom".into())),
            RegistrationOverrides::new(),
        );
        assert!(matches!(err, Err(ImageError::RegistrationRejected(_))));
        assert_eq!(
            reg.register(named(Some("B"), None), RegistrationOverrides::new())
                .unwrap(),
            FormatId::new(1)
        );
    }

    #[test]
    fn override_name_wins() {
        let mut reg = PluginRegistry::new();
        let id = reg
            .register(
                named(Some("inner"), Some("x")),
                RegistrationOverrides::new()
                    .with_format("outer")
                    .with_extensions("y,z"),
            )
            .unwrap();
        assert_eq!(reg.format_name(id), Some("outer"));
        assert_eq!(reg.extension_list(id), Some("y,z"));
        assert_eq!(reg.format_from_name("INNER"), None);
        assert_eq!(reg.format_from_name("OUTER"), Some(id));
        assert!(reg.supports_icc_profiles(id));
        assert!(!reg.supports_reading(id));
    }

    #[test]
    fn format_name_beats_extension_token() {
        let mut reg = PluginRegistry::new();
        let a = reg
            .register(named(Some("A"), Some("raw")), RegistrationOverrides::new())
            .unwrap();
        let raw = reg
            .register(named(Some("RAW"), Some("dng")), RegistrationOverrides::new())
            .unwrap();
        // Entries are scanned in id order, so A's extension token wins.
        assert_eq!(reg.format_from_filename("x.raw"), Some(a));
        reg.set_enabled(a, false);
        assert_eq!(reg.format_from_filename("x.raw"), Some(raw));
        assert_eq!(reg.format_from_filename("dng"), Some(raw));
        assert_eq!(reg.format_from_filename("archive.tar.DNG"), Some(raw));
        assert_eq!(reg.format_from_filename("noext"), None);
    }

    #[test]
    fn unknown_id_is_distinct_from_disabled() {
        let mut reg = PluginRegistry::new();
        let id = reg
            .register(named(Some("A"), None), RegistrationOverrides::new())
            .unwrap();
        assert_eq!(reg.set_enabled(id, false), Some(true));
        assert_eq!(reg.set_enabled(id, false), Some(false));
        assert_eq!(reg.set_enabled(FormatId::new(9), true), None);
        assert_eq!(reg.is_enabled(FormatId::new(9)), None);
    }
}
