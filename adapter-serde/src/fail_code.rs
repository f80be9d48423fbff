use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed error taxonomy of §6: every fail code a `RunResult::Fail`
/// may carry. Kept as a single enum (rather than one per class) so the
/// dispatcher can match on it exhaustively and so wire output is a
/// single closed string vocabulary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FailCode {
    AdapterPluginUnknown,
    AdapterPluginDuplicate,
    AdapterPluginUnused,
    AdapterUnsupported,
    AdapterCancelled,

    ArchivePluginRequired,
    ArchivePluginUnavailable,
    ArchiveFormatMismatch,
    ArchiveUnsupportedFormat,

    PackagePluginRequired,
    PackagePluginUnavailable,
    PackageFormatMismatch,
    PackageUnsupportedFormat,

    ExtensionManifestMissing,
    ExtensionManifestInvalid,
    ExtensionFormatMismatch,
    ExtensionUnsupportedFormat,

    IacUnsupportedFormat,
    CicdUnsupportedFormat,

    DocFormatMismatch,
    DocUnsupportedFormat,

    ContainerLayoutInvalid,
    ContainerIndexInvalid,
    ContainerFormatMismatch,
    ContainerSbomInvalid,
    ContainerUnsupportedFormat,

    ImageFormatMismatch,
    ImageUnsupportedFormat,

    SignatureFormatMismatch,
    SignatureUnsupportedFormat,

    ScmRefUnresolved,
    ScmUnsupportedFormat,
}

impl FailCode {
    /// The `ALL_CAPS_SNAKE` wire spelling used in `failCode` and in
    /// reason codes (§6, §7).
    pub fn as_str(self) -> &'static str {
        match self {
            FailCode::AdapterPluginUnknown => "ADAPTER_PLUGIN_UNKNOWN",
            FailCode::AdapterPluginDuplicate => "ADAPTER_PLUGIN_DUPLICATE",
            FailCode::AdapterPluginUnused => "ADAPTER_PLUGIN_UNUSED",
            FailCode::AdapterUnsupported => "ADAPTER_UNSUPPORTED",
            FailCode::AdapterCancelled => "ADAPTER_CANCELLED",

            FailCode::ArchivePluginRequired => "ARCHIVE_PLUGIN_REQUIRED",
            FailCode::ArchivePluginUnavailable => "ARCHIVE_PLUGIN_UNAVAILABLE",
            FailCode::ArchiveFormatMismatch => "ARCHIVE_FORMAT_MISMATCH",
            FailCode::ArchiveUnsupportedFormat => "ARCHIVE_UNSUPPORTED_FORMAT",

            FailCode::PackagePluginRequired => "PACKAGE_PLUGIN_REQUIRED",
            FailCode::PackagePluginUnavailable => "PACKAGE_PLUGIN_UNAVAILABLE",
            FailCode::PackageFormatMismatch => "PACKAGE_FORMAT_MISMATCH",
            FailCode::PackageUnsupportedFormat => "PACKAGE_UNSUPPORTED_FORMAT",

            FailCode::ExtensionManifestMissing => "EXTENSION_MANIFEST_MISSING",
            FailCode::ExtensionManifestInvalid => "EXTENSION_MANIFEST_INVALID",
            FailCode::ExtensionFormatMismatch => "EXTENSION_FORMAT_MISMATCH",
            FailCode::ExtensionUnsupportedFormat => "EXTENSION_UNSUPPORTED_FORMAT",

            FailCode::IacUnsupportedFormat => "IAC_UNSUPPORTED_FORMAT",
            FailCode::CicdUnsupportedFormat => "CICD_UNSUPPORTED_FORMAT",

            FailCode::DocFormatMismatch => "DOC_FORMAT_MISMATCH",
            FailCode::DocUnsupportedFormat => "DOC_UNSUPPORTED_FORMAT",

            FailCode::ContainerLayoutInvalid => "CONTAINER_LAYOUT_INVALID",
            FailCode::ContainerIndexInvalid => "CONTAINER_INDEX_INVALID",
            FailCode::ContainerFormatMismatch => "CONTAINER_FORMAT_MISMATCH",
            FailCode::ContainerSbomInvalid => "CONTAINER_SBOM_INVALID",
            FailCode::ContainerUnsupportedFormat => "CONTAINER_UNSUPPORTED_FORMAT",

            FailCode::ImageFormatMismatch => "IMAGE_FORMAT_MISMATCH",
            FailCode::ImageUnsupportedFormat => "IMAGE_UNSUPPORTED_FORMAT",

            FailCode::SignatureFormatMismatch => "SIGNATURE_FORMAT_MISMATCH",
            FailCode::SignatureUnsupportedFormat => "SIGNATURE_UNSUPPORTED_FORMAT",

            FailCode::ScmRefUnresolved => "SCM_REF_UNRESOLVED",
            FailCode::ScmUnsupportedFormat => "SCM_UNSUPPORTED_FORMAT",
        }
    }
}

impl fmt::Display for FailCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
