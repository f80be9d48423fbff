//! VHD / VHDX / QCOW2 / VMDK structural checks (§4.9).

use crate::bytes::{count_occurrences, find, read_u32_be};

#[derive(Clone, Debug, Default)]
pub struct VhdCheck {
    pub has_conectix_footer: bool,
    pub min_size_ok: bool,
}

impl VhdCheck {
    pub fn is_structurally_valid(&self) -> bool {
        self.has_conectix_footer && self.min_size_ok
    }
}

/// `tail` must be the final 512-byte block of the file.
pub fn check_vhd(tail: &[u8], file_size: u64) -> VhdCheck {
    let mut result = VhdCheck::default();
    result.min_size_ok = file_size >= 1024;
    if tail.len() >= 16 {
        result.has_conectix_footer = &tail[8..16] == b"conectix";
    }
    result
}

#[derive(Clone, Debug, Default)]
pub struct VhdxCheck {
    pub has_signature: bool,
    pub min_size_ok: bool,
}

impl VhdxCheck {
    pub fn is_structurally_valid(&self) -> bool {
        self.has_signature && self.min_size_ok
    }
}

pub fn check_vhdx(head: &[u8], file_size: u64) -> VhdxCheck {
    VhdxCheck {
        has_signature: head.starts_with(b"vhdxfile"),
        min_size_ok: file_size >= 64 * 1024,
    }
}

#[derive(Clone, Debug, Default)]
pub struct Qcow2Check {
    pub has_magic: bool,
    pub version_supported: bool,
    pub min_size_ok: bool,
}

impl Qcow2Check {
    pub fn is_structurally_valid(&self) -> bool {
        self.has_magic && self.version_supported && self.min_size_ok
    }
}

pub fn check_qcow2(head: &[u8], file_size: u64) -> Qcow2Check {
    let mut result = Qcow2Check::default();
    result.min_size_ok = file_size >= 72;
    if head.len() < 8 || &head[0..4] != b"QFI\xFB" {
        return result;
    }
    result.has_magic = true;
    if let Some(version) = read_u32_be(head, 4) {
        result.version_supported = version == 2 || version == 3;
    }
    result
}

#[derive(Clone, Debug, Default)]
pub struct VmdkCheck {
    pub has_descriptor_markers: bool,
    pub has_sparse_magic: bool,
    pub min_size_ok: bool,
}

impl VmdkCheck {
    pub fn is_structurally_valid(&self) -> bool {
        self.min_size_ok && (self.has_descriptor_markers || self.has_sparse_magic)
    }
}

fn has_extent_line(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim();
        (line.starts_with("RW") || line.starts_with("RDONLY") || line.starts_with("NOACCESS"))
            && line.contains("TYPE")
            && line.contains('"')
    })
}

/// `bytes` is the full file (descriptor files are small text files;
/// sparse extents carry the `KDMV` magic repeated at grain boundaries,
/// so we scan the whole buffer for at least one occurrence, §4.9).
pub fn check_vmdk(bytes: &[u8], file_size: u64) -> VmdkCheck {
    let mut result = VmdkCheck::default();
    result.min_size_ok = file_size >= 64;

    let text = String::from_utf8_lossy(bytes);
    let has_descriptor_header = text.contains("# Disk DescriptorFile");
    let has_create_type = text.contains("createType=");
    let has_extent = has_extent_line(&text);
    result.has_descriptor_markers = has_descriptor_header && has_create_type && has_extent;

    result.has_sparse_magic = count_occurrences(bytes, b"KDMV") > 0 || find(bytes, b"KDMV").is_some();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vhd_footer_detected() {
        let mut tail = vec![0u8; 512];
        tail[8..16].copy_from_slice(b"conectix");
        assert!(check_vhd(&tail, 2048).is_structurally_valid());
    }

    #[test]
    fn vhdx_signature_detected() {
        let mut head = vec![0u8; 64];
        head[0..8].copy_from_slice(b"vhdxfile");
        assert!(check_vhdx(&head, 128 * 1024).is_structurally_valid());
    }

    #[test]
    fn qcow2_magic_and_version() {
        let mut head = vec![0u8; 8];
        head[0..4].copy_from_slice(b"QFI\xFB");
        head[4..8].copy_from_slice(&3u32.to_be_bytes());
        assert!(check_qcow2(&head, 1024).is_structurally_valid());
    }

    #[test]
    fn vmdk_descriptor_markers_detected() {
        let text = b"# Disk DescriptorFile\nversion=1\nCID=fffffffe\ncreateType=\"monolithicSparse\"\n\nRW 2048 SPARSE \"disk.vmdk\"\n".to_vec();
        assert!(check_vmdk(&text, text.len() as u64).is_structurally_valid());
    }

    #[test]
    fn vmdk_sparse_magic_only() {
        let mut bytes = vec![0u8; 64];
        bytes[0..4].copy_from_slice(b"KDMV");
        let result = check_vmdk(&bytes, bytes.len() as u64);
        assert!(result.has_sparse_magic);
        assert!(!result.has_descriptor_markers);
        assert!(result.is_structurally_valid());
    }
}
