//! ISO 9660 Primary Volume Descriptor / Descriptor Terminator checks
//! (§4.9).

const SECTOR_SIZE: usize = 2048;
const STANDARD_ID: &[u8; 5] = b"CD001";

#[derive(Clone, Debug, Default)]
pub struct IsoCheck {
    pub has_primary_volume_descriptor: bool,
    pub has_descriptor_terminator: bool,
}

impl IsoCheck {
    pub fn is_structurally_valid(&self) -> bool {
        self.has_primary_volume_descriptor && self.has_descriptor_terminator
    }
}

fn descriptor_at(bytes: &[u8], sector: usize) -> Option<(u8, u8)> {
    let offset = sector * SECTOR_SIZE;
    let descriptor = bytes.get(offset..offset + SECTOR_SIZE)?;
    let descriptor_type = descriptor[0];
    if &descriptor[1..6] != STANDARD_ID {
        return None;
    }
    let version = descriptor[6];
    Some((descriptor_type, version))
}

/// `head` must cover at least through sector 17 (64 KiB is ample).
pub fn check(head: &[u8]) -> IsoCheck {
    let mut result = IsoCheck::default();
    if let Some((dtype, version)) = descriptor_at(head, 16) {
        result.has_primary_volume_descriptor = (dtype == 1 || dtype == 2) && version == 1;
    }
    if let Some((dtype, version)) = descriptor_at(head, 17) {
        result.has_descriptor_terminator = dtype == 255 && version == 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_descriptor(dtype: u8, version: u8) -> Vec<u8> {
        let mut block = vec![0u8; SECTOR_SIZE];
        block[0] = dtype;
        block[1..6].copy_from_slice(STANDARD_ID);
        block[6] = version;
        block
    }

    #[test]
    fn valid_pvd_and_terminator() {
        let mut head = vec![0u8; SECTOR_SIZE * 16];
        head.extend_from_slice(&build_descriptor(1, 1));
        head.extend_from_slice(&build_descriptor(255, 1));
        assert!(check(&head).is_structurally_valid());
    }
}
