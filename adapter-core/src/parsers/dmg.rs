//! DMG trailer check: `koly` marker in the final 512-byte block
//! (§4.4).

const KOLY_MAGIC: [u8; 4] = *b"koly";

pub fn has_koly_trailer(tail: &[u8]) -> bool {
    if tail.len() < 512 {
        return false;
    }
    let block = &tail[tail.len() - 512..];
    block[0..4] == KOLY_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_trailing_koly_block() {
        let mut tail = vec![0u8; 512];
        tail[0..4].copy_from_slice(&KOLY_MAGIC);
        assert!(has_koly_trailer(&tail));
    }

    #[test]
    fn rejects_missing_marker() {
        let tail = vec![0u8; 512];
        assert!(!has_koly_trailer(&tail));
    }
}
