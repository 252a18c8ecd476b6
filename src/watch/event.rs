use bytes::{Buf, BytesMut};
use nix::sys::inotify::AddWatchFlags;
use tokio_util::codec::Decoder;

/// Fixed part of a raw inotify record: wd, mask, cookie, name length.
pub const HEADER_LEN: usize = 16;

/// One decoded change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    /// Length of the (NUL padded) name that followed the header.
    pub name_len: u32,
}

impl ChangeEvent {
    pub fn flags(&self) -> AddWatchFlags {
        AddWatchFlags::from_bits_truncate(self.mask)
    }

    pub fn is_modify(&self) -> bool {
        self.flags().contains(AddWatchFlags::IN_MODIFY)
    }
}

/// Splits a raw inotify byte stream into records.
/// Wire format: [i32 wd][u32 mask][u32 cookie][u32 len][len bytes name], native endian.
pub struct EventCodec;

impl Decoder for EventCodec {
    type Item = ChangeEvent;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let name_len = u32::from_ne_bytes([src[12], src[13], src[14], src[15]]);
        let record_len = HEADER_LEN + name_len as usize;
        if src.len() < record_len {
            return Ok(None);
        }

        let wd = src.get_i32_ne();
        let mask = src.get_u32_ne();
        let cookie = src.get_u32_ne();
        let name_len = src.get_u32_ne();
        // The name is not needed for a single-file watch.
        src.advance(name_len as usize);

        Ok(Some(ChangeEvent {
            wd,
            mask,
            cookie,
            name_len,
        }))
    }
}

#[cfg(test)]
pub(crate) fn encode_record(dst: &mut Vec<u8>, mask: AddWatchFlags, name: &[u8]) {
    dst.extend_from_slice(&1i32.to_ne_bytes());
    dst.extend_from_slice(&mask.bits().to_ne_bytes());
    dst.extend_from_slice(&0u32.to_ne_bytes());
    dst.extend_from_slice(&(name.len() as u32).to_ne_bytes());
    dst.extend_from_slice(name);
}
