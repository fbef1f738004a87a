//! Decoder for the self-describing attribute buffer returned by the bulk
//! listing call.
//!
//! Each record opens with a u32 total length (the length field included)
//! and then carries its attributes in the bit-numbering order of the
//! negotiated bitmap, with absent attributes skipped entirely. The bitmap
//! is static for the lifetime of the build, so field presence is keyed off
//! the request bits, never off runtime content. The one per-record wrinkle
//! is the file-specific group: the kernel omits it for directories, so the
//! decoder consults the object type before reading those fields.
//!
//! A name is addressed indirectly: the reference field holds an i32 offset
//! measured from the start of the reference itself plus a u32 byte length,
//! pointing back into the same record. The reported bytes may or may not
//! carry a terminating NUL; exactly one is stripped when present.
//!
//! Framing invariant: the cursor advances by each record's declared length
//! unconditionally, independent of how many bytes were actually parsed, so
//! kernel padding or attributes appended in the future pass through
//! untouched.

use crate::{
    entry::FileType,
    sink::{EntryMeta, EntrySink},
};

// Attribute bitmap requested from the kernel, with the sys/attr.h bit
// values. The decode order below is keyed to exactly these bits.
pub(crate) const ATTR_BIT_MAP_COUNT: u16 = 5;
pub(crate) const ATTR_CMN_NAME: u32 = 0x0000_0001;
pub(crate) const ATTR_CMN_OBJTYPE: u32 = 0x0000_0008;
pub(crate) const ATTR_CMN_FILEID: u32 = 0x0200_0000;
pub(crate) const ATTR_FILE_TOTALSIZE: u32 = 0x0000_0002;
pub(crate) const ATTR_FILE_ALLOCSIZE: u32 = 0x0000_0004;

pub(crate) const COMMON_ATTRS: u32 = ATTR_CMN_NAME | ATTR_CMN_OBJTYPE | ATTR_CMN_FILEID;
pub(crate) const FILE_ATTRS: u32 = ATTR_FILE_TOTALSIZE | ATTR_FILE_ALLOCSIZE;

// vnode object types
const VREG: u32 = 1;
const VDIR: u32 = 2;
const VLNK: u32 = 5;

fn objtype_to_file_type(objtype: u32) -> FileType {
    match objtype {
        VDIR => FileType::Directory,
        VREG => FileType::RegularFile,
        VLNK => FileType::SymbolicLink,
        _ => FileType::Unknown,
    }
}

/// Bounds-checked reader over one record's attribute bytes. Every read
/// validates the remaining length first; a record that under-declares its
/// size yields `None` instead of reading past it.
struct FieldCursor<'a> {
    rec: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(rec: &'a [u8]) -> Self {
        Self { rec, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let s = self.rec.get(self.pos..end)?;
        self.pos = end;
        Some(s)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_ne_bytes(b.try_into().unwrap()))
    }

    // Attribute fields are 4-byte aligned, so u64 values may straddle an
    // 8-byte boundary; from_ne_bytes on a copied array sidesteps that.
    fn u64(&mut self) -> Option<u64> {
        self.take(8)
            .map(|b| u64::from_ne_bytes(b.try_into().unwrap()))
    }

    /// Resolve an attrreference: i32 offset relative to the start of this
    /// field, u32 length, both validated against the record's bytes.
    fn attr_ref(&mut self) -> Option<&'a [u8]> {
        let field_start = self.pos;
        let raw = self.take(8)?;
        let off = i32::from_ne_bytes(raw[..4].try_into().unwrap());
        let len = u32::from_ne_bytes(raw[4..].try_into().unwrap()) as usize;
        let start = field_start.checked_add(usize::try_from(off).ok()?)?;
        let end = start.checked_add(len)?;
        self.rec.get(start..end)
    }
}

/// Decode up to `count` records from `buf`, emitting through `sink`.
///
/// Stops early when the sink reports a capacity limit (a graceful partial
/// result) or when the framing itself is broken (zero or over-long record
/// length); everything emitted up to that point is well-formed. Records
/// without a usable name are skipped without error.
pub(crate) fn decode_records(
    buf: &[u8],
    count: usize,
    commonattr: u32,
    fileattr: u32,
    sink: &mut EntrySink<'_>,
) {
    let mut offset = 0usize;
    for _ in 0..count {
        let Some(len_bytes) = buf.get(offset..offset + 4) else {
            break;
        };
        let reclen = u32::from_ne_bytes(len_bytes.try_into().unwrap()) as usize;
        if reclen < 4 || reclen > buf.len() - offset {
            break;
        }
        let fields = &buf[offset + 4..offset + reclen];
        // Record framing: advance by the declared length, not by the bytes
        // actually consumed below.
        offset += reclen;

        let mut cur = FieldCursor::new(fields);
        let mut name: Option<&[u8]> = None;
        let mut objtype: Option<u32> = None;
        let mut fileid = 0u64;
        let mut logical = 0u64;
        let mut allocated = 0u64;

        if commonattr & ATTR_CMN_NAME != 0 {
            name = cur.attr_ref();
        }
        if commonattr & ATTR_CMN_OBJTYPE != 0 {
            objtype = cur.u32();
        }
        if commonattr & ATTR_CMN_FILEID != 0 {
            fileid = cur.u64().unwrap_or(0);
        }
        // The file-specific group is omitted for directories; reading on
        // would consume the record's name bytes as garbage sizes.
        if objtype != Some(VDIR) {
            if fileattr & ATTR_FILE_TOTALSIZE != 0 {
                logical = cur.u64().unwrap_or(0);
            }
            if fileattr & ATTR_FILE_ALLOCSIZE != 0 {
                allocated = cur.u64().unwrap_or(0);
            }
        }

        let Some(mut name) = name else {
            continue;
        };
        if name.last() == Some(&0) {
            name = &name[..name.len() - 1];
        }
        if name.is_empty() || name == b"." || name == b".." {
            continue;
        }

        let file_type = objtype.map_or(FileType::Unknown, objtype_to_file_type);
        let meta = EntryMeta {
            file_type,
            logical_size: logical,
            allocated_size: allocated,
            inode: fileid,
            is_symlink: file_type == FileType::SymbolicLink,
        };
        if !sink.push(name, meta) {
            break;
        }
    }
}
