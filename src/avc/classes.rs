/*!
 * Object Classes
 * SELinux object-class identifiers as reported by the kernel
 */

use crate::core::types::ClassId;

/// The `file` object class. Checkpoint hooks report against this class.
pub const CLASS_FILE: ClassId = 6;

/// The `dir` object class, which has its own bit layout above bit 13.
pub const CLASS_DIR: ClassId = 7;

/// Class-id to name table (legacy fixed numbering).
const CLASS_NAMES: &[(ClassId, &str)] = &[
    (1, "security"),
    (2, "process"),
    (3, "system"),
    (4, "capability"),
    (5, "filesystem"),
    (6, "file"),
    (7, "dir"),
    (8, "fd"),
    (9, "lnk_file"),
    (10, "chr_file"),
    (11, "blk_file"),
    (12, "sock_file"),
    (13, "fifo_file"),
    (14, "socket"),
    (15, "tcp_socket"),
    (16, "udp_socket"),
    (17, "rawip_socket"),
    (18, "node"),
    (19, "netif"),
    (20, "netlink_socket"),
    (21, "packet_socket"),
    (22, "key_socket"),
    (23, "unix_stream_socket"),
    (24, "unix_dgram_socket"),
];

/// Look up the name of a known object class.
pub fn class_name(class: ClassId) -> Option<&'static str> {
    CLASS_NAMES
        .iter()
        .find(|(id, _)| *id == class)
        .map(|(_, name)| *name)
}

/// Name of an object class, falling back to a tagged `class_<N>` placeholder
/// for identifiers outside the table. The placeholder keeps unknown classes
/// visible in reports without failing the event.
pub fn class_label(class: ClassId) -> String {
    match class_name(class) {
        Some(name) => name.to_string(),
        None => format!("class_{}", class),
    }
}
