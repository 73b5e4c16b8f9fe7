/*!
 * AVC Decoding Module
 * Pure mapping layer between kernel access-vector data and permission names
 *
 * The same bit position means different permissions under different object
 * classes, so every decode is class-relative. Unknown classes and unresolved
 * bits degrade to tagged placeholders; nothing in this module can fail a
 * session.
 */

mod access;
mod classes;

pub use access::{decode, decode_vfs_mask, encode, DecodedAccess};
pub use access::{FILE_EXECUTE, FILE_GETATTR, FILE_OPEN, FILE_READ, FILE_WRITE};
pub use classes::{class_label, class_name, CLASS_FILE};
