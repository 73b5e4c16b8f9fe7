/*!
 * Permission Decoder Tests
 */

use avc_audit::avc::{self, FILE_EXECUTE, FILE_GETATTR, FILE_OPEN, FILE_READ, FILE_WRITE};

#[test]
fn test_file_class_decode() {
    let decoded = avc::decode(6, FILE_READ | FILE_WRITE | FILE_OPEN);
    assert_eq!(decoded.perms, vec!["read", "write", "open"]);
    assert_eq!(decoded.residual, 0);
}

#[test]
fn test_bit_meaning_depends_on_class() {
    // 0x4000: quotaon for file, add_name for dir
    assert_eq!(avc::decode(6, 0x4000).perms, vec!["quotaon"]);
    assert_eq!(avc::decode(7, 0x4000).perms, vec!["add_name"]);
    // 0x80000: nothing for file, open for dir
    assert_eq!(avc::decode(7, 0x80000).perms, vec!["open"]);
    assert_eq!(avc::decode(6, 0x80000).perms, Vec::<&str>::new());
    assert_eq!(avc::decode(6, 0x80000).residual, 0x80000);
}

#[test]
fn test_unknown_class_does_not_fail() {
    // unknown classes decode under the fallback table and get a tagged label
    assert_eq!(avc::class_label(200), "class_200");
    let decoded = avc::decode(200, FILE_READ);
    assert_eq!(decoded.perms, vec!["read"]);
}

#[test]
fn test_checkpoint_implied_masks_decode() {
    // the masks the checkpoint hooks compose kernel-side round-trip to the
    // permissions they are documented to imply
    let open_read = FILE_OPEN | FILE_READ;
    assert_eq!(avc::decode(6, open_read).perms, vec!["read", "open"]);

    let exec_map = FILE_READ | FILE_EXECUTE;
    assert_eq!(avc::decode(6, exec_map).perms, vec!["read", "execute"]);

    assert_eq!(avc::decode(6, FILE_GETATTR).perms, vec!["getattr"]);
}

#[test]
fn test_encode_matches_decode() {
    for name in ["read", "write", "open", "getattr", "execute", "append"] {
        let bit = avc::encode(6, name).unwrap();
        assert_eq!(avc::decode(6, bit).perms, vec![name]);
    }
}

#[test]
fn test_vfs_mask_interpretation() {
    let decoded = avc::decode_vfs_mask(0x1 | 0x4); // MAY_EXEC | MAY_READ
    assert_eq!(decoded.perms, vec!["execute", "read"]);

    let decoded = avc::decode_vfs_mask(0x10 | 0x20); // MAY_OPEN | MAY_CHDIR
    assert_eq!(decoded.perms, vec!["open", "chdir"]);
}
