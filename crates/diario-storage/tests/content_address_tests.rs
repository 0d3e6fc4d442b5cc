//! Property tests for content addressing

use diario_storage::{content_path, ContentBlob};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_path_is_function_of_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let a = ContentBlob::for_bytes(&data);
        let b = ContentBlob::for_bytes(&data.clone());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.size as usize, data.len());
    }

    #[test]
    fn prop_path_is_sharded_by_hash(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let blob = ContentBlob::for_bytes(&data);

        prop_assert_eq!(blob.hash.len(), 64);
        prop_assert!(blob.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let expected = format!(
            "content/{}/{}/{}.bin",
            &blob.hash[0..2],
            &blob.hash[2..4],
            blob.hash
        );
        prop_assert_eq!(&blob.path, &expected);
        prop_assert_eq!(content_path(&blob.hash), expected);
    }

    #[test]
    fn prop_distinct_bytes_distinct_paths(
        a in proptest::collection::vec(any::<u8>(), 0..256),
        b in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(ContentBlob::for_bytes(&a).path, ContentBlob::for_bytes(&b).path);
    }
}
